//! Helpers for text layers, whose descriptions embed literal text and `#RRGGBB` colors.

use serde::{Deserialize, Serialize};

/// An opaque RGB color mentioned in a layer description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parse `#RRGGBB` or `#RGB` (the leading `#` is optional).
pub fn parse_hex_color(s: &str) -> Result<HexColor, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    if !s.is_ascii() {
        return Err(format!("invalid hex color \"{s}\""));
    }

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    match s.len() {
        6 => Ok(HexColor {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
        }),
        3 => {
            let nibble = |i: usize| hex_byte(&s[i..=i]).map(|v| v * 17);
            Ok(HexColor {
                r: nibble(0)?,
                g: nibble(1)?,
                b: nibble(2)?,
            })
        }
        _ => Err("hex color must be #RRGGBB or #RGB".to_owned()),
    }
}

/// Every well-formed hex color in `description`, in order of appearance.
///
/// A code must be exactly 3 or 6 hex digits after `#`; longer runs (e.g. `#RRGGBBAA`) and
/// malformed codes are skipped.
pub fn text_colors(description: &str) -> Vec<HexColor> {
    let bytes = description.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'#' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
            end += 1;
        }
        if matches!(end - start, 3 | 6)
            && let Ok(color) = parse_hex_color(&description[start..end])
        {
            out.push(color);
        }
        i = end.max(start);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/model/text.rs"]
mod tests;
