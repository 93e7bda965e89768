use super::*;

#[test]
fn parses_long_and_short_forms() {
    assert_eq!(
        parse_hex_color("#FF8000").unwrap(),
        HexColor { r: 255, g: 128, b: 0 }
    );
    assert_eq!(
        parse_hex_color("fff").unwrap(),
        HexColor { r: 255, g: 255, b: 255 }
    );
    assert!(parse_hex_color("#12345").is_err());
    assert!(parse_hex_color("#GG0000").is_err());
}

#[test]
fn finds_colors_in_description_order() {
    let desc = "Headline 'SUMMER SALE' in bold, fill #E63946 with outline #1d3557.";
    let colors = text_colors(desc);
    assert_eq!(colors.len(), 2);
    assert_eq!(colors[0].to_string(), "#E63946");
    assert_eq!(colors[1].to_string(), "#1D3557");
}

#[test]
fn skips_hashtags_and_overlong_runs() {
    let desc = "#hashtag #1 #ABCDEF12 then #abc";
    let colors = text_colors(desc);
    assert_eq!(colors, vec![HexColor { r: 0xAA, g: 0xBB, b: 0xCC }]);
}

#[test]
fn tolerates_trailing_hash_and_multibyte_text() {
    assert!(text_colors("café #").is_empty());
    assert_eq!(text_colors("ü#000000ü").len(), 1);
}
