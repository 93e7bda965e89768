//! PackBits run-length encoding, as used for PSD channel rows.

const MAX_RUN: usize = 128;

/// Append the PackBits encoding of `row` to `out`.
pub(crate) fn pack_row(row: &[u8], out: &mut Vec<u8>) {
    let n = row.len();
    let mut i = 0;
    while i < n {
        let mut run = 1;
        while i + run < n && run < MAX_RUN && row[i + run] == row[i] {
            run += 1;
        }

        if run >= 3 {
            // Header byte is 1 - run as a signed byte: -2..=-127.
            out.push((257 - run) as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < n && i - start < MAX_RUN {
            if i + 2 < n && row[i] == row[i + 1] && row[i] == row[i + 2] {
                break;
            }
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start..i]);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/packbits.rs"]
mod tests;
