//! Hex dump rendering for message diagnostics
//!
//! Lines follow the classic `offset: hex bytes |ascii|` layout, 16 bytes
//! per line.

use std::fmt::Write;

const BYTES_PER_LINE: usize = 16;

fn printable(byte: u8) -> char {
    if (32..127).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

fn render_line(offset: usize, bytes: &[u8], marks: Option<&[u8]>) -> String {
    let mut line = format!("{:04x}:", offset);

    for (i, &byte) in bytes.iter().enumerate() {
        let differs = marks.map_or(false, |other| other.get(i) != Some(&byte));
        let _ = write!(line, "{}{:02x}", if differs { '*' } else { ' ' }, byte);
    }
    for _ in bytes.len()..BYTES_PER_LINE {
        line.push_str("   ");
    }

    line.push_str(" |");
    line.extend(bytes.iter().map(|&b| printable(b)));
    line.push('|');
    line
}

/// Render `bytes` as hex dump lines
pub fn hex_dump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| render_line(i * BYTES_PER_LINE, chunk, None))
        .collect()
}

/// Render `actual` with bytes differing from `expected` marked by `*`.
///
/// Each line containing a difference is followed by the expected line.
/// Also returns the number of differing bytes.
pub fn compare_dump(actual: &[u8], expected: &[u8]) -> (Vec<String>, usize) {
    let mut lines = Vec::new();
    let mut mismatches = 0;

    for (i, chunk) in actual.chunks(BYTES_PER_LINE).enumerate() {
        let offset = i * BYTES_PER_LINE;
        let end = (offset + BYTES_PER_LINE).min(expected.len());
        let reference = expected.get(offset..end).unwrap_or(&[]);

        let differing = chunk
            .iter()
            .enumerate()
            .filter(|(j, b)| reference.get(*j) != Some(*b))
            .count();

        lines.push(render_line(offset, chunk, Some(reference)));
        if differing > 0 {
            mismatches += differing;
            lines.push("Expected:".to_string());
            lines.push(render_line(offset, reference, None));
        }
    }

    (lines, mismatches)
}
