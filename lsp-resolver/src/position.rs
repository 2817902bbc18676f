//! Position arithmetic between Tree-sitter and LSP coordinates.
//!
//! Tree-sitter reports 0-based rows with byte columns; LSP positions use
//! 0-based lines with UTF-16 code-unit columns. All conversions here work
//! on the exact source text the tree was parsed from.

/// Byte offset of the start of `row` (0-based), if the row exists.
pub fn line_start_byte(source: &str, row: usize) -> Option<usize> {
    if row == 0 {
        return Some(0);
    }
    let mut seen = 0usize;
    for (idx, b) in source.bytes().enumerate() {
        if b == b'\n' {
            seen += 1;
            if seen == row {
                return Some(idx + 1);
            }
        }
    }
    None
}

/// The text of `row` without its trailing newline.
pub fn line_text(source: &str, row: usize) -> Option<&str> {
    let start = line_start_byte(source, row)?;
    let rest = &source[start..];
    Some(rest.split('\n').next().unwrap_or(rest))
}

/// Absolute byte offset of `(row, byte_col)`.
pub fn byte_offset(source: &str, row: usize, byte_col: usize) -> Option<usize> {
    let start = line_start_byte(source, row)?;
    let offset = start + byte_col;
    (offset <= source.len()).then_some(offset)
}

/// UTF-16 column for a byte column within one line.
pub fn utf16_col(line: &str, byte_col: usize) -> u32 {
    let clamped = byte_col.min(line.len());
    line[..clamped].encode_utf16().count() as u32
}

/// Byte column for a UTF-16 column within one line.
///
/// Columns past the end of the line clamp to the line length, which keeps
/// sloppy server responses usable instead of panicking.
pub fn byte_col_from_utf16(line: &str, utf16_col: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= utf16_col {
            return idx;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}
