//! Text position utilities.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// If `offset` exceeds the content length, returns the position at the end
/// of the content.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current_offset = 0usize;

    for ch in content.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

/// Walk backwards from `offset` over spaces and tabs and line breaks.
pub fn skip_whitespace_back(content: &str, offset: usize) -> usize {
    let trimmed = content[..offset].trim_end_matches([' ', '\t', '\r', '\n']);
    trimmed.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_to_position_counts_chars() {
        let content = "ab\nçd\n";
        assert_eq!(byte_offset_to_position_str(content, 0), (1, 1));
        assert_eq!(byte_offset_to_position_str(content, 3), (2, 1));
        // 'd' starts after the two-byte 'ç'
        assert_eq!(byte_offset_to_position_str(content, 5), (2, 2));
    }

    #[test]
    fn whitespace_helpers() {
        let content = "a;  \n\t b";
        assert_eq!(skip_whitespace_back(content, 7), 2);
        assert_eq!(skip_whitespace_back(content, 1), 1);
        assert_eq!(skip_whitespace_back("  x", 2), 0);
    }
}
