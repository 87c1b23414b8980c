//! Decoding of PostgreSQL `bytea` text output.
//!
//! Parameterized queries return `bytea` columns as [`RowValues::Blob`]
//! already. Queries without parameters use the text protocol, so such
//! columns arrive as [`RowValues::Text`] in one of the two server output
//! formats; these functions turn that text back into bytes.
//!
//! Both formats are decoded leniently, the way libpq's `PQunescapeBytea`
//! does: malformed input is skipped rather than rejected.
//!
//! [`RowValues::Blob`]: crate::types::RowValues::Blob
//! [`RowValues::Text`]: crate::types::RowValues::Text

/// Decode `bytea` text output into the raw bytes.
///
/// ```rust
/// use pg_dbc::conversion::unescape_bytea;
///
/// assert_eq!(unescape_bytea(br"\x48690a"), b"Hi\n");
/// assert_eq!(unescape_bytea(br"Hi\012\\"), b"Hi\n\\");
/// ```
#[must_use]
pub fn unescape_bytea(data: &[u8]) -> Vec<u8> {
    let mut decoded = data.to_vec();
    unescape_bytea_in_place(&mut decoded);
    decoded
}

/// Decode `bytea` text output, replacing `data` with the raw bytes.
pub fn unescape_bytea_in_place(data: &mut Vec<u8>) {
    let len = if data.starts_with(br"\x") {
        decode_hex(data)
    } else {
        decode_escape(data)
    };
    data.truncate(len);
}

/// `\x` followed by hex digit pairs. Whitespace and invalid digits are skipped.
fn decode_hex(data: &mut [u8]) -> usize {
    let mut read = 2;
    let mut write = 0;
    while read < data.len() {
        let Some(high) = hex_value(data[read]) else {
            read += 1;
            continue;
        };
        let Some(&next) = data.get(read + 1) else {
            break;
        };
        read += 2;
        if let Some(low) = hex_value(next) {
            data[write] = (high << 4) | low;
            write += 1;
        }
    }
    write
}

/// Escape format: `\\` is a backslash, `\ooo` an octal byte (first digit 0-3),
/// anything else is literal. A backslash before anything else is dropped.
fn decode_escape(data: &mut [u8]) -> usize {
    let mut read = 0;
    let mut write = 0;
    while read < data.len() {
        if data[read] != b'\\' {
            data[write] = data[read];
            read += 1;
            write += 1;
            continue;
        }
        read += 1;
        match data.get(read..read + 3) {
            Some(&[a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7']) => {
                data[write] = ((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0');
                read += 3;
                write += 1;
            }
            _ if data.get(read) == Some(&b'\\') => {
                data[write] = b'\\';
                read += 1;
                write += 1;
            }
            _ => {}
        }
    }
    write
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_format() {
        assert_eq!(unescape_bytea(br"\xDEADbeef"), [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(unescape_bytea(br"\x"), b"");
    }

    #[test]
    fn hex_skips_whitespace_and_garbage() {
        assert_eq!(unescape_bytea(b"\\x de\nad zz"), [0xde, 0xad]);
        // a trailing lone digit is dropped
        assert_eq!(unescape_bytea(br"\x0a1"), [0x0a]);
    }

    #[test]
    fn escape_format() {
        assert_eq!(unescape_bytea(br"abc"), b"abc");
        assert_eq!(unescape_bytea(br"\000\377"), [0x00, 0xff]);
        assert_eq!(unescape_bytea(br"a\\b"), br"a\b");
    }

    #[test]
    fn escape_format_is_lenient() {
        // unknown escape keeps the following byte
        assert_eq!(unescape_bytea(br"\q"), b"q");
        // first octal digit above 3 is not an escape
        assert_eq!(unescape_bytea(br"\477"), b"477");
        // trailing backslash is discarded
        assert_eq!(unescape_bytea(br"ab\"), b"ab");
        assert_eq!(unescape_bytea(br"\01"), b"01");
    }

    #[test]
    fn in_place_reuses_buffer() {
        let mut data = br"\x6869".to_vec();
        unescape_bytea_in_place(&mut data);
        assert_eq!(data, b"hi");
    }
}
