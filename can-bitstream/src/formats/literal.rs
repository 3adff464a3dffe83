//! Text captures made of bytes literals
//!
//! Serial loggers often dump each read as the repr of a byte string, one per
//! line: `b'\x11\x01\x01\x00\x14\x00\x00\x00'`. Lines that do not parse are
//! skipped.

use super::CaptureParser;
use crate::types::{CodecError, Result};

/// Parser for line-oriented bytes-literal dumps
pub struct LiteralCapture;

impl CaptureParser for LiteralCapture {
    fn parse(content: &[u8]) -> Result<Vec<u8>> {
        let text = String::from_utf8_lossy(content);
        let mut bytes = Vec::new();
        let mut parsed_lines = 0;
        let mut skipped_lines = 0;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_bytes_literal(line) {
                Ok(chunk) => {
                    bytes.extend_from_slice(&chunk);
                    parsed_lines += 1;
                }
                Err(e) => {
                    log::warn!("Skipping capture line {}: {}", line_no + 1, e);
                    skipped_lines += 1;
                }
            }
        }

        if parsed_lines == 0 && skipped_lines > 0 {
            return Err(CodecError::CaptureParse(format!(
                "no bytes literal could be parsed ({} lines skipped)",
                skipped_lines
            )));
        }

        Ok(bytes)
    }
}

/// Parse one `b'...'` / `b"..."` literal into its bytes
pub fn parse_bytes_literal(literal: &str) -> std::result::Result<Vec<u8>, String> {
    let rest = literal
        .strip_prefix('b')
        .ok_or_else(|| format!("not a bytes literal: {:?}", literal))?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| format!("missing opening quote: {:?}", literal))?;
    let body = rest[1..]
        .strip_suffix(quote)
        .ok_or_else(|| format!("missing closing quote: {:?}", literal))?;

    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            if !c.is_ascii() {
                return Err(format!("non-ASCII character {:?} in bytes literal", c));
            }
            if c == quote {
                return Err(format!("unescaped quote in {:?}", literal));
            }
            out.push(c as u8);
            continue;
        }

        let escape = chars
            .next()
            .ok_or_else(|| "dangling backslash".to_string())?;
        match escape {
            'x' => {
                let hi = chars.next();
                let lo = chars.next();
                let digits: String = [hi, lo].iter().flatten().collect();
                if digits.len() != 2 {
                    return Err(format!("truncated \\x escape in {:?}", literal));
                }
                let value = u8::from_str_radix(&digits, 16)
                    .map_err(|e| format!("bad \\x escape {:?}: {}", digits, e))?;
                out.push(value);
            }
            '0'..='7' => {
                let mut value = escape as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            value = value * 8 + (*d as u32 - '0' as u32);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'v' => out.push(0x0B),
            '\\' => out.push(b'\\'),
            '\'' => out.push(b'\''),
            '"' => out.push(b'"'),
            other if other.is_ascii() => {
                // Unknown escapes keep their backslash
                out.push(b'\\');
                out.push(other as u8);
            }
            other => return Err(format!("non-ASCII escape {:?}", other)),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_printable() {
        assert_eq!(
            parse_bytes_literal(r"b'\x11\x01\x01\x00(\x00\x00\x00'").unwrap(),
            vec![0x11, 0x01, 0x01, 0x00, 0x28, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(
            parse_bytes_literal(r#"b"\n\r\t\\\'\"""#).unwrap(),
            b"\n\r\t\\'\"".to_vec()
        );
        assert_eq!(parse_bytes_literal(r"b'\0\12\101'").unwrap(), vec![0, 10, 65]);
        assert_eq!(parse_bytes_literal(r"b'\q'").unwrap(), b"\\q".to_vec());
    }

    #[test]
    fn test_rejects_malformed_literals() {
        assert!(parse_bytes_literal("'abc'").is_err());
        assert!(parse_bytes_literal("b'abc").is_err());
        assert!(parse_bytes_literal(r"b'\x1'").is_err());
        assert!(parse_bytes_literal(r"b'\xZZ'").is_err());
        assert!(parse_bytes_literal(r"b'a'b'").is_err());
    }

    #[test]
    fn test_all_lines_bad() {
        let result = LiteralCapture::parse(b"b'\\x1\nb'oops\n");
        assert!(matches!(result, Err(CodecError::CaptureParse(_))));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let bytes = LiteralCapture::parse(b"\nb'\\x11'\n\n  b'\\x00'  \n").unwrap();
        assert_eq!(bytes, vec![0x11, 0x00]);
    }
}
