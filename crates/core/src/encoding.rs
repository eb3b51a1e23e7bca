//! Character encoding resolution for fetched pages.
//!
//! The charset is taken from the `Content-Type` response header only; the body
//! is not sniffed. Anything missing, unknown or malformed degrades to UTF-8 so
//! decoding never fails.

use encoding_rs::{Encoding, UTF_8};

/// Text decoded from a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Decoded text.
    pub text: String,
    /// Canonical name of the encoding actually used (e.g. `"UTF-8"`, `"GBK"`).
    pub encoding: &'static str,
    /// Whether the declared charset was unusable and UTF-8 was substituted.
    pub fell_back: bool,
}

/// Extracts the `charset` parameter from a `Content-Type` header value.
///
/// Matching is case-insensitive and tolerant of extra `;`-separated
/// directives, quoting and trailing garbage after the label.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|directive| {
        let (key, value) = directive.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }

        let label: String = value
            .trim()
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .collect();

        if label.is_empty() { None } else { Some(label.to_ascii_lowercase()) }
    })
}

/// Decodes a response body using the charset declared in `content_type`.
///
/// Never fails: an absent header means UTF-8, and an unsupported label is
/// logged and replaced by a lossy UTF-8 reading of the bytes.
pub fn decode(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    let label = content_type.and_then(charset_from_content_type);

    let encoding = match label.as_deref() {
        None => UTF_8,
        Some(label) => match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => encoding,
            None => {
                tracing::warn!(charset = label, "unsupported charset, falling back to UTF-8");
                return DecodedText {
                    text: String::from_utf8_lossy(bytes).into_owned(),
                    encoding: UTF_8.name(),
                    fell_back: true,
                };
            }
        },
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!(charset = encoding.name(), "body contained malformed sequences for declared charset");
    }

    DecodedText { text: text.into_owned(), encoding: encoding.name(), fell_back: false }
}

/// Convenience wrapper returning only the decoded text.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    decode(bytes, content_type).text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_simple() {
        assert_eq!(
            charset_from_content_type("text/html; charset=UTF-8"),
            Some("utf-8".to_string())
        );
    }

    #[test]
    fn test_charset_multiple_directives_and_quotes() {
        assert_eq!(
            charset_from_content_type("text/html;foo=bar; CHARSET=\"gbk\"; boundary=x"),
            Some("gbk".to_string())
        );
    }

    #[test]
    fn test_charset_trailing_garbage() {
        assert_eq!(
            charset_from_content_type("text/html; charset=iso-8859-1 (legacy)"),
            Some("iso-8859-1".to_string())
        );
    }

    #[test]
    fn test_charset_absent() {
        assert_eq!(charset_from_content_type("text/html"), None);
        assert_eq!(charset_from_content_type("text/html; charset="), None);
    }

    #[test]
    fn test_decode_defaults_to_utf8() {
        let decoded = decode("héllo".as_bytes(), None);
        assert_eq!(decoded.text, "héllo");
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(!decoded.fell_back);
    }

    #[test]
    fn test_decode_latin1() {
        let decoded = decode(b"caf\xe9", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "café");
        assert_eq!(decoded.encoding, "windows-1252");
    }

    #[test]
    fn test_decode_gbk() {
        let decoded = decode(&[0xC4, 0xE3, 0xBA, 0xC3], Some("text/html; charset=gbk"));
        assert_eq!(decoded.text, "你好");
    }

    #[test]
    fn test_decode_bogus_charset_falls_back() {
        let decoded = decode(b"<p>plain</p>", Some("text/html; charset=bogus-charset"));
        assert_eq!(decoded.text, "<p>plain</p>");
        assert!(decoded.fell_back);
    }

    #[test]
    fn test_decode_invalid_bytes_never_panics() {
        let text = decode_body(&[0xff, 0xfe, b'a'], Some("text/html; charset=bogus-charset"));
        assert!(text.ends_with('a'));
    }
}
