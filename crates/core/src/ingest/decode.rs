use crate::error::ParseError;
use encoding_rs::{GBK, UTF_8};

/// Decodes artifact bytes as UTF-8 (dropping a BOM), falling back to GBK.
///
/// Spreadsheet tools on Chinese-locale machines save the `涨跌` header in GBK. Bytes that are
/// valid in neither encoding are rejected rather than decoded with replacement characters.
pub fn decode_text(artifact: &'static str, bytes: &[u8]) -> Result<String, ParseError> {
    let (text, malformed) = UTF_8.decode_with_bom_removal(bytes);
    if !malformed {
        return Ok(text.into_owned());
    }

    let (text, _, had_errors) = GBK.decode(bytes);
    if had_errors {
        return Err(ParseError::Invalid {
            artifact,
            detail: format!("{} bytes are neither valid UTF-8 nor GBK", bytes.len()),
        });
    }
    tracing::debug!(artifact, "decoded artifact as GBK");
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = "regime_history.csv";

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("date,涨跌\n".as_bytes());
        assert_eq!(decode_text(ARTIFACT, &bytes).unwrap(), "date,涨跌\n");
    }

    #[test]
    fn falls_back_to_gbk() {
        let (bytes, _, _) = GBK.encode("date,shibor_2w,涨跌,rsi_5,risk_on\n");
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(
            decode_text(ARTIFACT, &bytes).unwrap(),
            "date,shibor_2w,涨跌,rsi_5,risk_on\n"
        );
    }

    #[test]
    fn rejects_bytes_valid_in_neither_encoding() {
        let bytes = b"\"signal_strength\": \"Mod\xFFerate\"";
        match decode_text(ARTIFACT, bytes) {
            Err(ParseError::Invalid { artifact, detail }) => {
                assert_eq!(artifact, ARTIFACT);
                assert!(detail.contains("neither"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
