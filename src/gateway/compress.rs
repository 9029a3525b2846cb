use flate2::read::ZlibDecoder;
use std::io::Read;

/// Inflates a zlib-compressed binary frame back into its JSON text.
pub fn inflate(bytes: &[u8]) -> std::io::Result<String> {
    let mut text = String::new();
    ZlibDecoder::new(bytes).read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(text: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_inflate_recovers_json_text() {
        let text = r#"{"op":0,"s":3,"t":"READY","d":{"session_id":"S"}}"#;
        let inflated = inflate(&deflate(text)).unwrap();
        assert_eq!(inflated, text);
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        assert!(inflate(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
