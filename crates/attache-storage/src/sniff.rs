//! Content-based MIME detection
//!
//! Remote-fetched payloads are typed from their bytes, never from the
//! source URL. Covers the formats the service actually ingests; anything
//! unrecognized falls back to `application/octet-stream`.

/// Sniff a MIME type from a payload's magic bytes
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if data.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        "image/gif"
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else if data.starts_with(b"%PDF-") {
        "application/pdf"
    } else if data.starts_with(b"PK\x03\x04") {
        "application/zip"
    } else if !data.is_empty() && std::str::from_utf8(data).is_ok() {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

/// Canonical file extension for a sniffed MIME type
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        "application/zip" => Some("zip"),
        "text/plain" => Some("txt"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_png() {
        let data = b"\x89PNG\r\n\x1a\n rest of file";
        assert_eq!(sniff_mime(data), "image/png");
        assert_eq!(extension_for_mime("image/png"), Some("png"));
    }

    #[test]
    fn test_sniff_jpeg() {
        assert_eq!(sniff_mime(b"\xff\xd8\xff\xe0JFIF"), "image/jpeg");
    }

    #[test]
    fn test_sniff_text_fallback() {
        assert_eq!(sniff_mime(b"just some text"), "text/plain");
    }

    #[test]
    fn test_sniff_binary_fallback() {
        assert_eq!(sniff_mime(&[0x00, 0xff, 0xfe, 0x01]), "application/octet-stream");
        assert_eq!(extension_for_mime("application/octet-stream"), None);
    }
}
