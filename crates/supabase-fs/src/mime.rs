//! Content type detection for uploads

/// Upper bound of bytes inspected when sniffing a stream
pub const SNIFF_LEN: usize = 8192;

/// Fallback when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the content type of an upload.
///
/// Magic numbers win, then the key's extension, then plain text for
/// UTF-8 content. `sample` may be a truncated prefix of the content, so a
/// multi-byte sequence cut at the end still counts as text.
pub fn sniff(sample: &[u8], path: &str) -> String {
    if let Some(kind) = infer::get(sample) {
        return kind.mime_type().to_string();
    }

    if let Some(guess) = mime_guess::from_path(path).first() {
        return guess.essence_str().to_string();
    }

    if !sample.is_empty() && looks_like_text(sample) {
        return "text/plain".to_string();
    }

    OCTET_STREAM.to_string()
}

fn looks_like_text(sample: &[u8]) -> bool {
    let valid = match std::str::from_utf8(sample) {
        Ok(text) => text,
        // incomplete trailing sequence from truncation
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&sample[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
        Err(_) => return false,
    };
    !valid.chars().any(|c| c.is_control() && !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_magic_numbers() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff(&png, "upload.bin"), "image/png");

        let pdf = b"%PDF-1.7\n";
        assert_eq!(sniff(pdf, "noext"), "application/pdf");
    }

    #[test]
    fn test_sniff_falls_back_to_extension() {
        assert_eq!(sniff(b"body { color: red }", "site/style.css"), "text/css");
    }

    #[test]
    fn test_sniff_plain_text() {
        assert_eq!(sniff(b"file content", "test-file"), "text/plain");
        // "é" cut in half at the sample boundary
        let mut sample = b"caf".to_vec();
        sample.push(0xC3);
        assert_eq!(sniff(&sample, "notes"), "text/plain");
    }

    #[test]
    fn test_sniff_binary_and_empty() {
        assert_eq!(sniff(&[0x00, 0x01, 0x02, 0xFF], "blob"), OCTET_STREAM);
        assert_eq!(sniff(b"", "docs/.emptyFolderPlaceholder"), OCTET_STREAM);
    }
}
