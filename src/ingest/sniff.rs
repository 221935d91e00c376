//! Magic-byte checks that confirm an upload is what its extension claims.

use super::{IngestError, IngestResult};

/// A byte pattern expected at a fixed offset from the start of a file.
struct Signature {
    offset: usize,
    magic: &'static [u8],
    format: &'static str,
}

const PDF: Signature = Signature {
    offset: 0,
    magic: b"%PDF-",
    format: "PDF",
};
const EPUB: Signature = Signature {
    offset: 0,
    magic: b"PK\x03\x04",
    format: "EPUB",
};
const JPEG: Signature = Signature {
    offset: 0,
    magic: b"\xFF\xD8\xFF",
    format: "JPEG image",
};
const PNG: Signature = Signature {
    offset: 0,
    magic: b"\x89PNG\r\n\x1a\n",
    format: "PNG image",
};
// WEBP is RIFF with "WEBP" at offset 8; only the container tag is checked.
const WEBP: Signature = Signature {
    offset: 0,
    magic: b"RIFF",
    format: "WEBP image",
};
const MP4: Signature = Signature {
    offset: 4,
    magic: b"ftyp",
    format: "MP4 video",
};
const WEBM: Signature = Signature {
    offset: 0,
    magic: b"\x1A\x45\xDF\xA3",
    format: "WEBM video",
};

fn signature_for(extension: &str) -> Option<&'static Signature> {
    match extension {
        "pdf" => Some(&PDF),
        "epub" => Some(&EPUB),
        "jpg" | "jpeg" => Some(&JPEG),
        "png" => Some(&PNG),
        "webp" => Some(&WEBP),
        "mp4" | "m4v" => Some(&MP4),
        "webm" | "mkv" => Some(&WEBM),
        _ => None,
    }
}

/// Check `header` against the known signature for `extension`.
///
/// Extensions without a registered signature pass unconditionally.
pub fn sniff(header: &[u8], extension: &str) -> IngestResult<()> {
    let Some(sig) = signature_for(extension) else {
        return Ok(());
    };

    let matches = header
        .get(sig.offset..sig.offset + sig.magic.len())
        .is_some_and(|window| window == sig.magic);

    if matches {
        Ok(())
    } else {
        Err(IngestError::ContentMismatch(format!(
            "File does not appear to be a valid {}",
            sig.format
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signatures() {
        assert!(sniff(b"%PDF-1.7\n...", "pdf").is_ok());
        assert!(sniff(b"PK\x03\x04rest", "epub").is_ok());
        assert!(sniff(b"\xFF\xD8\xFF\xE0", "jpg").is_ok());
        assert!(sniff(b"\xFF\xD8\xFF\xE0", "jpeg").is_ok());
        assert!(sniff(b"\x89PNG\r\n\x1a\n\0\0", "png").is_ok());
        assert!(sniff(b"RIFF\0\0\0\0WEBP", "webp").is_ok());
        assert!(sniff(b"\0\0\0\x18ftypmp42", "mp4").is_ok());
    }

    #[test]
    fn rejects_mismatched_header_with_format_name() {
        let err = sniff(b"hello world", "pdf").unwrap_err();
        match err {
            IngestError::ContentMismatch(msg) => assert!(msg.contains("PDF")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(sniff(b"%PDF-1.4", "png").is_err());
    }

    #[test]
    fn short_header_does_not_match() {
        assert!(sniff(b"%PD", "pdf").is_err());
        assert!(sniff(b"\0\0", "mp4").is_err());
    }

    #[test]
    fn unknown_extension_is_permissive() {
        assert!(sniff(b"anything", "txt").is_ok());
    }
}
