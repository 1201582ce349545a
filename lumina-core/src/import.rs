//! Import validation
//!
//! Checks run on the raw file before anything is parsed or stored.

use crate::error::ValidationError;
use std::path::Path;
use uuid::Uuid;

/// Extensions accepted for import, compared case-insensitively
pub const SUPPORTED_EXTENSIONS: &[&str] = &["epub"];

/// Local file header magic of a ZIP archive
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Validate a file picked for import
///
/// Checks, in order: extension, emptiness, size, container signature.
pub fn validate_import(file_name: &str, bytes: &[u8], max_size: u64) -> Result<(), ValidationError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedExtension(if extension.is_empty() {
            file_name.to_string()
        } else {
            format!(".{}", extension)
        }));
    }

    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }

    let size = bytes.len() as u64;
    if size > max_size {
        return Err(ValidationError::TooLarge { size, max: max_size });
    }

    if !bytes.starts_with(&ZIP_SIGNATURE) {
        return Err(ValidationError::InvalidSignature);
    }

    Ok(())
}

/// Generate a book id not accepted by `taken`
pub fn new_book_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = Uuid::new_v4().simple().to_string();
        if !taken(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const MAX: u64 = 100 * 1024 * 1024;

    #[test]
    fn test_accepts_epub_case_insensitively() {
        assert!(validate_import("Dune.EPUB", b"PK\x03\x04rest", MAX).is_ok());
    }

    #[test]
    fn test_rejects_wrong_extension() {
        assert_eq!(
            validate_import("notes.pdf", b"PK\x03\x04", MAX),
            Err(ValidationError::UnsupportedExtension(".pdf".into()))
        );
        assert!(matches!(
            validate_import("README", b"PK\x03\x04", MAX),
            Err(ValidationError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn test_rejects_empty_file() {
        let err = validate_import("empty.epub", b"", MAX).unwrap_err();
        assert_eq!(err, ValidationError::EmptyFile);
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_rejects_oversized_file() {
        assert_eq!(
            validate_import("big.epub", b"PK\x03\x04123456", 8),
            Err(ValidationError::TooLarge { size: 10, max: 8 })
        );
    }

    #[test]
    fn test_rejects_bad_signature() {
        assert_eq!(
            validate_import("fake.epub", b"%PDF-1.7", MAX),
            Err(ValidationError::InvalidSignature)
        );
    }

    #[test]
    fn test_new_book_id_skips_taken_ids() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let id = new_book_id(|candidate| seen.contains(candidate));
            assert!(seen.insert(id));
        }
    }

    proptest! {
        #[test]
        fn prop_non_zip_bytes_never_validate(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            prop_assume!(!bytes.starts_with(&ZIP_SIGNATURE));
            prop_assert!(validate_import("book.epub", &bytes, MAX).is_err());
        }
    }
}
