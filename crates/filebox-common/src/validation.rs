//! Upload validation.
//!
//! Checks are evaluated independently and every failure is recorded, so a
//! client sees all problems with an upload in one response.

use crate::config::FilesConfig;
use crate::error::{FieldErrors, FileboxError};

pub const NO_FILE: &str = "NoFile";
pub const FILE_SIZE_TOO_BIG: &str = "FileSizeTooBig";
pub const INVALID_FILE_TYPE: &str = "InvalidFileType";

/// What the upload endpoint knows about a file part before storing it.
#[derive(Debug, Clone, Copy)]
pub struct UploadCandidate<'a> {
    pub content_type: &'a str,
    /// Total size of the part in bytes.
    pub length: u64,
}

/// Validate an upload against the configured limits.
///
/// `None` means the request carried no file part. Size and type can only be
/// checked when a part exists.
pub fn validate_upload(
    file: Option<UploadCandidate<'_>>,
    limits: &FilesConfig,
) -> Result<(), FileboxError> {
    let mut errors = FieldErrors::new();

    match file {
        None => add_error(&mut errors, NO_FILE, "file not uploaded".to_string()),
        Some(file) => {
            if file.length > limits.max_file_size_bytes {
                add_error(
                    &mut errors,
                    FILE_SIZE_TOO_BIG,
                    format!(
                        "File size is bigger than maximum allowed file size {}",
                        limits.max_file_size_bytes
                    ),
                );
            }
            if !limits.is_supported(file.content_type) {
                add_error(
                    &mut errors,
                    INVALID_FILE_TYPE,
                    "Input file type is not supported".to_string(),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(FileboxError::InvalidFields { errors })
    }
}

fn add_error(errors: &mut FieldErrors, key: &str, message: String) {
    errors.entry(key.to_string()).or_default().push(message);
}

/// Strip any directory component from a client-supplied file name.
///
/// Browsers on Windows may send full paths with `\` separators, so both
/// separators are handled.
pub fn base_file_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> FilesConfig {
        FilesConfig {
            max_file_size_bytes: 5_242_880,
            supported_types: vec!["application/pdf".into()],
            max_request_bytes: 64 * 1024 * 1024,
        }
    }

    fn field_errors(result: Result<(), FileboxError>) -> FieldErrors {
        match result {
            Err(FileboxError::InvalidFields { errors }) => errors,
            other => panic!("expected InvalidFields, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_pdf_passes() {
        let file = UploadCandidate {
            content_type: "application/pdf",
            length: 2 * 1024 * 1024,
        };
        assert!(validate_upload(Some(file), &limits()).is_ok());
    }

    #[test]
    fn test_size_at_limit_passes() {
        let file = UploadCandidate {
            content_type: "application/pdf",
            length: 5_242_880,
        };
        assert!(validate_upload(Some(file), &limits()).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let errors = field_errors(validate_upload(None, &limits()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[NO_FILE], vec!["file not uploaded".to_string()]);
    }

    #[test]
    fn test_unsupported_type() {
        let file = UploadCandidate {
            content_type: "application/json",
            length: 10 * 1024,
        };
        let errors = field_errors(validate_upload(Some(file), &limits()));
        assert_eq!(
            errors[INVALID_FILE_TYPE],
            vec!["Input file type is not supported".to_string()]
        );
        assert!(!errors.contains_key(FILE_SIZE_TOO_BIG));
    }

    #[test]
    fn test_oversized_and_unsupported_accumulate() {
        let file = UploadCandidate {
            content_type: "application/json",
            length: 1024 * 1024 * 1024,
        };
        let errors = field_errors(validate_upload(Some(file), &limits()));
        assert_eq!(
            errors[FILE_SIZE_TOO_BIG],
            vec!["File size is bigger than maximum allowed file size 5242880".to_string()]
        );
        assert!(errors.contains_key(INVALID_FILE_TYPE));
    }

    #[test]
    fn test_base_file_name() {
        assert_eq!(base_file_name("Test.pdf"), "Test.pdf");
        assert_eq!(base_file_name("docs/2024/Test.pdf"), "Test.pdf");
        assert_eq!(base_file_name(r"C:\Users\me\Test.pdf"), "Test.pdf");
        assert_eq!(base_file_name("dir/"), "");
    }
}
