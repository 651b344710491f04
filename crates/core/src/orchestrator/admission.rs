//! Batch admission: size, type and count checks before anything is tracked.

use crate::upload::{media_essence, SourceFile};

use super::config::{BatchOverflowPolicy, OrchestratorConfig};
use super::types::ValidationError;

/// Files accepted from a batch.
#[derive(Debug)]
pub struct Admission {
    pub files: Vec<SourceFile>,
    /// Files dropped by [`BatchOverflowPolicy::Truncate`].
    pub truncated: usize,
    /// Files that failed their own checks, in submission order.
    pub rejected: Vec<ValidationError>,
}

/// Check a batch.
///
/// Only a batch over the count limit under [`BatchOverflowPolicy::Reject`]
/// is refused as a whole. Files failing the size, empty or type checks are
/// dropped one by one and reported in [`Admission::rejected`].
pub fn admit_batch(
    config: &OrchestratorConfig,
    mut files: Vec<SourceFile>,
) -> Result<Admission, ValidationError> {
    let mut truncated = 0;
    if files.len() > config.max_batch_size {
        match config.batch_overflow {
            BatchOverflowPolicy::Reject => {
                return Err(ValidationError::BatchTooLarge {
                    count: files.len(),
                    max: config.max_batch_size,
                });
            }
            BatchOverflowPolicy::Truncate => {
                truncated = files.len() - config.max_batch_size;
                files.truncate(config.max_batch_size);
            }
        }
    }

    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();
    for file in files {
        match check_file(config, &file) {
            Ok(()) => accepted.push(file),
            Err(e) => rejected.push(e),
        }
    }

    Ok(Admission {
        files: accepted,
        truncated,
        rejected,
    })
}

/// Check a single file against the size ceiling and accepted types.
pub fn check_file(config: &OrchestratorConfig, file: &SourceFile) -> Result<(), ValidationError> {
    if file.size() == 0 {
        return Err(ValidationError::EmptyFile {
            name: file.name().to_string(),
        });
    }
    if file.size() > config.max_file_size {
        return Err(ValidationError::FileTooLarge {
            name: file.name().to_string(),
            size: file.size(),
            max: config.max_file_size,
        });
    }
    if !type_accepted(&config.accepted_types, &file.media_essence()) {
        return Err(ValidationError::UnsupportedType {
            name: file.name().to_string(),
            media_type: file.media_type().to_string(),
        });
    }
    Ok(())
}

fn type_accepted(accepted: &[String], essence: &str) -> bool {
    accepted.iter().any(|pattern| {
        let pattern = media_essence(pattern);
        match pattern.strip_suffix("/*") {
            Some(top) => essence
                .split_once('/')
                .map(|(t, _)| t == top)
                .unwrap_or(false),
            None => pattern == essence,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, media_type: &str, size: usize) -> SourceFile {
        SourceFile::new(name, media_type, vec![1u8; size])
    }

    #[test]
    fn test_admit_valid_batch() {
        let config = OrchestratorConfig::default();
        let files = vec![file("a.png", "image/png", 10), file("b.jpg", "image/jpeg", 10)];
        let admission = admit_batch(&config, files).unwrap();
        assert_eq!(admission.files.len(), 2);
        assert_eq!(admission.truncated, 0);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let config = OrchestratorConfig {
            max_batch_size: 2,
            ..Default::default()
        };
        let files = (0..3).map(|i| file(&format!("{}.png", i), "image/png", 1)).collect();
        let err = admit_batch(&config, files).unwrap_err();
        assert_eq!(err, ValidationError::BatchTooLarge { count: 3, max: 2 });
    }

    #[test]
    fn test_oversized_batch_truncated() {
        let config = OrchestratorConfig {
            max_batch_size: 2,
            batch_overflow: BatchOverflowPolicy::Truncate,
            ..Default::default()
        };
        let files = (0..5).map(|i| file(&format!("{}.png", i), "image/png", 1)).collect();
        let admission = admit_batch(&config, files).unwrap();
        assert_eq!(admission.truncated, 3);
        let names: Vec<_> = admission.files.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["0.png", "1.png"]);
    }

    #[test]
    fn test_bad_files_dropped_individually() {
        let config = OrchestratorConfig {
            max_file_size: 16,
            ..Default::default()
        };
        let files = vec![
            file("a.png", "image/png", 10),
            file("doc.pdf", "application/pdf", 10),
            file("big.jpg", "image/jpeg", 17),
            file("b.webp", "image/webp", 16),
            file("empty.gif", "image/gif", 0),
        ];
        let admission = admit_batch(&config, files).unwrap();

        let names: Vec<_> = admission.files.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["a.png", "b.webp"]);
        let reasons: Vec<_> = admission.rejected.iter().map(|e| e.reason()).collect();
        assert_eq!(reasons, vec!["unsupported_type", "file_too_large", "empty_file"]);
    }

    #[test]
    fn test_truncation_happens_before_file_checks() {
        let config = OrchestratorConfig {
            max_batch_size: 1,
            batch_overflow: BatchOverflowPolicy::Truncate,
            ..Default::default()
        };
        let files = vec![file("a.png", "image/png", 1), file("doc.pdf", "application/pdf", 1)];
        let admission = admit_batch(&config, files).unwrap();
        assert_eq!(admission.files.len(), 1);
        assert_eq!(admission.truncated, 1);
        assert!(admission.rejected.is_empty());
    }

    #[test]
    fn test_file_size_limit_is_inclusive() {
        let config = OrchestratorConfig {
            max_file_size: 16,
            ..Default::default()
        };
        assert!(check_file(&config, &file("a.png", "image/png", 16)).is_ok());
        let err = check_file(&config, &file("a.png", "image/png", 17)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::FileTooLarge {
                name: "a.png".to_string(),
                size: 17,
                max: 16
            }
        );
    }

    #[test]
    fn test_empty_file_rejected() {
        let config = OrchestratorConfig::default();
        let err = check_file(&config, &file("a.png", "image/png", 0)).unwrap_err();
        assert_eq!(err.reason(), "empty_file");
    }

    #[test]
    fn test_type_matching() {
        let accepted = vec!["image/png".to_string(), "IMAGE/JPEG".to_string()];
        assert!(type_accepted(&accepted, "image/png"));
        assert!(type_accepted(&accepted, "image/jpeg"));
        assert!(!type_accepted(&accepted, "image/gif"));

        let wildcard = vec!["image/*".to_string()];
        assert!(type_accepted(&wildcard, "image/avif"));
        assert!(!type_accepted(&wildcard, "text/plain"));
    }

    #[test]
    fn test_media_type_parameters_ignored() {
        let config = OrchestratorConfig::default();
        assert!(check_file(&config, &file("a.png", "image/png; charset=binary", 4)).is_ok());
    }
}
