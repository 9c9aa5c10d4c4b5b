//! Hash and integrity helpers.
//!
//! Batched round trips share one correlation id, so file `name`s are the
//! correlation key between a request's `files` array and the response's
//! `hashes`/`checkResults` array. These helpers re-align responses to
//! request order and reject partial or mismatched answers.

use crate::domain::error::SigningError;
use signing_types::entities::{FileIntegrityResult, FileToHash, HashedFile, SignedFileHash};

/// Align a hash response to the request's file order.
///
/// Every requested name must appear exactly once in the response; a
/// shorter response, a missing name, or a duplicated name is an
/// `IntegrityViolation` naming the offending files, never a partial
/// success.
pub fn align_hashes(
    files: &[FileToHash],
    hashes: &[HashedFile],
) -> Result<Vec<HashedFile>, SigningError> {
    if hashes.len() != files.len() {
        return Err(SigningError::IntegrityViolation(format!(
            "hash response covers {} of {} requested files",
            hashes.len(),
            files.len()
        )));
    }

    let mut aligned = Vec::with_capacity(files.len());
    for file in files {
        let mut matched = hashes.iter().filter(|h| h.name == file.name);
        match (matched.next(), matched.next()) {
            (Some(hash), None) => aligned.push(hash.clone()),
            (Some(_), Some(_)) => {
                return Err(SigningError::IntegrityViolation(format!(
                    "duplicate hash entries for file {}",
                    file.name
                )));
            }
            (None, _) => {
                return Err(SigningError::IntegrityViolation(format!(
                    "no hash returned for file {}",
                    file.name
                )));
            }
        }
    }
    Ok(aligned)
}

/// Align integrity check results to the request's file order.
///
/// Same matching rules as [`align_hashes`]: every signed file must have
/// exactly one verdict.
pub fn align_check_results(
    files: &[SignedFileHash],
    results: &[FileIntegrityResult],
) -> Result<Vec<FileIntegrityResult>, SigningError> {
    if results.len() != files.len() {
        return Err(SigningError::IntegrityViolation(format!(
            "integrity response covers {} of {} submitted files",
            results.len(),
            files.len()
        )));
    }

    let mut aligned = Vec::with_capacity(files.len());
    for file in files {
        let mut matched = results.iter().filter(|r| r.name == file.name);
        match (matched.next(), matched.next()) {
            (Some(result), None) => aligned.push(result.clone()),
            (Some(_), Some(_)) => {
                return Err(SigningError::IntegrityViolation(format!(
                    "duplicate check results for file {}",
                    file.name
                )));
            }
            (None, _) => {
                return Err(SigningError::IntegrityViolation(format!(
                    "no check result for file {}",
                    file.name
                )));
            }
        }
    }
    Ok(aligned)
}

/// Names of files whose integrity check failed, in result order.
#[must_use]
pub fn failing_files(results: &[FileIntegrityResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| !r.checked)
        .map(|r| r.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FileToHash {
        FileToHash {
            name: name.into(),
            file: format!("{name}-bytes"),
            is_require_internal_sign: None,
        }
    }

    fn hashed(name: &str, hash: &str) -> HashedFile {
        HashedFile {
            name: name.into(),
            hash: hash.into(),
        }
    }

    fn signed(name: &str) -> SignedFileHash {
        SignedFileHash {
            name: name.into(),
            hash: format!("{name}-hash"),
            signature: format!("{name}-sig"),
        }
    }

    fn verdict(name: &str, checked: bool) -> FileIntegrityResult {
        FileIntegrityResult {
            name: name.into(),
            checked,
        }
    }

    #[test]
    fn test_align_hashes_preserves_request_order() {
        let files = vec![file("a"), file("b")];
        // Response arrives reordered
        let hashes = vec![hashed("b", "h2"), hashed("a", "h1")];

        let aligned = align_hashes(&files, &hashes).unwrap();
        assert_eq!(aligned[0].name, "a");
        assert_eq!(aligned[0].hash, "h1");
        assert_eq!(aligned[1].name, "b");
    }

    #[test]
    fn test_partial_hash_response_is_integrity_violation() {
        let files = vec![file("a"), file("b")];
        let hashes = vec![hashed("a", "h1")];

        let err = align_hashes(&files, &hashes).unwrap_err();
        assert!(matches!(err, SigningError::IntegrityViolation(_)));
    }

    #[test]
    fn test_wrong_name_is_integrity_violation() {
        let files = vec![file("a")];
        let hashes = vec![hashed("z", "h1")];

        assert!(matches!(
            align_hashes(&files, &hashes),
            Err(SigningError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_duplicate_name_is_integrity_violation() {
        let files = vec![file("a"), file("b")];
        let hashes = vec![hashed("a", "h1"), hashed("a", "h1")];

        assert!(matches!(
            align_hashes(&files, &hashes),
            Err(SigningError::IntegrityViolation(_))
        ));
    }

    #[test]
    fn test_align_check_results() {
        let files = vec![signed("a"), signed("b")];
        let results = vec![verdict("b", false), verdict("a", true)];

        let aligned = align_check_results(&files, &results).unwrap();
        assert_eq!(aligned[0].name, "a");
        assert!(aligned[0].checked);
        assert!(!aligned[1].checked);
    }

    #[test]
    fn test_failing_files_reports_unchecked_names() {
        let results = vec![verdict("a", true), verdict("b", false)];
        assert_eq!(failing_files(&results), vec!["b".to_string()]);

        let all_good = vec![verdict("a", true)];
        assert!(failing_files(&all_good).is_empty());
    }
}
