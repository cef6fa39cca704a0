//! Account-path parsing: expand `"A:B:C"` into its ordered prefix array and
//! validate it against a book's `max_account_path`.

use crate::error::InvalidAccountPathError;

/// Split and validate an account path against `max_segments`.
///
/// Returns the individual segments in order. Every prefix of the path is
/// itself a valid, queryable account, so callers that need the prefix array
/// should go through [`prefixes`] instead.
pub fn split(path: &str, max_segments: usize) -> Result<Vec<&str>, InvalidAccountPathError> {
    if path.is_empty() {
        return Err(InvalidAccountPathError::Empty);
    }
    let segments: Vec<&str> = path.split(':').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(InvalidAccountPathError::EmptySegment);
    }
    if segments.len() > max_segments {
        return Err(InvalidAccountPathError::TooManySegments {
            found: segments.len(),
            max: max_segments,
        });
    }
    Ok(segments)
}

/// Decompose `"A:B:C"` into `["A", "A:B", "A:B:C"]`, preserving prefix order.
pub fn prefixes(path: &str, max_segments: usize) -> Result<Vec<String>, InvalidAccountPathError> {
    let segments = split(path, max_segments)?;
    Ok((1..=segments.len()).map(|n| segments[..n].join(":")).collect())
}

/// True when every segment count in `path` equals `max_segments` exactly,
/// used by the query compiler to decide between an equality match on
/// `account_path` and a membership match on `accounts`.
pub fn is_full_depth(path: &str, max_segments: usize) -> Result<bool, InvalidAccountPathError> {
    Ok(split(path, max_segments)?.len() == max_segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_decompose_in_order() {
        assert_eq!(
            prefixes("Assets:Cash:Checking", 3).unwrap(),
            vec!["Assets", "Assets:Cash", "Assets:Cash:Checking"]
        );
    }

    #[test]
    fn single_segment_prefix_is_itself() {
        assert_eq!(prefixes("Assets", 3).unwrap(), vec!["Assets"]);
    }

    #[test]
    fn empty_path_rejected() {
        assert_eq!(split("", 3).unwrap_err(), InvalidAccountPathError::Empty);
    }

    #[test]
    fn empty_segment_rejected() {
        assert_eq!(
            split("Assets::Cash", 3).unwrap_err(),
            InvalidAccountPathError::EmptySegment
        );
    }

    #[test]
    fn too_many_segments_rejected() {
        assert_eq!(
            split("A:B:C:D", 3).unwrap_err(),
            InvalidAccountPathError::TooManySegments { found: 4, max: 3 }
        );
    }

    #[test]
    fn full_depth_detection() {
        assert!(is_full_depth("A:B:C", 3).unwrap());
        assert!(!is_full_depth("A:B", 3).unwrap());
    }
}
