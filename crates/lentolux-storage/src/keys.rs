//! Shared remote path layout for archive backends.
//!
//! Path format: `contents/{directory}/{basename}`, where the directory is fixed
//! per content type.

use lentolux_core::models::ContentType;

use crate::traits::{ArchiveError, ArchiveResult};

/// Root directory of every archived entry
pub const ARCHIVE_ROOT: &str = "contents";

/// Marker file created to initialise an empty directory
pub const DIRECTORY_MARKER: &str = ".gitkeep";

/// Archive directory for a content type
pub fn directory_for(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::DailyLife => "contents/감성적_일상_나눔",
        ContentType::Artistic => "contents/예술적_취향_나눔",
        ContentType::Philosophy => "contents/인용_및_철학",
        ContentType::WorkShowcase => "contents/작품_소개",
        ContentType::Interview => "contents/감성_인터뷰",
    }
}

/// Remote path for an artifact basename under the content type's directory.
pub fn archive_path(content_type: ContentType, basename: &str) -> ArchiveResult<String> {
    if basename.is_empty()
        || basename.contains('/')
        || basename.contains('\\')
        || basename == "."
        || basename == ".."
    {
        return Err(ArchiveError::InvalidPath(format!(
            "invalid artifact name '{}'",
            basename
        )));
    }
    Ok(format!("{}/{}", directory_for(content_type), basename))
}

/// Path of the marker file that initialises a directory
pub fn marker_path(directory: &str) -> String {
    format!("{}/{}", directory, DIRECTORY_MARKER)
}

/// Validate a remote path handed back by a caller before touching the store.
pub fn validate_remote_path(remote_path: &str) -> ArchiveResult<()> {
    let valid = remote_path.starts_with(&format!("{}/", ARCHIVE_ROOT))
        && !remote_path.contains("..")
        && !remote_path.contains('\\')
        && !remote_path.ends_with('/');
    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidPath(remote_path.to_string()))
    }
}

/// Last path segment of a remote path
pub fn basename(remote_path: &str) -> &str {
    remote_path.rsplit('/').next().unwrap_or(remote_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_content_type_has_distinct_directory() {
        let dirs: HashSet<&str> = ContentType::ALL.iter().map(|ct| directory_for(*ct)).collect();
        assert_eq!(dirs.len(), ContentType::ALL.len());
        for ct in ContentType::ALL {
            let segment = directory_for(ct)
                .strip_prefix("contents/")
                .expect("directory lives under contents/");
            assert!(!segment.is_empty());
            assert!(!segment.contains('/'));
        }
    }

    #[test]
    fn test_directory_matches_korean_label() {
        for ct in ContentType::ALL {
            assert_eq!(directory_for(ct), format!("contents/{}", ct.label()));
        }
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(
            archive_path(ContentType::DailyLife, "a_watermarked.png").unwrap(),
            "contents/감성적_일상_나눔/a_watermarked.png"
        );
        assert!(archive_path(ContentType::DailyLife, "").is_err());
        assert!(archive_path(ContentType::DailyLife, "../x").is_err());
        assert!(archive_path(ContentType::DailyLife, "..").is_err());
    }

    #[test]
    fn test_validate_remote_path() {
        assert!(validate_remote_path("contents/작품_소개/x.png").is_ok());
        assert!(validate_remote_path("/etc/passwd").is_err());
        assert!(validate_remote_path("contents/../secrets").is_err());
        assert!(validate_remote_path("other/x.png").is_err());
    }

    #[test]
    fn test_basename_and_marker() {
        assert_eq!(basename("contents/감성_인터뷰/v_watermarked.mp4"), "v_watermarked.mp4");
        assert_eq!(basename("plain"), "plain");
        assert_eq!(marker_path("contents/작품_소개"), "contents/작품_소개/.gitkeep");
    }
}
