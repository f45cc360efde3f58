//! Content differ
//!
//! Decides which tracked files need to be embedded in the next prompt: a
//! file is included when it has never been submitted or its content
//! changed since it last was.

use crate::session::WorkingFile;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`
///
/// # Examples
///
/// ```
/// use cir::context::checksum;
///
/// assert_eq!(
///     checksum(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Read every tracked file and return those whose content must be sent
///
/// Each returned entry carries the freshly read content and its new
/// checksum in `last_submitted_checksum`. The input is not modified; the
/// caller commits the checksums once the prompt is built. Files that
/// cannot be read are skipped with a warning. Output order follows input
/// order.
pub async fn files_to_submit(files: &[WorkingFile]) -> Vec<WorkingFile> {
    let mut changed = Vec::new();

    for file in files {
        let bytes = match tokio::fs::read(&file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping unreadable context file {}: {}", file.path.display(), e);
                continue;
            }
        };

        let digest = checksum(&bytes);
        if file.last_submitted_checksum.as_deref() == Some(digest.as_str()) {
            tracing::debug!("Unchanged since last submission: {}", file.path.display());
            continue;
        }

        changed.push(WorkingFile {
            path: file.path.clone(),
            last_submitted_checksum: Some(digest),
            content: Some(String::from_utf8_lossy(&bytes).into_owned()),
        });
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_file, temp_dir};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> WorkingFile {
        WorkingFile::new(create_test_file(dir, name, body))
    }

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = checksum(b"hello");
        assert_eq!(a, checksum(b"hello"));
        assert_ne!(a, checksum(b"hello!"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_never_submitted_file_is_included_with_content() {
        let dir = temp_dir();
        let file = write(&dir, "a.txt", "alpha");

        let out = files_to_submit(std::slice::from_ref(&file)).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content.as_deref(), Some("alpha"));
        assert_eq!(out[0].last_submitted_checksum, Some(checksum(b"alpha")));
        // The input is left alone
        assert!(file.last_submitted_checksum.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_file_is_omitted_and_changed_file_included() {
        let dir = temp_dir();
        let mut same = write(&dir, "same.txt", "one");
        same.last_submitted_checksum = Some(checksum(b"one"));
        let mut edited = write(&dir, "edited.txt", "two, edited");
        edited.last_submitted_checksum = Some(checksum(b"two"));

        let out = files_to_submit(&[same, edited.clone()]).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, edited.path);
        assert_eq!(out[0].content.as_deref(), Some("two, edited"));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let dir = temp_dir();
        let missing = WorkingFile::new(dir.path().join("gone.txt"));
        let present = write(&dir, "here.txt", "x");

        let out = files_to_submit(&[missing, present.clone()]).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, present.path);
    }

    #[tokio::test]
    async fn test_output_preserves_input_order() {
        let dir = temp_dir();
        let files = vec![
            write(&dir, "c.txt", "c"),
            write(&dir, "a.txt", "a"),
            write(&dir, "b.txt", "b"),
        ];

        let out = files_to_submit(&files).await;
        let names: Vec<_> = out
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
    }
}
