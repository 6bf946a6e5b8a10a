//! Destination paths for downloaded media.

use std::path::{Path, PathBuf};

/// Sub-folder of an author directory that holds blob downloads.
pub const BLOB_DIR: &str = "_blob";

/// Separator substituted for whitespace and path separators in alt text.
const ALT_SEPARATOR: char = '-';

/// Longest alt-text prefix kept in a file name.
const MAX_ALT_CHARS: usize = 100;

/// Extension used when a MIME type has no subtype.
const FALLBACK_EXTENSION: &str = "bin";

/// Suffix of the in-progress file a download is written to before it is
/// renamed into place.
pub const PART_SUFFIX: &str = ".part";

/// Longest file name, in bytes, that common filesystems accept.
const MAX_FILE_NAME_BYTES: usize = 255;

/// Where one media item is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    pub file_name: String,
}

impl DownloadTarget {
    /// Full path of the file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Sibling path the download is streamed to before the rename.
    pub fn part_path(&self) -> PathBuf {
        self.dir.join(format!("{}{PART_SUFFIX}", self.file_name))
    }

    /// `<root>/<handle>/<alt>-<post-cid>-<NNN>.jpg`
    ///
    /// The alt part is shortened so the name, with [`PART_SUFFIX`] appended,
    /// stays within [`MAX_FILE_NAME_BYTES`].
    pub fn image(root: &Path, handle: &str, alt: &str, post_cid: &str, index: usize) -> Self {
        let suffix = format!("-{post_cid}-{index:03}.jpg");
        let budget = MAX_FILE_NAME_BYTES.saturating_sub(suffix.len() + PART_SUFFIX.len());

        let mut alt = sanitize_alt(alt);
        truncate_at_char_boundary(&mut alt, budget);

        Self {
            dir: root.join(handle),
            file_name: format!("{alt}{suffix}"),
        }
    }

    /// `<root>/<handle>/_blob/<post-cid>.<ext>`
    pub fn blob(root: &Path, handle: &str, post_cid: &str, mime_type: &str) -> Self {
        Self {
            dir: root.join(handle).join(BLOB_DIR),
            file_name: format!("{post_cid}.{}", extension_from_mime(mime_type)),
        }
    }
}

/// Make alt text usable as part of a file name.
pub fn sanitize_alt(alt: &str) -> String {
    alt.chars()
        .take(MAX_ALT_CHARS)
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                ALT_SEPARATOR
            } else {
                c
            }
        })
        .collect()
}

/// Cut `s` to at most `max_bytes` without splitting a character.
fn truncate_at_char_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= max_bytes)
        .last()
        .unwrap_or(0);
    s.truncate(end);
}

/// File extension from the MIME subtype (`video/mp4` → `mp4`).
pub fn extension_from_mime(mime_type: &str) -> &str {
    mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or_default().trim())
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or(FALLBACK_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_target() {
        let target = DownloadTarget::image(
            Path::new("files"),
            "alice.bsky.social",
            "a cat on a mat",
            "bafypost",
            7,
        );
        assert_eq!(
            target.path(),
            PathBuf::from("files/alice.bsky.social/a-cat-on-a-mat-bafypost-007.jpg")
        );
    }

    #[test]
    fn test_empty_alt_keeps_separator_layout() {
        let target = DownloadTarget::image(Path::new("files"), "bob.test", "", "bafy", 0);
        assert_eq!(target.file_name, "-bafy-000.jpg");
    }

    #[test]
    fn test_sanitize_alt() {
        assert_eq!(sanitize_alt("two\twords\nhere"), "two-words-here");
        assert_eq!(sanitize_alt("../../etc/passwd"), "..-..-etc-passwd");
        assert_eq!(sanitize_alt(&"x".repeat(500)).chars().count(), 100);
    }

    #[test]
    fn test_multibyte_alt_fits_file_name_limit() {
        let cid = "bafyreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku";
        let target =
            DownloadTarget::image(Path::new("files"), "bob.test", &"猫".repeat(120), cid, 3);

        let part_name = format!("{}{PART_SUFFIX}", target.file_name);
        assert!(part_name.len() <= MAX_FILE_NAME_BYTES, "{} bytes", part_name.len());
        let alt = target
            .file_name
            .strip_suffix(&format!("-{cid}-003.jpg"))
            .unwrap();
        assert_eq!(alt, "猫".repeat(60));
    }

    #[test]
    fn test_truncate_at_char_boundary() {
        let mut s = "aé猫".to_string();
        truncate_at_char_boundary(&mut s, 4);
        assert_eq!(s, "aé");

        let mut s = "猫".to_string();
        truncate_at_char_boundary(&mut s, 2);
        assert_eq!(s, "");

        let mut s = "short".to_string();
        truncate_at_char_boundary(&mut s, 100);
        assert_eq!(s, "short");
    }

    #[test]
    fn test_part_path() {
        let target = DownloadTarget::blob(Path::new("files"), "bob.test", "bafy", "video/mp4");
        assert_eq!(
            target.part_path(),
            PathBuf::from("files/bob.test/_blob/bafy.mp4.part")
        );
    }

    #[test]
    fn test_blob_target() {
        let target = DownloadTarget::blob(
            Path::new("files"),
            "alice.bsky.social",
            "bafypost",
            "video/mp4",
        );
        assert_eq!(
            target.path(),
            PathBuf::from("files/alice.bsky.social/_blob/bafypost.mp4")
        );
    }

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(extension_from_mime("video/mp4"), "mp4");
        assert_eq!(extension_from_mime("video/quicktime"), "quicktime");
        assert_eq!(extension_from_mime("video/webm; codecs=vp9"), "webm");
        assert_eq!(extension_from_mime("application"), "bin");
        assert_eq!(extension_from_mime("video/"), "bin");
    }
}
