//! Storage of uploaded decks.

use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

const FALLBACK_NAME: &str = "upload.pptx";

/// Reduce a client-supplied filename to a safe ASCII name.
///
/// Accents are folded to ASCII, path separators and whitespace become
/// underscores, anything outside `[A-Za-z0-9._-]` is dropped and leading
/// dots or underscores are stripped.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(|c| c.is_ascii()).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Random lowercase hex token of `len` characters (at most 32).
pub fn new_token(len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..len.min(hex.len())].to_string()
}

/// Write an upload to `dir` as `<token>__<safe name>` and return its path.
pub async fn save_upload(dir: &Path, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}__{}", new_token(8), secure_filename(filename)));
    tokio::fs::write(&path, data).await?;
    log::debug!("Saved upload {} ({} bytes)", path.display(), data.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool deck.pptx"), "My_cool_deck.pptx");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("Präsentation (final).pptx"), "Prasentation_final.pptx");
        assert_eq!(secure_filename("C:\\Users\\me\\deck.pptx"), "C_Users_me_deck.pptx");
        assert_eq!(secure_filename("日本語.pptx"), "pptx");
        assert_eq!(secure_filename("..."), FALLBACK_NAME);
        assert_eq!(secure_filename(""), FALLBACK_NAME);
    }

    #[test]
    fn test_new_token() {
        let token = new_token(8);
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_token(10), new_token(10));
        assert_eq!(new_token(64).len(), 32);
    }

    #[tokio::test]
    async fn test_save_upload() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let path = save_upload(&uploads, "deck one.pptx", b"PK\x03\x04data")
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("__deck_one.pptx"));
        assert_eq!(name.len(), 8 + 2 + "deck_one.pptx".len());
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04data");
    }
}
