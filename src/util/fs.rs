use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling path used to stage `dst` before it is moved into place.
fn staging_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dst.with_file_name(format!(".{name}.{}.partial", uuid::Uuid::new_v4().simple()))
}

/// Replace `dst` with `content` without exposing a half-written file.
///
/// Readers of `dst` see either the previous contents or all of `content`.
/// The staging file is removed on every error path.
pub fn atomic_write(dst: &Path, content: &[u8]) -> Result<()> {
    let staging = staging_path(dst);
    let discard = |staging: &Path| {
        if let Err(e) = std::fs::remove_file(staging) {
            tracing::debug!(path = %staging.display(), error = %e, "Staging file not removed");
        }
    };

    // create_new refuses an existing entry, symlinks included
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging)
        .with_context(|| format!("Cannot stage {} next to its destination", dst.display()))?;

    if let Err(e) = file.write_all(content).and_then(|()| file.sync_all()) {
        drop(file);
        discard(&staging);
        return Err(e).with_context(|| {
            format!("Writing {} bytes for {} failed", content.len(), dst.display())
        });
    }
    drop(file);

    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            discard(&staging);
            return Err(e).with_context(|| format!("Cannot replace {}", dst.display()));
        }
    }

    if let Err(e) = std::fs::rename(&staging, dst) {
        discard(&staging);
        return Err(e).with_context(|| format!("Cannot move new contents into {}", dst.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_leftovers(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .count()
    }

    #[test]
    fn test_atomic_write_creates_and_replaces() {
        let dir = std::env::temp_dir().join("haber_atomic_write_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pack.json");

        atomic_write(&path, b"{\"a\":1}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}");

        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(staged_leftovers(&dir), 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_atomic_write_into_missing_directory_fails_cleanly() {
        let dir = std::env::temp_dir().join("haber_atomic_write_missing");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("en.json");

        let err = atomic_write(&path, b"{}").unwrap_err();
        assert!(err.to_string().contains("en.json"));
        assert!(!path.exists());
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let dst = Path::new("/tmp/packs/tr.json");
        let staging = staging_path(dst);
        assert_eq!(staging.parent(), dst.parent());
        let name = staging.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".tr.json."));
        assert!(name.ends_with(".partial"));
        assert_ne!(staging_path(dst), staging);
    }
}
