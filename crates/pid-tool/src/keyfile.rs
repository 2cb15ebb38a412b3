//! Secret identity files.
//!
//! Secrets are written atomically through a temporary file in the same
//! directory. On Unix the file is created with the configured permission
//! bits so the secret is never readable by others, even briefly.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pid_crypto::Identity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("Refusing to overwrite existing file {}", .0.display())]
    Exists(PathBuf),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write `identity` including its private key to `path`.
///
/// Fails if `path` already exists, including when another process creates
/// it while the secret is being written.
pub fn write_secret(path: &Path, identity: &Identity, mode: u32) -> Result<(), KeyFileError> {
    if path.exists() {
        return Err(KeyFileError::Exists(path.to_path_buf()));
    }
    let text = identity.to_text(true);
    write_new(path, text.as_bytes(), mode)?;

    tracing::info!(
        address = %identity.address(),
        path = %path.display(),
        "Wrote secret identity"
    );
    Ok(())
}

/// Write `contents` to a uniquely named temporary file next to `path`, then
/// move it into place without replacing anything already there.
fn write_new(path: &Path, contents: &[u8], mode: u32) -> Result<(), KeyFileError> {
    let write_error = |source| KeyFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".pid-secret-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(mode));
    }
    #[cfg(not(unix))]
    let _ = mode;

    // the temporary file is removed on drop unless persisted
    let mut temp = builder.tempfile_in(dir).map_err(write_error)?;
    temp.write_all(contents).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;

    temp.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            KeyFileError::Exists(path.to_path_buf())
        } else {
            write_error(e.error)
        }
    })?;
    Ok(())
}
