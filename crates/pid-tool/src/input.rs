//! Reading identities and payloads, writing results.
//!
//! Identity arguments are either a literal identity on the command line or a
//! path to a file containing one. Payloads are read whole into memory, up to
//! the configured limit.

use std::path::{Path, PathBuf};

use pid_crypto::Identity;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zeroize::Zeroizing;

/// Literal identities are longer than this.
pub const LITERAL_MIN_LEN: usize = 32;
/// Position of the first field separator in a literal identity.
pub const LITERAL_SEPARATOR_INDEX: usize = 10;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Identity argument invalid or file unreadable: {0}")]
    InvalidIdentity(String),

    #[error("{} is not readable: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Could not write {}: {source}", path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// True when `arg` should be parsed as an identity rather than a path.
pub fn is_literal_identity(arg: &str) -> bool {
    arg.len() > LITERAL_MIN_LEN && arg.as_bytes().get(LITERAL_SEPARATOR_INDEX) == Some(&b':')
}

/// Name to use for `arg` in messages. Literal identities may carry a
/// private key and are never echoed.
pub fn describe_identity_arg(arg: &str) -> String {
    if is_literal_identity(arg) {
        "<literal identity>".to_string()
    } else {
        arg.to_string()
    }
}

/// Load an identity from a literal argument or from the file it names.
pub async fn load_identity(arg: &str) -> Result<Identity, InputError> {
    let invalid = || InputError::InvalidIdentity(describe_identity_arg(arg));

    let identity = if is_literal_identity(arg) {
        Identity::from_text(arg).map_err(|_| invalid())?
    } else {
        let text = Zeroizing::new(tokio::fs::read_to_string(arg).await.map_err(|_| invalid())?);
        Identity::from_text(&text).map_err(|_| invalid())?
    };

    tracing::debug!(
        address = %identity.address(),
        has_private = identity.has_private(),
        "Loaded identity"
    );
    Ok(identity)
}

/// Read all of `path`, or standard input when `path` is `None`.
pub async fn read_input(path: Option<&Path>, limit: u64) -> Result<Vec<u8>, InputError> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|source| InputError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
            read_limited(file, limit).await
        }
        None => read_limited(tokio::io::stdin(), limit).await,
    }
}

/// Read `reader` to the end into one buffer, failing past `limit` bytes.
pub async fn read_limited<R: AsyncRead + Unpin>(reader: R, limit: u64) -> Result<Vec<u8>, InputError> {
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf).await?;
    if buf.len() as u64 > limit {
        return Err(InputError::TooLarge { limit });
    }
    tracing::trace!(bytes = buf.len(), "Read input");
    Ok(buf)
}

/// Write `data` to `path`, or standard output when `path` is `None`.
pub async fn write_output(path: Option<&Path>, data: &[u8]) -> Result<(), InputError> {
    match path {
        Some(path) => tokio::fs::write(path, data)
            .await
            .map_err(|source| InputError::Unwritable {
                path: path.to_path_buf(),
                source,
            }),
        None => write_to(tokio::io::stdout(), data).await,
    }
}

/// Write exactly `data` to `writer` and flush it.
pub async fn write_to<W: AsyncWrite + Unpin>(mut writer: W, data: &[u8]) -> Result<(), InputError> {
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}
