//! [`FsObjectStore`] — uploaded artwork kept in a local directory and served
//! back under `/files`.

use std::{
  io,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use davinci_core::object_store::ObjectStore;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

/// Stores each upload as `<sha256>-<random>.<ext>` under `root`.
///
/// The random suffix keeps identical uploads in separate files, so deleting
/// one submission's file never removes another's.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
  root:        PathBuf,
  /// URL prefix the files are reachable under, without a trailing slash.
  public_base: String,
}

fn extension(content_type: &str) -> &'static str {
  match content_type {
    "image/png" => "png",
    "image/jpeg" => "jpg",
    "image/gif" => "gif",
    "image/webp" => "webp",
    _ => "bin",
  }
}

impl FsObjectStore {
  /// Create `root` if needed. `public_base` is e.g.
  /// `https://davinci.example/files`.
  pub async fn open(root: impl Into<PathBuf>, public_base: &str) -> io::Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self {
      root,
      public_base: public_base.trim_end_matches('/').to_owned(),
    })
  }

  pub fn root(&self) -> &Path { &self.root }

  /// The file name behind `url`, if it is one of ours and well-formed.
  fn file_name<'a>(&self, url: &'a str) -> Option<&'a str> {
    let name = url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
    let valid = !name.is_empty()
      && !name.starts_with('.')
      && name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    valid.then_some(name)
  }
}

impl ObjectStore for FsObjectStore {
  type Error = io::Error;

  async fn put(&self, bytes: Bytes, content_type: &'static str) -> io::Result<String> {
    let digest = hex::encode(Sha256::digest(&bytes));
    let name = format!(
      "{digest}-{}.{}",
      Uuid::new_v4().simple(),
      extension(content_type)
    );

    // Write then rename so a half-written file is never served.
    let tmp = self.root.join(format!(".{name}.tmp"));
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, self.root.join(&name)).await?;

    tracing::debug!(%name, size = bytes.len(), "stored upload");
    Ok(format!("{}/{name}", self.public_base))
  }

  async fn delete(&self, url: &str) -> io::Result<bool> {
    let Some(name) = self.file_name(url) else {
      tracing::warn!(url, "refusing to delete a file outside the upload directory");
      return Ok(false);
    };
    match tokio::fs::remove_file(self.root.join(name)).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e),
    }
  }
}
