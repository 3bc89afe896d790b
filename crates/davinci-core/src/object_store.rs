//! The `ObjectStore` trait — binary storage for uploaded artwork.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Mutex, PoisonError},
};

use bytes::Bytes;
use uuid::Uuid;

/// Stores artwork files and hands back a publicly retrievable URL.
pub trait ObjectStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `bytes` and return the public URL they can be read from.
  fn put(
    &self,
    bytes: Bytes,
    content_type: &'static str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Remove the object behind `url`. Returns `false` if nothing was stored
  /// there.
  fn delete<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

/// A process-local object store — useful for testing.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
  objects: Mutex<HashMap<String, (Bytes, &'static str)>>,
}

impl MemoryObjectStore {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, url: &str) -> Option<(Bytes, &'static str)> {
    self
      .objects
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(url)
      .cloned()
  }

  pub fn len(&self) -> usize {
    self.objects.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl ObjectStore for MemoryObjectStore {
  type Error = Infallible;

  async fn put(&self, bytes: Bytes, content_type: &'static str) -> Result<String, Infallible> {
    let url = format!("memory://{}", Uuid::new_v4());
    self
      .objects
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(url.clone(), (bytes, content_type));
    Ok(url)
  }

  async fn delete(&self, url: &str) -> Result<bool, Infallible> {
    Ok(
      self
        .objects
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(url)
        .is_some(),
    )
  }
}
