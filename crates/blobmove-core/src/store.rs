//! Store traits shared by every backend.
//!
//! A source is a flat, prefix-addressed object store; a destination is a
//! hierarchical store addressed by path. Both validate connectivity when they
//! are opened, so configuration mistakes surface before the first transfer
//! rather than mid-batch.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::errors::ActivityResult;

/// Owned stream of object bytes. The holder must consume or drop it; dropping
/// releases the underlying handle on every exit path.
pub type ByteStream = Pin<Box<dyn Stream<Item = ActivityResult<Bytes>> + Send>>;

/// One transferable unit produced by enumeration. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Container (or equivalent namespace) the object lives in.
    pub container: String,
    /// Full key of the object within its container, `/`-separated.
    pub path: String,
    /// Size reported by the listing, when the backend provides one.
    pub size_hint: Option<u64>,
}

impl ObjectRef {
    /// Key with `prefix` stripped, leading separators removed. Empty when the
    /// object's key equals the prefix itself. Prefix matching is plain string
    /// prefix matching, the same rule listing uses.
    pub fn relative_name(&self, prefix: &str) -> &str {
        self.path
            .strip_prefix(prefix)
            .unwrap_or(&self.path)
            .trim_start_matches('/')
    }
}

/// Read side of a transfer.
///
/// `list` is finite and restartable: a fresh call re-lists. The listing and a
/// later read are not transactionally consistent; an object may vanish in
/// between, which `open_read_stream` reports as `NotFound`.
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    /// Flat recursive listing of every object whose key starts with `prefix`,
    /// in the backend's native listing order.
    async fn list(&self, prefix: &str) -> ActivityResult<Vec<ObjectRef>>;

    /// Open a byte stream for one listed object. The caller owns the stream.
    async fn open_read_stream(&self, object: &ObjectRef) -> ActivityResult<ByteStream>;

    /// Delete every object under `prefix`. Returns how many were removed.
    /// Used by move-style deployments after a successful copy.
    async fn delete_prefix(&self, prefix: &str) -> ActivityResult<u64>;
}

/// Write side of a transfer.
#[async_trait::async_trait]
pub trait DestinationStore: Send + Sync {
    /// Fully consume `stream` and create or overwrite the object at `path`.
    /// Returns the number of bytes written.
    async fn write_stream(&self, path: &str, stream: ByteStream) -> ActivityResult<u64>;

    /// Whether an object exists at `path`.
    async fn exists(&self, path: &str) -> ActivityResult<bool>;

    /// Remove the object at `path`. Succeeds as a no-op when already absent.
    async fn delete(&self, path: &str) -> ActivityResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(path: &str) -> ObjectRef {
        ObjectRef {
            container: "data".into(),
            path: path.into(),
            size_hint: None,
        }
    }

    #[test]
    fn relative_name_strips_prefix_and_separator() {
        assert_eq!(object("in/2020/a.txt").relative_name("in"), "2020/a.txt");
        assert_eq!(object("in/2020/a.txt").relative_name("in/"), "2020/a.txt");
    }

    #[test]
    fn relative_name_is_empty_when_key_equals_prefix() {
        assert_eq!(object("in/report.csv").relative_name("in/report.csv"), "");
    }

    #[test]
    fn relative_name_with_empty_prefix_is_full_key() {
        assert_eq!(object("a/b.txt").relative_name(""), "a/b.txt");
    }
}
