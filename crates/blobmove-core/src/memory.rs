//! In-memory store implementing both sides of a transfer.
//!
//! Backs the engine and activity tests: supports injecting a one-shot
//! mid-read failure for a given key and an optional per-operation latency with
//! key-dependent jitter, so concurrent runs interleave differently from the
//! enumeration order.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parking_lot::Mutex;

use crate::errors::{ActivityError, ActivityResult};
use crate::store::{ByteStream, DestinationStore, ObjectRef, SourceStore};

pub struct MemoryStore {
    container: String,
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_reads: Mutex<HashSet<String>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            objects: Mutex::new(BTreeMap::new()),
            fail_reads: Mutex::new(HashSet::new()),
            latency: None,
        }
    }

    /// Sleep before every operation, jittered per key so concurrent tasks
    /// complete out of enumeration order.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.objects.lock().insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.lock().get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// Make the next read of `path` fail partway through the stream.
    pub fn fail_next_read(&self, path: impl Into<String>) {
        self.fail_reads.lock().insert(path.into());
    }

    async fn simulate_latency(&self, key: &str) {
        if let Some(base) = self.latency {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            let jitter = hasher.finish() % (base.as_millis().max(1) as u64);
            tokio::time::sleep(base + Duration::from_millis(jitter)).await;
        }
    }
}

#[async_trait::async_trait]
impl SourceStore for MemoryStore {
    async fn list(&self, prefix: &str) -> ActivityResult<Vec<ObjectRef>> {
        self.simulate_latency(prefix).await;
        let objects = self.objects.lock();
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, content)| ObjectRef {
                container: self.container.clone(),
                path: key.clone(),
                size_hint: Some(content.len() as u64),
            })
            .collect())
    }

    async fn open_read_stream(&self, object: &ObjectRef) -> ActivityResult<ByteStream> {
        self.simulate_latency(&object.path).await;
        let content = self.get(&object.path).ok_or_else(|| {
            ActivityError::not_found(format!("{}: object no longer exists", object.path))
        })?;

        if self.fail_reads.lock().remove(&object.path) {
            // Yield part of the object, then fail, like a dropped connection.
            let partial = content.slice(..content.len() / 2);
            let path = object.path.clone();
            let stream = futures::stream::iter(vec![
                Ok(partial),
                Err(ActivityError::connection(format!(
                    "{path}: read interrupted: injected failure"
                ))),
            ]);
            return Ok(Box::pin(stream));
        }

        Ok(Box::pin(futures::stream::once(async move { Ok(content) })))
    }

    async fn delete_prefix(&self, prefix: &str) -> ActivityResult<u64> {
        self.simulate_latency(prefix).await;
        let mut objects = self.objects.lock();
        let doomed: Vec<String> = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in &doomed {
            objects.remove(key);
        }
        Ok(doomed.len() as u64)
    }
}

#[async_trait::async_trait]
impl DestinationStore for MemoryStore {
    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> ActivityResult<u64> {
        self.simulate_latency(path).await;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let written = buf.len() as u64;
        self.objects.lock().insert(path.to_string(), buf.freeze());
        Ok(written)
    }

    async fn exists(&self, path: &str) -> ActivityResult<bool> {
        Ok(self.objects.lock().contains_key(path))
    }

    async fn delete(&self, path: &str) -> ActivityResult<()> {
        self.objects.lock().remove(path);
        Ok(())
    }
}
