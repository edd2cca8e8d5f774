// Scripted in-memory object store shared by the integration tests

use anyhow::{bail, Result};
use async_trait::async_trait;
use bucketsync::fs::{ByteStream, ListPage, ObjectStore, PutRequest};
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Object store backed by a sorted map.
///
/// Keys listed in `fail_puts` / `fail_gets` fail on purpose; every call is
/// counted so tests can assert how much work a run attempted.
#[derive(Default)]
pub struct FakeStore {
    pub objects: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
    pub fail_puts: HashSet<String>,
    pub fail_gets: HashSet<String>,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub lists: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_puts(keys: &[&str]) -> Self {
        Self {
            fail_puts: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_objects(objects: &[(&str, &[u8])]) -> Self {
        let store = Self::default();
        store.insert_all(objects);
        store
    }

    pub fn insert_all(&self, objects: &[(&str, &[u8])]) {
        let mut map = self.objects.lock().unwrap();
        for (key, data) in objects {
            map.insert(key.to_string(), ("text/plain".to_string(), data.to_vec()));
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(_, d)| d.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(t, _)| t.clone())
    }

    pub fn transfer_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst) + self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(&self, request: PutRequest) -> Result<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Bytes> = request.body.try_collect().await?;
        if self.fail_puts.contains(&request.key) {
            bail!("injected put failure for {}", request.key);
        }

        self.objects
            .lock()
            .unwrap()
            .insert(request.key.clone(), (request.content_type, chunks.concat()));
        Ok(format!("https://fake.test/{}", request.key))
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.contains(key) {
            bail!("injected get failure for {}", key);
        }
        let Some(data) = self.content(key) else {
            bail!("no such key: {}", key);
        };

        // Hand the body out in small chunks to exercise streaming
        let chunks: Vec<std::io::Result<Bytes>> = data
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let map = self.objects.lock().unwrap();
        let keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| continuation.map_or(true, |after| k.as_str() > after))
            .take(page_size + 1)
            .cloned()
            .collect();

        let more = keys.len() > page_size;
        let keys: Vec<String> = keys.into_iter().take(page_size).collect();
        let next_token = if more { keys.last().cloned() } else { None };
        Ok(ListPage { keys, next_token })
    }

    fn bucket(&self) -> &str {
        "fake"
    }
}

/// Create files (relative path, content) under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}
