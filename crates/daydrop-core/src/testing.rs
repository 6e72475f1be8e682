use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

use daydrop_db::Database;
use daydrop_types::events::FeedEvent;
use daydrop_types::models::{DbId, UserRole};

use crate::error::CoreResult;
use crate::feed::{FeedSink, RecordingFeed};
use crate::Engine;

pub(crate) struct FailingFeed;

impl FeedSink for FailingFeed {
    fn publish(&self, event: FeedEvent) -> anyhow::Result<()> {
        anyhow::bail!("dispatcher unavailable for {}", event.name())
    }
}

pub(crate) struct Fixture {
    pub db: Arc<Database>,
    pub feed: Arc<RecordingFeed>,
    pub engine: Arc<Engine>,
    path: Option<PathBuf>,
}

impl Fixture {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Self::build(db, None, None)
    }

    pub fn with_feed(feed: Arc<dyn FeedSink>) -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Self::build(db, None, Some(feed))
    }

    /// File-backed store, for tests that hit it from several threads.
    pub fn on_disk() -> Self {
        let path = std::env::temp_dir().join(format!("daydrop-test-{}.db", uuid::Uuid::new_v4()));
        let db = Arc::new(Database::open(&path).unwrap());
        Self::build(db, Some(path), None)
    }

    fn build(db: Arc<Database>, path: Option<PathBuf>, feed: Option<Arc<dyn FeedSink>>) -> Self {
        let recording = Arc::new(RecordingFeed::default());
        let sink = feed.unwrap_or_else(|| recording.clone() as Arc<dyn FeedSink>);
        let engine = Arc::new(Engine::new(db.clone(), sink));
        Self {
            db,
            feed: recording,
            engine,
            path,
        }
    }

    pub fn user(&self, name: &str, is_private: bool) -> DbId {
        self.db.create_user(name, is_private, UserRole::User).unwrap().id
    }

    /// Run `op` on `threads` threads released at the same instant.
    pub fn race<T, F>(&self, threads: usize, op: F) -> Vec<CoreResult<T>>
    where
        T: Send + 'static,
        F: Fn(&Engine) -> CoreResult<T> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let engine = self.engine.clone();
                let op = op.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    op(&engine)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }
}

impl std::ops::Drop for Fixture {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            for suffix in ["", "-wal", "-shm"] {
                let mut p = path.clone().into_os_string();
                p.push(suffix);
                let _ = std::fs::remove_file(p);
            }
        }
    }
}
