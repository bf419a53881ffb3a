//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use devmount::config::{Config, LogLevel};
use devmount::engine::{Engine, EngineError, MountPoints, MountRegistry};
use devmount::lifecycle::{EventLoop, Shared};
use devmount::observability::{CloseFn, Logger};

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Load a config document from a fresh temp directory.
pub fn load_config(contents: &str) -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "devmount.json", contents);
    let mut config = Config::create();
    config.load(&path).unwrap();
    config
}

/// In-memory log sink.
#[derive(Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Index of the first line containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines().iter().position(|line| line.contains(needle))
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logger writing into a [`Buffer`].
pub fn memory_logger(level: LogLevel) -> (Shared<Logger>, Buffer) {
    let buffer = Buffer::default();
    let logger = Logger::create(level, Some(Box::new(buffer.clone())), None).unwrap();
    (logger, buffer)
}

/// Close function counting its invocations.
pub fn spy_close() -> (CloseFn, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let close: CloseFn = Box::new(move |mut sink| {
        counter.fetch_add(1, Ordering::SeqCst);
        sink.flush()
    });
    (close, calls)
}

/// Engine recording the mount table as it was when attached.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    pub mounts: MountPoints,
    pub attached_with: Arc<Mutex<Option<Vec<String>>>>,
}

impl RecordingEngine {
    pub fn attached_paths(&self) -> Option<Vec<String>> {
        self.attached_with.lock().unwrap().clone()
    }
}

impl Engine for RecordingEngine {
    fn mount_points(&self) -> Arc<dyn MountRegistry> {
        Arc::new(self.mounts.clone())
    }

    fn attach(&mut self, _event_loop: &EventLoop) -> Result<(), EngineError> {
        *self.attached_with.lock().unwrap() = Some(self.mounts.paths());
        Ok(())
    }
}

/// Engine whose attach always fails.
#[derive(Clone, Default)]
pub struct FailingEngine {
    pub mounts: MountPoints,
}

impl Engine for FailingEngine {
    fn mount_points(&self) -> Arc<dyn MountRegistry> {
        Arc::new(self.mounts.clone())
    }

    fn attach(&mut self, _event_loop: &EventLoop) -> Result<(), EngineError> {
        Err(EngineError::Attach("device backend unavailable".into()))
    }
}
