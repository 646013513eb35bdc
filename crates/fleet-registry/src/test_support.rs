//! Channel test doubles shared by this crate's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::channel::Channel;

/// Channel double that records everything sent to it and can be closed.
pub(crate) struct RecordingChannel {
    sent: Mutex<Vec<String>>,
    open: AtomicBool,
}

impl RecordingChannel {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        })
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Relaxed);
    }

    /// Wire tags of every received message, in order.
    pub(crate) fn received_types(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|json| {
                let val: serde_json::Value = serde_json::from_str(json).unwrap();
                val["type"].as_str().unwrap().to_owned()
            })
            .collect()
    }

    /// Every received envelope, parsed.
    pub(crate) fn received_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .iter()
            .map(|json| serde_json::from_str(json).unwrap())
            .collect()
    }
}

impl Channel for RecordingChannel {
    fn send(&self, message: Arc<String>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.sent.lock().push((*message).clone());
        true
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}
