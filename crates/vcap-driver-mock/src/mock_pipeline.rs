//! Simulated pipeline resource manager.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use vcap_core::{PipelineController, PipelineHandle};

/// Pipeline resource manager tracking acquire/release balance.
#[derive(Debug, Default)]
pub struct MockPipeline {
    next_handle: AtomicU64,
    held: Mutex<Vec<PipelineHandle>>,
    acquire_calls: AtomicU64,
    release_calls: AtomicU64,
    fail_next_acquire: AtomicBool,
}

impl MockPipeline {
    /// Create a manager with no resources held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next acquire request fail.
    pub fn fail_next_acquire(&self) {
        self.fail_next_acquire.store(true, Ordering::SeqCst);
    }

    /// Number of handles currently outstanding.
    #[must_use]
    pub fn held(&self) -> usize {
        self.held.lock().len()
    }

    /// Number of acquire requests received (including failed ones).
    #[must_use]
    pub fn acquire_calls(&self) -> u64 {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// Number of release requests received.
    #[must_use]
    pub fn release_calls(&self) -> u64 {
        self.release_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineController for MockPipeline {
    async fn acquire(&self) -> Result<PipelineHandle> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_acquire.swap(false, Ordering::SeqCst) {
            bail!("injected pipeline acquire failure");
        }
        let handle = PipelineHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.held.lock().push(handle);
        debug!(?handle, "mock pipeline acquired");
        Ok(handle)
    }

    async fn release(&self, handle: PipelineHandle) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        let mut held = self.held.lock();
        if let Some(position) = held.iter().position(|h| *h == handle) {
            held.remove(position);
            debug!(?handle, "mock pipeline released");
        } else {
            debug!(?handle, "release of unknown pipeline handle");
        }
    }
}
