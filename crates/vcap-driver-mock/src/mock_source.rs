//! Simulated upstream frame source.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

use vcap_core::FrameSource;

/// Upstream source with call counters and one-shot failure injection.
#[derive(Debug, Default)]
pub struct MockFrameSource {
    streaming: AtomicBool,
    start_calls: AtomicU32,
    stop_calls: AtomicU32,
    fail_next_start: AtomicBool,
    fail_next_stop: AtomicBool,
}

impl MockFrameSource {
    /// Create a source that accepts every transition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next start request fail.
    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Make the next stop request fail.
    pub fn fail_next_stop(&self) {
        self.fail_next_stop.store(true, Ordering::SeqCst);
    }

    /// Whether the source believes it is producing frames.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Number of start requests received.
    #[must_use]
    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of stop requests received.
    #[must_use]
    pub fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn set_streaming(&self, enable: bool) -> Result<()> {
        if enable {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next_start.swap(false, Ordering::SeqCst) {
                bail!("injected source start failure");
            }
        } else {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next_stop.swap(false, Ordering::SeqCst) {
                bail!("injected source stop failure");
            }
        }
        self.streaming.store(enable, Ordering::SeqCst);
        debug!(enable, "mock source streaming transition");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_and_counters() {
        let source = MockFrameSource::new();
        assert!(!source.is_streaming());

        source.set_streaming(true).await.unwrap();
        assert!(source.is_streaming());
        source.set_streaming(false).await.unwrap();
        assert!(!source.is_streaming());

        assert_eq!(source.start_calls(), 1);
        assert_eq!(source.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_injected_start_failure_is_one_shot() {
        let source = MockFrameSource::new();
        source.fail_next_start();

        assert!(source.set_streaming(true).await.is_err());
        assert!(!source.is_streaming());

        // The failure does not stick.
        source.set_streaming(true).await.unwrap();
        assert!(source.is_streaming());
    }
}
