//! Collaborator contracts consumed by the capture engine.
//!
//! These traits describe the two external parties the engine talks to while
//! starting and stopping a stream. Both are async and may block internally
//! (bus transactions, topology bookkeeping), so the engine only ever calls
//! them from the caller context, never from the interrupt path.
//!
//! Implementations use `anyhow::Result` so drivers can attach whatever
//! context they have; the engine maps failures into [`crate::CaptureError`]
//! at the call site.

use anyhow::Result;
use async_trait::async_trait;

/// Opaque token for an acquired pipeline resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Upstream producer of frames (a sensor, a test pattern generator).
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Ask the source to start or stop producing frames.
    ///
    /// Starting may fail and the engine unwinds; stopping is best-effort and
    /// failures are only logged.
    async fn set_streaming(&self, enable: bool) -> Result<()>;
}

/// Manages the external pipeline/topology resource held while streaming.
#[async_trait]
pub trait PipelineController: Send + Sync {
    /// Acquire the resource for the duration of a streaming session.
    async fn acquire(&self) -> Result<PipelineHandle>;

    /// Release a previously acquired resource. Infallible by contract:
    /// release is part of teardown paths that must always complete.
    async fn release(&self, handle: PipelineHandle);
}
