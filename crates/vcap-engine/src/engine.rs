//! Streaming lifecycle controller.
//!
//! # Locking
//!
//! Two locks with strictly separated roles:
//!
//! - `dma` (`parking_lot::Mutex`): protects the (pending queue, slot
//!   bindings, sequence counter) triple shared with the interrupt path.
//!   Held only for O(1) pointer/index work, never across `.await` or any
//!   blocking call.
//! - `control` (`tokio::sync::Mutex`): serializes `start`/`stop`/
//!   `set_format` against concurrent callers. These operations perform
//!   blocking collaborator calls and are never invoked from the interrupt
//!   context.
//!
//! Completed buffers leave the engine on an unbounded channel so the
//! interrupt path hands them off without waiting on the consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vcap_core::format::{try_format, ImageFormat, NegotiatedFormat};
use vcap_core::regs::{
    cfg_value, BUF_CTRL_DBE, CPT_VIDEO_START, INT_FRM_DONE, REG_BUF_CTRL, REG_BUF_LEN, REG_CFG,
    REG_CPT_CTRL, REG_INT_EN, REG_INT_STA, REG_WIN_H, REG_WIN_W,
};
use vcap_core::{
    BufferId, CaptureBuffer, CaptureError, CompletedBuffer, CompletionStatus, FrameSource,
    PipelineController, PipelineHandle, RegisterBlock, Result, SLOT_COUNT,
};

use crate::config::CaptureConfig;
use crate::queue::PendingQueue;
use crate::slots::SlotBank;

/// Stream state owned by the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No capture in progress; slot and interrupt machinery quiescent.
    Idle,
    /// The device is capturing and the interrupt-driven flip is active.
    Streaming,
}

/// Pipeline state shared with the interrupt path, under one lock.
///
/// Queue and slot bindings must be updated as one atomic unit: capacity
/// accounting and the flip protocol depend on both.
pub(crate) struct DmaState {
    pub(crate) queue: PendingQueue,
    pub(crate) slots: SlotBank,
    pub(crate) sequence: u32,
}

/// State touched only by caller-context lifecycle operations.
struct ControlState {
    pipeline_handle: Option<PipelineHandle>,
}

/// Point-in-time view of engine internals, for diagnostics and tests.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    /// Current stream state.
    pub state: StreamState,
    /// Identifiers of queued buffers, oldest first.
    pub queued: Vec<BufferId>,
    /// Identifier of the buffer bound to each hardware slot.
    pub slots: [Option<BufferId>; SLOT_COUNT],
    /// Current frame sequence counter.
    pub sequence: u32,
    /// Lifetime count of accepted submissions.
    pub submitted: u64,
}

/// Double-buffered capture engine.
///
/// One instance owns one capture pipeline: its register access handle, its
/// buffer pool and slot bindings, and its collaborator handles. There is no
/// process-wide state; independent pipelines are independent engines.
pub struct CaptureEngine {
    pub(crate) regs: Arc<dyn RegisterBlock>,
    source: Arc<dyn FrameSource>,
    pipeline: Arc<dyn PipelineController>,
    config: CaptureConfig,
    format: RwLock<NegotiatedFormat>,
    pub(crate) dma: Mutex<DmaState>,
    control: tokio::sync::Mutex<ControlState>,
    streaming: AtomicBool,
    completed_tx: mpsc::UnboundedSender<CompletedBuffer>,
}

impl CaptureEngine {
    /// Create an engine from a validated configuration and its collaborators.
    ///
    /// Returns the engine together with the receiving end of the completion
    /// channel on which every retired buffer is delivered.
    pub fn new(
        config: CaptureConfig,
        regs: Arc<dyn RegisterBlock>,
        source: Arc<dyn FrameSource>,
        pipeline: Arc<dyn PipelineController>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CompletedBuffer>)> {
        config.validate()?;
        let format = try_format(config.image_format());
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();

        info!(
            width = format.width,
            height = format.height,
            pixel_format = ?format.pixel_format,
            "capture engine created"
        );

        let engine = Self {
            regs,
            source,
            pipeline,
            config,
            format: RwLock::new(format),
            dma: Mutex::new(DmaState {
                queue: PendingQueue::default(),
                slots: SlotBank::default(),
                sequence: 0,
            }),
            control: tokio::sync::Mutex::new(ControlState {
                pipeline_handle: None,
            }),
            streaming: AtomicBool::new(false),
            completed_tx,
        };
        Ok((engine, completed_rx))
    }

    /// The format the device will produce.
    #[must_use]
    pub fn format(&self) -> NegotiatedFormat {
        self.format.read().clone()
    }

    /// Whether the engine is currently streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Renegotiate the capture format.
    ///
    /// Only valid while idle and with no buffers registered: buffers are
    /// validated against the format they were submitted under.
    pub async fn set_format(&self, requested: ImageFormat) -> Result<NegotiatedFormat> {
        let _ctrl = self.control.lock().await;
        if self.is_streaming() {
            return Err(CaptureError::AlreadyStreaming);
        }
        {
            let dma = self.dma.lock();
            if !dma.queue.is_empty() || dma.slots.bound_count() > 0 {
                return Err(CaptureError::InvalidConfig(
                    "cannot change format while buffers are registered".into(),
                ));
            }
        }

        let negotiated = try_format(requested);
        debug!(
            width = negotiated.width,
            height = negotiated.height,
            pixel_format = ?negotiated.pixel_format,
            "format negotiated"
        );
        *self.format.write() = negotiated.clone();
        Ok(negotiated)
    }

    /// Validate a caller-registered buffer and append it to the pool.
    ///
    /// Valid in any stream state; buffers queued before `start` are consumed
    /// when the slots are pre-loaded. A buffer that does not satisfy the
    /// negotiated format is rejected and never enters the pool.
    pub fn submit(&self, mut buffer: CaptureBuffer) -> Result<()> {
        let format = self.format.read().clone();
        let buffer_id = buffer.id();

        if buffer.planes().len() != format.planes.len() {
            return Err(CaptureError::PlaneCountMismatch {
                buffer: buffer_id,
                provided: buffer.planes().len(),
                required: format.planes.len(),
            });
        }
        for (plane, (desc, plane_format)) in buffer
            .planes_mut()
            .iter_mut()
            .zip(format.planes.iter())
            .enumerate()
        {
            let required = plane_format.size as usize;
            if desc.len < required {
                warn!(
                    buffer = ?buffer_id,
                    plane,
                    provided = desc.len,
                    required,
                    "buffer too small"
                );
                return Err(CaptureError::BufferTooSmall {
                    buffer: buffer_id,
                    plane,
                    provided: desc.len,
                    required,
                });
            }
            desc.payload = required;
        }

        let mut dma = self.dma.lock();
        dma.queue.push(buffer);
        debug!(queued = dma.queue.len(), "buffer submitted");
        Ok(())
    }

    /// Start streaming.
    ///
    /// Pre-loads both hardware slots, programs the format registers, arms
    /// the frame-done interrupt and starts capture, then asks the upstream
    /// source to produce frames. Every failure is unwound transactionally:
    /// the engine returns to `Idle` with all buffers back in the pool and
    /// the pipeline resource released.
    pub async fn start(&self) -> Result<()> {
        let mut ctrl = self.control.lock().await;
        if self.is_streaming() {
            return Err(CaptureError::AlreadyStreaming);
        }

        // The hardware needs both slots pre-loaded before capture begins.
        {
            let dma = self.dma.lock();
            let queued = dma.queue.len();
            if queued < SLOT_COUNT {
                return Err(CaptureError::InsufficientBuffers {
                    queued,
                    required: SLOT_COUNT,
                });
            }
        }

        let handle = self
            .pipeline
            .acquire()
            .await
            .map_err(|e| CaptureError::Pipeline(e.to_string()))?;

        debug!("starting capture");
        let format = self.format.read().clone();

        {
            let mut dma = self.dma.lock();
            dma.sequence = 0;

            self.program_format(&format);

            let DmaState { queue, slots, .. } = &mut *dma;
            if let Err(err) = slots.fill_all(queue, self.regs.as_ref()) {
                slots.unwind_into(queue);
                drop(dma);
                self.pipeline.release(handle).await;
                return Err(err);
            }

            // Enable double buffering, clear stale status, unmask the
            // frame-done interrupt, then start capturing.
            self.regs.write(REG_BUF_CTRL, BUF_CTRL_DBE);
            self.regs.write(REG_INT_STA, INT_FRM_DONE);
            self.regs.write(REG_INT_EN, INT_FRM_DONE);
            self.regs.write(REG_CPT_CTRL, CPT_VIDEO_START);
        }

        if let Err(err) = self.source.set_streaming(true).await {
            warn!(error = %err, "upstream source refused to start");
            self.regs.write(REG_CPT_CTRL, 0);
            self.regs.write(REG_INT_EN, 0);
            {
                let mut dma = self.dma.lock();
                let DmaState { queue, slots, .. } = &mut *dma;
                slots.unwind_into(queue);
            }
            self.pipeline.release(handle).await;
            return Err(CaptureError::Source(err.to_string()));
        }

        ctrl.pipeline_handle = Some(handle);
        self.streaming.store(true, Ordering::SeqCst);
        info!(
            width = format.width,
            height = format.height,
            "capture streaming"
        );
        Ok(())
    }

    /// Stop streaming.
    ///
    /// Unconditional: collaborator failures are logged, never propagated,
    /// and the engine always ends up `Idle`. Every buffer still held - queued
    /// or slot-bound - is returned to the caller tagged `Cancelled`. Calling
    /// `stop` while already idle is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let mut ctrl = self.control.lock().await;
        if !self.is_streaming() {
            debug!("stop while idle ignored");
            return Ok(());
        }

        debug!("stopping capture");

        // Best-effort: stop must complete even if the source misbehaves.
        if let Err(err) = self.source.set_streaming(false).await {
            warn!(error = %err, "upstream source failed to stop");
        }

        // Mask and acknowledge the interrupt before touching the pool, so no
        // flip can race the drain below.
        self.regs.write(REG_INT_EN, 0);
        self.regs.write(REG_INT_STA, INT_FRM_DONE);
        self.regs.write(REG_CPT_CTRL, 0);

        let released = {
            let mut dma = self.dma.lock();
            let DmaState { queue, slots, .. } = &mut *dma;
            let mut released = queue.drain();
            released.extend(slots.detach_all());
            released
        };
        let returned = released.len();
        for buffer in released {
            self.complete(buffer, CompletionStatus::Cancelled);
        }

        if let Some(handle) = ctrl.pipeline_handle.take() {
            self.pipeline.release(handle).await;
        }
        self.streaming.store(false, Ordering::SeqCst);

        info!(returned, "capture stopped");
        Ok(())
    }

    /// Point-in-time diagnostic view of queue, slots and sequence counter.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        let dma = self.dma.lock();
        EngineSnapshot {
            state: if self.is_streaming() {
                StreamState::Streaming
            } else {
                StreamState::Idle
            },
            queued: dma.queue.ids(),
            slots: dma.slots.ids(),
            sequence: dma.sequence,
            submitted: dma.queue.submitted(),
        }
    }

    /// Hand a buffer back to the caller.
    pub(crate) fn complete(&self, buffer: CaptureBuffer, status: CompletionStatus) {
        if self
            .completed_tx
            .send(CompletedBuffer { buffer, status })
            .is_err()
        {
            debug!("completion receiver dropped");
        }
    }

    /// Program window, bus and stride registers from the negotiated format.
    fn program_format(&self, format: &NegotiatedFormat) {
        self.regs.write(REG_WIN_W, format.width);
        self.regs.write(REG_WIN_H, format.height);
        self.regs.write(
            REG_CFG,
            cfg_value(
                format.pixel_format.hw_input_code(),
                format.pixel_format.hw_output_code(),
                self.config.vsync_active_high,
                self.config.hsync_active_high,
                self.config.pclk_active_high,
            ),
        );
        self.regs.write(REG_BUF_LEN, format.planes[0].stride);
    }
}
