//! Interrupt-driven buffer flip.
//!
//! The device raises one frame-done interrupt per captured frame and flips
//! its active-slot toggle. The handler retires the buffer in the slot the
//! device is *not* writing, stamps it with the session sequence number and a
//! timestamp, and refills the vacated slot from the pending queue.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, warn};

use vcap_core::regs::{BUF_CTRL_DBS, INT_FRM_DONE, REG_BUF_CTRL, REG_CPT_CTRL, REG_INT_STA};
use vcap_core::{CaptureError, CompletionStatus};

use crate::engine::{CaptureEngine, DmaState};

impl CaptureEngine {
    /// Entry point for the device's frame-done interrupt.
    ///
    /// Must not block: all work happens under the short-held DMA lock, and
    /// the completed buffer is handed off on an unbounded channel. Signals
    /// without the frame-done bit set (stale or duplicate) are acknowledged
    /// and ignored.
    pub fn handle_interrupt(&self) {
        let status = self.regs.read(REG_INT_STA);

        // Acknowledge before any further processing; write-1-to-clear.
        self.regs.write(REG_INT_STA, status);

        if status & INT_FRM_DONE == 0 {
            debug!(status, "interrupt without frame-done bit ignored");
            return;
        }

        let mut dma = self.dma.lock();

        // The completed slot is the one the device is not writing. The
        // toggle bit is sampled after the acknowledge write; this register
        // file cannot latch the two atomically, so a flip landing between
        // the two accesses would mis-identify the completed slot.
        let ctrl = self.regs.read(REG_BUF_CTRL);
        let active = usize::from(ctrl & BUF_CTRL_DBS != 0);
        let completed_slot = active ^ 1;

        let sequence = dma.sequence;
        dma.sequence = sequence.wrapping_add(1);

        let retired = dma.slots.detach(completed_slot);
        let timestamp_ns = frame_timestamp_ns();
        if retired.is_none() {
            warn!(slot = completed_slot, sequence, "frame done on a starved slot");
        }

        let refill = {
            let DmaState { queue, slots, .. } = &mut *dma;
            slots.fill(queue, self.regs.as_ref(), completed_slot)
        };
        match refill {
            Ok(()) => {}
            Err(CaptureError::PoolEmpty { .. }) => {
                // Keep capturing into the other slot if it is still bound;
                // with zero bound slots there is no valid target left, so
                // stop the device rather than let it write stale addresses.
                if dma.slots.bound_count() == 0 {
                    warn!("no bound slots remain, stopping capture");
                    self.regs.write(REG_CPT_CTRL, 0);
                }
            }
            Err(err) => error!(error = %err, slot = completed_slot, "slot refill failed"),
        }

        drop(dma);

        if let Some(buffer) = retired {
            self.complete(
                buffer,
                CompletionStatus::Done {
                    sequence,
                    timestamp_ns,
                },
            );
        }
    }
}

fn frame_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
