//! Error types for the capture pipeline.
//!
//! [`CaptureError`] consolidates every failure a caller can observe. Errors
//! fall into three broad categories:
//!
//! 1. **Recoverable resource errors** - `InsufficientBuffers`, `PoolEmpty`.
//!    The caller can retry after submitting more buffers; no state is lost.
//! 2. **Rejected input** - `BufferTooSmall`, `PlaneCountMismatch`,
//!    `InvalidConfig`. The offending buffer or configuration never enters the
//!    pipeline; fix the input and resubmit.
//! 3. **Internal consistency violations** - `SlotOccupied`. These indicate a
//!    bug in the slot bookkeeping, never a caller mistake, and are surfaced
//!    rather than silently repaired.

use thiserror::Error;

use crate::buffer::BufferId;

/// Convenience alias for results using [`CaptureError`].
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Primary error type for the capture pipeline.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// `start` was called with fewer buffers queued than the hardware needs
    /// to pre-load its slots.
    ///
    /// Recoverable: submit more buffers and retry. The queued buffers are
    /// left untouched.
    #[error("not enough buffers queued ({queued} queued, {required} required)")]
    InsufficientBuffers {
        /// Buffers currently waiting in the pool.
        queued: usize,
        /// Buffers the hardware needs before capture can start.
        required: usize,
    },

    /// The pending queue had no buffer to bind to a slot.
    ///
    /// A legitimate starvation condition, not a fault: capture continues into
    /// whichever slots remain bound and recovers once the caller submits
    /// more buffers.
    #[error("no queued buffer available for slot {slot}")]
    PoolEmpty {
        /// The slot that could not be filled.
        slot: usize,
    },

    /// A slot was asked to bind a buffer while still holding one.
    ///
    /// This is an internal consistency violation: correct callers can never
    /// trigger it, and it must not be treated as a retryable condition.
    #[error("slot {slot} already holds buffer {holder:?}")]
    SlotOccupied {
        /// The slot that was about to be overwritten.
        slot: usize,
        /// The buffer currently bound to it.
        holder: BufferId,
    },

    /// A submitted buffer's plane is smaller than the negotiated format
    /// requires. The buffer never enters the pool.
    #[error("buffer {buffer:?} plane {plane} too small ({provided} < {required} bytes)")]
    BufferTooSmall {
        /// The rejected buffer.
        buffer: BufferId,
        /// Index of the undersized plane.
        plane: usize,
        /// Bytes the caller provided.
        provided: usize,
        /// Bytes the negotiated format requires.
        required: usize,
    },

    /// A submitted buffer does not carry one region per plane of the
    /// negotiated format.
    #[error("buffer {buffer:?} has {provided} planes, format requires {required}")]
    PlaneCountMismatch {
        /// The rejected buffer.
        buffer: BufferId,
        /// Planes the caller provided.
        provided: usize,
        /// Planes the negotiated format requires.
        required: usize,
    },

    /// The external pipeline resource could not be acquired or failed while
    /// held. `start` failures of this kind are fully unwound.
    #[error("pipeline resource error: {0}")]
    Pipeline(String),

    /// The upstream frame source rejected a streaming transition.
    #[error("frame source error: {0}")]
    Source(String),

    /// The requested operation is only valid while idle.
    #[error("capture is already streaming")]
    AlreadyStreaming,

    /// The requested operation is only valid while streaming.
    #[error("capture is not streaming")]
    NotStreaming,

    /// Configuration parsed but failed semantic validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CaptureError {
    /// Whether the caller may retry after correcting inputs.
    ///
    /// Returns `false` only for internal consistency violations, which
    /// indicate a bug rather than a recoverable condition.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SlotOccupied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaptureError::InsufficientBuffers {
            queued: 1,
            required: 2,
        };
        assert_eq!(
            err.to_string(),
            "not enough buffers queued (1 queued, 2 required)"
        );

        let err = CaptureError::BufferTooSmall {
            buffer: BufferId(7),
            plane: 1,
            provided: 100,
            required: 200,
        };
        assert!(err.to_string().contains("plane 1 too small"));
    }

    #[test]
    fn test_slot_occupied_is_not_recoverable() {
        let err = CaptureError::SlotOccupied {
            slot: 0,
            holder: BufferId(3),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_resource_errors_are_recoverable() {
        assert!(CaptureError::PoolEmpty { slot: 1 }.is_recoverable());
        assert!(CaptureError::InsufficientBuffers {
            queued: 0,
            required: 2
        }
        .is_recoverable());
        assert!(CaptureError::Source("sensor offline".into()).is_recoverable());
    }
}
