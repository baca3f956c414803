//! Buffer descriptors exchanged between the caller and the capture engine.
//!
//! The engine never owns image memory. Callers register buffers as a set of
//! device-visible plane addresses plus lengths; the engine binds them to
//! hardware slots, and hands them back either filled (`Done`, carrying a
//! sequence number and timestamp) or unfilled (`Cancelled`, during stop or a
//! failed start).

/// Identifier assigned by the caller when registering a buffer.
///
/// The engine treats it as opaque; it only has to be unique among buffers
/// that are simultaneously in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Device-visible address of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaAddr(pub u32);

/// One contiguous memory region of a (possibly multi-planar) image buffer.
#[derive(Debug, Clone, Copy)]
pub struct PlaneBuffer {
    /// Address the hardware will write this plane to.
    pub addr: DmaAddr,
    /// Total bytes the caller allocated for this plane.
    pub len: usize,
    /// Bytes of valid payload, recorded when the buffer is validated against
    /// the negotiated format.
    pub payload: usize,
}

impl PlaneBuffer {
    /// Describe a plane of `len` bytes at `addr`. Payload is recorded later,
    /// at submission time.
    #[must_use]
    pub fn new(addr: DmaAddr, len: usize) -> Self {
        Self {
            addr,
            len,
            payload: 0,
        }
    }
}

/// A caller-registered capture buffer.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    id: BufferId,
    planes: Vec<PlaneBuffer>,
}

impl CaptureBuffer {
    /// Register a buffer from its plane descriptors.
    #[must_use]
    pub fn new(id: BufferId, planes: Vec<PlaneBuffer>) -> Self {
        Self { id, planes }
    }

    /// The caller-assigned identifier.
    #[must_use]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Plane descriptors in plane order.
    #[must_use]
    pub fn planes(&self) -> &[PlaneBuffer] {
        &self.planes
    }

    /// Mutable plane descriptors, used to record payload sizes during
    /// validation.
    pub fn planes_mut(&mut self) -> &mut [PlaneBuffer] {
        &mut self.planes
    }
}

/// Why a buffer came back from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// The device filled the buffer.
    Done {
        /// Per-session frame sequence number, starting at 0.
        sequence: u32,
        /// Completion time in nanoseconds since the Unix epoch.
        timestamp_ns: u64,
    },
    /// The buffer was returned unfilled during stop or a failed start.
    Cancelled,
}

/// A buffer handed back to the caller.
#[derive(Debug, Clone)]
pub struct CompletedBuffer {
    /// The buffer, exactly as registered.
    pub buffer: CaptureBuffer,
    /// Whether the device filled it.
    pub status: CompletionStatus,
}

impl CompletedBuffer {
    /// Whether the device filled the buffer.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.status, CompletionStatus::Done { .. })
    }

    /// Sequence number for `Done` buffers, `None` for cancelled ones.
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        match self.status {
            CompletionStatus::Done { sequence, .. } => Some(sequence),
            CompletionStatus::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_accessors() {
        let buffer = CaptureBuffer::new(
            BufferId(4),
            vec![
                PlaneBuffer::new(DmaAddr(0x1000), 4096),
                PlaneBuffer::new(DmaAddr(0x2000), 2048),
            ],
        );

        assert_eq!(buffer.id(), BufferId(4));
        assert_eq!(buffer.planes().len(), 2);
        assert_eq!(buffer.planes()[1].addr, DmaAddr(0x2000));
        assert_eq!(buffer.planes()[1].payload, 0);
    }

    #[test]
    fn test_completion_status() {
        let buffer = CaptureBuffer::new(BufferId(0), vec![]);

        let done = CompletedBuffer {
            buffer: buffer.clone(),
            status: CompletionStatus::Done {
                sequence: 9,
                timestamp_ns: 1,
            },
        };
        assert!(done.is_done());
        assert_eq!(done.sequence(), Some(9));

        let cancelled = CompletedBuffer {
            buffer,
            status: CompletionStatus::Cancelled,
        };
        assert!(!cancelled.is_done());
        assert_eq!(cancelled.sequence(), None);
    }
}
