//! The two hardware-visible buffer slots and their fill protocol.

use tracing::{error, warn};
use vcap_core::regs::buf_addr_reg;
use vcap_core::{BufferId, CaptureBuffer, CaptureError, RegisterBlock, Result, SLOT_COUNT};

use crate::queue::PendingQueue;

/// Buffers currently bound to the device's per-slot address registers.
///
/// A slot is either empty or holds exactly one buffer whose plane addresses
/// have been programmed into the register file. Mutated only under the
/// engine's DMA lock.
#[derive(Debug, Default)]
pub(crate) struct SlotBank {
    slots: [Option<CaptureBuffer>; SLOT_COUNT],
}

impl SlotBank {
    /// Bind the oldest queued buffer to `slot` and program its plane
    /// addresses into the register file.
    ///
    /// An empty queue reports [`CaptureError::PoolEmpty`]: capture keeps
    /// going into whichever slots remain bound. Filling a slot that still
    /// holds a buffer is a consistency violation and is refused.
    pub fn fill(
        &mut self,
        queue: &mut PendingQueue,
        regs: &dyn RegisterBlock,
        slot: usize,
    ) -> Result<()> {
        // We should never end up overwriting a slot that still holds an
        // unretired buffer.
        if let Some(held) = &self.slots[slot] {
            error!(slot, buffer = ?held.id(), "refusing to fill a bound slot");
            return Err(CaptureError::SlotOccupied {
                slot,
                holder: held.id(),
            });
        }

        let Some(buffer) = queue.take_oldest() else {
            warn!(slot, "running out of buffers");
            return Err(CaptureError::PoolEmpty { slot });
        };

        for (plane, desc) in buffer.planes().iter().enumerate() {
            regs.write(buf_addr_reg(plane, slot), desc.addr.0);
        }
        self.slots[slot] = Some(buffer);

        Ok(())
    }

    /// Fill every slot from the queue, in slot order. Used at stream start;
    /// fails as a whole if any slot cannot be filled.
    pub fn fill_all(&mut self, queue: &mut PendingQueue, regs: &dyn RegisterBlock) -> Result<()> {
        for slot in 0..SLOT_COUNT {
            self.fill(queue, regs, slot)?;
        }
        Ok(())
    }

    /// Detach and return the buffer bound to `slot`, if any.
    pub fn detach(&mut self, slot: usize) -> Option<CaptureBuffer> {
        self.slots[slot].take()
    }

    /// Detach every bound buffer, in slot order.
    pub fn detach_all(&mut self) -> Vec<CaptureBuffer> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    /// Return bound buffers to the head of the queue, restoring the order
    /// they were taken in. Unwind path for a failed start.
    pub fn unwind_into(&mut self, queue: &mut PendingQueue) {
        for slot in (0..SLOT_COUNT).rev() {
            if let Some(buffer) = self.slots[slot].take() {
                queue.requeue_front(buffer);
            }
        }
    }

    /// Number of slots currently holding a buffer.
    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Identifier of the buffer bound to each slot.
    pub fn ids(&self) -> [Option<BufferId>; SLOT_COUNT] {
        std::array::from_fn(|slot| self.slots[slot].as_ref().map(CaptureBuffer::id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcap_core::{DmaAddr, PlaneBuffer};
    use vcap_driver_mock::MockRegisters;

    fn buffer(id: u32) -> CaptureBuffer {
        CaptureBuffer::new(
            BufferId(id),
            vec![
                PlaneBuffer::new(DmaAddr(0x1000 * id), 4096),
                PlaneBuffer::new(DmaAddr(0x1000 * id + 0x800), 2048),
            ],
        )
    }

    #[test]
    fn test_fill_programs_plane_addresses() {
        let regs = MockRegisters::new();
        let mut queue = PendingQueue::default();
        let mut slots = SlotBank::default();
        queue.push(buffer(2));

        slots.fill(&mut queue, &regs, 1).unwrap();

        assert_eq!(slots.ids()[1], Some(BufferId(2)));
        assert_eq!(regs.plane_addr(0, 1), 0x2000);
        assert_eq!(regs.plane_addr(1, 1), 0x2800);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_fill_empty_queue_reports_pool_empty() {
        let regs = MockRegisters::new();
        let mut queue = PendingQueue::default();
        let mut slots = SlotBank::default();

        let err = slots.fill(&mut queue, &regs, 0).unwrap_err();
        assert!(matches!(err, CaptureError::PoolEmpty { slot: 0 }));
        assert_eq!(slots.bound_count(), 0);
    }

    #[test]
    fn test_fill_bound_slot_is_refused() {
        let regs = MockRegisters::new();
        let mut queue = PendingQueue::default();
        let mut slots = SlotBank::default();
        queue.push(buffer(1));
        queue.push(buffer(2));

        slots.fill(&mut queue, &regs, 0).unwrap();
        let err = slots.fill(&mut queue, &regs, 0).unwrap_err();

        assert!(matches!(
            err,
            CaptureError::SlotOccupied {
                slot: 0,
                holder: BufferId(1)
            }
        ));
        // The queued buffer was not consumed by the refused fill.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_fill_all_consumes_oldest_first() {
        let regs = MockRegisters::new();
        let mut queue = PendingQueue::default();
        let mut slots = SlotBank::default();
        for id in 1..=3 {
            queue.push(buffer(id));
        }

        slots.fill_all(&mut queue, &regs).unwrap();

        assert_eq!(slots.ids(), [Some(BufferId(1)), Some(BufferId(2))]);
        assert_eq!(queue.ids(), vec![BufferId(3)]);
    }

    #[test]
    fn test_unwind_restores_queue_order() {
        let regs = MockRegisters::new();
        let mut queue = PendingQueue::default();
        let mut slots = SlotBank::default();
        for id in 1..=3 {
            queue.push(buffer(id));
        }
        slots.fill_all(&mut queue, &regs).unwrap();

        slots.unwind_into(&mut queue);

        assert_eq!(slots.bound_count(), 0);
        assert_eq!(queue.ids(), vec![BufferId(1), BufferId(2), BufferId(3)]);
    }
}
