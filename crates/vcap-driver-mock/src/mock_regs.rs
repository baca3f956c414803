//! Simulated register file.

use parking_lot::Mutex;
use tracing::debug;

use vcap_core::regs::{
    buf_addr_reg, BUF_CTRL_DBS, CPT_VIDEO_START, INT_FRM_DONE, REG_BUF_CTRL, REG_CPT_CTRL,
    REG_INT_EN, REG_INT_STA,
};
use vcap_core::RegisterBlock;

/// Size of the simulated register window, in 32-bit words.
const REG_SPACE_WORDS: usize = 0x40 / 4;

/// In-memory register file mimicking the capture interface.
///
/// Plain registers store whatever was last written. The status register has
/// the device's write-1-to-clear semantics: writing a value clears exactly
/// the bits set in it. [`fire_frame_done`](Self::fire_frame_done) emulates
/// the device completing a frame.
pub struct MockRegisters {
    words: Mutex<[u32; REG_SPACE_WORDS]>,
}

fn word_index(offset: u32) -> usize {
    assert!(
        offset % 4 == 0 && (offset as usize) < REG_SPACE_WORDS * 4,
        "register offset {offset:#x} outside the window"
    );
    (offset / 4) as usize
}

impl MockRegisters {
    /// Create a register file with every register reset to zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: Mutex::new([0; REG_SPACE_WORDS]),
        }
    }

    /// Simulate the device completing a frame: flip the active-slot toggle
    /// and latch the frame-done status bit.
    ///
    /// Returns `false` without doing anything when capture is not running,
    /// matching a real device that only raises frame-done while capturing.
    pub fn fire_frame_done(&self) -> bool {
        let mut words = self.words.lock();
        if words[word_index(REG_CPT_CTRL)] & CPT_VIDEO_START == 0 {
            debug!("frame-done suppressed, capture not running");
            return false;
        }
        words[word_index(REG_BUF_CTRL)] ^= BUF_CTRL_DBS;
        words[word_index(REG_INT_STA)] |= INT_FRM_DONE;
        true
    }

    /// Slot the device is currently writing into.
    #[must_use]
    pub fn active_slot(&self) -> usize {
        usize::from(self.words.lock()[word_index(REG_BUF_CTRL)] & BUF_CTRL_DBS != 0)
    }

    /// Whether the capture command register has the start bit set.
    #[must_use]
    pub fn capture_running(&self) -> bool {
        self.words.lock()[word_index(REG_CPT_CTRL)] & CPT_VIDEO_START != 0
    }

    /// Whether the frame-done interrupt is unmasked.
    #[must_use]
    pub fn irq_enabled(&self) -> bool {
        self.words.lock()[word_index(REG_INT_EN)] & INT_FRM_DONE != 0
    }

    /// Address last programmed for `plane` of `slot`.
    #[must_use]
    pub fn plane_addr(&self, plane: usize, slot: usize) -> u32 {
        self.words.lock()[word_index(buf_addr_reg(plane, slot))]
    }
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBlock for MockRegisters {
    fn read(&self, offset: u32) -> u32 {
        self.words.lock()[word_index(offset)]
    }

    fn write(&self, offset: u32, value: u32) {
        let mut words = self.words.lock();
        let index = word_index(offset);
        if offset == REG_INT_STA {
            words[index] &= !value;
        } else {
            words[index] = value;
        }
    }
}
