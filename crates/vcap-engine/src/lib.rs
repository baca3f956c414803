//! `vcap-engine`
//!
//! Double-buffered capture engine.
//!
//! The engine drives a capture device that writes frames into one of two
//! hardware slots while software retires the other, flipping on every
//! frame-done interrupt. Callers submit registered buffers into a FIFO pool;
//! the engine binds them to slots, and hands each one back on a completion
//! channel, either filled (with a sequence number and timestamp) or
//! cancelled.
//!
//! # Architecture
//!
//! ```text
//! submit() ──▶ PendingQueue ──▶ SlotBank (2 slots) ──▶ device
//!                  ▲                  │
//!                  │   refill         │ frame-done interrupt
//!                  └── handle_interrupt() ──▶ completion channel
//! ```
//!
//! [`CaptureEngine`] owns the whole pipeline state. A single short-held
//! mutex protects the (queue, slots, sequence counter) triple shared with
//! the interrupt path; a separate async mutex serializes start/stop against
//! concurrent callers. See the module docs of [`engine`] for the locking
//! rules.

pub mod config;
pub mod engine;
mod queue;
mod sequencer;
mod slots;

pub use config::CaptureConfig;
pub use engine::{CaptureEngine, EngineSnapshot, StreamState};
