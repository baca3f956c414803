//! Simulated hardware for the vcap capture pipeline.
//!
//! This crate provides in-memory stand-ins for every external party the
//! capture engine talks to, so the full streaming lifecycle can be exercised
//! without a device:
//!
//! - [`MockRegisters`] - register file with write-1-to-clear status
//!   semantics and a [`MockRegisters::fire_frame_done`] helper that flips
//!   the active-slot toggle the way the device does
//! - [`MockFrameSource`] - upstream source with call counters and failure
//!   injection
//! - [`MockPipeline`] - pipeline resource manager tracking acquire/release
//!   balance, with failure injection
//!
//! All mocks are cheap, deterministic, and safe to share across threads.

mod mock_pipeline;
mod mock_regs;
mod mock_source;

pub use mock_pipeline::MockPipeline;
pub use mock_regs::MockRegisters;
pub use mock_source::MockFrameSource;
