//! `vcap-core`
//!
//! Core types and contracts for the vcap capture pipeline.
//!
//! This crate provides the building blocks shared by the capture engine and
//! its hardware backends:
//!
//! - [`error`]: the [`CaptureError`] taxonomy and crate-wide [`Result`] alias
//! - [`format`]: pixel formats and capture format negotiation
//! - [`buffer`]: buffer descriptors exchanged between caller and engine
//! - [`regs`]: the abstracted register layout and the [`RegisterBlock`]
//!   trait implemented by register backends (MMIO mappings, simulators)
//! - [`pipeline`]: collaborator contracts (upstream frame source, pipeline
//!   resource manager)
//!
//! The engine itself lives in `vcap-engine`; simulated hardware for testing
//! lives in `vcap-driver-mock`.

pub mod buffer;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod regs;

pub use buffer::{
    BufferId, CaptureBuffer, CompletedBuffer, CompletionStatus, DmaAddr, PlaneBuffer,
};
pub use error::{CaptureError, Result};
pub use format::{ImageFormat, NegotiatedFormat, PixelFormat, PlaneFormat};
pub use pipeline::{FrameSource, PipelineController, PipelineHandle};
pub use regs::{RegisterBlock, SLOT_COUNT};
