//! Integration tests for the mock hardware crate.
//!
//! These verify the mocks hold up the contracts the engine relies on.

use vcap_core::regs::{CPT_VIDEO_START, INT_FRM_DONE, REG_CPT_CTRL, REG_INT_STA};
use vcap_core::{FrameSource, PipelineController, RegisterBlock};
use vcap_driver_mock::{MockFrameSource, MockPipeline, MockRegisters};

/// A frame-done cycle behaves like the device: toggle, latch, acknowledge.
#[test]
fn test_register_frame_cycle() {
    let regs = MockRegisters::new();
    regs.write(REG_CPT_CTRL, CPT_VIDEO_START);

    assert!(regs.fire_frame_done());
    assert_eq!(regs.active_slot(), 1);

    let status = regs.read(REG_INT_STA);
    assert_eq!(status & INT_FRM_DONE, INT_FRM_DONE);
    regs.write(REG_INT_STA, status);
    assert_eq!(regs.read(REG_INT_STA), 0);
}

/// Mocks are trait objects like the real collaborators.
#[tokio::test]
async fn test_mocks_behind_trait_objects() {
    let source: Box<dyn FrameSource> = Box::new(MockFrameSource::new());
    source.set_streaming(true).await.unwrap();
    source.set_streaming(false).await.unwrap();

    let pipeline: Box<dyn PipelineController> = Box::new(MockPipeline::new());
    let handle = pipeline.acquire().await.unwrap();
    pipeline.release(handle).await;

    let regs: Box<dyn RegisterBlock> = Box::new(MockRegisters::new());
    regs.write(REG_CPT_CTRL, CPT_VIDEO_START);
    assert_eq!(regs.read(REG_CPT_CTRL), CPT_VIDEO_START);
}
