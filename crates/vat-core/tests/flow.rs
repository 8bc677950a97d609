//! End-to-end annotation flows over the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use vat_core::harness::{MemoryBus, MemoryDisplay, MemoryFrameSource};
use vat_core::{AnnotationEvent, AnnotationPipeline, ObservedTimestamp, PipelineOptions, PointerEvent};

fn options() -> PipelineOptions {
    PipelineOptions {
        wait_slice: Duration::from_millis(5),
    }
}

#[test]
fn test_single_click_emits_one_annotation() {
    let frames = MemoryFrameSource::new(640, 480);
    frames.push_ready(1);
    let display = Arc::new(MemoryDisplay::new());
    let bus = Arc::new(MemoryBus::new());
    let mut pipeline = AnnotationPipeline::new(frames, display.clone(), bus.clone(), options());

    bus.deliver_timestamp(ObservedTimestamp::new(100, 0));
    display.deliver_pointer(PointerEvent::button_down(10, 20));

    // One iteration: check, wait, step; then the session ends
    bus.deactivate_after_checks(1);
    let stats = pipeline.run().expect("pipeline should run");

    assert_eq!(stats.frames, 1);
    assert_eq!(
        bus.sent(),
        vec![AnnotationEvent {
            x: 10,
            y: 20,
            timestamp: ObservedTimestamp::new(99, 999_999),
        }]
    );
    let frame = display.last_frame().expect("frame presented");
    assert_eq!(frame.data().len(), 640 * 480 * 4);
}

#[test]
fn test_no_button_down_never_emits() {
    let frames = MemoryFrameSource::new(8, 8);
    frames.push_ready(50);
    let display = Arc::new(MemoryDisplay::new());
    let bus = Arc::new(MemoryBus::new());
    let mut pipeline = AnnotationPipeline::new(frames, display.clone(), bus.clone(), options());

    bus.deliver_timestamp(ObservedTimestamp::new(100, 0));
    display.deliver_pointer(PointerEvent::moved(3, 3));

    bus.deactivate_after_checks(50);
    let stats = pipeline.run().expect("pipeline should run");

    assert_eq!(stats.frames, 50);
    assert_eq!(stats.annotations, 0);
    assert!(bus.sent().is_empty());
}

#[test]
fn test_release_stops_emission() {
    let frames = MemoryFrameSource::new(4, 4);
    let display = Arc::new(MemoryDisplay::new());
    let bus = Arc::new(MemoryBus::new());
    let mut pipeline = AnnotationPipeline::new(frames, display.clone(), bus.clone(), options());

    bus.deliver_timestamp(ObservedTimestamp::new(10, 0));
    display.deliver_pointer(PointerEvent::button_down(1, 2));
    pipeline.step().unwrap();
    display.deliver_pointer(PointerEvent::moved(3, 4));
    pipeline.step().unwrap();
    display.deliver_pointer(PointerEvent::button_up(3, 4));
    pipeline.step().unwrap();

    let sent = bus.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!((sent[0].x, sent[0].y), (1, 2));
    assert_eq!((sent[1].x, sent[1].y), (3, 4));
    assert!(sent[1].timestamp < sent[0].timestamp);
}

#[test]
fn test_new_frame_timestamp_restarts_correlation() {
    let frames = MemoryFrameSource::new(4, 4);
    let display = Arc::new(MemoryDisplay::new());
    let bus = Arc::new(MemoryBus::new());
    let mut pipeline = AnnotationPipeline::new(frames, display.clone(), bus.clone(), options());

    display.deliver_pointer(PointerEvent::button_down(5, 5));
    bus.deliver_timestamp(ObservedTimestamp::new(1, 10));
    pipeline.step().unwrap();
    bus.deliver_timestamp(ObservedTimestamp::new(1, 40_000));
    pipeline.step().unwrap();

    let stamps: Vec<_> = bus.sent().iter().map(|e| e.timestamp).collect();
    assert_eq!(
        stamps,
        vec![ObservedTimestamp::new(1, 9), ObservedTimestamp::new(1, 39_999)]
    );
}
