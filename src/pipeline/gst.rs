//! GStreamer frame source
//!
//! Parses a launch description into a pipeline, hooks the appsink named
//! `sink`, and publishes every decoded RGB sample into the mailbox from the
//! streaming thread. The description must end in
//! `video/x-raw,format=RGB ! appsink name=sink`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;

use super::{FrameMailbox, FrameSource, PipelineError, VideoFrame};

/// Name of the appsink element the source hooks into
pub const SINK_NAME: &str = "sink";

/// Frame source backed by a GStreamer pipeline
pub struct GstSource {
    launch: String,
    pipeline: Option<gst::Pipeline>,
    running: Arc<AtomicBool>,
    bus_thread: Option<JoinHandle<()>>,
}

impl GstSource {
    pub fn new(launch: &str) -> Self {
        Self {
            launch: launch.to_string(),
            pipeline: None,
            running: Arc::new(AtomicBool::new(false)),
            bus_thread: None,
        }
    }

    /// Convert one appsink sample into a frame
    fn sample_to_frame(sample: &gst::Sample) -> Result<VideoFrame, PipelineError> {
        let caps = sample.caps().ok_or(PipelineError::MissingCaps)?;
        let info = gst_video::VideoInfo::from_caps(caps).map_err(|_| PipelineError::MissingCaps)?;

        if info.format() != gst_video::VideoFormat::Rgb {
            return Err(PipelineError::InvalidFrame(format!(
                "expected RGB samples, got {:?}",
                info.format()
            )));
        }

        let buffer = sample.buffer().ok_or(PipelineError::BufferMap)?;
        let map = buffer.map_readable().map_err(|_| PipelineError::BufferMap)?;

        VideoFrame::from_rgb_plane(info.width(), info.height(), info.stride()[0], map.as_slice())
    }

    /// Watch the bus for errors and end-of-stream until stopped
    fn bus_loop(bus: gst::Bus, mailbox: FrameMailbox, running: Arc<AtomicBool>) {
        while running.load(Ordering::Acquire) {
            let Some(message) = bus.timed_pop(gst::ClockTime::from_mseconds(100)) else {
                continue;
            };

            match message.view() {
                gst::MessageView::Error(err) => {
                    let text = format!(
                        "{} ({})",
                        err.error(),
                        err.debug().map(|d| d.to_string()).unwrap_or_default()
                    );
                    log::error!("GStreamer error: {}", text);
                    mailbox.fail(PipelineError::Capture(text));
                }
                gst::MessageView::Eos(..) => {
                    log::info!("GStreamer stream ended");
                }
                gst::MessageView::Warning(warning) => {
                    log::warn!("GStreamer warning: {}", warning.error());
                }
                _ => {}
            }
        }
    }
}

impl FrameSource for GstSource {
    fn describe(&self) -> String {
        format!("gstreamer: {}", self.launch)
    }

    fn start(&mut self, mailbox: FrameMailbox) -> Result<(), PipelineError> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        gst::init().map_err(|e| PipelineError::Parse(e.to_string()))?;

        let pipeline = gst::parse::launch(&self.launch)
            .map_err(|e| PipelineError::Parse(e.to_string()))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| PipelineError::Parse("description is not a pipeline".to_string()))?;

        let appsink = pipeline
            .by_name(SINK_NAME)
            .ok_or_else(|| PipelineError::MissingSink(SINK_NAME.to_string()))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| PipelineError::NotAppSink(SINK_NAME.to_string()))?;

        let sample_mailbox = mailbox.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    match Self::sample_to_frame(&sample) {
                        Ok(frame) => {
                            sample_mailbox.publish(frame);
                            Ok(gst::FlowSuccess::Ok)
                        }
                        Err(e) => {
                            log::error!("Dropping stream: {}", e);
                            sample_mailbox.fail(e);
                            Err(gst::FlowError::Error)
                        }
                    }
                })
                .build(),
        );

        let bus = pipeline
            .bus()
            .ok_or_else(|| PipelineError::StateChange("pipeline has no bus".to_string()))?;

        if let Err(e) = pipeline.set_state(gst::State::Playing) {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(PipelineError::StateChange(e.to_string()));
        }

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        let spawned = std::thread::Builder::new()
            .name("gst-bus".to_string())
            .spawn(move || Self::bus_loop(bus, mailbox, running));

        match spawned {
            Ok(handle) => self.bus_thread = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                let _ = pipeline.set_state(gst::State::Null);
                return Err(e.into());
            }
        }

        log::info!("GStreamer pipeline playing: {}", self.launch);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gst::State::Null) {
                log::warn!("Failed to stop pipeline: {}", e);
            }
        }

        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.bus_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_start_leaves_nothing_running() {
        let mut source = GstSource::new(
            "filesrc location=/nonexistent/hud-overlay.mp4 ! decodebin ! videoconvert \
             ! video/x-raw,format=RGB ! appsink name=sink",
        );

        let result = source.start(FrameMailbox::new());
        assert!(matches!(result, Err(PipelineError::StateChange(_))));
        assert!(source.pipeline.is_none());
        assert!(source.bus_thread.is_none());
        assert!(!source.running.load(Ordering::Acquire));
    }

    #[test]
    fn test_missing_sink_is_reported() {
        let mut source = GstSource::new("videotestsrc ! fakesink");
        match source.start(FrameMailbox::new()) {
            Err(PipelineError::MissingSink(name)) => assert_eq!(name, SINK_NAME),
            other => panic!("expected missing sink, got {:?}", other),
        }
        assert!(source.pipeline.is_none());
    }

    fn rgb_sample(width: u32, height: u32, bytes: Vec<u8>) -> gst::Sample {
        gst::init().unwrap();
        let info = gst_video::VideoInfo::builder(gst_video::VideoFormat::Rgb, width, height)
            .build()
            .unwrap();
        let caps = info.to_caps().unwrap();
        let buffer = gst::Buffer::from_mut_slice(bytes);
        gst::Sample::builder().buffer(&buffer).caps(&caps).build()
    }

    #[test]
    fn test_sample_row_padding_is_stripped() {
        // 3 pixels of RGB is 9 bytes, GStreamer pads each row to 12
        let mut bytes = Vec::new();
        for row in 0..2u8 {
            for pixel in 0..9u8 {
                bytes.push(row * 100 + pixel);
            }
            bytes.extend_from_slice(&[0xEE; 3]);
        }
        let sample = rgb_sample(3, 2, bytes);

        let frame = GstSource::sample_to_frame(&sample).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.data.len(), 18);
        assert_eq!(&frame.data[..9], &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&frame.data[9..], &[100, 101, 102, 103, 104, 105, 106, 107, 108]);
        assert!(!frame.data.contains(&0xEE));
    }

    #[test]
    fn test_non_rgb_sample_is_rejected() {
        gst::init().unwrap();
        let info = gst_video::VideoInfo::builder(gst_video::VideoFormat::Rgba, 2, 2)
            .build()
            .unwrap();
        let caps = info.to_caps().unwrap();
        let buffer = gst::Buffer::from_mut_slice(vec![0u8; info.size()]);
        let sample = gst::Sample::builder().buffer(&buffer).caps(&caps).build();

        assert!(matches!(
            GstSource::sample_to_frame(&sample),
            Err(PipelineError::InvalidFrame(_))
        ));
    }
}
