//! Camera frame source
//!
//! Captures RGB frames with nokhwa on a background thread and publishes them
//! into the mailbox. The camera is opened inside the capture thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use super::{FrameMailbox, FrameSource, PipelineError, VideoFrame};

/// Native camera capture source
pub struct CameraSource {
    camera_index: u32,
    width: u32,
    height: u32,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl CameraSource {
    /// Create a camera source
    ///
    /// # Arguments
    /// * `camera_index` - The camera index to use (0 for default)
    /// * `width` - Requested frame width
    /// * `height` - Requested frame height
    pub fn new(camera_index: u32, width: u32, height: u32) -> Self {
        Self {
            camera_index,
            width,
            height,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    fn open_camera(camera_index: u32, width: u32, height: u32) -> Result<Camera, PipelineError> {
        let index = CameraIndex::Index(camera_index);

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(width, height),
        ));

        let mut camera = match Camera::new(index.clone(), requested) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to open camera at {}x{}: {:?}", width, height, e);
                let fallback = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
                Camera::new(index, fallback).map_err(|e| PipelineError::Capture(e.to_string()))?
            }
        };

        camera
            .open_stream()
            .map_err(|e| PipelineError::Capture(e.to_string()))?;

        log::info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height()
        );

        Ok(camera)
    }

    fn capture_thread(
        camera_index: u32,
        width: u32,
        height: u32,
        mailbox: FrameMailbox,
        running: Arc<AtomicBool>,
    ) {
        log::info!("Starting camera capture thread (camera {})", camera_index);

        let mut camera = match Self::open_camera(camera_index, width, height) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to open camera {}: {}", camera_index, e);
                mailbox.fail(e);
                return;
            }
        };

        while running.load(Ordering::Acquire) {
            let buffer = match camera.frame() {
                Ok(buffer) => buffer,
                Err(e) => {
                    log::warn!("Failed to capture frame: {:?}", e);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    continue;
                }
            };

            let image = match buffer.decode_image::<RgbFormat>() {
                Ok(image) => image,
                Err(e) => {
                    log::error!("Could not read captured buffer: {:?}", e);
                    mailbox.fail(PipelineError::BufferMap);
                    break;
                }
            };

            let (frame_width, frame_height) = (image.width(), image.height());
            match VideoFrame::new(image.into_raw(), frame_width, frame_height) {
                Ok(frame) => {
                    mailbox.publish(frame);
                }
                Err(e) => log::warn!("Skipping malformed camera frame: {}", e),
            }
        }

        log::info!("Camera capture thread stopped");
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        format!("camera {} ({}x{})", self.camera_index, self.width, self.height)
    }

    fn start(&mut self, mailbox: FrameMailbox) -> Result<(), PipelineError> {
        if self.thread_handle.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        let (camera_index, width, height) = (self.camera_index, self.width, self.height);

        let handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || Self::capture_thread(camera_index, width, height, mailbox, running))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}
