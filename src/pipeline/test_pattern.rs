//! Built-in test pattern source
//!
//! Produces scrolling colour bars on a background thread at a fixed rate.
//! Used when no capture hardware or media library is available.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{FrameMailbox, FrameSource, PipelineError, VideoFrame};

/// SMPTE-style bar colours
const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Render one pattern frame, with bars shifted left by `offset` pixels
pub fn pattern_frame(width: u32, height: u32, offset: u32) -> VideoFrame {
    let w = width.max(1);
    let mut row = Vec::with_capacity(w as usize * 3);
    for x in 0..w {
        let shifted = (x + offset) % w;
        let bar = (shifted as usize * BARS.len()) / w as usize;
        row.extend_from_slice(&BARS[bar]);
    }

    let mut data = Vec::with_capacity(row.len() * height as usize);
    for _ in 0..height {
        data.extend_from_slice(&row);
    }

    VideoFrame {
        data,
        width: w,
        height,
        sequence: 0,
    }
}

/// Scrolling colour bar generator
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_rate: u32,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate: frame_rate.max(1),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    fn pattern_thread(
        width: u32,
        height: u32,
        frame_rate: u32,
        mailbox: FrameMailbox,
        running: Arc<AtomicBool>,
    ) {
        log::info!("Test pattern started ({}x{} @ {}fps)", width, height, frame_rate);

        let frame_duration = Duration::from_nanos(1_000_000_000u64 / frame_rate as u64);
        let mut next_frame_at = Instant::now();
        let mut offset = 0u32;

        while running.load(Ordering::Acquire) {
            mailbox.publish(pattern_frame(width, height, offset));
            offset = offset.wrapping_add(4);

            next_frame_at += frame_duration;
            let now = Instant::now();
            if next_frame_at > now {
                std::thread::sleep(next_frame_at - now);
            } else {
                next_frame_at = now;
            }
        }

        log::info!("Test pattern stopped");
    }
}

impl FrameSource for TestPatternSource {
    fn describe(&self) -> String {
        format!("test pattern {}x{}", self.width, self.height)
    }

    fn start(&mut self, mailbox: FrameMailbox) -> Result<(), PipelineError> {
        if self.thread_handle.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        let (width, height, frame_rate) = (self.width, self.height, self.frame_rate);

        let handle = std::thread::Builder::new()
            .name("test-pattern".to_string())
            .spawn(move || Self::pattern_thread(width, height, frame_rate, mailbox, running))?;

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

impl Drop for TestPatternSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frame_layout() {
        let frame = pattern_frame(70, 2, 0);
        assert_eq!(frame.data.len(), VideoFrame::expected_size(70, 2));
        // First and last columns land in the first and last bars
        assert_eq!(&frame.data[0..3], &BARS[0]);
        assert_eq!(&frame.data[69 * 3..70 * 3], &BARS[6]);
        // Rows are identical
        assert_eq!(frame.data[..210], frame.data[210..]);
    }

    #[test]
    fn test_pattern_scrolls() {
        let a = pattern_frame(70, 1, 0);
        let b = pattern_frame(70, 1, 10);
        assert_eq!(&b.data[0..3], &BARS[1]);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_source_publishes_until_stopped() {
        let mailbox = FrameMailbox::new();
        let mut source = TestPatternSource::new(8, 4, 200);
        source.start(mailbox.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while mailbox.published() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        source.stop();

        let frame = mailbox.take().expect("pattern frame");
        assert_eq!((frame.width, frame.height), (8, 4));

        let published = mailbox.published();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(mailbox.published(), published);
    }
}
