//! Frame source boundary
//!
//! Capture hardware lives outside this workspace. The pipeline pulls frames
//! through this trait; `None` means the stream ended cleanly.

use crate::{FrameError, VideoFrame};

/// Pull-based frame supplier driven by the processing cycle
pub trait FrameSource: Send {
    /// Acquire the next frame, or `None` when the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameError>;
}

/// Scripted frame source for tests and dry runs
///
/// Replays a fixed set of frames in order, stamping sequence numbers and
/// evenly spaced timestamps.
pub struct SyntheticSource {
    frames: Vec<VideoFrame>,
    cursor: usize,
    interval_us: u64,
}

impl SyntheticSource {
    /// Create a source replaying `frames` at the given frame interval
    pub fn new(frames: Vec<VideoFrame>, interval_us: u64) -> Self {
        Self {
            frames,
            cursor: 0,
            interval_us,
        }
    }

    /// Uniform-brightness source of `count` frames
    pub fn uniform(width: u32, height: u32, value: u8, count: usize, interval_us: u64) -> Self {
        let frames = (0..count)
            .map(|i| VideoFrame {
                data: vec![value; (width * height) as usize],
                width,
                height,
                timestamp_us: i as u64 * interval_us,
                sequence: i as u32,
            })
            .collect();
        Self::new(frames, interval_us)
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameError> {
        if self.cursor >= self.frames.len() {
            return Ok(None);
        }
        let mut frame = self.frames[self.cursor].clone();
        frame.sequence = self.cursor as u32;
        frame.timestamp_us = self.cursor as u64 * self.interval_us;
        self.cursor += 1;
        Ok(Some(frame))
    }
}
