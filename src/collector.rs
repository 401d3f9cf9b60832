//! For adding frames to the encoder
//!
//! [`pixelpack::new()`][crate::new] returns the [`Collector`] that collects
//! animation frames, and a [`Writer`][crate::Writer] that performs
//! quantization, compression and I/O.

pub use imgref::ImgVec;
pub use rgb::RGBA8;

use crate::error::PixResult;
use crossbeam_channel::Sender;

pub(crate) struct InputFrame {
    /// The pixels to remap and encode
    pub frame: ImgVec<RGBA8>,
    pub frame_index: usize,
}

/// Collect frames that will be encoded
///
/// Note that writing will finish only when the collector is dropped.
/// Collect frames on another thread, or call `drop(collector)` before calling
/// `writer.write()`!
pub struct Collector {
    pub(crate) queue: Sender<InputFrame>,
}

impl Collector {
    /// Frame index starts at 0.
    ///
    /// Set each frame (index) only once, but you can set them in any order.
    /// However, out-of-order frames will be buffered in RAM, and big gaps in
    /// frame indices will cause high memory usage.
    ///
    /// All frames of one job must share the same dimensions.
    ///
    /// If this function appears to be stuck, it's because
    /// [`crate::Writer::write()`] is not running.
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn add_frame_rgba(&self, frame_index: usize, frame: ImgVec<RGBA8>) -> PixResult<()> {
        self.queue.send(InputFrame { frame, frame_index })?;
        Ok(())
    }
}
