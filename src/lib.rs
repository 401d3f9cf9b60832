//! Turns sampled video frames into stylized pixel-art animations.
//!
//! The pieces compose freely: [`dither::remap`] quantizes a frame against a
//! [`Palette`] with optional dithering, [`scenecut::SceneChangeDetector`]
//! flags keyframes, [`atlas::pack`] builds a sprite atlas, and the
//! [`gifenc`]/[`apng`] modules serialize animation byte streams from scratch
//! (including the GIF LZW pass and PNG chunk/CRC handling).
//!
//! For GIF export, [`new()`] returns a [`Collector`]/[`Writer`] pair:
//! frames are remapped and LZW-compressed on a worker pool, then assembled
//! into the byte stream in frame order. [`encode_gif`] wraps that pipeline
//! for callers that already hold all frames in memory.
//!
//! Video decoding, per-frame PNG compression and file I/O are the caller's
//! business; everything here works on in-memory buffers.

pub use imgref::{ImgRef, ImgVec};
pub use rgb::{RGB8, RGBA8};

mod error;
pub use crate::error::*;
mod collector;
pub use crate::collector::Collector;
pub mod apng;
pub mod atlas;
pub mod dither;
pub mod gifenc;
pub mod palette;
pub mod progress;
pub mod scenecut;

mod lzw;
mod pool;
mod reorder;

use crate::apng::ApngEncoder;
use crate::dither::DitherConfig;
use crate::gifenc::{GifEncoder, GlobalTable};
use crate::palette::Palette;
use crate::progress::{NoProgress, ProgressReporter};
use std::io::Write;

/// Immutable per-job configuration. No implicit state is held between jobs;
/// two writers with the same settings produce byte-identical streams.
#[derive(Clone, Debug)]
pub struct Settings {
    pub fps: f32,
    pub palette: Palette,
    pub dither: DitherConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: 10.,
            palette: Palette::Rgb332,
            dither: DitherConfig::default(),
        }
    }
}

/// Start new encoding
///
/// Encoding is multi-threaded, and the `Collector` and `Writer`
/// can be used on separate threads.
pub fn new(settings: Settings) -> PixResult<(Collector, Writer)> {
    let (queue, queue_recv) = crossbeam_channel::bounded(8);
    Ok((
        Collector { queue },
        Writer { queue: queue_recv, settings },
    ))
}

/// Perform GIF writing
pub struct Writer {
    queue: crossbeam_channel::Receiver<collector::InputFrame>,
    settings: Settings,
}

impl Writer {
    /// Start writing frames. This function will not return until the
    /// [`Collector`] is dropped.
    ///
    /// `out` can be any writer, such as `File` or `&mut Vec`.
    ///
    /// `ProgressReporter.increase()` is called each time a new frame is
    /// written; returning `false` aborts between frames.
    pub fn write<W: Write>(self, out: W, reporter: &mut dyn ProgressReporter) -> PixResult<()> {
        let Writer { queue, settings } = self;
        let table = GlobalTable::for_palette(&settings.palette);
        let threads = remap_threads();
        let (remapped, remapped_iter) = reorder::new(threads * 2);

        let table = &table;
        let settings = &settings;
        std::thread::scope(move |scope| -> PixResult<()> {
            let pool = std::thread::Builder::new()
                .name("remap".into())
                .spawn_scoped(scope, move || {
                    pool::run(threads, "remap", move |tx| {
                        for frame in queue {
                            tx.send(frame)?;
                        }
                        Ok(())
                    }, move |f: collector::InputFrame| {
                        // Ordered/none dithering and histogramming parallelize
                        // per pixel too, but frames are the cheaper unit here;
                        // error diffusion stays sequential within a frame.
                        let styled = dither::remap(f.frame.as_ref(), &settings.palette, &settings.dither);
                        remapped.push(f.frame_index, gifenc::compress_frame(styled.as_ref(), table))
                    })
                })
                .map_err(|_| Error::ThreadSend)?;

            let mut enc = GifEncoder::new(out, table, settings.fps);
            for frame in remapped_iter {
                enc.write_frame(&frame)?;
                if !reporter.increase() {
                    return Err(Error::Aborted);
                }
            }
            pool.join().map_err(|_| Error::ThreadSend)??;
            enc.finish()
        })
    }
}

fn remap_threads() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get()).clamp(1, 8)
}

/// One-shot GIF encode for callers that already hold every frame.
///
/// All frame dimensions are validated before a single byte is produced, so a
/// size mismatch never yields partial output.
pub fn encode_gif(frames: Vec<ImgVec<RGBA8>>, settings: Settings) -> PixResult<Vec<u8>> {
    let Some(first) = frames.first() else {
        return Err(Error::NoFrames);
    };
    let (width, height) = (first.width(), first.height());
    for (i, f) in frames.iter().enumerate() {
        if f.width() != width || f.height() != height {
            return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})",
                i, f.width(), f.height(), width, height)));
        }
    }

    let (collector, writer) = new(settings)?;
    let mut out = Vec::new();
    std::thread::scope(|scope| -> PixResult<()> {
        let feeder = scope.spawn(move || -> PixResult<()> {
            for (i, frame) in frames.into_iter().enumerate() {
                collector.add_frame_rgba(i, frame)?;
            }
            Ok(())
        });
        writer.write(&mut out, &mut NoProgress {})?;
        feeder.join().map_err(|_| Error::ThreadSend)?
    })?;
    Ok(out)
}

/// One-shot APNG assembly from per-frame single-image PNG streams.
pub fn encode_apng(frame_pngs: Vec<Vec<u8>>, fps: f32) -> PixResult<Vec<u8>> {
    let mut enc = ApngEncoder::new(fps);
    for png in frame_pngs {
        enc.add_frame_png(png);
    }
    enc.to_vec()
}
