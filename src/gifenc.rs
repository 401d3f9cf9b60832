//! GIF89a stream assembly.
//!
//! One global color table per job: either a supplied fixed palette padded to a
//! power of two, or the built-in 3-3-2 table when no usable fixed palette is
//! available. Per-frame LZW compression is a separate, parallelizable step
//! ([`compress_frame`]); [`GifEncoder`] is the serialized ordered sink.

use crate::error::{Error, PixResult};
use crate::lzw;
use crate::palette::{nearest, Palette};
use imgref::ImgRef;
use rgb::{RGB8, RGBA8};
use std::io::Write;

/// Built-in fixed 3-3-2 (8/8/4 levels) table. Not content-adaptive, so every
/// frame of a job maps to identical, stable indices.
pub(crate) static GIF332: [RGB8; 256] = build_332();

const fn expand(v: u16, max: u16) -> u8 {
    ((v * 255 + max / 2) / max) as u8
}

const fn build_332() -> [RGB8; 256] {
    let mut table = [RGB8 { r: 0, g: 0, b: 0 }; 256];
    let mut r3 = 0u16;
    while r3 < 8 {
        let mut g3 = 0u16;
        while g3 < 8 {
            let mut b2 = 0u16;
            while b2 < 4 {
                let idx = (r3 << 5) | (g3 << 2) | b2;
                table[idx as usize] = RGB8 {
                    r: expand(r3, 7),
                    g: expand(g3, 7),
                    b: expand(b2, 3),
                };
                b2 += 1;
            }
            g3 += 1;
        }
        r3 += 1;
    }
    table
}

enum TableKind {
    /// Nearest-color lookup against the supplied palette entries.
    Fixed(Vec<RGB8>),
    /// Direct `(r>>5)<<5 | (g>>5)<<2 | (b>>6)` bit mapping.
    Formula332,
}

/// The job-wide global color table plus its pixel-to-index mapping.
pub struct GlobalTable {
    kind: TableKind,
    /// Flattened RGB bytes, zero-padded to a power-of-two entry count ≤ 256.
    rgb: Vec<u8>,
    entries: usize,
}

impl GlobalTable {
    /// Fixed palettes with 1..=256 colors become the global table verbatim;
    /// anything else falls back to the built-in 3-3-2 table.
    #[must_use]
    pub fn for_palette(palette: &Palette) -> Self {
        match palette.colors() {
            Some(colors) if !colors.is_empty() && colors.len() <= 256 => {
                let entries = colors.len().max(2).next_power_of_two();
                let mut rgb = rgb::bytemuck::cast_slice::<RGB8, u8>(colors).to_vec();
                rgb.resize(entries * 3, 0);
                Self { kind: TableKind::Fixed(colors.to_vec()), rgb, entries }
            },
            _ => Self {
                kind: TableKind::Formula332,
                rgb: rgb::bytemuck::cast_slice::<RGB8, u8>(&GIF332).to_vec(),
                entries: 256,
            },
        }
    }

    /// Power-of-two entry count of the emitted table (2..=256).
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// LZW minimum code size: `clamp(log2(entries), 2, 8)`.
    #[must_use]
    pub fn min_code_size(&self) -> u8 {
        (self.entries.trailing_zeros() as u8).clamp(2, 8)
    }

    #[must_use]
    pub fn index_of(&self, px: RGB8) -> u8 {
        let idx = match &self.kind {
            TableKind::Fixed(colors) => nearest(colors, px),
            TableKind::Formula332 => {
                usize::from(px.r >> 5) << 5 | usize::from(px.g >> 5) << 2 | usize::from(px.b >> 6)
            },
        };
        // Deliberate lossy fallback rather than an error
        idx.min(self.entries - 1) as u8
    }

    fn map_indices(&self, frame: ImgRef<'_, RGBA8>) -> Vec<u8> {
        frame.pixels().map(|px| self.index_of(px.rgb())).collect()
    }
}

/// One frame's LZW-compressed index stream, ready for ordered assembly.
pub struct CompressedFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// The per-frame pass: map pixels to global-table indices, then LZW-compress.
/// Independent per frame; safe to run on any number of workers.
#[must_use]
pub fn compress_frame(frame: ImgRef<'_, RGBA8>, table: &GlobalTable) -> CompressedFrame {
    let indices = table.map_indices(frame);
    CompressedFrame {
        width: frame.width(),
        height: frame.height(),
        data: lzw::compress(&indices, table.min_code_size()),
    }
}

/// Per-frame delay in centiseconds, floored at the GIF-practical minimum of 2.
#[must_use]
pub fn delay_cs(fps: f32) -> u16 {
    (100. / fps.max(1.)).round().max(2.) as u16
}

/// Serialized GIF89a sink. Frames must arrive in presentation order; the
/// header and global table are emitted with the first frame, the trailer by
/// [`GifEncoder::finish`]. Loops forever via the Netscape extension.
pub struct GifEncoder<'t, W: Write> {
    out: W,
    table: &'t GlobalTable,
    delay_cs: u16,
    screen: Option<(u16, u16)>,
    frames: u64,
}

impl<'t, W: Write> GifEncoder<'t, W> {
    pub fn new(out: W, table: &'t GlobalTable, fps: f32) -> Self {
        Self { out, table, delay_cs: delay_cs(fps), screen: None, frames: 0 }
    }

    fn u16le(&mut self, v: u16) -> std::io::Result<()> {
        self.out.write_all(&v.to_le_bytes())
    }

    fn start(&mut self, width: u16, height: u16) -> PixResult<()> {
        self.out.write_all(b"GIF89a")?;
        self.u16le(width)?;
        self.u16le(height)?;
        let power = self.table.entries().trailing_zeros() as u8; // 1..=8
        let size_field = power.saturating_sub(1);
        // global color table flag | color resolution | sort=0 | table size
        self.out.write_all(&[0x80 | ((size_field & 0x07) << 4) | (size_field & 0x07), 0x00, 0x00])?;
        self.out.write_all(&self.table.rgb)?;

        // NETSCAPE2.0 application extension, loop count 0 = forever
        self.out.write_all(&[0x21, 0xFF, 11])?;
        self.out.write_all(b"NETSCAPE2.0")?;
        self.out.write_all(&[3, 1, 0, 0, 0])?;
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &CompressedFrame) -> PixResult<()> {
        let width = u16::try_from(frame.width).map_err(|_| Error::WrongSize(format!("Frame {} is too large ({}×{})", self.frames, frame.width, frame.height)))?;
        let height = u16::try_from(frame.height).map_err(|_| Error::WrongSize(format!("Frame {} is too large ({}×{})", self.frames, frame.width, frame.height)))?;
        match self.screen {
            None => {
                self.start(width, height)?;
                self.screen = Some((width, height));
            },
            Some((sw, sh)) => {
                if (sw, sh) != (width, height) {
                    return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})",
                        self.frames, width, height, sw, sh)));
                }
            },
        }

        // Graphic Control Extension: no disposal, no transparency
        self.out.write_all(&[0x21, 0xF9, 4, 0x00])?;
        self.u16le(self.delay_cs)?;
        self.out.write_all(&[0x00, 0x00])?;

        // Image Descriptor: full screen, no local table, not interlaced
        self.out.write_all(&[0x2C])?;
        self.u16le(0)?;
        self.u16le(0)?;
        self.u16le(width)?;
        self.u16le(height)?;
        self.out.write_all(&[0x00])?;

        self.out.write_all(&[self.table.min_code_size()])?;
        for block in frame.data.chunks(255) {
            self.out.write_all(&[block.len() as u8])?;
            self.out.write_all(block)?;
        }
        self.out.write_all(&[0x00])?;

        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> PixResult<()> {
        if self.frames == 0 {
            return Err(Error::NoFrames);
        }
        self.out.write_all(&[0x3B])?;
        self.out.flush()?;
        tracing::debug!(frames = self.frames, "gif stream complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_to_power_of_two() {
        let t = GlobalTable::for_palette(&Palette::fixed(vec![
            RGB8 { r: 255, g: 0, b: 0 },
            RGB8 { r: 0, g: 255, b: 0 },
            RGB8 { r: 0, g: 0, b: 255 },
        ]));
        assert_eq!(t.entries(), 4);
        assert_eq!(t.min_code_size(), 2);
        assert_eq!(t.rgb.len(), 12);
        assert_eq!(&t.rgb[9..], &[0, 0, 0]);
    }

    #[test]
    fn formula_palettes_fall_back_to_332() {
        let t = GlobalTable::for_palette(&Palette::Rgb565);
        assert_eq!(t.entries(), 256);
        assert_eq!(t.min_code_size(), 8);
        assert_eq!(t.index_of(RGB8 { r: 255, g: 255, b: 255 }), 255);
        assert_eq!(t.index_of(RGB8 { r: 0, g: 0, b: 0 }), 0);
        // idx = (r>>5)<<5 | (g>>5)<<2 | (b>>6)
        assert_eq!(t.index_of(RGB8 { r: 0x40, g: 0x80, b: 0xC0 }), (2 << 5) | (4 << 2) | 3);
    }

    #[test]
    fn delay_is_centiseconds_with_floor() {
        assert_eq!(delay_cs(10.), 10);
        assert_eq!(delay_cs(30.), 3);
        assert_eq!(delay_cs(100.), 2);
        assert_eq!(delay_cs(0.), 100); // fps floored at 1
    }

    #[test]
    fn tiny_table_still_uses_two_bit_codes() {
        let t = GlobalTable::for_palette(&Palette::fixed(vec![RGB8 { r: 0, g: 0, b: 0 }]));
        assert_eq!(t.entries(), 2);
        assert_eq!(t.min_code_size(), 2);
    }
}
