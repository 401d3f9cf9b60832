//! Deterministic grid sprite-atlas packing with padding and edge extrusion.

use crate::error::{Error, PixResult};
use imgref::{ImgRef, ImgVec};
use rgb::RGBA8;
use serde::Serialize;

#[derive(Clone, Debug, Default)]
pub struct AtlasOptions {
    /// Grid columns; `None` picks `ceil(sqrt(frame count))`.
    pub columns: Option<usize>,
    /// Transparent pixels around each cell's content.
    pub padding: usize,
    /// Edge-replication width to prevent texture-sampling bleed.
    pub extrude: usize,
    /// Per-frame names; missing entries default to `frame_%04d`.
    pub names: Option<Vec<String>>,
    pub fps: Option<f32>,
    /// Image reference recorded in the metadata, default `spritesheet.png`.
    pub image: Option<String>,
}

/// Placement record of one frame in the packed canvas. The rect includes the
/// extruded border, not the padding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AtlasFrame {
    pub name: String,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct AtlasMeta {
    pub w: usize,
    pub h: usize,
    pub frame_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
}

/// The textual metadata document emitted alongside the packed image.
#[derive(Clone, Debug, Serialize)]
pub struct Atlas {
    pub image: String,
    pub meta: AtlasMeta,
    pub frames: Vec<AtlasFrame>,
    pub padding: usize,
    pub extrude: usize,
    pub origin: &'static str,
}

impl Atlas {
    pub fn to_json(&self) -> PixResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }
}

/// Pack equal-sized frames into a row-major grid canvas.
///
/// Cell size is `frame + 2·padding + 2·extrude` per axis. Extrusion replicates
/// each frame's 1-pixel border outward after the frame is drawn, reading the
/// already-written canvas pixels; corners stay transparent.
pub fn pack(frames: &[ImgRef<'_, RGBA8>], opts: &AtlasOptions) -> PixResult<(ImgVec<RGBA8>, Atlas)> {
    let Some(first) = frames.first() else {
        return Err(Error::NoFrames);
    };
    let (fw, fh) = (first.width(), first.height());
    for (i, f) in frames.iter().enumerate() {
        if f.width() != fw || f.height() != fh {
            return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})",
                i, f.width(), f.height(), fw, fh)));
        }
    }

    let padding = opts.padding;
    let extrude = opts.extrude;
    let cols = opts.columns
        .unwrap_or_else(|| (frames.len() as f64).sqrt().ceil() as usize)
        .max(1);
    let rows = frames.len().div_ceil(cols);
    let cell_w = fw + 2 * padding + 2 * extrude;
    let cell_h = fh + 2 * padding + 2 * extrude;
    let canvas_w = cols * cell_w;
    let canvas_h = rows * cell_h;

    let mut canvas = vec![RGBA8::new(0, 0, 0, 0); canvas_w * canvas_h];
    let mut records = Vec::with_capacity(frames.len());

    for (i, frame) in frames.iter().enumerate() {
        let col = i % cols;
        let row = i / cols;
        let x = col * cell_w + padding + extrude;
        let y = row * cell_h + padding + extrude;

        for (dy, src_row) in frame.rows().enumerate() {
            let start = (y + dy) * canvas_w + x;
            canvas[start..start + fw].copy_from_slice(src_row);
        }

        if extrude > 0 {
            // Top and bottom edge rows, replicated outward
            for e in 1..=extrude {
                canvas.copy_within(y * canvas_w + x..y * canvas_w + x + fw, (y - e) * canvas_w + x);
                let last = y + fh - 1;
                canvas.copy_within(last * canvas_w + x..last * canvas_w + x + fw, (last + e) * canvas_w + x);
            }
            // Left and right edge columns
            for dy in 0..fh {
                let row_base = (y + dy) * canvas_w;
                let left = canvas[row_base + x];
                let right = canvas[row_base + x + fw - 1];
                for e in 1..=extrude {
                    canvas[row_base + x - e] = left;
                    canvas[row_base + x + fw - 1 + e] = right;
                }
            }
        }

        let name = opts.names.as_ref()
            .and_then(|names| names.get(i).cloned())
            .unwrap_or_else(|| format!("frame_{i:04}"));
        records.push(AtlasFrame {
            name,
            x: x - extrude,
            y: y - extrude,
            w: fw + 2 * extrude,
            h: fh + 2 * extrude,
        });
    }

    let atlas = Atlas {
        image: opts.image.clone().unwrap_or_else(|| "spritesheet.png".into()),
        meta: AtlasMeta { w: canvas_w, h: canvas_h, frame_count: frames.len(), fps: opts.fps },
        frames: records,
        padding,
        extrude,
        origin: "topleft",
    };
    Ok((ImgVec::new(canvas, canvas_w, canvas_h), atlas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::ImgVec;

    fn solid(w: usize, h: usize, v: u8) -> ImgVec<RGBA8> {
        ImgVec::new(vec![RGBA8::new(v, v, v, 255); w * h], w, h)
    }

    #[test]
    fn auto_columns_is_ceil_sqrt() {
        let frames: Vec<ImgVec<RGBA8>> = (0..5).map(|i| solid(2, 2, i)).collect();
        let refs: Vec<_> = frames.iter().map(|f| f.as_ref()).collect();
        let (canvas, atlas) = pack(&refs, &AtlasOptions::default()).unwrap();
        // ceil(sqrt(5)) = 3 columns, 2 rows
        assert_eq!(atlas.meta.w, 6);
        assert_eq!(atlas.meta.h, 4);
        assert_eq!(canvas.width(), 6);
        assert_eq!(atlas.frames[4].name, "frame_0004");
    }

    #[test]
    fn rects_are_disjoint_and_in_bounds() {
        let frames: Vec<ImgVec<RGBA8>> = (0..7).map(|i| solid(3, 2, i)).collect();
        let refs: Vec<_> = frames.iter().map(|f| f.as_ref()).collect();
        let opts = AtlasOptions { columns: Some(4), padding: 1, extrude: 2, ..Default::default() };
        let (canvas, atlas) = pack(&refs, &opts).unwrap();
        for (i, a) in atlas.frames.iter().enumerate() {
            assert!(a.x + a.w <= canvas.width() && a.y + a.h <= canvas.height());
            for b in &atlas.frames[i + 1..] {
                let overlap = a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h;
                assert!(!overlap, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn mismatched_frame_sizes_fail() {
        let a = solid(2, 2, 1);
        let b = solid(3, 2, 2);
        let err = pack(&[a.as_ref(), b.as_ref()], &AtlasOptions::default()).unwrap_err();
        assert!(matches!(err, Error::WrongSize(_)));
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(pack(&[], &AtlasOptions::default()), Err(Error::NoFrames)));
    }

    #[test]
    fn json_metadata_round_trips_fields() {
        let f = solid(2, 2, 9);
        let opts = AtlasOptions { fps: Some(12.), ..Default::default() };
        let (_, atlas) = pack(&[f.as_ref()], &opts).unwrap();
        let json = atlas.to_json().unwrap();
        assert!(json.contains("\"frame_0000\""));
        assert!(json.contains("\"topleft\""));
        assert!(json.contains("\"spritesheet.png\""));
    }
}
