//! Palette remapping with optional ordered or error-diffusion dithering.

use crate::palette::Palette;
use imgref::{ImgRef, ImgVec};
use rgb::{RGB8, RGBA8};

/// The fixed 4×4 Bayer threshold matrix used by [`DitherMode::Ordered`].
pub const BAYER4: [u8; 16] = [
    0, 8, 2, 10,
    12, 4, 14, 6,
    3, 11, 1, 9,
    15, 7, 13, 5,
];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DitherMode {
    /// Independent per-pixel nearest/formula quantization.
    #[default]
    None,
    /// Bayer-matrix perturbation before quantizing. Stateless per pixel.
    ///
    /// Note that `intensity` 0 still perturbs: the bias floors at 8, so this
    /// mode is never equivalent to [`DitherMode::None`].
    Ordered,
    /// Floyd–Steinberg-style error diffusion. Sequential within a frame.
    ErrorDiffusion,
}

/// Pure per-job dithering configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DitherConfig {
    pub mode: DitherMode,
    /// 0..1
    pub intensity: f32,
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self { mode: DitherMode::None, intensity: 0.5 }
    }
}

#[inline]
fn clamp8(v: f32) -> u8 {
    v.clamp(0., 255.).round() as u8
}

/// Produce a new buffer with every pixel's RGB replaced by its palette
/// representative, optionally dithered. Alpha passes through unchanged.
#[must_use]
pub fn remap(frame: ImgRef<'_, RGBA8>, palette: &Palette, cfg: &DitherConfig) -> ImgVec<RGBA8> {
    let width = frame.width();
    let height = frame.height();
    let mut buf: Vec<RGBA8> = Vec::with_capacity(width * height);
    buf.extend(frame.rows().flat_map(|r| r.iter().copied()));

    match cfg.mode {
        DitherMode::None => {
            for px in &mut buf {
                let q = palette.map(px.rgb());
                (px.r, px.g, px.b) = (q.r, q.g, q.b);
            }
        },
        DitherMode::Ordered => {
            let bias = (8. + 24. * cfg.intensity).floor();
            for y in 0..height {
                for x in 0..width {
                    let px = &mut buf[y * width + x];
                    let t = f32::from(BAYER4[(y & 3) * 4 + (x & 3)]) - 7.5;
                    let q = palette.map(RGB8 {
                        r: clamp8(f32::from(px.r) + t * bias),
                        g: clamp8(f32::from(px.g) + t * bias),
                        b: clamp8(f32::from(px.b) + t * bias),
                    });
                    (px.r, px.g, px.b) = (q.r, q.g, q.b);
                }
            }
        },
        DitherMode::ErrorDiffusion => {
            let factor = 0.25 + cfg.intensity * 0.75;
            // Strict raster order: each pixel quantizes its already-perturbed
            // value and pushes the residual onto not-yet-visited neighbors.
            for y in 0..height {
                for x in 0..width {
                    let px = buf[y * width + x];
                    let q = palette.map(px.rgb());
                    let er = (f32::from(px.r) - f32::from(q.r)) * factor;
                    let eg = (f32::from(px.g) - f32::from(q.g)) * factor;
                    let eb = (f32::from(px.b) - f32::from(q.b)) * factor;
                    let out = &mut buf[y * width + x];
                    (out.r, out.g, out.b) = (q.r, q.g, q.b);

                    let mut add_at = |xx: isize, yy: isize, weight: f32| {
                        if xx >= 0 && (xx as usize) < width && yy >= 0 && (yy as usize) < height {
                            let n = &mut buf[yy as usize * width + xx as usize];
                            n.r = clamp8(f32::from(n.r) + er * weight);
                            n.g = clamp8(f32::from(n.g) + eg * weight);
                            n.b = clamp8(f32::from(n.b) + eb * weight);
                        }
                    };
                    let (x, y) = (x as isize, y as isize);
                    add_at(x + 1, y, 7. / 16.);
                    add_at(x - 1, y + 1, 3. / 16.);
                    add_at(x, y + 1, 5. / 16.);
                    add_at(x + 1, y + 1, 1. / 16.);
                }
            }
        },
    }

    ImgVec::new(buf, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::ImgVec;

    fn solid(w: usize, h: usize, px: RGBA8) -> ImgVec<RGBA8> {
        ImgVec::new(vec![px; w * h], w, h)
    }

    #[test]
    fn mode_none_is_idempotent_on_palette_exact_input() {
        let pal = Palette::named("funky").unwrap();
        let cfg = DitherConfig { mode: DitherMode::None, intensity: 0.5 };
        let noisy = ImgVec::new(
            (0..64).map(|i| RGBA8::new(i as u8 * 4, 255 - i as u8, i as u8, 200)).collect(),
            8, 8,
        );
        let once = remap(noisy.as_ref(), &pal, &cfg);
        let twice = remap(once.as_ref(), &pal, &cfg);
        assert_eq!(once.buf(), twice.buf());
    }

    #[test]
    fn alpha_passes_through() {
        let pal = Palette::Rgb332;
        let frame = solid(4, 4, RGBA8::new(13, 77, 200, 31));
        for mode in [DitherMode::None, DitherMode::Ordered, DitherMode::ErrorDiffusion] {
            let out = remap(frame.as_ref(), &pal, &DitherConfig { mode, intensity: 1. });
            assert!(out.pixels().all(|px| px.a == 31));
        }
    }

    #[test]
    fn ordered_zero_intensity_still_perturbs() {
        // bias = floor(8 + 24*0) = 8, so intensity 0 is not a no-op
        let pal = Palette::Rgb332;
        let frame = solid(4, 4, RGBA8::new(128, 128, 128, 255));
        let none = remap(frame.as_ref(), &pal, &DitherConfig { mode: DitherMode::None, intensity: 0. });
        let ordered = remap(frame.as_ref(), &pal, &DitherConfig { mode: DitherMode::Ordered, intensity: 0. });
        assert_ne!(none.buf(), ordered.buf());
    }

    #[test]
    fn error_diffusion_is_identity_on_palette_exact_input() {
        // Residuals are zero everywhere, so nothing diffuses
        let pal = Palette::fixed(vec![RGB8 { r: 10, g: 20, b: 30 }]);
        let frame = solid(3, 3, RGBA8::new(10, 20, 30, 255));
        let out = remap(frame.as_ref(), &pal, &DitherConfig { mode: DitherMode::ErrorDiffusion, intensity: 1. });
        assert_eq!(out.buf(), frame.buf());
    }

    #[test]
    fn out_of_bounds_error_targets_are_dropped() {
        // 1×1 frame has no neighbors at all; must not panic
        let pal = Palette::Rgb332;
        let frame = solid(1, 1, RGBA8::new(99, 99, 99, 255));
        let out = remap(frame.as_ref(), &pal, &DitherConfig { mode: DitherMode::ErrorDiffusion, intensity: 1. });
        assert_eq!(out.width(), 1);
    }
}
