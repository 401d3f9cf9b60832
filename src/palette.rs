//! Fixed color tables and closed-form bit-depth reductions.
//!
//! A [`Palette`] is either an ordered table of up to 256 colors searched by
//! nearest squared-distance match, or a pure per-channel formula that needs no
//! table at all. Palettes are immutable and cheap to clone; the built-in ones
//! are `static` tables.

use rgb::RGB8;
use std::borrow::Cow;

const fn c(n: u32) -> RGB8 {
    RGB8 { r: (n >> 16) as u8, g: (n >> 8) as u8, b: n as u8 }
}

pub static PICO8: &[RGB8] = &[
    c(0x000000), c(0x1D2B53), c(0x7E2553), c(0x008751), c(0xAB5236), c(0x5F574F), c(0xC2C3C7), c(0xFFF1E8),
    c(0xFF004D), c(0xFFA300), c(0xFFEC27), c(0x00E436), c(0x29ADFF), c(0x83769C), c(0xFF77A8), c(0xFFCCAA),
];

pub static VOODO8BIT: &[RGB8] = &[
    c(0xFFDA71), c(0xD0A047), c(0xE8B08E), c(0xBA877F), c(0x7F425A), c(0x3E2542),
];

pub static VAMPIRE: &[RGB8] = &[
    c(0x050002), c(0x171237), c(0x31144F), c(0x3E207B), c(0x84266E), c(0xC355DA), c(0x74AEFF),
];

pub static FUNKY: &[RGB8] = &[
    c(0x610066), c(0xCC0000), c(0x1AACF5), c(0xBDFF99),
];

pub static VINIK24: &[RGB8] = &[
    c(0xD1B187), c(0xC77B58), c(0xAE5D40), c(0x79444A), c(0x4B3D44), c(0xBA9158), c(0x927441), c(0x4D4539),
    c(0x77743B), c(0xB3A555), c(0xD2C9A5), c(0x8CABA1), c(0x4B726E), c(0x574852), c(0x847875), c(0xAB9B8E),
];

pub static TEMPLE: &[RGB8] = &[
    c(0xFFFFFF), c(0xD6CDD4), c(0xB4A8B6), c(0x8E8496), c(0x676375), c(0x494151),
    c(0xEEEEB4), c(0xDCBF81), c(0xDDA082), c(0xD88282), c(0xC77B51), c(0x7C3B17),
    c(0x500D06), c(0x000000),
];

// The duplicated runs below are verbatim from the palette's published form.
// They don't change nearest-match results, only index numbering.
pub static PASTEL: &[RGB8] = &[
    c(0xF2AE99), c(0xF2AE99), c(0xC97373), c(0xC97373), c(0xA6555F), c(0xA6555F), c(0x873555), c(0x873555),
    c(0x611851), c(0x611851), c(0x390947), c(0x390947), c(0x751756), c(0x751756),
    c(0xA32858), c(0xA32858), c(0xCC425E), c(0xCC425E), c(0xEA6262), c(0xEA6262), c(0xF49373), c(0xF49373),
    c(0xFFB879), c(0xFFB879), c(0xF9CD8E), c(0xF9CD8E), c(0xFCEF8D), c(0xFCEF8D), c(0xBDF767), c(0xBDF767),
    c(0x99E65F), c(0x99E65F), c(0x5AC54F), c(0x5AC54F), c(0x30A15F), c(0x30A15F), c(0x1F8962), c(0x1F8962),
    c(0x18685B), c(0x18685B), c(0x0E3850), c(0x0E3850), c(0x0D6D80), c(0x0D6D80), c(0x1B9C95), c(0x1B9C95),
    c(0x2BBD97), c(0x2BBD97), c(0x4DD092), c(0x4DD092), c(0x65E78F), c(0x65E78F), c(0x84F793), c(0x84F793),
    c(0xC3FF98), c(0xC3FF98), c(0xFFFFFF), c(0xFFFFFF), c(0xC9F7FF), c(0xC9F7FF), c(0xAEE2FF), c(0xAEE2FF),
    c(0x8DB7FF), c(0x8DB7FF), c(0x6D80FA), c(0x6D80FA), c(0x5B5BEC), c(0x5B5BEC), c(0x6646DE), c(0x6646DE),
    c(0x6128AF), c(0x6128AF), c(0x4E187C), c(0x4E187C), c(0x7D2DA0), c(0x7D2DA0), c(0x834DC4), c(0x834DC4),
    c(0x8465EC), c(0x8465EC), c(0x8282FF), c(0x8282FF), c(0x5B34AF), c(0x5B34AF), c(0xA452D5), c(0xA452D5),
    c(0xCD5BE3), c(0xCD5BE3), c(0xFF70E8), c(0xFF70E8), c(0xFFC3F2), c(0xFFC3F2), c(0xEE8FCB), c(0xEE8FCB),
    c(0xD46EB3), c(0xD46EB3), c(0x873E84), c(0x873E84), c(0x1F102A), c(0x1F102A), c(0x4A3052), c(0x4A3052),
    c(0x7B5480), c(0x7B5480), c(0xA6859F), c(0xA6859F), c(0xD9BDC8), c(0xD9BDC8), c(0x4C245A), c(0x4C245A),
    c(0x5A3271), c(0x5A3271), c(0x5B4180), c(0x5B4180), c(0x695D97), c(0x695D97), c(0x8181C2), c(0x8181C2),
    c(0xA0B3DE), c(0xA0B3DE), c(0xCBDCF2), c(0xCBDCF2), c(0xD1F8FF),
];

pub static PASTEL2: &[RGB8] = &[
    c(0x050914), c(0x050914), c(0x110524), c(0x110524), c(0x3B063A), c(0x3B063A), c(0x691749), c(0x691749),
    c(0x9C3247), c(0x9C3247), c(0xD46453), c(0xD46453), c(0xF5A15D), c(0xF5A15D), c(0xFFCF8E), c(0xFFCF8E),
    c(0xFF7A7D), c(0xFF7A7D), c(0xFF417D), c(0xFF417D), c(0xD61A88), c(0xD61A88), c(0x94007A), c(0x94007A),
    c(0x42004E), c(0x42004E), c(0x220029), c(0x220029), c(0x100726), c(0x100726), c(0x25082C), c(0x25082C),
    c(0x3D1132), c(0x3D1132), c(0x73263D), c(0x73263D), c(0xBD4035), c(0xBD4035), c(0xED7B39), c(0xED7B39),
    c(0xFFB84A), c(0xFFB84A), c(0xFFF540), c(0xFFF540), c(0xC6D831), c(0xC6D831), c(0x77B02A), c(0x77B02A),
    c(0x429058), c(0x429058), c(0x2C645E), c(0x2C645E), c(0x153C4A), c(0x153C4A), c(0x052137), c(0x052137),
    c(0x0E0421), c(0x0E0421), c(0x0C0B42), c(0x0C0B42), c(0x032769), c(0x032769), c(0x144491), c(0x144491),
    c(0x488BD4), c(0x488BD4), c(0x78D7FF), c(0x78D7FF), c(0xB0FFF1), c(0xB0FFF1), c(0xFAFFFF), c(0xFAFFFF),
    c(0xC7D4E1), c(0xC7D4E1), c(0x928FB8), c(0x928FB8), c(0x5B537D), c(0x5B537D), c(0x392946), c(0x392946),
    c(0x24142C), c(0x24142C), c(0x0E0F2C), c(0x0E0F2C), c(0x132243), c(0x132243), c(0x1A466B), c(0x1A466B),
    c(0x10908E), c(0x10908E), c(0x28C074), c(0x28C074), c(0x3DFF6E), c(0x3DFF6E), c(0xF8FFB8), c(0xF8FFB8),
    c(0xF0C297), c(0xF0C297), c(0xCF968C), c(0xCF968C), c(0x8F5765), c(0x8F5765), c(0x52294B), c(0x52294B),
    c(0x0F022E), c(0x0F022E), c(0x35003B), c(0x35003B), c(0x64004C), c(0x64004C), c(0x9B0E3E), c(0x9B0E3E),
    c(0xD41E3C), c(0xD41E3C), c(0xED4C40), c(0xED4C40), c(0xFF9757), c(0xFF9757), c(0xD4662F), c(0xD4662F),
    c(0x9C341A), c(0x9C341A), c(0x691B22), c(0x691B22), c(0x450C28), c(0x450C28), c(0x2D002E),
];

/// A process-wide constant mapping from true color to a reduced color set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Palette {
    /// Ordered table of colors. Nearest match wins; the earlier index wins ties.
    Fixed(Cow<'static, [RGB8]>),
    /// 5-6-5 per-channel reduction (16-bit look). No table.
    Rgb565,
    /// 3-3-2 per-channel reduction (8-bit look), consistent with the GIF
    /// encoder's built-in fallback table.
    Rgb332,
}

impl Palette {
    #[inline]
    #[must_use]
    pub fn fixed(colors: Vec<RGB8>) -> Self {
        Palette::Fixed(Cow::Owned(colors))
    }

    /// Look up a built-in palette by its id.
    #[must_use]
    pub fn named(id: &str) -> Option<Self> {
        let table = match id {
            "rgb565" => return Some(Palette::Rgb565),
            "rgb332" => return Some(Palette::Rgb332),
            "pico8" => PICO8,
            "voodo8bit" => VOODO8BIT,
            "vampire" => VAMPIRE,
            "funky" => FUNKY,
            "vinik24" => VINIK24,
            "temple" => TEMPLE,
            "pastel" => PASTEL,
            "pastel2" => PASTEL2,
            _ => return None,
        };
        Some(Palette::Fixed(Cow::Borrowed(table)))
    }

    /// Colors of a fixed palette, `None` for formula palettes.
    #[must_use]
    pub fn colors(&self) -> Option<&[RGB8]> {
        match self {
            Palette::Fixed(colors) => Some(colors),
            _ => None,
        }
    }

    /// Replace a color with its palette representative.
    #[must_use]
    pub fn map(&self, px: RGB8) -> RGB8 {
        match self {
            Palette::Fixed(colors) => {
                if colors.is_empty() {
                    return px;
                }
                colors[nearest(colors, px)]
            },
            Palette::Rgb565 => RGB8 {
                r: quantize_channel(px.r, 5),
                g: quantize_channel(px.g, 6),
                b: quantize_channel(px.b, 5),
            },
            Palette::Rgb332 => RGB8 {
                r: quantize_channel(px.r, 3),
                g: quantize_channel(px.g, 3),
                b: quantize_channel(px.b, 2),
            },
        }
    }
}

/// Index of the entry minimizing squared distance to `px`.
///
/// Iterates in table order and keeps the first minimal index, so equidistant
/// entries resolve deterministically to the earlier one.
#[must_use]
pub fn nearest(colors: &[RGB8], px: RGB8) -> usize {
    let mut best = 0;
    let mut best_d = i32::MAX;
    for (i, &p) in colors.iter().enumerate() {
        let dr = i32::from(px.r) - i32::from(p.r);
        let dg = i32::from(px.g) - i32::from(p.g);
        let db = i32::from(px.b) - i32::from(p.b);
        let d = dr * dr + dg * dg + db * db;
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Quantize one channel to `bits` bits, then re-expand to the full 0..255 range.
#[inline]
pub(crate) fn quantize_channel(v: u8, bits: u32) -> u8 {
    let max = ((1u32 << bits) - 1) as f32;
    let q = (f32::from(v) / 255. * max).round();
    (q * 255. / max).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_prefers_earlier_index_on_ties() {
        let colors = [c(0x000000), c(0x000002), c(0x000002)];
        // (0,0,1) is equidistant from entries 0 and 1; entry 2 duplicates 1
        assert_eq!(nearest(&colors, RGB8 { r: 0, g: 0, b: 1 }), 0);
        assert_eq!(nearest(&colors, RGB8 { r: 0, g: 0, b: 2 }), 1);
    }

    #[test]
    fn rgb565_reduction() {
        let p = Palette::Rgb565;
        assert_eq!(p.map(c(0xFFFFFF)), c(0xFFFFFF));
        assert_eq!(p.map(c(0x000000)), c(0x000000));
        // 128 -> level 16/31 -> 132 (5 bits), level 32/63 -> 130 (6 bits)
        assert_eq!(p.map(RGB8 { r: 128, g: 128, b: 128 }), RGB8 { r: 132, g: 130, b: 132 });
    }

    #[test]
    fn rgb332_reduction() {
        let p = Palette::Rgb332;
        assert_eq!(p.map(c(0xFFFFFF)), c(0xFFFFFF));
        // 200 -> level 5/7 -> 182 (3 bits), level 2/3 -> 170 (2 bits)
        assert_eq!(p.map(RGB8 { r: 200, g: 200, b: 200 }), RGB8 { r: 182, g: 182, b: 170 });
    }

    #[test]
    fn named_lookup() {
        assert_eq!(Palette::named("pico8").unwrap().colors().unwrap().len(), 16);
        assert_eq!(Palette::named("funky").unwrap().colors().unwrap().len(), 4);
        assert_eq!(Palette::named("rgb565"), Some(Palette::Rgb565));
        assert!(Palette::named("nope").is_none());
    }
}
