//! Animated PNG assembly from standalone per-frame PNG streams.
//!
//! A collaborator encodes each frame to a complete single-image PNG; this
//! module only restructures chunks. Frame 0's IHDR, pre-IDAT chunks (PLTE,
//! tRNS, …), IDAT and IEND are reused verbatim, later frames' IDAT payloads
//! are re-wrapped as fdAT. All frames must share frame 0's geometry, bit
//! depth, color type and palette. The result degrades to a static first
//! frame in decoders that ignore acTL.

use crate::error::{Error, PixResult};
use std::io::Write;

pub(crate) const PNG_SIG: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const DISPOSE_OP_NONE: u8 = 0;
const BLEND_OP_SOURCE: u8 = 0;

/// Reflected-polynomial CRC32 (0xEDB88320), table-driven. The table is a
/// process-wide constant, safe for concurrent reads.
static CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 == 1 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

pub(crate) fn crc32(parts: &[&[u8]]) -> u32 {
    let mut c = 0xFFFF_FFFFu32;
    for part in parts {
        for &b in *part {
            c = CRC_TABLE[usize::from((c ^ u32::from(b)) as u8)] ^ (c >> 8);
        }
    }
    c ^ 0xFFFF_FFFF
}

/// Borrowed views into one source PNG's chunks. Never mutated, only
/// recombined into the output stream.
struct ParsedPng<'a> {
    /// Full IHDR chunk including length/type/crc framing
    ihdr: &'a [u8],
    /// Full chunks between IHDR and the first IDAT (PLTE, tRNS, gAMA, …),
    /// in source order. Carried over for the first frame so indexed-color
    /// sources stay decodable.
    head_chunks: Vec<&'a [u8]>,
    /// PLTE/tRNS payloads, for cross-frame consistency checks
    plte: Option<&'a [u8]>,
    trns: Option<&'a [u8]>,
    /// Full IDAT chunks, in order
    idat_chunks: Vec<&'a [u8]>,
    /// The same IDATs' payloads only
    idat_payloads: Vec<&'a [u8]>,
    iend: &'a [u8],
}

impl ParsedPng<'_> {
    /// IHDR payload (13 bytes, validated by the parser)
    fn ihdr_payload(&self) -> &[u8] {
        &self.ihdr[8..21]
    }

    /// Image dimensions from the IHDR payload.
    fn size(&self) -> (u32, u32) {
        let p = self.ihdr_payload();
        (be32(&p[0..4]), be32(&p[4..8]))
    }
}

fn be32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn parse_png(bytes: &[u8]) -> PixResult<ParsedPng<'_>> {
    if bytes.len() < 8 || bytes[..8] != PNG_SIG {
        return Err(Error::Png("Invalid PNG signature".into()));
    }

    let mut ihdr = None;
    let mut head_chunks = Vec::new();
    let mut plte = None;
    let mut trns = None;
    let mut idat_chunks = Vec::new();
    let mut idat_payloads = Vec::new();
    let mut iend = None;

    let mut off = 8;
    while off + 8 <= bytes.len() {
        let len = be32(&bytes[off..off + 4]) as usize;
        let chunk_end = off + 8 + len + 4;
        if chunk_end > bytes.len() {
            return Err(Error::Png("Corrupt PNG chunk".into()));
        }
        let ty = &bytes[off + 4..off + 8];
        let full = &bytes[off..chunk_end];
        let payload = &bytes[off + 8..off + 8 + len];

        match ty {
            b"IHDR" => {
                if len != 13 {
                    return Err(Error::Png("Corrupt IHDR chunk".into()));
                }
                ihdr = Some(full);
            },
            b"IDAT" => {
                idat_chunks.push(full);
                idat_payloads.push(payload);
            },
            b"IEND" => {
                iend = Some(full);
                break;
            },
            // Input must be a single-image PNG; strip any animation chunks
            b"acTL" | b"fcTL" | b"fdAT" => {},
            _ => {
                if idat_chunks.is_empty() {
                    head_chunks.push(full);
                    match ty {
                        b"PLTE" => plte = Some(payload),
                        b"tRNS" => trns = Some(payload),
                        _ => {},
                    }
                }
            },
        }
        off = chunk_end;
    }

    match (ihdr, iend) {
        (Some(ihdr), Some(iend)) => {
            Ok(ParsedPng { ihdr, head_chunks, plte, trns, idat_chunks, idat_payloads, iend })
        },
        _ => Err(Error::Png("PNG missing IHDR or IEND".into())),
    }
}

/// `length ++ type ++ payload ++ CRC32(type ++ payload)`, payload possibly
/// split across slices (fdAT prepends the sequence number).
fn write_chunk<W: Write>(out: &mut W, ty: &[u8; 4], payload: &[&[u8]]) -> PixResult<()> {
    let len: usize = payload.iter().map(|p| p.len()).sum();
    out.write_all(&(len as u32).to_be_bytes())?;
    out.write_all(ty)?;
    for part in payload {
        out.write_all(part)?;
    }
    let mut crc_parts = vec![ty.as_slice()];
    crc_parts.extend_from_slice(payload);
    out.write_all(&crc32(&crc_parts).to_be_bytes())?;
    Ok(())
}

/// Frame delay numerator over a fixed denominator of 1000.
#[must_use]
pub fn delay_num(fps: f32) -> u16 {
    (1000. / fps.max(1.)).round().max(1.) as u16
}

/// Reassembles per-frame PNG byte streams into one animated PNG.
pub struct ApngEncoder {
    frames: Vec<Vec<u8>>,
    fps: f32,
}

impl ApngEncoder {
    #[must_use]
    pub fn new(fps: f32) -> Self {
        Self { frames: Vec::new(), fps }
    }

    /// Add the next frame as a complete single-image PNG stream.
    pub fn add_frame_png(&mut self, png: Vec<u8>) {
        self.frames.push(png);
    }

    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames.len()
    }

    /// Assemble and write the APNG stream.
    ///
    /// Fails with no output on an empty frame list or a malformed source PNG.
    pub fn write_to<W: Write>(&self, out: &mut W) -> PixResult<()> {
        if self.frames.is_empty() {
            return Err(Error::NoFrames);
        }
        let parsed = self.frames.iter()
            .map(|png| parse_png(png))
            .collect::<PixResult<Vec<_>>>()?;
        let first = &parsed[0];
        let (width, height) = first.size();

        // Every frame must be byte-compatible with frame 0's image setup:
        // fcTL advertises one geometry, and fdAT data is decoded against the
        // first frame's IHDR and palette.
        for (i, frame) in parsed.iter().enumerate().skip(1) {
            if frame.size() != (width, height) {
                let (w, h) = frame.size();
                return Err(Error::WrongSize(format!("Frame {i} has wrong size ({w}×{h}, expected {width}×{height})")));
            }
            if frame.ihdr_payload() != first.ihdr_payload() {
                return Err(Error::Png(format!("Frame {i} has a different bit depth or color type")));
            }
            if frame.plte != first.plte || frame.trns != first.trns {
                return Err(Error::Png(format!("Frame {i} has a different palette")));
            }
        }

        let delay = delay_num(self.fps).to_be_bytes();

        out.write_all(&PNG_SIG)?;
        out.write_all(first.ihdr)?;

        // acTL: frame count, num_plays 0 = infinite
        write_chunk(out, b"acTL", &[
            &(parsed.len() as u32).to_be_bytes(),
            &0u32.to_be_bytes(),
        ])?;

        // Frame 0's PLTE/tRNS and other pre-IDAT chunks, verbatim
        for chunk in &first.head_chunks {
            out.write_all(chunk)?;
        }

        // One monotonically increasing counter shared by all fcTL and fdAT
        let mut seq = 0u32;
        let fctl = |seq: u32| -> [u8; 26] {
            let mut p = [0u8; 26];
            p[0..4].copy_from_slice(&seq.to_be_bytes());
            p[4..8].copy_from_slice(&width.to_be_bytes());
            p[8..12].copy_from_slice(&height.to_be_bytes());
            // x/y offsets stay 0
            p[20..22].copy_from_slice(&delay);
            p[22..24].copy_from_slice(&1000u16.to_be_bytes());
            p[24] = DISPOSE_OP_NONE;
            p[25] = BLEND_OP_SOURCE;
            p
        };

        write_chunk(out, b"fcTL", &[&fctl(seq)])?;
        seq += 1;
        for idat in &first.idat_chunks {
            out.write_all(idat)?;
        }

        for frame in &parsed[1..] {
            write_chunk(out, b"fcTL", &[&fctl(seq)])?;
            seq += 1;
            for &payload in &frame.idat_payloads {
                write_chunk(out, b"fdAT", &[&seq.to_be_bytes(), payload])?;
                seq += 1;
            }
        }

        out.write_all(first.iend)?;
        out.flush()?;
        tracing::debug!(frames = parsed.len(), sequence_numbers = seq, "apng stream complete");
        Ok(())
    }

    pub fn to_vec(&self) -> PixResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_known_vectors() {
        assert_eq!(crc32(&[b"123456789"]), 0xCBF4_3926);
        assert_eq!(crc32(&[b"IEND"]), 0xAE42_6082);
        assert_eq!(crc32(&[]), 0);
        // split input must hash like contiguous input
        assert_eq!(crc32(&[b"1234", b"56789"]), 0xCBF4_3926);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut enc = ApngEncoder::new(10.);
        enc.add_frame_png(vec![0; 64]);
        assert!(matches!(enc.to_vec(), Err(Error::Png(_))));
    }

    #[test]
    fn rejects_truncated_stream() {
        let mut bytes = PNG_SIG.to_vec();
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        let mut enc = ApngEncoder::new(10.);
        enc.add_frame_png(bytes);
        assert!(matches!(enc.to_vec(), Err(Error::Png(_))));
    }

    #[test]
    fn rejects_short_ihdr_without_panicking() {
        // zero-length IHDR followed by a well-formed IEND
        let mut bytes = PNG_SIG.to_vec();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&crc32(&[b"IHDR"]).to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(b"IEND");
        bytes.extend_from_slice(&crc32(&[b"IEND"]).to_be_bytes());

        let mut enc = ApngEncoder::new(10.);
        enc.add_frame_png(bytes);
        assert!(matches!(enc.to_vec(), Err(Error::Png(_))));
    }

    #[test]
    fn rejects_empty_job() {
        assert!(matches!(ApngEncoder::new(10.).to_vec(), Err(Error::NoFrames)));
    }

    #[test]
    fn delay_numerator() {
        assert_eq!(delay_num(10.), 100);
        assert_eq!(delay_num(24.), 42);
        assert_eq!(delay_num(2000.), 1);
        assert_eq!(delay_num(0.5), 1000); // fps floored at 1
    }
}
