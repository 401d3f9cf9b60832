//! GIF-variant LZW compression of palette-index streams.
//!
//! Codes are written LSB-first. The dictionary is bounded at 4096 codes; when
//! a new entry would exceed that, a CLEAR code resets the dictionary and code
//! width instead of growing further.

use std::collections::HashMap;

const MAX_CODES: u16 = 4096;

struct BitWriter {
    out: Vec<u8>,
    cur: u32,
    filled: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self { out: Vec::new(), cur: 0, filled: 0 }
    }

    fn write(&mut self, code: u16, bits: u32) {
        self.cur |= u32::from(code) << self.filled;
        self.filled += bits;
        while self.filled >= 8 {
            self.out.push(self.cur as u8);
            self.cur >>= 8;
            self.filled -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.out.push(self.cur as u8);
        }
        self.out
    }
}

/// Compress a stream of palette indices with the given minimum code size
/// (2..=8). Emits CLEAR first and END last, per GIF89a.
#[must_use]
pub fn compress(indices: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let end = clear + 1;
    let mut code_size = u32::from(min_code_size) + 1;
    let mut next_code = end + 1;

    let mut bw = BitWriter::new();
    bw.write(clear, code_size);

    let Some((&first, rest)) = indices.split_first() else {
        bw.write(end, code_size);
        return bw.finish();
    };

    // Literal codes 0..CLEAR-1 are implicit; the map only holds extensions.
    let mut dict: HashMap<(u16, u8), u16> = HashMap::new();
    let mut prefix = u16::from(first);

    for &k in rest {
        if let Some(&code) = dict.get(&(prefix, k)) {
            prefix = code;
        } else {
            // The decoder's table runs one entry behind, so a width increase
            // only takes effect for the code after the one that crosses the
            // boundary.
            if u32::from(next_code) > 1 << code_size && code_size < 12 {
                code_size += 1;
            }
            bw.write(prefix, code_size);
            if next_code < MAX_CODES {
                dict.insert((prefix, k), next_code);
                next_code += 1;
            } else {
                // Dictionary full: reset without inserting this entry
                bw.write(clear, code_size);
                dict.clear();
                code_size = u32::from(min_code_size) + 1;
                next_code = end + 1;
            }
            prefix = u16::from(k);
        }
    }

    if u32::from(next_code) > 1 << code_size && code_size < 12 {
        code_size += 1;
    }
    bw.write(prefix, code_size);
    bw.write(end, code_size);
    bw.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_stream() {
        // min code size 2: CLEAR=4 (100), literal 0 (000), END=5 (101),
        // packed LSB-first into 0x44, 0x01 (the classic smallest-GIF bytes)
        assert_eq!(compress(&[0], 2), vec![0x44, 0x01]);
    }

    #[test]
    fn empty_stream_still_frames_clear_and_end() {
        assert_eq!(compress(&[], 2), vec![0x2C]);
    }

    #[test]
    fn code_width_grows_one_code_after_the_boundary() {
        // min code size 2: CLEAR=4, then 0@3, 1@3 insert codes 6 and 7.
        // Code 6 is emitted while next_code is already 8, but the decoder's
        // table still holds only 7 entries at that point, so it must stay at
        // 3 bits; only code 8 goes out at 4 bits.
        // Codes: 4@3, 0@3, 1@3, 6@3, 8@4, 7@4, 5@4, packed LSB-first.
        assert_eq!(compress(&[0, 1, 0, 1, 0, 1, 0, 1, 0], 2), vec![0x44, 0x8C, 0x57]);
    }

    #[test]
    fn long_repetitive_stream_stays_bounded() {
        // Enough input to exercise dictionary growth across width boundaries;
        // decoded correctness is covered by the GIF round-trip tests
        let input: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let out = compress(&input, 8);
        assert!(out.len() < input.len());
    }
}
