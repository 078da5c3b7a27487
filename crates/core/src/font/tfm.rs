//! TeX font metric (TFM) files.
//!
//! Only the parts a DVI consumer needs are decoded: the checksum, the design
//! size and per-character width, height and depth. Ligature/kern programs,
//! extensible recipes and font parameters are skipped.

use crate::error::{DviError, Result};
use crate::reader::ByteStream;
use serde::Serialize;
use std::path::Path;

/// 12.20 signed fixed-point number used throughout TFM files.
pub type FixWord = i32;

/// `1.0` as a [`FixWord`].
pub const FIX_UNITY: FixWord = 1 << 20;

/// Multiply a scaled-point size by a fix_word the way TeX's `store_scaled`
/// does: the exact product is floored, so negative values round down.
///
/// This is how a character width in design-size units becomes a DVI
/// distance at a font's use-site scale, matching what TeX wrote into the
/// DVI file.
pub fn scale_fix_word(scale: i32, fw: FixWord) -> i32 {
    let product = (i64::from(scale) * i64::from(fw)) >> 20;
    product.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Dimensions of one character, as fix_words relative to the design size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharMetrics {
    pub width: FixWord,
    pub height: FixWord,
    pub depth: FixWord,
}

/// Decoded metrics of one TFM file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TfmMetrics {
    pub name: String,
    pub checksum: u32,
    /// Design size in points, as a fix_word
    pub design_size: FixWord,
    first_char: u32,
    chars: Vec<Option<CharMetrics>>,
}

struct Sizes {
    lf: usize,
    lh: usize,
    bc: usize,
    ec: usize,
    nw: usize,
    nh: usize,
    nd: usize,
    rest: usize,
}

impl TfmMetrics {
    /// Read and decode a TFM file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name, data)
    }

    /// Decode TFM bytes.
    pub fn parse(name: &str, data: impl Into<bytes::Bytes>) -> Result<Self> {
        let malformed = |msg: String| DviError::MalformedMetrics {
            name: name.to_string(),
            msg,
        };
        let mut s = ByteStream::new(data);
        if s.len() < 24 {
            return Err(malformed(format!("file too short ({} bytes)", s.len())));
        }

        let mut words = [0usize; 12];
        for w in &mut words {
            *w = usize::from(s.read_u16()?);
        }
        let [lf, lh, bc, ec, nw, nh, nd, ni, nl, nk, ne, np] = words;
        let sizes = Sizes {
            lf,
            lh,
            bc,
            ec,
            nw,
            nh,
            nd,
            rest: ni + nl + nk + ne + np,
        };
        Self::check_sizes(&sizes, s.len()).map_err(malformed)?;

        let checksum = s.read_u32()?;
        let design_size = s.read_i32()?;
        s.skip((sizes.lh - 2) * 4)?;

        let nchars = (sizes.ec + 1).saturating_sub(sizes.bc);
        let mut char_info = Vec::with_capacity(nchars);
        for _ in 0..nchars {
            let info = s.read_bytes(4)?;
            char_info.push([info[0], info[1], info[2], info[3]]);
        }
        let widths = read_fix_words(&mut s, sizes.nw)?;
        let heights = read_fix_words(&mut s, sizes.nh)?;
        let depths = read_fix_words(&mut s, sizes.nd)?;

        let mut chars = Vec::with_capacity(nchars);
        for (offset, info) in char_info.iter().enumerate() {
            let wi = usize::from(info[0]);
            let hi = usize::from(info[1] >> 4);
            let di = usize::from(info[1] & 0x0f);
            if wi == 0 {
                chars.push(None);
                continue;
            }
            if wi >= widths.len() || hi >= heights.len() || di >= depths.len() {
                return Err(malformed(format!(
                    "char_info for code {} indexes past dimension tables",
                    sizes.bc + offset
                )));
            }
            chars.push(Some(CharMetrics {
                width: widths[wi],
                height: heights[hi],
                depth: depths[di],
            }));
        }

        Ok(Self {
            name: name.to_string(),
            checksum,
            design_size,
            first_char: sizes.bc as u32,
            chars,
        })
    }

    fn check_sizes(sizes: &Sizes, file_len: usize) -> std::result::Result<(), String> {
        if sizes.lh < 2 {
            return Err(format!("header length {} too small", sizes.lh));
        }
        if sizes.ec > 255 || sizes.bc > sizes.ec + 1 {
            return Err(format!("bad character range bc={} ec={}", sizes.bc, sizes.ec));
        }
        if sizes.nw == 0 || sizes.nh == 0 || sizes.nd == 0 {
            return Err("empty dimension table".to_string());
        }
        let expected =
            6 + sizes.lh + (sizes.ec + 1 - sizes.bc) + sizes.nw + sizes.nh + sizes.nd + sizes.rest;
        if sizes.lf != expected {
            return Err(format!("length {} words, tables need {}", sizes.lf, expected));
        }
        if sizes.lf * 4 > file_len {
            return Err(format!(
                "declares {} bytes but only {} present",
                sizes.lf * 4,
                file_len
            ));
        }
        Ok(())
    }

    /// Metrics of character `code`, if the font has it.
    pub fn char_metrics(&self, code: u32) -> Option<CharMetrics> {
        let index = code.checked_sub(self.first_char)? as usize;
        self.chars.get(index).copied().flatten()
    }

    /// Width of `code` as a fix_word.
    pub fn width(&self, code: u32) -> Option<FixWord> {
        self.char_metrics(code).map(|m| m.width)
    }

    /// Width of `code` in DVI units for a font used at `scale`.
    pub fn scaled_width(&self, code: u32, scale: i32) -> Option<i32> {
        self.width(code).map(|fw| scale_fix_word(scale, fw))
    }

    /// Design size in points.
    pub fn design_size_pt(&self) -> f64 {
        f64::from(self.design_size) / f64::from(FIX_UNITY)
    }

    /// Number of characters present in the font.
    pub fn char_count(&self) -> usize {
        self.chars.iter().filter(|c| c.is_some()).count()
    }
}

fn read_fix_words(s: &mut ByteStream, n: usize) -> Result<Vec<FixWord>> {
    (0..n).map(|_| s.read_i32()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_fix_word_floors_like_tex() {
        // 10pt font (655360sp) times 0.5
        assert_eq!(scale_fix_word(655_360, FIX_UNITY / 2), 327_680);
        assert_eq!(scale_fix_word(655_360, -FIX_UNITY / 2), -327_680);
        assert_eq!(scale_fix_word(-655_360, -FIX_UNITY / 2), 327_680);
        assert_eq!(scale_fix_word(3, FIX_UNITY / 2), 1);
        assert_eq!(scale_fix_word(3, -FIX_UNITY / 2), -2);
        assert_eq!(scale_fix_word(0, FIX_UNITY), 0);
    }

    #[test]
    fn rejects_short_files() {
        let err = TfmMetrics::parse("tiny", vec![0u8; 10]).unwrap_err();
        assert!(matches!(err, DviError::MalformedMetrics { .. }));
    }
}
