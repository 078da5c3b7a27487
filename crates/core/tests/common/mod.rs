//! Byte builders for synthetic DVI and TFM inputs.

#![allow(dead_code)]

pub const NUM: u32 = 25_400_000;
pub const DEN: u32 = 473_628_672;
pub const MAG: u32 = 1000;
pub const TEN_PT: i32 = 655_360;

/// Builds a DVI stream opcode by opcode, tracking what the postamble needs.
#[derive(Debug, Clone)]
pub struct DviBuilder {
    buf: Vec<u8>,
    font_defs: Vec<Vec<u8>>,
    last_bop: i32,
    pages: u16,
    depth: u16,
    max_depth: u16,
}

impl DviBuilder {
    pub fn new() -> Self {
        Self::with_id(2)
    }

    pub fn with_id(id: u8) -> Self {
        let mut buf = vec![247, id];
        buf.extend_from_slice(&NUM.to_be_bytes());
        buf.extend_from_slice(&DEN.to_be_bytes());
        buf.extend_from_slice(&MAG.to_be_bytes());
        let comment = b" test output";
        buf.push(comment.len() as u8);
        buf.extend_from_slice(comment);
        Self {
            buf,
            font_defs: Vec::new(),
            last_bop: -1,
            pages: 0,
            depth: 0,
            max_depth: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn op(mut self, b: u8) -> Self {
        self.buf.push(b);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// `fnt_def1` for a font at `scale` with a 10pt design size.
    pub fn font_def(self, id: u8, name: &str, scale: i32) -> Self {
        self.font_def_sized(1, u32::from(id), name, scale)
    }

    /// `fnt_def<k>`, with the font id written in `k` bytes.
    pub fn font_def_sized(mut self, k: u8, id: u32, name: &str, scale: i32) -> Self {
        assert!((1..=4).contains(&k));
        let mut def = vec![242 + k];
        def.extend_from_slice(&id.to_be_bytes()[4 - usize::from(k)..]);
        def.extend_from_slice(&0u32.to_be_bytes());
        def.extend_from_slice(&scale.to_be_bytes());
        def.extend_from_slice(&TEN_PT.to_be_bytes());
        def.push(0);
        def.push(name.len() as u8);
        def.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(&def);
        self.font_defs.push(def);
        self
    }

    pub fn bop(mut self) -> Self {
        let offset = self.buf.len() as i32;
        self.pages += 1;
        self.buf.push(139);
        self.buf.extend_from_slice(&i32::from(self.pages).to_be_bytes());
        for _ in 1..10 {
            self.buf.extend_from_slice(&0i32.to_be_bytes());
        }
        self.buf.extend_from_slice(&self.last_bop.to_be_bytes());
        self.last_bop = offset;
        self
    }

    pub fn eop(self) -> Self {
        self.op(140)
    }

    pub fn set_char(self, c: u8) -> Self {
        assert!(c < 128);
        self.op(c)
    }

    pub fn put1(self, c: u8) -> Self {
        self.op(133).op(c)
    }

    pub fn fnt_num(self, n: u8) -> Self {
        assert!(n < 64);
        self.op(171 + n)
    }

    pub fn push(mut self) -> Self {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.op(141)
    }

    pub fn pop(mut self) -> Self {
        self.depth = self.depth.saturating_sub(1);
        self.op(142)
    }

    pub fn right4(self, v: i32) -> Self {
        self.op(146).i32(v)
    }

    pub fn down4(self, v: i32) -> Self {
        self.op(160).i32(v)
    }

    pub fn set_rule(self, height: i32, width: i32) -> Self {
        self.op(132).i32(height).i32(width)
    }

    pub fn put_rule(self, height: i32, width: i32) -> Self {
        self.op(137).i32(height).i32(width)
    }

    pub fn special(mut self, payload: &[u8]) -> Self {
        self.buf.push(239);
        self.buf.push(payload.len() as u8);
        self.buf.extend_from_slice(payload);
        self
    }

    /// Stream without a postamble.
    pub fn body(self) -> Vec<u8> {
        self.buf
    }

    /// Postamble, font definitions, `post_post` and padding.
    pub fn finish(self) -> Vec<u8> {
        let id = self.buf[1];
        self.finish_with_id(id)
    }

    pub fn finish_with_id(mut self, id: u8) -> Vec<u8> {
        let post = self.buf.len() as i32;
        self.buf.push(248);
        self.buf.extend_from_slice(&self.last_bop.to_be_bytes());
        self.buf.extend_from_slice(&NUM.to_be_bytes());
        self.buf.extend_from_slice(&DEN.to_be_bytes());
        self.buf.extend_from_slice(&MAG.to_be_bytes());
        self.buf.extend_from_slice(&(TEN_PT * 60).to_be_bytes());
        self.buf.extend_from_slice(&(TEN_PT * 40).to_be_bytes());
        self.buf.extend_from_slice(&self.max_depth.to_be_bytes());
        self.buf.extend_from_slice(&self.pages.to_be_bytes());
        for def in &self.font_defs {
            self.buf.extend_from_slice(def);
        }
        self.buf.push(249);
        self.buf.extend_from_slice(&post.to_be_bytes());
        self.buf.push(id);
        self.buf.extend_from_slice(&[223; 4]);
        while self.buf.len() % 4 != 0 {
            self.buf.push(223);
        }
        self.buf
    }
}

impl Default for DviBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A minimal TFM file. `widths` pairs a character code with its width as a
/// fix_word; heights and depths are zero.
pub fn tfm_bytes(checksum: u32, design_size: i32, widths: &[(u8, i32)]) -> Vec<u8> {
    let bc = widths.iter().map(|w| w.0).min().unwrap_or(1);
    let ec = widths.iter().map(|w| w.0).max().unwrap_or(0);
    let nchars = (usize::from(ec) + 1).saturating_sub(usize::from(bc));
    let lh = 2usize;
    let nw = widths.len() + 1;
    let (nh, nd) = (1usize, 1usize);
    let lf = 6 + lh + nchars + nw + nh + nd;

    let mut out = Vec::with_capacity(lf * 4);
    for v in [lf, lh, usize::from(bc), usize::from(ec), nw, nh, nd, 0, 0, 0, 0, 0] {
        out.extend_from_slice(&(v as u16).to_be_bytes());
    }
    out.extend_from_slice(&checksum.to_be_bytes());
    out.extend_from_slice(&design_size.to_be_bytes());
    for code in 0..nchars {
        let code = bc as usize + code;
        let index = widths
            .iter()
            .position(|w| usize::from(w.0) == code)
            .map_or(0, |i| i + 1);
        out.extend_from_slice(&[index as u8, 0, 0, 0]);
    }
    out.extend_from_slice(&0i32.to_be_bytes());
    for (_, w) in widths {
        out.extend_from_slice(&w.to_be_bytes());
    }
    out.extend_from_slice(&0i32.to_be_bytes());
    out.extend_from_slice(&0i32.to_be_bytes());
    out
}
