//! Reading a DVI file from the end.
//!
//! The trailer (`post` ... `post_post` id padding) can be found without
//! scanning the pages, and each `bop` points at the previous one. Together
//! they give the offset of every page for random access.

use super::interpreter::{read_font_def, read_postamble};
use super::opcode::{BOP, Opcode, PADDING, POST, POST_POST};
use super::state::{FontDefinition, Postamble};
use crate::error::{DviError, Result};
use crate::reader::ByteStream;

/// Bytes from a `bop` opcode to its back-pointer: the opcode and ten counts.
const BOP_BACK_POINTER: usize = 1 + 10 * 4;

/// Postamble and the font definitions that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    /// `post_pointer` and `id` are always filled in
    pub postamble: Postamble,
    pub fonts: Vec<FontDefinition>,
    /// Offset of the `post_post` opcode
    pub post_post_offset: usize,
    /// Number of 223 bytes after the id byte
    pub padding: usize,
}

impl Trailer {
    pub fn id(&self) -> u8 {
        self.postamble.id.unwrap_or_default()
    }
}

/// Find and parse the trailer. Moves the cursor.
pub fn locate(s: &mut ByteStream) -> Result<Trailer> {
    let len = s.len();
    let mut end = len;
    while end > 0 && s.byte_at(end - 1) == Some(PADDING) {
        end -= 1;
    }
    let padding = len - end;
    if padding < 4 {
        tracing::warn!(padding, "fewer than four padding bytes after post_post");
    }
    // post_post q[4] id[1]
    if end < 6 {
        return Err(DviError::TruncatedStream {
            offset: 0,
            wanted: 6,
            remaining: end,
            opcode: None,
        });
    }
    let post_post_offset = end - 6;
    let opcode = s.byte_at(post_post_offset).unwrap_or_default();
    if opcode != POST_POST {
        return Err(DviError::MalformedHeader {
            offset: post_post_offset,
            opcode,
        });
    }

    s.seek(post_post_offset + 1)?;
    let pointer = s.read_i32()?;
    let id = s.read_u8()?;
    let post_offset = usize::try_from(pointer)
        .ok()
        .filter(|&p| p < post_post_offset)
        .ok_or(DviError::MalformedHeader {
            offset: post_post_offset,
            opcode: POST_POST,
        })?;

    s.seek(post_offset)?;
    let opcode = s.read_u8()?;
    if opcode != POST {
        return Err(DviError::MalformedHeader {
            offset: post_offset,
            opcode,
        });
    }
    let mut postamble = read_postamble(s, post_offset).map_err(|err| err.with_opcode(POST))?;
    postamble.post_pointer = Some(pointer);
    postamble.id = Some(id);

    let mut fonts = Vec::new();
    loop {
        let offset = s.position();
        let byte = s.read_u8()?;
        match Opcode::from_byte(byte) {
            Opcode::FontDef(k) => {
                fonts.push(read_font_def(s, k, offset).map_err(|err| err.with_opcode(byte))?)
            }
            Opcode::Nop => {}
            Opcode::PostPostamble => break,
            _ => return Err(DviError::UnexpectedOpcode { offset, opcode: byte }),
        }
    }

    tracing::debug!(
        post = post_offset,
        pages = postamble.total_pages,
        fonts = fonts.len(),
        "located dvi trailer"
    );
    Ok(Trailer {
        postamble,
        fonts,
        post_post_offset,
        padding,
    })
}

/// Offsets of every page's `bop`, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIndex {
    offsets: Vec<usize>,
    trailer: Trailer,
}

impl PageIndex {
    /// Locate the trailer and walk the `bop` back-pointer chain. Moves the
    /// cursor.
    pub fn build(s: &mut ByteStream) -> Result<Self> {
        let trailer = locate(s)?;
        let mut offsets = Vec::with_capacity(usize::from(trailer.postamble.total_pages));

        let mut pointer = trailer.postamble.last_page;
        let mut limit = trailer.postamble.offset;
        while pointer >= 0 {
            let offset = pointer as usize;
            let opcode = s.byte_at(offset).unwrap_or_default();
            if offset >= limit || opcode != BOP {
                return Err(DviError::UnexpectedOpcode { offset, opcode });
            }
            offsets.push(offset);
            s.seek(offset + BOP_BACK_POINTER)?;
            pointer = s.read_i32()?;
            limit = offset;
        }
        offsets.reverse();

        if offsets.len() != usize::from(trailer.postamble.total_pages) {
            tracing::warn!(
                declared = trailer.postamble.total_pages,
                found = offsets.len(),
                "page chain length differs from postamble"
            );
        }
        Ok(Self { offsets, trailer })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offset of page `n` (0-based).
    pub fn offset(&self, n: usize) -> Option<usize> {
        self.offsets.get(n).copied()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }
}
