//! Interpreter state and the values it produces.
//!
//! Distances are DVI units (scaled points for TeX output); no unit
//! conversion happens here.

use crate::font::FontMapRecord;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;

/// The six DVI position registers.
///
/// Arithmetic wraps, as in 32-bit DVI processors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Registers {
    pub h: i32,
    pub v: i32,
    pub w: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Registers {
    pub fn move_right(&mut self, delta: i32) {
        self.h = self.h.wrapping_add(delta);
    }

    pub fn move_down(&mut self, delta: i32) {
        self.v = self.v.wrapping_add(delta);
    }
}

/// Registers plus the selected font and the push/pop stack.
///
/// The stack holds register sets only; `current_font` survives a `pop`.
#[derive(Debug, Clone, Default)]
pub struct GraphicsState {
    pub regs: Registers,
    pub current_font: Option<u32>,
    stack: Vec<Registers>,
}

impl GraphicsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the state at the start of a page.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.current_font = None;
        self.stack.clear();
    }

    pub fn push(&mut self) {
        self.stack.push(self.regs);
    }

    /// Restore the most recently pushed registers. Returns `false` when the
    /// stack is empty.
    pub fn pop(&mut self) -> bool {
        match self.stack.pop() {
            Some(regs) => {
                self.regs = regs;
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Whether a character or rule advances `h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Set,
    Put,
}

/// One drawing or state event produced inside a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Char {
        h: i32,
        v: i32,
        font: u32,
        code: u32,
        /// Advance in DVI units; `None` when the font has no metrics for `code`
        width: Option<i32>,
        placement: Placement,
    },
    Rule {
        h: i32,
        v: i32,
        height: i32,
        width: i32,
        /// Only rules with positive height and width are drawn
        visible: bool,
        placement: Placement,
    },
    FontSelect {
        font: u32,
    },
    Special {
        h: i32,
        v: i32,
        payload: Bytes,
    },
}

/// A page between `bop` and `eop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageState {
    /// Byte offset of the page's `bop`
    pub offset: usize,
    pub counts: [i32; 10],
    /// Offset of the previous `bop`, or -1 for the first page
    pub back_pointer: i32,
    pub events: Vec<Event>,
}

impl PageState {
    pub fn new(offset: usize, counts: [i32; 10], back_pointer: i32) -> Self {
        Self {
            offset,
            counts,
            back_pointer,
            events: Vec::new(),
        }
    }

    /// `\count0`, the page number TeX prints.
    pub fn number(&self) -> i32 {
        self.counts[0]
    }

    /// Concatenated text of the page, one char per code point.
    ///
    /// Codes that are not valid scalar values are skipped. Useful for quick
    /// inspection only; real glyph mapping depends on the font encoding.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Char { code, .. } => char::from_u32(*code),
                _ => None,
            })
            .collect()
    }
}

/// A `fnt_def` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontDefinition {
    pub id: u32,
    pub checksum: u32,
    /// Size at which the font is used, in DVI units
    pub scale: i32,
    pub design_size: i32,
    pub area: String,
    pub name: String,
    /// Byte offset of the defining opcode
    pub offset: usize,
}

impl FontDefinition {
    /// Same font parameters, ignoring where the definition appeared.
    pub fn same_font(&self, other: &Self) -> bool {
        self.checksum == other.checksum
            && self.scale == other.scale
            && self.design_size == other.design_size
            && self.area == other.area
            && self.name == other.name
    }

    /// `scale / design_size`, the magnification of this use of the font.
    pub fn size_ratio(&self) -> f64 {
        if self.design_size == 0 {
            return 1.0;
        }
        f64::from(self.scale) / f64::from(self.design_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preamble {
    pub id: u8,
    pub numerator: u32,
    pub denominator: u32,
    pub magnification: u32,
    pub comment: Bytes,
}

impl Preamble {
    pub fn comment_text(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Postamble {
    /// Byte offset of the `post` opcode
    pub offset: usize,
    /// Offset of the last page's `bop`
    pub last_page: i32,
    pub numerator: u32,
    pub denominator: u32,
    pub magnification: u32,
    pub max_height: i32,
    pub max_width: i32,
    pub max_stack_depth: u16,
    pub total_pages: u16,
    /// Pointer stored after `post_post`, once read
    pub post_pointer: Option<i32>,
    /// Id byte after `post_post`, once read
    pub id: Option<u8>,
}

/// Everything read from one DVI stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DviDocument {
    pub preamble: Option<Preamble>,
    pub postamble: Option<Postamble>,
    pub pages: Vec<PageState>,
    /// Fonts in the order they were first defined
    pub fonts: IndexMap<u32, FontDefinition>,
    /// Font map entries found for the defined fonts, keyed by TeX name
    pub font_map: IndexMap<String, FontMapRecord>,
}

impl DviDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn font(&self, id: u32) -> Option<&FontDefinition> {
        self.fonts.get(&id)
    }

    /// Postamble and `post_post` were both read.
    pub fn is_complete(&self) -> bool {
        self.postamble.as_ref().is_some_and(|p| p.id.is_some())
    }
}
