//! The DVI state machine.
//!
//! [`Interpreter`] reads one opcode at a time from the front of the stream and
//! feeds page boundaries and events to a [`DviDevice`]. Fonts are resolved
//! through a [`MetricsProvider`] when their `fnt_def` is read.
//!
//! The interpreter never recovers: the first structural error ends the pass.
//! Whatever was read before the failure stays available through
//! [`Interpreter::into_document`].

use super::device::{DviDevice, PageCollector};
use super::opcode::{DVI_ID, DVIV_ID, Opcode, PADDING, Register};
use super::state::{
    DviDocument, Event, FontDefinition, GraphicsState, PageState, Placement, Postamble, Preamble,
};
use crate::error::{DviError, Result};
use crate::font::{MetricsProvider, NoMetrics, TfmMetrics};
use crate::reader::ByteStream;
use bytes::Bytes;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Where the interpreter is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpState {
    AwaitPreamble,
    BetweenPages,
    InPage,
    /// After `post`, reading font definitions until `post_post`
    InPostamble,
    AfterPostamble,
    Failed,
}

static NO_METRICS: NoMetrics = NoMetrics;

pub struct Interpreter<'m, D: DviDevice = PageCollector> {
    stream: ByteStream,
    provider: &'m dyn MetricsProvider,
    device: D,
    state: InterpState,
    gs: GraphicsState,
    preamble: Option<Preamble>,
    postamble: Option<Postamble>,
    fonts: IndexMap<u32, FontDefinition>,
    metrics: FxHashMap<u32, Arc<TfmMetrics>>,
    font_map: IndexMap<String, crate::font::FontMapRecord>,
    last_opcode: Option<(usize, u8)>,
    /// Offset of the most recent `bop`, -1 before the first page
    last_bop: i32,
    page_count: usize,
    max_depth: usize,
    /// Set once a page was read out of order; disables trailer cross-checks
    random_access: bool,
}

impl Interpreter<'static, PageCollector> {
    /// Interpreter without font metrics. Every character gets an unknown
    /// width.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Interpreter::with_device(data, &NO_METRICS, PageCollector::new())
    }
}

impl<'m> Interpreter<'m, PageCollector> {
    pub fn with_provider(data: impl Into<Bytes>, provider: &'m dyn MetricsProvider) -> Self {
        Interpreter::with_device(data, provider, PageCollector::new())
    }
}

impl<'m, D: DviDevice> Interpreter<'m, D> {
    pub fn with_device(data: impl Into<Bytes>, provider: &'m dyn MetricsProvider, device: D) -> Self {
        Self {
            stream: ByteStream::new(data),
            provider,
            device,
            state: InterpState::AwaitPreamble,
            gs: GraphicsState::new(),
            preamble: None,
            postamble: None,
            fonts: IndexMap::new(),
            metrics: FxHashMap::default(),
            font_map: IndexMap::new(),
            last_opcode: None,
            last_bop: -1,
            page_count: 0,
            max_depth: 0,
            random_access: false,
        }
    }

    pub fn state(&self) -> InterpState {
        self.state
    }

    /// Offset and value of the last opcode read.
    pub fn last_opcode(&self) -> Option<(usize, u8)> {
        self.last_opcode
    }

    pub fn position(&self) -> usize {
        self.stream.position()
    }

    pub fn preamble(&self) -> Option<&Preamble> {
        self.preamble.as_ref()
    }

    pub fn fonts(&self) -> &IndexMap<u32, FontDefinition> {
        &self.fonts
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Interpret the whole stream, from the preamble to `post_post`.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    /// Read and execute one opcode. Returns `false` once the interpreter has
    /// reached a terminal state.
    pub fn step(&mut self) -> Result<bool> {
        if matches!(self.state, InterpState::AfterPostamble | InterpState::Failed) {
            return Ok(false);
        }
        match self.step_inner() {
            Ok(()) => Ok(self.state != InterpState::AfterPostamble),
            Err(err) => {
                tracing::debug!(
                    state = ?self.state,
                    position = self.stream.position(),
                    %err,
                    "dvi interpretation failed"
                );
                self.state = InterpState::Failed;
                Err(err)
            }
        }
    }

    fn step_inner(&mut self) -> Result<()> {
        let offset = self.stream.position();
        let byte = self.stream.read_u8()?;
        self.last_opcode = Some((offset, byte));
        let op = Opcode::from_byte(byte);
        tracing::trace!(offset, opcode = byte, op = %op.mnemonic(), "dvi op");
        self.dispatch(op, offset, byte).map_err(|err| err.with_opcode(byte))
    }

    fn dispatch(&mut self, op: Opcode, offset: usize, byte: u8) -> Result<()> {
        match self.state {
            InterpState::AwaitPreamble => {
                if op != Opcode::Preamble {
                    return Err(DviError::MalformedHeader { offset, opcode: byte });
                }
                self.read_preamble()?;
                self.state = InterpState::BetweenPages;
            }
            InterpState::BetweenPages => match op {
                Opcode::FontDef(k) => self.define_font(k, offset)?,
                Opcode::Nop => {}
                Opcode::BeginPage => self.begin_page(offset)?,
                Opcode::Postamble => {
                    self.postamble = Some(read_postamble(&mut self.stream, offset)?);
                    self.check_postamble();
                    self.state = InterpState::InPostamble;
                }
                _ => return Err(DviError::UnexpectedOpcode { offset, opcode: byte }),
            },
            InterpState::InPage => self.page_op(op, offset, byte)?,
            InterpState::InPostamble => match op {
                Opcode::FontDef(k) => self.define_font(k, offset)?,
                Opcode::Nop => {}
                Opcode::PostPostamble => {
                    self.read_post_postamble(offset, byte)?;
                    self.state = InterpState::AfterPostamble;
                }
                _ => return Err(DviError::UnexpectedOpcode { offset, opcode: byte }),
            },
            InterpState::AfterPostamble | InterpState::Failed => {}
        }
        Ok(())
    }

    fn page_op(&mut self, op: Opcode, offset: usize, byte: u8) -> Result<()> {
        match op {
            Opcode::SetChar(c) => self.typeset_char(u32::from(c), Placement::Set, offset, byte)?,
            Opcode::Set(n) => {
                let code = self.stream.read_unsigned(n)?;
                self.typeset_char(code, Placement::Set, offset, byte)?;
            }
            Opcode::Put(n) => {
                let code = self.stream.read_unsigned(n)?;
                self.typeset_char(code, Placement::Put, offset, byte)?;
            }
            Opcode::SetRule => self.rule(Placement::Set)?,
            Opcode::PutRule => self.rule(Placement::Put)?,
            Opcode::Nop => {}
            Opcode::EndPage => {
                let depth = self.gs.depth();
                if depth != 0 {
                    return Err(DviError::UnbalancedStack {
                        offset,
                        opcode: byte,
                        depth,
                    });
                }
                self.device.end_page();
                self.state = InterpState::BetweenPages;
            }
            Opcode::Push => {
                self.gs.push();
                self.max_depth = self.max_depth.max(self.gs.depth());
            }
            Opcode::Pop => {
                if !self.gs.pop() {
                    return Err(DviError::StackUnderflow { offset, opcode: byte });
                }
            }
            Opcode::Right(n) => {
                let delta = self.stream.read_signed(n)?;
                self.gs.regs.move_right(delta);
            }
            Opcode::Down(n) => {
                let delta = self.stream.read_signed(n)?;
                self.gs.regs.move_down(delta);
            }
            Opcode::Move(reg, n) => self.move_register(reg, n)?,
            Opcode::FontNum(f) => self.select_font(u32::from(f), offset, byte)?,
            Opcode::Font(n) => {
                let font = self.stream.read_unsigned(n)?;
                self.select_font(font, offset, byte)?;
            }
            Opcode::Special(n) => {
                let len = self.stream.read_unsigned(n)? as usize;
                let payload = self.stream.read_bytes(len)?;
                let regs = self.gs.regs;
                self.device.event(Event::Special {
                    h: regs.h,
                    v: regs.v,
                    payload,
                });
            }
            Opcode::FontDef(k) => self.define_font(k, offset)?,
            Opcode::BeginPage
            | Opcode::Preamble
            | Opcode::Postamble
            | Opcode::PostPostamble
            | Opcode::Undefined(_) => {
                return Err(DviError::MalformedOpcode { offset, opcode: byte });
            }
        }
        Ok(())
    }

    fn read_preamble(&mut self) -> Result<()> {
        let s = &mut self.stream;
        let id = s.read_u8()?;
        let numerator = s.read_u32()?;
        let denominator = s.read_u32()?;
        let magnification = s.read_u32()?;
        let len = usize::from(s.read_u8()?);
        let comment = s.read_bytes(len)?;
        if id != DVI_ID {
            tracing::debug!(id, "non-standard dvi format id");
        }
        self.preamble = Some(Preamble {
            id,
            numerator,
            denominator,
            magnification,
            comment,
        });
        Ok(())
    }

    fn begin_page(&mut self, offset: usize) -> Result<()> {
        let mut counts = [0i32; 10];
        for c in &mut counts {
            *c = self.stream.read_i32()?;
        }
        let back_pointer = self.stream.read_i32()?;
        if !self.random_access && back_pointer != self.last_bop {
            tracing::warn!(
                page = self.page_count + 1,
                expected = self.last_bop,
                found = back_pointer,
                "bop back-pointer mismatch"
            );
        }
        self.last_bop = offset as i32;
        self.page_count += 1;
        self.gs.reset();

        let page = PageState::new(offset, counts, back_pointer);
        self.device.begin_page(&page);
        self.state = InterpState::InPage;
        Ok(())
    }

    fn typeset_char(&mut self, code: u32, placement: Placement, offset: usize, byte: u8) -> Result<()> {
        let font = self
            .gs
            .current_font
            .ok_or(DviError::NoFontSelected { offset, opcode: byte })?;
        let width = self.char_width(font, code);
        let regs = self.gs.regs;
        self.device.event(Event::Char {
            h: regs.h,
            v: regs.v,
            font,
            code,
            width,
            placement,
        });
        if placement == Placement::Set
            && let Some(w) = width
        {
            self.gs.regs.move_right(w);
        }
        Ok(())
    }

    fn char_width(&self, font: u32, code: u32) -> Option<i32> {
        let scale = self.fonts.get(&font)?.scale;
        self.metrics.get(&font)?.scaled_width(code, scale)
    }

    fn rule(&mut self, placement: Placement) -> Result<()> {
        let height = self.stream.read_i32()?;
        let width = self.stream.read_i32()?;
        let regs = self.gs.regs;
        self.device.event(Event::Rule {
            h: regs.h,
            v: regs.v,
            height,
            width,
            visible: height > 0 && width > 0,
            placement,
        });
        if placement == Placement::Set {
            self.gs.regs.move_right(width);
        }
        Ok(())
    }

    fn move_register(&mut self, reg: Register, n: u8) -> Result<()> {
        let regs = &mut self.gs.regs;
        let stored = match reg {
            Register::W => &mut regs.w,
            Register::X => &mut regs.x,
            Register::Y => &mut regs.y,
            Register::Z => &mut regs.z,
        };
        if n > 0 {
            *stored = self.stream.read_signed(n)?;
        }
        let delta = *stored;
        match reg {
            Register::W | Register::X => regs.move_right(delta),
            Register::Y | Register::Z => regs.move_down(delta),
        }
        Ok(())
    }

    fn select_font(&mut self, font: u32, offset: usize, byte: u8) -> Result<()> {
        if !self.fonts.contains_key(&font) {
            return Err(DviError::UndefinedFont {
                offset,
                opcode: byte,
                font,
            });
        }
        self.gs.current_font = Some(font);
        self.device.event(Event::FontSelect { font });
        Ok(())
    }

    fn define_font(&mut self, k: u8, offset: usize) -> Result<()> {
        let def = read_font_def(&mut self.stream, k, offset)?;
        self.register_font(def);
        Ok(())
    }

    /// First definition of an id wins. Later ones are only compared.
    fn register_font(&mut self, def: FontDefinition) {
        if let Some(existing) = self.fonts.get(&def.id) {
            if !existing.same_font(&def) {
                tracing::warn!(
                    font = def.id,
                    first = %existing.name,
                    first_offset = existing.offset,
                    redefined = %def.name,
                    offset = def.offset,
                    "font redefined with different parameters"
                );
            }
            return;
        }

        let resolved = self.provider.resolve(&def);
        tracing::debug!(
            font = def.id,
            name = %def.name,
            scale = def.scale,
            metrics = resolved.metrics.is_some(),
            mapped = resolved.map_record.is_some(),
            "font defined"
        );
        if let Some(metrics) = resolved.metrics {
            self.metrics.insert(def.id, metrics);
        }
        if let Some(record) = resolved.map_record {
            self.font_map.insert(def.name.clone(), record);
        }
        self.fonts.insert(def.id, def);
    }

    fn check_postamble(&self) {
        let Some(post) = &self.postamble else {
            return;
        };
        if self.random_access {
            return;
        }
        if post.last_page != self.last_bop {
            tracing::warn!(
                expected = self.last_bop,
                found = post.last_page,
                "postamble last-page pointer mismatch"
            );
        }
        if usize::from(post.total_pages) != self.page_count {
            tracing::warn!(
                declared = post.total_pages,
                found = self.page_count,
                "postamble page count mismatch"
            );
        }
        if self.max_depth > usize::from(post.max_stack_depth) {
            tracing::warn!(
                declared = post.max_stack_depth,
                found = self.max_depth,
                "stack deeper than postamble declares"
            );
        }
        if let Some(pre) = &self.preamble
            && (pre.numerator, pre.denominator, pre.magnification)
                != (post.numerator, post.denominator, post.magnification)
        {
            tracing::warn!("postamble units differ from preamble");
        }
    }

    fn read_post_postamble(&mut self, offset: usize, opcode: u8) -> Result<()> {
        let pointer = self.stream.read_i32()?;
        let id = self.stream.read_u8()?;

        let expected = self.preamble.as_ref().map_or(DVI_ID, |p| p.id);
        if id != expected && !(expected == DVI_ID && id == DVIV_ID) {
            return Err(DviError::VersionMismatch {
                offset,
                opcode,
                expected,
                found: id,
            });
        }

        if let Some(post) = self.postamble.as_mut() {
            if pointer != post.offset as i32 {
                tracing::warn!(
                    expected = post.offset,
                    found = pointer,
                    "post_post pointer mismatch"
                );
            }
            post.post_pointer = Some(pointer);
            post.id = Some(id);
        }

        let start = self.stream.position();
        let trailing = self.stream.remaining();
        let padding = (start..start + trailing)
            .take_while(|&pos| self.stream.byte_at(pos) == Some(PADDING))
            .count();
        if padding < 4 || padding != trailing {
            tracing::warn!(padding, trailing, "irregular trailer padding");
        }
        Ok(())
    }

    /// Interpret the single page whose `bop` is at `offset`, sending it to
    /// the device.
    ///
    /// Fonts are taken from the postamble on first use, so pages can be read
    /// in any order. The interpreter ends in [`InterpState::BetweenPages`].
    pub fn interpret_page(&mut self, offset: usize) -> Result<()> {
        if self.state == InterpState::AwaitPreamble {
            self.stream.seek(0)?;
            self.step()?;
        }
        if !self.random_access {
            self.random_access = true;
            let trailer = super::trailer::locate(&mut self.stream)?;
            for def in trailer.fonts {
                self.register_font(def);
            }
            if self.postamble.is_none() {
                self.postamble = Some(trailer.postamble);
            }
        }

        self.stream.seek(offset)?;
        let opcode = self.stream.peek_u8().unwrap_or_default();
        if Opcode::from_byte(opcode) != Opcode::BeginPage {
            self.state = InterpState::Failed;
            return Err(DviError::UnexpectedOpcode { offset, opcode });
        }
        self.state = InterpState::BetweenPages;
        while self.step()? {
            if self.state == InterpState::BetweenPages {
                break;
            }
        }
        Ok(())
    }

    /// Everything read so far. After a failed [`run`](Self::run) this is the
    /// partial document, including the unterminated page if one was open.
    pub fn into_document(mut self) -> DviDocument {
        DviDocument {
            preamble: self.preamble,
            postamble: self.postamble,
            pages: self.device.take_pages(),
            fonts: self.fonts,
            font_map: self.font_map,
        }
    }
}

/// Read the operands of `fnt_def<k>`; the opcode at `offset` was consumed.
pub(crate) fn read_font_def(s: &mut ByteStream, k: u8, offset: usize) -> Result<FontDefinition> {
    let id = s.read_unsigned(k)?;
    let checksum = s.read_u32()?;
    let scale = s.read_i32()?;
    let design_size = s.read_i32()?;
    let area_len = usize::from(s.read_u8()?);
    let name_len = usize::from(s.read_u8()?);
    let area = String::from_utf8_lossy(&s.read_bytes(area_len)?).into_owned();
    let name = String::from_utf8_lossy(&s.read_bytes(name_len)?).into_owned();
    Ok(FontDefinition {
        id,
        checksum,
        scale,
        design_size,
        area,
        name,
        offset,
    })
}

/// Read the fixed fields after `post`; the opcode at `offset` was consumed.
pub(crate) fn read_postamble(s: &mut ByteStream, offset: usize) -> Result<Postamble> {
    Ok(Postamble {
        offset,
        last_page: s.read_i32()?,
        numerator: s.read_u32()?,
        denominator: s.read_u32()?,
        magnification: s.read_u32()?,
        max_height: s.read_i32()?,
        max_width: s.read_i32()?,
        max_stack_depth: s.read_u16()?,
        total_pages: s.read_u16()?,
        post_pointer: None,
        id: None,
    })
}

impl<D: DviDevice + std::fmt::Debug> std::fmt::Debug for Interpreter<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state)
            .field("position", &self.stream.position())
            .field("fonts", &self.fonts.len())
            .field("pages", &self.page_count)
            .field("device", &self.device)
            .finish()
    }
}
