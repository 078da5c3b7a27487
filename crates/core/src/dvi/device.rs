//! Output interface of the interpreter.
//!
//! A device receives page boundaries and the events inside each page. Every
//! method has a no-op default, so a device only implements what it uses.

use super::state::{Event, PageState};

pub trait DviDevice {
    /// A `bop` was read. `page` carries its offset, counts and back-pointer
    /// and has no events yet.
    fn begin_page(&mut self, _page: &PageState) {}

    /// The matching `eop` was read.
    fn end_page(&mut self) {}

    /// An event inside the current page.
    fn event(&mut self, _event: Event) {}

    /// Pages completed so far, for devices that keep them.
    fn take_pages(&mut self) -> Vec<PageState> {
        Vec::new()
    }
}

/// Device that keeps every page with its events.
#[derive(Debug, Clone, Default)]
pub struct PageCollector {
    pages: Vec<PageState>,
    current: Option<PageState>,
}

impl PageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[PageState] {
        &self.pages
    }

    /// The page being filled, if a `bop` has not been closed yet.
    pub fn current(&self) -> Option<&PageState> {
        self.current.as_ref()
    }
}

impl DviDevice for PageCollector {
    fn begin_page(&mut self, page: &PageState) {
        self.current = Some(page.clone());
    }

    fn end_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }

    fn event(&mut self, event: Event) {
        if let Some(page) = self.current.as_mut() {
            page.events.push(event);
        }
    }

    /// Includes an unterminated trailing page.
    fn take_pages(&mut self) -> Vec<PageState> {
        let mut pages = std::mem::take(&mut self.pages);
        pages.extend(self.current.take());
        pages
    }
}

/// Device that only counts what it sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounter {
    pub pages: usize,
    pub chars: usize,
    pub rules: usize,
    pub specials: usize,
}

impl DviDevice for EventCounter {
    fn begin_page(&mut self, _page: &PageState) {
        self.pages += 1;
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Char { .. } => self.chars += 1,
            Event::Rule { .. } => self.rules += 1,
            Event::Special { .. } => self.specials += 1,
            Event::FontSelect { .. } => {}
        }
    }
}
