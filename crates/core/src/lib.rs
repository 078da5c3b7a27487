//! dviread - DVI interpretation with TeX font resource resolution.
//!
//! The interpreter ([`dvi`]) reads a DVI stream through the big-endian
//! [`reader`] and emits page events. Fonts named by the stream are located
//! with the kpathsea-style [`search`] resolver and described by [`font`]
//! map files and TFM metrics.

pub mod api;
pub mod dvi;
pub mod error;
pub mod font;
pub mod reader;
pub mod search;

pub use api::high_level;
pub use dvi::{DviDocument, Event, Interpreter, PageState};
pub use error::{DviError, Result};
pub use reader::ByteStream;
