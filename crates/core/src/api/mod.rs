//! High-level API for interpreting DVI files.
//!
//! # Example
//!
//! ```ignore
//! use dviread_core::api::interpret_file;
//! use dviread_core::font::NoMetrics;
//!
//! let doc = interpret_file("paper.dvi", &NoMetrics)?;
//! println!("{} pages", doc.page_count());
//! ```

pub mod high_level;

pub use high_level::{
    interpret, interpret_file, interpret_many, interpret_page_at, interpret_partial, map_file,
    page_index,
};
