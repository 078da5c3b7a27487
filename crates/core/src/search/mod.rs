//! Search-path resolution for font resources.
//!
//! This module contains:
//! - `format`: resource format classes and their filename conventions
//! - `config`: the immutable search configuration
//! - `backend`: directory and filename-database backends
//! - `resolver`: the layered, caching resolver

pub mod backend;
pub mod config;
pub mod format;
pub mod resolver;

pub use backend::{DirectorySearch, FilenameDatabase, SearchBackend};
pub use config::{SearchConfig, SearchDir};
pub use format::FormatClass;
pub use resolver::Resolver;
