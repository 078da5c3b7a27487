//! Entry points for interpreting whole DVI inputs.
//!
//! - `interpret()` / `interpret_file()` - one stream to a [`DviDocument`]
//! - `interpret_partial()` - keep what was read before a failure
//! - `interpret_many()` - independent files in parallel
//! - `page_index()` / `interpret_page_at()` - random access through the trailer

use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use memmap2::Mmap;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::dvi::{DviDocument, Interpreter, PageIndex, PageState};
use crate::error::{DviError, Result};
use crate::font::MetricsProvider;
use crate::reader::ByteStream;

pub(crate) fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Memory-map `path` as shared bytes. The mapping is released when the last
/// clone of the returned [`Bytes`] is dropped.
pub fn map_file(path: impl AsRef<Path>) -> Result<Bytes> {
    let file = File::open(path.as_ref())?;
    // SAFETY: the mapping is read-only and the file is not modified while
    // interpreted; a concurrent writer is outside what DVI readers support.
    let mmap = unsafe { Mmap::map(&file) }?;
    Ok(Bytes::from_owner(mmap))
}

/// Interpret a complete DVI stream.
pub fn interpret(data: impl Into<Bytes>, provider: &dyn MetricsProvider) -> Result<DviDocument> {
    let mut interp = Interpreter::with_provider(data, provider);
    interp.run()?;
    Ok(interp.into_document())
}

/// Interpret as far as possible. The document holds everything read before
/// the error, if there was one.
pub fn interpret_partial(
    data: impl Into<Bytes>,
    provider: &dyn MetricsProvider,
) -> (DviDocument, Option<DviError>) {
    let mut interp = Interpreter::with_provider(data, provider);
    let err = interp.run().err();
    (interp.into_document(), err)
}

/// Memory-map and interpret a DVI file.
pub fn interpret_file(path: impl AsRef<Path>, provider: &dyn MetricsProvider) -> Result<DviDocument> {
    let path = path.as_ref();
    let data = map_file(path)?;
    tracing::debug!(path = %path.display(), len = data.len(), "interpreting dvi file");
    interpret(data, provider)
}

/// Interpret many files in parallel, one interpreter per file.
///
/// Results are in input order. `threads` of `None` uses the available
/// parallelism.
pub fn interpret_many<P: AsRef<Path> + Sync>(
    paths: &[P],
    provider: &(dyn MetricsProvider + Sync),
    threads: Option<usize>,
) -> Result<Vec<Result<DviDocument>>> {
    let thread_count = threads.unwrap_or_else(default_thread_count).max(1);
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .map_err(|e| DviError::Io(std::io::Error::other(e.to_string())))?;

    let results: Vec<Result<DviDocument>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| interpret_file(path, provider))
            .collect()
    });
    Ok(results)
}

/// Offsets of every page, found from the trailer without reading the pages.
pub fn page_index(data: impl Into<Bytes>) -> Result<PageIndex> {
    let mut stream = ByteStream::new(data);
    PageIndex::build(&mut stream)
}

/// Interpret only page `n` (0-based), using the fonts from the postamble.
pub fn interpret_page_at(
    data: impl Into<Bytes>,
    provider: &dyn MetricsProvider,
    n: usize,
) -> Result<Option<PageState>> {
    let data = data.into();
    let index = page_index(data.clone())?;
    let Some(offset) = index.offset(n) else {
        return Ok(None);
    };
    let mut interp = Interpreter::with_provider(data, provider);
    interp.interpret_page(offset)?;
    Ok(interp.into_document().pages.pop())
}
