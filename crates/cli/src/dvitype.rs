//! dvitype - Interpret DVI files and print what they contain
//!
//! Prints a per-page summary (or the whole document as JSON) after resolving
//! the referenced fonts through the configured search path.

mod common;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use common::{SearchArgs, init_logging};
use dviread_core::api::{self, interpret_many, interpret_page_at, interpret_partial, map_file};
use dviread_core::dvi::{DviDocument, Event, PageState};
use dviread_core::error::DviError;
use dviread_core::font::{FontMapTable, FontResolver, MapMode};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Interpret DVI files and print their pages, fonts and events.
#[derive(Parser, Debug)]
#[command(name = "dvitype")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One or more DVI files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Print the document as JSON
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    json: bool,

    /// List every event instead of a per-page summary
    #[arg(short = 'e', long, action = ArgAction::SetTrue)]
    events: bool,

    /// Only interpret this page (1-indexed, in file order)
    #[arg(short = 'p', long, value_name = "N")]
    page: Option<usize>,

    /// Font map to load; a leading + or - appends or removes entries. May be repeated.
    #[arg(short = 'm', long = "map", value_name = "NAME")]
    maps: Vec<String>,

    /// Keep going after an error and print the pages read so far
    #[arg(long, action = ArgAction::SetTrue)]
    partial: bool,

    /// Number of threads used when several files are given
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    #[command(flatten)]
    search: SearchArgs,
}

fn build_provider(args: &Args) -> Result<FontResolver> {
    let resolver = Arc::new(args.search.build_resolver()?);
    let mut provider = FontResolver::new(Arc::clone(&resolver));
    if !args.maps.is_empty() {
        let mut table = FontMapTable::new();
        for name in &args.maps {
            table
                .load_named(&resolver, name, MapMode::Replace)
                .with_context(|| format!("loading font map {name}"))?;
        }
        provider = provider.with_fontmap(Arc::new(table));
    }
    Ok(provider)
}

fn describe_error(path: &Path, err: &DviError) -> String {
    match (err.offset(), err.opcode()) {
        (Some(offset), Some(opcode)) => format!(
            "{}: {err} (offset {offset}, opcode {opcode})",
            path.display()
        ),
        _ => format!("{}: {err}", path.display()),
    }
}

fn write_summary<W: Write>(out: &mut W, path: &Path, doc: &DviDocument, events: bool) -> io::Result<()> {
    writeln!(out, "{}", path.display())?;
    if let Some(pre) = &doc.preamble {
        writeln!(
            out,
            "  format {} num={} den={} mag={} '{}'",
            pre.id,
            pre.numerator,
            pre.denominator,
            pre.magnification,
            pre.comment_text().trim()
        )?;
    }
    for (id, font) in &doc.fonts {
        let mapped = doc
            .font_map
            .get(&font.name)
            .map(|r| format!(" -> {}", r.file_or_name()))
            .unwrap_or_default();
        writeln!(
            out,
            "  font {id}: {} at {:.2}pt{mapped}",
            font.name,
            f64::from(font.scale) / 65536.0
        )?;
    }
    for page in &doc.pages {
        write_page(out, page, events)?;
    }
    if let Some(post) = &doc.postamble {
        writeln!(
            out,
            "  {} pages declared, max stack depth {}",
            post.total_pages, post.max_stack_depth
        )?;
    }
    Ok(())
}

fn write_page<W: Write>(out: &mut W, page: &PageState, events: bool) -> io::Result<()> {
    let (mut chars, mut rules, mut specials) = (0usize, 0usize, 0usize);
    for event in &page.events {
        match event {
            Event::Char { .. } => chars += 1,
            Event::Rule { .. } => rules += 1,
            Event::Special { .. } => specials += 1,
            Event::FontSelect { .. } => {}
        }
    }
    writeln!(
        out,
        "  [{}] at {}: {chars} chars, {rules} rules, {specials} specials",
        page.number(),
        page.offset
    )?;
    if !events {
        writeln!(out, "    {}", page.text())?;
        return Ok(());
    }
    for event in &page.events {
        match event {
            Event::Char {
                h,
                v,
                font,
                code,
                width,
                placement,
            } => {
                let width = width.map_or_else(|| "?".to_string(), |w| w.to_string());
                writeln!(out, "    {placement:?} char {code} font {font} at ({h},{v}) width {width}")?;
            }
            Event::Rule {
                h,
                v,
                height,
                width,
                visible,
                placement,
            } => {
                let hidden = if *visible { "" } else { " (invisible)" };
                writeln!(out, "    {placement:?} rule {height}x{width} at ({h},{v}){hidden}")?;
            }
            Event::FontSelect { font } => writeln!(out, "    select font {font}")?,
            Event::Special { h, v, payload } => writeln!(
                out,
                "    special at ({h},{v}): {}",
                String::from_utf8_lossy(payload)
            )?,
        }
    }
    Ok(())
}

fn emit<W: Write>(out: &mut W, args: &Args, path: &Path, doc: &DviDocument) -> Result<()> {
    if args.json {
        serde_json::to_writer_pretty(&mut *out, doc)?;
        writeln!(out)?;
    } else {
        write_summary(out, path, doc, args.events)?;
    }
    Ok(())
}

fn run(args: &Args) -> Result<bool> {
    let provider = build_provider(args)?;
    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };
    let mut ok = true;

    if let Some(page) = args.page {
        if page == 0 {
            bail!("page numbers start at 1");
        }
        for path in &args.files {
            let data = map_file(path).with_context(|| format!("reading {}", path.display()))?;
            match interpret_page_at(data, &provider, page - 1) {
                Ok(Some(state)) => {
                    if args.json {
                        serde_json::to_writer_pretty(&mut output, &state)?;
                        writeln!(output)?;
                    } else {
                        writeln!(output, "{}", path.display())?;
                        write_page(&mut output, &state, args.events)?;
                    }
                }
                Ok(None) => {
                    tracing::warn!(path = %path.display(), page, "no such page");
                    ok = false;
                }
                Err(err) => {
                    eprintln!("{}", describe_error(path, &err));
                    ok = false;
                }
            }
        }
    } else if args.partial {
        for path in &args.files {
            let data = map_file(path).with_context(|| format!("reading {}", path.display()))?;
            let (doc, err) = interpret_partial(data, &provider);
            if let Some(err) = err {
                eprintln!("{}", describe_error(path, &err));
                ok = false;
            }
            emit(&mut output, args, path, &doc)?;
        }
    } else if args.files.len() == 1 {
        let path = &args.files[0];
        match api::interpret_file(path, &provider) {
            Ok(doc) => emit(&mut output, args, path, &doc)?,
            Err(err) => {
                eprintln!("{}", describe_error(path, &err));
                ok = false;
            }
        }
    } else {
        let results = interpret_many(&args.files, &provider, args.threads)?;
        for (path, result) in args.files.iter().zip(results) {
            match result {
                Ok(doc) => emit(&mut output, args, path, &doc)?,
                Err(err) => {
                    eprintln!("{}", describe_error(path, &err));
                    ok = false;
                }
            }
        }
    }

    output.flush()?;
    Ok(ok)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    if !run(&args)? {
        std::process::exit(1);
    }
    Ok(())
}
