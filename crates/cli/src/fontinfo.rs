//! fontinfo - Show how a TeX font name resolves
//!
//! Looks the font up in a font map, loads its TFM metrics through the search
//! path and reports where its backing font file lives.

mod common;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use common::{SearchArgs, init_logging};
use dviread_core::font::{FontMapRecord, FontMapTable, FontResolver, MapMode, TfmMetrics};
use dviread_core::search::{FormatClass, Resolver};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolve a TeX font through font maps, metrics and the search path.
#[derive(Parser, Debug)]
#[command(name = "fontinfo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TeX font name, e.g. cmr10
    font: String,

    /// Font map to consult; may be repeated
    #[arg(short = 'm', long = "map", value_name = "NAME")]
    maps: Vec<String>,

    /// Format class used to locate the backing font file
    #[arg(long, default_value = "type1")]
    class: FormatClass,

    /// Locate a file of any class by name instead of describing a font
    #[arg(long, value_name = "CLASS")]
    find: Option<FormatClass>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Print the report as JSON
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    json: bool,

    #[command(flatten)]
    search: SearchArgs,
}

#[derive(Debug, Serialize)]
struct MetricsSummary {
    path: Option<PathBuf>,
    checksum: u32,
    design_size_pt: f64,
    char_count: usize,
}

#[derive(Debug, Serialize)]
struct FontReport {
    font: String,
    map_record: Option<FontMapRecord>,
    metrics: Option<MetricsSummary>,
    font_file: Option<PathBuf>,
}

impl FontReport {
    fn print(&self) {
        println!("font:        {}", self.font);
        match &self.map_record {
            Some(record) => {
                println!("map entry:   {}", record.tex_name);
                if let Some(name) = &record.font_name {
                    println!("  font name: {name}");
                }
                if let Some(enc) = &record.encoding {
                    println!("  encoding:  {enc}");
                }
                if let Some(file) = &record.file {
                    println!("  file:      {file}");
                }
                for (flag, value) in &record.options {
                    println!("  option:    {flag} {value}");
                }
            }
            None => println!("map entry:   (none)"),
        }
        match &self.metrics {
            Some(m) => {
                if let Some(path) = &m.path {
                    println!("metrics:     {}", path.display());
                }
                println!("  checksum:  {:08X}", m.checksum);
                println!("  design:    {:.2}pt", m.design_size_pt);
                println!("  chars:     {}", m.char_count);
            }
            None => println!("metrics:     (not found)"),
        }
        match &self.font_file {
            Some(path) => println!("font file:   {}", path.display()),
            None => println!("font file:   (not found)"),
        }
    }
}

fn load_fontmap(resolver: &Resolver, maps: &[String]) -> Result<Option<FontMapTable>> {
    if maps.is_empty() {
        return Ok(None);
    }
    let mut table = FontMapTable::new();
    for name in maps {
        let count = table
            .load_named(resolver, name, MapMode::Replace)
            .with_context(|| format!("loading font map {name}"))?;
        tracing::debug!(map = %name, count, "font map loaded");
    }
    Ok(Some(table))
}

fn summarize(resolver: &Resolver, font: &str, metrics: &TfmMetrics) -> MetricsSummary {
    MetricsSummary {
        path: resolver.find(font, FormatClass::Tfm),
        checksum: metrics.checksum,
        design_size_pt: metrics.design_size_pt(),
        char_count: metrics.char_count(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let resolver = Arc::new(args.search.build_resolver()?);

    if let Some(class) = args.find {
        let path = resolver.resolve(&args.font, class)?;
        println!("{}", path.display());
        return Ok(());
    }

    let mut provider = FontResolver::new(Arc::clone(&resolver));
    if let Some(table) = load_fontmap(&resolver, &args.maps)? {
        provider = provider.with_fontmap(Arc::new(table));
    }

    let map_record = provider
        .fontmap()
        .and_then(|table| table.get(&args.font))
        .cloned();
    let metrics = provider
        .metrics(&args.font)
        .map(|m| summarize(&resolver, &args.font, &m));
    let backing = map_record
        .as_ref()
        .map(|r| r.file_or_name().to_string())
        .unwrap_or_else(|| args.font.clone());
    let font_file = resolver.find(&backing, args.class);

    let report = FontReport {
        font: args.font.clone(),
        map_record,
        metrics,
        font_file,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    if report.metrics.is_none() && report.font_file.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
