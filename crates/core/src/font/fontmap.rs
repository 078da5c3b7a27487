//! Font map files.
//!
//! A font map associates a TeX font name with the encoding, backing font and
//! rendering options a driver should use for it. Two line syntaxes exist in
//! the wild and both are accepted:
//!
//! ```text
//! % dvipdfm: texname [encoding] [fontfile] [-flag value]...
//! rml  H  :0:HeiseiMin-W3 -s 0.167
//! % dvips/pdfTeX: texname [psname] ["ps code"] [<file] [<[enc]
//! ptmr8r Times-Roman "TeXBase1Encoding ReEncodeFont" <8r.enc <utmr8a.pfb
//! ```

use crate::error::{DviError, Result};
use crate::search::{FormatClass, Resolver};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Option flags (dvipdfm syntax) that take no value.
const VALUELESS_FLAGS: &[&str] = &["r"];

/// Key under which the quoted PostScript snippet of a dvips line is stored.
pub const PS_CODE_OPTION: &str = "ps";

/// One font map entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontMapRecord {
    /// TeX font name (the lookup key)
    pub tex_name: String,
    /// Re-encoding vector name
    pub encoding: Option<String>,
    /// PostScript or native font name of the backing font
    pub font_name: Option<String>,
    /// Backing font file
    pub file: Option<String>,
    /// Rendering options, flag to raw text; valueless flags map to `""`
    pub options: BTreeMap<String, String>,
}

impl FontMapRecord {
    pub fn new(tex_name: impl Into<String>) -> Self {
        Self {
            tex_name: tex_name.into(),
            encoding: None,
            font_name: None,
            file: None,
            options: BTreeMap::new(),
        }
    }

    /// The backing file, falling back to the font name and then the TeX name.
    pub fn file_or_name(&self) -> &str {
        self.file
            .as_deref()
            .or(self.font_name.as_deref())
            .unwrap_or(&self.tex_name)
    }

    /// Parse a numeric option such as slant (`s`) or extend (`e`).
    pub fn option_f64(&self, flag: &str) -> Option<f64> {
        self.options.get(flag)?.parse().ok()
    }
}

/// How records from a newly loaded map combine with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Later records override earlier ones with the same name
    #[default]
    Replace,
    /// Existing records are kept; duplicates are ignored
    Append,
    /// Records with the listed names are removed
    Remove,
}

impl MapMode {
    /// Split a pdfTeX-style mode prefix (`+`, `=`, `-`) off a map file name.
    pub fn split_prefix(name: &str) -> (MapMode, &str) {
        match name.as_bytes().first() {
            Some(b'+') => (MapMode::Append, &name[1..]),
            Some(b'=') => (MapMode::Replace, &name[1..]),
            Some(b'-') => (MapMode::Remove, &name[1..]),
            _ => (MapMode::Replace, name),
        }
    }
}

// ============================================================================
// Line parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    quoted: bool,
}

fn tokenize(line: &str) -> std::result::Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if bytes[i] == b'"' {
            let start = i + 1;
            let Some(len) = line[start..].find('"') else {
                return Err("unterminated quoted string".to_string());
            };
            tokens.push(Token {
                text: &line[start..start + len],
                quoted: true,
            });
            i = start + len + 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'"' {
            i += 1;
        }
        tokens.push(Token {
            text: &line[start..i],
            quoted: false,
        });
    }
    Ok(tokens)
}

fn is_comment(line: &str) -> bool {
    matches!(line.as_bytes().first(), Some(b'%' | b'#' | b'*' | b';'))
}

/// dvips/pdfTeX lines contain `"` or `<`, or consist of exactly two fields.
fn is_dvips_line(line: &str, tokens: &[Token<'_>]) -> bool {
    line.contains('"') || line.contains('<') || tokens.len() == 2
}

fn clean_encoding(name: &str) -> Option<String> {
    match name {
        "" | "default" | "none" => None,
        other => Some(other.to_string()),
    }
}

fn parse_dvipdfm(tex_name: &str, rest: &[Token<'_>]) -> std::result::Result<FontMapRecord, String> {
    let mut record = FontMapRecord::new(tex_name);
    let mut iter = rest.iter().peekable();

    let positional = |tok: &&Token<'_>| tok.quoted || !tok.text.starts_with('-');
    if let Some(tok) = iter.next_if(positional) {
        record.encoding = clean_encoding(tok.text);
    }
    if let Some(tok) = iter.next_if(positional) {
        record.file = Some(tok.text.to_string());
    }

    while let Some(tok) = iter.next() {
        let Some(flag) = tok.text.strip_prefix('-').filter(|_| !tok.quoted) else {
            return Err(format!("unexpected field '{}'", tok.text));
        };
        if flag.is_empty() {
            return Err("empty option flag".to_string());
        }
        if VALUELESS_FLAGS.contains(&flag) {
            record.options.insert(flag.to_string(), String::new());
            continue;
        }
        let Some(value) = iter.next() else {
            return Err(format!("missing value for '-{flag}' option"));
        };
        validate_option(flag, value.text)?;
        record.options.insert(flag.to_string(), value.text.to_string());
    }
    Ok(record)
}

fn validate_option(flag: &str, value: &str) -> std::result::Result<(), String> {
    match flag {
        "s" => value
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| format!("invalid number '{value}' for '-s' option")),
        "e" | "b" => match value.parse::<f64>() {
            Ok(v) if v > 0.0 => Ok(()),
            _ => Err(format!("invalid value '{value}' for '-{flag}' option")),
        },
        "i" => value
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| format!("invalid TTC index '{value}'")),
        _ => Ok(()),
    }
}

fn parse_dvips(tex_name: &str, rest: &[Token<'_>]) -> std::result::Result<FontMapRecord, String> {
    let mut record = FontMapRecord::new(tex_name);
    let mut iter = rest.iter();

    while let Some(tok) = iter.next() {
        if tok.quoted {
            let code = record.options.entry(PS_CODE_OPTION.to_string()).or_default();
            if !code.is_empty() {
                code.push(' ');
            }
            code.push_str(tok.text.trim());
            continue;
        }
        if let Some(target) = tok.text.strip_prefix('<') {
            // `<file`, `<<file`, `<[enc`, or the prefix alone with the name following.
            let (is_enc, name) = match target.strip_prefix('[').or_else(|| target.strip_prefix('<')) {
                Some(stripped) => (target.starts_with('['), stripped),
                None => (false, target),
            };
            let name = if name.is_empty() {
                match iter.next() {
                    Some(next) => next.text,
                    None => return Err("missing file name after '<'".to_string()),
                }
            } else {
                name
            };
            if is_enc || name.to_ascii_lowercase().ends_with(".enc") {
                record.encoding = clean_encoding(name);
            } else {
                record.file = Some(name.to_string());
            }
            continue;
        }
        if record.font_name.is_none() && !tok.text.chars().all(|c| c.is_ascii_digit()) {
            record.font_name = Some(tok.text.to_string());
        } else if tok.text.chars().all(|c| c.is_ascii_digit()) {
            record.options.insert("flags".to_string(), tok.text.to_string());
        } else {
            tracing::trace!(field = tok.text, "ignoring extra font map field");
        }
    }
    Ok(record)
}

/// Parse one font map line.
///
/// Returns `None` for blank and comment lines, and an error message for
/// lines that cannot be understood.
pub fn parse_line(line: &str) -> Option<std::result::Result<FontMapRecord, String>> {
    let line = line.trim();
    if line.is_empty() || is_comment(line) {
        return None;
    }
    let tokens = match tokenize(line) {
        Ok(tokens) => tokens,
        Err(msg) => return Some(Err(msg)),
    };
    let (first, rest) = tokens.split_first()?;
    if first.quoted {
        return Some(Err("font name must not be quoted".to_string()));
    }
    Some(if is_dvips_line(line, &tokens) {
        parse_dvips(first.text, rest)
    } else {
        parse_dvipdfm(first.text, rest)
    })
}

// ============================================================================
// Table
// ============================================================================

/// Font map records keyed by TeX font name.
#[derive(Debug, Clone, Default)]
pub struct FontMapTable {
    records: IndexMap<String, FontMapRecord>,
}

impl FontMapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse map text into a fresh table; later duplicates win.
    pub fn parse_str(text: &str) -> Self {
        let mut table = Self::new();
        table.load_lines(text.lines(), MapMode::Replace, "<memory>");
        table
    }

    /// Merge records from a reader. Returns the number of records applied.
    pub fn load_reader<R: BufRead>(&mut self, reader: R, mode: MapMode, label: &str) -> Result<usize> {
        let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
        Ok(self.load_lines(lines.iter().map(String::as_str), mode, label))
    }

    /// Merge records from a map file on disk.
    pub fn load_file(&mut self, path: impl AsRef<Path>, mode: MapMode) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let count = self.load_reader(BufReader::new(file), mode, &path.display().to_string())?;
        tracing::debug!(map = %path.display(), records = count, "loaded font map");
        Ok(count)
    }

    /// Resolve a map file by logical name and merge it.
    ///
    /// A leading `+`, `=` or `-` selects the mode as in pdfTeX's
    /// `\pdfmapfile`; otherwise `mode` is used.
    pub fn load_named(&mut self, resolver: &Resolver, name: &str, mode: MapMode) -> Result<usize> {
        let (mode, name) = match MapMode::split_prefix(name) {
            (prefixed, stripped) if stripped.len() != name.len() => (prefixed, stripped),
            _ => (mode, name),
        };
        let path = resolver.resolve(name, FormatClass::FontMap)?;
        self.load_file(path, mode)
    }

    fn load_lines<'a, I>(&mut self, lines: I, mode: MapMode, label: &str) -> usize
    where
        I: Iterator<Item = &'a str>,
    {
        let mut applied = 0;
        for (index, line) in lines.enumerate() {
            match parse_line(line) {
                None => {}
                Some(Ok(record)) => {
                    if self.insert(record, mode) {
                        applied += 1;
                    }
                }
                Some(Err(msg)) => {
                    tracing::warn!(map = label, line = index + 1, "invalid font map record: {msg}");
                }
            }
        }
        applied
    }

    /// Apply one record under `mode`. Returns whether the table changed.
    pub fn insert(&mut self, record: FontMapRecord, mode: MapMode) -> bool {
        match mode {
            MapMode::Replace => {
                if let Some(old) = self.records.get(&record.tex_name)
                    && old != &record
                {
                    tracing::trace!(font = %record.tex_name, "font map record replaced");
                }
                self.records.insert(record.tex_name.clone(), record);
                true
            }
            MapMode::Append => {
                if self.records.contains_key(&record.tex_name) {
                    tracing::debug!(font = %record.tex_name, "duplicate font map record ignored");
                    false
                } else {
                    self.records.insert(record.tex_name.clone(), record);
                    true
                }
            }
            MapMode::Remove => self.records.shift_remove(&record.tex_name).is_some(),
        }
    }

    /// Look up a record by TeX font name.
    pub fn lookup(&self, tex_name: &str) -> Result<&FontMapRecord> {
        self.get(tex_name)
            .ok_or_else(|| DviError::FontNotMapped(tex_name.to_string()))
    }

    pub fn get(&self, tex_name: &str) -> Option<&FontMapRecord> {
        self.records.get(tex_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FontMapRecord> {
        self.records.values()
    }
}
