//! Resource format classes.
//!
//! Each class knows the filename suffixes it accepts, the kpathsea-style
//! environment variable that overrides its search path, and the TEXMF
//! subdirectory where its files conventionally live.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of resource being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatClass {
    /// Font map files (`.map`)
    FontMap,
    /// TeX font metrics (`.tfm`)
    Tfm,
    /// Virtual fonts (`.vf`, `.ovf`)
    VirtualFont,
    /// Type 1 font programs (`.pfb`, `.pfa`)
    Type1,
    /// TrueType fonts and collections (`.ttf`, `.ttc`)
    TrueType,
    /// OpenType/CFF fonts (`.otf`)
    OpenType,
    /// PostScript encoding vectors (`.enc`)
    Encoding,
    /// Subfont definition files (`.sfd`)
    Subfont,
}

impl FormatClass {
    pub const ALL: [FormatClass; 8] = [
        FormatClass::FontMap,
        FormatClass::Tfm,
        FormatClass::VirtualFont,
        FormatClass::Type1,
        FormatClass::TrueType,
        FormatClass::OpenType,
        FormatClass::Encoding,
        FormatClass::Subfont,
    ];

    /// Filename suffixes tried, in order, when a name has none of them.
    pub const fn suffixes(self) -> &'static [&'static str] {
        match self {
            FormatClass::FontMap => &[".map"],
            FormatClass::Tfm => &[".tfm"],
            FormatClass::VirtualFont => &[".vf", ".ovf"],
            FormatClass::Type1 => &[".pfb", ".pfa"],
            FormatClass::TrueType => &[".ttf", ".ttc"],
            FormatClass::OpenType => &[".otf"],
            FormatClass::Encoding => &[".enc"],
            FormatClass::Subfont => &[".sfd"],
        }
    }

    /// Environment variable holding an override path list for this class.
    pub const fn env_var(self) -> &'static str {
        match self {
            FormatClass::FontMap => "TEXFONTMAPS",
            FormatClass::Tfm => "TFMFONTS",
            FormatClass::VirtualFont => "VFFONTS",
            FormatClass::Type1 => "T1FONTS",
            FormatClass::TrueType => "TTFONTS",
            FormatClass::OpenType => "OPENTYPEFONTS",
            FormatClass::Encoding => "ENCFONTS",
            FormatClass::Subfont => "SFDFONTS",
        }
    }

    /// Subdirectory of a TEXMF root holding this class.
    pub const fn texmf_subdir(self) -> &'static str {
        match self {
            FormatClass::FontMap => "fonts/map",
            FormatClass::Tfm => "fonts/tfm",
            FormatClass::VirtualFont => "fonts/vf",
            FormatClass::Type1 => "fonts/type1",
            FormatClass::TrueType => "fonts/truetype",
            FormatClass::OpenType => "fonts/opentype",
            FormatClass::Encoding => "fonts/enc",
            FormatClass::Subfont => "fonts/sfd",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FormatClass::FontMap => "font_map",
            FormatClass::Tfm => "tfm",
            FormatClass::VirtualFont => "virtual_font",
            FormatClass::Type1 => "type1",
            FormatClass::TrueType => "truetype",
            FormatClass::OpenType => "opentype",
            FormatClass::Encoding => "encoding",
            FormatClass::Subfont => "subfont",
        }
    }

    /// Whether `filename` already ends with one of this class's suffixes.
    pub fn has_suffix(self, filename: &str) -> bool {
        let lower = filename.to_ascii_lowercase();
        self.suffixes().iter().any(|sfx| lower.ends_with(sfx))
    }

    /// Filenames to look for when resolving `name`.
    ///
    /// A name already carrying a known suffix is tried as is. Otherwise each
    /// suffix is appended in turn and the bare name is tried last.
    pub fn candidates(self, name: &str) -> Vec<String> {
        if self.has_suffix(name) {
            return vec![name.to_string()];
        }
        let mut names: Vec<String> = self
            .suffixes()
            .iter()
            .map(|sfx| format!("{name}{sfx}"))
            .collect();
        names.push(name.to_string());
        names
    }
}

impl fmt::Display for FormatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "font_map" | "map" | "fontmap" => Ok(FormatClass::FontMap),
            "tfm" => Ok(FormatClass::Tfm),
            "virtual_font" | "vf" => Ok(FormatClass::VirtualFont),
            "type1" | "pfb" => Ok(FormatClass::Type1),
            "truetype" | "ttf" => Ok(FormatClass::TrueType),
            "opentype" | "otf" => Ok(FormatClass::OpenType),
            "encoding" | "enc" => Ok(FormatClass::Encoding),
            "subfont" | "sfd" => Ok(FormatClass::Subfont),
            _ => Err(format!("unknown format class: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_append_suffixes_then_bare_name() {
        assert_eq!(
            FormatClass::VirtualFont.candidates("cmr10"),
            vec!["cmr10.vf", "cmr10.ovf", "cmr10"]
        );
        assert_eq!(FormatClass::FontMap.candidates("pdftex.map"), vec!["pdftex.map"]);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("map".parse::<FormatClass>(), Ok(FormatClass::FontMap));
        assert_eq!("font-map".parse::<FormatClass>(), Ok(FormatClass::FontMap));
        assert!("bogus".parse::<FormatClass>().is_err());
    }
}
