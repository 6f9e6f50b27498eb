//! Detection of the file format by the url suffix.

/// Field separator of a delimited text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// `,` — used for `.csv` files and as the fallback.
    Comma,
    /// `\t` — used for `.tsv` files.
    Tab,
    /// `|` — used for `.dsv` files.
    Pipe,
}

impl Delimiter {
    /// Selects the delimiter for the given url. Urls ending with `.tsv` use tab, `.dsv` use pipe,
    /// anything else uses comma.
    pub fn for_url(url: &str) -> Self {
        if url.ends_with(".tsv") {
            Delimiter::Tab
        } else if url.ends_with(".dsv") {
            Delimiter::Pipe
        } else {
            Delimiter::Comma
        }
    }

    /// The separator byte.
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }
}

/// Format of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Delimited text with a header row.
    Delimited(Delimiter),
    /// KML document.
    Kml,
}

impl SourceFormat {
    /// Detects the format by the url suffix. The match is literal and case-sensitive: only urls
    /// ending with `.csv`, `.tsv`, `.dsv` or `.kml` are recognized.
    pub fn from_url(url: &str) -> Option<Self> {
        if [".csv", ".tsv", ".dsv"]
            .iter()
            .any(|suffix| url.ends_with(suffix))
        {
            Some(SourceFormat::Delimited(Delimiter::for_url(url)))
        } else if url.ends_with(".kml") {
            Some(SourceFormat::Kml)
        } else {
            None
        }
    }
}
