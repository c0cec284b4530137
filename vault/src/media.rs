//! Media classification for vault files.
//!
//! The vault only knows a handful of document kinds; anything it cannot
//! recognise from the file name's extension is `Unknown`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Doc,
    Spreadsheet,
    Image,
    Unknown,
}

impl MediaType {
    /// Classify a file by the text after its last `.`.
    ///
    /// Matching is case-insensitive. A name without a dot is treated as its
    /// own extension, so `"README"` classifies as `Unknown`.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();

        match ext.as_str() {
            "pdf" => MediaType::Pdf,
            "doc" | "docx" => MediaType::Doc,
            "xls" | "xlsx" => MediaType::Spreadsheet,
            "jpg" | "jpeg" | "png" => MediaType::Image,
            _ => MediaType::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Doc => "doc",
            MediaType::Spreadsheet => "spreadsheet",
            MediaType::Image => "image",
            MediaType::Unknown => "unknown",
        }
    }
}

impl Default for MediaType {
    fn default() -> Self {
        MediaType::Unknown
    }
}
