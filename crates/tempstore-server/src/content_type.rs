//! Content type and disposition resolution for stored names.
//!
//! Content types are never persisted: they are recomputed from the name on
//! every read, so renaming rules or table updates apply to existing entries.

use std::fmt;
use std::path::Path;

use crate::service::encode_path_segment;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Consulted when the system table has no entry for an extension.
const FALLBACK_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("zip", "application/zip"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
];

/// Resolve the MIME type for a file name from its extension.
pub fn resolve(name: &str) -> &'static str {
    let Some(ext) = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
    else {
        return OCTET_STREAM;
    };

    if let Some(mime) = mime_guess::from_ext(&ext).first_raw() {
        return mime;
    }

    FALLBACK_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// Whether delivered content should render in place or be downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn for_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/")
            || content_type.starts_with("text/")
            || content_type == "application/pdf"
        {
            Disposition::Inline
        } else {
            Disposition::Attachment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }

    /// Full `Content-Disposition` value suggesting `filename`.
    ///
    /// Non-ASCII names get an ASCII `filename` fallback plus the exact name
    /// as an RFC 5987 `filename*` parameter.
    pub fn header_value(&self, filename: &str) -> String {
        let mut quoted = String::with_capacity(filename.len());
        for c in filename.chars() {
            match c {
                '"' | '\\' => {
                    quoted.push('\\');
                    quoted.push(c);
                }
                c if c.is_ascii() => quoted.push(c),
                _ => quoted.push('_'),
            }
        }

        if filename.is_ascii() {
            format!("{}; filename=\"{}\"", self.as_str(), quoted)
        } else {
            format!(
                "{}; filename=\"{}\"; filename*=UTF-8''{}",
                self.as_str(),
                quoted,
                encode_path_segment(filename)
            )
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
