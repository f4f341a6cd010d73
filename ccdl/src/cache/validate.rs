//! Format-specific validity checks for cached and downloaded artifacts.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::catalog::XmlElement;
use crate::error::{FetchError, FetchResult};

/// How an artifact is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Must parse as XML.
    Xml,
    /// Must parse as JSON.
    Json,
    /// Zip archive; every entry's CRC must match.
    Zip,
    /// Anything else; always valid.
    Opaque,
}

impl ArtifactFormat {
    /// Infer the format from a file extension.
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("xml") => Self::Xml,
            Some("json") => Self::Json,
            Some("zip") => Self::Zip,
            _ => Self::Opaque,
        }
    }
}

/// Check the file at `path` against `format`.
pub fn validate(path: &Path, format: ArtifactFormat) -> bool {
    match format {
        ArtifactFormat::Xml => fs::read(path)
            .ok()
            .map(|bytes| XmlElement::parse(&bytes).is_ok())
            .unwrap_or(false),
        ArtifactFormat::Json => fs::read(path)
            .ok()
            .map(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).is_ok())
            .unwrap_or(false),
        ArtifactFormat::Zip => check_zip_crc(path).is_ok(),
        ArtifactFormat::Opaque => path.is_file(),
    }
}

/// Verify a downloaded archive.
///
/// Files that are not zip archives by extension pass unchecked.
pub fn check_archive(path: &Path) -> FetchResult<()> {
    if ArtifactFormat::for_path(path) != ArtifactFormat::Zip {
        return Ok(());
    }

    check_zip_crc(path).map_err(|reason| FetchError::CorruptArchive {
        path: path.to_path_buf(),
        reason,
    })
}

/// Read every entry to the end so the zip reader verifies its CRC-32.
fn check_zip_crc(path: &Path) -> Result<(), String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| e.to_string())?;
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink()).map_err(|e| format!("{}: {}", name, e))?;
    }
    Ok(())
}
