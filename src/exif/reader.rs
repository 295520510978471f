use anyhow::{Context, Result};
use nom_exif::*;
use serde::Serialize;
use std::path::Path;

use crate::tagger::TAG_SET;

/// Device fields currently stored in a file's EXIF block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceTags {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
}

impl DeviceTags {
    /// Whether every field already carries the value the tagger writes.
    pub fn matches_tag_set(&self) -> bool {
        TAG_SET.iter().all(|(field, value)| {
            let current = match *field {
                "Make" => &self.make,
                "Model" => &self.model,
                "Software" => &self.software,
                _ => return false,
            };
            current.as_deref() == Some(*value)
        })
    }
}

/// Read the Make/Model/Software tags from an image file.
///
/// Files without an EXIF block (including most video containers) yield empty
/// tags rather than an error.
pub fn read_device_tags(path: &Path) -> Result<DeviceTags> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open media file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(DeviceTags::default());
        }
    };
    let exif: Exif = iter.into();

    Ok(DeviceTags {
        make: exif.get(ExifTag::Make).and_then(entry_to_string),
        model: exif.get(ExifTag::Model).and_then(entry_to_string),
        software: exif.get(ExifTag::Software).and_then(entry_to_string),
    })
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}
