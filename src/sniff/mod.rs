//! Media format identification from leading bytes.
//!
//! A [`DetectorRegistry`] holds an ordered list of [`Detector`]s and returns the
//! label of the first one that matches. The registry is immutable once built,
//! so one instance can be shared freely between concurrent pipelines.
//!
//! ```rust
//! use rayban_tag::sniff::{DetectorRegistry, Source};
//!
//! let registry = DetectorRegistry::builtin();
//! let label = registry.identify(Source::Bytes(b"\x89PNG\r\n\x1a\n....")).unwrap();
//! assert_eq!(label, Some("png"));
//! ```

mod detectors;

pub use detectors::{BMP, BUILTIN, GIF, JPEG, PNG, TIFF, WEBP};

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Number of leading bytes handed to detectors.
pub const PREFIX_LEN: usize = 32;

/// A single signature rule mapping a byte prefix to a format label.
#[derive(Clone, Copy)]
pub struct Detector {
    label: &'static str,
    rule: fn(&[u8]) -> bool,
}

impl Detector {
    pub const fn new(label: &'static str, rule: fn(&[u8]) -> bool) -> Self {
        Self { label, rule }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the label when `prefix` matches this rule.
    pub fn detect(&self, prefix: &[u8]) -> Option<&'static str> {
        (self.rule)(prefix).then_some(self.label)
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Detector").field(&self.label).finish()
    }
}

/// Anything that can be read from and repositioned.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Where the bytes to identify come from.
pub enum Source<'a> {
    /// An in-memory buffer; only the first [`PREFIX_LEN`] bytes are inspected.
    Bytes(&'a [u8]),
    /// An open stream. The prefix is read from the current position and the
    /// position is restored before returning.
    Stream(&'a mut dyn ReadSeek),
    /// A file on disk, opened and closed within the call.
    Path(&'a Path),
}

/// Ordered detectors, evaluated first-match-wins.
#[derive(Debug, Clone, Default)]
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
}

impl DetectorRegistry {
    /// An empty registry. Matches nothing until detectors are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in image signatures:
    /// jpeg, png, gif, bmp, tiff, webp (in that order).
    pub fn builtin() -> Self {
        Self {
            detectors: BUILTIN.to_vec(),
        }
    }

    /// Appends a detector after all existing ones.
    ///
    /// Inputs already claimed by an earlier detector keep their label.
    pub fn with(mut self, detector: Detector) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Identify the format of `source`. `Ok(None)` means unknown.
    pub fn identify(&self, source: Source<'_>) -> io::Result<Option<&'static str>> {
        let label = match source {
            Source::Bytes(bytes) => self.identify_prefix(&bytes[..bytes.len().min(PREFIX_LEN)]),
            Source::Stream(stream) => self.identify_prefix(&read_stream_prefix(stream)?),
            Source::Path(path) => self.identify_prefix(&read_file_prefix(path)?),
        };
        Ok(label)
    }

    /// Run the detectors over an already-read prefix.
    pub fn identify_prefix(&self, prefix: &[u8]) -> Option<&'static str> {
        self.detectors.iter().find_map(|d| d.detect(prefix))
    }
}

/// Identify `source` with the built-in registry.
pub fn identify(source: Source<'_>) -> io::Result<Option<&'static str>> {
    DetectorRegistry::builtin().identify(source)
}

/// Read up to [`PREFIX_LEN`] bytes and put the cursor back where it was,
/// whether or not the read succeeded.
fn read_stream_prefix(stream: &mut dyn ReadSeek) -> io::Result<Vec<u8>> {
    let start = stream.stream_position()?;
    let mut prefix = Vec::with_capacity(PREFIX_LEN);
    let read = Read::take(&mut *stream, PREFIX_LEN as u64).read_to_end(&mut prefix);
    stream.seek(SeekFrom::Start(start))?;
    read?;
    Ok(prefix)
}

fn read_file_prefix(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(PREFIX_LEN);
    file.take(PREFIX_LEN as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Guess a format label from a file name's extension.
///
/// Used when the byte signature is unknown, e.g. for video containers which
/// have no built-in detector.
pub fn format_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("jpeg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "bmp" => Some("bmp"),
        "tif" | "tiff" => Some("tiff"),
        "webp" => Some("webp"),
        "mp4" | "m4v" => Some("mp4"),
        "mov" => Some("mov"),
        _ => None,
    }
}
