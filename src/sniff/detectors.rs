//! Built-in byte-signature rules.

use super::Detector;

pub const JPEG: Detector = Detector::new("jpeg", is_jpeg);
pub const PNG: Detector = Detector::new("png", is_png);
pub const GIF: Detector = Detector::new("gif", is_gif);
pub const BMP: Detector = Detector::new("bmp", is_bmp);
pub const TIFF: Detector = Detector::new("tiff", is_tiff);
pub const WEBP: Detector = Detector::new("webp", is_webp);

/// Registration order of the built-in registry.
pub const BUILTIN: [Detector; 6] = [JPEG, PNG, GIF, BMP, TIFF, WEBP];

fn is_jpeg(prefix: &[u8]) -> bool {
    prefix.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn is_png(prefix: &[u8]) -> bool {
    prefix.starts_with(b"\x89PNG\r\n\x1a\n")
}

fn is_gif(prefix: &[u8]) -> bool {
    prefix.starts_with(b"GIF87a") || prefix.starts_with(b"GIF89a")
}

fn is_bmp(prefix: &[u8]) -> bool {
    prefix.starts_with(b"BM")
}

fn is_tiff(prefix: &[u8]) -> bool {
    matches!(prefix.get(..4), Some(b"II*\x00") | Some(b"MM\x00*"))
}

fn is_webp(prefix: &[u8]) -> bool {
    prefix.starts_with(b"RIFF") && prefix.get(8..12) == Some(b"WEBP".as_slice())
}
