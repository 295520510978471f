//! EXIF read-back of the device tags.
//!
//! Writing goes through the external tool (see [`crate::tagger`]); this module
//! only reads what ended up in the file, e.g. to verify a tagging run.

mod reader;

pub use reader::{read_device_tags, DeviceTags};
