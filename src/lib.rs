//! # rayban-tag
//!
//! Re-tag photos and videos so they read as captures from Ray-Ban Meta smart
//! glasses. Every file gets the same three device tags:
//!
//! | Tag | Value |
//! |-----|-------|
//! | `Make` | `Meta` |
//! | `Model` | `Ray-Ban Meta Smart Glasses` |
//! | `Software` | `Meta View App` |
//!
//! The tags are written by an external exiftool-compatible program; this crate
//! identifies the file, builds the command, classifies failures and cleans up
//! the backup copy the tool leaves behind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rayban_tag::sniff::{DetectorRegistry, Source};
//! use rayban_tag::tagger::{ErrorKind, Tagger};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let path = Path::new("upload.jpg");
//!
//!     // 1. Identify the format from the leading bytes (optional)
//!     let registry = DetectorRegistry::builtin();
//!     let label = registry.identify(Source::Path(path))?;
//!     println!("Format: {}", label.unwrap_or("unknown"));
//!
//!     // 2. Rewrite the device tags in place
//!     let tagger = Tagger::new("exiftool");
//!     match tagger.apply_tags(path).await {
//!         Ok(path) => println!("Tagged {}", path.display()),
//!         Err(e) if e.kind() == ErrorKind::ToolUnavailable => eprintln!("Install exiftool: {e}"),
//!         Err(e) => eprintln!("Failed to edit metadata: {e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`sniff`]: byte-signature format detection
//! - [`tagger`]: external tool invocation, error classification, backup cleanup
//! - [`pipeline`]: file collection and concurrent batch processing
//! - [`config`]: configuration types and loading/saving
//! - [`exif`]: read back the device tags stored in a file

pub mod config;
pub mod exif;
pub mod pipeline;
pub mod sniff;
pub mod tagger;
