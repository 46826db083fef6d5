//! URL handling module for Reel-Harvest
//!
//! Detail pages, cast profiles and review category entry points are discovered as
//! relative or absolute `href` attributes. This module resolves them against the
//! session domain and canonicalizes listing identifiers so duplicates are detected.

mod resolve;

pub use resolve::{canonical_identifier, resolve_href, session_base};
