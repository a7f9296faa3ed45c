//! HTML→Markdown conversion and link rewriting for upstream doc pages.
//!
//! This crate owns the text-level transformations of the render pipeline:
//! - [`entity`] — entity decoding and tag stripping
//! - [`convert`] — the ordered HTML→Markdown pass pipeline
//! - [`links`] — href resolution and upstream→wrapper link rewriting

pub mod convert;
pub mod entity;
pub mod links;

pub use convert::html_to_markdown;
pub use entity::{decode_entities, strip_tags};
pub use links::{resolve_href, rewrite_links};
