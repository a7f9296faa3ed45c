//! Enrichment: everything derived from a page's Markdown and the Package
//! Index on the way to the final document.
//!
//! - [`signatures`] — type/signature/callback extraction from code fences
//! - [`taskmap`] — common-task synthesis from the catalog
//! - [`assembler`] — final document composition
//! - [`llms`] — llms-index rendering of a Package Index

pub mod assembler;
pub mod llms;
pub mod signatures;
pub mod taskmap;

pub use assembler::{AssembleContext, assemble};
pub use llms::render_llms_index;
pub use signatures::{CodeAnnotations, extract};
pub use taskmap::synthesize;
