//! Core render pipeline for DocRelay.
//!
//! Ties retrieval, conversion, index construction, and enrichment together
//! into the three per-request operations the router dispatches to:
//! [`pipeline::render_page`], [`pipeline::render_llms_index`], and
//! [`pipeline::render_index_json`].

pub mod errordoc;
pub mod fetch;
pub mod pipeline;

pub use fetch::{PageKind, RetrievedPage};
pub use pipeline::{
    RenderRequest, RenderedDocument, build_package_index, render_index_json, render_llms_index,
    render_page,
};
