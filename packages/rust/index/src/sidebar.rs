//! Sidebar payload discovery and parsing.
//!
//! The upstream generator ships per-package navigation data as a JavaScript
//! file assigning a JSON object: `sidebarNodes=<JSON>;`. The file name is
//! version-stamped (`sidebar_items-<stamp>.js`) and referenced from each
//! rendered page, so its location is discovered by scanning the
//! API-reference HTML rather than assumed. The payload is an external text
//! grammar, not an API — parse it defensively.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use docrelay_shared::{DocRelayError, Result};

/// Assignment prefix of the payload envelope.
pub const ENVELOPE_PREFIX: &str = "sidebarNodes=";

/// Matches a script reference to a version-stamped sidebar file.
static SIDEBAR_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src=["']([^"']*sidebar_items-[A-Za-z0-9]+\.js)["']"#).expect("sidebar src regex")
});

// ---------------------------------------------------------------------------
// Payload structures
// ---------------------------------------------------------------------------

/// Parsed sidebar payload: module, guide ("extras"), and task listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SidebarPayload {
    #[serde(default)]
    pub modules: Vec<SidebarModule>,
    #[serde(default)]
    pub extras: Vec<SidebarExtra>,
    #[serde(default)]
    pub tasks: Vec<SidebarTask>,
}

/// One module row in the sidebar listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SidebarModule {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub group: Option<String>,
}

/// One narrative extra (guide) in the sidebar listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SidebarExtra {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub headers: Vec<SidebarHeader>,
}

/// One in-page header of a guide.
#[derive(Debug, Clone, Deserialize)]
pub struct SidebarHeader {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub anchor: String,
}

/// One task page in the sidebar listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SidebarTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub group: Option<String>,
}

impl SidebarModule {
    /// Display title, falling back to the id when the payload omits one.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() { &self.id } else { &self.title }
    }
}

// ---------------------------------------------------------------------------
// Discovery and parsing
// ---------------------------------------------------------------------------

/// Find the sidebar script reference in a rendered page's HTML.
///
/// Returns the reference as written (usually relative, e.g.
/// `dist/sidebar_items-1A2B3C.js`); the caller resolves it against the
/// page's own URL.
pub fn discover_sidebar_src(html: &str) -> Option<&str> {
    SIDEBAR_SRC_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse the `sidebarNodes=<JSON>;` envelope.
pub fn parse_sidebar(payload: &str) -> Result<SidebarPayload> {
    let trimmed = payload.trim_start_matches('\u{feff}').trim_start();
    let Some(rest) = trimmed.strip_prefix(ENVELOPE_PREFIX) else {
        return Err(DocRelayError::sidebar_parse(format!(
            "payload does not start with `{ENVELOPE_PREFIX}`"
        )));
    };

    let json = rest.trim_end().trim_end_matches(';').trim_end();
    serde_json::from_str(json)
        .map_err(|e| DocRelayError::sidebar_parse(format!("payload JSON invalid: {e}")))
}
