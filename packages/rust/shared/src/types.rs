//! Core domain types for the DocRelay package catalog and enrichment data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PackageIndex
// ---------------------------------------------------------------------------

/// The normalized structured catalog of one package's documentation set.
///
/// Built fresh per request from the upstream API-reference page and (when
/// available) the sidebar payload; serializable directly as the JSON-index
/// response. Never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageIndex {
    /// Package name as it appears in the documentation path.
    pub package: String,
    /// Pinned version, when the request path carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether the base path pins a version.
    pub versioned: bool,
    /// Normalized base path (`pkg` or `pkg/1.2.3`).
    pub base_path: String,
    /// The wrapper's own origin, used for every URL in this index.
    pub origin: String,
    /// Raw `Last-Modified` header from the API-reference response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Upstream URLs this index was derived from.
    pub sources: Vec<String>,
    /// Modules, deduplicated by name.
    pub modules: Vec<ModuleEntry>,
    /// Guides, deduplicated by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guides: Vec<GuideEntry>,
    /// Tasks, deduplicated by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskEntry>,
    /// Curated common-task entries; only entries with at least one resolved
    /// entrypoint are present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_map: Vec<TaskMapEntry>,
    /// When this index was generated.
    pub generated_at: DateTime<Utc>,
}

impl PackageIndex {
    /// Look up a module by exact name.
    pub fn module(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Look up a guide by exact id.
    pub fn guide(&self, id: &str) -> Option<&GuideEntry> {
        self.guides.iter().find(|g| g.id == id)
    }

    /// Look up a task by exact id or title.
    pub fn task(&self, key: &str) -> Option<&TaskEntry> {
        self.tasks.iter().find(|t| t.id == key || t.title == key)
    }
}

// ---------------------------------------------------------------------------
// Catalog entries
// ---------------------------------------------------------------------------

/// One module listed in the package's documentation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Fully qualified module name (e.g., `Relay.Repo`).
    pub name: String,
    /// Human summary from the API-reference table, when that source was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Canonical page URL under the wrapper origin.
    pub url: String,
    /// Markdown-variant URL under the wrapper origin.
    pub markdown_url: String,
    /// Deprecation flag from the sidebar payload.
    #[serde(default)]
    pub deprecated: bool,
    /// Group label from the sidebar payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// One guide (narrative extra page) from the sidebar payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideEntry {
    /// Stable guide id (the page slug).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Group label, when the sidebar assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Canonical page URL under the wrapper origin.
    pub url: String,
    /// Section headers within the guide, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

/// One runnable task from the sidebar payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    /// Stable task id (e.g., `Mix.Tasks.Relay.Migrate`).
    pub id: String,
    /// Display title (e.g., `mix relay.migrate`).
    pub title: String,
    /// Group label, when the sidebar assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Canonical page URL under the wrapper origin.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Task map
// ---------------------------------------------------------------------------

/// One resolved entrypoint of a task-map entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMapLink {
    /// Display label (module name, task title, or guide title).
    pub label: String,
    /// Page URL under the wrapper origin.
    pub url: String,
}

/// One curated common-task entry, derived from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMapEntry {
    /// Stable rule id (e.g., `getting-started`).
    pub id: String,
    /// Short imperative title.
    pub title: String,
    /// One-sentence description of the workflow.
    pub description: String,
    /// Resolved entrypoints, deduplicated by URL, in rule order.
    pub entrypoints: Vec<TaskMapLink>,
}

// ---------------------------------------------------------------------------
// Enrichment data
// ---------------------------------------------------------------------------

/// One field of an option-map type extracted from a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Option key, without the leading colon.
    pub key: String,
    /// Whether the field is required (not wrapped in `optional(...)`).
    pub required: bool,
    /// Declared type text, verbatim.
    #[serde(rename = "type")]
    pub type_text: String,
}

/// One function signature extracted from a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecEntry {
    /// Function name.
    pub name: String,
    /// Full signature line, verbatim.
    pub signature: String,
    /// Name of the associated option-map type, when an argument follows the
    /// `*_opts` convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_type: Option<String>,
}
