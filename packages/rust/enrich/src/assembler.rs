//! Final document assembly.
//!
//! Takes the link-rewritten Markdown body, the extracted code annotations,
//! and the Package Index, and composes the finished agent-facing document:
//! inserted section headings, per-function spec/option blocks, a
//! machine-readable options block, synopsis, warnings, workflow hints, and
//! the related-pages / guides / related-links tail sections. Sections with no
//! content are omitted, never emitted empty.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use docrelay_shared::{OptionEntry, PackageIndex};

use crate::signatures::CodeAnnotations;

/// Everything the assembler needs for one page.
#[derive(Debug, Clone)]
pub struct AssembleContext<'a> {
    /// Link-rewritten Markdown body.
    pub body: &'a str,
    /// Upstream URL the body was rendered from.
    pub source_url: &'a str,
    /// This page's own URL under the wrapper origin.
    pub page_url: &'a str,
    /// Code annotations extracted from the body.
    pub annotations: &'a CodeAnnotations,
    /// Package Index, when one could be built.
    pub index: Option<&'a PackageIndex>,
}

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading regex"));
static ARITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/\d+$").expect("arity regex"));
static EXCEPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Za-z0-9_.]*(?:Error|Exception)$").expect("exception regex")
});
static MODULE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9_]*(?:\.[A-Z][A-Za-z0-9_]*)+\b").expect("module ref regex")
});
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("link regex"));
static WARNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:>\s*)?(?:#{1,6}\s+)?\**\s*(?:note|warning|caution|important)\**\s*[:{]")
        .expect("warning regex")
});

/// Fixed preamble telling an agent how to read the document.
const INSTRUCTION_HEADER: &str = "> Machine-rendered documentation for automated agents. \
Function headings are followed by a Spec line and an option table when known; option maps \
are repeated as JSON under Agent data. All mirror-internal links resolve on this host.";

/// Maximum warning lines surfaced.
const MAX_WARNINGS: usize = 3;
/// Maximum entrypoint names in the synopsis.
const MAX_SYNOPSIS_FUNCTIONS: usize = 5;
/// Maximum task-map titles in the synopsis.
const MAX_SYNOPSIS_TASKS: usize = 3;
/// Maximum see-also links in the synopsis.
const MAX_SYNOPSIS_LINKS: usize = 5;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compose the final enriched document.
pub fn assemble(ctx: &AssembleContext<'_>) -> String {
    let enriched = enrich_body(ctx.body, ctx.annotations);
    let own_module = module_name_of(ctx.body);
    let pages = related_pages(ctx.body, own_module.as_deref(), ctx.index);
    let links = related_links(ctx.body, &[ctx.page_url, ctx.source_url]);
    let warnings = collect_warnings(ctx.body);
    let workflow = workflow_hint(ctx.body);
    let agent_data = agent_data_json(ctx.annotations);
    let synopsis = build_synopsis(ctx, own_module.as_deref(), &links);

    debug!(
        related_pages = pages.len(),
        related_links = links.len(),
        warnings = warnings.len(),
        "assembling document"
    );

    let mut doc = String::from(INSTRUCTION_HEADER);

    push_section(&mut doc, "Source", ctx.source_url);

    if let Some(synopsis) = synopsis {
        push_section(&mut doc, "Synopsis", &synopsis);
    }

    if !warnings.is_empty() {
        let body: Vec<String> = warnings.iter().map(|w| format!("- {w}")).collect();
        push_section(&mut doc, "Warnings", &body.join("\n"));
    }

    if let Some(workflow) = workflow {
        push_section(&mut doc, "Typical workflow", workflow);
    }

    doc.push_str("\n\n");
    doc.push_str(enriched.trim_end());

    if let Some(agent_data) = agent_data {
        push_section(
            &mut doc,
            "Agent data",
            &format!("```json\n{agent_data}\n```"),
        );
    }

    if !pages.is_empty() {
        let body: Vec<String> = pages
            .iter()
            .map(|name| match ctx.index.and_then(|i| i.module(name)) {
                Some(module) => format!("- [{name}]({})", module.url),
                None => format!("- {name}"),
            })
            .collect();
        push_section(&mut doc, "Related pages", &body.join("\n"));
    }

    if let Some(index) = ctx.index {
        if !index.guides.is_empty() {
            let body: Vec<String> = index
                .guides
                .iter()
                .map(|g| format!("- [{}]({})", g.title, g.url))
                .collect();
            push_section(&mut doc, "Guides", &body.join("\n"));
        }
    }

    if !links.is_empty() {
        let body: Vec<String> = links.iter().map(|l| format!("- {l}")).collect();
        push_section(&mut doc, "Related links", &body.join("\n"));
    }

    doc.push('\n');
    doc
}

/// Append a `##` section with its body.
fn push_section(doc: &mut String, title: &str, body: &str) {
    doc.push_str("\n\n## ");
    doc.push_str(title);
    doc.push_str("\n\n");
    doc.push_str(body.trim_end());
}

// ---------------------------------------------------------------------------
// Body enrichment
// ---------------------------------------------------------------------------

/// Insert section headings and per-function spec/option blocks into the body.
fn enrich_body(body: &str, ann: &CodeAnnotations) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    let mut types_inserted = false;
    let mut callbacks_inserted = false;
    let mut exceptions_inserted = false;

    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push((*line).to_string());
            continue;
        }
        if in_fence {
            out.push((*line).to_string());
            continue;
        }

        let Some(caps) = HEADING_RE.captures(line) else {
            out.push((*line).to_string());
            continue;
        };

        let text = caps[2].trim();
        let key = heading_key(text);

        // Group heading, inserted once per category before its first member.
        if !types_inserted && ann.types.iter().any(|t| *t == key) {
            out.push("## Types".to_string());
            out.push(String::new());
            types_inserted = true;
        } else if !callbacks_inserted && ann.callbacks.iter().any(|c| *c == key) {
            out.push("## Callbacks".to_string());
            out.push(String::new());
            callbacks_inserted = true;
        } else if !exceptions_inserted && EXCEPTION_RE.is_match(&key) {
            out.push("## Exceptions".to_string());
            out.push(String::new());
            exceptions_inserted = true;
        }

        out.push((*line).to_string());

        // Function block, inserted after the heading.
        if let Some(spec) = ann.spec(&key) {
            out.push(String::new());
            out.push(format!("Spec: `{}`", spec.signature));

            if let Some(fields) = spec
                .options_type
                .as_deref()
                .and_then(|t| ann.options_for(t))
                .filter(|f| !f.is_empty())
            {
                out.push(String::new());
                out.extend(option_table(fields));
            }

            if let Some(summary) = following_summary(&lines, i + 1) {
                out.push(String::new());
                out.push(format!("Summary: {summary}"));
            }
        }
    }

    out.join("\n")
}

/// Reduce a heading to its lookup key: first token, arity and parens stripped.
fn heading_key(text: &str) -> String {
    let token = text.split_whitespace().next().unwrap_or_default();
    let token = token.trim_end_matches("()");
    ARITY_RE.replace(token, "").into_owned()
}

/// Render an options table, required entries first.
fn option_table(fields: &[OptionEntry]) -> Vec<String> {
    let mut rows = vec![
        "| Option | Required | Type |".to_string(),
        "| --- | --- | --- |".to_string(),
    ];
    let (required, optional): (Vec<&OptionEntry>, Vec<&OptionEntry>) =
        fields.iter().partition(|f| f.required);
    for field in required.iter().chain(optional.iter()) {
        let flag = if field.required { "yes" } else { "no" };
        rows.push(format!(
            "| `:{}` | {flag} | `{}` |",
            field.key, field.type_text
        ));
    }
    rows
}

/// First prose line after a heading: non-blank, outside fences, stopping at
/// the next heading.
fn following_summary(lines: &[&str], start: usize) -> Option<String> {
    let mut in_fence = false;

    for line in &lines[start.min(lines.len())..] {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if HEADING_RE.is_match(trimmed) {
            return None;
        }
        return Some(trimmed.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    None
}

// ---------------------------------------------------------------------------
// Derived sections
// ---------------------------------------------------------------------------

/// The page's own module name, from its first level-one heading.
fn module_name_of(body: &str) -> Option<String> {
    let first_h1 = body.lines().find_map(|line| {
        line.strip_prefix("# ").map(str::trim)
    })?;
    let token = first_h1.split_whitespace().next()?;
    let looks_like_module = token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    looks_like_module.then(|| token.to_string())
}

/// Dotted module identifiers referenced on the page, excluding the page's
/// own module and (when an index is available) anything not in the catalog.
fn related_pages(body: &str, own: Option<&str>, index: Option<&PackageIndex>) -> Vec<String> {
    let mut pages: Vec<String> = Vec::new();

    for m in MODULE_REF_RE.find_iter(body) {
        let name = m.as_str();
        if Some(name) == own {
            continue;
        }
        if let Some(index) = index {
            if index.module(name).is_none() {
                continue;
            }
        }
        if !pages.iter().any(|p| p == name) {
            pages.push(name.to_string());
        }
    }

    pages
}

/// Absolute Markdown link targets on the page, deduplicated, with
/// self-referential targets excluded.
fn related_links(body: &str, excluded: &[&str]) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for caps in LINK_RE.captures_iter(body) {
        let full = caps.get(0).expect("match");
        if full.start() > 0 && body.as_bytes()[full.start() - 1] == b'!' {
            continue;
        }
        let target = caps[2].trim();
        if !target.starts_with("http://") && !target.starts_with("https://") {
            continue;
        }
        if excluded.contains(&target) {
            continue;
        }
        if !links.iter().any(|l| l == target) {
            links.push(target.to_string());
        }
    }

    links
}

/// First lines flagged as note/warning/caution callouts, capped.
fn collect_warnings(body: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut in_fence = false;

    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if WARNING_RE.is_match(line.trim()) {
            let cleaned = line
                .trim()
                .trim_start_matches('>')
                .trim_start_matches('#')
                .trim()
                .to_string();
            warnings.push(cleaned);
            if warnings.len() == MAX_WARNINGS {
                break;
            }
        }
    }

    warnings
}

/// Build the synopsis block: purpose sentence, entrypoints, matching
/// task-map titles, see-also links.
fn build_synopsis(
    ctx: &AssembleContext<'_>,
    own_module: Option<&str>,
    links: &[String],
) -> Option<String> {
    let purpose = purpose_sentence(ctx.body);

    let functions: Vec<String> = ctx
        .annotations
        .specs
        .iter()
        .take(MAX_SYNOPSIS_FUNCTIONS)
        .map(|s| format!("`{}`", s.name))
        .collect();

    let tasks: Vec<String> = ctx
        .index
        .map(|index| {
            index
                .task_map
                .iter()
                .filter(|entry| {
                    entry.entrypoints.iter().any(|e| {
                        e.url == ctx.page_url || own_module.is_some_and(|m| e.label == m)
                    })
                })
                .take(MAX_SYNOPSIS_TASKS)
                .map(|entry| entry.title.clone())
                .collect()
        })
        .unwrap_or_default();

    if purpose.is_none() && functions.is_empty() {
        return None;
    }

    let mut out = Vec::new();
    if let Some(purpose) = purpose {
        out.push(purpose);
    }
    if !functions.is_empty() {
        out.push(format!("Key functions: {}", functions.join(", ")));
    }
    if !tasks.is_empty() {
        out.push(format!("Common tasks: {}", tasks.join("; ")));
    }
    if !links.is_empty() {
        let see_also: Vec<&str> = links
            .iter()
            .take(MAX_SYNOPSIS_LINKS)
            .map(String::as_str)
            .collect();
        out.push(format!("See also: {}", see_also.join(", ")));
    }

    Some(out.join("\n\n"))
}

/// First sentence of the page's first prose paragraph.
fn purpose_sentence(body: &str) -> Option<String> {
    let mut in_fence = false;

    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty()
            || HEADING_RE.is_match(trimmed)
            || trimmed.starts_with('>')
            || WARNING_RE.is_match(trimmed)
        {
            continue;
        }
        let sentence = match trimmed.find(". ") {
            Some(pos) => &trimmed[..=pos],
            None => trimmed,
        };
        return Some(sentence.trim().to_string());
    }

    None
}

/// Fixed workflow hints, keyed on content vocabulary. First match wins.
fn workflow_hint(body: &str) -> Option<&'static str> {
    let lower = body.to_lowercase();

    if lower.contains("migration") && lower.contains("migrate") {
        return Some(
            "1. Generate a migration file for the change.\n\
             2. Apply pending migrations with the migrate task.\n\
             3. Verify the result, rolling back with the rollback task if needed.",
        );
    }
    if lower.contains("config") && (lower.contains("start_link") || lower.contains("supervision"))
    {
        return Some(
            "1. Add the configuration for your environment.\n\
             2. Start the process tree, usually under your application supervisor.\n\
             3. Confirm connectivity before issuing queries.",
        );
    }

    None
}

/// Machine-readable block enumerating every `*_opts` type's fields.
fn agent_data_json(ann: &CodeAnnotations) -> Option<String> {
    let mut option_types = serde_json::Map::new();

    for (name, fields) in &ann.option_types {
        if !name.ends_with("_opts") {
            continue;
        }
        let split = |required: bool| -> Vec<serde_json::Value> {
            fields
                .iter()
                .filter(|f| f.required == required)
                .map(|f| {
                    serde_json::json!({
                        "key": f.key,
                        "type": f.type_text,
                    })
                })
                .collect()
        };
        option_types.insert(
            name.clone(),
            serde_json::json!({
                "required": split(true),
                "optional": split(false),
            }),
        );
    }

    if option_types.is_empty() {
        return None;
    }

    let value = serde_json::json!({ "option_types": option_types });
    serde_json::to_string_pretty(&value).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
