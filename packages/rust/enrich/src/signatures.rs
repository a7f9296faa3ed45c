//! Type, signature, and callback extraction from fenced code blocks.
//!
//! The declarations inside a page's code fences are embedded text, not a
//! formal grammar, so this is a tolerant line scanner: a line either matches
//! one of the known shapes or is skipped. Shapes recognized:
//!
//! - `name() :: %{ ... }` — an option-map type; fields may span lines and
//!   end at the line carrying the closing brace
//! - `name() :: ...` — any other type declaration, collected by name
//! - `name(args)` alone on a line — a function signature
//! - `@callback name(...)` — a callback, collected by name

use std::sync::LazyLock;

use regex::Regex;

use docrelay_shared::{OptionEntry, SpecEntry};

/// Matches a type declaration head, with or without a map body.
static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z_][A-Za-z0-9_]*)\(\)\s*::\s*(.*)$").expect("type decl regex")
});

/// Matches a bare function signature line.
static SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-z_][A-Za-z0-9_!?]*)\(([^)]*)\)\s*$").expect("spec regex")
});

/// Matches a callback declaration.
static CALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*@callback\s+([a-z_][A-Za-z0-9_!?]*)\(").expect("callback regex")
});

/// Matches one option-map field: `optional(:key) => T`, `:key => T`, or `key: T`.
static OPT_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^optional\(:([A-Za-z_][A-Za-z0-9_]*)\)\s*=>\s*(.+)$").expect("field regex")
});
static ATOM_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:([A-Za-z_][A-Za-z0-9_]*)\s*=>\s*(.+)$").expect("field regex")
});
static KW_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z_][A-Za-z0-9_]*):\s+(.+)$").expect("field regex")
});

/// Everything extracted from one page's code fences.
#[derive(Debug, Clone, Default)]
pub struct CodeAnnotations {
    /// Type names, in declaration order.
    pub types: Vec<String>,
    /// Option-map types: owning type name → fields in declaration order.
    pub option_types: Vec<(String, Vec<OptionEntry>)>,
    /// Callback names, in declaration order.
    pub callbacks: Vec<String>,
    /// Function signatures; re-declarations overwrite in place (last wins).
    pub specs: Vec<SpecEntry>,
}

impl CodeAnnotations {
    /// Look up a function's signature by name.
    pub fn spec(&self, name: &str) -> Option<&SpecEntry> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Look up an option-map type's fields by type name.
    pub fn options_for(&self, type_name: &str) -> Option<&[OptionEntry]> {
        self.option_types
            .iter()
            .find(|(name, _)| name == type_name)
            .map(|(_, fields)| fields.as_slice())
    }

    /// Whether the scanner found anything at all.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.option_types.is_empty()
            && self.callbacks.is_empty()
            && self.specs.is_empty()
    }
}

/// Scan a Markdown document's fenced code blocks.
pub fn extract(md: &str) -> CodeAnnotations {
    let mut out = CodeAnnotations::default();
    let mut in_fence = false;

    // Open option-map collection: (type name, accumulated field text).
    let mut open_map: Option<(String, String)> = None;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            open_map = None;
            continue;
        }
        if !in_fence {
            continue;
        }

        if let Some((_, acc)) = open_map.as_mut() {
            if let Some(pos) = line.find('}') {
                acc.push('\n');
                acc.push_str(&line[..pos]);
                let (name, acc) = open_map.take().expect("open map");
                record_option_type(&mut out, name, parse_fields(&acc));
            } else {
                acc.push('\n');
                acc.push_str(line);
            }
            continue;
        }

        if let Some(caps) = TYPE_DECL_RE.captures(line) {
            let name = caps[1].to_string();
            let rest = caps[2].trim().to_string();
            if !out.types.contains(&name) {
                out.types.push(name.clone());
            }
            if let Some(body) = rest.strip_prefix("%{") {
                match body.find('}') {
                    Some(pos) => {
                        let fields = parse_fields(&body[..pos]);
                        record_option_type(&mut out, name, fields);
                    }
                    None => open_map = Some((name, body.to_string())),
                }
            }
            continue;
        }

        if let Some(caps) = CALLBACK_RE.captures(line) {
            let name = caps[1].to_string();
            if !out.callbacks.contains(&name) {
                out.callbacks.push(name);
            }
            continue;
        }

        if let Some(caps) = SPEC_RE.captures(line) {
            let name = caps[1].to_string();
            let signature = line.trim().to_string();
            let options_type = caps[2]
                .split(',')
                .map(str::trim)
                .find(|arg| arg.ends_with("_opts"))
                .map(str::to_string);

            let entry = SpecEntry {
                name: name.clone(),
                signature,
                options_type,
            };
            match out.specs.iter_mut().find(|s| s.name == name) {
                Some(existing) => *existing = entry,
                None => out.specs.push(entry),
            }
        }
    }

    out
}

/// Record an option-map type, overwriting an earlier declaration of the same name.
fn record_option_type(out: &mut CodeAnnotations, name: String, fields: Vec<OptionEntry>) {
    match out.option_types.iter_mut().find(|(n, _)| *n == name) {
        Some((_, existing)) => *existing = fields,
        None => out.option_types.push((name, fields)),
    }
}

/// Parse the comma/newline-separated field list of a map body.
fn parse_fields(body: &str) -> Vec<OptionEntry> {
    let mut fields = Vec::new();

    for segment in body.split(['\n', ',']) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let entry = if let Some(caps) = OPT_FIELD_RE.captures(segment) {
            OptionEntry {
                key: caps[1].to_string(),
                required: false,
                type_text: caps[2].trim().to_string(),
            }
        } else if let Some(caps) = ATOM_FIELD_RE.captures(segment) {
            OptionEntry {
                key: caps[1].to_string(),
                required: true,
                type_text: caps[2].trim().to_string(),
            }
        } else if let Some(caps) = KW_FIELD_RE.captures(segment) {
            OptionEntry {
                key: caps[1].to_string(),
                required: true,
                type_text: caps[2].trim().to_string(),
            }
        } else {
            continue;
        };

        fields.push(entry);
    }

    fields
}
