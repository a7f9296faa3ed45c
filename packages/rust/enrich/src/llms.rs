//! llms-index rendering: a Package Index as an `llms.txt`-shaped document.
//!
//! Output follows the llms.txt conventions (<https://llmstxt.org/>): an H1
//! title, a blockquote summary, `##` sections, and `- [Name](url): notes`
//! link lists. Empty sections are omitted.

use docrelay_shared::PackageIndex;

/// Render the llms-index replacement document for one package.
pub fn render_llms_index(index: &PackageIndex) -> String {
    let mut doc = format!("# {}\n\n", index.package);

    let version = index
        .version
        .as_deref()
        .map(|v| format!(" v{v}"))
        .unwrap_or_default();
    doc.push_str(&format!(
        "> Agent-ready mirror of the {}{version} documentation. Every page below is served \
         from {} as normalized Markdown.\n",
        index.package, index.origin
    ));

    if !index.modules.is_empty() {
        doc.push_str("\n## Modules\n\n");
        for module in &index.modules {
            doc.push_str(&format!("- [{}]({})", module.name, module.url));
            let mut notes: Vec<String> = Vec::new();
            if let Some(summary) = &module.summary {
                notes.push(summary.clone());
            }
            if module.deprecated {
                notes.push("(deprecated)".to_string());
            }
            if !notes.is_empty() {
                doc.push_str(": ");
                doc.push_str(&notes.join(" "));
            }
            doc.push('\n');
        }
    }

    if !index.guides.is_empty() {
        doc.push_str("\n## Guides\n\n");
        for guide in &index.guides {
            doc.push_str(&format!("- [{}]({})\n", guide.title, guide.url));
        }
    }

    if !index.tasks.is_empty() {
        doc.push_str("\n## Tasks\n\n");
        for task in &index.tasks {
            doc.push_str(&format!("- [{}]({})\n", task.title, task.url));
        }
    }

    if !index.task_map.is_empty() {
        doc.push_str("\n## Common tasks\n\n");
        for entry in &index.task_map {
            let first = &entry.entrypoints[0];
            doc.push_str(&format!(
                "- [{}]({}): {}\n",
                entry.title, first.url, entry.description
            ));
        }
    }

    doc
}
