//! Module-summary extraction from the upstream API-reference page.
//!
//! The API-reference page groups its listings into sections, each headed by
//! an `<h2>` ("Modules", "Mix Tasks", "Exceptions") and filled with summary
//! rows. Only the Modules section is consumed here; it is the one source
//! that carries human-written synopses.

use scraper::{ElementRef, Html, Selector};

/// One row of the Modules summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    /// Module name, as linked.
    pub name: String,
    /// Href of the module page, as written (usually `Name.html`).
    pub href: String,
    /// Synopsis text, when the row carries one.
    pub summary: Option<String>,
}

/// Extract the per-row name, link, and summary of the "Modules" section.
///
/// Returns an empty list when the page has no such section, which callers
/// treat as "fall back to the sidebar listing".
pub fn parse_module_summaries(html: &str) -> Vec<ModuleSummary> {
    let doc = Html::parse_document(html);

    let section_sel = Selector::parse("section").expect("section selector");
    let h2_sel = Selector::parse("h2").expect("h2 selector");

    for section in doc.select(&section_sel) {
        let is_modules = section
            .select(&h2_sel)
            .any(|h| h.text().collect::<String>().trim() == "Modules");
        if is_modules {
            return collect_rows(&section);
        }
    }

    Vec::new()
}

/// Collect summary rows within one section element.
fn collect_rows(section: &ElementRef<'_>) -> Vec<ModuleSummary> {
    let row_sel = Selector::parse(".summary-row").expect("row selector");
    let link_sel = Selector::parse(".summary-signature a").expect("link selector");
    let synopsis_sel = Selector::parse(".summary-synopsis").expect("synopsis selector");

    let mut rows = Vec::new();

    for row in section.select(&row_sel) {
        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        let name = link.text().collect::<String>().trim().to_string();
        let href = link.value().attr("href").unwrap_or_default().to_string();
        if name.is_empty() || href.is_empty() {
            continue;
        }

        let summary = row
            .select(&synopsis_sel)
            .next()
            .map(|el| {
                el.text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|text| !text.is_empty());

        rows.push(ModuleSummary {
            name,
            href,
            summary,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body><main>
<section class="details-list">
  <h2 id="modules" class="section-heading">Modules</h2>
  <div class="summary">
    <div class="summary-row">
      <div class="summary-signature"><a href="Relay.html">Relay</a></div>
      <div class="summary-synopsis"><p>Top-level API for the data store.</p></div>
    </div>
    <div class="summary-row">
      <div class="summary-signature"><a href="Relay.Repo.html">Relay.Repo</a></div>
      <div class="summary-synopsis"><p>Defines a
      repository.</p></div>
    </div>
    <div class="summary-row">
      <div class="summary-signature"><a href="Relay.Bare.html">Relay.Bare</a></div>
    </div>
  </div>
</section>
<section class="details-list">
  <h2 id="mix-tasks" class="section-heading">Mix Tasks</h2>
  <div class="summary">
    <div class="summary-row">
      <div class="summary-signature"><a href="Mix.Tasks.Relay.Migrate.html">mix relay.migrate</a></div>
      <div class="summary-synopsis"><p>Runs pending migrations.</p></div>
    </div>
  </div>
</section>
</main></body></html>
"#;

    #[test]
    fn extracts_only_modules_section_rows() {
        let rows = parse_module_summaries(PAGE);
        assert_eq!(rows.len(), 3);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Relay", "Relay.Repo", "Relay.Bare"]);
        assert!(!names.contains(&"mix relay.migrate"));
    }

    #[test]
    fn summaries_are_whitespace_normalized() {
        let rows = parse_module_summaries(PAGE);
        assert_eq!(
            rows[1].summary.as_deref(),
            Some("Defines a repository.")
        );
    }

    #[test]
    fn row_without_synopsis_has_none() {
        let rows = parse_module_summaries(PAGE);
        assert_eq!(rows[2].name, "Relay.Bare");
        assert!(rows[2].summary.is_none());
    }

    #[test]
    fn page_without_modules_section_is_empty() {
        let html = "<html><body><h1>API Reference</h1></body></html>";
        assert!(parse_module_summaries(html).is_empty());
    }
}
