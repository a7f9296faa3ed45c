//! Task-map synthesis: curated common-workflow entries derived from the
//! Package Index.
//!
//! A fixed, ordered rule table is evaluated against the catalog. Each rule
//! probes for specific guide ids, task-title suffixes, and module-name
//! suffixes; whatever resolves becomes the entry's entrypoints. A rule whose
//! probes all miss is dropped — an entry is never emitted with an empty
//! entrypoint list. Rules are independent and their order is deterministic.

use docrelay_shared::{PackageIndex, TaskMapEntry, TaskMapLink};

/// One way a rule references the catalog.
#[derive(Debug, Clone, Copy)]
enum Probe {
    /// Exact guide id.
    Guide(&'static str),
    /// Task whose title ends with this suffix (e.g. `.migrate`).
    TaskSuffix(&'static str),
    /// Module named exactly this, or ending with `.<suffix>`.
    ModuleSuffix(&'static str),
}

/// One task-map rule.
struct Rule {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    probes: &'static [Probe],
}

/// The rule table. Order here is emission order.
const RULES: &[Rule] = &[
    Rule {
        id: "getting-started",
        title: "Get started",
        description: "Install the package and walk through first-time setup.",
        probes: &[Probe::Guide("getting-started"), Probe::Guide("readme")],
    },
    Rule {
        id: "define-schema",
        title: "Define a schema",
        description: "Map source data to typed structs.",
        probes: &[Probe::ModuleSuffix("Schema"), Probe::Guide("schemas")],
    },
    Rule {
        id: "run-migrations",
        title: "Run migrations",
        description: "Apply or roll back schema migrations.",
        probes: &[
            Probe::ModuleSuffix("Migrator"),
            Probe::TaskSuffix(".migrate"),
            Probe::TaskSuffix(".rollback"),
            Probe::Guide("migrations"),
        ],
    },
    Rule {
        id: "query-data",
        title: "Query data",
        description: "Compose queries and run them through the repository.",
        probes: &[Probe::ModuleSuffix("Query"), Probe::ModuleSuffix("Repo")],
    },
    Rule {
        id: "write-tests",
        title: "Write tests",
        description: "Set up the sandbox and test against the package.",
        probes: &[Probe::ModuleSuffix("Sandbox"), Probe::Guide("testing")],
    },
];

/// Evaluate the rule table against one Package Index.
pub fn synthesize(index: &PackageIndex) -> Vec<TaskMapEntry> {
    RULES
        .iter()
        .filter_map(|rule| {
            let mut entrypoints: Vec<TaskMapLink> = Vec::new();
            for probe in rule.probes {
                for link in resolve(probe, index) {
                    if !entrypoints.iter().any(|e| e.url == link.url) {
                        entrypoints.push(link);
                    }
                }
            }

            if entrypoints.is_empty() {
                return None;
            }
            Some(TaskMapEntry {
                id: rule.id.to_string(),
                title: rule.title.to_string(),
                description: rule.description.to_string(),
                entrypoints,
            })
        })
        .collect()
}

/// Resolve one probe to zero or more entrypoints, by exact-name lookup of
/// whatever the probe matched.
fn resolve(probe: &Probe, index: &PackageIndex) -> Vec<TaskMapLink> {
    match probe {
        Probe::Guide(id) => index
            .guide(id)
            .map(|g| TaskMapLink {
                label: g.title.clone(),
                url: g.url.clone(),
            })
            .into_iter()
            .collect(),
        Probe::TaskSuffix(suffix) => index
            .tasks
            .iter()
            .filter(|t| t.title.ends_with(suffix))
            .map(|t| TaskMapLink {
                label: t.title.clone(),
                url: t.url.clone(),
            })
            .collect(),
        Probe::ModuleSuffix(suffix) => index
            .modules
            .iter()
            .filter(|m| {
                m.name == *suffix || m.name.ends_with(&format!(".{suffix}"))
            })
            .map(|m| TaskMapLink {
                label: m.name.clone(),
                url: m.url.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docrelay_shared::{GuideEntry, ModuleEntry, TaskEntry};

    fn module(name: &str) -> ModuleEntry {
        ModuleEntry {
            name: name.into(),
            summary: None,
            url: format!("https://w/relay/{name}.html"),
            markdown_url: format!("https://w/relay/{name}.md"),
            deprecated: false,
            group: None,
        }
    }

    fn guide(id: &str, title: &str) -> GuideEntry {
        GuideEntry {
            id: id.into(),
            title: title.into(),
            group: None,
            url: format!("https://w/relay/{id}.html"),
            headers: vec![],
        }
    }

    fn task(id: &str, title: &str) -> TaskEntry {
        TaskEntry {
            id: id.into(),
            title: title.into(),
            group: None,
            url: format!("https://w/relay/{id}.html"),
        }
    }

    fn index(
        modules: Vec<ModuleEntry>,
        guides: Vec<GuideEntry>,
        tasks: Vec<TaskEntry>,
    ) -> PackageIndex {
        PackageIndex {
            package: "relay".into(),
            version: None,
            versioned: false,
            base_path: "relay".into(),
            origin: "https://w".into(),
            last_modified: None,
            sources: vec![],
            modules,
            guides,
            tasks,
            task_map: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn getting_started_fires_on_guide() {
        let idx = index(vec![], vec![guide("getting-started", "Getting Started")], vec![]);
        let map = synthesize(&idx);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].id, "getting-started");
        assert_eq!(map[0].entrypoints[0].label, "Getting Started");
    }

    #[test]
    fn readme_also_satisfies_getting_started() {
        let idx = index(vec![], vec![guide("readme", "README")], vec![]);
        let map = synthesize(&idx);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].id, "getting-started");
    }

    #[test]
    fn migration_rule_gathers_modules_and_tasks() {
        let idx = index(
            vec![module("Relay.Migrator")],
            vec![],
            vec![
                task("Mix.Tasks.Relay.Migrate", "mix relay.migrate"),
                task("Mix.Tasks.Relay.Rollback", "mix relay.rollback"),
            ],
        );
        let map = synthesize(&idx);
        let migrations = map.iter().find(|e| e.id == "run-migrations").expect("fires");
        assert_eq!(migrations.entrypoints.len(), 3);
        assert_eq!(migrations.entrypoints[0].label, "Relay.Migrator");
    }

    #[test]
    fn unresolved_rule_is_dropped() {
        let idx = index(vec![module("Relay.Http.Client")], vec![], vec![]);
        let map = synthesize(&idx);
        assert!(map.iter().all(|e| e.id != "run-migrations"));
        assert!(map.iter().all(|e| e.id != "getting-started"));
        assert!(map.iter().all(|e| !e.entrypoints.is_empty()));
    }

    #[test]
    fn entrypoints_deduplicated_by_url() {
        // Repo matches the query-data rule through one probe only, but a
        // guide listed twice in the rule's probes must not double up.
        let idx = index(
            vec![module("Relay.Repo"), module("Relay.Query")],
            vec![],
            vec![],
        );
        let map = synthesize(&idx);
        let query = map.iter().find(|e| e.id == "query-data").expect("fires");
        let mut urls: Vec<&str> = query.entrypoints.iter().map(|e| e.url.as_str()).collect();
        urls.sort_unstable();
        urls.dedup();
        assert_eq!(urls.len(), query.entrypoints.len());
    }

    #[test]
    fn rule_order_is_stable() {
        let idx = index(
            vec![module("Relay.Repo"), module("Relay.Schema")],
            vec![guide("getting-started", "Getting Started")],
            vec![],
        );
        let map = synthesize(&idx);
        let ids: Vec<&str> = map.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["getting-started", "define-schema", "query-data"]);
    }
}
