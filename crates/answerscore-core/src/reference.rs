//! Concept and author dictionary loading.
//!
//! Both tables are JSON objects mapping a name to an array of strings:
//! verb stems for concepts, spelling variants for authors. A table that
//! cannot be loaded degrades to empty, which the coverage scorer treats as
//! "nothing required".

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::ReferenceTables;

/// Parse one table from a JSON string.
pub fn parse_table_str(content: &str) -> Result<BTreeMap<String, Vec<String>>> {
    serde_json::from_str(content).context("expected a JSON object of string arrays")
}

/// Parse one table from a JSON file.
pub fn parse_table(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read reference table: {}", path.display()))?;
    parse_table_str(&content)
        .with_context(|| format!("failed to parse reference table: {}", path.display()))
}

/// Tables plus a note for every table that fell back to empty.
#[derive(Debug, Clone, Default)]
pub struct LoadedTables {
    pub tables: ReferenceTables,
    pub warnings: Vec<String>,
}

fn load_or_empty(kind: &str, path: &Path, warnings: &mut Vec<String>) -> BTreeMap<String, Vec<String>> {
    if !path.exists() {
        let message = format!("{kind} table not found at {}, scoring without it", path.display());
        tracing::warn!("{message}");
        warnings.push(message);
        return BTreeMap::new();
    }
    match parse_table(path) {
        Ok(table) => {
            tracing::debug!("loaded {} {kind} from {}", table.len(), path.display());
            table
        }
        Err(e) => {
            let message = format!("{kind} table unusable ({e:#}), scoring without it");
            tracing::warn!("{message}");
            warnings.push(message);
            BTreeMap::new()
        }
    }
}

/// Load the concept and author tables. Never fails.
pub fn load_reference_tables(concepts_path: &Path, authors_path: &Path) -> LoadedTables {
    let mut warnings = Vec::new();
    let concepts = load_or_empty("concept", concepts_path, &mut warnings);
    let authors = load_or_empty("author", authors_path, &mut warnings);
    LoadedTables {
        tables: ReferenceTables { concepts, authors },
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONCEPTS: &str = r#"{
        "planification": ["planifi", "prévoi"],
        "contrôle": ["contrôl", "vérifi"]
    }"#;

    const AUTHORS: &str = r#"{
        "Fayol": ["Fayol", "Henri Fayol", "H. Fayol"],
        "Mintzberg": ["Mintzberg", "Henry Mintzberg"]
    }"#;

    #[test]
    fn parses_valid_tables() {
        let concepts = parse_table_str(CONCEPTS).unwrap();
        assert_eq!(concepts.len(), 2);
        assert_eq!(concepts["planification"], vec!["planifi", "prévoi"]);
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(parse_table_str(r#"{"Fayol": "Fayol"}"#).is_err());
        assert!(parse_table_str("[1, 2]").is_err());
    }

    #[test]
    fn loads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let concepts = dir.path().join("management_concepts.json");
        let authors = dir.path().join("management_authors.json");
        std::fs::write(&concepts, CONCEPTS).unwrap();
        std::fs::write(&authors, AUTHORS).unwrap();

        let loaded = load_reference_tables(&concepts, &authors);
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.tables.concepts.len(), 2);
        assert_eq!(loaded.tables.authors["Fayol"].len(), 3);
    }

    #[test]
    fn missing_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let authors = dir.path().join("authors.json");
        std::fs::write(&authors, AUTHORS).unwrap();

        let loaded = load_reference_tables(&dir.path().join("missing.json"), &authors);
        assert!(loaded.tables.concepts.is_empty());
        assert_eq!(loaded.tables.authors.len(), 2);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("concept table not found"));
    }

    #[test]
    fn malformed_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let concepts = dir.path().join("concepts.json");
        std::fs::write(&concepts, "{ not json").unwrap();

        let loaded = load_reference_tables(&concepts, &dir.path().join("none.json"));
        assert!(loaded.tables.concepts.is_empty());
        assert!(loaded.tables.authors.is_empty());
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings[0].contains("concept table unusable"));
    }
}
