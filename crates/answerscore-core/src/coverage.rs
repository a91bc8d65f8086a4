//! Concept and author coverage.
//!
//! Detection sits behind the [`TextMatcher`] trait. The default
//! [`InflectionMatcher`] compiles one case-insensitive regex per concept and
//! per author up front; the inflection endings come from configuration.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::model::{AuthorScoring, ConceptHit, CoverageResult, ReferenceTables};

/// Finds domain concepts and cited authors in a text.
pub trait TextMatcher: Send + Sync {
    /// One entry per known concept.
    fn find_concepts(&self, text: &str) -> BTreeMap<String, ConceptHit>;

    /// One entry per known author.
    fn find_authors(&self, text: &str) -> BTreeMap<String, bool>;

    fn coverage(&self, text: &str) -> CoverageResult {
        CoverageResult {
            concepts: self.find_concepts(text),
            authors: self.find_authors(text),
        }
    }
}

/// Regex matcher that expands verb stems with inflection endings.
#[derive(Debug, Clone)]
pub struct InflectionMatcher {
    concepts: Vec<(String, Option<Regex>)>,
    authors: Vec<(String, Option<Regex>)>,
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid match pattern: {pattern}"))
}

/// Pattern for one concept: any stem+ending prefix of a word, or the concept
/// term itself with an optional elided article.
fn concept_pattern(concept: &str, stems: &[String], suffixes: &[String]) -> Option<String> {
    let forms: Vec<String> = stems
        .iter()
        .filter(|stem| !stem.is_empty())
        .flat_map(|stem| {
            suffixes
                .iter()
                .map(move |ending| regex::escape(&format!("{stem}{ending}")))
        })
        .collect();

    let mut branches = Vec::new();
    if !forms.is_empty() {
        branches.push(format!(r"\b(?:{})\w*\b", forms.join("|")));
    }
    if !concept.is_empty() {
        branches.push(format!(r"\b(?:l')?{}\b", regex::escape(concept)));
    }
    (!branches.is_empty()).then(|| branches.join("|"))
}

fn author_pattern(variants: &[String]) -> Option<String> {
    let variants: Vec<String> = variants
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| regex::escape(v))
        .collect();
    (!variants.is_empty()).then(|| format!(r"\b(?:{})\b", variants.join("|")))
}

impl InflectionMatcher {
    /// Compile patterns for every concept and author in `tables`.
    pub fn new(tables: &ReferenceTables, suffixes: &[String]) -> Result<Self> {
        let concepts = tables
            .concepts
            .iter()
            .map(|(concept, stems)| {
                let regex = concept_pattern(concept, stems, suffixes)
                    .map(|p| case_insensitive(&p))
                    .transpose()
                    .with_context(|| format!("concept '{concept}'"))?;
                Ok((concept.clone(), regex))
            })
            .collect::<Result<Vec<_>>>()?;

        let authors = tables
            .authors
            .iter()
            .map(|(author, variants)| {
                let regex = author_pattern(variants)
                    .map(|p| case_insensitive(&p))
                    .transpose()
                    .with_context(|| format!("author '{author}'"))?;
                Ok((author.clone(), regex))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            concepts = concepts.len(),
            authors = authors.len(),
            "compiled coverage patterns"
        );
        Ok(Self { concepts, authors })
    }
}

impl TextMatcher for InflectionMatcher {
    fn find_concepts(&self, text: &str) -> BTreeMap<String, ConceptHit> {
        self.concepts
            .iter()
            .map(|(concept, regex)| {
                let matches: Vec<String> = regex
                    .iter()
                    .flat_map(|r| r.find_iter(text))
                    .map(|m| m.as_str().to_string())
                    .collect();
                let hit = ConceptHit {
                    found: !matches.is_empty(),
                    matches,
                };
                (concept.clone(), hit)
            })
            .collect()
    }

    fn find_authors(&self, text: &str) -> BTreeMap<String, bool> {
        self.authors
            .iter()
            .map(|(author, regex)| {
                let found = regex.as_ref().is_some_and(|r| r.is_match(text));
                (author.clone(), found)
            })
            .collect()
    }
}

/// Share of the reference's concepts that the student also uses.
/// 1.0 when the reference uses none.
pub fn concept_score(reference: &CoverageResult, student: &CoverageResult) -> f64 {
    let required: Vec<&str> = reference.found_concepts().collect();
    if required.is_empty() {
        return 1.0;
    }
    let matched = required
        .iter()
        .filter(|concept| student.concept_found(concept))
        .count();
    matched as f64 / required.len() as f64
}

/// Author criterion, capped at 1.0. 1.0 when the reference cites nobody.
///
/// With [`AuthorScoring::AnyStudentAuthor`] the numerator counts every author
/// the student cites, including ones the reference does not.
pub fn author_score(
    reference: &CoverageResult,
    student: &CoverageResult,
    mode: AuthorScoring,
) -> f64 {
    let required = reference.found_authors().count();
    if required == 0 {
        return 1.0;
    }
    let cited = match mode {
        AuthorScoring::AnyStudentAuthor => student.found_authors().count(),
        AuthorScoring::OverlapOnly => reference
            .found_authors()
            .filter(|author| student.author_found(author))
            .count(),
    };
    (cited as f64 / required as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FRENCH_SUFFIXES;

    fn suffixes() -> Vec<String> {
        FRENCH_SUFFIXES.iter().map(|s| s.to_string()).collect()
    }

    fn tables() -> ReferenceTables {
        let mut tables = ReferenceTables::default();
        tables.concepts.insert(
            "planification".into(),
            vec!["planifi".into(), "prévoi".into()],
        );
        tables
            .concepts
            .insert("organisation".into(), vec!["organis".into()]);
        tables.concepts.insert("contrôle".into(), vec![]);
        tables.authors.insert(
            "Fayol".into(),
            vec!["Fayol".into(), "Henri Fayol".into()],
        );
        tables
            .authors
            .insert("Mintzberg".into(), vec!["Mintzberg".into()]);
        tables.authors.insert("Taylor".into(), vec!["Taylor".into()]);
        tables
    }

    fn matcher() -> InflectionMatcher {
        InflectionMatcher::new(&tables(), &suffixes()).unwrap()
    }

    #[test]
    fn finds_inflected_verbs_and_records_matches() {
        let concepts = matcher().find_concepts("Nous planifions puis ils Organisent tout.");
        assert!(concepts["planification"].found);
        assert_eq!(concepts["planification"].matches, vec!["planifions"]);
        assert!(concepts["organisation"].found);
        assert_eq!(concepts["organisation"].matches, vec!["Organisent"]);
        assert!(!concepts["contrôle"].found);
    }

    #[test]
    fn finds_literal_concept_with_elided_article() {
        let concepts = matcher().find_concepts("Le rôle de l'organisation et du contrôle.");
        assert!(concepts["organisation"].found);
        assert!(concepts["contrôle"].found);
        assert_eq!(concepts["contrôle"].matches, vec!["contrôle"]);
    }

    #[test]
    fn stems_match_only_at_word_start() {
        let concepts = matcher().find_concepts("La replanification est coûteuse.");
        assert!(!concepts["planification"].found);
    }

    #[test]
    fn empty_stem_list_matches_only_the_term() {
        let concepts = matcher().find_concepts("Un texte quelconque sans le mot.");
        assert!(!concepts["contrôle"].found);
    }

    #[test]
    fn stems_are_escaped() {
        let mut tables = ReferenceTables::default();
        tables
            .concepts
            .insert("coût".into(), vec!["c.t".into()]);
        let matcher = InflectionMatcher::new(&tables, &suffixes()).unwrap();
        assert!(!matcher.find_concepts("cat")["coût"].found);
        assert!(matcher.find_concepts("c.tons")["coût"].found);
    }

    #[test]
    fn custom_suffixes_are_used() {
        let mut tables = ReferenceTables::default();
        tables.concepts.insert("planning".into(), vec!["plan".into()]);
        let english = vec!["".to_string(), "s".to_string(), "ned".to_string()];
        let matcher = InflectionMatcher::new(&tables, &english).unwrap();
        let concepts = matcher.find_concepts("They planned ahead.");
        assert!(concepts["planning"].found);
    }

    #[test]
    fn finds_authors_case_insensitively() {
        let authors = matcher().find_authors("Selon HENRI FAYOL, et d'après mintzberg.");
        assert!(authors["Fayol"]);
        assert!(authors["Mintzberg"]);
        assert!(!authors["Taylor"]);
    }

    #[test]
    fn author_variants_respect_word_boundaries() {
        let authors = matcher().find_authors("Les Taylorists ont tort.");
        assert!(!authors["Taylor"]);
    }

    #[test]
    fn empty_tables_match_nothing() {
        let matcher = InflectionMatcher::new(&ReferenceTables::default(), &suffixes()).unwrap();
        let coverage = matcher.coverage("Fayol planifie.");
        assert!(coverage.concepts.is_empty());
        assert!(coverage.authors.is_empty());
    }

    #[test]
    fn concept_score_counts_overlap() {
        let m = matcher();
        let reference = m.coverage("Il faut planifier, organiser et assurer le contrôle.");
        let student = m.coverage("On planifie et on organise.");
        let score = concept_score(&reference, &student);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn scores_are_full_when_reference_requires_nothing() {
        let m = matcher();
        let reference = m.coverage("Rien de particulier ici.");
        for student_text in ["", "Fayol planifie.", "autre chose"] {
            let student = m.coverage(student_text);
            assert_eq!(concept_score(&reference, &student), 1.0);
            for mode in [AuthorScoring::AnyStudentAuthor, AuthorScoring::OverlapOnly] {
                assert_eq!(author_score(&reference, &student, mode), 1.0);
            }
        }
    }

    #[test]
    fn author_score_counts_any_student_author_by_default() {
        let m = matcher();
        let reference = m.coverage("Fayol et Mintzberg.");
        // Taylor is not cited by the reference but still counts.
        let student = m.coverage("Fayol et Taylor.");
        assert_eq!(
            author_score(&reference, &student, AuthorScoring::AnyStudentAuthor),
            1.0
        );
        assert_eq!(
            author_score(&reference, &student, AuthorScoring::OverlapOnly),
            0.5
        );
    }

    #[test]
    fn author_score_is_capped() {
        let m = matcher();
        let reference = m.coverage("Fayol.");
        let student = m.coverage("Fayol, Taylor, Mintzberg.");
        assert_eq!(
            author_score(&reference, &student, AuthorScoring::AnyStudentAuthor),
            1.0
        );
    }
}
