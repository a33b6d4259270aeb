//! Pattern rule tables
//!
//! Forbidden-vocabulary and sample-copy rules are `(label, pattern)` rows,
//! compiled once into a [`RuleTable`]. The built-in tables can be replaced
//! from configuration; the scanning logic does not care where rows came from.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Longest snippet kept per line hit.
const SNIPPET_CHARS: usize = 200;

/// One uncompiled rule row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    pub label: String,
    pub pattern: String,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl RuleSource {
    pub fn new(label: &str, pattern: &str, case_insensitive: bool) -> Self {
        Self {
            label: label.to_string(),
            pattern: pattern.to_string(),
            case_insensitive,
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub label: String,
    pub regex: Regex,
}

/// Named, ordered set of compiled rules.
#[derive(Debug, Clone)]
pub struct RuleTable {
    name: String,
    rules: Vec<PatternRule>,
}

/// A rule firing on a piece of rendered text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextHit {
    pub label: String,
    pub pattern: String,
    pub matched: String,
}

/// A rule firing on one line of a scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineHit {
    pub file: String,
    pub line: usize,
    pub label: String,
    pub pattern: String,
    pub snippet: String,
}

impl RuleTable {
    /// Compile `sources`. An empty list is rejected so a misconfigured table
    /// cannot silently pass every scan.
    pub fn compile(name: &str, sources: &[RuleSource]) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::EmptyRuleTable(name.to_string()));
        }

        let rules = sources
            .iter()
            .map(|source| {
                RegexBuilder::new(&source.pattern)
                    .case_insensitive(source.case_insensitive)
                    .build()
                    .map(|regex| PatternRule {
                        label: source.label.clone(),
                        regex,
                    })
                    .map_err(|source_err| Error::Pattern {
                        label: source.label.clone(),
                        source: source_err,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table = name, rules = rules.len(), "Compiled rule table");
        Ok(Self {
            name: name.to_string(),
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every rule matching `text`, first match per rule.
    pub fn matches(&self, text: &str) -> Vec<TextHit> {
        self.rules
            .iter()
            .filter_map(|rule| {
                rule.regex.find(text).map(|m| TextHit {
                    label: rule.label.clone(),
                    pattern: rule.regex.as_str().to_string(),
                    matched: m.as_str().to_string(),
                })
            })
            .collect()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.rules.iter().any(|rule| rule.regex.is_match(text))
    }

    /// Scan file contents line by line; line numbers are 1-based.
    pub fn scan_lines(&self, file: &str, contents: &str) -> Vec<LineHit> {
        let mut hits = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            for rule in &self.rules {
                if rule.regex.is_match(line) {
                    hits.push(LineHit {
                        file: file.to_string(),
                        line: index + 1,
                        label: rule.label.clone(),
                        pattern: rule.regex.as_str().to_string(),
                        snippet: line.trim().chars().take(SNIPPET_CHARS).collect(),
                    });
                }
            }
        }
        hits
    }
}

/// Pipeline vocabulary that must never reach rendered copy.
pub fn internal_term_sources() -> Vec<RuleSource> {
    [
        ("request-spec", r"\brequestspec\b"),
        ("variant-index", r"\bvariantindex\b"),
        ("reference-digest", r"\breferencedigest\b"),
        ("layout", r"\blayout\b"),
        ("validation", r"\bvalidation\b"),
        ("theme-factory", r"\btheme-factory\b"),
        ("webapp-testing", r"\bwebapp-testing\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| RuleSource::new(label, pattern, true))
    .collect()
}

/// Sample-campaign identifiers and phrases that must not be hard-coded in
/// the service sources.
pub fn domain_copy_sources() -> Vec<RuleSource> {
    let identifiers = [
        ("nature-campaign-id", r"NATURE_CAMPAIGN"),
        ("b2b-brochure-id", r"B2B_BROCHURE"),
        ("b2b-service-id", r"B2B_SERVICE"),
    ]
    .into_iter()
    .map(|(label, pattern)| RuleSource::new(label, pattern, true));

    let phrases = [
        ("nature-slogan", r"자연을\s*사랑하자"),
        ("nature-campaign", r"자연\s*캠페인"),
        ("employee-supplement", r"임직원\s*맞춤\s*건기식"),
        ("supplement-repack", r"건기식\s*소분"),
    ]
    .into_iter()
    .map(|(label, pattern)| RuleSource::new(label, pattern, false));

    identifiers.chain(phrases).collect()
}

static INTERNAL_TERMS: Lazy<RuleTable> = Lazy::new(|| {
    RuleTable::compile("internal-terms", &internal_term_sources())
        .expect("built-in internal term patterns compile")
});

static DOMAIN_COPY: Lazy<RuleTable> = Lazy::new(|| {
    RuleTable::compile("domain-copy", &domain_copy_sources())
        .expect("built-in domain copy patterns compile")
});

/// Built-in internal vocabulary table.
pub fn internal_terms() -> &'static RuleTable {
    &INTERNAL_TERMS
}

/// Built-in sample-copy table.
pub fn domain_copy() -> &'static RuleTable {
    &DOMAIN_COPY
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("RequestSpec leaked" => true ; "camel case term")]
    #[test_case("the LAYOUT is final" => true ; "upper case word")]
    #[test_case("theme-factory output" => true ; "hyphenated term")]
    #[test_case("layouts and validations" => false ; "plural forms are other words")]
    #[test_case("브로슈어 소개" => false ; "clean copy")]
    fn test_internal_terms(text: &str) -> bool {
        internal_terms().is_match(text)
    }

    #[test]
    fn test_matches_reports_each_rule() {
        let hits = internal_terms().matches("RequestSpec variantIndex referenceDigest");
        let labels: Vec<&str> = hits.iter().map(|h| h.label.as_str()).collect();
        assert_eq!(labels, vec!["request-spec", "variant-index", "reference-digest"]);
        assert_eq!(hits[0].matched, "RequestSpec");
    }

    #[test]
    fn test_domain_copy_scan_lines() {
        let contents = "const a = 1;\nconst kind = 'nature_campaign';\n// 자연을  사랑하자 캠페인\n";
        let hits = domain_copy().scan_lines("src/app.ts", contents);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].line, 2);
        assert_eq!(hits[0].label, "nature-campaign-id");
        assert_eq!(hits[1].line, 3);
        assert_eq!(hits[1].snippet, "// 자연을  사랑하자 캠페인");
    }

    #[test]
    fn test_korean_phrases_need_spacing_variants_only() {
        assert!(domain_copy().is_match("임직원 맞춤건기식"));
        assert!(domain_copy().is_match("건기식소분"));
        assert!(!domain_copy().is_match("건강기능식품 소분"));
    }

    #[test]
    fn test_compile_rejects_bad_pattern() {
        let err = RuleTable::compile("custom", &[RuleSource::new("broken", "(", false)]).unwrap_err();
        assert!(matches!(err, Error::Pattern { ref label, .. } if label == "broken"));
    }

    #[test]
    fn test_compile_rejects_empty_table() {
        assert!(matches!(
            RuleTable::compile("custom", &[]),
            Err(Error::EmptyRuleTable(_))
        ));
    }

    #[test]
    fn test_rule_source_from_toml_shape() {
        let source: RuleSource =
            serde_json::from_str(r#"{"label": "x", "pattern": "\\bfoo\\b"}"#).unwrap();
        assert!(!source.case_insensitive);
        let table = RuleTable::compile("custom", &[source]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.name(), "custom");
    }
}
