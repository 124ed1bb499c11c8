// Content classifier
//
// Runs every rule over a set of texts and folds the matches into an
// Assessment: overall threat level, compliance status and findings.

use std::collections::BTreeMap;

use phoenix_core::{ComplianceStatus, Finding, FindingCategory, Payload, ThreatLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::rules::{default_rules, Rule};

/// Result of classifying content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Assessment {
    pub threat_level: ThreatLevel,
    pub compliance: ComplianceStatus,
    pub findings: Vec<Finding>,
}

impl Assessment {
    pub fn rule_ids(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.rule_id.clone()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Rule-based classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Classifier with the built-in rules
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self::with_rules(default_rules()?))
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify a set of texts as one unit
    pub fn assess<'a, I>(&self, texts: I) -> Assessment
    where
        I: IntoIterator<Item = &'a str>,
    {
        let texts: Vec<&str> = texts.into_iter().collect();
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();

        for (idx, rule) in self.rules.iter().enumerate() {
            let count: usize = texts.iter().map(|text| rule.count(text)).sum();
            if count > 0 {
                counts.insert(idx, count);
            }
        }

        let findings: Vec<Finding> = counts
            .into_iter()
            .map(|(idx, match_count)| {
                let rule = &self.rules[idx];
                Finding {
                    rule_id: rule.id.to_string(),
                    category: rule.category,
                    level: rule.level,
                    match_count,
                }
            })
            .collect();

        let threat_level = findings
            .iter()
            .map(|f| f.level)
            .max()
            .unwrap_or(ThreatLevel::None);

        Assessment {
            threat_level,
            compliance: compliance_of(&findings),
            findings,
        }
    }

    pub fn assess_text(&self, text: &str) -> Assessment {
        self.assess([text])
    }

    /// Mask personal data; threat matches are left in place
    pub fn redact(&self, text: &str) -> String {
        self.rules
            .iter()
            .filter(|rule| rule.category == FindingCategory::Pii)
            .fold(text.to_string(), |acc, rule| rule.redact(&acc))
    }
}

/// Sensitive identifiers are a violation, contact details a warning
fn compliance_of(findings: &[Finding]) -> ComplianceStatus {
    findings
        .iter()
        .filter(|f| f.category == FindingCategory::Pii)
        .map(|f| {
            if f.level >= ThreatLevel::High {
                ComplianceStatus::Violation
            } else {
                ComplianceStatus::Warning
            }
        })
        .max()
        .unwrap_or(ComplianceStatus::Compliant)
}

/// All string leaves of a payload, depth first
pub fn string_leaves(payload: &Payload) -> Vec<&str> {
    fn walk<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
        match value {
            Value::String(s) => out.push(s),
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    for value in payload.values() {
        walk(value, &mut out);
    }
    out
}
