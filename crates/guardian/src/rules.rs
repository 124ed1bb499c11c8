// Detection rules
//
// PII detectors (GDPR scope) and threat detectors. A rule may carry a
// checksum validator; a regex match failing it is not a finding.

use phoenix_core::{FindingCategory, ThreatLevel};
use regex::{Regex, RegexBuilder};

/// Extra check run on each regex match
pub type MatchValidator = fn(&str) -> bool;

/// A single detection rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub category: FindingCategory,
    pub level: ThreatLevel,
    /// Replacement used when redacting (PII rules only)
    pub mask: Option<&'static str>,
    regex: Regex,
    validator: Option<MatchValidator>,
}

impl Rule {
    fn new(
        id: &'static str,
        category: FindingCategory,
        level: ThreatLevel,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            id,
            category,
            level,
            mask: None,
            regex: RegexBuilder::new(pattern).case_insensitive(true).build()?,
            validator: None,
        })
    }

    fn masked(mut self, mask: &'static str) -> Self {
        self.mask = Some(mask);
        self
    }

    fn validated(mut self, validator: MatchValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn accepts(&self, matched: &str) -> bool {
        self.validator.map_or(true, |validate| validate(matched))
    }

    /// Number of valid matches in `text`
    pub fn count(&self, text: &str) -> usize {
        self.regex
            .find_iter(text)
            .filter(|m| self.accepts(m.as_str()))
            .count()
    }

    /// Replace valid matches with the rule mask
    pub fn redact(&self, text: &str) -> String {
        let Some(mask) = self.mask else {
            return text.to_string();
        };
        self.regex
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let matched = &caps[0];
                if self.accepts(matched) {
                    mask.to_string()
                } else {
                    matched.to_string()
                }
            })
            .into_owned()
    }
}

/// Built-in rule set
pub fn default_rules() -> Result<Vec<Rule>, regex::Error> {
    use FindingCategory::{Pii, Threat};

    Ok(vec![
        // PII
        Rule::new(
            "pii.email",
            Pii,
            ThreatLevel::Low,
            r"\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
        )?
        .masked("[EMAIL]"),
        Rule::new(
            "pii.phone",
            Pii,
            ThreatLevel::Low,
            r"(?:\+33[\s.-]?|\b0)[1-9](?:[\s.-]?\d{2}){4}\b|\+\d{1,3}[\s.-]?\d{2,4}(?:[\s.-]?\d{2,4}){2,3}\b",
        )?
        .masked("[PHONE]"),
        Rule::new(
            "pii.payment_card",
            Pii,
            ThreatLevel::High,
            r"\b\d(?:[ -]?\d){12,18}\b",
        )?
        .masked("[CARD]")
        .validated(luhn_valid),
        Rule::new(
            "pii.iban",
            Pii,
            ThreatLevel::High,
            r"\b[a-z]{2}\d{2}(?:\s?[a-z0-9]{4}){2,7}(?:\s?[a-z0-9]{1,3})?\b",
        )?
        .masked("[IBAN]")
        .validated(iban_valid),
        Rule::new(
            "pii.fr_social_security",
            Pii,
            ThreatLevel::High,
            r"\b[12]\s?\d{2}\s?(?:0[1-9]|1[0-2])\s?(?:\d{2}|2[ab])\s?\d{3}\s?\d{3}(?:\s?\d{2})?\b",
        )?
        .masked("[NIR]"),
        // Threats
        Rule::new(
            "threat.prompt_injection",
            Threat,
            ThreatLevel::High,
            r"\b(?:ignore|disregard|forget|oublie[zr]?|ignore[zr]?)\b.{0,40}\b(?:previous|prior|above|all|earlier|pr[ée]c[ée]dentes?|toutes?)\b.{0,40}\b(?:instructions?|rules|prompts?|consignes?|r[èe]gles)\b|\b(?:system prompt|jailbreak|developer mode|you are now dan)\b",
        )?,
        Rule::new(
            "threat.sql_injection",
            Threat,
            ThreatLevel::Critical,
            r"\bunion\s+(?:all\s+)?select\b|\bdrop\s+table\b|;\s*delete\s+from\b|'\s*or\s+'?\d+'?\s*=\s*'?\d+|\bor\s+1\s*=\s*1\b",
        )?,
        Rule::new(
            "threat.script_injection",
            Threat,
            ThreatLevel::High,
            r"<\s*script\b|javascript\s*:|\bon(?:error|load|click|mouseover)\s*=|<\s*iframe\b",
        )?,
        Rule::new(
            "threat.path_traversal",
            Threat,
            ThreatLevel::Medium,
            r"\.\./|\.\.\\|%2e%2e%2f|/etc/passwd",
        )?,
    ])
}

/// Luhn checksum over the digits of `candidate`
pub fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// ISO 13616 mod-97 check
pub fn iban_valid(candidate: &str) -> bool {
    let compact: String = candidate
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if !(15..=34).contains(&compact.len()) || !compact.is_ascii() {
        return false;
    }

    let (head, tail) = compact.split_at(4);
    let mut remainder: u32 = 0;
    for c in tail.chars().chain(head.chars()) {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}
