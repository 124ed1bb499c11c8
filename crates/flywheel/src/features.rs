// Feature extraction for interaction events
//
// Rules are deterministic: keyword regexes over the request and response
// text. Explicit payload fields (`tone`, `task`, `language`, `app`,
// `user_tier`) take precedence over what the text suggests.

use std::collections::BTreeMap;

use phoenix_core::{HandlerError, Payload};
use regex::{Regex, RegexBuilder};

/// Word count thresholds for the length bucket
const SHORT_MAX_WORDS: usize = 50;
const MEDIUM_MAX_WORDS: usize = 200;

/// Payload fields copied into the feature set as given
const EXPLICIT_FEATURES: &[(&str, &str)] = &[
    ("tone", "tone"),
    ("task", "kind"),
    ("language", "language"),
    ("app", "app"),
    ("user_tier", "user_tier"),
];

/// Sorted feature name -> value map
pub type FeatureSet = BTreeMap<String, String>;

/// Compiled keyword rules
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    tones: Vec<(&'static str, Regex)>,
    kinds: Vec<(&'static str, Regex)>,
    sectors: Vec<(&'static str, Regex)>,
    french: Regex,
    english: Regex,
    interrogative: Regex,
}

fn keywords(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl FeatureExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tones: vec![
                ("formal", keywords(r"\b(formel(le)?|formal|professionn?el(le)?|respectueu(x|se)|madame|monsieur)\b")?),
                ("creative", keywords(r"\b(cr[ée]ati(f|ve)|original(e)?|audacieu(x|se)|storytelling|unique)\b")?),
                ("enthusiastic", keywords(r"\b(enthousiaste|dynamique|enthusiastic|passionn[ée]e?|energetic)\b")?),
                ("concise", keywords(r"\b(concis(e)?|court(e)?|bref|br[èe]ve|short|brief|succinct)\b")?),
            ],
            kinds: vec![
                ("cover_letter", keywords(r"\b(lettre( de motivation)?|cover letter|letter)\b")?),
                ("cv", keywords(r"\b(cv|curriculum|r[ée]sum[ée])\b")?),
                ("interview", keywords(r"\b(entretien|interview)\b")?),
                ("career_change", keywords(r"\b(reconversion|career change|transition)\b")?),
            ],
            sectors: vec![
                ("tech", keywords(r"\b(d[ée]veloppeur|developer|software|logiciel|informatique|data|devops|cloud)\b")?),
                ("health", keywords(r"\b(sant[ée]|health|infirmi(er|[èe]re)|nurse|m[ée]dical|h[ôo]pital|hospital)\b")?),
                ("finance", keywords(r"\b(banque|bank|finance|comptab\w*|accounting|audit)\b")?),
                ("education", keywords(r"\b(enseignant\w*|teacher|[ée]cole|school|formation|education)\b")?),
                ("commerce", keywords(r"\b(vente|sales|commercial\w*|retail|magasin)\b")?),
            ],
            french: keywords(r"\b(le|la|les|des|et|je|vous|pour|une|avec|mon|est)\b")?,
            english: keywords(r"\b(the|and|you|for|with|my|is|an|of|to)\b")?,
            interrogative: keywords(
                r"^\s*(comment|pourquoi|quel(le)?s?|quand|est-ce|how|why|what|which|when|can|should|could)\b",
            )?,
        })
    }

    /// Extract the feature set of an interaction payload.
    ///
    /// Fails with `Malformed` when the payload has neither a string `request`
    /// or `response` nor any explicit feature field.
    pub fn extract(&self, payload: &Payload) -> Result<FeatureSet, HandlerError> {
        let request = payload.get("request").and_then(|v| v.as_str());
        let response = payload.get("response").and_then(|v| v.as_str());

        let mut explicit = FeatureSet::new();
        for (field, feature) in EXPLICIT_FEATURES {
            if let Some(value) = payload.get(*field).and_then(|v| v.as_str()) {
                if !value.trim().is_empty() {
                    explicit.insert((*feature).to_string(), value.to_string());
                }
            }
        }

        let mut features = FeatureSet::new();
        if request.is_none() && response.is_none() {
            if explicit.is_empty() {
                return Err(HandlerError::malformed(
                    "interaction needs a string `request` or `response`, or a feature field",
                ));
            }
        } else {
            let request = request.unwrap_or_default();
            let response = response.unwrap_or_default();
            let combined = format!("{request}\n{response}");

            features.insert("tone".into(), first_match(&self.tones, request).unwrap_or("neutral").into());
            features.insert(
                "kind".into(),
                first_match(&self.kinds, &combined).unwrap_or("other").into(),
            );
            features.insert("language".into(), self.language(&combined).into());
            features.insert(
                "length".into(),
                length_bucket(if response.is_empty() { request } else { response }).into(),
            );
            features.insert("form".into(), self.form(request).into());
            features.insert(
                "sector".into(),
                first_match(&self.sectors, &combined).unwrap_or("general").into(),
            );
        }

        features.extend(explicit);
        Ok(features)
    }

    fn language(&self, text: &str) -> &'static str {
        let fr = self.french.find_iter(text).count();
        let en = self.english.find_iter(text).count();
        match fr.cmp(&en) {
            std::cmp::Ordering::Greater => "fr",
            std::cmp::Ordering::Less => "en",
            std::cmp::Ordering::Equal => "unknown",
        }
    }

    fn form(&self, request: &str) -> &'static str {
        if request.trim_end().ends_with('?') || self.interrogative.is_match(request) {
            "question"
        } else {
            "instruction"
        }
    }
}

fn first_match(rules: &[(&'static str, Regex)], text: &str) -> Option<&'static str> {
    rules
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(label, _)| *label)
}

fn length_bucket(text: &str) -> &'static str {
    match text.split_whitespace().count() {
        n if n < SHORT_MAX_WORDS => "short",
        n if n < MEDIUM_MAX_WORDS => "medium",
        _ => "long",
    }
}
