// Frequency-weighted pattern table

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use phoenix_core::Payload;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::features::FeatureSet;

/// Quality assumed when an interaction carries no signal
pub const NEUTRAL_QUALITY: f64 = 0.5;

/// Stable key of a feature set: SHA-256 hex over sorted `name=value` lines
pub fn pattern_key(features: &FeatureSet) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in features {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Quality signal of an interaction: `satisfaction` in [0,1], else
/// `success` as 1.0/0.0, else neutral
pub fn quality_signal(payload: &Payload) -> f64 {
    if let Some(satisfaction) = payload.get("satisfaction").and_then(|v| v.as_f64()) {
        return satisfaction.clamp(0.0, 1.0);
    }
    match payload.get("success").and_then(|v| v.as_bool()) {
        Some(true) => 1.0,
        Some(false) => 0.0,
        None => NEUTRAL_QUALITY,
    }
}

/// One observed combination of features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Pattern {
    pub key: String,
    pub features: FeatureSet,
    pub frequency: u64,
    /// Running mean of the quality signal
    pub score: f64,
    pub last_seen: DateTime<Utc>,
}

impl Pattern {
    /// Ranking weight: frequency scaled by score
    pub fn weight(&self) -> f64 {
        self.frequency as f64 * self.score
    }
}

/// Patterns by key, plus the set of applied event ids
#[derive(Debug, Default, Clone)]
pub struct PatternTable {
    patterns: HashMap<String, Pattern>,
    applied: HashSet<Uuid>,
    total_interactions: u64,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one interaction. Returns false when `event_id` was already applied.
    pub fn record(
        &mut self,
        event_id: Uuid,
        features: FeatureSet,
        quality: f64,
        seen_at: DateTime<Utc>,
    ) -> bool {
        if !self.applied.insert(event_id) {
            return false;
        }

        let key = pattern_key(&features);
        let pattern = self.patterns.entry(key.clone()).or_insert_with(|| Pattern {
            key,
            features,
            frequency: 0,
            score: 0.0,
            last_seen: seen_at,
        });

        pattern.frequency += 1;
        pattern.score += (quality - pattern.score) / pattern.frequency as f64;
        if seen_at > pattern.last_seen {
            pattern.last_seen = seen_at;
        }
        self.total_interactions += 1;
        true
    }

    pub fn get(&self, key: &str) -> Option<&Pattern> {
        self.patterns.get(key)
    }

    pub fn total_interactions(&self) -> u64 {
        self.total_interactions
    }

    pub fn distinct_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Highest-weight patterns first; ties broken by frequency then key
    pub fn top(&self, limit: usize) -> Vec<Pattern> {
        let mut patterns: Vec<&Pattern> = self.patterns.values().collect();
        patterns.sort_by(|a, b| {
            b.weight()
                .total_cmp(&a.weight())
                .then(b.frequency.cmp(&a.frequency))
                .then(a.key.cmp(&b.key))
        });
        patterns.into_iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_core::payload;
    use serde_json::json;

    fn features(pairs: &[(&str, &str)]) -> FeatureSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_pattern_key_is_order_independent() {
        let a = features(&[("tone", "formal"), ("kind", "cv")]);
        let b = features(&[("kind", "cv"), ("tone", "formal")]);
        assert_eq!(pattern_key(&a), pattern_key(&b));
        assert_eq!(pattern_key(&a).len(), 64);
        assert_ne!(pattern_key(&a), pattern_key(&features(&[("tone", "creative")])));
    }

    #[test]
    fn test_quality_signal() {
        assert_eq!(quality_signal(&payload(json!({"satisfaction": 0.9}))), 0.9);
        assert_eq!(quality_signal(&payload(json!({"satisfaction": 3}))), 1.0);
        assert_eq!(quality_signal(&payload(json!({"success": false}))), 0.0);
        assert_eq!(quality_signal(&payload(json!({}))), NEUTRAL_QUALITY);
    }

    #[test]
    fn test_running_mean_score() {
        let mut table = PatternTable::new();
        let f = features(&[("tone", "formal")]);
        let now = Utc::now();

        table.record(Uuid::now_v7(), f.clone(), 1.0, now);
        table.record(Uuid::now_v7(), f.clone(), 0.0, now);
        table.record(Uuid::now_v7(), f.clone(), 0.5, now);

        let pattern = table.get(&pattern_key(&f)).unwrap();
        assert_eq!(pattern.frequency, 3);
        assert!((pattern.score - 0.5).abs() < 1e-9);
        assert_eq!(table.total_interactions(), 3);
    }

    #[test]
    fn test_reapplying_event_is_noop() {
        let mut table = PatternTable::new();
        let id = Uuid::now_v7();
        let f = features(&[("tone", "formal")]);

        assert!(table.record(id, f.clone(), 1.0, Utc::now()));
        assert!(!table.record(id, f.clone(), 0.0, Utc::now()));

        let pattern = table.get(&pattern_key(&f)).unwrap();
        assert_eq!(pattern.frequency, 1);
        assert_eq!(pattern.score, 1.0);
    }

    #[test]
    fn test_top_orders_by_weight() {
        let mut table = PatternTable::new();
        let now = Utc::now();
        let frequent = features(&[("tone", "formal")]);
        let good = features(&[("tone", "creative")]);

        for _ in 0..4 {
            table.record(Uuid::now_v7(), frequent.clone(), 0.5, now);
        }
        table.record(Uuid::now_v7(), good.clone(), 1.0, now);

        let top = table.top(10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].features, frequent);
        assert_eq!(table.top(1).len(), 1);
        assert_eq!(table.distinct_patterns(), 2);
    }
}
