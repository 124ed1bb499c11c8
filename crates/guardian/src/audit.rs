// Audit trail of assessments and detected threats

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use phoenix_core::{ComplianceStatus, Event, Finding, ThreatLevel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::classifier::Assessment;

/// One assessed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub stream_id: String,
    pub version: i64,
    pub event_type: String,
    pub threat_level: ThreatLevel,
    pub compliance: ComplianceStatus,
    pub findings: Vec<Finding>,
    pub assessed_at: DateTime<Utc>,
}

/// Assessment at or above the configured threat threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SecurityThreat {
    pub id: Uuid,
    /// Event that triggered the detection
    pub event_id: Uuid,
    pub stream_id: String,
    pub threat_level: ThreatLevel,
    pub rule_ids: Vec<String>,
    pub detected_at: DateTime<Utc>,
    /// Id of the re-published ThreatDetected event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_event_id: Option<Uuid>,
}

/// Per-stream compliance roll-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ComplianceReport {
    pub stream_id: String,
    pub events_assessed: usize,
    /// Worst status seen on the stream
    pub status: ComplianceStatus,
    /// Worst threat level seen on the stream
    pub threat_level: ThreatLevel,
    /// Total matches per rule
    pub findings_by_rule: BTreeMap<String, usize>,
    pub threats: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_assessed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    threats: Vec<SecurityThreat>,
    assessed: HashSet<Uuid>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event_id: &Uuid) -> bool {
        self.assessed.contains(event_id)
    }

    /// Record an assessment. Returns false if the event was already recorded.
    pub fn record(&mut self, event: &Event, assessment: &Assessment) -> bool {
        if !self.assessed.insert(event.event_id) {
            return false;
        }
        self.records.push(AuditRecord {
            event_id: event.event_id,
            stream_id: event.stream_id.clone(),
            version: event.version,
            event_type: event.event_type.clone(),
            threat_level: assessment.threat_level,
            compliance: assessment.compliance,
            findings: assessment.findings.clone(),
            assessed_at: Utc::now(),
        });
        true
    }

    pub fn record_threat(&mut self, threat: SecurityThreat) {
        self.threats.push(threat);
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Most recent threats first
    pub fn threats(&self, limit: usize) -> Vec<SecurityThreat> {
        self.threats.iter().rev().take(limit).cloned().collect()
    }

    pub fn threat_count(&self) -> usize {
        self.threats.len()
    }

    /// Compliance roll-up for one stream; None when nothing was assessed
    pub fn compliance_report(&self, stream_id: &str) -> Option<ComplianceReport> {
        let records: Vec<&AuditRecord> = self
            .records
            .iter()
            .filter(|r| r.stream_id == stream_id)
            .collect();
        if records.is_empty() {
            return None;
        }

        let mut findings_by_rule = BTreeMap::new();
        for finding in records.iter().flat_map(|r| r.findings.iter()) {
            *findings_by_rule.entry(finding.rule_id.clone()).or_insert(0) += finding.match_count;
        }

        Some(ComplianceReport {
            stream_id: stream_id.to_string(),
            events_assessed: records.len(),
            status: records.iter().map(|r| r.compliance).max().unwrap_or_default(),
            threat_level: records.iter().map(|r| r.threat_level).max().unwrap_or_default(),
            findings_by_rule,
            threats: self.threats.iter().filter(|t| t.stream_id == stream_id).count(),
            last_assessed_at: records.iter().map(|r| r.assessed_at).max(),
        })
    }
}
