// Security vocabulary shared by validators and the guardian agent

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Severity of what was detected, ordered from harmless to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "none",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(ThreatLevel::None),
            "low" => Ok(ThreatLevel::Low),
            "medium" => Ok(ThreatLevel::Medium),
            "high" => Ok(ThreatLevel::High),
            "critical" => Ok(ThreatLevel::Critical),
            other => Err(format!("unknown threat level: {other}")),
        }
    }
}

/// Compliance verdict derived from an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    #[default]
    Compliant,
    Warning,
    Violation,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "compliant"),
            ComplianceStatus::Warning => write!(f, "warning"),
            ComplianceStatus::Violation => write!(f, "violation"),
        }
    }
}

/// What kind of rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    /// Personal data (GDPR scope)
    Pii,
    /// Hostile input
    Threat,
}

/// A rule that matched. Never carries the matched text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Finding {
    pub rule_id: String,
    pub category: FindingCategory,
    pub level: ThreatLevel,
    pub match_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_level_ordering() {
        assert!(ThreatLevel::None < ThreatLevel::Low);
        assert!(ThreatLevel::Medium < ThreatLevel::High);
        assert!(ThreatLevel::High < ThreatLevel::Critical);
        assert_eq!(
            [ThreatLevel::Low, ThreatLevel::Critical, ThreatLevel::Medium]
                .into_iter()
                .max(),
            Some(ThreatLevel::Critical)
        );
    }

    #[test]
    fn test_threat_level_parse() {
        assert_eq!("HIGH".parse::<ThreatLevel>().unwrap(), ThreatLevel::High);
        assert_eq!(" low ".parse::<ThreatLevel>().unwrap(), ThreatLevel::Low);
        assert!("severe".parse::<ThreatLevel>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_value(ThreatLevel::Critical).unwrap(), "critical");
        assert_eq!(
            serde_json::to_value(ComplianceStatus::Violation).unwrap(),
            "violation"
        );
        assert_eq!(serde_json::to_value(FindingCategory::Pii).unwrap(), "pii");
    }
}
