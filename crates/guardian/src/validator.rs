// RequestValidator backed by the guardian classifier

use async_trait::async_trait;
use phoenix_core::{
    ComplianceStatus, RequestValidator, Result, ThreatLevel, ValidationOutcome, ValidationRequest,
};
use tracing::info;

use crate::classifier::Classifier;

/// Screens request text before it reaches an AI provider.
///
/// Requests over `max_request_bytes` or at/above `block_level` are rejected.
/// Accepted requests come back with personal data masked.
#[derive(Debug, Clone)]
pub struct GuardianValidator {
    classifier: Classifier,
    block_level: ThreatLevel,
    max_request_bytes: usize,
}

impl GuardianValidator {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            block_level: ThreatLevel::High,
            max_request_bytes: 32 * 1024,
        }
    }

    pub fn with_block_level(mut self, level: ThreatLevel) -> Self {
        self.block_level = level;
        self
    }

    pub fn with_max_request_bytes(mut self, max: usize) -> Self {
        self.max_request_bytes = max;
        self
    }
}

#[async_trait]
impl RequestValidator for GuardianValidator {
    async fn validate_request(&self, request: &ValidationRequest) -> Result<ValidationOutcome> {
        if request.text.len() > self.max_request_bytes {
            return Ok(ValidationOutcome {
                allowed: false,
                threat_level: ThreatLevel::None,
                compliance: ComplianceStatus::Compliant,
                findings: vec![],
                sanitized_text: String::new(),
                reason: Some(format!(
                    "request exceeds {} bytes",
                    self.max_request_bytes
                )),
            });
        }

        let assessment = self.classifier.assess_text(&request.text);
        let allowed = assessment.threat_level == ThreatLevel::None
            || assessment.threat_level < self.block_level;

        let reason = if allowed {
            None
        } else {
            info!(
                app = request.app.as_deref().unwrap_or("unknown"),
                threat_level = %assessment.threat_level,
                rules = ?assessment.rule_ids(),
                "Request blocked"
            );
            Some(format!(
                "request blocked: {} ({})",
                assessment.threat_level,
                assessment.rule_ids().join(", ")
            ))
        };

        Ok(ValidationOutcome {
            allowed,
            threat_level: assessment.threat_level,
            compliance: assessment.compliance,
            sanitized_text: self.classifier.redact(&request.text),
            findings: assessment.findings,
            reason,
        })
    }
}
