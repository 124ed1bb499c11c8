// Security Guardian
//
// GDPR-oriented PII detection and threat detection over event content,
// as a consumer agent (GuardianAgent) and as a synchronous request
// validator (GuardianValidator).

pub mod agent;
pub mod audit;
pub mod classifier;
pub mod rules;
pub mod validator;

pub use agent::{GuardianAgent, GuardianConfig};
pub use audit::{AuditLog, AuditRecord, ComplianceReport, SecurityThreat};
pub use classifier::{string_leaves, Assessment, Classifier};
pub use rules::{default_rules, Rule};
pub use validator::GuardianValidator;
