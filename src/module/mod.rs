pub mod error;
pub mod rule_governance;
pub mod submission;
