//! Error raised when the hook should not be installed for a job.

use thiserror::Error;

/// The hook is inactive for this job.
///
/// Hosts treat this as "skip the component", never as a crash. The `Display`
/// output is the human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotConfigured {
    /// Neither enable flag is set to true.
    #[error("dot-scrapy persistence is disabled")]
    Disabled,

    /// A mandatory setting is absent or blank; carries the setting name.
    #[error("dot-scrapy persistence requires the {0} setting")]
    MissingSetting(&'static str),
}
