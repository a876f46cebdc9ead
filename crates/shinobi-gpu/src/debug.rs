//! Validation diagnostics delivered by the debug messenger.

use ash::vk;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Highest severity present in the Vulkan flags.
    pub fn from_vk(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }
}

/// One message from the validation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    /// General, validation and/or performance.
    pub category: vk::DebugUtilsMessageTypeFlagsEXT,
    pub message: String,
}

impl DiagnosticRecord {
    /// Build a record from the raw messenger callback arguments.
    pub fn new(
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        category: vk::DebugUtilsMessageTypeFlagsEXT,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::from_vk(severity),
            category,
            message: message.into(),
        }
    }
}

/// Receiver of diagnostic records.
///
/// The driver may call the sink from any thread that issues Vulkan calls.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: &DiagnosticRecord);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&DiagnosticRecord) + Send + Sync,
{
    fn record(&self, record: &DiagnosticRecord) {
        self(record);
    }
}

/// Forwards diagnostics to `tracing`, mapping severities to log levels.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, record: &DiagnosticRecord) {
        let category = record.category;
        match record.severity {
            Severity::Error => {
                tracing::error!(target: "vulkan", ?category, "{}", record.message);
            }
            Severity::Warning => {
                tracing::warn!(target: "vulkan", ?category, "{}", record.message);
            }
            Severity::Info => tracing::info!(target: "vulkan", ?category, "{}", record.message),
            Severity::Verbose => {
                tracing::trace!(target: "vulkan", ?category, "{}", record.message);
            }
        }
    }
}
