// ABOUTME: Diagnostics accumulator for non-fatal warnings during a suite run.
// ABOUTME: Collects warnings that shouldn't fail a scenario but should be shown to users.

/// Collects non-fatal warnings during a suite run.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a suite run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// No environment file could be loaded.
    pub fn env_file(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::EnvFile,
            message: message.into(),
        }
    }

    /// The connectivity check did not run for a scenario.
    pub fn connectivity_skipped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ConnectivitySkipped,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// No env file was found or it could not be read.
    EnvFile,
    /// The caller was outside the authorized ranges or its address was unknown.
    ConnectivitySkipped,
}
