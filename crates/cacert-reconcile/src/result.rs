use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::OperationFailure;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Package under management, `None` when `install_package` is off.
    pub managed_package: Option<String>,
    pub package_changed: bool,
    pub directory_changed: bool,
    /// Certificates whose file was written, corrected, or removed.
    pub certificates_changed: BTreeSet<String>,
    pub rebuild_triggered: bool,
    pub legacy_enable_ran: bool,
    pub failures: Vec<OperationFailure>,
    /// Problems that were logged and tolerated, e.g. a guard check that
    /// could not run.
    pub warnings: Vec<OperationFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconciliationResult {
    pub(crate) fn started(at: DateTime<Utc>) -> Self {
        Self {
            managed_package: None,
            package_changed: false,
            directory_changed: false,
            certificates_changed: BTreeSet::new(),
            rebuild_triggered: false,
            legacy_enable_ran: false,
            failures: Vec::new(),
            warnings: Vec::new(),
            started_at: at,
            finished_at: at,
        }
    }

    /// Whether the pass altered host state.
    pub fn changed(&self) -> bool {
        self.package_changed
            || self.directory_changed
            || !self.certificates_changed.is_empty()
            || self.rebuild_triggered
            || self.legacy_enable_ran
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit code for this outcome: 0, or the first failure's code.
    pub fn exit_code(&self) -> i32 {
        self.failures
            .first()
            .map(|f| f.code.exit_code())
            .unwrap_or(0)
    }
}
