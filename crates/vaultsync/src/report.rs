//! Operation reports.
//!
//! Every push and pull ends with a report: counts, per-item failures and,
//! for pulls, how conflicts were resolved. Reports never carry plaintext.

use std::fmt::Write as _;
use std::path::PathBuf;

use vaultsync_core::ResourceType;

use crate::conflict::Conflict;

/// One item that failed, with the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub id: String,
    pub error: String,
}

impl ItemFailure {
    pub fn new(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            error: error.to_string(),
        }
    }
}

/// Result of pushing one resource type.
#[derive(Debug, Clone)]
pub struct PushReport {
    pub resource_type: ResourceType,
    /// Ids selected for transfer, in enumeration order.
    pub candidates: Vec<String>,
    pub pushed: usize,
    pub failed: usize,
    pub errors: Vec<ItemFailure>,
    pub dry_run: bool,
}

impl PushReport {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            candidates: Vec::new(),
            pushed: 0,
            failed: 0,
            errors: Vec::new(),
            dry_run: false,
        }
    }

    pub(crate) fn fail(&mut self, id: impl Into<String>, error: impl ToString) {
        self.failed += 1;
        self.errors.push(ItemFailure::new(id, error));
    }

    /// One-line summary; verbose adds one line per failure.
    pub fn summary(&self, verbose: bool) -> String {
        let rt = self.resource_type;
        let mut out = if self.candidates.is_empty() {
            format!("{rt}: nothing to push")
        } else if self.dry_run {
            format!("{rt}: would push {}", self.candidates.len())
        } else {
            format!(
                "{rt}: pushed {}, failed {} (of {})",
                self.pushed,
                self.failed,
                self.candidates.len()
            )
        };
        if self.dry_run && verbose {
            for id in &self.candidates {
                let _ = write!(out, "\n  {id}");
            }
        }
        if verbose {
            append_failures(&mut out, &self.errors);
        }
        out
    }
}

/// How the conflicts of one pull were resolved.
#[derive(Debug, Clone, Default)]
pub struct ConflictSummary {
    /// Every conflict detected, in detection order.
    pub detected: Vec<Conflict>,
    pub kept_local: usize,
    /// Overwritten with the remote copy.
    pub kept_remote: usize,
    /// Remote copy saved beside the local one.
    pub kept_both: usize,
    /// Where keep-both copies were written.
    pub conflict_copies: Vec<PathBuf>,
}

impl ConflictSummary {
    pub fn count(&self) -> usize {
        self.detected.len()
    }
}

/// Result of pulling one resource type.
#[derive(Debug, Clone)]
pub struct PullReport {
    pub resource_type: ResourceType,
    /// Objects listed remotely (after `only` selection).
    pub remote_count: usize,
    /// Ids selected for writing, in classification order.
    pub pull_set: Vec<String>,
    pub pulled: usize,
    pub failed: usize,
    /// Existing items whose content already matched.
    pub unchanged: usize,
    /// Existing items not compared because reconciliation was off.
    pub skipped_existing: usize,
    pub conflicts: ConflictSummary,
    pub errors: Vec<ItemFailure>,
    pub dry_run: bool,
}

impl PullReport {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            remote_count: 0,
            pull_set: Vec::new(),
            pulled: 0,
            failed: 0,
            unchanged: 0,
            skipped_existing: 0,
            conflicts: ConflictSummary::default(),
            errors: Vec::new(),
            dry_run: false,
        }
    }

    pub(crate) fn fail(&mut self, id: impl Into<String>, error: impl ToString) {
        self.failed += 1;
        self.errors.push(ItemFailure::new(id, error));
    }

    pub fn summary(&self, verbose: bool) -> String {
        let rt = self.resource_type;
        if self.remote_count == 0 {
            return format!("{rt}: nothing on remote");
        }

        let mut out = if self.dry_run {
            format!("{rt}: would pull {}", self.pull_set.len())
        } else {
            format!("{rt}: pulled {}, failed {}", self.pulled, self.failed)
        };
        if self.unchanged > 0 {
            let _ = write!(out, ", {} unchanged", self.unchanged);
        }
        if self.skipped_existing > 0 {
            let _ = write!(out, ", {} already present", self.skipped_existing);
        }
        let c = &self.conflicts;
        if c.count() > 0 {
            let _ = write!(
                out,
                "; conflicts: {} kept local, {} overwritten, {} saved as conflict",
                c.kept_local, c.kept_remote, c.kept_both
            );
        }
        if verbose {
            if self.dry_run {
                for id in &self.pull_set {
                    let _ = write!(out, "\n  {id}");
                }
            }
            for path in &c.conflict_copies {
                let _ = write!(out, "\n  conflict copy: {}", path.display());
            }
            append_failures(&mut out, &self.errors);
        }
        out
    }
}

fn append_failures(out: &mut String, errors: &[ItemFailure]) {
    for failure in errors {
        let _ = write!(out, "\n  failed {}: {}", failure.id, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_summary() {
        let mut report = PushReport::new(ResourceType::Sessions);
        assert_eq!(report.summary(true), "sessions: nothing to push");

        report.candidates = vec!["a".into(), "b".into()];
        report.pushed = 1;
        report.fail("b", "transport error: timeout");

        assert_eq!(report.summary(false), "sessions: pushed 1, failed 1 (of 2)");
        assert_eq!(
            report.summary(true),
            "sessions: pushed 1, failed 1 (of 2)\n  failed b: transport error: timeout"
        );
    }

    #[test]
    fn test_pull_summary() {
        let mut report = PullReport::new(ResourceType::Agents);
        assert_eq!(report.summary(false), "agents: nothing on remote");

        report.remote_count = 3;
        report.pulled = 1;
        report.unchanged = 1;
        report.conflicts.detected.push(Conflict {
            id: "reviewer".into(),
            resource_type: ResourceType::Agents,
            local_location: None,
            local_modified: None,
            metadata: Default::default(),
        });
        report.conflicts.kept_local = 1;

        assert_eq!(
            report.summary(false),
            "agents: pulled 1, failed 0, 1 unchanged; conflicts: 1 kept local, 0 overwritten, 0 saved as conflict"
        );
    }

    #[test]
    fn test_dry_run_push_lists_candidates_when_verbose() {
        let mut report = PushReport::new(ResourceType::Agents);
        report.dry_run = true;
        report.candidates = vec!["planner".into()];
        assert_eq!(report.summary(true), "agents: would push 1\n  planner");
    }
}
