//! Reconciliation of recorded totals against payment matrices
//!
//! A member's recorded total is its matrix total plus whatever was paid
//! before tracking began. That earlier amount is not stored separately, so
//! an audit can only report the amount it implies and flag totals that are
//! impossible (below the matrix total) or matrices with holes.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::ledger::payments::recompute_total;
use crate::types::*;

/// Audit of a single member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAudit {
    pub member_id: String,
    pub full_name: String,
    pub recorded_total: BigDecimal,
    pub matrix_total: BigDecimal,
    /// `recorded_total - matrix_total`; never negative for a consistent member
    pub implied_previous_amount: BigDecimal,
    /// Months of the tracked range that are absent from the matrix
    pub missing_cells: usize,
    pub issues: Vec<String>,
}

impl MemberAudit {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Audit of a whole member list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub members: Vec<MemberAudit>,
    pub is_consistent: bool,
}

impl ReconciliationReport {
    /// Audits that found at least one issue
    pub fn inconsistent(&self) -> impl Iterator<Item = &MemberAudit> {
        self.members.iter().filter(|audit| !audit.is_consistent())
    }
}

/// Checks recorded totals and matrix shape over a tracked year range
pub struct ReconciliationEngine {
    year_range: YearRange,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new(YearRange::default())
    }
}

impl ReconciliationEngine {
    pub fn new(year_range: YearRange) -> Self {
        Self { year_range }
    }

    pub fn audit_member(&self, member: &Member) -> MemberAudit {
        let matrix_total = recompute_total(&member.months_paid, member.user_type());
        let implied_previous_amount = &member.total_amount_paid - &matrix_total;
        let missing_cells = member.months_paid.missing_cells(self.year_range);

        let mut issues = Vec::new();

        if implied_previous_amount < BigDecimal::from(0) {
            issues.push(format!(
                "Recorded total {} is below the matrix total {}",
                member.total_amount_paid, matrix_total
            ));
        }

        if missing_cells > 0 {
            issues.push(format!(
                "{} month(s) of {}-{} missing from the payment matrix",
                missing_cells, self.year_range.start, self.year_range.end
            ));
        }

        let untracked: Vec<String> = member
            .months_paid
            .paid_cells()
            .filter(|(year, _)| !self.year_range.contains(*year))
            .map(|(year, month)| format!("{} {}", month, year))
            .collect();
        if !untracked.is_empty() {
            issues.push(format!(
                "Paid months outside the tracked range: {}",
                untracked.join(", ")
            ));
        }

        MemberAudit {
            member_id: member.id.clone(),
            full_name: member.full_name(),
            recorded_total: member.total_amount_paid.clone(),
            matrix_total,
            implied_previous_amount,
            missing_cells,
            issues,
        }
    }

    pub fn audit(&self, members: &[Member]) -> ReconciliationReport {
        let members: Vec<MemberAudit> = members.iter().map(|m| self.audit_member(m)).collect();
        let is_consistent = members.iter().all(MemberAudit::is_consistent);
        ReconciliationReport {
            members,
            is_consistent,
        }
    }
}
