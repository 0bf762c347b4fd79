use super::enums::{AuditAction, RecordTable};

/// Which side of the soft-delete lifecycle a listing reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    /// `deleted_at IS NULL`
    #[default]
    Active,
    /// `deleted_at IS NOT NULL`
    Deleted,
}

impl Lifecycle {
    pub(crate) fn where_clause(self, alias: &str) -> String {
        match self {
            Lifecycle::Active => format!("{alias}deleted_at IS NULL"),
            Lifecycle::Deleted => format!("{alias}deleted_at IS NOT NULL"),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordFilter {
    pub lifecycle: Lifecycle,
    /// Case-insensitive substring matched against the table's search columns.
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn deleted() -> Self {
        Self {
            lifecycle: Lifecycle::Deleted,
            search: None,
        }
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.trim().is_empty() {
            None
        } else {
            Some(term)
        };
        self
    }
}

pub const DEFAULT_AUDIT_LIMIT: u32 = 100;
pub const MAX_AUDIT_LIMIT: u32 = 500;

#[derive(Debug)]
pub struct AuditFilter {
    pub table: Option<RecordTable>,
    pub action: Option<AuditAction>,
    pub record_id: Option<String>,
    pub limit: u32,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            table: None,
            action: None,
            record_id: None,
            limit: DEFAULT_AUDIT_LIMIT,
        }
    }
}

impl AuditFilter {
    /// Limit clamped to `1..=MAX_AUDIT_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_AUDIT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_is_ignored() {
        assert!(RecordFilter::active().search("   ").search.is_none());
        assert_eq!(
            RecordFilter::active().search("card").search.as_deref(),
            Some("card")
        );
    }

    #[test]
    fn audit_limit_is_clamped() {
        let filter = AuditFilter { limit: 10_000, ..Default::default() };
        assert_eq!(filter.effective_limit(), MAX_AUDIT_LIMIT);
        let filter = AuditFilter { limit: 0, ..Default::default() };
        assert_eq!(filter.effective_limit(), 1);
    }
}
