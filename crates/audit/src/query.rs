use chrono::{DateTime, Utc};

use crate::entry::{AuditLogEntry, AuditStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusFilter {
    Is(AuditStatus),
    /// A status name that matched nothing known; filters everything out.
    Unmatched,
}

/// Conjunctive filter over the audit trail. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    action_type: Option<String>,
    status: Option<StatusFilter>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    pub fn status(mut self, status: AuditStatus) -> Self {
        self.status = Some(StatusFilter::Is(status));
        self
    }

    /// Filters by status name; an unknown name yields no matches rather than an error.
    pub fn status_named(mut self, status: &str) -> Self {
        self.status = Some(match status.parse() {
            Ok(status) => StatusFilter::Is(status),
            Err(_) => StatusFilter::Unmatched,
        });
        self
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if self.start.is_some_and(|start| entry.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| entry.timestamp > end) {
            return false;
        }
        if let Some(action_type) = &self.action_type {
            if &entry.action_type != action_type {
                return false;
            }
        }
        match &self.status {
            None => true,
            Some(StatusFilter::Is(status)) => entry.status == *status,
            Some(StatusFilter::Unmatched) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(status: AuditStatus, minute: u32) -> AuditLogEntry {
        AuditLogEntry {
            user_id: "user".into(),
            action: "read".into(),
            action_type: "file".into(),
            status,
            reason: None,
            parameters: None,
            result: None,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 14, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(AuditQuery::new().matches(&entry(AuditStatus::Failed, 0)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let e = entry(AuditStatus::Success, 30);
        let query = AuditQuery::new().since(e.timestamp).until(e.timestamp);
        assert!(query.matches(&e));

        let later = AuditQuery::new().since(e.timestamp + Duration::seconds(1));
        assert!(!later.matches(&e));
    }

    #[test]
    fn test_unknown_status_name_matches_nothing() {
        let query = AuditQuery::new().status_named("denied");
        assert!(!query.matches(&entry(AuditStatus::Blocked, 0)));
    }

    #[test]
    fn test_filters_combine() {
        let e = entry(AuditStatus::Blocked, 5);
        assert!(AuditQuery::new().action_type("file").status(AuditStatus::Blocked).matches(&e));
        assert!(!AuditQuery::new().action_type("app").status(AuditStatus::Blocked).matches(&e));
    }
}
