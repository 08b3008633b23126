use chrono::{DateTime, Utc};
use hypr_guard_core::{ActionResult, Parameters};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
    Blocked,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failed => "failed",
            AuditStatus::Blocked => "blocked",
        }
    }

    pub fn from_result(result: &ActionResult) -> Self {
        if result.success {
            AuditStatus::Success
        } else {
            AuditStatus::Failed
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(AuditStatus::Success),
            "failed" => Ok(AuditStatus::Failed),
            "blocked" => Ok(AuditStatus::Blocked),
            other => Err(format!("unknown audit status: {}", other)),
        }
    }
}

/// One immutable line of the audit trail. Field order is the export order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub user_id: String,
    pub action: String,
    pub action_type: String,
    pub status: AuditStatus,
    pub reason: Option<String>,
    pub parameters: Option<Parameters>,
    pub result: Option<ActionResult>,
    #[serde(with = "hypr_guard_core::timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Arguments to [`crate::AuditLogger::record`]; the logger supplies the
/// user and the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub action: String,
    pub action_type: String,
    pub status: AuditStatus,
    pub reason: Option<String>,
    pub parameters: Option<Parameters>,
    pub result: Option<ActionResult>,
}

impl AuditRecord {
    pub fn new(
        action: impl Into<String>,
        action_type: impl Into<String>,
        status: AuditStatus,
    ) -> Self {
        Self {
            action: action.into(),
            action_type: action_type.into(),
            status,
            reason: None,
            parameters: None,
            result: None,
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn result(mut self, result: ActionResult) -> Self {
        self.result = Some(result);
        self
    }
}
