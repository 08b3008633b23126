use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Ordered parameter payload carried by an [`Action`].
pub type Parameters = Map<String, Value>;

/// Trust tier of an action, ordered from least to most destructive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry lookup key for a category/name pair: both lowercased, `_`-joined.
pub fn permission_key(category: &str, name: &str) -> String {
    format!("{}_{}", category.to_lowercase(), name.to_lowercase())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Permission {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub granted: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub granted_at: Option<DateTime<Utc>>,
}

impl Permission {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
            granted: false,
            granted_at: None,
        }
    }

    /// Marks the permission as granted now.
    pub fn granted(mut self) -> Self {
        self.granted = true;
        self.granted_at = Some(crate::timestamp::now());
        self
    }
}

/// A requested automation operation.
///
/// `severity` is `None` for actions that arrive untagged; the classifier
/// assigns one before validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub description: String,
}

impl Action {
    /// Creates an untagged action with a fresh v4 id.
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), category, name)
    }

    pub fn with_id(
        id: impl Into<String>,
        category: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            parameters: Parameters::new(),
            severity: None,
            requires_confirmation: false,
            description: String::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn requiring_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    pub fn permission_key(&self) -> String {
        permission_key(&self.category, &self.name)
    }
}

/// Outcome reported by a controller after executing an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub action: String,
    pub message: String,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub execution_time_ms: Option<f64>,
    #[serde(with = "crate::timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ActionResult {
    pub fn success(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            action: action.into(),
            message: message.into(),
            output: None,
            error: None,
            execution_time_ms: None,
            timestamp: crate::timestamp::now(),
        }
    }

    pub fn failure(
        action: impl Into<String>,
        message: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::success(action, message)
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_execution_time(mut self, ms: f64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }
}
