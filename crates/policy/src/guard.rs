use hypr_guard_core::{Action, Severity};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::registry::{PermissionLookup, PermissionRegistry};
use crate::severity::classify_action;

/// Parameter that marks a HIGH action as double-confirmed. Only JSON `true` counts.
pub const DOUBLE_CONFIRMATION_MARKER: &str = "double_confirmed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    MissingPermission { category: String, name: String },
    ElevatedConfirmationRequired,
    DoubleConfirmationRequired,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::MissingPermission { category, name } => {
                write!(f, "no granted permission for {}:{}", category, name)
            }
            DenialReason::ElevatedConfirmationRequired => {
                f.write_str("requires elevated confirmation")
            }
            DenialReason::DoubleConfirmationRequired => {
                f.write_str("destructive action requires double confirmation")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Allowed,
    Denied(DenialReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            Verdict::Allowed => None,
            Verdict::Denied(reason) => Some(reason),
        }
    }

    pub fn reason(&self) -> Option<String> {
        self.denial().map(ToString::to_string)
    }

    pub fn into_parts(self) -> (bool, Option<String>) {
        (self.is_allowed(), self.reason())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Accept [`DOUBLE_CONFIRMATION_MARKER`] from the action's own parameters.
    /// When `false`, every HIGH action is denied on the synchronous path.
    pub allow_in_band_confirmation: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            allow_in_band_confirmation: true,
        }
    }
}

/// Decision with the default [`GuardConfig`].
pub fn decide(action: &Action, lookup: &impl PermissionLookup) -> Verdict {
    evaluate(&GuardConfig::default(), action, lookup)
}

fn evaluate(config: &GuardConfig, action: &Action, lookup: &impl PermissionLookup) -> Verdict {
    let severity = classify_action(action);

    // CRITICAL never passes here, granted or not; re-submission goes through
    // an elevated channel outside this engine.
    if severity == Severity::Critical {
        return Verdict::Denied(DenialReason::ElevatedConfirmationRequired);
    }

    if !lookup.is_granted(&action.permission_key()) {
        return Verdict::Denied(DenialReason::MissingPermission {
            category: action.category.clone(),
            name: action.name.clone(),
        });
    }

    if severity == Severity::High
        && !(config.allow_in_band_confirmation && is_double_confirmed(action))
    {
        return Verdict::Denied(DenialReason::DoubleConfirmationRequired);
    }

    Verdict::Allowed
}

fn is_double_confirmed(action: &Action) -> bool {
    matches!(
        action.parameters.get(DOUBLE_CONFIRMATION_MARKER),
        Some(Value::Bool(true))
    )
}

/// Validation engine for one user's automation requests.
pub struct GuardAgent {
    user_id: String,
    registry: Arc<PermissionRegistry>,
    config: GuardConfig,
}

impl GuardAgent {
    pub fn new(user_id: impl Into<String>, registry: Arc<PermissionRegistry>) -> Self {
        Self::with_config(user_id, registry, GuardConfig::default())
    }

    pub fn with_config(
        user_id: impl Into<String>,
        registry: Arc<PermissionRegistry>,
        config: GuardConfig,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            registry,
            config,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn validate(&self, action: &Action) -> Verdict {
        let verdict = evaluate(&self.config, action, self.registry.as_ref());

        match &verdict {
            Verdict::Allowed => {
                if classify_action(action) == Severity::High {
                    // The marker comes from the same caller that built the action.
                    warn!(
                        user = %self.user_id,
                        action_id = %action.id,
                        key = %action.permission_key(),
                        "HIGH action approved on in-band double confirmation"
                    );
                } else {
                    debug!(
                        user = %self.user_id,
                        action_id = %action.id,
                        key = %action.permission_key(),
                        "action allowed"
                    );
                }
            }
            Verdict::Denied(reason) => {
                info!(
                    user = %self.user_id,
                    action_id = %action.id,
                    key = %action.permission_key(),
                    %reason,
                    "guard denied action"
                );
            }
        }

        verdict
    }

    pub fn build_confirmation_prompt(&self, action: &Action) -> String {
        let severity = classify_action(action);
        let mut prompt = format!(
            "Action '{}' on '{}' ({} severity) requires confirmation.",
            action.name, action.category, severity
        );
        if !action.description.is_empty() {
            prompt.push_str(&format!(" {}.", action.description.trim_end_matches('.')));
        }
        prompt.push_str(" Allow? (yes/no)");
        prompt
    }

    /// Names the exact permission key that unblocks the action.
    pub fn explain_denial(&self, action: &Action, reason: impl fmt::Display) -> String {
        format!(
            "Action blocked: {}\nTo allow '{}' on '{}', \
             please grant the '{}' permission in settings.",
            reason,
            action.name,
            action.category,
            action.permission_key()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistrySnapshot;
    use hypr_guard_core::Permission;

    fn registry_with(granted: &[&str]) -> Arc<PermissionRegistry> {
        let registry = PermissionRegistry::new();
        for name in granted {
            registry.grant(name).unwrap();
        }
        Arc::new(registry)
    }

    #[test]
    fn test_reason_strings() {
        let missing = DenialReason::MissingPermission {
            category: "file".into(),
            name: "read".into(),
        };
        assert_eq!(missing.to_string(), "no granted permission for file:read");
        assert_eq!(
            DenialReason::ElevatedConfirmationRequired.to_string(),
            "requires elevated confirmation"
        );
    }

    #[test]
    fn test_untagged_action_uses_classified_tier() {
        let guard = GuardAgent::new("user", registry_with(&["system_shutdown", "browser_open"]));

        let shutdown = Action::new("system", "shutdown");
        assert_eq!(
            guard.validate(&shutdown),
            Verdict::Denied(DenialReason::ElevatedConfirmationRequired)
        );
        assert!(guard.validate(&Action::new("browser", "open")).is_allowed());
    }

    #[test]
    fn test_marker_must_be_boolean_true() {
        let guard = GuardAgent::new("user", registry_with(&["app_close"]));
        let action = Action::new("app", "close")
            .severity(Severity::High)
            .param(DOUBLE_CONFIRMATION_MARKER, "true");

        assert_eq!(
            guard.validate(&action),
            Verdict::Denied(DenialReason::DoubleConfirmationRequired)
        );
    }

    #[test]
    fn test_in_band_confirmation_can_be_disabled() {
        let config = GuardConfig {
            allow_in_band_confirmation: false,
        };
        let guard = GuardAgent::with_config("user", registry_with(&["app_close"]), config);
        let action = Action::new("app", "close")
            .severity(Severity::High)
            .param(DOUBLE_CONFIRMATION_MARKER, true);

        assert!(!guard.validate(&action).is_allowed());

        let medium = Action::new("app", "close").severity(Severity::Medium);
        assert!(guard.validate(&medium).is_allowed());
    }

    #[test]
    fn test_decide_over_snapshot() {
        let registry = PermissionRegistry::new();
        registry
            .add_or_update(Permission::new("file_read", "Read files", Severity::Low).granted())
            .unwrap();
        let snapshot: RegistrySnapshot = registry.snapshot();

        let action = Action::new("file", "read").severity(Severity::Low);
        assert_eq!(decide(&action, &snapshot), Verdict::Allowed);
    }

    #[test]
    fn test_confirmation_prompt_mentions_action() {
        let guard = GuardAgent::new("user", registry_with(&[]));
        let action = Action::new("file", "delete").description("Delete report.pdf");
        let prompt = guard.build_confirmation_prompt(&action);

        assert!(prompt.contains("'delete'"));
        assert!(prompt.contains("critical"));
        assert!(prompt.contains("Delete report.pdf."));
        assert!(prompt.ends_with("Allow? (yes/no)"));
    }

    #[test]
    fn test_into_parts() {
        assert_eq!(Verdict::Allowed.into_parts(), (true, None));
        let (allowed, reason) =
            Verdict::Denied(DenialReason::DoubleConfirmationRequired).into_parts();
        assert!(!allowed);
        assert_eq!(
            reason.as_deref(),
            Some("destructive action requires double confirmation")
        );
    }
}
