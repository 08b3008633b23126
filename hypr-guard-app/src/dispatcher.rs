use hypr_guard_audit::{AuditLogEntry, AuditLogger};
use hypr_guard_core::{Action, ActionResult};
use hypr_guard_policy::{with_classified_severity, DenialReason, GuardAgent, Verdict};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Executes approved actions for one category (file, app, system, ...).
pub trait ActionHandler: Send + Sync {
    fn handle(&self, action: &Action) -> ActionResult;
}

/// Reports success without touching the OS.
pub struct DryRunHandler;

impl ActionHandler for DryRunHandler {
    fn handle(&self, action: &Action) -> ActionResult {
        ActionResult::success(
            &action.name,
            format!("dry run: {}:{}", action.category, action.name),
        )
        .with_output(Value::Object(action.parameters.clone()))
    }
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Executed {
        result: ActionResult,
        entry: Arc<AuditLogEntry>,
    },
    Blocked {
        reason: DenialReason,
        explanation: String,
        entry: Arc<AuditLogEntry>,
    },
}

impl DispatchOutcome {
    pub fn entry(&self) -> &Arc<AuditLogEntry> {
        match self {
            DispatchOutcome::Executed { entry, .. } | DispatchOutcome::Blocked { entry, .. } => {
                entry
            }
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, DispatchOutcome::Blocked { .. })
    }
}

/// Validates, executes and records each action.
pub struct Dispatcher {
    guard: Arc<GuardAgent>,
    audit: Arc<AuditLogger>,
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl Dispatcher {
    pub fn new(guard: Arc<GuardAgent>, audit: Arc<AuditLogger>) -> Self {
        Self {
            guard,
            audit,
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, category: &str, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(category.to_lowercase(), handler);
    }

    pub fn dispatch(&self, action: Action) -> DispatchOutcome {
        let action = with_classified_severity(action);
        info!(action_id = %action.id, key = %action.permission_key(), "dispatching action");

        if let Verdict::Denied(reason) = self.guard.validate(&action) {
            let explanation = self.guard.explain_denial(&action, &reason);
            let entry = self.audit.record_blocked(&action, &reason);
            return DispatchOutcome::Blocked {
                reason,
                explanation,
                entry,
            };
        }

        let result = self.execute(&action);
        if !result.success {
            warn!(action_id = %action.id, error = ?result.error, "action failed");
        }
        let entry = self.audit.record_outcome(&action, result.clone());
        DispatchOutcome::Executed { result, entry }
    }

    fn execute(&self, action: &Action) -> ActionResult {
        let Some(handler) = self.handlers.get(&action.category.to_lowercase()) else {
            return ActionResult::failure(
                &action.name,
                format!("Cannot execute {}:{}", action.category, action.name),
                "no handler registered for category",
            );
        };

        let start = Instant::now();
        let mut result = handler.handle(action);
        if result.execution_time_ms.is_none() {
            result.execution_time_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
        }
        result
    }
}
