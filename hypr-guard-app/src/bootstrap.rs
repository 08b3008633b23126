use anyhow::{Context, Result};
use hypr_guard_audit::{AuditLogger, ChainedFileSink};
use hypr_guard_policy::{GuardAgent, GuardConfig, PermissionRegistry};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// The registry, guard and audit trail for one user.
pub struct GuardRuntime {
    pub registry: Arc<PermissionRegistry>,
    pub guard: Arc<GuardAgent>,
    pub audit: Arc<AuditLogger>,
    pub audit_sink: Option<Arc<ChainedFileSink>>,
}

pub fn bootstrap(config: &Config) -> Result<GuardRuntime> {
    config.validate()?;

    let registry = PermissionRegistry::with_permissions(
        config.permissions.iter().map(|p| p.to_permission()),
    )
    .context("Failed to seed permission registry")?;
    let registry = Arc::new(registry);

    let guard = Arc::new(GuardAgent::with_config(
        config.user_id.clone(),
        Arc::clone(&registry),
        GuardConfig {
            allow_in_band_confirmation: config.allow_in_band_confirmation,
        },
    ));

    let (audit, audit_sink) = match &config.audit_log {
        Some(path) => {
            let sink = Arc::new(
                ChainedFileSink::open(path)
                    .with_context(|| format!("Failed to open audit log {}", path.display()))?,
            );
            let logger =
                AuditLogger::with_sink(config.user_id.clone(), Box::new(Arc::clone(&sink)));
            (logger, Some(sink))
        }
        None => (AuditLogger::new(config.user_id.clone()), None),
    };

    info!(
        user = %config.user_id,
        permissions = registry.len(),
        granted = registry.granted_names().len(),
        durable_audit = audit_sink.is_some(),
        "guard runtime initialized"
    );

    Ok(GuardRuntime {
        registry,
        guard,
        audit: Arc::new(audit),
        audit_sink,
    })
}
