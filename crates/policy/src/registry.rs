use chrono::{DateTime, Utc};
use hypr_guard_core::{timestamp, Permission};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::PolicyError;
use crate::severity::classify;

/// Read side of the registry used by the decision procedure.
pub trait PermissionLookup {
    /// `false` for unknown keys and for keys present but not granted.
    fn is_granted(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionEvent {
    Granted {
        permission: String,
        #[serde(with = "hypr_guard_core::timestamp")]
        at: DateTime<Utc>,
    },
    Revoked {
        permission: String,
        #[serde(with = "hypr_guard_core::timestamp")]
        at: DateTime<Utc>,
    },
    Updated {
        permission: String,
    },
}

type Listener = Arc<dyn Fn(&PermissionEvent) + Send + Sync>;

/// Grantable capabilities keyed by lowercase permission name.
pub struct PermissionRegistry {
    permissions: RwLock<HashMap<String, Permission>>,
    listeners: RwLock<Vec<Listener>>,
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self {
            permissions: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn with_permissions(
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Result<Self, PolicyError> {
        let registry = Self::new();
        for permission in permissions {
            registry.add_or_update(permission)?;
        }
        Ok(registry)
    }

    /// Inserts or replaces by name, returning the previous record.
    pub fn add_or_update(
        &self,
        mut permission: Permission,
    ) -> Result<Option<Permission>, PolicyError> {
        let name = normalize(&permission.name)?;
        permission.name = name.clone();

        let previous = self.permissions.write().insert(name.clone(), permission);
        debug!(permission = %name, replaced = previous.is_some(), "permission stored");

        self.notify(&PermissionEvent::Updated { permission: name });
        Ok(previous)
    }

    /// Grants `name`, creating the entry when absent.
    pub fn grant(&self, name: &str) -> Result<Permission, PolicyError> {
        let name = normalize(name)?;
        let now = timestamp::now();

        let granted = {
            let mut permissions = self.permissions.write();
            let entry = permissions
                .entry(name.clone())
                .or_insert_with(|| Permission::new(name.clone(), "", severity_for_key(&name)));
            entry.granted = true;
            entry.granted_at = Some(now);
            entry.clone()
        };

        self.notify(&PermissionEvent::Granted { permission: name, at: now });
        Ok(granted)
    }

    /// Returns `false` when `name` is unknown or blank; no entry is created.
    pub fn revoke(&self, name: &str) -> bool {
        let Ok(name) = normalize(name) else {
            return false;
        };
        let now = timestamp::now();

        {
            let mut permissions = self.permissions.write();
            let Some(entry) = permissions.get_mut(&name) else {
                return false;
            };
            entry.granted = false;
            entry.granted_at = None;
        }

        self.notify(&PermissionEvent::Revoked { permission: name, at: now });
        true
    }

    pub fn get(&self, name: &str) -> Option<Permission> {
        let name = normalize(name).ok()?;
        self.permissions.read().get(&name).cloned()
    }

    /// All permissions, sorted by name.
    pub fn list(&self) -> Vec<Permission> {
        let mut all: Vec<_> = self.permissions.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn granted_names(&self) -> Vec<String> {
        self.list()
            .into_iter()
            .filter(|p| p.granted)
            .map(|p| p.name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.permissions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.read().is_empty()
    }

    /// Owned copy taken under a single read lock.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            permissions: self.permissions.read().clone(),
        }
    }

    /// Listeners run synchronously after each committed mutation.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&PermissionEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    fn notify(&self, event: &PermissionEvent) {
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(?event, "permission listener panicked");
            }
        }
    }
}

impl PermissionLookup for PermissionRegistry {
    fn is_granted(&self, key: &str) -> bool {
        self.permissions
            .read()
            .get(&key.to_lowercase())
            .map(|p| p.granted)
            .unwrap_or(false)
    }
}

/// Point-in-time copy of a registry.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    permissions: HashMap<String, Permission>,
}

impl RegistrySnapshot {
    pub fn get(&self, name: &str) -> Option<&Permission> {
        self.permissions.get(&normalize(name).ok()?)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl PermissionLookup for RegistrySnapshot {
    fn is_granted(&self, key: &str) -> bool {
        self.permissions
            .get(&key.to_lowercase())
            .map(|p| p.granted)
            .unwrap_or(false)
    }
}

fn normalize(name: &str) -> Result<String, PolicyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PolicyError::InvalidPermissionName(name.to_string()));
    }
    Ok(name.to_lowercase())
}

fn severity_for_key(key: &str) -> hypr_guard_core::Severity {
    match key.split_once('_') {
        Some((category, name)) => classify(category, name),
        None => classify(key, ""),
    }
}
