use anyhow::{Context, Result};
use hypr_guard_core::{Permission, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const USER_ENV: &str = "HYPR_GUARD_USER";
pub const AUDIT_LOG_ENV: &str = "HYPR_GUARD_AUDIT_LOG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub user_id: String,
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub allow_in_band_confirmation: bool,
    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub granted: bool,
}

fn default_true() -> bool {
    true
}

impl PermissionConfig {
    pub fn new(name: &str, description: &str, severity: Severity, granted: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            severity,
            granted,
        }
    }

    pub fn to_permission(&self) -> Permission {
        let permission = Permission::new(&self.name, &self.description, self.severity);
        if self.granted {
            permission.granted()
        } else {
            permission
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "user_demo".to_string(),
            audit_log: None,
            allow_in_band_confirmation: true,
            permissions: vec![
                PermissionConfig::new("file_read", "Read files", Severity::Low, true),
                PermissionConfig::new("file_write", "Write files", Severity::Medium, true),
                PermissionConfig::new("file_delete", "Delete files", Severity::High, false),
                PermissionConfig::new("app_launch", "Launch applications", Severity::Low, true),
                PermissionConfig::new("app_close", "Close applications", Severity::Medium, false),
                PermissionConfig::new(
                    "system_control",
                    "Control system settings",
                    Severity::Medium,
                    false,
                ),
            ],
        }
    }
}

impl Config {
    /// Reads YAML from `path`, applies environment overrides and validates.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(USER_ENV).ok(),
            std::env::var(AUDIT_LOG_ENV).ok().map(PathBuf::from),
        );
    }

    pub fn apply_overrides(&mut self, user_id: Option<String>, audit_log: Option<PathBuf>) {
        if let Some(user_id) = user_id {
            self.user_id = user_id;
        }
        if let Some(audit_log) = audit_log {
            self.audit_log = Some(audit_log);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            anyhow::bail!("user_id cannot be empty");
        }

        let mut seen = HashSet::new();
        for permission in &self.permissions {
            let name = permission.name.trim().to_lowercase();
            if name.is_empty() {
                anyhow::bail!("permission name cannot be empty");
            }
            if !seen.insert(name.clone()) {
                anyhow::bail!("duplicate permission: {}", name);
            }
        }

        Ok(())
    }
}
