pub mod error;
pub mod guard;
pub mod registry;
pub mod severity;

pub use error::PolicyError;
pub use guard::{decide, DenialReason, GuardAgent, GuardConfig, Verdict, DOUBLE_CONFIRMATION_MARKER};
pub use registry::{PermissionEvent, PermissionLookup, PermissionRegistry, RegistrySnapshot};
pub use severity::{classify, classify_action, with_classified_severity};
