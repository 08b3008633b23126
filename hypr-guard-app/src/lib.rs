pub mod bootstrap;
pub mod config;
pub mod dispatcher;

pub use bootstrap::{bootstrap, GuardRuntime};
pub use config::{Config, PermissionConfig};
pub use dispatcher::{ActionHandler, DispatchOutcome, Dispatcher, DryRunHandler};
