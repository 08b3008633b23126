use anyhow::{Context, Result};
use hypr_guard_app::{bootstrap, Config, DispatchOutcome, Dispatcher, DryRunHandler};
use hypr_guard_audit::{AuditQuery, ChainedFileSink};
use hypr_guard_core::{Action, Severity};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("verify") {
        let path = args.get(2).context("Usage: hypr-guard verify <audit_log>")?;
        return verify_audit_log(path);
    }

    let config = match args.get(1) {
        Some(path) => Config::load(path)?,
        None => {
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    run_security_flow(&config)
}

fn run_security_flow(config: &Config) -> Result<()> {
    let runtime = bootstrap(config)?;
    let mut dispatcher = Dispatcher::new(Arc::clone(&runtime.guard), Arc::clone(&runtime.audit));
    dispatcher.register("file", Arc::new(DryRunHandler));
    dispatcher.register("app", Arc::new(DryRunHandler));

    println!("\n=== Security Validation Flow ===\n");

    let actions = vec![
        Action::with_id("action_1", "file", "read")
            .param("file_path", "/tmp/test.txt")
            .severity(Severity::Low)
            .description("Read file contents"),
        Action::with_id("action_2", "file", "delete")
            .param("file_path", "/tmp/test.txt")
            .severity(Severity::Critical)
            .description("Delete file"),
    ];

    for action in actions {
        let label = format!("{} ({}:{})", action.id, action.category, action.name);
        match dispatcher.dispatch(action) {
            DispatchOutcome::Executed { result, .. } => {
                println!("✅ {}: {}", label, result.message);
            }
            DispatchOutcome::Blocked { explanation, .. } => {
                println!("❌ {}", label);
                println!("{}", explanation);
            }
        }
    }

    println!("\n=== Audit Log ===");
    let entries = runtime.audit.query(&AuditQuery::new());
    println!("Total logged actions: {}", entries.len());
    for entry in &entries {
        println!("- {} ({}): {}", entry.action, entry.action_type, entry.status);
    }

    println!("\n{}", runtime.audit.export(None, None)?);
    Ok(())
}

fn verify_audit_log(path: &str) -> Result<()> {
    if !std::path::Path::new(path).exists() {
        anyhow::bail!("Audit log not found: {}", path);
    }
    let sink = ChainedFileSink::open(path)
        .with_context(|| format!("Integrity check failed for {}", path))?;
    let entries = sink.entries()?;
    println!("✅ {}: {} entries, chain intact", sink.path().display(), entries.len());
    Ok(())
}
