use hypr_guard_audit::{
    AuditError, AuditLogger, AuditRecord, AuditSink, AuditStatus, ChainedFileSink,
};
use hypr_guard_core::ActionResult;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use tempfile::tempdir;

fn record_n(logger: &AuditLogger, n: usize) {
    for i in 0..n {
        logger.record(AuditRecord::new(
            format!("session_{}", i),
            "file",
            AuditStatus::Success,
        ));
    }
}

fn create_logger(log_path: &std::path::Path) -> AuditLogger {
    AuditLogger::with_sink("user_demo", Box::new(ChainedFileSink::open(log_path).unwrap()))
}

fn line_count(path: &std::path::Path) -> usize {
    BufReader::new(File::open(path).unwrap()).lines().count()
}

#[test]
fn test_valid_chain_verification() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("audit.log");
    let sink = Arc::new(ChainedFileSink::open(&log_path).unwrap());
    let logger = AuditLogger::with_sink("user_demo", Box::new(Arc::clone(&sink)));

    record_n(&logger, 5);

    sink.verify_integrity().unwrap();
    assert_eq!(line_count(&log_path), 5);
    assert_eq!(logger.sink_failures(), 0);
}

#[test]
fn test_entries_match_memory() {
    let dir = tempdir().unwrap();
    let sink = Arc::new(ChainedFileSink::open(dir.path().join("audit.log")).unwrap());
    let logger = AuditLogger::with_sink("user_demo", Box::new(Arc::clone(&sink)));

    logger.record(
        AuditRecord::new("read", "file", AuditStatus::Success).result(
            ActionResult::success("read", "Read file").with_execution_time(0.1 + 0.2),
        ),
    );
    logger.record(
        AuditRecord::new("delete", "file", AuditStatus::Blocked)
            .reason("requires elevated confirmation"),
    );

    let on_disk = sink.entries().unwrap();
    let in_memory: Vec<_> = logger.all().iter().map(|e| (**e).clone()).collect();
    assert_eq!(on_disk, in_memory);
}

#[test]
fn test_reopen_continues_chain() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("audit.log");

    {
        let logger = create_logger(&log_path);
        record_n(&logger, 2);
    }

    let sink = ChainedFileSink::open(&log_path).unwrap();
    let entry = AuditLogger::new("user_demo")
        .record(AuditRecord::new("again", "app", AuditStatus::Failed));
    sink.append(&entry).unwrap();

    sink.verify_integrity().unwrap();
    assert_eq!(line_count(&log_path), 3);
}

#[test]
fn test_tampered_entry_detection() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("audit.log");
    let sink = ChainedFileSink::open(&log_path).unwrap();
    let logger = AuditLogger::with_sink("user_demo", Box::new(sink));
    record_n(&logger, 3);

    let content = std::fs::read_to_string(&log_path).unwrap();
    std::fs::write(&log_path, content.replace("session_1", "session_X")).unwrap();

    let result = ChainedFileSink::open(&log_path);
    assert!(matches!(result, Err(AuditError::IntegrityViolation(_))));
}

#[test]
fn test_deleted_entry_detection() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("audit.log");
    let sink = Arc::new(ChainedFileSink::open(&log_path).unwrap());
    let logger = AuditLogger::with_sink("user_demo", Box::new(Arc::clone(&sink)));
    record_n(&logger, 5);

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let modified = format!("{}\n{}\n{}\n{}\n", lines[0], lines[1], lines[3], lines[4]);
    std::fs::write(&log_path, modified).unwrap();

    assert!(matches!(
        sink.verify_integrity(),
        Err(AuditError::IntegrityViolation(_))
    ));
}

#[test]
fn test_reordered_entry_detection() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("audit.log");
    let sink = Arc::new(ChainedFileSink::open(&log_path).unwrap());
    let logger = AuditLogger::with_sink("user_demo", Box::new(Arc::clone(&sink)));
    record_n(&logger, 3);

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    std::fs::write(&log_path, format!("{}\n{}\n{}\n", lines[1], lines[0], lines[2])).unwrap();

    assert!(matches!(
        sink.verify_integrity(),
        Err(AuditError::IntegrityViolation(_))
    ));
}

#[test]
fn test_creates_parent_directory() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("logs").join("nested").join("audit.log");

    let logger = create_logger(&log_path);
    record_n(&logger, 1);

    assert!(log_path.exists());
}

#[test]
fn test_sink_failure_keeps_memory_entry() {
    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append(&self, _entry: &hypr_guard_audit::AuditLogEntry) -> Result<(), AuditError> {
            Err(AuditError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }
    }

    let logger = AuditLogger::with_sink("user_demo", Box::new(FailingSink));
    record_n(&logger, 2);

    assert_eq!(logger.len(), 2);
    assert_eq!(logger.sink_failures(), 2);
}
