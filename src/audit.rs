//! Append-only audit log of lock transitions and command dispatch.
//!
//! Every line is written and flushed inside a single critical section so concurrent tasks
//! never interleave mid-line. Lock acquisitions and releases are also counted; the two
//! totals must match once every task has joined.

use crate::hash::{Priority, Salary};
use crate::utils::record::Record;
use crate::utils::timestamp_micros;
use parking_lot::Mutex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Unable to open audit log {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => f.write_str("READ"),
            LockMode::Write => f.write_str("WRITE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadEvent {
    Waiting,
    Awakened,
    Acquired(LockMode),
    Released(LockMode),
}

impl fmt::Display for ThreadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadEvent::Waiting => f.write_str("WAITING FOR MY TURN"),
            ThreadEvent::Awakened => f.write_str("AWAKENED FOR WORK"),
            ThreadEvent::Acquired(mode) => write!(f, "{} LOCK ACQUIRED", mode),
            ThreadEvent::Released(mode) => write!(f, "{} LOCK RELEASED", mode),
        }
    }
}

/// The operation line written when a table operation starts.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Insert { name: &'a str, salary: Salary },
    Delete { name: &'a str },
    Update { name: &'a str, salary: Salary },
    Search { name: &'a str },
    Print,
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert { name, salary } => write!(f, "INSERT,{},{}", name, salary),
            Operation::Delete { name } => write!(f, "DELETE,{}", name),
            Operation::Update { name, salary } => write!(f, "UPDATE,{},{}", name, salary),
            Operation::Search { name } => write!(f, "SEARCH,{}", name),
            Operation::Print => f.write_str("PRINT"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    pub acquisitions: u64,
    pub releases: u64,
}

impl LockStats {
    pub fn is_balanced(&self) -> bool {
        self.acquisitions == self.releases
    }
}

pub struct AuditLog {
    sink: Mutex<Box<dyn Write + Send>>,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl AuditLog {
    /// Opens (and truncates) the audit log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| AuditError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(BufWriter::new(file)))
    }

    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        AuditLog {
            sink: Mutex::new(Box::new(writer)),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// A log whose lines go nowhere; counters still work.
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    pub fn event(&self, priority: Priority, event: ThreadEvent) {
        self.append(format_args!(
            "{}: THREAD {} {}",
            timestamp_micros(),
            priority,
            event
        ));
    }

    pub fn operation(&self, priority: Priority, operation: Operation<'_>) {
        self.append(format_args!(
            "{}: THREAD {},{}",
            timestamp_micros(),
            priority,
            operation
        ));
    }

    /// Must be called right after the lock is granted.
    pub fn lock_acquired(&self, priority: Priority, mode: LockMode) {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.event(priority, ThreadEvent::Acquired(mode));
    }

    /// Must be called while the lock is still held, right before it is dropped.
    pub fn lock_released(&self, priority: Priority, mode: LockMode) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.event(priority, ThreadEvent::Released(mode));
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            acquisitions: self.acquisitions.load(Ordering::SeqCst),
            releases: self.releases.load(Ordering::SeqCst),
        }
    }

    /// Writes the end-of-run totals followed by the final table.
    pub fn write_summary(&self, final_table: &[Record]) {
        let stats = self.stats();
        self.append(format_args!(
            "Number of lock acquisitions: {}",
            stats.acquisitions
        ));
        self.append(format_args!("Number of lock releases: {}", stats.releases));
        self.append(format_args!("Final Table:"));
        for record in final_table {
            self.append(format_args!("{}", record));
        }
    }

    fn append(&self, line: fmt::Arguments<'_>) {
        let mut sink = self.sink.lock();
        let result = writeln!(sink, "{}", line).and_then(|_| sink.flush());
        if let Err(err) = result {
            error!(%err, "failed to append to audit log");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// In-memory sink that tests can read back after handing a clone to the log.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().clone())
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn strip_timestamp(line: &str) -> &str {
        line.split_once(": ").map(|(_, rest)| rest).unwrap()
    }

    #[test]
    fn test_event_lines() {
        let buf = SharedBuf::default();
        let audit = AuditLog::new(buf.clone());
        audit.event(3, ThreadEvent::Waiting);
        audit.event(3, ThreadEvent::Awakened);
        audit.lock_acquired(3, LockMode::Write);
        audit.lock_released(3, LockMode::Write);
        audit.lock_acquired(4, LockMode::Read);
        audit.lock_released(4, LockMode::Read);

        let lines = buf.lines();
        let events: Vec<&str> = lines.iter().map(|l| strip_timestamp(l)).collect();
        assert_eq!(
            events,
            vec![
                "THREAD 3 WAITING FOR MY TURN",
                "THREAD 3 AWAKENED FOR WORK",
                "THREAD 3 WRITE LOCK ACQUIRED",
                "THREAD 3 WRITE LOCK RELEASED",
                "THREAD 4 READ LOCK ACQUIRED",
                "THREAD 4 READ LOCK RELEASED",
            ]
        );
        let ts: u128 = lines[0].split_once(": ").unwrap().0.parse().unwrap();
        assert!(ts > 0);
    }

    #[test]
    fn test_operation_lines() {
        let buf = SharedBuf::default();
        let audit = AuditLog::new(buf.clone());
        audit.operation(1, Operation::Insert { name: "Broc", salary: 50000 });
        audit.operation(2, Operation::Delete { name: "Broc" });
        audit.operation(3, Operation::Update { name: "Alice", salary: 1 });
        audit.operation(4, Operation::Search { name: "Alice" });
        audit.operation(5, Operation::Print);

        let lines = buf.lines();
        let ops: Vec<&str> = lines.iter().map(|l| strip_timestamp(l)).collect();
        assert_eq!(
            ops,
            vec![
                "THREAD 1,INSERT,Broc,50000",
                "THREAD 2,DELETE,Broc",
                "THREAD 3,UPDATE,Alice,1",
                "THREAD 4,SEARCH,Alice",
                "THREAD 5,PRINT",
            ]
        );
        assert_eq!(audit.stats(), LockStats::default());
    }

    #[test]
    fn test_summary_format() {
        let buf = SharedBuf::default();
        let audit = AuditLog::new(buf.clone());
        audit.lock_acquired(1, LockMode::Read);
        audit.lock_released(1, LockMode::Read);
        let broc = Record::new("Broc", 50000);
        audit.write_summary(&[broc.clone()]);

        let lines = buf.lines();
        assert_eq!(
            &lines[2..],
            &[
                "Number of lock acquisitions: 1".to_string(),
                "Number of lock releases: 1".to_string(),
                "Final Table:".to_string(),
                format!("{},Broc,50000", broc.hash),
            ]
        );
    }

    #[test]
    fn test_concurrent_lines_never_interleave() {
        let buf = SharedBuf::default();
        let audit = Arc::new(AuditLog::new(buf.clone()));
        let mut handles = vec![];
        for t in 0..8 {
            let audit = Arc::clone(&audit);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    audit.lock_acquired(t, LockMode::Write);
                    audit.lock_released(t, LockMode::Write);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = audit.stats();
        assert_eq!(stats.acquisitions, 1600);
        assert!(stats.is_balanced());
        let lines = buf.lines();
        assert_eq!(lines.len(), 3200);
        for line in &lines {
            let event = strip_timestamp(line);
            assert!(event.starts_with("THREAD "), "{}", line);
            assert!(
                event.ends_with("WRITE LOCK ACQUIRED") || event.ends_with("WRITE LOCK RELEASED"),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_create_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        {
            let audit = AuditLog::create(&path).unwrap();
            audit.event(9, ThreadEvent::Waiting);
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("THREAD 9 WAITING FOR MY TURN\n"));
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("output.txt");
        match AuditLog::create(&path) {
            Err(AuditError::Open { path: p, .. }) => assert_eq!(p, path),
            Ok(_) => panic!("opening a log in a missing directory must fail"),
        }
    }
}
