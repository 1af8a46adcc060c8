//! Commands as handed to the dispatcher, and the mapping from a command to the
//! matching table operation.

use crate::audit::AuditLog;
use crate::chained_hashing::table::TableError;
use crate::hash::{ConcurrentHash, Priority, Salary, SalaryUpdate};
use crate::utils::record::{truncate_name, Record};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Insert,
    Delete,
    Update,
    Search,
    Print,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandKind::Insert => "insert",
            CommandKind::Delete => "delete",
            CommandKind::Update => "update",
            CommandKind::Search => "search",
            CommandKind::Print => "print",
        })
    }
}

/// `name` is empty for print and `salary` is zero for everything but insert and update.
/// The constructors cut names to [`MAX_NAME_LEN`](crate::utils::record::MAX_NAME_LEN) bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub name: String,
    pub salary: Salary,
    pub priority: Priority,
}

impl Command {
    pub fn insert(name: impl Into<String>, salary: Salary, priority: Priority) -> Self {
        Command {
            kind: CommandKind::Insert,
            name: truncate_name(name.into()),
            salary,
            priority,
        }
    }

    pub fn delete(name: impl Into<String>, priority: Priority) -> Self {
        Command {
            kind: CommandKind::Delete,
            name: truncate_name(name.into()),
            salary: 0,
            priority,
        }
    }

    pub fn update(name: impl Into<String>, salary: Salary, priority: Priority) -> Self {
        Command {
            kind: CommandKind::Update,
            name: truncate_name(name.into()),
            salary,
            priority,
        }
    }

    pub fn search(name: impl Into<String>, priority: Priority) -> Self {
        Command {
            kind: CommandKind::Search,
            name: truncate_name(name.into()),
            salary: 0,
            priority,
        }
    }

    pub fn print(priority: Priority) -> Self {
        Command {
            kind: CommandKind::Print,
            name: String::new(),
            salary: 0,
            priority,
        }
    }
}

/// What a command did. Renders as the console line for that command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Inserted(Record),
    Deleted(Record),
    Updated(SalaryUpdate),
    Found(Record),
    Snapshot(Vec<Record>),
    /// Duplicate or missing key; the table is unchanged.
    Rejected { kind: CommandKind, error: TableError },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Inserted(record) => write!(f, "Inserted {}", record),
            Outcome::Deleted(record) => write!(f, "Deleted record for {}", record),
            Outcome::Updated(SalaryUpdate { record, old_salary }) => write!(
                f,
                "Updated record {hash} from {hash},{name},{old} to {record}",
                hash = record.hash,
                name = record.name,
                old = old_salary,
                record = record
            ),
            Outcome::Found(record) => write!(f, "Found: {}", record),
            Outcome::Snapshot(records) => {
                write!(f, "Current Database:")?;
                for record in records {
                    write!(f, "\n{}", record)?;
                }
                Ok(())
            }
            Outcome::Rejected { error, .. } => match error {
                TableError::DuplicateKey { hash, .. } => {
                    write!(f, "Insert failed. Entry {} is a duplicate.", hash)
                }
                TableError::NotFound { name, .. } => write!(f, "{} not found.", name),
                other => write!(f, "{}", other),
            },
        }
    }
}

/// Runs `command` against `store`. Duplicate and missing keys come back as
/// [`Outcome::Rejected`]; only fatal errors are returned as `Err`.
pub fn execute<S: ConcurrentHash + ?Sized>(
    store: &S,
    audit: &AuditLog,
    command: &Command,
) -> Result<Outcome, TableError> {
    let Command {
        kind,
        name,
        salary,
        priority,
    } = command;
    let result = match kind {
        CommandKind::Insert => store
            .insert(audit, name, *salary, *priority)
            .map(Outcome::Inserted),
        CommandKind::Delete => store.delete(audit, name, *priority).map(Outcome::Deleted),
        CommandKind::Update => store
            .update(audit, name, *salary, *priority)
            .map(Outcome::Updated),
        CommandKind::Search => store.search(audit, name, *priority).map(Outcome::Found),
        CommandKind::Print => store.print(audit, *priority).map(Outcome::Snapshot),
    };
    match result {
        Ok(outcome) => Ok(outcome),
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => Ok(Outcome::Rejected { kind: *kind, error }),
    }
}
