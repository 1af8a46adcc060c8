//! Concurrent chained hash table of employee records.
//!
//! Each bucket owns a chain of records behind its own reader/writer lock. Commands
//! (insert, delete, update, search, print) run on their own threads, and every lock
//! transition is appended to an audit log together with running acquisition and
//! release totals.
//!
//! ```no_run
//! use chash::audit::AuditLog;
//! use chash::chained_hashing::table::Table;
//! use chash::command::Command;
//! use chash::dispatcher::{DispatchOptions, Dispatcher};
//!
//! let table = Table::new(100).unwrap();
//! let audit = AuditLog::create("output.txt").unwrap();
//! let report = Dispatcher::new(table, audit, DispatchOptions::default())
//!     .run(vec![Command::insert("Broc", 50000, 1), Command::print(2)])
//!     .unwrap();
//! assert!(report.stats.is_balanced());
//! ```

pub mod audit;
pub mod chained_hashing;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod hash;
pub mod parser;
pub mod utils;

use crate::audit::{AuditError, AuditLog};
use crate::chained_hashing::table::{Table, TableError};
use crate::config::{Config, ConfigError};
use crate::dispatcher::{DispatchError, Dispatcher, RunReport};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChashError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unable to read commands from {path:?}")]
    Commands {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Reads the command file, builds the table, opens the audit log and runs every command.
/// Nothing executes unless all three startup steps succeed.
pub fn run(config: &Config) -> Result<RunReport, ChashError> {
    let read_error = |source| ChashError::Commands {
        path: config.commands_path.clone(),
        source,
    };
    let file = File::open(&config.commands_path).map_err(read_error)?;
    let commands = parser::parse_commands(BufReader::new(file)).map_err(read_error)?;

    let table = Table::new(config.num_buckets)?;
    let audit = AuditLog::create(&config.log_path)?;
    let report = Dispatcher::new(table, audit, config.into()).run(commands)?;
    Ok(report)
}
