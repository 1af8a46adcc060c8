use crate::audit::AuditLog;
use crate::chained_hashing::table::TableError;
use crate::utils::record::Record;

pub type Salary = u32;
/// Caller-supplied task label; only used to tag audit lines.
pub type Priority = i32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryUpdate {
    pub record: Record,
    pub old_salary: Salary,
}

/// Operations of a concurrently shared employee table. Every operation logs its lock
/// transitions to `audit` and releases every lock it took before returning. Names are
/// stored and matched exactly as passed in.
pub trait ConcurrentHash: Sync {
    fn insert(
        &self,
        audit: &AuditLog,
        name: &str,
        salary: Salary,
        priority: Priority,
    ) -> Result<Record, TableError>;
    fn delete(&self, audit: &AuditLog, name: &str, priority: Priority)
        -> Result<Record, TableError>;
    fn update(
        &self,
        audit: &AuditLog,
        name: &str,
        salary: Salary,
        priority: Priority,
    ) -> Result<SalaryUpdate, TableError>;
    fn search(&self, audit: &AuditLog, name: &str, priority: Priority)
        -> Result<Record, TableError>;
    /// Copies every bucket under its read lock, one bucket at a time, sorted by hash.
    fn print(&self, audit: &AuditLog, priority: Priority) -> Result<Vec<Record>, TableError>;
    /// Lock-free sorted copy of the table; the exclusive borrow proves no task is running.
    fn dump(&mut self) -> Result<Vec<Record>, TableError>;
}
