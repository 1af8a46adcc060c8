use crate::audit::{AuditLog, LockMode};
use crate::hash::Priority;
use crate::utils::record::Record;
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

/// Records of one bucket, newest first. Names are unique within a chain.
#[derive(Debug, Default)]
pub struct Chain {
    records: VecDeque<Record>,
}

impl Chain {
    fn position(&self, name: &str) -> Option<usize> {
        // hashes can collide, so identity is always the name
        self.records.iter().position(|record| record.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&Record> {
        self.position(name).map(|index| &self.records[index])
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Record> {
        let index = self.position(name)?;
        self.records.get_mut(index)
    }

    /// Prepends `record` unless its name is already present, in which case it is handed back.
    pub fn insert(&mut self, record: Record) -> Result<&Record, Record> {
        if self.position(&record.name).is_some() {
            return Err(record);
        }
        self.records.push_front(record);
        Ok(&self.records[0])
    }

    pub fn remove(&mut self, name: &str) -> Option<Record> {
        let index = self.position(name)?;
        self.records.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug)]
pub struct Bucket {
    index: usize,
    chain: RwLock<Chain>,
}

impl Bucket {
    pub fn new(index: usize) -> Self {
        Bucket {
            index,
            chain: RwLock::new(Chain::default()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /**
        Blocks until the shared lock is granted, runs `f` on the chain and releases.
        Both transitions are logged and counted, whatever `f` returns. The release line is
        written while the lock is still held, so a replay of the log never shows two
        holders overlapping.
    */
    pub fn with_read<R>(
        &self,
        audit: &AuditLog,
        priority: Priority,
        f: impl FnOnce(&Chain) -> R,
    ) -> R {
        let guard = self.chain.read();
        audit.lock_acquired(priority, LockMode::Read);
        debug!(bucket = self.index, priority, "read lock acquired");
        let result = f(&*guard);
        audit.lock_released(priority, LockMode::Read);
        drop(guard);
        debug!(bucket = self.index, priority, "read lock released");
        result
    }

    /**
        Exclusive counterpart of [`Bucket::with_read`]: no reader or other writer can
        observe the chain while `f` runs.
    */
    pub fn with_write<R>(
        &self,
        audit: &AuditLog,
        priority: Priority,
        f: impl FnOnce(&mut Chain) -> R,
    ) -> R {
        let mut guard = self.chain.write();
        audit.lock_acquired(priority, LockMode::Write);
        debug!(bucket = self.index, priority, "write lock acquired");
        let result = f(&mut *guard);
        audit.lock_released(priority, LockMode::Write);
        drop(guard);
        debug!(bucket = self.index, priority, "write lock released");
        result
    }

    /// Unlocked access; holding `&mut self` already rules out every other user.
    pub fn chain_mut(&mut self) -> &mut Chain {
        self.chain.get_mut()
    }
}
