use crate::audit::{AuditLog, Operation};
use crate::chained_hashing::bucket::{Bucket, Chain};
use crate::hash::{ConcurrentHash, Priority, Salary, SalaryUpdate};
use crate::utils::hashing::{bucket_index, calculate_hash};
use crate::utils::record::Record;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Duplicate key insertion for {name} ({hash})")]
    DuplicateKey { name: String, hash: u32 },
    #[error("Item {name} ({hash}) does not exist")]
    NotFound { name: String, hash: u32 },
    #[error("Unable to reserve {requested} slots for {what}")]
    ResourceExhausted { what: &'static str, requested: usize },
    #[error("A table needs at least one bucket")]
    InvalidBucketCount,
}

impl TableError {
    /// Errors that leave the table unusable rather than describe a single command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TableError::ResourceExhausted { .. } | TableError::InvalidBucketCount
        )
    }
}

/// Fixed-size array of chained buckets, each behind its own reader/writer lock.
#[derive(Debug)]
pub struct Table {
    buckets: Box<[Bucket]>,
}

impl Table {
    pub fn new(num_buckets: usize) -> Result<Self, TableError> {
        if num_buckets == 0 {
            return Err(TableError::InvalidBucketCount);
        }
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(num_buckets)
            .map_err(|_| TableError::ResourceExhausted {
                what: "buckets",
                requested: num_buckets,
            })?;
        buckets.extend((0..num_buckets).map(Bucket::new));
        Ok(Table {
            buckets: buckets.into_boxed_slice(),
        })
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_for(&self, name: &str) -> (u32, &Bucket) {
        let hash = calculate_hash(name);
        (hash, &self.buckets[bucket_index(hash, self.buckets.len())])
    }
}

fn append_chain(snapshot: &mut Vec<Record>, chain: &Chain) -> Result<(), TableError> {
    snapshot
        .try_reserve(chain.len())
        .map_err(|_| TableError::ResourceExhausted {
            what: "snapshot",
            requested: snapshot.len() + chain.len(),
        })?;
    snapshot.extend(chain.iter().cloned());
    Ok(())
}

/// Stable, so equal hashes keep their scan order.
fn sort_snapshot(snapshot: &mut [Record]) {
    snapshot.sort_by_key(|record| record.hash);
}

impl ConcurrentHash for Table {
    fn insert(
        &self,
        audit: &AuditLog,
        name: &str,
        salary: Salary,
        priority: Priority,
    ) -> Result<Record, TableError> {
        let (hash, bucket) = self.bucket_for(name);
        audit.operation(priority, Operation::Insert { name, salary });
        bucket.with_write(audit, priority, |chain| {
            chain
                .insert(Record::new(name, salary))
                .map(Record::clone)
                .map_err(|_| TableError::DuplicateKey {
                    name: name.to_string(),
                    hash,
                })
        })
    }

    fn delete(
        &self,
        audit: &AuditLog,
        name: &str,
        priority: Priority,
    ) -> Result<Record, TableError> {
        let (hash, bucket) = self.bucket_for(name);
        audit.operation(priority, Operation::Delete { name });
        bucket.with_write(audit, priority, |chain| {
            chain.remove(name).ok_or_else(|| TableError::NotFound {
                name: name.to_string(),
                hash,
            })
        })
    }

    fn update(
        &self,
        audit: &AuditLog,
        name: &str,
        salary: Salary,
        priority: Priority,
    ) -> Result<SalaryUpdate, TableError> {
        let (hash, bucket) = self.bucket_for(name);
        audit.operation(priority, Operation::Update { name, salary });
        bucket.with_write(audit, priority, |chain| match chain.find_mut(name) {
            Some(record) => {
                let old_salary = std::mem::replace(&mut record.salary, salary);
                Ok(SalaryUpdate {
                    record: record.clone(),
                    old_salary,
                })
            }
            None => Err(TableError::NotFound {
                name: name.to_string(),
                hash,
            }),
        })
    }

    fn search(
        &self,
        audit: &AuditLog,
        name: &str,
        priority: Priority,
    ) -> Result<Record, TableError> {
        let (hash, bucket) = self.bucket_for(name);
        audit.operation(priority, Operation::Search { name });
        bucket.with_read(audit, priority, |chain| {
            chain.find(name).cloned().ok_or_else(|| TableError::NotFound {
                name: name.to_string(),
                hash,
            })
        })
    }

    fn print(&self, audit: &AuditLog, priority: Priority) -> Result<Vec<Record>, TableError> {
        audit.operation(priority, Operation::Print);
        let mut snapshot = Vec::new();
        // One bucket at a time: never two locks held, so no lock order to violate.
        for bucket in self.buckets.iter() {
            bucket.with_read(audit, priority, |chain| append_chain(&mut snapshot, chain))?;
        }
        sort_snapshot(&mut snapshot);
        Ok(snapshot)
    }

    fn dump(&mut self) -> Result<Vec<Record>, TableError> {
        let mut snapshot = Vec::new();
        for bucket in self.buckets.iter_mut() {
            append_chain(&mut snapshot, bucket.chain_mut())?;
        }
        sort_snapshot(&mut snapshot);
        Ok(snapshot)
    }
}
