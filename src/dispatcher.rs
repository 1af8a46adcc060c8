//! Runs a batch of commands concurrently against one table and writes the final dump.
//!
//! By default every command gets its own thread. With `workers` set, commands are queued
//! and a fixed number of worker threads drain the queue; WAITING FOR MY TURN then marks
//! the moment a command is queued and AWAKENED FOR WORK the moment a worker takes it.

use crate::audit::{AuditLog, LockStats, ThreadEvent};
use crate::chained_hashing::table::{Table, TableError};
use crate::command::{execute, Command, Outcome};
use crate::config::{Config, DEFAULT_TASK_DELAY};
use crate::hash::{ConcurrentHash, Priority};
use crate::utils::record::Record;
use parking_lot::Mutex;
use std::io;
use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Unable to spawn a thread for command with priority {priority}")]
    Spawn {
        priority: Priority,
        #[source]
        source: io::Error,
    },
    #[error("Command with priority {priority} did not complete")]
    TaskFailed { priority: Priority },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub task_delay: Duration,
    pub workers: Option<NonZeroUsize>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        DispatchOptions {
            task_delay: DEFAULT_TASK_DELAY,
            workers: None,
        }
    }
}

impl From<&Config> for DispatchOptions {
    fn from(config: &Config) -> Self {
        DispatchOptions {
            task_delay: config.task_delay,
            workers: config.workers,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// One outcome per command, in submission order.
    pub outcomes: Vec<Outcome>,
    pub stats: LockStats,
    pub final_table: Vec<Record>,
}

type TaskResult = Result<Outcome, DispatchError>;

pub struct Dispatcher<S: ConcurrentHash = Table> {
    store: S,
    audit: AuditLog,
    options: DispatchOptions,
}

impl<S: ConcurrentHash> Dispatcher<S> {
    pub fn new(store: S, audit: AuditLog, options: DispatchOptions) -> Self {
        Dispatcher {
            store,
            audit,
            options,
        }
    }

    /**
        Executes every command, waits for all of them, then writes the lock totals and the
        final table to the audit log. The final dump reads the table without locks: by then
        the dispatcher holds the only reference to it.
    */
    pub fn run(mut self, commands: Vec<Command>) -> Result<RunReport, DispatchError> {
        info!(
            commands = commands.len(),
            workers = ?self.options.workers,
            "dispatching commands"
        );
        let results = match self.options.workers {
            None => self.run_per_command(commands),
            Some(workers) => self.run_pooled(commands, workers),
        };
        let outcomes = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let final_table = self.store.dump()?;
        self.audit.write_summary(&final_table);
        let stats = self.audit.stats();
        info!(
            acquisitions = stats.acquisitions,
            releases = stats.releases,
            records = final_table.len(),
            "all commands finished"
        );
        Ok(RunReport {
            outcomes,
            stats,
            final_table,
        })
    }

    fn run_per_command(&self, commands: Vec<Command>) -> Vec<TaskResult> {
        let store = &self.store;
        let audit = &self.audit;
        let delay = self.options.task_delay;
        thread::scope(|scope| {
            let handles: Vec<_> = commands
                .into_iter()
                .map(|command| {
                    let priority = command.priority;
                    let handle = thread::Builder::new()
                        .name(format!("command-{}", priority))
                        .spawn_scoped(scope, move || {
                            audit.event(priority, ThreadEvent::Waiting);
                            pause(delay);
                            audit.event(priority, ThreadEvent::Awakened);
                            run_task(store, audit, &command)
                        });
                    (priority, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(priority, handle)| match handle {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or(Err(DispatchError::TaskFailed { priority })),
                    Err(source) => Err(DispatchError::Spawn { priority, source }),
                })
                .collect()
        })
    }

    fn run_pooled(&self, commands: Vec<Command>, workers: NonZeroUsize) -> Vec<TaskResult> {
        let store = &self.store;
        let audit = &self.audit;
        let delay = self.options.task_delay;
        let priorities: Vec<Priority> = commands.iter().map(|c| c.priority).collect();

        let (queue, pending) = mpsc::channel::<(usize, Command)>();
        for (slot, command) in commands.into_iter().enumerate() {
            audit.event(command.priority, ThreadEvent::Waiting);
            // the receiver is alive until this function returns
            let _ = queue.send((slot, command));
        }
        drop(queue);
        let pending = Mutex::new(pending);
        let (done, finished) = mpsc::channel::<(usize, TaskResult)>();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers.get());
            for worker in 0..workers.get() {
                let (pending, done) = (&pending, done.clone());
                let spawned = thread::Builder::new()
                    .name(format!("worker-{}", worker))
                    .spawn_scoped(scope, move || loop {
                        // hold the queue only long enough to take one command
                        let next = pending.lock().recv();
                        let Ok((slot, command)) = next else { break };
                        pause(delay);
                        audit.event(command.priority, ThreadEvent::Awakened);
                        let _ = done.send((slot, run_task(store, audit, &command)));
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => error!(worker, %err, "unable to spawn worker"),
                }
            }
            for handle in handles {
                if handle.join().is_err() {
                    error!("worker panicked");
                }
            }
        });
        drop(done);

        let mut results: Vec<Option<TaskResult>> = priorities.iter().map(|_| None).collect();
        for (slot, result) in finished {
            results[slot] = Some(result);
        }
        results
            .into_iter()
            .zip(priorities)
            .map(|(result, priority)| {
                result.unwrap_or(Err(DispatchError::TaskFailed { priority }))
            })
            .collect()
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn run_task<S: ConcurrentHash + ?Sized>(
    store: &S,
    audit: &AuditLog,
    command: &Command,
) -> TaskResult {
    let outcome = execute(store, audit, command)?;
    println!("{}", outcome);
    Ok(outcome)
}
