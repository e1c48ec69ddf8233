//! Batch execution of searches and mutations against one shared tree.
//!
//! A fixed worker pool runs a fixed batch: search workers drain the search
//! queue, modify workers drain the mutation queue, and no mutation starts
//! until every queued search has completed. Workers all block on a start
//! [`Gate`] until the whole pool exists, so spawn order never leaks into the
//! execution order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::gate::{Countdown, Gate};
use crate::rbtree::RbTree;

/// One queued work item, as given in the input batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search(i64),
    Insert(i64),
    Delete(i64),
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Insert(i64),
    Delete(i64),
}

/// What executing a work item produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Search verdict.
    Found(bool),
    /// Mutation went through.
    Applied,
    /// Delete of a key that was not there; the run keeps going.
    Rejected,
}

/// One line of the execution log, appended exactly once per executed item in
/// completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub worker: usize,
    pub op: Operation,
    pub outcome: Outcome,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, key) = match self.op {
            Operation::Search(key) => ("search", key),
            Operation::Insert(key) => ("insert", key),
            Operation::Delete(key) => ("delete", key),
        };
        let result = match self.outcome {
            Outcome::Found(true) => "true",
            Outcome::Found(false) => "false",
            Outcome::Applied => "ok",
            Outcome::Rejected => "not found",
        };
        write!(f, "{name}({key}) -> {result}, performed by worker {}", self.worker)
    }
}

/// Whether a worker keeps pulling items or stops after one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Workers loop until their queue is empty.
    #[default]
    DrainQueue,
    /// Each worker executes at most one item. A pool smaller than its queue
    /// is rejected up front rather than stranding items.
    OneItemPerWorker,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Search workers, numbered `0..search_workers`.
    pub search_workers: usize,
    /// Modify workers, numbered after the search workers.
    pub modify_workers: usize,
    pub mode: DrainMode,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{items} search(es) queued but no search workers configured")]
    NoSearchWorkers { items: usize },
    #[error("{items} mutation(s) queued but no modify workers configured")]
    NoModifyWorkers { items: usize },
    #[error("one-item mode leaves {queue} items stranded: {items} queued for {workers} worker(s)")]
    PoolTooSmall { queue: &'static str, items: usize, workers: usize },
}

impl PoolConfig {
    /// A configuration that can never finish its batch is refused before any
    /// worker is armed.
    fn check(&self, searches: usize, mutations: usize) -> Result<(), DispatchError> {
        if searches > 0 && self.search_workers == 0 {
            return Err(DispatchError::NoSearchWorkers { items: searches });
        }
        if mutations > 0 && self.modify_workers == 0 {
            return Err(DispatchError::NoModifyWorkers { items: mutations });
        }
        if self.mode == DrainMode::OneItemPerWorker {
            if searches > self.search_workers {
                return Err(DispatchError::PoolTooSmall {
                    queue: "search",
                    items: searches,
                    workers: self.search_workers,
                });
            }
            if mutations > self.modify_workers {
                return Err(DispatchError::PoolTooSmall {
                    queue: "mutation",
                    items: mutations,
                    workers: self.modify_workers,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    /// Execution records in completion order.
    pub log: Vec<Record>,
    /// Wall clock from arming the pool to the last worker returning.
    pub elapsed: Duration,
}

struct Shared {
    tree: RwLock<RbTree>,
    start: Gate,
    searches: Mutex<VecDeque<i64>>,
    /// The reader-priority barrier: one arrival per completed search.
    searches_left: Countdown,
    mutations: Mutex<VecDeque<Mutation>>,
    log: Mutex<Vec<Record>>,
    mode: DrainMode,
}

/// Runs `ops` against `tree` and returns the execution log. The tree is left
/// in its final state.
pub fn run(tree: &mut RbTree, ops: &[Operation], config: PoolConfig) -> Result<RunOutcome, DispatchError> {
    let mut searches = VecDeque::new();
    let mut mutations = VecDeque::new();
    for &op in ops {
        match op {
            Operation::Search(key) => searches.push_back(key),
            Operation::Insert(key) => mutations.push_back(Mutation::Insert(key)),
            Operation::Delete(key) => mutations.push_back(Mutation::Delete(key)),
        }
    }
    config.check(searches.len(), mutations.len())?;

    let search_items = searches.len();
    let shared = Shared {
        tree: RwLock::new(std::mem::take(tree)),
        start: Gate::new(),
        searches: Mutex::new(searches),
        searches_left: Countdown::new(search_items),
        mutations: Mutex::new(mutations),
        log: Mutex::new(Vec::with_capacity(ops.len())),
        mode: config.mode,
    };

    info!(
        "arming {} search + {} modify workers over {} queued operation(s)",
        config.search_workers,
        config.modify_workers,
        ops.len(),
    );
    let started = Instant::now();
    thread::scope(|s| {
        for worker in 0..config.search_workers {
            let shared = &shared;
            s.spawn(move || reader(shared, worker));
        }
        for offset in 0..config.modify_workers {
            let shared = &shared;
            let worker = config.search_workers + offset;
            s.spawn(move || writer(shared, worker));
        }
        shared.start.open();
    });
    let elapsed = started.elapsed();

    *tree = shared.tree.into_inner().unwrap();
    let log = shared.log.into_inner().unwrap();
    info!("batch done: {} record(s) in {:?}", log.len(), elapsed);
    Ok(RunOutcome { log, elapsed })
}

/// Search-worker body. Reads run concurrently: each takes a read guard, and
/// no writer can hold the tree while the countdown is non-zero.
fn reader(shared: &Shared, worker: usize) {
    shared.start.wait();
    loop {
        let Some(key) = shared.searches.lock().unwrap().pop_front() else {
            return;
        };
        let found = shared.tree.read().unwrap().contains(key);
        let record = Record { worker, op: Operation::Search(key), outcome: Outcome::Found(found) };
        debug!("{record}");
        shared.log.lock().unwrap().push(record);
        // arrive only after the record exists: countdown zero must mean
        // every search fully completed, not merely claimed
        shared.searches_left.arrive();
        if shared.mode == DrainMode::OneItemPerWorker {
            return;
        }
    }
}

/// Modify-worker body. Blocks on the reader-priority barrier, then mutations
/// serialize through the write guard.
fn writer(shared: &Shared, worker: usize) {
    shared.start.wait();
    shared.searches_left.wait();
    loop {
        let Some(mutation) = shared.mutations.lock().unwrap().pop_front() else {
            return;
        };
        let mut tree = shared.tree.write().unwrap();
        let record = match mutation {
            Mutation::Insert(key) => {
                tree.insert(key);
                Record { worker, op: Operation::Insert(key), outcome: Outcome::Applied }
            }
            Mutation::Delete(key) => match tree.remove(key) {
                Ok(()) => Record { worker, op: Operation::Delete(key), outcome: Outcome::Applied },
                Err(missing) => {
                    warn!("worker {worker}: {missing}");
                    Record { worker, op: Operation::Delete(key), outcome: Outcome::Rejected }
                }
            },
        };
        debug!("{record}");
        // append before releasing the tree so log order tracks commit order
        shared.log.lock().unwrap().push(record);
        drop(tree);
        if shared.mode == DrainMode::OneItemPerWorker {
            return;
        }
    }
}
