//! Racing spawned tasks without cancelling the losers.
//!
//! Dropping a tokio `JoinHandle` detaches the task instead of aborting it, so
//! whatever loses a race keeps running unless the caller aborts it.

use futures::future::select_all;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};

/// The first task to finish, plus every task still running.
pub struct FirstOf<T> {
    pub index: usize,
    pub output: Result<T, JoinError>,
    /// Unfinished tasks, in no particular order.
    pub pending: Vec<JoinHandle<T>>,
}

/// Wait for the first of `tasks` to finish. Returns `None` for an empty list.
pub async fn first_of<T>(tasks: Vec<JoinHandle<T>>) -> Option<FirstOf<T>> {
    if tasks.is_empty() {
        return None;
    }
    let (output, index, pending) = select_all(tasks).await;
    Some(FirstOf {
        index,
        output,
        pending,
    })
}

enum Lane<T> {
    Work(T),
    Timer,
}

pub enum Deadline<T> {
    /// The work finished (or panicked) before the deadline.
    Finished(Result<T, JoinError>),
    /// The deadline passed first; the work is still running.
    Expired(Straggler<T>),
}

/// Work that missed its deadline and is still running.
pub struct Straggler<T> {
    lanes: Vec<JoinHandle<Lane<T>>>,
}

impl<T> Straggler<T> {
    /// Wait for the work to finish. `None` if it panicked or was aborted.
    pub async fn join(self) -> Option<T> {
        for lane in self.lanes {
            if let Ok(Lane::Work(value)) = lane.await {
                return Some(value);
            }
        }
        None
    }
}

/// Run `work` on its own task and race it against a timer.
pub async fn with_deadline<F>(work: F, deadline: Duration) -> Deadline<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let lanes = vec![
        tokio::spawn(async move { Lane::Work(work.await) }),
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            Lane::Timer
        }),
    ];

    let Some(first) = first_of(lanes).await else {
        return Deadline::Expired(Straggler { lanes: Vec::new() });
    };

    match first.output {
        Ok(Lane::Timer) => Deadline::Expired(Straggler {
            lanes: first.pending,
        }),
        Ok(Lane::Work(value)) => {
            abort_all(&first.pending);
            Deadline::Finished(Ok(value))
        }
        Err(e) => {
            abort_all(&first.pending);
            Deadline::Finished(Err(e))
        }
    }
}

fn abort_all<T>(tasks: &[JoinHandle<T>]) {
    for task in tasks {
        task.abort();
    }
}
