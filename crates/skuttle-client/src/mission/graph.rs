//! Arena of tasks with dependency edges, run with bounded concurrency.
//!
//! Edges can only point at tasks added earlier, so every graph is acyclic
//! by construction. A task starts once all of its dependencies have
//! finished, whatever their result; dependencies order work, they do not
//! gate it.

use std::fmt;
use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    task: T,
    deps: Vec<TaskId>,
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<O> {
    Finished(O),
    /// The run was cancelled before the task started.
    Cancelled,
}

impl<O> TaskOutcome<O> {
    pub fn finished(self) -> Option<O> {
        match self {
            TaskOutcome::Finished(out) => Some(out),
            TaskOutcome::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskGraph<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> TaskGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task that starts after every task in `deps` has finished.
    ///
    /// # Panics
    ///
    /// If a dependency does not belong to this graph.
    pub fn add(&mut self, task: T, deps: &[TaskId]) -> TaskId {
        let id = TaskId(self.nodes.len());
        assert!(
            deps.iter().all(|dep| dep.0 < id.0),
            "dependency of {id} is not in the graph"
        );
        self.nodes.push(Node {
            task,
            deps: deps.to_vec(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn task(&self, id: TaskId) -> Option<&T> {
        self.nodes.get(id.0).map(|node| &node.task)
    }

    pub fn dependencies(&self, id: TaskId) -> &[TaskId] {
        self.nodes.get(id.0).map(|node| node.deps.as_slice()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &T)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (TaskId(i), &node.task))
    }

    /// Run every task, at most `max_parallel` at a time.
    ///
    /// Tasks not yet started when `cancel` fires report
    /// [`TaskOutcome::Cancelled`]; running tasks receive the token and are
    /// expected to check it between steps. Every task reports an outcome
    /// and outcomes are returned indexed by [`TaskId`].
    pub async fn run<O, F, Fut>(self, max_parallel: usize, cancel: CancellationToken, exec: F) -> Vec<TaskOutcome<O>>
    where
        F: Fn(TaskId, T, CancellationToken) -> Fut,
        Fut: Future<Output = O>,
    {
        let total = self.nodes.len();
        let semaphore = Semaphore::new(max_parallel.max(1));

        let mut waiting_on = vec![0usize; total];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); total];
        let mut tasks: Vec<Option<T>> = Vec::with_capacity(total);
        for (i, node) in self.nodes.into_iter().enumerate() {
            waiting_on[i] = node.deps.len();
            for dep in &node.deps {
                dependents[dep.0].push(i);
            }
            tasks.push(Some(node.task));
        }

        let mut outcomes: Vec<Option<TaskOutcome<O>>> = (0..total).map(|_| None).collect();
        let mut running = FuturesUnordered::new();

        let start = |i: usize, task: T| {
            let semaphore = &semaphore;
            let cancel = cancel.clone();
            let exec = &exec;
            async move {
                let id = TaskId(i);
                if cancel.is_cancelled() {
                    return (i, TaskOutcome::Cancelled);
                }
                let Ok(_permit) = semaphore.acquire().await else {
                    return (i, TaskOutcome::Cancelled);
                };
                if cancel.is_cancelled() {
                    return (i, TaskOutcome::Cancelled);
                }
                trace!(task = %id, "Task started");
                (i, TaskOutcome::Finished(exec(id, task, cancel).await))
            }
        };

        for i in 0..total {
            if waiting_on[i] == 0 {
                if let Some(task) = tasks[i].take() {
                    running.push(start(i, task));
                }
            }
        }

        while let Some((i, outcome)) = running.next().await {
            debug!(
                task = %TaskId(i),
                cancelled = matches!(outcome, TaskOutcome::Cancelled),
                "Task completed"
            );
            outcomes[i] = Some(outcome);
            for &next in &dependents[i] {
                waiting_on[next] -= 1;
                if waiting_on[next] == 0 {
                    if let Some(task) = tasks[next].take() {
                        running.push(start(next, task));
                    }
                }
            }
        }

        outcomes
            .into_iter()
            .map(|outcome| outcome.unwrap_or(TaskOutcome::Cancelled))
            .collect()
    }
}
