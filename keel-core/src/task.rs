use crate::{
    Error, Job, KeelError, Result, TaskError, pool::owns_single_connection, truncate_long,
    util::lock,
};
use std::{
    any::Any,
    fmt::{self, Debug},
    mem,
    panic::{self, AssertUnwindSafe, Location},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};
use tokio::runtime::Handle;

/// Receives the result of a successful task before it is stored.
pub type Consumer<R> = Box<dyn FnOnce(&R) + Send>;
/// Serializes tasks sharing it, held while the job runs.
pub type TaskLock = Arc<Mutex<()>>;

enum TaskState<R> {
    Pending,
    Succeeded(Option<R>),
    Failed(Arc<Error>),
}

struct Finalizers {
    done: bool,
    callbacks: Vec<Box<dyn FnOnce() + Send>>,
}

struct Shared<R> {
    location: &'static Location<'static>,
    sql: String,
    state: Mutex<TaskState<R>>,
    done: Condvar,
    finalizers: Mutex<Finalizers>,
}

struct Pending<R> {
    handle: Handle,
    run: Box<dyn FnOnce() -> Result<R> + Send>,
    consumer: Option<Consumer<R>>,
    lock: Option<TaskLock>,
}

/// Handle to a query running on the worker threads of a database.
///
/// A task is started at most once, runs to completion and keeps its outcome:
/// observing a failed task any number of times yields the same cause.
pub struct Task<R> {
    shared: Arc<Shared<R>>,
    pending: Mutex<Option<Pending<R>>>,
}

impl<R: Send + 'static> Task<R> {
    /// Wraps `job` without starting it.
    #[track_caller]
    pub fn new(job: Job<R>, consumer: Option<Consumer<R>>, lock: Option<TaskLock>) -> Self {
        Self::with_location(Location::caller(), job, consumer, lock)
    }

    pub(crate) fn with_location(
        location: &'static Location<'static>,
        job: Job<R>,
        consumer: Option<Consumer<R>>,
        lock: Option<TaskLock>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                location,
                sql: job.sql,
                state: Mutex::new(TaskState::Pending),
                done: Condvar::new(),
                finalizers: Mutex::new(Finalizers {
                    done: false,
                    callbacks: Vec::new(),
                }),
            }),
            pending: Mutex::new(Some(Pending {
                handle: job.handle,
                run: job.run,
                consumer,
                lock,
            })),
        }
    }

    /// Submits the task to the worker threads, a second call is a state error.
    ///
    /// A thread owning a single shared connection runs the task itself, the
    /// call returns once the task is done.
    pub fn start(&self) -> Result<&Self> {
        let Some(pending) = lock(&self.pending).take() else {
            return Err(KeelError::state(format!(
                "Task created at {} was already started",
                self.shared.location
            )));
        };
        let shared = self.shared.clone();
        let Pending {
            handle,
            run,
            consumer,
            lock: task_lock,
        } = pending;
        if owns_single_connection() {
            shared.run(run, consumer, task_lock);
        } else {
            handle.spawn_blocking(move || shared.run(run, consumer, task_lock));
        }
        Ok(self)
    }

    pub fn is_done(&self) -> bool {
        !matches!(*lock(&self.shared.state), TaskState::Pending)
    }

    /// Blocks until the task is done, starting it first if needed.
    pub fn complete(&self) -> Result<&Self> {
        if lock(&self.pending).is_some() {
            self.start()?;
        }
        let state = self.wait();
        if let TaskState::Failed(cause) = &*state {
            return Err(self.shared.failure(cause.clone()));
        }
        Ok(self)
    }

    /// Blocks until the task is done and moves its result out.
    pub fn into_result(self) -> Result<R> {
        self.complete()?;
        let mut state = self.wait();
        match mem::replace(&mut *state, TaskState::Succeeded(None)) {
            TaskState::Succeeded(Some(result)) => Ok(result),
            TaskState::Failed(cause) => Err(self.shared.failure(cause)),
            _ => Err(KeelError::state("The result of the task was already taken")),
        }
    }

    /// Copy of the result, a state error while the task is still running.
    pub fn result(&self) -> Result<R>
    where
        R: Clone,
    {
        match &*lock(&self.shared.state) {
            TaskState::Pending => Err(KeelError::state(format!(
                "Task created at {} is not done",
                self.shared.location
            ))),
            TaskState::Succeeded(Some(result)) => Ok(result.clone()),
            TaskState::Succeeded(None) => {
                Err(KeelError::state("The result of the task was already taken"))
            }
            TaskState::Failed(cause) => Err(self.shared.failure(cause.clone())),
        }
    }

    /// Runs `callback` once the task is done, immediately when it already is.
    pub fn on_finally(&self, callback: impl FnOnce() + Send + 'static) {
        let mut finalizers = lock(&self.shared.finalizers);
        if finalizers.done {
            drop(finalizers);
            callback();
        } else {
            finalizers.callbacks.push(Box::new(callback));
        }
    }

    fn wait(&self) -> MutexGuard<'_, TaskState<R>> {
        let mut state = lock(&self.shared.state);
        while matches!(*state, TaskState::Pending) {
            state = self
                .shared
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state
    }
}

impl<R> Shared<R> {
    fn run(
        &self,
        run: Box<dyn FnOnce() -> Result<R> + Send>,
        consumer: Option<Consumer<R>>,
        task_lock: Option<TaskLock>,
    ) {
        let guard = task_lock.as_ref().map(|v| lock(v));
        let outcome = panic::catch_unwind(AssertUnwindSafe(run))
            .unwrap_or_else(|payload| Err(panicked("task", payload)))
            .and_then(|result| match consumer {
                Some(consumer) => panic::catch_unwind(AssertUnwindSafe(|| consumer(&result)))
                    .map(|_| result)
                    .map_err(|payload| panicked("consumer of the task", payload)),
                None => Ok(result),
            });
        let state = match outcome {
            Ok(result) => TaskState::Succeeded(Some(result)),
            Err(e) => {
                log::error!(
                    "Task created at {} failed while running `{}`: {:#}",
                    self.location,
                    truncate_long!(self.sql),
                    e
                );
                TaskState::Failed(Arc::new(e))
            }
        };
        *lock(&self.state) = state;
        self.done.notify_all();
        drop(guard);
        let callbacks = {
            let mut finalizers = lock(&self.finalizers);
            finalizers.done = true;
            mem::take(&mut finalizers.callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    fn failure(&self, cause: Arc<Error>) -> Error {
        TaskError {
            location: self.location,
            sql: self.sql.clone(),
            cause,
        }
        .into()
    }
}

fn panicked(what: &str, payload: Box<dyn Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|v| v.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    KeelError::state(format!("The {what} panicked: {message}"))
}

impl<R> Debug for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("location", &self.shared.location)
            .field("sql", &truncate_long!(self.shared.sql).to_string())
            .finish_non_exhaustive()
    }
}
