mod delete;
mod insert;
mod schema;
mod select;
mod update;

pub use delete::*;
pub use insert::*;
pub use schema::*;
pub use select::*;
pub use update::*;

use crate::{Consumer, Result, Task, TaskLock};
use std::{
    fmt::{self, Debug},
    panic::Location,
};
use tokio::runtime::Handle;

/// Rendered statement together with the closure executing it.
pub struct Job<R> {
    /// Text of the statement, kept for diagnostics.
    pub sql: String,
    /// Runtime of the database, queued jobs run on its blocking threads.
    pub handle: Handle,
    pub run: Box<dyn FnOnce() -> Result<R> + Send>,
}

impl<R: 'static> Job<R> {
    /// Same job with `f` applied to its result.
    pub fn map<T>(self, f: impl FnOnce(R) -> Result<T> + Send + 'static) -> Job<T> {
        let run = self.run;
        Job {
            sql: self.sql,
            handle: self.handle,
            run: Box::new(move || run().and_then(f)),
        }
    }
}

impl<R> Debug for Job<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("sql", &self.sql).finish_non_exhaustive()
    }
}

/// Statement that can run on the calling thread or be queued on the workers of its database.
///
/// Building the job renders the SQL, so rendering errors surface before anything runs.
pub trait Query: Sized {
    type Output: Send + 'static;

    fn into_job(self) -> Result<Job<Self::Output>>;

    /// Runs on the current thread and returns the result.
    fn complete(self) -> Result<Self::Output> {
        let job = self.into_job()?;
        (job.run)()
    }

    /// Starts a task on the worker threads.
    #[track_caller]
    fn queue(self) -> Result<Task<Self::Output>> {
        let location = Location::caller();
        let task = Task::with_location(location, self.into_job()?, None, None);
        task.start()?;
        Ok(task)
    }

    /// Same as [`Query::queue`], `consumer` receives the result and `lock` is held while the task runs.
    #[track_caller]
    fn queue_with(
        self,
        consumer: impl FnOnce(&Self::Output) + Send + 'static,
        lock: Option<TaskLock>,
    ) -> Result<Task<Self::Output>> {
        let location = Location::caller();
        let consumer: Consumer<Self::Output> = Box::new(consumer);
        let task = Task::with_location(location, self.into_job()?, Some(consumer), lock);
        task.start()?;
        Ok(task)
    }
}
