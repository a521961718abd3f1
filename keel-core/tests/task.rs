#[cfg(test)]
mod tests {
    use keel_core::{Consumer, Job, KeelError, Result, Task, TaskError, TaskLock, error_kind};
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };
    use tokio::runtime::{Builder, Runtime};

    fn runtime() -> Runtime {
        Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(4)
            .build()
            .unwrap()
    }

    fn job<R>(runtime: &Runtime, run: impl FnOnce() -> Result<R> + Send + 'static) -> Job<R> {
        Job {
            sql: "SELECT 1".into(),
            handle: runtime.handle().clone(),
            run: Box::new(run),
        }
    }

    #[test]
    fn task_success() {
        let runtime = runtime();
        let consumed = Arc::new(AtomicUsize::new(0));
        let consumer: Consumer<i32> = {
            let consumed = consumed.clone();
            Box::new(move |v| consumed.store(*v as usize, Ordering::SeqCst))
        };
        let task = Task::new(job(&runtime, || Ok(21 * 2)), Some(consumer), None);
        assert!(!task.is_done());
        task.complete().unwrap();
        assert!(task.is_done());
        assert_eq!(consumed.load(Ordering::SeqCst), 42);
        assert_eq!(task.result().unwrap(), 42);
        assert_eq!(task.result().unwrap(), 42);
        assert_eq!(task.into_result().unwrap(), 42);
    }

    #[test]
    fn task_failure_is_shared() {
        let runtime = runtime();
        let task = Task::new(
            job::<()>(&runtime, || Err(KeelError::argument("bad column"))),
            None,
            None,
        );
        let first = task.complete().err().unwrap();
        let second = task.complete().err().unwrap();
        let third = task.result().err().unwrap();
        for error in [&first, &second, &third] {
            assert!(matches!(error_kind(error), Some(KeelError::Argument(v)) if v == "bad column"));
            let task_error = error.downcast_ref::<TaskError>().unwrap();
            assert_eq!(task_error.sql, "SELECT 1");
            assert!(task_error.location.file().ends_with("task.rs"));
        }
        let causes = [&first, &second, &third].map(|e| {
            Arc::as_ptr(&e.downcast_ref::<TaskError>().unwrap().cause)
        });
        assert_eq!(causes[0], causes[1]);
        assert_eq!(causes[1], causes[2]);
    }

    #[test]
    fn task_started_once() {
        let runtime = runtime();
        let task = Task::new(job(&runtime, || Ok(())), None, None);
        task.start().unwrap();
        let error = task.start().err().unwrap();
        assert!(matches!(error_kind(&error), Some(KeelError::State(..))));
        task.complete().unwrap();
    }

    #[test]
    fn task_result_while_running() {
        let runtime = runtime();
        let (sender, receiver) = mpsc::channel::<()>();
        let task = Task::new(
            job(&runtime, move || {
                receiver.recv().ok();
                Ok(String::from("done"))
            }),
            None,
            None,
        );
        task.start().unwrap();
        let error = task.result().err().unwrap();
        assert!(matches!(error_kind(&error), Some(KeelError::State(..))));
        sender.send(()).unwrap();
        assert_eq!(task.into_result().unwrap(), "done");
    }

    #[test]
    fn task_finally() {
        let runtime = runtime();
        let calls = Arc::new(AtomicUsize::new(0));
        let (sender, receiver) = mpsc::channel::<()>();
        let task = Task::new(
            job(&runtime, move || {
                receiver.recv().ok();
                Ok(())
            }),
            None,
            None,
        );
        let counter = calls.clone();
        task.on_finally(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.start().unwrap();
        sender.send(()).unwrap();
        task.complete().unwrap();
        // Callbacks run after waiters are notified.
        for _ in 0..100 {
            if calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let counter = calls.clone();
        task.on_finally(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn task_panic() {
        let runtime = runtime();
        let task = Task::new(job::<()>(&runtime, || panic!("boom")), None, None);
        let error = task.complete().err().unwrap();
        assert!(matches!(error_kind(&error), Some(KeelError::State(v)) if v.contains("boom")));
    }

    #[test]
    fn task_consumer_panic() {
        let runtime = runtime();
        let finished = Arc::new(AtomicBool::new(false));
        let consumer: Consumer<i32> = Box::new(|_| panic!("consumer boom"));
        let task = Task::new(job(&runtime, || Ok(1)), Some(consumer), None);
        {
            let finished = finished.clone();
            task.on_finally(move || finished.store(true, Ordering::SeqCst));
        }
        let error = task.complete().err().unwrap();
        assert!(matches!(
            error_kind(&error),
            Some(KeelError::State(v)) if v.contains("consumer boom")
        ));
        assert!(error.downcast_ref::<TaskError>().is_some());
        assert!(task.result().is_err());
        for _ in 0..100 {
            if finished.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn task_lock_serializes() {
        let runtime = runtime();
        let lock: TaskLock = Arc::new(Mutex::new(()));
        let busy = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let tasks = (0..4)
            .map(|_| {
                let busy = busy.clone();
                let overlaps = overlaps.clone();
                let task = Task::new(
                    job(&runtime, move || {
                        if busy.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(10));
                        busy.store(false, Ordering::SeqCst);
                        Ok(())
                    }),
                    None,
                    Some(lock.clone()),
                );
                task.start().unwrap();
                task
            })
            .collect::<Vec<_>>();
        for task in &tasks {
            task.complete().unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
