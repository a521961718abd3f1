#[cfg(test)]
mod tests {
    use keel_core::{
        Connection, ConnectionGuard, Connections, Connector, Job, KeelError, Result, RowCursor,
        RowsAffected, Task, error_kind,
    };
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicUsize, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };
    use tokio::runtime::Builder;

    #[derive(Default)]
    struct Stats {
        opened: AtomicUsize,
        commits: AtomicUsize,
    }

    struct FakeConnection {
        stats: Arc<Stats>,
        closed: Arc<AtomicBool>,
        transaction: bool,
    }

    impl Connection for FakeConnection {
        fn execute(&mut self, sql: &str) -> Result<RowsAffected> {
            match sql {
                "BEGIN" => self.transaction = true,
                "COMMIT" => {
                    self.transaction = false;
                    self.stats.commits.fetch_add(1, Ordering::SeqCst);
                }
                "ROLLBACK" => self.transaction = false,
                _ => {}
            }
            Ok(RowsAffected::default())
        }

        fn fetch<'s>(&'s mut self, _sql: &str) -> Result<RowCursor<'s>> {
            Ok(Box::new(std::iter::empty()))
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        fn in_transaction(&self) -> bool {
            self.transaction
        }
    }

    fn connector(stats: Arc<Stats>, closed: Arc<AtomicBool>) -> Connector<FakeConnection> {
        Arc::new(move || {
            stats.opened.fetch_add(1, Ordering::SeqCst);
            closed.store(false, Ordering::SeqCst);
            Ok(FakeConnection {
                stats: stats.clone(),
                closed: closed.clone(),
                transaction: false,
            })
        })
    }

    #[test]
    fn single_is_lazy_and_shared() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections = Connections::new(1, Duration::from_secs(1), connector(stats.clone(), closed));
        assert_eq!(stats.opened.load(Ordering::SeqCst), 0);
        drop(connections.acquire().unwrap());
        drop(connections.acquire().unwrap());
        assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
        assert!(matches!(connections.acquire().unwrap(), ConnectionGuard::Single(..)));
    }

    #[test]
    fn single_reopens_closed() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections =
            Connections::new(1, Duration::from_secs(1), connector(stats.clone(), closed.clone()));
        drop(connections.acquire().unwrap());
        closed.store(true, Ordering::SeqCst);
        let connection = connections.acquire().unwrap();
        assert!(!connection.is_closed());
        assert_eq!(stats.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn single_commits_on_release() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections = Connections::new(1, Duration::from_secs(1), connector(stats.clone(), closed));
        {
            let mut connection = connections.acquire().unwrap();
            connection.begin().unwrap();
            assert!(connection.in_transaction());
        }
        assert_eq!(stats.commits.load(Ordering::SeqCst), 1);
        assert!(!connections.acquire().unwrap().in_transaction());
        {
            let mut connection = connections.acquire().unwrap();
            connection.begin().unwrap();
            connection.rollback().unwrap();
        }
        assert_eq!(stats.commits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_is_reentrant() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections = Connections::new(1, Duration::from_secs(1), connector(stats.clone(), closed));
        let mut outer = connections.acquire().unwrap();
        outer.begin().unwrap();
        {
            let mut inner = connections.acquire().unwrap();
            assert!(inner.in_transaction());
            inner.execute("INSERT INTO ledger VALUES (1)").unwrap();
        }
        assert_eq!(stats.commits.load(Ordering::SeqCst), 0);
        assert!(outer.in_transaction());
        drop(outer);
        assert_eq!(stats.commits.load(Ordering::SeqCst), 1);
        assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_owner_runs_tasks_inline() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(Connections::new(
            1,
            Duration::from_secs(1),
            connector(stats.clone(), closed),
        ));
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(2)
            .build()
            .unwrap();
        let (sender, receiver) = mpsc::channel();
        let handle = runtime.handle().clone();
        let owner = {
            let connections = connections.clone();
            thread::spawn(move || {
                let mut connection = connections.acquire().unwrap();
                connection.begin().unwrap();
                let task = Task::new(
                    Job {
                        sql: "INSERT INTO ledger VALUES (2)".into(),
                        handle,
                        run: Box::new({
                            let connections = connections.clone();
                            move || -> Result<_> {
                                let connection = connections.acquire()?;
                                Ok((thread::current().id(), connection.in_transaction()))
                            }
                        }),
                    },
                    None,
                    None,
                );
                let outcome = task.into_result();
                connection.commit().unwrap();
                sender.send((thread::current().id(), outcome.unwrap())).unwrap();
            })
        };
        let (owner_thread, (task_thread, in_transaction)) =
            receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        owner.join().unwrap();
        assert_eq!(owner_thread, task_thread);
        assert!(in_transaction);
        assert_eq!(stats.commits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_serializes_callers() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(Connections::new(
            1,
            Duration::from_secs(1),
            connector(stats.clone(), closed),
        ));
        let busy = Arc::new(AtomicBool::new(false));
        let handles = (0..4)
            .map(|_| {
                let connections = connections.clone();
                let busy = busy.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        let _connection = connections.acquire().unwrap();
                        assert!(!busy.swap(true, Ordering::SeqCst));
                        thread::sleep(Duration::from_millis(1));
                        busy.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pool_caps_and_times_out() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections =
            Connections::new(2, Duration::from_millis(50), connector(stats.clone(), closed));
        let Connections::Pool(pool) = &connections else {
            panic!("Expected a pool");
        };
        let first = connections.acquire().unwrap();
        let second = connections.acquire().unwrap();
        assert_eq!(pool.total(), 2);
        let error = connections.acquire().err().unwrap();
        assert!(matches!(error_kind(&error), Some(KeelError::Connection(..))));
        drop(first);
        let third = connections.acquire().unwrap();
        assert_eq!(stats.opened.load(Ordering::SeqCst), 2);
        drop(second);
        drop(third);
        assert_eq!(pool.total(), 2);
    }

    #[test]
    fn pool_waits_for_release() {
        let stats = Arc::new(Stats::default());
        let closed = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(Connections::new(
            2,
            Duration::from_secs(5),
            connector(stats.clone(), closed),
        ));
        let first = connections.acquire().unwrap();
        let _second = connections.acquire().unwrap();
        let waiter = {
            let connections = connections.clone();
            thread::spawn(move || connections.acquire().map(|_| ()).is_ok())
        };
        thread::sleep(Duration::from_millis(20));
        drop(first);
        assert!(waiter.join().unwrap());
        assert_eq!(stats.opened.load(Ordering::SeqCst), 2);
    }
}
