use std::sync::atomic::{AtomicUsize, Ordering};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::err::{BatchError, PoolError, TaskFailure};
use super::{run_batch, PoolState, ThreadPool};
use crate::core::configuration::Configuration;
use serial_test::serial;

pub fn fib(n: usize) -> usize {
    match n {
        0 | 1 => 1,
        _ => fib(n - 2) + fib(n - 1),
    }
}

#[test]
#[serial]
fn test_threadpool() {
    let mut tp = ThreadPool::new().unwrap();
    assert_eq!(tp.state(), PoolState::Running);
    assert_eq!(tp.num_workers(), num_cpus::get());

    let res = tp.par_map(1..30, fib).unwrap();
    assert_eq!(res, (1..30).map(fib).collect::<Vec<_>>());
}

#[test]
#[serial]
fn test_par_map() {
    let mut tp = ThreadPool::with_capacity(4).unwrap();

    let res: Vec<String> = tp
        .par_map(0..10000, |el: usize| -> String {
            "Hello from: ".to_string() + &el.to_string()
        })
        .unwrap();

    assert_eq!(res.len(), 10000);
    for (i, str) in res.into_iter().enumerate() {
        assert_eq!(str, "Hello from: ".to_string() + &i.to_string());
    }
}

#[test]
#[serial]
fn test_par_map_order_with_uneven_work() {
    // Early tasks are the slowest, so they complete last.
    for workers in [1, 2, 8] {
        let mut tp = ThreadPool::with_capacity(workers).unwrap();
        let res = tp
            .par_map(0..8u64, |el| {
                thread::sleep(Duration::from_millis((8 - el) * 5));
                el
            })
            .unwrap();
        assert_eq!(res, (0..8).collect::<Vec<_>>());
    }
}

#[test]
#[serial]
fn test_empty_batch() {
    let mut tp = ThreadPool::with_capacity(2).unwrap();
    let res = tp.par_map(Vec::<u8>::new(), |el| el).unwrap();
    assert!(res.is_empty());
}

#[test]
#[serial]
fn test_chunked_batch() {
    let mut tp = ThreadPool::with_capacity(3).unwrap();
    for chunk_size in [0, 1, 4, 100] {
        let res = tp
            .try_par_map_chunked(0..50, chunk_size, |el: i32| Ok::<_, String>(-el))
            .unwrap();
        assert_eq!(res, (0..50).map(|el| -el).collect::<Vec<_>>());
    }
}

#[test]
#[serial]
fn test_pool_is_reusable() {
    let mut tp = ThreadPool::with_capacity(2).unwrap();
    for round in 0..5 {
        let res = tp.par_map(0..20, move |el: i32| el + round).unwrap();
        assert_eq!(res, (0..20).map(|el| el + round).collect::<Vec<_>>());
    }
}

#[test]
#[serial]
fn test_task_error_is_propagated() {
    let mut tp = ThreadPool::with_capacity(2).unwrap();
    let err = tp
        .try_par_map(0..10, |el: i32| {
            if el == 7 {
                Err(format!("bad element {}", el))
            } else {
                Ok(el)
            }
        })
        .unwrap_err();

    match err {
        BatchError::Task {
            index,
            cause: TaskFailure::Error(msg),
        } => {
            assert_eq!(index, 7);
            assert_eq!(msg, "bad element 7");
        }
        other => panic!("Unexpected error: {}", other),
    }

    // The pool survives a failed batch.
    assert_eq!(tp.state(), PoolState::Running);
    assert_eq!(tp.par_map(0..3, |el: i32| el).unwrap(), vec![0, 1, 2]);
}

#[test]
#[serial]
fn test_failure_skips_remaining_tasks() {
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executed);
    let mut tp = ThreadPool::with_capacity(1).unwrap();

    let err = tp
        .try_par_map(0..100, move |el: usize| {
            counter.fetch_add(1, Ordering::AcqRel);
            if el == 0 {
                Err("first task fails")
            } else {
                Ok(el)
            }
        })
        .unwrap_err();

    assert_eq!(err.task_index(), Some(0));
    assert_eq!(executed.load(Ordering::Acquire), 1);
}

#[test]
#[serial]
fn test_panic_is_reported_as_task_error() {
    let mut tp = ThreadPool::with_capacity(2).unwrap();
    let err = tp
        .par_map(0..4, |el: i32| {
            if el == 2 {
                panic!("boom");
            }
            el
        })
        .unwrap_err();

    match err {
        BatchError::Task {
            index,
            cause: TaskFailure::Panic(msg),
        } => {
            assert_eq!(index, 2);
            assert_eq!(msg, "boom");
        }
        other => panic!("Unexpected error: {}", other),
    }
    assert_eq!(tp.par_map(0..2, |el: i32| el).unwrap(), vec![0, 1]);
}

#[test]
#[serial]
fn test_shutdown() {
    let mut tp = ThreadPool::with_capacity(2).unwrap();
    tp.shutdown();
    assert_eq!(tp.state(), PoolState::Closed);
    assert_eq!(tp.num_workers(), 0);

    let err = tp.par_map(0..4, |el: i32| el).unwrap_err();
    assert!(matches!(
        err,
        BatchError::Pool(PoolError::NotRunning(PoolState::Closed))
    ));

    tp.shutdown();
    assert_eq!(tp.state(), PoolState::Closed);
}

#[test]
#[serial]
fn test_zero_workers_is_rejected() {
    assert!(matches!(
        ThreadPool::with_capacity(0),
        Err(PoolError::WorkerStartup(_))
    ));

    let conf = Configuration::new(0, false, true, None).unwrap();
    assert!(matches!(
        ThreadPool::with_configuration(Arc::new(conf)),
        Err(PoolError::WorkerStartup(_))
    ));

    let err = run_batch(vec![1, 2, 3], Some(0), |el: i32| Ok::<_, String>(el)).unwrap_err();
    assert!(matches!(err, BatchError::Pool(PoolError::WorkerStartup(_))));
}

#[test]
#[serial]
fn test_explicit_worker_count_ignores_environment() {
    ::scopeguard::defer!({
        env::remove_var("POPCOLOR_MAX_CORES");
        env::remove_var("POPCOLOR_THREAD_MAPPING");
    });
    env::set_var("POPCOLOR_MAX_CORES", "0");
    let res = run_batch(vec![1, 2, 3], Some(2), |el: i32| Ok::<_, String>(el * 10)).unwrap();
    assert_eq!(res, vec![10, 20, 30]);
    assert!(matches!(
        ThreadPool::new(),
        Err(PoolError::WorkerStartup(_))
    ));

    // Without pinning the core mapping is not read.
    env::set_var("POPCOLOR_MAX_CORES", "2");
    env::set_var("POPCOLOR_THREAD_MAPPING", "");
    let mut tp = ThreadPool::new().unwrap();
    assert_eq!(tp.num_workers(), 2);
    assert_eq!(tp.par_map(0..4, |el: i32| el).unwrap(), vec![0, 1, 2, 3]);
}

#[test]
#[serial]
fn test_reported_failure_with_several_failing_tasks() {
    let fails = |el: usize| {
        if el == 3 || el == 7 {
            Err(format!("bad element {}", el))
        } else {
            Ok(el)
        }
    };

    // One worker runs the chunks in input order.
    let mut tp = ThreadPool::with_capacity(1).unwrap();
    for chunk_size in [1, 4, 10] {
        let err = tp.try_par_map_chunked(0..10, chunk_size, fails).unwrap_err();
        assert_eq!(err.task_index(), Some(3));
    }

    let mut tp = ThreadPool::with_capacity(4).unwrap();
    let err = tp.try_par_map_chunked(0..10, 1, fails).unwrap_err();
    assert!(matches!(err.task_index(), Some(3) | Some(7)));
}

#[test]
#[serial]
fn test_non_blocking_result_channel() {
    let conf = Configuration::new(3, false, false, Some(2)).unwrap();
    let mut tp = ThreadPool::with_configuration(Arc::new(conf)).unwrap();
    let res = tp.par_map(0..31, |el: u32| el * el).unwrap();
    assert_eq!(res, (0..31).map(|el| el * el).collect::<Vec<_>>());
}

#[test]
#[serial]
fn test_run_batch() {
    let expected: Vec<usize> = (0..20).map(fib).collect();
    for workers in [Some(1), Some(2), Some(20), None] {
        let res = run_batch(0..20, workers, |el| Ok::<_, String>(fib(el))).unwrap();
        assert_eq!(res, expected);
    }
}
