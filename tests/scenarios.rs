use thunkpool::scenarios::{run_scenario, sum_chunks, Scenario, SAMPLE_DATA};
use thunkpool::{
    DispatcherThreadPool, PoolError, RayonThreadPool, Result, SharedQueueThreadPool, ThreadPool,
};

fn sum_sample<P: ThreadPool>() -> Result<()> {
    let pool = P::new(3)?;
    let report = sum_chunks(&pool, &SAMPLE_DATA, 3)?;
    assert_eq!(report.total, 219);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.stats.completed, 3);

    let report = sum_chunks(&pool, &[], 4)?;
    assert_eq!(report.total, 0);
    assert_eq!(report.chunks, 0);
    Ok(())
}

fn sum_total_overflow<P: ThreadPool>() -> Result<()> {
    let pool = P::new(2)?;
    let result = sum_chunks(&pool, &[i64::MAX, 1], 2);
    assert!(matches!(result, Err(PoolError::StringError(_))));
    Ok(())
}

fn sum_chunk_overflow<P: ThreadPool>() -> Result<()> {
    let pool = P::new(2)?;
    let result = sum_chunks(&pool, &[i64::MIN, -1, 5], 1);
    assert!(matches!(result, Err(PoolError::StringError(_))));
    assert_eq!(pool.stats().panicked, 0);
    Ok(())
}

#[test]
fn shared_queue_sum_sample() -> Result<()> {
    sum_sample::<SharedQueueThreadPool>()
}

#[test]
fn dispatcher_sum_sample() -> Result<()> {
    sum_sample::<DispatcherThreadPool>()
}

#[test]
fn rayon_sum_sample() -> Result<()> {
    sum_sample::<RayonThreadPool>()
}

#[test]
fn shared_queue_sum_total_overflow() -> Result<()> {
    sum_total_overflow::<SharedQueueThreadPool>()
}

#[test]
fn dispatcher_sum_total_overflow() -> Result<()> {
    sum_total_overflow::<DispatcherThreadPool>()
}

#[test]
fn shared_queue_sum_chunk_overflow() -> Result<()> {
    sum_chunk_overflow::<SharedQueueThreadPool>()
}

#[test]
fn dispatcher_sum_chunk_overflow() -> Result<()> {
    sum_chunk_overflow::<DispatcherThreadPool>()
}

#[test]
fn every_scenario_completes() -> Result<()> {
    for scenario in Scenario::ALL {
        let report = run_scenario::<DispatcherThreadPool>(scenario, 4)?;
        assert_eq!(report.scenario, scenario.name());
        assert_eq!(report.stats.panicked, 0);
    }
    Ok(())
}
