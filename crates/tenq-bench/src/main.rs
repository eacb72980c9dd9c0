use std::collections::BTreeMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use tenq_core::{DequeueResult, FairQueue, PutError, QueueConfig, TenantKey, render_stats};

const RECV_TIMEOUT: Duration = Duration::from_millis(20);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let run_seconds = 5u64;
    let worker_count = 4usize;
    let cold_tenants = 40u64;

    let queue = Arc::new(FairQueue::new(QueueConfig::new(1_000)));

    let running = Arc::new(AtomicBool::new(true));
    let produced_total = Arc::new(AtomicU64::new(0));
    let dropped_total = Arc::new(AtomicU64::new(0));
    let served_by_tenant = Arc::new(Mutex::new(BTreeMap::<TenantKey, u64>::new()));

    let mut handles = Vec::new();

    handles.push(spawn_producer(
        Arc::clone(&queue),
        Arc::clone(&running),
        Arc::clone(&produced_total),
        Arc::clone(&dropped_total),
        TenantKey::from("hot"),
        0,
    ));

    for tenant_id in 0..cold_tenants {
        handles.push(spawn_producer(
            Arc::clone(&queue),
            Arc::clone(&running),
            Arc::clone(&produced_total),
            Arc::clone(&dropped_total),
            TenantKey::from(format!("cold-{tenant_id:02}")),
            25,
        ));
    }

    for _ in 0..worker_count {
        handles.push(spawn_worker(
            Arc::clone(&queue),
            Arc::clone(&served_by_tenant),
        ));
    }

    tracing::info!(
        cold_tenants,
        worker_count,
        run_seconds,
        "bench: hot tenant vs cold tenants"
    );
    let start = Instant::now();
    thread::sleep(Duration::from_secs(run_seconds));
    let elapsed = start.elapsed().as_secs_f64();

    running.store(false, Ordering::Relaxed);
    queue.close();

    for handle in handles {
        let _ = handle.join();
    }

    let stats = queue.stats();
    let throughput = if elapsed > 0.0 {
        stats.dequeued as f64 / elapsed
    } else {
        0.0
    };

    print!("{}", render_stats(&stats, "tenq_bench"));
    println!("derived: throughput={:.1} msgs/s", throughput);
    println!(
        "produced_total={} dropped_total={}",
        produced_total.load(Ordering::Relaxed),
        dropped_total.load(Ordering::Relaxed)
    );

    let served = match served_by_tenant.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    let hot = served.get(&TenantKey::from("hot")).copied().unwrap_or(0);
    let cold: Vec<u64> = served
        .iter()
        .filter(|(tenant, _)| tenant.as_str() != "hot")
        .map(|(_, count)| *count)
        .collect();
    let cold_min = cold.iter().copied().min().unwrap_or(0);
    let cold_max = cold.iter().copied().max().unwrap_or(0);
    println!("served: hot={hot} cold_min={cold_min} cold_max={cold_max}");
}

fn spawn_producer(
    queue: Arc<FairQueue<u64>>,
    running: Arc<AtomicBool>,
    produced_total: Arc<AtomicU64>,
    dropped_total: Arc<AtomicU64>,
    tenant: TenantKey,
    interval_ms: u64,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut seq = 0u64;
        while running.load(Ordering::Relaxed) {
            seq += 1;
            produced_total.fetch_add(1, Ordering::Relaxed);
            match queue.put(tenant.clone(), seq) {
                Ok(()) => {}
                Err(PutError::BufferFull(_)) => {
                    dropped_total.fetch_add(1, Ordering::Relaxed);
                }
                Err(PutError::Closed) => break,
            }
            if interval_ms > 0 {
                thread::sleep(Duration::from_millis(interval_ms));
            } else {
                thread::yield_now();
            }
        }
    })
}

fn spawn_worker(
    queue: Arc<FairQueue<u64>>,
    served_by_tenant: Arc<Mutex<BTreeMap<TenantKey, u64>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut local: BTreeMap<TenantKey, u64> = BTreeMap::new();
        loop {
            match queue.recv_timeout(RECV_TIMEOUT) {
                DequeueResult::Message(message) => {
                    let (tenant, _) = message.into_parts();
                    *local.entry(tenant).or_insert(0) += 1;
                }
                DequeueResult::Closed => break,
                DequeueResult::Empty => {}
            }
        }
        if let Ok(mut served) = served_by_tenant.lock() {
            for (tenant, count) in local {
                *served.entry(tenant).or_insert(0) += count;
            }
        }
    })
}
