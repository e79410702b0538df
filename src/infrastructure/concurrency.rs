/// Concurrency management for Kaizen Graph.
/// Sizes the rayon pool used for batch derivation.

use anyhow::Result;
use tracing::info;

/// Number of workers to use on a machine with `cores` cores: half of them,
/// at least one.
pub fn worker_count(cores: usize) -> usize {
    std::cmp::max(1, cores / 2)
}

/// Initialize the global rayon thread pool with controlled worker count.
pub fn init_thread_pool() -> Result<()> {
    let cores = num_cpus::get();
    let workers = worker_count(cores);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    info!(workers, cores, "initialized thread pool");

    Ok(())
}
