/// Background jobs
pub mod precompute_scheduler;

pub use precompute_scheduler::{
    run_cycle, start_precompute_scheduler, CycleSummary, PrecomputeSchedulerConfig,
};
