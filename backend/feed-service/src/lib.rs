pub mod clients;
pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, PrecomputeError, Result};

pub use services::{
    CandidateRanker, FeedReader, Hydrator, PrecomputeReport, PrecomputeWorker, RankedSource,
    RecencySource, TimelineService, TrendingMerge, TrendingService,
};
