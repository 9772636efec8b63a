/// Trending feed
///
/// External trend source merged into a shared precomputed index, served by
/// rank offset.
pub mod merge;
pub mod service;

pub use merge::TrendingMerge;
pub use service::TrendingService;
