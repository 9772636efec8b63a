/// Collaborator clients
///
/// The feed core only talks to the outside world through these traits:
/// the object store behind each identifier, the external trend source, the
/// candidate/aggregates service and the active-account registry.
pub mod accounts;
pub mod candidates;
pub mod object_store;
pub mod trend_source;

pub use accounts::{ActiveAccounts, RedisActiveAccounts};
pub use candidates::{CandidateSource, HttpCandidateSource};
pub use object_store::{snowflake_id, ObjectStore, RedisObjectStore};
pub use trend_source::{HttpTrendSource, TrendSource};
