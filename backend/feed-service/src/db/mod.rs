pub mod audience_repo;
pub mod pool;
pub mod post_repo;

pub use audience_repo::{AudienceResolver, PgAudienceResolver};
pub use pool::create_pool;
pub use post_repo::{CandidateQuery, CandidateSource, PgPostStore, PostStore};
