//! Caching primitives shared by the resolver and the build path
//!
//! - [`TtlCache`]: get-or-fetch with a per-call maximum age, persisted in the
//!   artifact store under a (domain, key) pair.
//! - [`BuildCoalescer`]: per-key async mutex so concurrent cache misses for
//!   the same (package, version) run one build.

pub mod coalesce;
pub mod ttl;

pub use coalesce::{BuildCoalescer, CoalesceGuard};
pub use ttl::TtlCache;
