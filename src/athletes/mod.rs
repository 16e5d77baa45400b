pub mod aggregate;
pub mod filter;
pub mod reconcile;
pub mod types;

pub use aggregate::{aggregate, AthleteAggregator, IdentityKey, TrimmedName};
pub use filter::{filter_athletes, FilterConfig};
pub use reconcile::reconcile;
pub use types::{AthleteRecord, RaceEntry};
