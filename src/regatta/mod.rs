pub mod client;
pub mod error;
pub mod lineup;
pub mod listing;
pub mod parser;
pub mod results;
pub mod types;

pub use client::{create_client, Endpoints, HttpTransport, Transport};
pub use error::FetchError;
pub use lineup::LineupCache;
pub use parser::parse_event;
pub use results::{fetch_event, RetryPolicy};
pub use types::{BoatRef, CrewMember, EventRef, ParsedEvent, RawResultRow};
