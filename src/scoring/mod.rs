pub mod config;
pub mod engine;
pub mod factors;
pub mod validation;

pub use config::*;
pub use engine::{score_athletes, score_entry, score_result, AthleteScore, RowScore, ScoreBreakdown};
pub use factors::{boats_beaten, classify_age_group, classify_event_type, numeric_place};
pub use validation::validate_scoring;
