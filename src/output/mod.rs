pub mod export;
pub mod formatter;

pub use export::{
    athlete_rows, load_athletes, read_athletes, save_athletes, save_prestige, write_athletes_csv,
    write_prestige_csv, AthleteRow, PrestigeRow,
};
pub use formatter::{format_ranking, format_score, should_use_colors};
