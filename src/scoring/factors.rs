use super::config::WeightedToken;

/// First event-type token contained in the event name, case-insensitively
pub fn classify_event_type<'a>(event: &str, types: &'a [WeightedToken]) -> Option<&'a WeightedToken> {
    let event = event.to_lowercase();
    types
        .iter()
        .find(|t| !t.token.is_empty() && event.contains(&t.token.to_lowercase()))
}

/// First narrower age group contained in the event name, else the default group
pub fn classify_age_group<'a>(
    event: &str,
    groups: &'a [WeightedToken],
    default: &'a WeightedToken,
) -> &'a WeightedToken {
    let event = event.to_lowercase();
    groups
        .iter()
        .find(|g| !g.token.is_empty() && event.contains(&g.token.to_lowercase()))
        .unwrap_or(default)
}

/// Digits of the place field read as a number; 0 when there are none.
///
/// "3" → 3, "T2" → 2, "abc" → 0. Values too large to be a real place also read as 0.
pub fn numeric_place(place: &str) -> u64 {
    let digits: String = place.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Boats finishing behind this one, never negative
pub fn boats_beaten(field_size: usize, place: u64) -> u64 {
    (field_size as u64).saturating_sub(place)
}
