use super::config::{ScoringConfig, WeightedToken};

fn validate_tokens(errors: &mut Vec<String>, field: &str, tokens: &[WeightedToken]) {
    for (i, t) in tokens.iter().enumerate() {
        if t.token.trim().is_empty() {
            errors.push(format!("scoring.{}[{}].token: must not be empty", field, i));
        }
        if !t.weight.is_finite() || t.weight < 0.0 {
            errors.push(format!(
                "scoring.{}[{}].weight: must be a non-negative number, got {}",
                field, i, t.weight
            ));
        }
    }
}

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Some(ref types) = config.event_types {
        if types.is_empty() {
            errors.push("scoring.event_types: must list at least one token".to_string());
        }
        validate_tokens(&mut errors, "event_types", types);
    }

    if let Some(ref groups) = config.age_groups {
        validate_tokens(&mut errors, "age_groups", groups);
    }

    if let Some(ref default) = config.default_age_group {
        if !default.weight.is_finite() || default.weight < 0.0 {
            errors.push(format!(
                "scoring.default_age_group.weight: must be a non-negative number, got {}",
                default.weight
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
