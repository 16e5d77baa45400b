use crate::regatta::types::{CrewMember, RawResultRow};

/// Decide which crew members a result row is credited to.
///
/// 1. A non-empty lineup is narrowed to members whose club contains the
///    row's club (case-insensitive). Stale boat ids upstream can point at
///    another club's crew, and this drops them.
/// 2. A row without a club keeps the whole lineup.
/// 3. If narrowing removes everyone, the whole lineup is used.
/// 4. Without a lineup, a non-empty boat label becomes a single pseudo-member.
/// 5. Otherwise nobody is credited and the row drops out.
pub fn reconcile(row: &RawResultRow, lineup: Option<&[CrewMember]>) -> Vec<CrewMember> {
    match lineup {
        Some(lineup) if !lineup.is_empty() => {
            if row.club.is_empty() {
                return lineup.to_vec();
            }

            let club = row.club.to_lowercase();
            let matching: Vec<CrewMember> = lineup
                .iter()
                .filter(|member| {
                    member
                        .club
                        .as_deref()
                        .is_some_and(|c| !c.is_empty() && c.to_lowercase().contains(&club))
                })
                .cloned()
                .collect();

            if matching.is_empty() {
                lineup.to_vec()
            } else {
                matching
            }
        }
        _ if !row.boat_label.trim().is_empty() => vec![CrewMember {
            seat: None,
            name: row.boat_label.clone(),
            age: None,
            club: Some(row.club.clone()).filter(|c| !c.is_empty()),
        }],
        _ => Vec::new(),
    }
}
