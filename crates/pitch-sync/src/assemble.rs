//! Combine one fixture page's facts into a fully resolved match record.

use std::collections::HashMap;

use pitch_core::{Lineup, MatchFacts, MatchStatus, LINEUP_SLOTS};
use pitch_storage::MatchUpsert;
use thiserror::Error;
use tracing::{debug, warn};

use crate::resolve::{Resolution, ResolveError, Resolver, Scope};

#[derive(Debug, Error)]
pub enum AssembleError {
    /// The page claims a final result but no score parses out of it. The
    /// record is skipped, never fabricated.
    #[error("page {link} claims a final result but {text:?} carries no score")]
    ScoreUnparseable { link: String, text: String },
    /// A team name matched nothing in the league scope closely enough.
    #[error("club {name:?} on {link} matched nothing in scope")]
    UnresolvedClub { link: String, name: String },
    /// Empty candidate scope; escalates past the per-item skip policy.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Derive the lifecycle status from the scoretime badge. `None` means the
/// page carried no badge at all and the whole record is dropped as a
/// cancelled or malformed fixture.
pub fn derive_status(marker: Option<&str>) -> Option<MatchStatus> {
    match marker {
        None => None,
        Some("KO") => Some(MatchStatus::Upcoming),
        Some("FT") | Some("AET") => Some(MatchStatus::Finished),
        Some(_) => Some(MatchStatus::Started),
    }
}

/// Pull "N - N" out of a scoretime text like "Club A 2 - 1 Club B".
pub fn extract_goals(text: &str) -> Option<(i16, i16)> {
    let (left, right) = text.split_once('-')?;
    let home = left.split_whitespace().last()?.parse().ok()?;
    let away = right.split_whitespace().next()?.parse().ok()?;
    Some((home, away))
}

/// Resolve one side's lineup against the club's squad scope.
///
/// A block with fewer than eleven rows is treated as absent rather than
/// partially populated; positional misalignment is worse than no lineup.
/// A name below the similarity floor leaves its slot empty.
pub fn resolve_lineup(
    resolver: &Resolver,
    squad: &Scope,
    names: &[String],
) -> Result<Lineup, ResolveError> {
    let mut lineup: Lineup = [None; LINEUP_SLOTS];
    if names.len() < LINEUP_SLOTS {
        if !names.is_empty() {
            debug!(
                rows = names.len(),
                scope = %squad.label(),
                "short lineup block treated as absent"
            );
        }
        return Ok(lineup);
    }

    let resolutions = resolver.resolve_batch(&names[..LINEUP_SLOTS], squad)?;
    for (slot, resolution) in lineup.iter_mut().zip(resolutions) {
        match resolution {
            Resolution::Exact { id, .. } | Resolution::Fuzzy { id, .. } => *slot = Some(id),
            Resolution::NoMatch { best } => {
                warn!(scope = %squad.label(), ?best, "lineup name unresolved; slot left empty");
            }
        }
    }
    Ok(lineup)
}

/// Assemble one page's facts into an upsert-ready match record.
///
/// Returns `Ok(None)` for pages with no status badge (deliberate drop).
/// Club names resolve against the league scope with exclusive assignment;
/// lineup names resolve per side against that club's squad.
pub fn assemble_match(
    resolver: &Resolver,
    facts: &MatchFacts,
    clubs: &Scope,
    squads: &HashMap<i64, HashMap<String, i64>>,
) -> Result<Option<MatchUpsert>, AssembleError> {
    let Some(status) = derive_status(facts.status_marker.as_deref()) else {
        debug!(link = %facts.link, "no status badge; dropping record");
        return Ok(None);
    };

    let sides = resolver.resolve_batch(
        &[facts.home_name.clone(), facts.away_name.clone()],
        clubs,
    )?;
    let home_id = sides[0].id().ok_or_else(|| AssembleError::UnresolvedClub {
        link: facts.link.clone(),
        name: facts.home_name.clone(),
    })?;
    let away_id = sides[1].id().ok_or_else(|| AssembleError::UnresolvedClub {
        link: facts.link.clone(),
        name: facts.away_name.clone(),
    })?;

    let (home_goals, away_goals) = match status {
        // Any score text on a pre-kickoff page is stale placeholder markup.
        MatchStatus::Upcoming => (None, None),
        MatchStatus::Finished => {
            let (h, a) =
                extract_goals(&facts.scoretime_text).ok_or_else(|| AssembleError::ScoreUnparseable {
                    link: facts.link.clone(),
                    text: facts.scoretime_text.clone(),
                })?;
            (Some(h), Some(a))
        }
        MatchStatus::Started => match extract_goals(&facts.scoretime_text) {
            Some((h, a)) => (Some(h), Some(a)),
            None => (None, None),
        },
    };

    let home_lineup = resolve_side(resolver, squads, home_id, &facts.home_lineup)?;
    let away_lineup = resolve_side(resolver, squads, away_id, &facts.away_lineup)?;

    Ok(Some(MatchUpsert {
        home_id,
        away_id,
        date: facts.date,
        status,
        link: facts.link.clone(),
        home_goals,
        away_goals,
        home_lineup,
        away_lineup,
    }))
}

fn resolve_side(
    resolver: &Resolver,
    squads: &HashMap<i64, HashMap<String, i64>>,
    club_id: i64,
    names: &[String],
) -> Result<Lineup, ResolveError> {
    if names.len() < LINEUP_SLOTS {
        return Ok([None; LINEUP_SLOTS]);
    }
    let squad = Scope::new(
        format!("club {club_id} squad"),
        squads.get(&club_id).cloned().unwrap_or_default(),
    );
    resolve_lineup(resolver, &squad, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn facts(marker: Option<&str>, scoretime: &str) -> MatchFacts {
        MatchFacts {
            link: "https://example.org/m/1".into(),
            date: NaiveDate::from_ymd_opt(2021, 5, 22).unwrap(),
            home_name: "Club A".into(),
            away_name: "Club B".into(),
            status_marker: marker.map(str::to_string),
            scoretime_text: scoretime.into(),
            home_lineup: Vec::new(),
            away_lineup: Vec::new(),
        }
    }

    fn club_scope() -> Scope {
        Scope::new(
            "league scope",
            [("Club A".to_string(), 1), ("Club B".to_string(), 2)]
                .into_iter()
                .collect(),
        )
    }

    fn squad(club_id: i64, prefix: &str) -> (i64, HashMap<String, i64>) {
        let players = (1..=11)
            .map(|n| (format!("{prefix} {n}"), club_id * 100 + n))
            .collect();
        (club_id, players)
    }

    #[test]
    fn final_whistle_badge_requires_a_parsed_score() {
        let resolver = Resolver::default();
        let squads = HashMap::new();

        let record = assemble_match(
            &resolver,
            &facts(Some("FT"), "Club A 2 - 1 Club B"),
            &club_scope(),
            &squads,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.status, MatchStatus::Finished);
        assert_eq!(record.home_goals, Some(2));
        assert_eq!(record.away_goals, Some(1));
        assert_eq!(record.home_id, 1);
        assert_eq!(record.away_id, 2);

        let err = assemble_match(
            &resolver,
            &facts(Some("FT"), "postponed"),
            &club_scope(),
            &squads,
        )
        .unwrap_err();
        assert!(matches!(err, AssembleError::ScoreUnparseable { .. }));
    }

    #[test]
    fn kickoff_pending_forces_null_goals_despite_score_text() {
        let record = assemble_match(
            &Resolver::default(),
            &facts(Some("KO"), "Club A 2 - 1 Club B"),
            &club_scope(),
            &HashMap::new(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.status, MatchStatus::Upcoming);
        assert_eq!(record.home_goals, None);
        assert_eq!(record.away_goals, None);
    }

    #[test]
    fn minute_badge_means_in_progress_with_goals_if_present() {
        let record = assemble_match(
            &Resolver::default(),
            &facts(Some("63'"), "Club A 1 - 0 Club B"),
            &club_scope(),
            &HashMap::new(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.status, MatchStatus::Started);
        assert_eq!(record.home_goals, Some(1));
        assert_eq!(record.away_goals, Some(0));
    }

    #[test]
    fn page_without_any_badge_is_dropped_not_an_error() {
        let result = assemble_match(
            &Resolver::default(),
            &facts(None, "Club A 2 - 1 Club B"),
            &club_scope(),
            &HashMap::new(),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn ten_row_lineup_yields_eleven_empty_slots() {
        let mut f = facts(Some("FT"), "2 - 1");
        f.home_lineup = (1..=10).map(|n| format!("Home {n}")).collect();
        let squads: HashMap<_, _> = [squad(1, "Home"), squad(2, "Away")].into_iter().collect();

        let record = assemble_match(&Resolver::default(), &f, &club_scope(), &squads)
            .unwrap()
            .unwrap();
        assert_eq!(record.home_lineup, [None; LINEUP_SLOTS]);
    }

    #[test]
    fn full_lineup_resolves_every_slot_exclusively() {
        let mut f = facts(Some("FT"), "2 - 1");
        f.home_lineup = (1..=11).map(|n| format!("Home {n}")).collect();
        f.away_lineup = (1..=11).map(|n| format!("Away {n}")).collect();
        let squads: HashMap<_, _> = [squad(1, "Home"), squad(2, "Away")].into_iter().collect();

        let record = assemble_match(&Resolver::default(), &f, &club_scope(), &squads)
            .unwrap()
            .unwrap();
        let mut assigned: Vec<i64> = record.home_lineup.iter().flatten().copied().collect();
        assert_eq!(assigned.len(), LINEUP_SLOTS);
        assigned.sort();
        assigned.dedup();
        assert_eq!(assigned.len(), LINEUP_SLOTS, "no canonical id assigned twice");
        assert!(record.away_lineup.iter().all(Option::is_some));
    }

    #[test]
    fn full_lineup_against_an_empty_squad_escalates() {
        let mut f = facts(Some("FT"), "2 - 1");
        f.home_lineup = (1..=11).map(|n| format!("Home {n}")).collect();

        let err = assemble_match(&Resolver::default(), &f, &club_scope(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Resolve(ResolveError::EmptyScope(_))
        ));
    }

    #[test]
    fn unknown_club_name_is_a_per_item_error() {
        let mut f = facts(Some("FT"), "2 - 1");
        f.home_name = "Completely Different".into();
        let err = assemble_match(&Resolver::default(), &f, &club_scope(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, AssembleError::UnresolvedClub { .. }));
    }
}
