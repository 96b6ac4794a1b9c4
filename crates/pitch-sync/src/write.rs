//! Translate resolved facts into idempotent store operations.
//!
//! Club and player writes are insert-if-absent; match writes honor the
//! monotonic-fill rule in the store's upsert; odds writes overwrite
//! unconditionally because the latest observed best price is the value
//! wanted. Every skip logs the offending name or link.

use std::collections::HashMap;

use anyhow::{Context, Result};
use pitch_adapters::known_club_alias;
use pitch_core::{OddsRow, PlayerFacts};
use pitch_storage::{MatchUpsert, NewPlayer, Store};
use serde::Serialize;
use tracing::{info, warn};

use crate::resolve::{Resolution, ResolveError, Resolver, Scope};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CatalogWriteStats {
    pub players_inserted: u64,
    pub clubs_created: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OddsWriteStats {
    pub updated: usize,
    pub skipped: usize,
}

/// Resolve or create the owning club for every roster fact in one page
/// batch, then bulk-insert the players.
///
/// The catalog source is the naming authority, so its spellings become
/// canonical: an observed club name below the (strict) catalog similarity
/// floor is a genuinely new club, not a skip. An empty scope here is the
/// normal state of a fresh league, not an error.
pub async fn write_catalog_batch(
    store: &Store,
    resolver: &Resolver,
    league_id: i64,
    clubs: &mut Scope,
    facts: Vec<PlayerFacts>,
) -> Result<CatalogWriteStats> {
    let mut stats = CatalogWriteStats::default();
    let mut players = Vec::with_capacity(facts.len());

    for fact in facts {
        let club_id = match resolver.resolve(&fact.club_name, clubs) {
            Ok(Resolution::Exact { id, .. }) => id,
            Ok(Resolution::Fuzzy { id, name, score }) => {
                info!(
                    observed = %fact.club_name,
                    canonical = %name,
                    score,
                    "club spelling variant resolved"
                );
                id
            }
            Ok(Resolution::NoMatch { best }) => {
                if let Some((candidate, score)) = best {
                    info!(
                        name = %fact.club_name,
                        nearest = %candidate,
                        score,
                        "creating new club; nearest candidate below floor"
                    );
                }
                let id = store.insert_club_if_absent(league_id, &fact.club_name).await?;
                clubs.insert(fact.club_name.clone(), id);
                stats.clubs_created += 1;
                id
            }
            Err(ResolveError::EmptyScope(_)) => {
                let id = store.insert_club_if_absent(league_id, &fact.club_name).await?;
                clubs.insert(fact.club_name.clone(), id);
                stats.clubs_created += 1;
                id
            }
        };

        players.push(NewPlayer {
            club_id,
            name: fact.name,
            overall: fact.overall,
            potential: fact.potential,
            position: fact.position,
            age: fact.age,
            market_value: fact.market_value,
            nationality: fact.nationality,
            total: fact.total,
        });
    }

    stats.players_inserted = store
        .insert_players(&players)
        .await
        .context("inserting catalog batch")?;
    Ok(stats)
}

/// Upsert one batch of resolved matches, all-or-nothing.
pub async fn write_match_batch(store: &Store, batch: &[MatchUpsert]) -> Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }
    store
        .upsert_matches(batch)
        .await
        .context("upserting match batch")
}

/// Club scope for odds resolution: canonical names plus their known
/// odds-sheet aliases, so sheet spellings hit the exact-match path.
pub fn odds_club_scope(label: impl Into<String>, clubs: HashMap<String, i64>) -> Scope {
    let mut scope = Scope::new(label, clubs.clone());
    for (name, id) in &clubs {
        if let Some(alias) = known_club_alias(name) {
            scope.insert(alias.to_string(), *id);
        }
    }
    scope
}

/// Apply one season sheet's rows to the store. Rows whose club names do
/// not resolve, or whose fixture is not persisted yet, are skipped and
/// counted; an empty club scope aborts the batch.
pub async fn write_odds_rows(
    store: &Store,
    resolver: &Resolver,
    clubs: &Scope,
    rows: Vec<OddsRow>,
) -> Result<OddsWriteStats> {
    let mut stats = OddsWriteStats::default();

    for row in rows {
        // An all-empty snapshot must not wipe a previously stored one.
        if row.odds.is_empty() {
            warn!(
                home = %row.home_name,
                away = %row.away_name,
                date = %row.date,
                "odds row with no prices; skipping"
            );
            stats.skipped += 1;
            continue;
        }

        let sides = resolver.resolve_batch(
            &[row.home_name.clone(), row.away_name.clone()],
            clubs,
        )?;
        let (Some(home_id), Some(away_id)) = (sides[0].id(), sides[1].id()) else {
            warn!(
                home = %row.home_name,
                away = %row.away_name,
                date = %row.date,
                scope = %clubs.label(),
                "odds row with unresolved club; skipping"
            );
            stats.skipped += 1;
            continue;
        };

        let affected = store.update_odds(home_id, away_id, row.date, &row.odds).await?;
        if affected == 0 {
            warn!(
                home = %row.home_name,
                away = %row.away_name,
                date = %row.date,
                "odds row has no persisted fixture; skipping"
            );
            stats.skipped += 1;
        } else {
            stats.updated += 1;
        }
    }

    Ok(stats)
}
