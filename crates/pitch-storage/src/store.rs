//! Postgres store: scoped canonical-name lookups and idempotent upserts.
//!
//! All match writes honor the monotonic-fill rule: a NULL column may take a
//! concrete value, a concrete column is never overwritten back to NULL or to
//! a different concrete value. Odds columns are the one exception, they are
//! refreshed unconditionally because the newest best price is the one wanted.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pitch_core::{
    Club, League, Lineup, MatchRecord, MatchStatus, OddsSnapshot, Player, LINEUP_SLOTS,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::warn;

/// A player row ready for catalog insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub club_id: i64,
    pub name: String,
    pub overall: Option<i16>,
    pub potential: Option<i16>,
    pub position: Option<String>,
    pub age: Option<i16>,
    pub market_value: Option<f64>,
    pub nationality: Option<String>,
    pub total: Option<i16>,
}

/// A fully resolved match observation ready for upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchUpsert {
    pub home_id: i64,
    pub away_id: i64,
    pub date: NaiveDate,
    pub status: MatchStatus,
    pub link: String,
    pub home_goals: Option<i16>,
    pub away_goals: Option<i16>,
    pub home_lineup: Lineup,
    pub away_lineup: Lineup,
}

/// A persisted match that is still UPCOMING past its kickoff date.
#[derive(Debug, Clone)]
pub struct UpcomingMatch {
    pub match_id: i64,
    pub home_id: i64,
    pub away_id: i64,
    pub link: Option<String>,
    pub league_code: String,
    pub season: String,
}

/// One denormalized match row for snapshot export.
#[derive(Debug, Clone)]
pub struct ExportMatchRow {
    pub match_id: i64,
    pub league_code: String,
    pub season: String,
    pub home_name: String,
    pub away_name: String,
    pub date: NaiveDate,
    pub status: String,
    pub home_goals: Option<i16>,
    pub away_goals: Option<i16>,
    pub home_max: Option<f64>,
    pub draw_max: Option<f64>,
    pub away_max: Option<f64>,
    pub max_over: Option<f64>,
    pub max_under: Option<f64>,
}

const MATCH_UPSERT_SQL: &str = r#"
INSERT INTO match (home_id, away_id, game_date, status, link,
    h1_player_id, h2_player_id, h3_player_id, h4_player_id, h5_player_id,
    h6_player_id, h7_player_id, h8_player_id, h9_player_id, h10_player_id,
    h11_player_id, a1_player_id, a2_player_id, a3_player_id, a4_player_id,
    a5_player_id, a6_player_id, a7_player_id, a8_player_id, a9_player_id,
    a10_player_id, a11_player_id, home_goals, away_goals)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)
ON CONFLICT (home_id, away_id, game_date) DO UPDATE SET
    status = CASE WHEN match.status = 'FT' THEN match.status ELSE EXCLUDED.status END,
    link = COALESCE(match.link, EXCLUDED.link),
    h1_player_id = COALESCE(match.h1_player_id, EXCLUDED.h1_player_id),
    h2_player_id = COALESCE(match.h2_player_id, EXCLUDED.h2_player_id),
    h3_player_id = COALESCE(match.h3_player_id, EXCLUDED.h3_player_id),
    h4_player_id = COALESCE(match.h4_player_id, EXCLUDED.h4_player_id),
    h5_player_id = COALESCE(match.h5_player_id, EXCLUDED.h5_player_id),
    h6_player_id = COALESCE(match.h6_player_id, EXCLUDED.h6_player_id),
    h7_player_id = COALESCE(match.h7_player_id, EXCLUDED.h7_player_id),
    h8_player_id = COALESCE(match.h8_player_id, EXCLUDED.h8_player_id),
    h9_player_id = COALESCE(match.h9_player_id, EXCLUDED.h9_player_id),
    h10_player_id = COALESCE(match.h10_player_id, EXCLUDED.h10_player_id),
    h11_player_id = COALESCE(match.h11_player_id, EXCLUDED.h11_player_id),
    a1_player_id = COALESCE(match.a1_player_id, EXCLUDED.a1_player_id),
    a2_player_id = COALESCE(match.a2_player_id, EXCLUDED.a2_player_id),
    a3_player_id = COALESCE(match.a3_player_id, EXCLUDED.a3_player_id),
    a4_player_id = COALESCE(match.a4_player_id, EXCLUDED.a4_player_id),
    a5_player_id = COALESCE(match.a5_player_id, EXCLUDED.a5_player_id),
    a6_player_id = COALESCE(match.a6_player_id, EXCLUDED.a6_player_id),
    a7_player_id = COALESCE(match.a7_player_id, EXCLUDED.a7_player_id),
    a8_player_id = COALESCE(match.a8_player_id, EXCLUDED.a8_player_id),
    a9_player_id = COALESCE(match.a9_player_id, EXCLUDED.a9_player_id),
    a10_player_id = COALESCE(match.a10_player_id, EXCLUDED.a10_player_id),
    a11_player_id = COALESCE(match.a11_player_id, EXCLUDED.a11_player_id),
    home_goals = COALESCE(match.home_goals, EXCLUDED.home_goals),
    away_goals = COALESCE(match.away_goals, EXCLUDED.away_goals)
"#;

#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect with a pool sized to the widest write phase, so concurrent
    /// workers never share one connection.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .context("connecting to postgres")?;
        Ok(Self { pool })
    }

    /// Pool that defers connecting until the first query. Lets a server or
    /// scheduler come up while the database is still starting.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_lazy(database_url)
            .context("configuring postgres pool")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .context("running migrations")?;
        Ok(())
    }

    // ── League ───────────────────────────────────────────────────────────

    pub async fn set_league_fixtures_url(
        &self,
        code: &str,
        season: &str,
        url: &str,
    ) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO league (league, season, fixtures_location) VALUES ($1, $2, $3)
             ON CONFLICT (league, season) DO UPDATE SET fixtures_location = EXCLUDED.fixtures_location
             RETURNING league_id",
        )
        .bind(code)
        .bind(season)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("recording fixtures url for {code}/{season}"))?;
        Ok(row.get(0))
    }

    pub async fn set_league_roster_url(&self, code: &str, season: &str, url: &str) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO league (league, season, roster_location) VALUES ($1, $2, $3)
             ON CONFLICT (league, season) DO UPDATE SET roster_location = EXCLUDED.roster_location
             RETURNING league_id",
        )
        .bind(code)
        .bind(season)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("recording roster url for {code}/{season}"))?;
        Ok(row.get(0))
    }

    pub async fn set_league_odds_source(
        &self,
        code: &str,
        season: &str,
        league_name: &str,
        url: &str,
    ) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO league (league, season, league_name, odds_location) VALUES ($1, $2, $3, $4)
             ON CONFLICT (league, season) DO UPDATE SET
                 league_name = EXCLUDED.league_name,
                 odds_location = EXCLUDED.odds_location
             RETURNING league_id",
        )
        .bind(code)
        .bind(season)
        .bind(league_name)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("recording odds source for {code}/{season}"))?;
        Ok(row.get(0))
    }

    /// Every persisted league row, newest season first.
    pub async fn list_leagues(&self) -> Result<Vec<League>> {
        let rows = sqlx::query(
            "SELECT league_id, league, season, league_name,
                    fixtures_location, roster_location, odds_location
             FROM league ORDER BY season DESC, league",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing leagues")?;
        Ok(rows
            .into_iter()
            .map(|r| League {
                id: r.get(0),
                code: r.get(1),
                season: r.get(2),
                name: r.get(3),
                fixtures_url: r.get(4),
                roster_url: r.get(5),
                odds_url: r.get(6),
            })
            .collect())
    }

    // ── Clubs ────────────────────────────────────────────────────────────

    /// Canonical (name -> id) pairs for every club of one league+season.
    /// This is the resolver's club scope; it is built once per scope and
    /// shared read-only across workers.
    pub async fn club_names(&self, code: &str, season: &str) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(
            "SELECT club_name, club_id FROM club
             JOIN league ON league.league_id = club.league_id
             WHERE league.league = $1 AND league.season = $2",
        )
        .bind(code)
        .bind(season)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("loading club names for {code}/{season}"))?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    pub async fn club_names_by_league_id(&self, league_id: i64) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query("SELECT club_name, club_id FROM club WHERE league_id = $1")
            .bind(league_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("loading club names for league id {league_id}"))?;
        Ok(rows.into_iter().map(|r| (r.get(0), r.get(1))).collect())
    }

    /// Insert-if-absent by (league, name). A concurrent writer creating the
    /// same club is a no-op here; the re-read always returns the winner's id.
    pub async fn insert_club_if_absent(&self, league_id: i64, name: &str) -> Result<i64> {
        sqlx::query(
            "INSERT INTO club (league_id, club_name) VALUES ($1, $2)
             ON CONFLICT (league_id, club_name) DO NOTHING",
        )
        .bind(league_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting club {name}"))?;

        let row = sqlx::query("SELECT club_id FROM club WHERE league_id = $1 AND club_name = $2")
            .bind(league_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("re-reading club id for {name}"))?;
        Ok(row.get(0))
    }

    /// Every club row of one league.
    pub async fn clubs_of(&self, league_id: i64) -> Result<Vec<Club>> {
        let rows = sqlx::query(
            "SELECT club_id, league_id, club_name FROM club
             WHERE league_id = $1 ORDER BY club_name",
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("listing clubs of league {league_id}"))?;
        Ok(rows
            .into_iter()
            .map(|r| Club {
                id: r.get(0),
                league_id: r.get(1),
                name: r.get(2),
            })
            .collect())
    }

    // ── Players ──────────────────────────────────────────────────────────

    /// Every player row of one club.
    pub async fn players_of(&self, club_id: i64) -> Result<Vec<Player>> {
        let rows = sqlx::query(
            "SELECT player_id, club_id, name, overall_rating, potential_rating,
                    position, age, market_value, nationality, total_rating
             FROM player WHERE club_id = $1 ORDER BY name",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("listing players of club {club_id}"))?;
        Ok(rows
            .into_iter()
            .map(|r| Player {
                id: r.get(0),
                club_id: r.get(1),
                name: r.get(2),
                overall: r.get(3),
                potential: r.get(4),
                position: r.get(5),
                age: r.get(6),
                market_value: r.get(7),
                nationality: r.get(8),
                total: r.get(9),
            })
            .collect())
    }

    /// All squads of one league+season, grouped by club id.
    pub async fn squads_by_league(
        &self,
        code: &str,
        season: &str,
    ) -> Result<HashMap<i64, HashMap<String, i64>>> {
        let rows = sqlx::query(
            "SELECT club.club_id, player.name, player.player_id FROM player
             JOIN club ON player.club_id = club.club_id
             JOIN league ON league.league_id = club.league_id
             WHERE league.league = $1 AND league.season = $2",
        )
        .bind(code)
        .bind(season)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("loading squads for {code}/{season}"))?;

        let mut squads: HashMap<i64, HashMap<String, i64>> = HashMap::new();
        for row in rows {
            let club_id: i64 = row.get(0);
            squads
                .entry(club_id)
                .or_default()
                .insert(row.get(1), row.get(2));
        }
        Ok(squads)
    }

    /// Bulk-insert a catalog batch in one transaction. Players already
    /// present under (club_id, name) are left untouched, so re-running a
    /// catalog pass never duplicates rows.
    pub async fn insert_players(&self, players: &[NewPlayer]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("starting player insert")?;
        let mut inserted = 0u64;
        for p in players {
            let result = sqlx::query(
                "INSERT INTO player (club_id, name, overall_rating, potential_rating,
                     position, age, market_value, nationality, total_rating)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (club_id, name) DO NOTHING",
            )
            .bind(p.club_id)
            .bind(&p.name)
            .bind(p.overall)
            .bind(p.potential)
            .bind(&p.position)
            .bind(p.age)
            .bind(p.market_value)
            .bind(&p.nationality)
            .bind(p.total)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting player {}", p.name))?;
            inserted += result.rows_affected();
        }
        tx.commit().await.context("committing player insert")?;
        Ok(inserted)
    }

    // ── Matches ──────────────────────────────────────────────────────────

    /// Upsert a batch of resolved matches, all-or-nothing.
    ///
    /// Before each row we read any already-concrete goals; a disagreement
    /// with an incoming concrete value is logged as a data-quality warning
    /// and the first-seen value is kept (the COALESCE in the upsert does
    /// the keeping).
    pub async fn upsert_matches(&self, batch: &[MatchUpsert]) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("starting match batch")?;

        for m in batch {
            let existing = sqlx::query(
                "SELECT home_goals, away_goals FROM match
                 WHERE home_id = $1 AND away_id = $2 AND game_date = $3",
            )
            .bind(m.home_id)
            .bind(m.away_id)
            .bind(m.date)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("pre-reading match {}", m.link))?;

            if let Some(row) = existing {
                let old_home: Option<i16> = row.get(0);
                let old_away: Option<i16> = row.get(1);
                let conflicting = matches!((old_home, m.home_goals), (Some(a), Some(b)) if a != b)
                    || matches!((old_away, m.away_goals), (Some(a), Some(b)) if a != b);
                if conflicting {
                    warn!(
                        link = %m.link,
                        existing = ?(old_home, old_away),
                        incoming = ?(m.home_goals, m.away_goals),
                        "conflicting concrete scores; keeping first-seen values"
                    );
                }
            }

            let mut query = sqlx::query(MATCH_UPSERT_SQL)
                .bind(m.home_id)
                .bind(m.away_id)
                .bind(m.date)
                .bind(m.status.as_str())
                .bind(&m.link);
            for slot in m.home_lineup {
                query = query.bind(slot);
            }
            for slot in m.away_lineup {
                query = query.bind(slot);
            }
            query = query.bind(m.home_goals).bind(m.away_goals);

            query
                .execute(&mut *tx)
                .await
                .with_context(|| format!("upserting match {}", m.link))?;
        }

        tx.commit().await.context("committing match batch")?;
        Ok(batch.len())
    }

    /// Overwrite the odds columns for one fixture. Returns the number of
    /// matched rows; zero means the fixture is not in the store yet.
    pub async fn update_odds(
        &self,
        home_id: i64,
        away_id: i64,
        date: NaiveDate,
        odds: &OddsSnapshot,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE match SET
                 home_max = $4, draw_max = $5, away_max = $6,
                 broker_home_max = $7, broker_draw_max = $8, broker_away_max = $9,
                 market_home_max = $10, market_draw_max = $11, market_away_max = $12,
                 max_over_2_5 = $13, max_under_2_5 = $14
             WHERE home_id = $1 AND away_id = $2 AND game_date = $3",
        )
        .bind(home_id)
        .bind(away_id)
        .bind(date)
        .bind(odds.home_max)
        .bind(odds.draw_max)
        .bind(odds.away_max)
        .bind(&odds.broker_home_max)
        .bind(&odds.broker_draw_max)
        .bind(&odds.broker_away_max)
        .bind(odds.market_home_max)
        .bind(odds.market_draw_max)
        .bind(odds.market_away_max)
        .bind(odds.max_over)
        .bind(odds.max_under)
        .execute(&self.pool)
        .await
        .context("updating odds")?;
        Ok(result.rows_affected())
    }

    /// Every persisted match of one league, oldest first.
    pub async fn matches_of(&self, league_id: i64) -> Result<Vec<MatchRecord>> {
        let rows = sqlx::query(
            "SELECT match.match_id, match.home_id, match.away_id, match.game_date,
                    match.status, match.link, match.home_goals, match.away_goals,
                    match.h1_player_id, match.h2_player_id, match.h3_player_id,
                    match.h4_player_id, match.h5_player_id, match.h6_player_id,
                    match.h7_player_id, match.h8_player_id, match.h9_player_id,
                    match.h10_player_id, match.h11_player_id,
                    match.a1_player_id, match.a2_player_id, match.a3_player_id,
                    match.a4_player_id, match.a5_player_id, match.a6_player_id,
                    match.a7_player_id, match.a8_player_id, match.a9_player_id,
                    match.a10_player_id, match.a11_player_id
             FROM match
             JOIN club ON match.home_id = club.club_id
             WHERE club.league_id = $1
             ORDER BY match.game_date, match.match_id",
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("listing matches of league {league_id}"))?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let status_text: String = row.get(4);
            let status = MatchStatus::parse(&status_text)
                .with_context(|| format!("unknown match status {status_text:?}"))?;
            let link: Option<String> = row.get(5);

            let mut home_lineup: Lineup = [None; LINEUP_SLOTS];
            let mut away_lineup: Lineup = [None; LINEUP_SLOTS];
            for (i, slot) in home_lineup.iter_mut().enumerate() {
                *slot = row.get(8 + i);
            }
            for (i, slot) in away_lineup.iter_mut().enumerate() {
                *slot = row.get(8 + LINEUP_SLOTS + i);
            }

            matches.push(MatchRecord {
                id: row.get(0),
                home_id: row.get(1),
                away_id: row.get(2),
                date: row.get(3),
                status,
                link: link.unwrap_or_default(),
                home_goals: row.get(6),
                away_goals: row.get(7),
                home_lineup,
                away_lineup,
            });
        }
        Ok(matches)
    }

    /// Matches still UPCOMING whose kickoff date has passed, joined back to
    /// their league so the refresh pass can rebuild the right scopes.
    pub async fn upcoming_due(&self) -> Result<Vec<UpcomingMatch>> {
        let rows = sqlx::query(
            "SELECT match.match_id, match.home_id, match.away_id, match.link,
                    league.league, league.season
             FROM match
             JOIN club ON match.home_id = club.club_id
             JOIN league ON league.league_id = club.league_id
             WHERE match.status = 'UPCOMING' AND match.game_date <= CURRENT_DATE",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing due upcoming matches")?;
        Ok(rows
            .into_iter()
            .map(|r| UpcomingMatch {
                match_id: r.get(0),
                home_id: r.get(1),
                away_id: r.get(2),
                link: r.get(3),
                league_code: r.get(4),
                season: r.get(5),
            })
            .collect())
    }

    /// Fill in a refreshed report for one match by id. Same monotonic rule
    /// as the batch upsert; status only ever advances to FT, never away.
    pub async fn fill_match_report(
        &self,
        match_id: i64,
        status: MatchStatus,
        home_goals: Option<i16>,
        away_goals: Option<i16>,
        home_lineup: &Lineup,
        away_lineup: &Lineup,
    ) -> Result<()> {
        let mut query = sqlx::query(
            "UPDATE match SET
                 status = CASE WHEN status = 'FT' THEN status ELSE $2 END,
                 home_goals = COALESCE(home_goals, $3),
                 away_goals = COALESCE(away_goals, $4),
                 h1_player_id = COALESCE(h1_player_id, $5),
                 h2_player_id = COALESCE(h2_player_id, $6),
                 h3_player_id = COALESCE(h3_player_id, $7),
                 h4_player_id = COALESCE(h4_player_id, $8),
                 h5_player_id = COALESCE(h5_player_id, $9),
                 h6_player_id = COALESCE(h6_player_id, $10),
                 h7_player_id = COALESCE(h7_player_id, $11),
                 h8_player_id = COALESCE(h8_player_id, $12),
                 h9_player_id = COALESCE(h9_player_id, $13),
                 h10_player_id = COALESCE(h10_player_id, $14),
                 h11_player_id = COALESCE(h11_player_id, $15),
                 a1_player_id = COALESCE(a1_player_id, $16),
                 a2_player_id = COALESCE(a2_player_id, $17),
                 a3_player_id = COALESCE(a3_player_id, $18),
                 a4_player_id = COALESCE(a4_player_id, $19),
                 a5_player_id = COALESCE(a5_player_id, $20),
                 a6_player_id = COALESCE(a6_player_id, $21),
                 a7_player_id = COALESCE(a7_player_id, $22),
                 a8_player_id = COALESCE(a8_player_id, $23),
                 a9_player_id = COALESCE(a9_player_id, $24),
                 a10_player_id = COALESCE(a10_player_id, $25),
                 a11_player_id = COALESCE(a11_player_id, $26)
             WHERE match_id = $1",
        )
        .bind(match_id)
        .bind(status.as_str())
        .bind(home_goals)
        .bind(away_goals);
        for slot in home_lineup {
            query = query.bind(slot);
        }
        for slot in away_lineup {
            query = query.bind(slot);
        }
        query
            .execute(&self.pool)
            .await
            .with_context(|| format!("refreshing match {match_id}"))?;
        Ok(())
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Denormalized match rows for the snapshot export.
    pub async fn export_match_rows(&self) -> Result<Vec<ExportMatchRow>> {
        let rows = sqlx::query(
            "SELECT match.match_id, league.league, league.season,
                    home.club_name, away.club_name, match.game_date, match.status,
                    match.home_goals, match.away_goals,
                    match.home_max, match.draw_max, match.away_max,
                    match.max_over_2_5, match.max_under_2_5
             FROM match
             JOIN club home ON match.home_id = home.club_id
             JOIN club away ON match.away_id = away.club_id
             JOIN league ON league.league_id = home.league_id
             ORDER BY match.game_date, match.match_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("loading match rows for export")?;
        Ok(rows
            .into_iter()
            .map(|r| ExportMatchRow {
                match_id: r.get(0),
                league_code: r.get(1),
                season: r.get(2),
                home_name: r.get(3),
                away_name: r.get(4),
                date: r.get(5),
                status: r.get(6),
                home_goals: r.get(7),
                away_goals: r.get(8),
                home_max: r.get(9),
                draw_max: r.get(10),
                away_max: r.get(11),
                max_over: r.get(12),
                max_under: r.get(13),
            })
            .collect())
    }
}
