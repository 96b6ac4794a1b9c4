//! Canonical domain model for the Pitch Ledger reconciliation pipeline.
//!
//! Everything here is the *persisted* shape of an entity, not the scraped
//! shape: adapters hand over [`RawFact`] values, the sync pipeline attaches
//! surrogate ids and writes the canonical rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "pitch-core";

/// Number of starting players per side.
pub const LINEUP_SLOTS: usize = 11;

/// A resolved starting lineup. A slot is `None` until the player is known.
pub type Lineup = [Option<i64>; LINEUP_SLOTS];

/// Chronological table of season spans as the source sites encode them in
/// their URLs. The oldest season keeps the dashed form the fixture source
/// still serves it under; every later season is compressed.
pub const SEASON_SPANS: [&str; 10] = [
    "2011-2012",
    "20122013",
    "20132014",
    "20142015",
    "20152016",
    "20162017",
    "20172018",
    "20182019",
    "20192020",
    "20202021",
];

/// Compress a season span into its 4-digit tag: `"2012-2013"` -> `"1213"`.
/// Accepts both the dashed and the compressed form; anything that does not
/// contain exactly eight digits is rejected.
pub fn season_tag(span: &str) -> Option<String> {
    let digits: Vec<char> = span.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 || span.chars().any(|c| !c.is_ascii_digit() && c != '-') {
        return None;
    }
    let mut tag = String::with_capacity(4);
    tag.push(digits[2]);
    tag.push(digits[3]);
    tag.push(digits[6]);
    tag.push(digits[7]);
    Some(tag)
}

/// Locate the single season token inside a seed URL: four digits, an
/// optional dash, four digits. Returns the byte offset and the token.
pub fn find_season_token(url: &str) -> Option<(usize, &str)> {
    let bytes = url.as_bytes();
    let digits_at = |start: usize, count: usize| {
        start + count <= bytes.len() && bytes[start..start + count].iter().all(u8::is_ascii_digit)
    };
    for start in 0..bytes.len() {
        if !digits_at(start, 4) {
            continue;
        }
        // Dashed form wins over the compressed reading of the same span.
        if start + 4 < bytes.len() && bytes[start + 4] == b'-' && digits_at(start + 5, 4) {
            return Some((start, &url[start..start + 9]));
        }
        if digits_at(start, 8) {
            return Some((start, &url[start..start + 8]));
        }
    }
    None
}

/// A league in one season. Unique on (code, season).
///
/// The three location columns are pointers to where each source serves this
/// league's data; discovery fills them in as it finds working URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    /// Short source code, e.g. "E0" or "D1".
    pub code: String,
    /// 4-digit compressed season tag, e.g. "1920".
    pub season: String,
    pub name: Option<String>,
    pub fixtures_url: Option<String>,
    pub roster_url: Option<String>,
    pub odds_url: Option<String>,
}

/// A club within exactly one league. Unique on (league_id, name); the same
/// real-world club reappears as a new row each season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub id: i64,
    pub league_id: i64,
    pub name: String,
}

/// A player in a club's squad at the time of observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub club_id: i64,
    pub name: String,
    pub overall: Option<i16>,
    pub potential: Option<i16>,
    pub position: Option<String>,
    pub age: Option<i16>,
    /// Market value in millions.
    pub market_value: Option<f64>,
    pub nationality: Option<String>,
    pub total: Option<i16>,
}

/// Match lifecycle as derived from a single page observation. There are no
/// transitions beyond these three states per observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Upcoming,
    Started,
    Finished,
}

impl MatchStatus {
    /// Stable string form as persisted. Finished matches keep the source's
    /// own "FT" spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "UPCOMING",
            MatchStatus::Started => "STARTED",
            MatchStatus::Finished => "FT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPCOMING" => Some(MatchStatus::Upcoming),
            "STARTED" => Some(MatchStatus::Started),
            "FT" => Some(MatchStatus::Finished),
            _ => None,
        }
    }
}

/// Best observed prices per outcome, aggregated across bookmakers.
/// Every field is nullable: the odds sheet for a season may lack any column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub home_max: Option<f64>,
    pub draw_max: Option<f64>,
    pub away_max: Option<f64>,
    pub broker_home_max: Option<String>,
    pub broker_draw_max: Option<String>,
    pub broker_away_max: Option<String>,
    pub market_home_max: Option<f64>,
    pub market_draw_max: Option<f64>,
    pub market_away_max: Option<f64>,
    pub max_over: Option<f64>,
    pub max_under: Option<f64>,
}

impl OddsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.home_max.is_none()
            && self.draw_max.is_none()
            && self.away_max.is_none()
            && self.market_home_max.is_none()
            && self.market_draw_max.is_none()
            && self.market_away_max.is_none()
            && self.max_over.is_none()
            && self.max_under.is_none()
    }
}

/// A fixture as persisted. Unique on (home_id, away_id, date); `link` is
/// kept as a secondary natural key for diagnostics and the refresh pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
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

/// Scope key naming one league in one season.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeagueSeason {
    pub code: String,
    pub season: String,
}

impl LeagueSeason {
    pub fn new(code: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            season: season.into(),
        }
    }
}

impl std::fmt::Display for LeagueSeason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.code, self.season)
    }
}

/// One fixture page reduced to primitive fields by a source adapter.
///
/// `status_marker` is the raw scoretime badge ("FT", "AET", "KO", a minute
/// count, ...); `None` means the page carried no badge at all, which the
/// assembler treats as a cancelled or malformed fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFacts {
    pub link: String,
    pub date: NaiveDate,
    pub home_name: String,
    pub away_name: String,
    pub status_marker: Option<String>,
    pub scoretime_text: String,
    pub home_lineup: Vec<String>,
    pub away_lineup: Vec<String>,
}

/// One roster-table row reduced to primitive fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFacts {
    pub name: String,
    pub club_name: String,
    pub position: Option<String>,
    pub nationality: Option<String>,
    pub overall: Option<i16>,
    pub potential: Option<i16>,
    pub age: Option<i16>,
    pub market_value: Option<f64>,
    pub total: Option<i16>,
}

/// One odds-sheet row, already reduced to best prices per outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRow {
    pub home_name: String,
    pub away_name: String,
    pub date: NaiveDate,
    pub odds: OddsSnapshot,
}

/// Tagged adapter handoff record: the only shape the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawFact {
    Match(MatchFacts),
    Player(PlayerFacts),
    Odds(OddsRow),
}
