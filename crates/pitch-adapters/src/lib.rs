//! Source adapters: reduce raw page content to typed fact records.
//!
//! The pipeline core never inspects markup or sheet layout; everything it
//! consumes leaves this crate as a `pitch_core` fact struct. Each adapter
//! owns the selector and column knowledge of one source family:
//! fixture/lineup pages, roster tables, and the odds CSV sheets.

use chrono::NaiveDate;
use pitch_core::{MatchFacts, OddsRow, OddsSnapshot, PlayerFacts};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const CRATE_NAME: &str = "pitch-adapters";

/// Roster-source club spellings that never fuzzy-match their odds-source
/// counterparts. Applied to the candidate pool before resolution.
pub const KNOWN_CLUB_ALIASES: [(&str, &str); 7] = [
    ("RAEC Mons", "Bergen"),
    ("Leeds United", "Leeds"),
    ("Wolverhampton Wanderers", "Wolves"),
    ("Sporting CP", "Sp Lisbon"),
    ("União de Leiria", "Leiria"),
    ("Queens Park Rangers", "QPR"),
    ("Stade Rennais FC", "Rennes"),
];

pub fn known_club_alias(roster_name: &str) -> Option<&'static str> {
    KNOWN_CLUB_ALIASES
        .iter()
        .find(|(from, _)| *from == roster_name)
        .map(|(_, to)| *to)
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("bad selector: {0}")]
    Selector(String),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("unparseable {field}: {value:?}")]
    BadValue { field: &'static str, value: String },
}

fn sel(selector: &str) -> Result<Selector, AdapterError> {
    Selector::parse(selector).map_err(|e| AdapterError::Selector(e.to_string()))
}

fn text_of(node: ElementRef) -> String {
    node.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(text_of).filter(|t| !t.is_empty())
}

// ── Fixture pages ────────────────────────────────────────────────────────

/// Reduce one fixture page to its primitive facts.
///
/// Returns `Ok(None)` when the page lacks the match-info block entirely,
/// which is how the source renders removed or malformed fixtures; the
/// caller drops those without counting an error. A present page with
/// missing team titles or date is a parse error.
pub fn parse_fixture_page(html: &str, link: &str) -> Result<Option<MatchFacts>, AdapterError> {
    let document = Html::parse_document(html);

    let match_info_sel = sel("div.match-info")?;
    let Some(match_info) = document.select(&match_info_sel).next() else {
        return Ok(None);
    };

    let home_sel = sel("div.container.left a.team-title")?;
    let away_sel = sel("div.container.right a.team-title")?;
    let home_name =
        first_text(match_info, &home_sel).ok_or(AdapterError::MissingField("home team title"))?;
    let away_name =
        first_text(match_info, &away_sel).ok_or(AdapterError::MissingField("away team title"))?;

    let scoretime_sel = sel("h3.thick.scoretime")?;
    let marker_sel = sel("h3.thick.scoretime > span")?;
    let scoretime_text = first_text(match_info, &scoretime_sel).unwrap_or_default();
    let status_marker = first_text(match_info, &marker_sel);

    let date_sel = sel("div.details a")?;
    let date_text = document
        .select(&date_sel)
        .next()
        .map(text_of)
        .ok_or(AdapterError::MissingField("match date"))?;
    let date = NaiveDate::parse_from_str(&date_text, "%d/%m/%Y").map_err(|_| {
        AdapterError::BadValue {
            field: "match date",
            value: date_text,
        }
    })?;

    let (home_lineup, away_lineup) = parse_lineups(&document)?;

    Ok(Some(MatchFacts {
        link: link.to_string(),
        date,
        home_name,
        away_name,
        status_marker,
        scoretime_text,
        home_lineup,
        away_lineup,
    }))
}

fn parse_lineups(document: &Html) -> Result<(Vec<String>, Vec<String>), AdapterError> {
    let container_sel = sel("div.combined-lineups-container")?;
    let Some(container) = document.select(&container_sel).next() else {
        return Ok((Vec::new(), Vec::new()));
    };

    let left_sel = sel("div.container.left table tbody tr td.player.large-link a")?;
    let right_sel = sel("div.container.right table tbody tr td.player.large-link a")?;

    let names = |selector: &Selector| {
        container
            .select(selector)
            .map(text_of)
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
    };

    Ok((names(&left_sel), names(&right_sel)))
}

/// Extract every fixture-page link from a season results table. Relative
/// hrefs are joined onto `origin`.
pub fn parse_fixture_links(html: &str, origin: &str) -> Result<Vec<String>, AdapterError> {
    let document = Html::parse_document(html);
    let link_sel = sel("td.score-time a")?;

    let links = document
        .select(&link_sel)
        .filter_map(|node| node.value().attr("href"))
        .map(|href| {
            if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", origin.trim_end_matches('/'), href)
            }
        })
        .collect();
    Ok(links)
}

// ── Roster tables ────────────────────────────────────────────────────────

/// Reduce one roster-table page to player facts. An empty result is the
/// paged listing's end-of-data signal, not an error.
pub fn parse_roster_page(html: &str) -> Result<Vec<PlayerFacts>, AdapterError> {
    let document = Html::parse_document(html);

    let row_sel = sel("table.table-hover tbody tr")?;
    let name_sel = sel("td.col-name a.tooltip")?;
    let position_sel = sel("td.col-name a[rel=nofollow]")?;
    let country_sel = sel("td.col-name img")?;
    let club_sel = sel("td.col-name div > a")?;
    let overall_sel = sel("td.col-oa")?;
    let potential_sel = sel("td.col-pt")?;
    let age_sel = sel("td.col-ae")?;
    let value_sel = sel("td.col-vl")?;
    let total_sel = sel("td.col-tt")?;

    let mut players = Vec::new();
    for row in document.select(&row_sel) {
        let Some(name) = first_text(row, &name_sel) else {
            // Header and advert rows carry no player cell.
            continue;
        };
        let Some(club_name) = first_text(row, &club_sel) else {
            warn!(player = %name, "roster row without a club cell; skipping");
            continue;
        };

        let nationality = row
            .select(&country_sel)
            .next()
            .and_then(|img| img.value().attr("title"))
            .map(str::to_string);

        players.push(PlayerFacts {
            name,
            club_name,
            position: first_text(row, &position_sel),
            nationality,
            overall: first_text(row, &overall_sel).and_then(|t| t.parse().ok()),
            potential: first_text(row, &potential_sel).and_then(|t| t.parse().ok()),
            age: first_text(row, &age_sel).and_then(|t| t.parse().ok()),
            market_value: first_text(row, &value_sel).and_then(|t| parse_market_value(&t)),
            total: first_text(row, &total_sel).and_then(|t| t.parse().ok()),
        });
    }
    Ok(players)
}

/// Normalize a market-value cell to millions: "€105.5M" -> 105.5,
/// "€800K" -> 0.8, "€0" -> 0.0.
pub fn parse_market_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == 'M' || *c == 'K')
        .collect();
    if let Some(stripped) = cleaned.strip_suffix('M') {
        return stripped.parse().ok();
    }
    if let Some(stripped) = cleaned.strip_suffix('K') {
        return stripped.parse::<f64>().ok().map(|v| v / 1000.0);
    }
    cleaned.parse().ok()
}

// ── Odds sheets ──────────────────────────────────────────────────────────

/// A CSV sheet advertised on an odds index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsSheetLink {
    pub league_code: String,
    pub season: String,
    pub name: String,
    pub href: String,
}

/// Extract every season sheet link from an odds index page. Links whose
/// path does not carry the /<season>/<league>.csv shape are skipped.
pub fn parse_odds_index(html: &str) -> Result<Vec<OddsSheetLink>, AdapterError> {
    let document = Html::parse_document(html);
    let link_sel = sel(r#"a[href$=".csv"]"#)?;

    let mut sheets = Vec::new();
    for node in document.select(&link_sel) {
        let Some(href) = node.value().attr("href") else {
            continue;
        };
        let Some((season, league_code)) = season_and_league_from_href(href) else {
            warn!(href, "csv link without season/league path; skipping");
            continue;
        };
        sheets.push(OddsSheetLink {
            league_code,
            season,
            name: text_of(node),
            href: href.to_string(),
        });
    }
    Ok(sheets)
}

/// Pull (season, league) out of an href like "mmz4281/1920/E0.csv".
fn season_and_league_from_href(href: &str) -> Option<(String, String)> {
    let mut segments = href.split('/').rev();
    let file = segments.next()?;
    let season = segments.next()?;

    if season.len() != 4 || !season.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let stem = file.strip_suffix(".csv")?;
    let (letters, digit) = stem.split_at(stem.len().checked_sub(1)?);
    if letters.is_empty()
        || !letters.chars().all(|c| c.is_ascii_uppercase())
        || !digit.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    Some((season.to_string(), stem.to_string()))
}

/// Bookmaker price columns per outcome, as the sheet family names them.
const HOME_BROKERS: [&str; 13] = [
    "B365H", "BSH", "BWH", "GBH", "IWH", "LBH", "PSH", "SOH", "SBH", "SJH", "SYH", "VCH", "WHH",
];
const DRAW_BROKERS: [&str; 13] = [
    "B365D", "BSD", "BWD", "GBD", "IWD", "LBD", "PSD", "SOD", "SBD", "SJD", "SYD", "VCD", "WHD",
];
const AWAY_BROKERS: [&str; 13] = [
    "B365A", "BSA", "BWA", "GBA", "IWA", "LBA", "PSA", "SOA", "SBA", "SJA", "SYA", "VCA", "WHA",
];

/// Parse one season's odds sheet into best-price rows.
///
/// The sheets are ragged: trailing fields are dropped on old seasons, so
/// short rows are padded to the header width before indexing. Rows without
/// both team names or with an unparseable date are skipped with a warning.
pub fn parse_odds_csv(text: &str) -> Result<Vec<OddsRow>, AdapterError> {
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();
    let column = |name: &str| headers.iter().position(|h| *h == name);

    // Older sheets spell the team columns out; newer ones abbreviate.
    let home_col = column("HomeTeam")
        .or_else(|| column("HT"))
        .ok_or(AdapterError::MissingField("home team column"))?;
    let away_col = column("AwayTeam")
        .or_else(|| column("AT"))
        .ok_or(AdapterError::MissingField("away team column"))?;
    let date_col = column("Date").ok_or(AdapterError::MissingField("date column"))?;

    let market_home_col = column("MaxH");
    let market_draw_col = column("MaxD");
    let market_away_col = column("MaxA");
    let over_col = column("Max>2.5");
    let under_col = column("Max<2.5");

    let broker_cols = |names: &[&str]| -> Vec<(String, usize)> {
        names
            .iter()
            .filter_map(|n| column(n).map(|idx| (n.to_string(), idx)))
            .collect()
    };
    let home_brokers = broker_cols(&HOME_BROKERS);
    let draw_brokers = broker_cols(&DRAW_BROKERS);
    let away_brokers = broker_cols(&AWAY_BROKERS);

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields: Vec<&str> = line.split(',').map(str::trim).collect();
        fields.resize(headers.len(), "");

        let home_name = fields[home_col].to_string();
        let away_name = fields[away_col].to_string();
        if home_name.is_empty() || away_name.is_empty() {
            continue;
        }

        let Some(date) = parse_sheet_date(fields[date_col]) else {
            warn!(raw = fields[date_col], "odds row with unparseable date; skipping");
            continue;
        };

        let field_f64 = |idx: Option<usize>| idx.and_then(|i| fields[i].parse::<f64>().ok());
        let (home_max, broker_home_max) = best_price(&fields, &home_brokers);
        let (draw_max, broker_draw_max) = best_price(&fields, &draw_brokers);
        let (away_max, broker_away_max) = best_price(&fields, &away_brokers);

        rows.push(OddsRow {
            home_name,
            away_name,
            date,
            odds: OddsSnapshot {
                home_max,
                draw_max,
                away_max,
                broker_home_max,
                broker_draw_max,
                broker_away_max,
                market_home_max: field_f64(market_home_col),
                market_draw_max: field_f64(market_draw_col),
                market_away_max: field_f64(market_away_col),
                max_over: field_f64(over_col),
                max_under: field_f64(under_col),
            },
        });
    }
    Ok(rows)
}

/// Best price across the available bookmaker columns and who offered it.
fn best_price(fields: &[&str], brokers: &[(String, usize)]) -> (Option<f64>, Option<String>) {
    let mut best: Option<(f64, &str)> = None;
    for (name, idx) in brokers {
        let Ok(price) = fields[*idx].parse::<f64>() else {
            continue;
        };
        if best.map(|(b, _)| price > b).unwrap_or(true) {
            best = Some((price, name));
        }
    }
    match best {
        Some((price, name)) => (Some(price), Some(name.to_string())),
        None => (None, None),
    }
}

fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineup_rows(names: &[&str]) -> String {
        names
            .iter()
            .map(|n| format!(r#"<tr><td class="player large-link"><a>{n}</a></td></tr>"#))
            .collect()
    }

    fn fixture_page(marker: &str, scoreline: &str, home_rows: &str, away_rows: &str) -> String {
        format!(
            r#"<html><body>
            <div class="match-info">
              <div class="container left"><a class="team-title">Club A</a></div>
              <div class="container middle">
                <h3 class="thick scoretime">{scoreline} <span>{marker}</span></h3>
              </div>
              <div class="container right"><a class="team-title">Club B</a></div>
            </div>
            <div class="details"><a>22/05/2021</a></div>
            <div class="combined-lineups-container">
              <div class="container left"><table><tbody>{home_rows}</tbody></table></div>
              <div class="container right"><table><tbody>{away_rows}</tbody></table></div>
            </div>
            </body></html>"#
        )
    }

    #[test]
    fn fixture_page_reduces_to_facts() {
        let home: Vec<String> = (1..=11).map(|i| format!("Home {i}")).collect();
        let away: Vec<String> = (1..=11).map(|i| format!("Away {i}")).collect();
        let home_refs: Vec<&str> = home.iter().map(String::as_str).collect();
        let away_refs: Vec<&str> = away.iter().map(String::as_str).collect();
        let html = fixture_page("FT", "2 - 1", &lineup_rows(&home_refs), &lineup_rows(&away_refs));

        let facts = parse_fixture_page(&html, "https://example.org/m/1").unwrap().unwrap();
        assert_eq!(facts.home_name, "Club A");
        assert_eq!(facts.away_name, "Club B");
        assert_eq!(facts.status_marker.as_deref(), Some("FT"));
        assert!(facts.scoretime_text.contains("2 - 1"));
        assert_eq!(facts.date, NaiveDate::from_ymd_opt(2021, 5, 22).unwrap());
        assert_eq!(facts.home_lineup.len(), 11);
        assert_eq!(facts.home_lineup[0], "Home 1");
        assert_eq!(facts.away_lineup[10], "Away 11");
    }

    #[test]
    fn fixture_page_without_match_info_is_dropped_not_an_error() {
        let html = "<html><body><p>tournament cancelled</p></body></html>";
        assert!(parse_fixture_page(html, "x").unwrap().is_none());
    }

    #[test]
    fn fixture_page_without_lineup_block_yields_empty_lineups() {
        let html = r#"<html><body>
            <div class="match-info">
              <div class="container left"><a class="team-title">Club A</a></div>
              <h3 class="thick scoretime"><span>KO</span></h3>
              <div class="container right"><a class="team-title">Club B</a></div>
            </div>
            <div class="details"><a>01/08/2021</a></div>
            </body></html>"#;
        let facts = parse_fixture_page(html, "x").unwrap().unwrap();
        assert!(facts.home_lineup.is_empty());
        assert!(facts.away_lineup.is_empty());
        assert_eq!(facts.status_marker.as_deref(), Some("KO"));
    }

    #[test]
    fn fixture_links_join_relative_hrefs_onto_origin() {
        let html = r#"<table><tbody>
            <tr><td class="score-time"><a href="/matches/2021/05/22/one/">2 - 1</a></td></tr>
            <tr><td class="score-time"><a href="https://other.example/m/2">KO</a></td></tr>
            <tr><td class="info"><a href="/not-a-match/">x</a></td></tr>
        </tbody></table>"#;
        let links = parse_fixture_links(html, "https://fixtures.example/").unwrap();
        assert_eq!(
            links,
            vec![
                "https://fixtures.example/matches/2021/05/22/one/".to_string(),
                "https://other.example/m/2".to_string(),
            ]
        );
    }

    #[test]
    fn roster_rows_reduce_to_player_facts() {
        let html = r#"<html><body>
        <table class="table table-hover persist-area"><tbody>
          <tr>
            <td class="col-name">
              <a class="tooltip">L. Messi</a>
              <a rel="nofollow">RW</a>
              <img title="Argentina" src="x.png">
            </td>
            <td class="col-name"><div><a>FC Barcelona</a></div></td>
            <td class="col col-oa col-sort">93</td>
            <td class="col col-pt">93</td>
            <td class="col col-ae">33</td>
            <td class="col col-vl">€105.5M</td>
            <td class="col col-tt">2233</td>
          </tr>
          <tr>
            <td class="col-name">
              <a class="tooltip">Youngster</a>
              <a rel="nofollow">CM</a>
              <img title="Wales" src="y.png">
            </td>
            <td class="col-name"><div><a>Swansea City</a></div></td>
            <td class="col col-oa col-sort">61</td>
            <td class="col col-pt">74</td>
            <td class="col col-ae">17</td>
            <td class="col col-vl">€800K</td>
            <td class="col col-tt">1500</td>
          </tr>
        </tbody></table>
        </body></html>"#;

        let players = parse_roster_page(html).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "L. Messi");
        assert_eq!(players[0].club_name, "FC Barcelona");
        assert_eq!(players[0].position.as_deref(), Some("RW"));
        assert_eq!(players[0].nationality.as_deref(), Some("Argentina"));
        assert_eq!(players[0].overall, Some(93));
        assert_eq!(players[0].market_value, Some(105.5));
        assert_eq!(players[1].market_value, Some(0.8));
        assert_eq!(players[1].total, Some(1500));
    }

    #[test]
    fn empty_roster_page_parses_to_no_rows() {
        let html = r#"<table class="table table-hover persist-area"><tbody></tbody></table>"#;
        assert!(parse_roster_page(html).unwrap().is_empty());
    }

    #[test]
    fn market_values_normalize_to_millions() {
        assert_eq!(parse_market_value("€105.5M"), Some(105.5));
        assert_eq!(parse_market_value("€800K"), Some(0.8));
        assert_eq!(parse_market_value("€0"), Some(0.0));
        assert_eq!(parse_market_value("n/a"), None);
    }

    #[test]
    fn odds_index_extracts_season_sheets() {
        let html = r#"<html><body>
            <a href="mmz4281/1920/E0.csv">Premier League</a>
            <a href="mmz4281/1920/E1.csv">Championship</a>
            <a href="notes.txt">Notes</a>
            <a href="archive/all.csv">Everything</a>
        </body></html>"#;
        let sheets = parse_odds_index(html).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].league_code, "E0");
        assert_eq!(sheets[0].season, "1920");
        assert_eq!(sheets[0].name, "Premier League");
    }

    #[test]
    fn odds_csv_rows_carry_best_prices_and_brokers() {
        let csv = "\
Div,Date,HomeTeam,AwayTeam,B365H,B365D,B365A,WHH,WHD,WHA,MaxH,MaxD,MaxA,Max>2.5,Max<2.5
E0,14/08/2019,Liverpool,Norwich,1.25,6.5,12.0,1.28,6.0,11.0,1.30,6.75,13.0,1.44,3.05
E0,15/08/2019,Arsenal,Burnley,1.40,4.8,8.0,1.38,5.0,8.5,,,,,";
        let rows = parse_odds_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.home_name, "Liverpool");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2019, 8, 14).unwrap());
        assert_eq!(first.odds.home_max, Some(1.28));
        assert_eq!(first.odds.broker_home_max.as_deref(), Some("WHH"));
        assert_eq!(first.odds.away_max, Some(12.0));
        assert_eq!(first.odds.broker_away_max.as_deref(), Some("B365A"));
        assert_eq!(first.odds.market_home_max, Some(1.30));
        assert_eq!(first.odds.max_over, Some(1.44));

        let second = &rows[1];
        assert_eq!(second.odds.home_max, Some(1.40));
        assert_eq!(second.odds.market_home_max, None);
        assert_eq!(second.odds.max_under, None);
    }

    #[test]
    fn short_odds_rows_are_padded_to_header_width() {
        let csv = "Div,Date,HT,AT,B365H\nE0,01/09/19,Leeds,Hull";
        let rows = parse_odds_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_name, "Leeds");
        assert_eq!(rows[0].odds.home_max, None);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2019, 9, 1).unwrap());
    }

    #[test]
    fn alias_table_maps_roster_names_to_sheet_names() {
        assert_eq!(known_club_alias("Sporting CP"), Some("Sp Lisbon"));
        assert_eq!(known_club_alias("Benfica"), None);
    }
}
