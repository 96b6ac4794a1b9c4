//! Link discovery: season substitution over a seed URL, probe filtering,
//! and offset pagination for paged listings.

use std::future::Future;

use pitch_core::{find_season_token, season_tag, SEASON_SPANS};
use pitch_storage::{FetchError, ProbeOutcome};
use thiserror::Error;
use tracing::{info, warn};

use crate::pool::run_bounded;

/// Placeholder the paged-listing templates carry for the numeric offset.
pub const OFFSET_TOKEN: &str = "{offset}";

/// Row stride of the paged roster listings.
pub const OFFSET_STRIDE: u32 = 60;

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("no season token in seed url {0}")]
    MissingToken(String),
    #[error("season {0} is not in the chronological table")]
    UnknownSeason(String),
}

/// One period-substituted URL a source may serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonCandidate {
    pub league_code: String,
    pub season: String,
    pub url: String,
}

/// Substitute every season span from the seed's own season to the present
/// into the seed URL. Ascending chronological order by construction; the
/// table's spelling of each span is authoritative (the oldest season is
/// still served dashed, later ones compressed).
pub fn season_candidates(
    league_code: &str,
    seed_url: &str,
) -> Result<Vec<SeasonCandidate>, DiscoverError> {
    let (at, token) = find_season_token(seed_url)
        .ok_or_else(|| DiscoverError::MissingToken(seed_url.to_string()))?;
    let seed_tag =
        season_tag(token).ok_or_else(|| DiscoverError::UnknownSeason(token.to_string()))?;
    let start = SEASON_SPANS
        .iter()
        .position(|span| season_tag(span).as_deref() == Some(seed_tag.as_str()))
        .ok_or_else(|| DiscoverError::UnknownSeason(token.to_string()))?;

    Ok(SEASON_SPANS[start..]
        .iter()
        .map(|span| {
            let mut url = String::with_capacity(seed_url.len() + 1);
            url.push_str(&seed_url[..at]);
            url.push_str(span);
            url.push_str(&seed_url[at + token.len()..]);
            SeasonCandidate {
                league_code: league_code.to_string(),
                season: season_tag(span).expect("season table spans are well-formed"),
                url,
            }
        })
        .collect())
}

/// Keep only the candidates the source currently serves, probing each one
/// with bounded concurrency. The filtered set is identical to what a
/// sequential probe would produce: results re-sort by submission index
/// before filtering. A candidate the source answers with an error status
/// is dropped and logged as an omission, as is a transport failure that
/// survived the fetcher's retry budget.
pub async fn filter_served<P, Fut>(
    probe: P,
    candidates: Vec<SeasonCandidate>,
    parallelism: usize,
) -> Vec<SeasonCandidate>
where
    P: Fn(String) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<ProbeOutcome, FetchError>> + Send + 'static,
{
    let total = candidates.len();
    let indexed: Vec<(usize, SeasonCandidate)> = candidates.into_iter().enumerate().collect();

    let mut outcomes = run_bounded(parallelism, indexed, move |(idx, candidate)| {
        let probe = probe.clone();
        async move {
            let keep = match probe(candidate.url.clone()).await {
                Ok(ProbeOutcome::Served { .. }) => true,
                Ok(ProbeOutcome::NotServed { status }) => {
                    warn!(
                        url = %candidate.url,
                        status,
                        "season url not served; omitting"
                    );
                    false
                }
                Err(err) => {
                    warn!(
                        url = %candidate.url,
                        error = %err,
                        "probe failed after retries; omitting"
                    );
                    false
                }
            };
            (idx, candidate, keep)
        }
    })
    .await;

    outcomes.sort_by_key(|(idx, _, _)| *idx);
    let served: Vec<SeasonCandidate> = outcomes
        .into_iter()
        .filter(|(_, _, keep)| *keep)
        .map(|(_, candidate, _)| candidate)
        .collect();

    if served.len() < total {
        info!(
            served = served.len(),
            omitted = total - served.len(),
            "some season urls were omitted"
        );
    }
    served
}

/// Offset cursor over a paged listing. The walk has no fixed page count;
/// the caller stops when the source redirects away from the requested URL
/// or an empty table parses out of the page.
#[derive(Debug, Clone)]
pub struct OffsetWalk {
    template: String,
    stride: u32,
    next_offset: u32,
}

impl OffsetWalk {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            stride: OFFSET_STRIDE,
            next_offset: 0,
        }
    }

    /// URL for the current offset; advances the cursor by one stride.
    pub fn next_url(&mut self) -> String {
        let url = self
            .template
            .replace(OFFSET_TOKEN, &self.next_offset.to_string());
        self.next_offset += self.stride;
        url
    }
}

/// A paged listing signals exhaustion by redirecting to its canonical
/// "no more results" URL.
pub fn redirected_away(requested: &str, final_url: &str) -> bool {
    requested.trim_end_matches('/') != final_url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_expands_to_every_remaining_season_in_order() {
        let candidates =
            season_candidates("E0", "https://example.org/en/e0/20182019/fixtures").unwrap();
        assert_eq!(
            candidates
                .iter()
                .map(|c| c.season.as_str())
                .collect::<Vec<_>>(),
            vec!["1819", "1920", "2021"]
        );
        assert_eq!(
            candidates[1].url,
            "https://example.org/en/e0/20192020/fixtures"
        );
        assert!(candidates.iter().all(|c| c.league_code == "E0"));
    }

    #[test]
    fn dashed_seed_token_substitutes_with_the_table_spelling() {
        let candidates =
            season_candidates("P1", "https://example.org/p1/2019-2020/fixtures").unwrap();
        assert_eq!(candidates.len(), 2);
        // Later seasons are served compressed, whatever form the seed used.
        assert_eq!(candidates[0].url, "https://example.org/p1/20192020/fixtures");
        assert_eq!(candidates[1].url, "https://example.org/p1/20202021/fixtures");
    }

    #[test]
    fn seed_without_a_token_or_with_an_unknown_season_is_an_error() {
        assert!(matches!(
            season_candidates("E0", "https://example.org/latest/fixtures"),
            Err(DiscoverError::MissingToken(_))
        ));
        assert!(matches!(
            season_candidates("E0", "https://example.org/e0/20082009/fixtures"),
            Err(DiscoverError::UnknownSeason(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn probe_failures_drop_candidates_without_breaking_order() {
        let candidates =
            season_candidates("E0", "https://example.org/e0/20182019/fixtures").unwrap();

        let served = filter_served(
            |url: String| async move {
                if url.contains("20192020") {
                    Ok(ProbeOutcome::NotServed { status: 404 })
                } else {
                    Ok(ProbeOutcome::Served { final_url: url })
                }
            },
            candidates,
            4,
        )
        .await;

        assert_eq!(
            served.iter().map(|c| c.season.as_str()).collect::<Vec<_>>(),
            vec!["1819", "2021"]
        );
    }

    #[tokio::test]
    async fn transport_failure_surviving_retries_is_an_omission_not_a_panic() {
        let candidates =
            season_candidates("E0", "https://example.org/e0/20202021/fixtures").unwrap();
        let served = filter_served(
            |url: String| async move {
                Err(FetchError::HttpStatus { status: 503, url })
            },
            candidates,
            1,
        )
        .await;
        assert!(served.is_empty());
    }

    #[test]
    fn offset_walk_advances_by_stride() {
        let mut walk = OffsetWalk::new("https://example.org/players?offset={offset}");
        assert_eq!(walk.next_url(), "https://example.org/players?offset=0");
        assert_eq!(walk.next_url(), "https://example.org/players?offset=60");
        assert_eq!(walk.next_url(), "https://example.org/players?offset=120");
    }

    #[test]
    fn redirect_detection_tolerates_trailing_slashes() {
        assert!(!redirected_away(
            "https://example.org/players?offset=0",
            "https://example.org/players?offset=0/"
        ));
        assert!(redirected_away(
            "https://example.org/players?offset=600",
            "https://example.org/players"
        ));
    }
}
