//! Name resolution: exact lookup first, sequence-ratio fuzzy fallback with
//! greedy exclusive assignment.
//!
//! Every resolution happens inside an explicit [`Scope`], the candidate
//! (name -> id) pool for one league+season or one club's squad. Scopes are
//! built once from a store lookup and shared read-only; there is no global
//! matching across scopes.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

/// Best-score floor below which a fuzzy candidate is not accepted. Callers
/// decide what a [`Resolution::NoMatch`] means: the catalog pass creates a
/// new club, the schedule and odds passes skip the item.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.55;

/// Similarity ratio in [0, 1]: twice the matching characters found by
/// recursive longest-common-block matching, over the sum of both lengths.
/// Matching is case-sensitive; sources are assumed pre-trimmed.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * matching_chars(&a, &b)) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (at, bt, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..at], &b[..bt]) + matching_chars(&a[at + len..], &b[bt + len..])
}

/// First longest common block, scanning `a` then `b` ascending so equal
/// lengths resolve deterministically.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = prev[j] + 1;
                row[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = row;
    }
    best
}

/// The bounded candidate set one resolution decision is made against.
#[derive(Debug, Clone)]
pub struct Scope {
    label: String,
    by_name: HashMap<String, i64>,
}

impl Scope {
    pub fn new(label: impl Into<String>, by_name: HashMap<String, i64>) -> Self {
        Self {
            label: label.into(),
            by_name,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    /// Record a canonical row created mid-pass, e.g. a club the catalog
    /// pass just inserted.
    pub fn insert(&mut self, name: String, id: i64) {
        self.by_name.insert(name, id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact {
        id: i64,
        name: String,
    },
    Fuzzy {
        id: i64,
        name: String,
        score: f64,
    },
    /// Nothing in scope crossed the similarity floor. Carries the best
    /// candidate seen so callers can log or decide to create a new row.
    NoMatch {
        best: Option<(String, f64)>,
    },
}

impl Resolution {
    pub fn id(&self) -> Option<i64> {
        match self {
            Resolution::Exact { id, .. } | Resolution::Fuzzy { id, .. } => Some(*id),
            Resolution::NoMatch { .. } => None,
        }
    }

    fn matched_name(&self) -> Option<&str> {
        match self {
            Resolution::Exact { name, .. } | Resolution::Fuzzy { name, .. } => Some(name),
            Resolution::NoMatch { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The scope has no candidates at all. This means a prerequisite phase
    /// has not run for this scope and the whole batch must stop, not that
    /// one item failed.
    #[error("empty candidate scope {0:?}; prerequisite phase has not populated it")]
    EmptyScope(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    pub min_similarity: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

impl Resolver {
    pub fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }

    /// Resolve one observed name against a scope.
    pub fn resolve(&self, observed: &str, scope: &Scope) -> Result<Resolution, ResolveError> {
        self.resolve_excluding(observed, scope, &HashSet::new())
    }

    /// Resolve a batch of observed names with greedy one-to-one assignment:
    /// each matched candidate is withdrawn from the pool before the next
    /// name resolves, so two observed names never share a canonical id.
    pub fn resolve_batch(
        &self,
        observed: &[String],
        scope: &Scope,
    ) -> Result<Vec<Resolution>, ResolveError> {
        if scope.is_empty() {
            return Err(ResolveError::EmptyScope(scope.label.clone()));
        }
        let mut taken: HashSet<String> = HashSet::new();
        let mut out = Vec::with_capacity(observed.len());
        for name in observed {
            let resolution = self.resolve_excluding(name, scope, &taken)?;
            if let Some(matched) = resolution.matched_name() {
                taken.insert(matched.to_string());
            }
            out.push(resolution);
        }
        Ok(out)
    }

    fn resolve_excluding(
        &self,
        observed: &str,
        scope: &Scope,
        taken: &HashSet<String>,
    ) -> Result<Resolution, ResolveError> {
        if scope.is_empty() {
            return Err(ResolveError::EmptyScope(scope.label.clone()));
        }

        if !taken.contains(observed) {
            if let Some(id) = scope.get(observed) {
                return Ok(Resolution::Exact {
                    id,
                    name: observed.to_string(),
                });
            }
        }

        // Equal scores tie-break to the lexicographically smallest name so
        // re-runs are deterministic regardless of map iteration order.
        let mut best: Option<(&str, i64, f64)> = None;
        for (name, &id) in &scope.by_name {
            if taken.contains(name) {
                continue;
            }
            let score = sequence_ratio(observed, name);
            let better = match best {
                None => true,
                Some((best_name, _, best_score)) => {
                    score > best_score || (score == best_score && name.as_str() < best_name)
                }
            };
            if better {
                best = Some((name, id, score));
            }
        }

        match best {
            Some((name, id, score)) if score >= self.min_similarity => {
                debug!(observed, matched = name, score, scope = %scope.label, "fuzzy match");
                Ok(Resolution::Fuzzy {
                    id,
                    name: name.to_string(),
                    score,
                })
            }
            Some((name, _, score)) => Ok(Resolution::NoMatch {
                best: Some((name.to_string(), score)),
            }),
            // Every candidate already taken by an earlier name in the batch.
            None => Ok(Resolution::NoMatch { best: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(pairs: &[(&str, i64)]) -> Scope {
        Scope::new(
            "test scope",
            pairs.iter().map(|(n, id)| (n.to_string(), *id)).collect(),
        )
    }

    #[test]
    fn ratio_of_identical_strings_is_one() {
        assert_eq!(sequence_ratio("Sporting CP", "Sporting CP"), 1.0);
        assert_eq!(sequence_ratio("", ""), 1.0);
    }

    #[test]
    fn ratio_counts_matching_blocks_recursively() {
        // "abc" matches, "d"/"x" does not: 2*3 / 8.
        assert_eq!(sequence_ratio("abcd", "abcx"), 0.75);
        assert_eq!(sequence_ratio("aa", ""), 0.0);
    }

    #[test]
    fn exact_match_is_lossless_for_every_scope_member() {
        let scope = scope(&[("Sporting CP", 10), ("Benfica", 11), ("Porto", 12)]);
        let resolver = Resolver::default();
        for (name, id) in [("Sporting CP", 10), ("Benfica", 11), ("Porto", 12)] {
            let resolution = resolver.resolve(name, &scope).unwrap();
            assert_eq!(resolution, Resolution::Exact { id, name: name.into() });
        }
    }

    #[test]
    fn punctuation_variant_resolves_to_its_canonical_counterpart() {
        let scope = scope(&[("Arsenal FC", 1), ("Aston Villa", 2)]);
        let resolution = Resolver::default().resolve("Arsenal", &scope).unwrap();
        assert_eq!(resolution.id(), Some(1));
        assert!(matches!(resolution, Resolution::Fuzzy { score, .. } if score > 0.8));
    }

    #[test]
    fn best_similarity_wins_when_no_exact_match_exists() {
        // "Sp Lisbon" shares the "Sp" head and more with "Sporting CP" than
        // with "Benfica"; with the floor lowered it must pick the former.
        let scope = scope(&[("Sporting CP", 10), ("Benfica", 11)]);
        let resolution = Resolver::new(0.1).resolve("Sp Lisbon", &scope).unwrap();
        assert_eq!(resolution.id(), Some(10));
    }

    #[test]
    fn scores_below_the_floor_surface_as_no_match_with_the_best_candidate() {
        let scope = scope(&[("Sporting CP", 10), ("Benfica", 11)]);
        let resolution = Resolver::default().resolve("Sp Lisbon", &scope).unwrap();
        match resolution {
            Resolution::NoMatch { best: Some((name, score)) } => {
                assert_eq!(name, "Sporting CP");
                assert!(score < DEFAULT_MIN_SIMILARITY);
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn equal_scores_tie_break_to_the_lexicographically_smallest_name() {
        // "aa" scores 0.5 against both candidates.
        let scope = scope(&[("ba", 2), ("ab", 1)]);
        let resolution = Resolver::new(0.5).resolve("aa", &scope).unwrap();
        assert_eq!(
            resolution,
            Resolution::Fuzzy { id: 1, name: "ab".into(), score: 0.5 }
        );
    }

    #[test]
    fn batch_resolution_never_assigns_one_candidate_twice() {
        let scope = scope(&[("Alpha", 1), ("Beta", 2)]);
        let resolutions = Resolver::default()
            .resolve_batch(&["Alpha".into(), "Alpha".into()], &scope)
            .unwrap();
        assert_eq!(resolutions[0].id(), Some(1));
        // The second "Alpha" finds its exact candidate withdrawn and nothing
        // else crosses the floor.
        assert_eq!(resolutions[1].id(), None);
    }

    #[test]
    fn batch_resolution_matches_each_name_to_its_own_candidate() {
        let scope = scope(&[("J. Smith", 1), ("K. Jones", 2), ("L. Brown", 3)]);
        let resolutions = Resolver::default()
            .resolve_batch(&["K. Jones".into(), "J. Smith".into()], &scope)
            .unwrap();
        assert_eq!(resolutions[0].id(), Some(2));
        assert_eq!(resolutions[1].id(), Some(1));
    }

    #[test]
    fn empty_scope_is_a_fatal_resolution_error() {
        let empty = scope(&[]);
        let resolver = Resolver::default();
        assert!(matches!(
            resolver.resolve("anyone", &empty),
            Err(ResolveError::EmptyScope(_))
        ));
        assert!(matches!(
            resolver.resolve_batch(&["anyone".into()], &empty),
            Err(ResolveError::EmptyScope(_))
        ));
    }
}
