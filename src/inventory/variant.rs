//! Nearest-variant resolution.
//!
//! A rule output such as `[+voice]` does not name a symbol; it names a
//! *change*. Resolving it for a source symbol is a three-stage search:
//!
//! ```text
//! candidates  = active symbols matching every requested value exactly
//!                 (none -> NoMatchingVariant)
//! profile     = source values with the requested values applied
//! score       = agreement with the profile on distinctive features
//!     │
//!     ├─ unique best score                      -> done
//!     ├─ relax_ties: breadth-first over sets of ignored distinctive
//!     │  features (depth <= #changes, memoized) -> first unique best
//!     └─ tie_break: all-feature agreement, then declaration distance
//! ```
//!
//! Every stage iterates in [`SymbolId`] / [`FeatureId`] order, so the result
//! never depends on container iteration order.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::{debug, warn};

use super::Inventory;
use crate::{FeatureId, Result, ShiftError, SignedFeature, SymbolId};

impl Inventory {
    /// The active symbol nearest to `source` with `changes` applied.
    pub fn resolve_variant(&self, source: SymbolId, changes: &[SignedFeature]) -> Result<SymbolId> {
        self.require_active()?;
        let candidates: Vec<SymbolId> = self.select_bundle(changes).into_iter().collect();
        if candidates.is_empty() {
            return Err(self.no_variant(source, changes));
        }

        let profile = self.profile(source, changes);
        let none = BTreeSet::new();
        let tied = best_by(&candidates, |c| self.agreement(c, &profile, &none));
        if let [only] = tied.as_slice() {
            return Ok(*only);
        }

        let changed: BTreeSet<FeatureId> = changes.iter().map(|sf| sf.feature).collect();
        if let Some(winner) = self.relax_ties(&tied, &profile, &changed) {
            return Ok(winner);
        }
        Ok(self.tie_break(source, &tied, &profile))
    }

    /// Resolve an output bundle with no source symbol, as in insertions.
    /// Several matches are settled by declaration order.
    pub fn resolve_inserted(&self, changes: &[SignedFeature]) -> Result<SymbolId> {
        self.require_active()?;
        let candidates = self.select_bundle(changes);
        let first = candidates.first().copied().ok_or_else(|| self.no_variant(SymbolId::NULL, changes))?;
        if candidates.len() > 1 {
            warn!(
                bundle = %self.render_bundle(changes),
                matches = candidates.len(),
                chosen = %self.display(first),
                "inserted bundle is ambiguous"
            );
        }
        Ok(first)
    }

    /// Break a tie between equally scored candidates by ignoring extra
    /// distinctive features.
    ///
    /// Explores sets of ignored features breadth-first, smallest sets first
    /// and in feature order within a level, never ignoring a changed feature
    /// and never ignoring more features than were changed. Each set is
    /// visited once. Returns the first candidate that is uniquely best under
    /// some ignored set, or `None` when the search space is exhausted.
    pub fn relax_ties(
        &self,
        tied: &[SymbolId],
        profile: &[Option<bool>],
        changed: &BTreeSet<FeatureId>,
    ) -> Option<SymbolId> {
        let depth_limit = changed.len();
        let relaxable: Vec<FeatureId> =
            self.distinctive_features().iter().copied().filter(|f| !changed.contains(f)).collect();
        if depth_limit == 0 || relaxable.is_empty() || tied.len() < 2 {
            return None;
        }

        let mut visited: HashSet<BTreeSet<FeatureId>> = HashSet::new();
        let mut queue: VecDeque<BTreeSet<FeatureId>> = VecDeque::new();
        visited.insert(BTreeSet::new());
        queue.push_back(BTreeSet::new());

        while let Some(ignored) = queue.pop_front() {
            if !ignored.is_empty() {
                let best = best_by(tied, |c| self.agreement(c, profile, &ignored));
                if let [only] = best.as_slice() {
                    debug!(ignored = ignored.len(), winner = %self.display(*only), "tie relaxed");
                    return Some(*only);
                }
            }
            if ignored.len() >= depth_limit {
                continue;
            }
            for &feature in &relaxable {
                if ignored.contains(&feature) {
                    continue;
                }
                let mut next = ignored.clone();
                next.insert(feature);
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Final deterministic choice: most agreement on all features, then the
    /// candidate declared nearest the source (the later one at equal
    /// distance), then the lowest id.
    fn tie_break(&self, source: SymbolId, tied: &[SymbolId], profile: &[Option<bool>]) -> SymbolId {
        let all_features = |c: SymbolId| {
            self.symbol(c).values.iter().zip(profile).filter(|(value, wanted)| value == wanted).count()
        };
        let distance = |c: SymbolId| c.0.abs_diff(source.0);
        let key = |c: SymbolId| (all_features(c), std::cmp::Reverse(distance(c)), c > source);

        let mut best = tied[0];
        for &candidate in &tied[1..] {
            if key(candidate) > key(best) {
                best = candidate;
            }
        }
        best
    }

    /// Source values with `changes` applied, over every feature.
    pub(crate) fn profile(&self, source: SymbolId, changes: &[SignedFeature]) -> Vec<Option<bool>> {
        let mut profile = self.symbol(source).values.clone();
        for signed in changes {
            profile[signed.feature.index()] = Some(signed.positive);
        }
        profile
    }

    /// Number of distinctive, non-ignored features on which `candidate`
    /// agrees with `profile`.
    fn agreement(&self, candidate: SymbolId, profile: &[Option<bool>], ignored: &BTreeSet<FeatureId>) -> usize {
        let values = &self.symbol(candidate).values;
        self.distinctive_features()
            .iter()
            .filter(|f| !ignored.contains(f))
            .filter(|f| values[f.index()] == profile[f.index()])
            .count()
    }

    fn no_variant(&self, source: SymbolId, changes: &[SignedFeature]) -> ShiftError {
        ShiftError::NoMatchingVariant {
            source_symbol: self.display(source).to_string(),
            changes: self.render_bundle(changes),
        }
    }
}

/// Candidates sharing the highest score, in input order.
fn best_by(candidates: &[SymbolId], score: impl Fn(SymbolId) -> usize) -> Vec<SymbolId> {
    let scored: Vec<(SymbolId, usize)> = candidates.iter().map(|&c| (c, score(c))).collect();
    let top = scored.iter().map(|(_, s)| *s).max().unwrap_or(0);
    scored.into_iter().filter(|(_, s)| *s == top).map(|(c, _)| c).collect()
}
