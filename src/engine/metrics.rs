//! Corpus run metrics.
//!
//! Collected only by [`SoundChanger::run_corpus_with_metrics`]; the plain
//! corpus path never touches a clock.
//!
//! ## Design notes
//!
//! - `compile` is measured once when the changer is built and copied into
//!   every report.
//! - `fired` counts rewritten sites, not words: an insertion rule matching
//!   three sites in one word adds three.
//!
//! [`SoundChanger::run_corpus_with_metrics`]: crate::SoundChanger::run_corpus_with_metrics

use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunMetrics {
    /// Total elapsed time for the corpus run, tokenizing included.
    pub total: Duration,
    /// Time spent loading the inventory and compiling the rule book.
    pub compile: Duration,
    /// Time spent applying rules.
    pub apply: Duration,
    /// Number of corpus words derived.
    pub words: usize,
    /// Number of words whose output differs from their input.
    pub changed: usize,
    /// Rewritten sites per rule, indexed like the rule book.
    pub fired: Vec<usize>,
}

impl RunMetrics {
    /// Indexes of rules that never fired during the run.
    pub fn idle_rules(&self) -> impl Iterator<Item = usize> + '_ {
        self.fired.iter().enumerate().filter(|(_, n)| **n == 0).map(|(i, _)| i)
    }

    /// Fold another partial run into this one.
    pub(crate) fn merge(&mut self, other: &RunMetrics) {
        self.apply += other.apply;
        self.words += other.words;
        self.changed += other.changed;
        if self.fired.len() < other.fired.len() {
            self.fired.resize(other.fired.len(), 0);
        }
        for (total, n) in self.fired.iter_mut().zip(&other.fired) {
            *total += n;
        }
    }
}
