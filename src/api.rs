use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::engine::{self, Derivation, RunMetrics};
use crate::{InitialActive, Inventory, Result, RuleBook, ShiftConfig, ShiftError, TableOptions, Word, compile_program};

/// Source texts for building a [`SoundChanger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sources<'a> {
    pub features: &'a str,
    pub rules: &'a str,
    pub categories: Option<&'a str>,
    /// One symbol per line, activated before the rule file runs.
    pub active: Option<&'a str>,
}

/// Options that affect inventory loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub table: TableOptions,
    pub initial_active: InitialActive,
}

/// A character dropped from a corpus word because it starts no declared
/// symbol.
///
/// `line` and `column` are 1-based; the column counts characters of the
/// trimmed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub character: char,
}

/// Outcome for one corpus word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordResult {
    /// 1-based line in the corpus text.
    pub line: usize,
    pub derivation: Derivation,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome for a whole corpus, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusResult {
    pub words: Vec<WordResult>,
}

impl CorpusResult {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.words.iter().flat_map(|w| &w.diagnostics)
    }
}

/// A compiled rule book bound to the inventory it was compiled against.
///
/// Building one runs every directive and compiles every rule; afterwards the
/// changer is read-only and may be shared across threads.
#[derive(Debug, Clone)]
pub struct SoundChanger {
    inventory: Inventory,
    book: RuleBook,
    compile_time: Duration,
}

impl SoundChanger {
    pub fn from_sources(sources: &Sources<'_>, options: &LoadOptions) -> Result<Self> {
        let start = Instant::now();
        let mut inventory = Inventory::from_table_str(sources.features, &options.table)?;
        if let Some(categories) = sources.categories {
            inventory.load_categories(categories)?;
        }
        if options.initial_active == InitialActive::All {
            inventory.activate_all();
        }
        if let Some(active) = sources.active {
            inventory.load_active_list(active)?;
        }
        let book = compile_program(sources.rules, &mut inventory)?;
        let compile_time = start.elapsed();
        info!(
            symbols = inventory.alphabet_len(),
            active = inventory.active().len(),
            rules = book.len(),
            elapsed_us = compile_time.as_micros() as u64,
            "sound changer ready"
        );
        Ok(SoundChanger { inventory, book, compile_time })
    }

    /// Read and compile every file named by `config`.
    pub fn from_config(config: &ShiftConfig) -> Result<Self> {
        config.validate()?;
        let features = read(&config.features)?;
        let rules = read(&config.rules)?;
        let categories = config.categories.as_deref().map(read).transpose()?;
        let active = config.active.as_deref().map(read).transpose()?;

        let sources = Sources {
            features: &features,
            rules: &rules,
            categories: categories.as_deref(),
            active: active.as_deref(),
        };
        let options = LoadOptions { table: config.table_options(), initial_active: config.initial_active };
        Self::from_sources(&sources, &options)
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn book(&self) -> &RuleBook {
        &self.book
    }

    /// Source text of the rule that produced `stage`.
    pub fn rule_source(&self, rule: usize) -> Option<&str> {
        self.book.get(rule).map(|r| r.source.as_str())
    }

    /// Frame `text` as a word, dropping characters that start no symbol.
    pub fn tokenize(&self, text: &str, line: usize) -> (Word, Vec<Diagnostic>) {
        let (symbols, rejected) = self.inventory.tokenize_lossy(text.trim());
        let diagnostics = rejected
            .into_iter()
            .map(|(column, character)| {
                warn!(line, column, character = %character, "dropped unknown character");
                Diagnostic { line, column, character }
            })
            .collect();
        (Word::frame(symbols), diagnostics)
    }

    /// Derive one word written as text.
    pub fn derive(&self, text: &str) -> WordResult {
        self.derive_line(text, 1)
    }

    /// `word->stage1->...->final` for `derivation`.
    pub fn format(&self, derivation: &Derivation) -> String {
        derivation.format(&self.inventory)
    }

    /// Derive every non-blank line of `corpus`. With `parallel`, words are
    /// spread over the rayon pool; results keep corpus order either way.
    pub fn run_corpus(&self, corpus: &str, parallel: bool) -> CorpusResult {
        let lines = corpus_lines(corpus);
        let words = if parallel {
            lines.par_iter().map(|&(line, text)| self.derive_line(text, line)).collect()
        } else {
            lines.iter().map(|&(line, text)| self.derive_line(text, line)).collect()
        };
        CorpusResult { words }
    }

    /// [`SoundChanger::run_corpus`] with timings and per-rule fire counts.
    pub fn run_corpus_with_metrics(&self, corpus: &str, parallel: bool) -> (CorpusResult, RunMetrics) {
        let total_start = Instant::now();
        let lines = corpus_lines(corpus);
        let counted = |&(line, text): &(usize, &str)| {
            let (word, diagnostics) = self.tokenize(text, line);
            let mut part = RunMetrics { fired: vec![0; self.book.len()], words: 1, ..Default::default() };
            let apply_start = Instant::now();
            let derivation = engine::run_counted(&word, &self.book, &mut part.fired);
            part.apply = apply_start.elapsed();
            part.changed = usize::from(derivation.changed());
            (WordResult { line, derivation, diagnostics }, part)
        };
        let results: Vec<(WordResult, RunMetrics)> =
            if parallel { lines.par_iter().map(counted).collect() } else { lines.iter().map(counted).collect() };

        let mut metrics = RunMetrics { compile: self.compile_time, fired: vec![0; self.book.len()], ..Default::default() };
        let mut words = Vec::with_capacity(results.len());
        for (word, part) in results {
            metrics.merge(&part);
            words.push(word);
        }
        metrics.total = total_start.elapsed();
        (CorpusResult { words }, metrics)
    }

    fn derive_line(&self, text: &str, line: usize) -> WordResult {
        let (word, diagnostics) = self.tokenize(text, line);
        let derivation = engine::run(&word, &self.book);
        WordResult { line, derivation, diagnostics }
    }
}

fn corpus_lines(corpus: &str) -> Vec<(usize, &str)> {
    corpus.lines().enumerate().map(|(i, l)| (i + 1, l)).filter(|(_, l)| !l.trim().is_empty()).collect()
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ShiftError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: &str = "sym,voice,syll\np,0,0\nb,1,0\nt,0,0\nd,1,0\na,1,1\n";

    fn changer(rules: &str) -> SoundChanger {
        let sources = Sources { features: FEATURES, rules, ..Default::default() };
        let options = LoadOptions { initial_active: InitialActive::All, ..Default::default() };
        SoundChanger::from_sources(&sources, &options).unwrap()
    }

    #[test]
    fn derive_formats_the_trace() {
        let sc = changer("[-voice,-syll]/[+voice]/a_a\n");
        let result = sc.derive("pata");
        assert_eq!(sc.format(&result.derivation), "pata->pada");
        assert_eq!(sc.rule_source(result.derivation.stages[0].rule), Some("[-voice,-syll]/[+voice]/a_a"));
    }

    #[test]
    fn unknown_characters_are_dropped_with_diagnostics() {
        let sc = changer("t/d/_\n");
        let result = sc.run_corpus("pat\n\npxt\n", false);
        assert_eq!(result.words.len(), 2);
        assert_eq!(result.words[1].line, 3);
        assert_eq!(result.words[1].diagnostics, [Diagnostic { line: 3, column: 2, character: 'x' }]);
        assert_eq!(sc.format(&result.words[1].derivation), "pt->pd");
        assert_eq!(result.diagnostics().count(), 1);
    }

    #[test]
    fn parallel_runs_keep_corpus_order() {
        let sc = changer("t/d/_\n0/a/_#\n");
        let corpus: String = (0..64).map(|i| if i % 2 == 0 { "pat\n" } else { "tap\n" }).collect();
        let serial = sc.run_corpus(&corpus, false);
        let parallel = sc.run_corpus(&corpus, true);
        assert_eq!(serial, parallel);
        assert_eq!(sc.format(&parallel.words[1].derivation), "tap->dap->dapa");
    }

    #[test]
    fn metrics_count_fired_sites() {
        let sc = changer("t/d/_\nb/p/_\n");
        let (result, metrics) = sc.run_corpus_with_metrics("tat\npa\n", true);
        assert_eq!(result.words.len(), 2);
        assert_eq!(metrics.words, 2);
        assert_eq!(metrics.changed, 1);
        assert_eq!(metrics.fired, [2, 0]);
        assert_eq!(metrics.idle_rules().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn active_list_seeds_an_empty_set() {
        let sources = Sources {
            features: FEATURES,
            rules: "[-voice]/[+voice]/_\n",
            active: Some("p\nb\n"),
            ..Default::default()
        };
        let sc = SoundChanger::from_sources(&sources, &LoadOptions::default()).unwrap();
        assert_eq!(sc.inventory().active().len(), 2);
        assert_eq!(sc.format(&sc.derive("pat").derivation), "pat->bat");
    }

    #[test]
    fn missing_files_report_their_path() {
        let config = ShiftConfig::new("/nonexistent/features.csv", "/nonexistent/rules.txt");
        match SoundChanger::from_config(&config) {
            Err(ShiftError::Io { path, .. }) => assert!(path.ends_with("features.csv")),
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn changer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SoundChanger>();
    }
}
