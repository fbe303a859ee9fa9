use tracing::trace;

use super::rewrite::apply_counted;
use crate::{Inventory, RuleBook, Word};

/// A word snapshot produced by one rule that changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Index of the rule in its [`RuleBook`].
    pub rule: usize,
    pub word: Word,
}

/// The input word and every stage that differs from the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub input: Word,
    pub stages: Vec<Stage>,
}

impl Derivation {
    /// The final form: the last stage, or the input if nothing fired.
    pub fn output(&self) -> &Word {
        self.stages.last().map_or(&self.input, |stage| &stage.word)
    }

    pub fn changed(&self) -> bool {
        !self.stages.is_empty()
    }

    /// `word->stage1->...->final`, without boundaries.
    pub fn format(&self, inventory: &Inventory) -> String {
        let mut line = self.input.bare_string(inventory);
        for stage in &self.stages {
            line.push_str("->");
            line.push_str(&stage.word.bare_string(inventory));
        }
        line
    }
}

/// Apply every rule of `book` to `word`, in order.
pub fn run(word: &Word, book: &RuleBook) -> Derivation {
    run_with(word, book, |_, _| {})
}

/// [`run`], adding each rule's rewritten-site count to `fired[rule]`.
pub(crate) fn run_counted(word: &Word, book: &RuleBook, fired: &mut [usize]) -> Derivation {
    run_with(word, book, |rule, sites| fired[rule] += sites)
}

fn run_with(word: &Word, book: &RuleBook, mut on_fire: impl FnMut(usize, usize)) -> Derivation {
    let mut stages: Vec<Stage> = Vec::new();
    for rule in book.rules() {
        let current = stages.last().map_or(word, |stage| &stage.word);
        if !rule.could_fire(current.symbols()) {
            continue;
        }
        let (next, sites) = apply_counted(rule, book.classes(), current);
        if sites == 0 {
            continue;
        }
        on_fire(rule.index, sites);
        if next != *current {
            trace!(rule = rule.index, line = rule.line, sites, "rule fired");
            stages.push(Stage { rule: rule.index, word: next });
        }
    }
    Derivation { input: word.clone(), stages }
}
