#[macro_use]
mod macros;
mod api;
mod compiler;
mod config;
mod engine;
mod error;
mod inventory;

#[cfg(test)]
mod tests;

pub use api::{CorpusResult, Diagnostic, LoadOptions, SoundChanger, Sources, WordResult};
pub use compiler::{
    ClassId, ClassTable, CompiledRule, Directive, FieldColumns, Line, Rule, RuleBook, RuleShape, Slot, compile, compile_program,
    parse_line,
};
pub use config::{InitialActive, ShiftConfig};
pub use engine::{Derivation, RunMetrics, Stage, apply, run};
pub use error::{Result, ShiftError};
pub use inventory::{Category, FeatureTable, Inventory, Modifier, Symbol, SymbolOrigin, TableOptions, TableRow};

use std::collections::BTreeSet;

// --- Core identifiers -------------------------------------------------------

/// Index of a symbol in the inventory, in declaration order.
///
/// Declaration order is the crate's canonical deterministic order: every tie
/// that is not settled by feature similarity is settled by comparing ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Epsilon: the target of insertions and the output of deletions.
    pub const NULL: SymbolId = SymbolId(0);
    /// Anchors both ends of every framed word.
    pub const BOUNDARY: SymbolId = SymbolId(1);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_reserved(self) -> bool {
        self == Self::NULL || self == Self::BOUNDARY
    }
}

/// Index of a feature column in the feature table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub(crate) u16);

impl FeatureId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A feature with a sign, e.g. `+voice` or `-nasal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignedFeature {
    pub feature: FeatureId,
    pub positive: bool,
}

/// A conjunction of signed features.
pub type Bundle = Vec<SignedFeature>;

/// A set of symbols, ordered by declaration.
pub type SymbolSet = BTreeSet<SymbolId>;

/// Index into the inventory's category table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(pub(crate) u32);

// --- Formulas ---------------------------------------------------------------

/// A single position specifier in a rule field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// One declared symbol, written literally.
    Literal(SymbolId),
    /// `*`: any symbol.
    Wildcard,
    /// `0`: the empty string.
    Null,
    /// `#`: the word boundary.
    Boundary,
    /// A declared category name standing for its active members.
    Category(CategoryId),
    /// `[..][..]`: a disjunction of feature bundles.
    Bundles(Vec<Bundle>),
}

impl Formula {
    pub fn is_null(&self) -> bool {
        matches!(self, Formula::Null)
    }
}

// --- Words ------------------------------------------------------------------

/// A symbol sequence framed by [`SymbolId::BOUNDARY`] at both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word {
    symbols: Vec<SymbolId>,
}

impl Word {
    /// Frame `symbols` with boundaries.
    pub fn frame(symbols: impl IntoIterator<Item = SymbolId>) -> Self {
        let mut framed = vec![SymbolId::BOUNDARY];
        framed.extend(symbols);
        framed.push(SymbolId::BOUNDARY);
        Word { symbols: framed }
    }

    /// Wrap an already framed sequence. Used by the engine, which preserves
    /// both boundaries by construction.
    pub(crate) fn from_framed(symbols: Vec<SymbolId>) -> Self {
        debug_assert!(symbols.len() >= 2);
        debug_assert_eq!(symbols.first(), Some(&SymbolId::BOUNDARY));
        debug_assert_eq!(symbols.last(), Some(&SymbolId::BOUNDARY));
        Word { symbols }
    }

    /// All symbols including both boundaries.
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// Symbols between the boundaries.
    pub fn interior(&self) -> &[SymbolId] {
        &self.symbols[1..self.symbols.len() - 1]
    }

    pub fn last_index(&self) -> usize {
        self.symbols.len() - 1
    }

    /// Render with boundaries, e.g. `#pad#`.
    pub fn framed_string(&self, inventory: &Inventory) -> String {
        self.symbols.iter().map(|&s| inventory.display(s)).collect()
    }

    /// Render without boundaries, e.g. `pad`.
    pub fn bare_string(&self, inventory: &Inventory) -> String {
        self.interior().iter().map(|&s| inventory.display(s)).collect()
    }
}
