//! The feature inventory: symbols, signed features and the active subset.
//!
//! An [`Inventory`] owns three layers of state:
//!
//! ```text
//! alphabet      every declared symbol (base rows + modifier variants),
//!               with a per-feature value and a reverse index per sign
//!     │
//! ActiveSet     the symbols currently in play; grows only through
//!               `add_active_symbol` (rule-file `add` directives)
//!     │
//! distinctive   features whose value varies across the ActiveSet,
//!               recomputed from scratch after every ActiveSet change
//! ```
//!
//! Symbols are identified by [`SymbolId`], assigned in declaration order.
//! Ids `0` and `1` are the reserved null and boundary symbols; they are never
//! part of the ActiveSet and never appear in a reverse index.
//!
//! Submodules:
//!
//! - `table.rs`: parsing the feature table and building the alphabet,
//!   including modifier expansion.
//! - `variant.rs`: nearest-variant resolution and bounded tie relaxation.

#[path = "inventory/table.rs"]
mod table;
#[path = "inventory/variant.rs"]
mod variant;

pub(crate) use table::is_reserved_char;
pub use table::{FeatureTable, TableOptions, TableRow};

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::{Bundle, CategoryId, FeatureId, Formula, Result, ShiftError, SignedFeature, SymbolId, SymbolSet};

pub(crate) const NULL_DISPLAY: &str = "∅";
pub(crate) const BOUNDARY_DISPLAY: &str = "#";

/// How a symbol entered the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOrigin {
    /// Null or boundary.
    Reserved,
    /// A plain feature-table row.
    Base,
    /// A base symbol with a modifier applied; `modifier` indexes
    /// [`Inventory::modifiers`].
    Derived { base: SymbolId, modifier: usize },
}

/// An alphabet element with its feature values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub origin: SymbolOrigin,
    /// One entry per feature: `Some(true)` has it, `Some(false)` has its
    /// negation, `None` unspecified.
    pub(crate) values: Vec<Option<bool>>,
}

impl Symbol {
    pub fn value(&self, feature: FeatureId) -> Option<bool> {
        self.values.get(feature.index()).copied().flatten()
    }

    pub fn has(&self, signed: SignedFeature) -> bool {
        self.value(signed.feature) == Some(signed.positive)
    }
}

/// A named feature-override transform (a diacritic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    /// Diacritic text appended to the base symbol's display form.
    pub name: String,
    pub overrides: Vec<SignedFeature>,
}

/// A user-declared one-character class of symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: char,
    pub members: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct Inventory {
    features: Vec<String>,
    feature_ids: HashMap<String, FeatureId>,
    symbols: Vec<Symbol>,
    symbol_ids: HashMap<String, SymbolId>,
    /// Reverse index: feature -> symbols with `+feature`.
    positive: Vec<SymbolSet>,
    /// Reverse index: feature -> symbols with `-feature`.
    negative: Vec<SymbolSet>,
    modifiers: Vec<Modifier>,
    categories: Vec<Category>,
    category_ids: HashMap<char, CategoryId>,
    /// Length in chars of the longest symbol name, bounds greedy matching.
    longest_name: usize,
    active: SymbolSet,
    distinctive: BTreeSet<FeatureId>,
}

impl Inventory {
    /// An inventory with the given feature names and only the reserved
    /// symbols declared.
    pub(crate) fn with_features(features: Vec<String>) -> Self {
        let feature_ids = features.iter().enumerate().map(|(i, name)| (name.clone(), FeatureId(i as u16))).collect();
        let count = features.len();
        let mut inventory = Inventory {
            features,
            feature_ids,
            symbols: Vec::new(),
            symbol_ids: HashMap::new(),
            positive: vec![SymbolSet::new(); count],
            negative: vec![SymbolSet::new(); count],
            modifiers: Vec::new(),
            categories: Vec::new(),
            category_ids: HashMap::new(),
            longest_name: 0,
            active: SymbolSet::new(),
            distinctive: BTreeSet::new(),
        };
        for name in [NULL_DISPLAY, BOUNDARY_DISPLAY] {
            inventory.symbols.push(Symbol {
                name: name.to_string(),
                origin: SymbolOrigin::Reserved,
                values: vec![None; count],
            });
        }
        inventory
    }

    /// Declare a symbol, keeping both reverse indexes in step with its
    /// values. Returns `None` if the name is already taken.
    pub(crate) fn insert_symbol(
        &mut self,
        name: String,
        values: Vec<Option<bool>>,
        origin: SymbolOrigin,
    ) -> Option<SymbolId> {
        if self.symbol_ids.contains_key(&name) {
            return None;
        }
        let id = SymbolId(self.symbols.len() as u32);
        for (index, value) in values.iter().enumerate() {
            match value {
                Some(true) => {
                    self.positive[index].insert(id);
                }
                Some(false) => {
                    self.negative[index].insert(id);
                }
                None => {}
            }
        }
        self.longest_name = self.longest_name.max(name.chars().count());
        self.symbol_ids.insert(name.clone(), id);
        self.symbols.push(Symbol { name, origin, values });
        Some(id)
    }

    pub(crate) fn push_modifier(&mut self, modifier: Modifier) -> usize {
        self.modifiers.push(modifier);
        self.modifiers.len() - 1
    }

    // --- Lookup -----------------------------------------------------------

    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    pub fn feature_id(&self, name: &str) -> Option<FeatureId> {
        self.feature_ids.get(name).copied()
    }

    pub fn feature_name(&self, feature: FeatureId) -> &str {
        &self.features[feature.index()]
    }

    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.symbol_ids.get(name).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn display(&self, id: SymbolId) -> &str {
        &self.symbols[id.index()].name
    }

    /// Declared (non-reserved) symbols in declaration order.
    pub fn declared(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (2..self.symbols.len()).map(|i| SymbolId(i as u32))
    }

    /// Number of declared (non-reserved) symbols.
    pub fn alphabet_len(&self) -> usize {
        self.symbols.len() - 2
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Symbols carrying `signed`, active or not.
    pub fn with_feature(&self, signed: SignedFeature) -> &SymbolSet {
        if signed.positive { &self.positive[signed.feature.index()] } else { &self.negative[signed.feature.index()] }
    }

    /// Render a bundle as `[+a,-b]`.
    pub fn render_bundle(&self, bundle: &[SignedFeature]) -> String {
        let parts: Vec<String> = bundle
            .iter()
            .map(|sf| format!("{}{}", if sf.positive { '+' } else { '-' }, self.feature_name(sf.feature)))
            .collect();
        format!("[{}]", parts.join(","))
    }

    // --- Categories -------------------------------------------------------

    pub fn category_id(&self, name: char) -> Option<CategoryId> {
        self.category_ids.get(&name).copied()
    }

    pub fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id.0 as usize]
    }

    /// Load `name,member,member...` lines. Names are single characters that
    /// do not clash with a declared symbol or a reserved token.
    pub fn load_categories(&mut self, text: &str) -> Result<()> {
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }
            let mut cells = trimmed.split(',').map(str::trim);
            let head = cells.next().unwrap_or_default();
            let mut chars = head.chars();
            let name = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(ShiftError::table(line, format!("category name '{head}' must be one character"))),
            };
            if is_reserved_char(name) || self.symbol_id(head).is_some() {
                return Err(ShiftError::table(line, format!("category name '{name}' clashes with a symbol")));
            }
            if self.category_ids.contains_key(&name) {
                return Err(ShiftError::table(line, format!("category '{name}' declared twice")));
            }
            let mut members = Vec::new();
            for cell in cells.filter(|c| !c.is_empty()) {
                let id = self.symbol_id(cell).ok_or_else(|| ShiftError::UnknownSymbol(cell.to_string()))?;
                if !members.contains(&id) {
                    members.push(id);
                }
            }
            let id = CategoryId(self.categories.len() as u32);
            debug!(category = %name, members = members.len(), "declared category");
            self.categories.push(Category { name, members });
            self.category_ids.insert(name, id);
        }
        Ok(())
    }

    // --- ActiveSet --------------------------------------------------------

    pub fn active(&self) -> &SymbolSet {
        &self.active
    }

    pub fn is_active(&self, id: SymbolId) -> bool {
        self.active.contains(&id)
    }

    /// Features whose value is not constant across the ActiveSet.
    pub fn distinctive_features(&self) -> &BTreeSet<FeatureId> {
        &self.distinctive
    }

    /// Complement of [`Inventory::distinctive_features`]: features every
    /// active symbol agrees on. This is the set that shrinks as the
    /// ActiveSet grows; the distinctive set itself only ever grows.
    pub fn constant_features(&self) -> BTreeSet<FeatureId> {
        (0..self.features.len()).map(|i| FeatureId(i as u16)).filter(|f| !self.distinctive.contains(f)).collect()
    }

    /// Add a declared symbol to the ActiveSet by name.
    pub fn add_active_symbol(&mut self, name: &str) -> Result<SymbolId> {
        let id = self.symbol_id(name).ok_or_else(|| ShiftError::UnknownSymbol(name.to_string()))?;
        self.add_active(id);
        Ok(id)
    }

    pub(crate) fn add_active(&mut self, id: SymbolId) {
        debug_assert!(!id.is_reserved());
        if self.active.insert(id) {
            self.distinctive = distinctive_features(&self.symbols, &self.active, self.features.len());
        }
    }

    /// Activate every declared symbol.
    pub fn activate_all(&mut self) {
        let all: Vec<SymbolId> = self.declared().collect();
        self.active.extend(all);
        self.distinctive = distinctive_features(&self.symbols, &self.active, self.features.len());
    }

    /// Activate the symbols of a one-per-line list (`;` comments allowed).
    pub fn load_active_list(&mut self, text: &str) -> Result<()> {
        for raw in text.lines() {
            let name = raw.trim();
            if name.is_empty() || name.starts_with(';') {
                continue;
            }
            self.add_active_symbol(name)?;
        }
        Ok(())
    }

    // --- Selection --------------------------------------------------------

    /// Active symbols satisfying every signed feature of `bundle`. An empty
    /// bundle selects the whole ActiveSet.
    pub fn select_bundle(&self, bundle: &[SignedFeature]) -> SymbolSet {
        let mut pool = self.active.clone();
        for &signed in bundle {
            let carriers = self.with_feature(signed);
            pool.retain(|id| carriers.contains(id));
            if pool.is_empty() {
                break;
            }
        }
        pool
    }

    /// The set of symbols a formula stands for against the current
    /// ActiveSet. Literals and category members count only while active.
    pub fn select_symbols(&self, formula: &Formula) -> Result<SymbolSet> {
        match formula {
            Formula::Null => Ok(SymbolSet::from([SymbolId::NULL])),
            Formula::Boundary => Ok(SymbolSet::from([SymbolId::BOUNDARY])),
            Formula::Literal(id) if self.active.contains(id) => Ok(SymbolSet::from([*id])),
            Formula::Literal(_) => Ok(SymbolSet::new()),
            Formula::Category(id) => {
                Ok(self.category(*id).members.iter().copied().filter(|m| self.active.contains(m)).collect())
            }
            Formula::Wildcard => {
                self.require_active()?;
                Ok(self.active.clone())
            }
            Formula::Bundles(bundles) => {
                self.require_active()?;
                Ok(bundles.iter().flat_map(|b: &Bundle| self.select_bundle(b)).collect())
            }
        }
    }

    pub(crate) fn require_active(&self) -> Result<()> {
        if self.active.is_empty() { Err(ShiftError::EmptyActiveSet) } else { Ok(()) }
    }

    // --- Tokenizing -------------------------------------------------------

    /// Longest declared symbol name that prefixes `text`, with its byte
    /// length.
    pub fn match_symbol(&self, text: &str) -> Option<(SymbolId, usize)> {
        let ends: Vec<usize> =
            text.char_indices().map(|(i, c)| i + c.len_utf8()).take(self.longest_name).collect();
        ends.iter().rev().find_map(|&end| self.symbol_id(&text[..end]).map(|id| (id, end)))
    }

    /// Split `text` into declared symbols by greedy longest match. Characters
    /// that start no symbol are skipped and returned with their char column
    /// (1-based).
    pub fn tokenize_lossy(&self, text: &str) -> (Vec<SymbolId>, Vec<(usize, char)>) {
        let mut symbols = Vec::new();
        let mut rejected = Vec::new();
        let mut rest = text;
        let mut column = 1;
        while let Some(c) = rest.chars().next() {
            match self.match_symbol(rest) {
                Some((id, len)) => {
                    symbols.push(id);
                    column += rest[..len].chars().count();
                    rest = &rest[len..];
                }
                None => {
                    rejected.push((column, c));
                    column += 1;
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        (symbols, rejected)
    }
}

/// Features whose value is not the same for every symbol in `active`.
///
/// A pure function of the alphabet and the ActiveSet, so the stored result is
/// always replaced wholesale, never patched.
pub(crate) fn distinctive_features(symbols: &[Symbol], active: &SymbolSet, feature_count: usize) -> BTreeSet<FeatureId> {
    (0..feature_count)
        .filter(|&index| {
            let mut values = active.iter().map(|id| symbols[id.index()].values[index]);
            match values.next() {
                Some(first) => values.any(|v| v != first),
                None => false,
            }
        })
        .map(|index| FeatureId(index as u16))
        .collect()
}
