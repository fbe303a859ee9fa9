//! Compiled rules.
//!
//! Compilation turns a parsed [`Rule`] into a lookup table frozen against the
//! ActiveSet of the moment:
//!
//! - **Table**: every input sequence the target can match (the cartesian
//!   product of its positions' symbol sets) mapped to its replacement.
//!   Application never consults the inventory again.
//! - **Environment slots**: each before/after position becomes `Any`,
//!   `Boundary` or an interned symbol class (`ClassTable`), so identical
//!   contexts across rules share one set.
//! - **Shape** (`RuleShape`): coarse flags used to skip rules that cannot
//!   fire on a word, and for reporting.
//!
//! ## Invariants
//!
//! - Every table key has exactly `input_len` symbols; an insertion has
//!   `input_len == 0` and a single empty key.
//! - No key or value contains the boundary symbol; no value contains null.
//! - `ClassId` indexes `ClassTable::classes`; classes are never mutated once
//!   interned.

use std::collections::{BTreeMap, HashMap};

use crate::{Formula, Inventory, Result, ShiftError, SymbolId, SymbolSet};

use super::parser::Rule;

/// Index of an interned environment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u32);

/// Interned symbol sets for environment positions.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: Vec<SymbolSet>,
    index: HashMap<SymbolSet, ClassId>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, set: SymbolSet) -> ClassId {
        if let Some(&id) = self.index.get(&set) {
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(set.clone());
        self.index.insert(set, id);
        id
    }

    pub fn get(&self, id: ClassId) -> &SymbolSet {
        &self.classes[id.0 as usize]
    }

    pub fn contains(&self, id: ClassId, symbol: SymbolId) -> bool {
        self.get(id).contains(&symbol)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// One compiled environment position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `*`: any symbol, boundary included.
    Any,
    /// `#`: only the word boundary.
    Boundary,
    Class(ClassId),
}

impl Slot {
    pub fn matches(self, classes: &ClassTable, symbol: SymbolId) -> bool {
        match self {
            Slot::Any => true,
            Slot::Boundary => symbol == SymbolId::BOUNDARY,
            Slot::Class(id) => classes.contains(id, symbol),
        }
    }
}

bitflags::bitflags! {
    /// Coarse structural classification of a compiled rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuleShape: u8 {
        /// Target is `0`.
        const INSERTION         = 1 << 0;
        /// Some output position is `0`.
        const DELETION          = 1 << 1;
        const CONDITIONED_BEFORE = 1 << 2;
        const CONDITIONED_AFTER  = 1 << 3;
        /// Before-context starts at the word boundary.
        const WORD_INITIAL      = 1 << 4;
        /// After-context ends at the word boundary.
        const WORD_FINAL        = 1 << 5;
        /// The table is empty: no active symbol matches the target.
        const INERT             = 1 << 6;
    }
}

/// A rule frozen against the ActiveSet at its line.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Position in the [`RuleBook`](crate::RuleBook).
    pub index: usize,
    pub line: usize,
    pub source: String,
    pub shape: RuleShape,
    pub(crate) table: BTreeMap<Vec<SymbolId>, Vec<SymbolId>>,
    pub(crate) input_len: usize,
    pub(crate) before: Vec<Slot>,
    pub(crate) after: Vec<Slot>,
    /// First symbols of the table keys; a word containing none of them
    /// cannot be changed by a non-insertion rule.
    pub(crate) starters: SymbolSet,
}

impl CompiledRule {
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn before(&self) -> &[Slot] {
        &self.before
    }

    pub fn after(&self) -> &[Slot] {
        &self.after
    }

    /// Input sequences and their replacements, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&[SymbolId], &[SymbolId])> {
        self.table.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn output_for(&self, input: &[SymbolId]) -> Option<&[SymbolId]> {
        self.table.get(input).map(Vec::as_slice)
    }

    /// Cheap pre-check: `false` means applying the rule to `word` is a
    /// guaranteed no-op.
    pub fn could_fire(&self, word: &[SymbolId]) -> bool {
        if self.shape.contains(RuleShape::INERT) {
            return false;
        }
        if self.shape.contains(RuleShape::INSERTION) {
            return true;
        }
        word.iter().any(|s| self.starters.contains(s))
    }
}

/// Compile `rule` against the current state of `inventory`.
///
/// Structural errors are reported as [`ShiftError::Syntax`] at the column
/// of the offending field.
pub fn compile(rule: &Rule, inventory: &Inventory, classes: &mut ClassTable) -> Result<CompiledRule> {
    validate(rule)?;
    let insertion = rule.target.len() == 1 && rule.target[0].is_null();

    let table = if insertion {
        insertion_table(rule, inventory)?
    } else {
        substitution_table(rule, inventory)?
    };

    let before = environment(&rule.before, inventory, classes)?;
    let after = environment(&rule.after, inventory, classes)?;

    let mut shape = RuleShape::empty();
    shape.set(RuleShape::INSERTION, insertion);
    shape.set(RuleShape::DELETION, !insertion && rule.output.iter().any(Formula::is_null));
    shape.set(RuleShape::CONDITIONED_BEFORE, !before.is_empty());
    shape.set(RuleShape::CONDITIONED_AFTER, !after.is_empty());
    shape.set(RuleShape::WORD_INITIAL, before.first() == Some(&Slot::Boundary));
    shape.set(RuleShape::WORD_FINAL, after.last() == Some(&Slot::Boundary));
    shape.set(RuleShape::INERT, table.is_empty());

    let starters = table.keys().filter_map(|key| key.first().copied()).collect();

    Ok(CompiledRule {
        index: 0,
        line: rule.line,
        source: rule.source.clone(),
        shape,
        input_len: if insertion { 0 } else { rule.target.len() },
        table,
        before,
        after,
        starters,
    })
}

fn validate(rule: &Rule) -> Result<()> {
    let at = |column: usize, message: &str| -> Result<()> { Err(ShiftError::syntax(rule.line, column, message)) };
    let cols = rule.columns;

    if rule.target.is_empty() {
        return at(cols.target, "empty target; write 0 to insert");
    }
    if rule.output.is_empty() {
        return at(cols.output, "empty output; write 0 to delete");
    }
    if rule.target.len() != rule.output.len() {
        return at(cols.output, "output must have as many positions as the target");
    }
    if rule.target.len() > 1 && rule.target.iter().any(Formula::is_null) {
        return at(cols.target, "0 in the target must stand alone");
    }
    if rule.target.contains(&Formula::Boundary) {
        return at(cols.target, "'#' cannot be rewritten");
    }
    let insertion = rule.target[0].is_null();

    for (target, output) in rule.target.iter().zip(&rule.output) {
        match output {
            Formula::Boundary => return at(cols.output, "'#' cannot be produced"),
            Formula::Bundles(bundles) if bundles.len() != 1 => {
                return at(cols.output, "output position must be a single bundle");
            }
            Formula::Wildcard if insertion => return at(cols.output, "'*' needs an input symbol to copy"),
            Formula::Category(_) if !matches!(target, Formula::Category(_)) => {
                return at(cols.output, "output category must align with a target category");
            }
            _ => {}
        }
    }
    if rule.before.iter().chain(&rule.after).any(Formula::is_null) {
        return at(cols.environment, "0 cannot appear in an environment");
    }
    Ok(())
}

fn insertion_table(rule: &Rule, inventory: &Inventory) -> Result<BTreeMap<Vec<SymbolId>, Vec<SymbolId>>> {
    let inserted = match &rule.output[0] {
        Formula::Null => Vec::new(),
        Formula::Literal(id) => vec![*id],
        Formula::Bundles(bundles) => vec![inventory.resolve_inserted(&bundles[0])?],
        _ => return Err(ShiftError::syntax(rule.line, rule.columns.output, "cannot insert this formula")),
    };
    Ok(BTreeMap::from([(Vec::new(), inserted)]))
}

fn substitution_table(rule: &Rule, inventory: &Inventory) -> Result<BTreeMap<Vec<SymbolId>, Vec<SymbolId>>> {
    let positions: Vec<Vec<SymbolId>> = rule
        .target
        .iter()
        .map(|formula| inventory.select_symbols(formula).map(|set| set.into_iter().collect()))
        .collect::<Result<_>>()?;

    for (k, (target, output)) in rule.target.iter().zip(&rule.output).enumerate() {
        if let (Formula::Category(from), Formula::Category(to)) = (target, output) {
            if inventory.category(*from).members.len() != inventory.category(*to).members.len() {
                return Err(ShiftError::syntax(
                    rule.line,
                    rule.columns.output,
                    format!("categories at position {} differ in size", k + 1),
                ));
            }
        }
    }

    let mut table = BTreeMap::new();
    if positions.iter().any(Vec::is_empty) {
        return Ok(table);
    }

    // Odometer over the positions' symbol lists.
    let mut digits = vec![0usize; positions.len()];
    loop {
        let key: Vec<SymbolId> = digits.iter().zip(&positions).map(|(&d, syms)| syms[d]).collect();
        let value = rewrite(rule, inventory, &key)?;
        table.insert(key, value);

        let mut k = positions.len();
        loop {
            if k == 0 {
                return Ok(table);
            }
            k -= 1;
            digits[k] += 1;
            if digits[k] < positions[k].len() {
                break;
            }
            digits[k] = 0;
        }
    }
}

/// Replacement for one matched input sequence.
fn rewrite(rule: &Rule, inventory: &Inventory, key: &[SymbolId]) -> Result<Vec<SymbolId>> {
    let mut value = Vec::with_capacity(key.len());
    for (k, output) in rule.output.iter().enumerate() {
        let source = key[k];
        match output {
            Formula::Null => {}
            Formula::Literal(id) => value.push(*id),
            Formula::Wildcard => value.push(source),
            Formula::Bundles(bundles) => value.push(inventory.resolve_variant(source, &bundles[0])?),
            Formula::Category(to) => {
                let Formula::Category(from) = &rule.target[k] else {
                    unreachable!("validated: output categories align with target categories");
                };
                let offset = inventory.category(*from).members.iter().position(|&m| m == source);
                match offset {
                    Some(offset) => value.push(inventory.category(*to).members[offset]),
                    None => value.push(source),
                }
            }
            Formula::Boundary => unreachable!("validated: '#' never appears in an output"),
        }
    }
    Ok(value)
}

fn environment(formulas: &[Formula], inventory: &Inventory, classes: &mut ClassTable) -> Result<Vec<Slot>> {
    formulas
        .iter()
        .map(|formula| {
            Ok(match formula {
                Formula::Wildcard => Slot::Any,
                Formula::Boundary => Slot::Boundary,
                other => Slot::Class(classes.intern(inventory.select_symbols(other)?)),
            })
        })
        .collect()
}
