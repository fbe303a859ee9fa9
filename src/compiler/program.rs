use tracing::{debug, info};

use super::compiled_rules::{ClassTable, CompiledRule, compile};
use super::parser::{Directive, Line, parse_line};
use crate::{Inventory, Result};

/// An ordered list of compiled rules sharing one class table.
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: Vec<CompiledRule>,
    classes: ClassTable,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule compiled against this book's class table.
    pub fn push(&mut self, mut rule: CompiledRule) {
        rule.index = self.rules.len();
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&CompiledRule> {
        self.rules.get(index)
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub(crate) fn classes_mut(&mut self) -> &mut ClassTable {
        &mut self.classes
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Process a rule file top to bottom.
///
/// `add` directives mutate `inventory` as they are reached, so each rule is
/// compiled against exactly the sounds added above it. Stops at the first
/// error.
pub fn compile_program(text: &str, inventory: &mut Inventory) -> Result<RuleBook> {
    let mut book = RuleBook::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        match parse_line(raw, line, inventory)? {
            Line::Blank => {}
            Line::Directive(Directive::Add(names)) => {
                for name in &names {
                    inventory.add_active_symbol(name)?;
                }
                debug!(
                    line,
                    added = names.len(),
                    active = inventory.active().len(),
                    distinctive = inventory.distinctive_features().len(),
                    "extended active set"
                );
            }
            Line::Rule(rule) => {
                let compiled = compile(&rule, inventory, book.classes_mut())?;
                debug!(line, rule = %compiled.source, entries = compiled.table.len(), shape = ?compiled.shape, "compiled rule");
                book.push(compiled);
            }
        }
    }
    info!(rules = book.len(), classes = book.classes().len(), "compiled rule book");
    Ok(book)
}
