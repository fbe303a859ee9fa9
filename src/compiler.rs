//! Rule compilation.
//!
//! Rule files are processed strictly top to bottom against a mutable
//! [`Inventory`](crate::Inventory):
//!
//! ```text
//! rule file ── parse_line (parser.rs) ──┬─ Directive::Add ─> Inventory::add_active_symbol
//!                                       │
//!                                       └─ Rule ─> compile (compiled_rules.rs)
//!                                                    - target: select_symbols per position,
//!                                                      cartesian product -> input keys
//!                                                    - output: literal / deletion /
//!                                                      resolve_variant per input symbol
//!                                                    - environment: interned symbol classes
//!                                                         │
//!                                                         v
//!                                                 RuleBook (program.rs)
//! ```
//!
//! A directive only affects the rules below it: compiled rules are frozen
//! snapshots of the ActiveSet at their line. All errors surface here; a
//! finished [`RuleBook`] cannot fail when applied.

#[path = "compiler/compiled_rules.rs"]
mod compiled_rules;
#[path = "compiler/parser.rs"]
mod parser;
#[path = "compiler/program.rs"]
mod program;

pub use compiled_rules::{ClassId, ClassTable, CompiledRule, RuleShape, Slot, compile};
pub use parser::{Directive, FieldColumns, Line, Rule, parse_line};
pub use program::{RuleBook, compile_program};
