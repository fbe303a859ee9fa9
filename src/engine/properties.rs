//! Property-based tests for the rewrite engine.
//!
//! # Properties Tested
//!
//! 1. **Inert rules**: a rule whose target selects nothing never changes a word.
//! 2. **Insertion length**: `k` insertion sites grow a word by exactly `k`.
//! 3. **Termination and framing**: every rule terminates and leaves exactly
//!    one boundary at each end.
//! 4. **Determinism**: identical inputs give identical derivations.
//! 5. **ActiveSet monotonicity**: growing the ActiveSet never removes a
//!    distinctive feature and never adds a constant one.

use proptest::prelude::*;

use super::derivation::run;
use super::rewrite::{apply, apply_counted};
use crate::{Inventory, RuleBook, SymbolId, TableOptions, Word, compile_program};

const TABLE: &str = "sym,voice,syll,nasal\np,0,0,0\nb,1,0,0\nt,0,0,0\nd,1,0,0\na,1,1,0\ni,1,1,0\nm,1,0,1\n";
const NAMES: [&str; 7] = ["p", "b", "t", "d", "a", "i", "m"];

const RULES: &[&str] = &[
    "[-voice]/[+voice]/*_#",
    "0/i/p_t",
    "[+syll]/0/_",
    "*/0/_",
    "0/a/_",
    "0/a/#_",
    "pt/0t/_",
    "[+voice,-syll]/[-voice]/_[-voice]",
    "t|a/d|0/_#",
    "[+nasal]|[+syll]/*|[-nasal]/_",
];

fn inventory() -> Inventory {
    let mut inv = Inventory::from_table_str(TABLE, &TableOptions::default()).unwrap();
    inv.activate_all();
    inv
}

fn book(inv: &mut Inventory, rules: &str) -> RuleBook {
    compile_program(rules, inv).unwrap()
}

// ========================================================================
// Proptest Generators
// ========================================================================

/// Framed words over the declared alphabet.
fn arb_word(inv: &Inventory, alphabet: usize) -> impl Strategy<Value = Word> + use<> {
    let ids: Vec<SymbolId> = NAMES[..alphabet].iter().map(|n| inv.symbol_id(n).unwrap()).collect();
    prop::collection::vec(prop::sample::select(ids), 0..12).prop_map(Word::frame)
}

fn assert_framed(word: &Word) {
    let symbols = word.symbols();
    assert_eq!(symbols.first(), Some(&SymbolId::BOUNDARY));
    assert_eq!(symbols.last(), Some(&SymbolId::BOUNDARY));
    assert!(word.interior().iter().all(|s| !s.is_reserved()));
}

proptest! {
    #[test]
    fn inert_rule_never_changes_a_word(word in arb_word(&inventory(), 6)) {
        let mut inv = Inventory::from_table_str(TABLE, &TableOptions::default()).unwrap();
        let book = book(&mut inv, "add p,b,t,d,a,i\n[+nasal]/p/_\nm/p/_\n");
        for rule in book.rules() {
            prop_assert_eq!(&apply(rule, book.classes(), &word), &word);
        }
    }

    #[test]
    fn insertion_grows_by_site_count(word in arb_word(&inventory(), 7)) {
        let mut inv = inventory();
        let book = book(&mut inv, "0/a/[-syll]_\n0/i/_#\n");
        for rule in book.rules() {
            let (out, sites) = apply_counted(rule, book.classes(), &word);
            prop_assert_eq!(out.symbols().len(), word.symbols().len() + sites);
        }
    }

    #[test]
    fn every_rule_terminates_framed(
        word in arb_word(&inventory(), 7),
        rule in prop::sample::select(RULES),
    ) {
        let mut inv = inventory();
        let book = book(&mut inv, rule);
        let out = apply(&book.rules()[0], book.classes(), &word);
        assert_framed(&out);
        prop_assert!(out.symbols().len() <= 2 * word.symbols().len());
    }

    #[test]
    fn derivations_are_deterministic(
        word in arb_word(&inventory(), 7),
        picks in prop::collection::vec(prop::sample::select(RULES), 1..5),
    ) {
        let rules = picks.join("\n");
        let mut first_inv = inventory();
        let mut second_inv = inventory();
        let first = run(&word, &book(&mut first_inv, &rules));
        let second = run(&word, &book(&mut second_inv, &rules));
        prop_assert_eq!(first.format(&first_inv), second.format(&second_inv));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn distinctive_features_only_grow(order in Just(NAMES.to_vec()).prop_shuffle()) {
        let mut inv = Inventory::from_table_str(TABLE, &TableOptions::default()).unwrap();
        let mut distinctive = inv.distinctive_features().clone();
        let mut constant = inv.constant_features();
        for name in order {
            inv.add_active_symbol(name).unwrap();
            prop_assert!(inv.distinctive_features().is_superset(&distinctive));
            prop_assert!(inv.constant_features().is_subset(&constant));
            distinctive = inv.distinctive_features().clone();
            constant = inv.constant_features();
        }
    }
}
