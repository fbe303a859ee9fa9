//! Single-rule application.
//!
//! The scan is a small state machine over the input word:
//!
//! ```text
//! out = [word[0]]                       leading boundary is never rewritten
//! i   = 1
//! while i <= last_index:
//!     match at i?  (before-slots, table key, after-slots all fit)
//!       yes, substitution: out += table[key];            i += input_len
//!       yes, insertion:    out += table[[]] + word[i];   i += 1
//!       no:                out += word[i];               i += 1
//! ```
//!
//! Matching reads only the original word, so the output of one site never
//! feeds the environment of the next.

use crate::{ClassTable, CompiledRule, Slot, SymbolId, Word};

/// Apply `rule` to `word` in one left-to-right pass.
pub fn apply(rule: &CompiledRule, classes: &ClassTable, word: &Word) -> Word {
    apply_counted(rule, classes, word).0
}

/// [`apply`], also returning the number of sites rewritten.
pub(crate) fn apply_counted(rule: &CompiledRule, classes: &ClassTable, word: &Word) -> (Word, usize) {
    let symbols = word.symbols();
    let mut out = Vec::with_capacity(symbols.len() + 2);
    out.push(symbols[0]);

    let mut sites = 0;
    let mut i = 1;
    while i < symbols.len() {
        match match_at(rule, classes, symbols, i) {
            Some(replacement) => {
                sites += 1;
                out.extend_from_slice(replacement);
                if rule.input_len == 0 {
                    out.push(symbols[i]);
                }
                i += rule.input_len.max(1);
            }
            None => {
                out.push(symbols[i]);
                i += 1;
            }
        }
    }
    (Word::from_framed(out), sites)
}

/// The replacement for a match of `rule` starting at `i`, if any.
fn match_at<'r>(rule: &'r CompiledRule, classes: &ClassTable, symbols: &[SymbolId], i: usize) -> Option<&'r [SymbolId]> {
    let before = rule.before.len();
    let end = i + rule.input_len;
    if i < before || end + rule.after.len() > symbols.len() {
        return None;
    }

    let fits = |slots: &[Slot], window: &[SymbolId]| {
        slots.iter().zip(window).all(|(slot, &symbol)| slot.matches(classes, symbol))
    };
    if !fits(&rule.before, &symbols[i - before..i]) {
        return None;
    }
    let replacement = rule.output_for(&symbols[i..end])?;
    if !fits(&rule.after, &symbols[end..end + rule.after.len()]) {
        return None;
    }
    Some(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Inventory, Line, TableOptions, compile, parse_line};

    const TABLE: &str = "sym,voice,syll\np,0,0\nb,1,0\nt,0,0\nd,1,0\na,1,1\ni,1,1\n";

    fn setup(rule: &str) -> (Inventory, CompiledRule, ClassTable) {
        let mut inv = Inventory::from_table_str(TABLE, &TableOptions::default()).unwrap();
        inv.activate_all();
        let Line::Rule(parsed) = parse_line(rule, 1, &inv).unwrap() else { panic!("not a rule") };
        let mut classes = ClassTable::new();
        let compiled = compile(&parsed, &inv, &mut classes).unwrap();
        (inv, compiled, classes)
    }

    fn run(rule: &str, word: &str) -> (String, usize) {
        let (inv, compiled, classes) = setup(rule);
        let (symbols, rejected) = inv.tokenize_lossy(word);
        assert!(rejected.is_empty());
        let (out, sites) = apply_counted(&compiled, &classes, &Word::frame(symbols));
        (out.framed_string(&inv), sites)
    }

    #[test]
    fn final_devoicing_reaches_the_last_boundary() {
        assert_eq!(run("[-voice,-syll]/[+voice]/*_#", "pat"), ("#pad#".to_string(), 1));
        assert_eq!(run("[-voice,-syll]/[+voice]/*_#", "tap"), ("#tab#".to_string(), 1));
    }

    #[test]
    fn insertion_emits_before_the_current_symbol() {
        assert_eq!(run("0/i/p_t", "pt"), ("#pit#".to_string(), 1));
        assert_eq!(run("0/a/_#", "pt"), ("#pta#".to_string(), 1));
        assert_eq!(run("0/a/#_", "pt"), ("#apt#".to_string(), 1));
    }

    #[test]
    fn insertion_grows_by_one_per_site() {
        assert_eq!(run("0/a/[-syll]_", "ptpt"), ("#patapata#".to_string(), 4));
    }

    #[test]
    fn deletion_shrinks_and_terminates() {
        assert_eq!(run("[+syll]/0/_", "aiapa"), ("#p#".to_string(), 4));
        assert_eq!(run("*/0/_", "pat"), ("##".to_string(), 3));
    }

    #[test]
    fn environments_read_the_input_word() {
        // Each `t` is matched against its original left neighbour.
        assert_eq!(run("t/p/[+syll]_", "atta"), ("#apta#".to_string(), 1));
        assert_eq!(run("p/t/_p", "ppp"), ("#ttp#".to_string(), 2));
    }

    #[test]
    fn multi_symbol_targets_do_not_overlap() {
        assert_eq!(run("pp/tt/_", "ppp"), ("#ttp#".to_string(), 1));
    }

    #[test]
    fn boundaries_are_never_rewritten() {
        assert_eq!(run("*/a/_", "pt"), ("#aa#".to_string(), 2));
    }
}
