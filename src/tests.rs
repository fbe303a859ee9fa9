//! End-to-end scenarios through the public API.

use crate::{InitialActive, LoadOptions, ShiftError, SoundChanger, Sources, TableOptions};

const STOPS: &str = "sym,voice\np,0\nb,1\nt,0\nd,1\n";

fn changer(features: &str, rules: &str) -> Result<SoundChanger, ShiftError> {
    let sources = Sources { features, rules, ..Default::default() };
    SoundChanger::from_sources(&sources, &LoadOptions::default())
}

/// As [`changer`], with every declared symbol active before the first line.
fn changer_all_active(features: &str, rules: &str) -> Result<SoundChanger, ShiftError> {
    let sources = Sources { features, rules, ..Default::default() };
    let options = LoadOptions { initial_active: InitialActive::All, ..Default::default() };
    SoundChanger::from_sources(&sources, &options)
}

fn derive(sc: &SoundChanger, word: &str) -> String {
    sc.derive(word).derivation.output().framed_string(sc.inventory())
}

#[test]
fn final_voicing_with_a_single_feature() {
    // The vowel is declared so the word tokenizes; it is voiced like b and d
    // but declared last, so declaration distance still pairs t with d.
    let sc = changer(&format!("{STOPS}a,1\n"), "add p,b,t,d,a\n[-voice]/[+voice]/*_#\n").unwrap();
    assert_eq!(derive(&sc, "pat"), "#pad#");
    assert_eq!(derive(&sc, "tap"), "#tab#");
}

#[test]
fn active_set_starts_empty_by_default() {
    let features = "sym,voice,syll\np,0,1\nb,1,1\nt,0,0\nd,1,0\n";
    let sc = changer(features, "add p,t,d\n[-voice]/[+voice]/_\n").unwrap();
    assert_eq!(sc.inventory().active().len(), 3);
    // b was never added, so d is the only voiced candidate.
    assert_eq!(derive(&sc, "p"), "#d#");

    let sc = changer_all_active(features, "add p,t,d\n[-voice]/[+voice]/_\n").unwrap();
    assert_eq!(sc.inventory().active().len(), 4);
    assert_eq!(derive(&sc, "p"), "#b#");
}

#[test]
fn insertion_between_stops() {
    let sc = changer("sym,syll\np,0\nt,0\ni,1\n", "add p,t,i\n0/i/p_t\n").unwrap();
    assert_eq!(derive(&sc, "pt"), "#pit#");
    assert_eq!(derive(&sc, "tp"), "#tp#");
}

#[test]
fn undeclared_feature_aborts_before_any_word() {
    let err = changer(STOPS, "p/b/_\n[+round]/0/_\n").unwrap_err();
    assert!(matches!(err, ShiftError::UnknownFeature { ref name, line: 2 } if name == "round"));
    assert_eq!(err.to_string(), "unknown feature 'round' at line 2");
}

#[test]
fn directives_only_affect_later_rules() {
    let features = "sym,voice,nasal\np,0,0\nb,1,0\nm,1,1\n";
    let sources = Sources { features, rules: "add p,b\n[+voice]/[-voice]/_\nadd m\n", ..Default::default() };
    let options = LoadOptions { initial_active: InitialActive::None, ..Default::default() };
    let sc = SoundChanger::from_sources(&sources, &options).unwrap();
    // m was not active when the rule compiled, so it is untouched.
    assert_eq!(derive(&sc, "bmb"), "#pmp#");
    assert!(sc.inventory().is_active(sc.inventory().symbol_id("m").unwrap()));
}

#[test]
fn feature_rules_need_active_sounds() {
    let sources = Sources { features: STOPS, rules: "[-voice]/[+voice]/_\n", ..Default::default() };
    let options = LoadOptions { initial_active: InitialActive::None, ..Default::default() };
    let err = SoundChanger::from_sources(&sources, &options).unwrap_err();
    assert!(matches!(err, ShiftError::EmptyActiveSet));
}

#[test]
fn missing_variant_is_a_compile_error() {
    let sources = Sources { features: STOPS, rules: "add p,t\n[-voice]/[+voice]/_\n", ..Default::default() };
    let options = LoadOptions { initial_active: InitialActive::None, ..Default::default() };
    let err = SoundChanger::from_sources(&sources, &options).unwrap_err();
    assert!(matches!(err, ShiftError::NoMatchingVariant { ref source_symbol, .. } if source_symbol == "p"));
}

#[test]
fn short_output_is_rejected_not_padded() {
    let err = changer_all_active(STOPS, "pt/b/_\n").unwrap_err();
    assert!(matches!(err, ShiftError::Syntax { line: 1, column: 4, .. }));
}

#[test]
fn modifiers_and_categories_work_together() {
    let features = "sym,voice,spread,syll\np,0,0,0\nt,0,0,0\na,1,0,1\n^ʰ,,1,\n";
    let sources = Sources {
        features,
        rules: "; aspirate stops before vowels\nS/A/_V\n",
        categories: Some("S,p,t\nA,pʰ,tʰ\nV,a\n"),
        ..Default::default()
    };
    let options = LoadOptions { initial_active: InitialActive::All, ..Default::default() };
    let sc = SoundChanger::from_sources(&sources, &options).unwrap();
    assert_eq!(sc.inventory().alphabet_len(), 6);
    let result = sc.derive("tapt");
    assert_eq!(sc.format(&result.derivation), "tapt->tʰapt");
    // Multi-character symbols tokenize as one.
    assert_eq!(sc.derive("tʰa").derivation.input.interior().len(), 2);
}

#[test]
fn feature_output_keeps_place_when_features_allow() {
    let features = "sym,voice,labial,nasal,syll\np,0,1,0,0\nb,1,1,0,0\nt,0,0,0,0\nd,1,0,0,0\nm,1,1,1,0\nn,1,0,1,0\na,1,0,0,1\n";
    let sc = changer_all_active(features, "[+nasal]/[-voice,-nasal]/_#\n").unwrap();
    assert_eq!(derive(&sc, "tam"), "#tap#");
    assert_eq!(derive(&sc, "tan"), "#tat#");
}

#[test]
fn ordered_rules_feed_each_other() {
    let features = "sym,voice,syll\np,0,0\nb,1,0\nt,0,0\nd,1,0\na,1,1\ni,1,1\n";
    let rules = "\
        [-voice,-syll]/[+voice]/[+syll]_[+syll]\n\
        [+syll]/0/_#\n\
        [+voice,-syll]/[-voice]/_#\n";
    let sc = changer_all_active(features, rules).unwrap();
    let result = sc.derive("pata");
    assert_eq!(sc.format(&result.derivation), "pata->pada->pad->pat");
    let fired: Vec<usize> = result.derivation.stages.iter().map(|s| s.rule).collect();
    assert_eq!(fired, [0, 1, 2]);
}

#[test]
fn tab_separated_tables_with_a_custom_marker() {
    let sources = Sources { features: "sym\tround\nu\t1\ni\t0\n~ː\t\n", rules: "u/i/_\n", ..Default::default() };
    let options = LoadOptions {
        table: TableOptions { modifier_marker: '~', delimiter: None },
        initial_active: InitialActive::All,
    };
    let sc = SoundChanger::from_sources(&sources, &options).unwrap();
    assert_eq!(sc.format(&sc.derive("uːu").derivation), "uːu->uːi");
}
