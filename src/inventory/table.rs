//! Feature table parsing and alphabet construction.
//!
//! The table is delimiter-separated text:
//!
//! ```text
//! sym,voice,nasal,labial      <- header: label + ordered feature names
//! p,0,0,1                     <- base symbol: 1 = +, 0 = -, other = unspecified
//! m,1,1,1
//! ^ʰ,,,                       <- modifier row (marker + diacritic)
//! ```
//!
//! Modifier rows are collected and applied only after every plain row has
//! been declared, so each modifier multiplies the complete base alphabet no
//! matter where its row sits in the file.

use std::path::Path;

use tracing::debug;

use super::{Inventory, Modifier, SymbolOrigin};
use crate::{FeatureId, Result, ShiftError, SignedFeature, SymbolId};

/// Characters with a meaning in rule syntax; never part of a symbol name.
const RESERVED_CHARS: &[char] = &['/', '|', '[', ']', ',', '_', ';', '*', '#', '0', '∅'];

pub(crate) fn is_reserved_char(c: char) -> bool {
    RESERVED_CHARS.contains(&c) || c.is_whitespace()
}

/// Options for reading a feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Leading character of a modifier row's symbol cell.
    pub modifier_marker: char,
    /// Cell delimiter; detected from the header when `None` (tab if the
    /// header contains one, comma otherwise).
    pub delimiter: Option<char>,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions { modifier_marker: '^', delimiter: None }
    }
}

/// One data row of a feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// 1-based line number in the source text.
    pub line: usize,
    /// Symbol name, or the diacritic for modifier rows (marker stripped).
    pub symbol: String,
    pub modifier: bool,
    pub values: Vec<Option<bool>>,
}

/// A parsed, not yet validated, feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureTable {
    pub features: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl FeatureTable {
    pub fn parse(text: &str, options: &TableOptions) -> Result<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l)).filter(|(_, l)| !l.trim().is_empty());

        let (header_line, header) = lines.next().ok_or_else(|| ShiftError::table(1, "feature table is empty"))?;
        let delimiter = options.delimiter.unwrap_or(if header.contains('\t') { '\t' } else { ',' });

        let features: Vec<String> = header.split(delimiter).skip(1).map(|c| c.trim().to_string()).collect();
        if u16::try_from(features.len()).is_err() {
            let message = format!("too many features ({}, at most {})", features.len(), u16::MAX);
            return Err(ShiftError::table(header_line, message));
        }
        for (index, name) in features.iter().enumerate() {
            if name.is_empty()
                || name.starts_with(['+', '-'])
                || name.chars().any(|c| matches!(c, '[' | ']' | ',' | '/' | '|') || c.is_whitespace())
            {
                return Err(ShiftError::table(header_line, format!("invalid feature name '{name}'")));
            }
            if features[..index].contains(name) {
                return Err(ShiftError::table(header_line, format!("feature '{name}' declared twice")));
            }
        }

        let mut rows = Vec::new();
        for (line, raw) in lines {
            let cells: Vec<&str> = raw.split(delimiter).map(str::trim).collect();
            if cells.len() != features.len() + 1 {
                return Err(ShiftError::table(
                    line,
                    format!("expected {} cells, found {}", features.len() + 1, cells.len()),
                ));
            }
            let (modifier, symbol) = match cells[0].strip_prefix(options.modifier_marker) {
                Some(diacritic) => (true, diacritic),
                None => (false, cells[0]),
            };
            if symbol.is_empty() || symbol.chars().any(is_reserved_char) {
                return Err(ShiftError::table(line, format!("invalid symbol '{}'", cells[0])));
            }
            let values = cells[1..].iter().map(|cell| parse_value(cell)).collect();
            rows.push(TableRow { line, symbol: symbol.to_string(), modifier, values });
        }

        Ok(FeatureTable { features, rows })
    }
}

fn parse_value(cell: &str) -> Option<bool> {
    match cell {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

impl Inventory {
    /// Build the alphabet from a parsed table.
    ///
    /// Plain rows are declared in file order; then every modifier row, in
    /// file order, derives one variant of every base symbol whose values are
    /// the base's overridden at the modifier's specified features. A derived
    /// name that is already declared keeps the earlier declaration.
    pub fn load(table: &FeatureTable) -> Result<Self> {
        let mut inventory = Inventory::with_features(table.features.clone());

        for row in table.rows.iter().filter(|r| !r.modifier) {
            if inventory.insert_symbol(row.symbol.clone(), row.values.clone(), SymbolOrigin::Base).is_none() {
                return Err(ShiftError::table(row.line, format!("symbol '{}' declared twice", row.symbol)));
            }
        }

        let bases: Vec<SymbolId> = inventory.declared().collect();
        for row in table.rows.iter().filter(|r| r.modifier) {
            let overrides: Vec<SignedFeature> = row
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|positive| SignedFeature { feature: FeatureId(i as u16), positive }))
                .collect();
            let modifier = inventory.push_modifier(Modifier { name: row.symbol.clone(), overrides: overrides.clone() });

            let mut derived = 0;
            for &base in &bases {
                let source = inventory.symbol(base);
                let name = format!("{}{}", source.name, row.symbol);
                let mut values = source.values.clone();
                for signed in &overrides {
                    values[signed.feature.index()] = Some(signed.positive);
                }
                if inventory.insert_symbol(name, values, SymbolOrigin::Derived { base, modifier }).is_some() {
                    derived += 1;
                }
            }
            debug!(modifier = %row.symbol, derived, "expanded modifier");
        }

        debug!(
            features = inventory.feature_names().len(),
            symbols = inventory.alphabet_len(),
            "loaded feature inventory"
        );
        Ok(inventory)
    }

    pub fn from_table_str(text: &str, options: &TableOptions) -> Result<Self> {
        Self::load(&FeatureTable::parse(text, options)?)
    }

    pub fn from_table_file(path: impl AsRef<Path>, options: &TableOptions) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ShiftError::Io { path: path.to_path_buf(), source })?;
        Self::from_table_str(&text, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_detects_tab_delimiter() {
        let table = FeatureTable::parse("sym\tvoice\tnasal\nm\t1\t1\np\t0\tx\n", &TableOptions::default()).unwrap();
        assert_eq!(table.features, ["voice", "nasal"]);
        assert_eq!(table.rows[1].values, vec![Some(false), None]);
        assert_eq!(table.rows[1].line, 3);
    }

    #[test]
    fn parse_rejects_oversized_headers() {
        let header: Vec<String> = (0..=u16::MAX as usize).map(|i| format!("f{i}")).collect();
        let text = format!("sym,{}\n", header.join(","));
        let err = FeatureTable::parse(&text, &TableOptions::default()).unwrap_err();
        assert!(matches!(err, ShiftError::Table { line: 1, ref message } if message.starts_with("too many features")));
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = FeatureTable::parse("sym,voice\np,0,1\n", &TableOptions::default()).unwrap_err();
        assert!(matches!(err, ShiftError::Table { line: 2, .. }));
    }

    #[test]
    fn parse_rejects_reserved_symbols() {
        for bad in ["#", "0", "a_b", "*"] {
            let text = format!("sym,voice\n{bad},1\n");
            assert!(FeatureTable::parse(&text, &TableOptions::default()).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn modifiers_multiply_every_base_symbol() {
        // The modifier row sits before `t` but still applies to it.
        let text = "sym,voice,spread\np,0,0\n^ʰ,,1\nt,0,0\nd,1,0\n^ʷ,,\n";
        let inv = Inventory::from_table_str(text, &TableOptions::default()).unwrap();
        assert_eq!(inv.alphabet_len(), 3 * 3);
        assert_eq!(inv.modifiers().len(), 2);

        let spread = inv.feature_id("spread").unwrap();
        let voice = inv.feature_id("voice").unwrap();
        let th = inv.symbol(inv.symbol_id("tʰ").unwrap());
        assert_eq!(th.value(spread), Some(true));
        assert_eq!(th.value(voice), Some(false));
        assert!(matches!(th.origin, SymbolOrigin::Derived { modifier: 0, .. }));

        let spread_plus = SignedFeature { feature: spread, positive: true };
        let aspirated: Vec<&str> = inv.with_feature(spread_plus).iter().map(|&id| inv.display(id)).collect();
        assert_eq!(aspirated, ["pʰ", "tʰ", "dʰ"]);
    }

    #[test]
    fn explicit_rows_win_over_derived_names() {
        let text = "sym,spread\nt,0\ntʰ,\n^ʰ,1\n";
        let inv = Inventory::from_table_str(text, &TableOptions::default()).unwrap();
        let th = inv.symbol(inv.symbol_id("tʰ").unwrap());
        assert_eq!(th.origin, SymbolOrigin::Base);
        assert_eq!(th.values, vec![None]);
    }

    #[test]
    fn duplicate_rows_are_errors() {
        let err = Inventory::from_table_str("sym,voice\np,0\np,1\n", &TableOptions::default()).unwrap_err();
        assert!(matches!(err, ShiftError::Table { line: 3, .. }));
    }
}
