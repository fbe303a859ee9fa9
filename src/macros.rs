#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`Bundle`](crate::Bundle) from `+name`/`-name` tokens against an
/// inventory, panicking on unknown names. Test-only convenience.
#[cfg(test)]
macro_rules! bundle {
    ($inv:expr; $($tok:literal),* $(,)?) => {{
        let inv: &$crate::Inventory = &$inv;
        vec![$({
            let tok: &str = $tok;
            let (sign, name) = tok.split_at(1);
            $crate::SignedFeature {
                feature: inv.feature_id(name).unwrap_or_else(|| panic!("unknown feature {name}")),
                positive: sign == "+",
            }
        }),*]
    }};
}
