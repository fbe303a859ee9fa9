//! Rewrite engine.
//!
//! Applies compiled rules to framed words. Everything here is infallible:
//! the compiler has already resolved every symbol set and every output, so a
//! run is pure table lookups over bounded indices.
//!
//! ## How the parts work together
//!
//! ```text
//! Word ── run (derivation.rs) ──> for each CompiledRule, in book order:
//!                                   - skip if could_fire() is false
//!                                   - apply (rewrite.rs): one left-to-right
//!                                     scan, reading only the input word
//!                                   - record a Stage if the word changed
//!                                         │
//!                                         v
//!                                    Derivation
//! ```
//!
//! A single scan never re-reads its own output: environments and targets are
//! always matched against the word as it was before the rule started, and the
//! cursor advances by `max(input_len, 1)` after every match, so every scan
//! terminates after at most `len(word)` steps.
//!
//! ## Responsibilities by module
//!
//! - `rewrite.rs`: the single-rule scan, including insertion ordering.
//! - `derivation.rs`: ordered application and the stage trace.
//! - `metrics.rs`: timings and per-rule fire counts for corpus runs.
//!
//! ## Debugging
//!
//! Set `SOUNDSHIFT_LOG=soundshift=trace` to log every rule that fires.

#[path = "engine/derivation.rs"]
mod derivation;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/rewrite.rs"]
mod rewrite;

#[cfg(test)]
#[path = "engine/properties.rs"]
mod properties;

pub use derivation::{Derivation, Stage, run};
pub use metrics::RunMetrics;
pub use rewrite::apply;

pub(crate) use derivation::run_counted;
