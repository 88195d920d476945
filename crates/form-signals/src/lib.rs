//! Dependency-tracked reactive cells.
//!
//! A [`Runtime`] owns a graph of [`Signal`]s (writable sources), [`Memo`]s (cached
//! derived values) and [`Effect`]s (side effects). Dependencies are discovered
//! dynamically by reading inside a memo or effect body; there is no manual wiring.
//!
//! Everything is single-threaded: handles are `!Send` and all recomputation happens
//! synchronously inside the write (or [`Runtime::batch`]) that caused it.

mod arena;
mod handle;
mod runtime;

#[cfg(test)]
mod test_runtime;

pub use arena::NodeId;
pub use handle::{Effect, Memo, Signal};
pub use runtime::{DEFAULT_MAX_EFFECT_RUNS, Runtime};
