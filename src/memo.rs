//! Compute-once cell for expensive, fallible derivations.
//!
//! Several derived values (nodes, page info, total count, diff stat) are
//! read from the same parsed patch, possibly from different threads. The
//! first caller runs the computation; everyone else blocks on the
//! [`OnceLock`] and then sees the same value or the same error.

use std::sync::OnceLock;

use crate::SearchError;

#[derive(Debug)]
pub struct Memo<T> {
    cell: OnceLock<Result<T, SearchError>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self { cell: OnceLock::new() }
    }
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result, running `f` only if nothing is cached yet.
    pub fn get_or_try_init<F>(&self, f: F) -> Result<&T, SearchError>
    where
        F: FnOnce() -> Result<T, SearchError>,
    {
        match self.cell.get_or_init(f) {
            Ok(value) => Ok(value),
            Err(e) => Err(e.clone()),
        }
    }

    /// True once the computation has run (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}
