use once_cell::sync::OnceCell;

use crate::error::LookupError;

/// Settled state of a [Resolvable].
///
/// A resolution in flight is not observable: callers block on it and then
/// see its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State<T> {
    Unresolved,
    Resolved(T),
    Failed(LookupError),
}

/// Attribute that is resolved at most once.
///
/// Concurrent callers share a single resolution: the first one runs the
/// resolver, the rest block until it finishes. Failures are kept like
/// values. A resolver that unwinds leaves the attribute unresolved, so it is
/// never observed half-done.
#[derive(Debug, Clone)]
pub struct Resolvable<T> {
    cell: OnceCell<Result<T, LookupError>>,
}

impl<T> Default for Resolvable<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T: Clone> Resolvable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cell that needs no resolution.
    pub fn resolved(value: T) -> Self {
        Self {
            cell: OnceCell::with_value(Ok(value)),
        }
    }

    pub fn get_or_resolve<F>(&self, resolve: F) -> Result<T, LookupError>
    where
        F: FnOnce() -> Result<T, LookupError>,
    {
        self.cell.get_or_init(resolve).clone()
    }

    pub fn state(&self) -> State<T> {
        match self.cell.get() {
            None => State::Unresolved,
            Some(Ok(value)) => State::Resolved(value.clone()),
            Some(Err(err)) => State::Failed(err.clone()),
        }
    }

    /// Forgets the outcome. Exclusive access guarantees nobody is resolving.
    pub fn reset(&mut self) {
        self.cell.take();
    }
}
