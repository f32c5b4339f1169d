//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties persisted state must satisfy after every
//! operation, whatever the operation was and whether it was accepted. They
//! complement the model comparison: the model says what the answer should
//! be, invariants say what can never be true.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let after = LedgerSnapshot::capture(&storage)?;
//! registry.check_transition(&before, &after)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ContentHashMatches, ContiguousIndices, DeletedRecordsFrozen, EventLogComplete,
    OwnerNeverDelegate, VersionMonotonicity,
};
pub use snapshot::LedgerSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of persisted ledger state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check a single state.
    fn check(&self, state: &LedgerSnapshot) -> InvariantResult;

    /// Check a step from `before` to `after`.
    ///
    /// Defaults to checking `after` alone; history-dependent invariants
    /// override this.
    fn check_transition(&self, before: &LedgerSnapshot, after: &LedgerSnapshot) -> InvariantResult {
        let _ = before;
        self.check(after)
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every standard invariant.
    ///
    /// - [`ContiguousIndices`]: each owner's indices are exactly `0..n`
    /// - [`ContentHashMatches`]: stored hash is the hash of stored bytes
    /// - [`EventLogComplete`]: one creation event per record, gapless
    /// - [`OwnerNeverDelegate`]: owners are never in their own delegate set
    /// - [`VersionMonotonicity`]: records never vanish, versions never drop
    /// - [`DeletedRecordsFrozen`]: deleted records never change content
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ContiguousIndices);
        registry.add(ContentHashMatches);
        registry.add(EventLogComplete);
        registry.add(OwnerNeverDelegate);
        registry.add(VersionMonotonicity);
        registry.add(DeletedRecordsFrozen);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether no invariants are registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Check all invariants against one state.
    pub fn check_all(&self, state: &LedgerSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants against a state transition.
    pub fn check_transition(
        &self,
        before: &LedgerSnapshot,
        after: &LedgerSnapshot,
    ) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> = self
            .invariants
            .iter()
            .filter_map(|inv| inv.check_transition(before, after).err())
            .collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check a transition, panicking with every violation found.
    #[allow(clippy::panic)]
    pub fn assert_transition(
        &self,
        before: &LedgerSnapshot,
        after: &LedgerSnapshot,
        context: &str,
    ) {
        if let Err(violations) = self.check_transition(before, after) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }
}
