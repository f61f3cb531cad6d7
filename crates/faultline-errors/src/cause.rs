//! Cause handles, the metadata capability, and cycle-safe traversal
//!
//! A [`Cause`] is a shared handle to any error. Errors that carry details,
//! metadata, tags and headers expose them through [`MetadataCarrier`] so a
//! wrapping error can inherit them without knowing the concrete type.
//!
//! Traversal helpers walk `std::error::Error::source()` and remember every
//! visited identity, so a chain that loops back on itself ends instead of
//! spinning forever.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;
use std::sync::{Arc, OnceLock};

use crate::domain::DomainError;
use crate::validation::ValidationError;

/// Shared, thread-safe trait object for any error
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Capability exposed by errors whose context can be inherited
///
/// Every accessor returns an independent copy.
pub trait MetadataCarrier: Send + Sync {
    fn details(&self) -> HashMap<String, Value>;
    fn metadata(&self) -> HashMap<String, Value>;
    fn tags(&self) -> Vec<String>;
    fn headers(&self) -> HashMap<String, String>;

    /// All four maps as one consistent copy.
    ///
    /// The default calls each accessor in turn; carriers guarded by a lock
    /// override it to read everything under a single guard.
    fn snapshot(&self) -> InheritedContext {
        InheritedContext {
            details: self.details(),
            metadata: self.metadata(),
            tags: self.tags(),
            headers: self.headers(),
        }
    }
}

/// Point-in-time copy of a carrier's context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InheritedContext {
    pub details: HashMap<String, Value>,
    pub metadata: HashMap<String, Value>,
    pub tags: Vec<String>,
    pub headers: HashMap<String, String>,
}

/// Handle to an error used as a cause or a chained error
#[derive(Clone)]
pub struct Cause {
    error: SharedError,
    carrier: Option<Arc<dyn MetadataCarrier>>,
}

impl Cause {
    /// Wrap an owned error without the metadata capability.
    ///
    /// Nothing is inherited through this handle even when `E` is a
    /// [`MetadataCarrier`]; convert with `Cause::from` or use
    /// [`Cause::with_carrier`] for the crate's own error types.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::shared(Arc::new(err))
    }

    /// Use an already shared foreign error
    pub fn shared(err: SharedError) -> Self {
        Self {
            error: err,
            carrier: None,
        }
    }

    /// Use an error that also exposes the metadata capability
    pub fn with_carrier<E>(err: Arc<E>) -> Self
    where
        E: StdError + MetadataCarrier + Send + Sync + 'static,
    {
        let carrier: Arc<dyn MetadataCarrier> = err.clone();
        Self {
            error: err,
            carrier: Some(carrier),
        }
    }

    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.error
    }

    pub fn shared_error(&self) -> SharedError {
        self.error.clone()
    }

    pub fn carrier(&self) -> Option<&dyn MetadataCarrier> {
        self.carrier.as_deref()
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.error.downcast_ref::<T>()
    }

    /// True when both handles point at the same error instance
    pub fn ptr_eq(&self, other: &Cause) -> bool {
        self.identity() == other.identity()
    }

    /// True when this handle points at the instance behind `arc`
    pub fn is<T: ?Sized>(&self, arc: &Arc<T>) -> bool {
        self.identity() == Arc::as_ptr(arc) as *const () as usize
    }

    pub(crate) fn identity(&self) -> usize {
        identity(self.error())
    }
}

impl From<SharedError> for Cause {
    fn from(err: SharedError) -> Self {
        Cause::shared(err)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.error, f)
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cause")
            .field("error", &self.error.to_string())
            .field("carrier", &self.carrier.is_some())
            .finish()
    }
}

/// Address of the error value
pub fn identity(err: &(dyn StdError + 'static)) -> usize {
    err as *const dyn StdError as *const () as usize
}

/// Identity of one node during traversal: its address plus its type.
///
/// A newtype whose `source()` is its first field shares that field's
/// address, so the address alone would report a false cycle. The vtable of
/// one type may be duplicated across codegen units, so the error types that
/// can actually form cycles are told apart by downcast instead.
#[derive(Clone, Copy)]
enum NodeKey {
    Domain(usize),
    Validation(usize),
    Foreign(*const (dyn StdError + 'static)),
}

impl NodeKey {
    fn of(err: &(dyn StdError + 'static)) -> Self {
        if err.is::<DomainError>() {
            NodeKey::Domain(identity(err))
        } else if err.is::<ValidationError>() {
            NodeKey::Validation(identity(err))
        } else {
            NodeKey::Foreign(err)
        }
    }

    fn addr(&self) -> usize {
        match *self {
            NodeKey::Domain(addr) | NodeKey::Validation(addr) => addr,
            NodeKey::Foreign(p) => p as *const () as usize,
        }
    }
}

impl PartialEq for NodeKey {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (NodeKey::Domain(a), NodeKey::Domain(b)) => a == b,
            (NodeKey::Validation(a), NodeKey::Validation(b)) => a == b,
            (NodeKey::Foreign(a), NodeKey::Foreign(b)) => ptr::eq(a, b),
            _ => false,
        }
    }
}

impl Eq for NodeKey {}

impl Hash for NodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

/// Iterator over an error and its `source()` chain that stops on revisit
pub struct ChainIter<'a> {
    next: Option<&'a (dyn StdError + 'static)>,
    visited: HashSet<NodeKey>,
    cycle: bool,
}

impl<'a> ChainIter<'a> {
    /// True once the walk stopped because an error reappeared
    pub fn hit_cycle(&self) -> bool {
        self.cycle
    }
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a (dyn StdError + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if let Some(source) = current.source() {
            if self.visited.insert(NodeKey::of(source)) {
                self.next = Some(source);
            } else {
                self.cycle = true;
            }
        }
        Some(current)
    }
}

/// Walk `err` and every error below it, once each
pub fn chain_iter<'a>(err: &'a (dyn StdError + 'static)) -> ChainIter<'a> {
    let mut visited = HashSet::new();
    visited.insert(NodeKey::of(err));
    ChainIter {
        next: Some(err),
        visited,
        cycle: false,
    }
}

/// Innermost error reachable through `source()`, or `err` itself
pub fn root_cause_of<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut root = err;
    for e in chain_iter(err) {
        root = e;
    }
    root
}

/// First error of type `T` in the chain, `err` included
pub fn find_in_chain<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    chain_iter(err).find_map(|e| e.downcast_ref::<T>())
}

/// True when the chain below `err` contains an error of type `T`
pub fn chain_contains<T: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    find_in_chain::<T>(err).is_some()
}

struct CauseNode {
    cause: Cause,
    next: OnceLock<Box<CauseNode>>,
}

/// Append-only history of the causes set on one error
///
/// The current cause is the last entry. Entries stay alive until the owner
/// resets the error with exclusive access, which lets `source()` hand out
/// plain references from behind a shared `&self`.
#[derive(Default)]
pub(crate) struct CauseLog {
    head: OnceLock<Box<CauseNode>>,
}

impl CauseLog {
    pub fn current(&self) -> Option<&Cause> {
        let mut node = self.head.get()?;
        while let Some(next) = node.next.get() {
            node = next;
        }
        Some(&node.cause)
    }

    /// Append a new current cause. Callers hold the owning error's write
    /// lock, so appends never race.
    pub fn push(&self, cause: Cause) {
        let mut pending = Box::new(CauseNode {
            cause,
            next: OnceLock::new(),
        });
        let mut slot = &self.head;
        loop {
            match slot.get() {
                Some(node) => slot = &node.next,
                None => match slot.set(pending) {
                    Ok(()) => return,
                    Err(rejected) => pending = rejected,
                },
            }
        }
    }

    pub fn clear(&mut self) {
        // Unlink iteratively so a long history cannot overflow the stack on drop
        let mut next = self.head.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

impl Drop for CauseLog {
    fn drop(&mut self) {
        self.clear();
    }
}
