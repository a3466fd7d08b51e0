//! Atoms: the typed, named knowledge units of the agency.
//!
//! An [`Atom`] carries a probabilistic [`TruthValue`], an opaque payload and
//! two link tables (outgoing and incoming). Atoms are shared through
//! [`AtomHandle`], an `Arc` whose strong count is the atom's reference count:
//! the atomspace, every agent collection entry, every message in flight and
//! every link pointing at the atom each hold one handle.
//!
//! Links are reference-holding on their target only. The source side keeps a
//! strong handle to the target in its outgoing table; the target keeps a weak
//! back-reference in its incoming table. Both entries are written and removed
//! under both atoms' link locks, always acquired in ascending
//! `(AtomId, address)` order.

use std::num::NonZeroU64;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{AgencyResult, AtomError};

/// Longest atom, agent or rule name kept, in bytes. Longer names are truncated.
pub const MAX_NAME_LEN: usize = 63;

/// Unique, niche-optimized identifier for an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AtomId(NonZeroU64);

impl AtomId {
    /// Create an `AtomId` from a raw `u64`. Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(AtomId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for AtomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "atom:{}", self.0)
    }
}

/// Thread-safe, monotonically increasing atom id source starting at 1.
#[derive(Debug)]
pub struct AtomIdAllocator {
    next: AtomicU64,
}

impl AtomIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next atom id.
    pub fn next_id(&self) -> AgencyResult<AtomId> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        AtomId::new(raw).ok_or_else(|| AtomError::IdsExhausted.into())
    }
}

impl Default for AtomIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Classification of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtomType {
    /// An abstract concept.
    Concept,
    /// A relational predicate.
    Predicate,
    /// A connection reified as an atom.
    Link,
    /// A concrete value.
    Value,
    /// An objective an agent works toward.
    Goal,
    /// A belief state.
    Belief,
    /// Something an agent can do.
    Action,
    /// A behavioral schema.
    Schema,
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AtomType::Concept => "Concept",
            AtomType::Predicate => "Predicate",
            AtomType::Link => "Link",
            AtomType::Value => "Value",
            AtomType::Goal => "Goal",
            AtomType::Belief => "Belief",
            AtomType::Action => "Action",
            AtomType::Schema => "Schema",
        };
        f.write_str(s)
    }
}

/// Probabilistic truth: how true (`strength`), how sure (`confidence`), and
/// how many times it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    /// Truth strength in [0.0, 1.0].
    pub strength: f32,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
    /// Number of observations folded into this value.
    pub count: u32,
}

impl TruthValue {
    /// Whether both components lie in [0.0, 1.0]. NaN is rejected.
    pub fn in_range(strength: f32, confidence: f32) -> bool {
        (0.0..=1.0).contains(&strength) && (0.0..=1.0).contains(&confidence)
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self {
            strength: 0.5,
            confidence: 0.5,
            count: 0,
        }
    }
}

/// An outgoing edge. Holds a strong handle on its target.
#[derive(Debug)]
pub struct Link {
    target: AtomHandle,
    link_type: u32,
    strength: f32,
    seq: u64,
}

impl Link {
    pub fn target(&self) -> &AtomHandle {
        &self.target
    }

    pub fn link_type(&self) -> u32 {
        self.link_type
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }
}

/// The target-side half of a link: a weak back-reference to the source.
#[derive(Debug)]
struct IncomingLink {
    source: Weak<Atom>,
    seq: u64,
}

impl IncomingLink {
    fn is_from(&self, source: *const Atom) -> bool {
        std::ptr::eq(Weak::as_ptr(&self.source), source)
    }
}

#[derive(Debug, Default)]
struct LinkTable {
    outgoing: Vec<Link>,
    incoming: Vec<IncomingLink>,
    next_seq: u64,
}

/// A knowledge unit. Always accessed through an [`AtomHandle`].
pub struct Atom {
    id: AtomId,
    atom_type: AtomType,
    name: String,
    truth: RwLock<TruthValue>,
    payload: Mutex<Option<Vec<u8>>>,
    links: Mutex<LinkTable>,
    detached: AtomicBool,
}

impl Atom {
    pub fn id(&self) -> AtomId {
        self.id
    }

    pub fn atom_type(&self) -> AtomType {
        self.atom_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current truth value.
    pub fn truth(&self) -> TruthValue {
        *self.truth.read().expect("truth lock poisoned")
    }

    /// Overwrite strength and confidence and count one more observation.
    ///
    /// Fails without touching the atom if either value is outside [0.0, 1.0].
    pub fn set_truth(&self, strength: f32, confidence: f32) -> AgencyResult<()> {
        if !TruthValue::in_range(strength, confidence) {
            return Err(AtomError::TruthOutOfRange {
                strength,
                confidence,
            }
            .into());
        }
        let mut truth = self.truth.write().expect("truth lock poisoned");
        truth.strength = strength;
        truth.confidence = confidence;
        truth.count = truth.count.saturating_add(1);
        Ok(())
    }

    /// Raise confidence by `step` (capped at 1.0) and count one observation.
    pub(crate) fn reinforce(&self, step: f32) -> TruthValue {
        let mut truth = self.truth.write().expect("truth lock poisoned");
        if truth.confidence < 1.0 {
            truth.confidence = (truth.confidence + step).min(1.0);
        }
        truth.count = truth.count.saturating_add(1);
        *truth
    }

    /// Copy of the opaque payload, if any.
    pub fn payload(&self) -> Option<Vec<u8>> {
        self.payload.lock().expect("payload lock poisoned").clone()
    }

    /// Replace the opaque payload, returning the previous one.
    pub fn set_payload(&self, payload: Option<Vec<u8>>) -> Option<Vec<u8>> {
        std::mem::replace(&mut *self.payload.lock().expect("payload lock poisoned"), payload)
    }

    /// `|outgoing| + |incoming|`.
    pub fn count_links(&self) -> usize {
        let table = self.lock_links();
        table.outgoing.len() + table.incoming.len()
    }

    /// Number of outgoing links.
    pub fn outgoing_count(&self) -> usize {
        self.lock_links().outgoing.len()
    }

    /// Number of incoming links.
    pub fn incoming_count(&self) -> usize {
        self.lock_links().incoming.len()
    }

    /// Call `visit` for the target of every outgoing link, in insertion order.
    ///
    /// This atom's link table stays locked for the whole walk, so concurrent
    /// link changes on it wait until the walk ends. `visit` may read any
    /// atom's truth value but must not create, remove or count links on this
    /// atom.
    pub fn traverse_links(&self, mut visit: impl FnMut(&AtomHandle)) {
        let table = self.lock_links();
        for link in &table.outgoing {
            visit(&link.target);
        }
    }

    /// `(target id, link type, strength)` for every outgoing link.
    pub fn outgoing(&self) -> Vec<(AtomId, u32, f32)> {
        self.lock_links()
            .outgoing
            .iter()
            .map(|l| (l.target.id(), l.link_type, l.strength))
            .collect()
    }

    /// Handles on the sources of every incoming link that is still alive.
    pub fn incoming_sources(&self) -> Vec<AtomHandle> {
        self.lock_links()
            .incoming
            .iter()
            .filter_map(|l| l.source.upgrade().map(AtomHandle))
            .collect()
    }

    /// True once the owning atomspace has been destroyed.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn lock_links(&self) -> MutexGuard<'_, LinkTable> {
        self.links.lock().expect("link lock poisoned")
    }
}

impl std::fmt::Debug for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id)
            .field("type", &self.atom_type)
            .field("name", &self.name)
            .field("truth", &self.truth())
            .finish_non_exhaustive()
    }
}

impl Drop for Atom {
    fn drop(&mut self) {
        // No source can still point here (it would keep us alive), but our
        // targets still carry incoming entries from us.
        let outgoing = std::mem::take(&mut self.links.get_mut().expect("link lock poisoned").outgoing);
        let me: *const Atom = self;
        for link in &outgoing {
            link.target.lock_links().incoming.retain(|i| !i.is_from(me));
        }
        drop(outgoing);
    }
}

/// Shared, reference-counted handle on an [`Atom`].
#[derive(Clone)]
pub struct AtomHandle(Arc<Atom>);

impl std::fmt::Debug for AtomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.0, f)
    }
}

impl AtomHandle {
    pub(crate) fn new(id: AtomId, atom_type: AtomType, name: &str) -> Self {
        Self(Arc::new(Atom {
            id,
            atom_type,
            name: bounded_name(name),
            truth: RwLock::new(TruthValue::default()),
            payload: Mutex::new(None),
            links: Mutex::new(LinkTable::default()),
            detached: AtomicBool::new(false),
        }))
    }

    /// Number of live holders of this atom, this handle included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Whether two handles refer to the same atom.
    pub fn ptr_eq(a: &AtomHandle, b: &AtomHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Add a directed link `self -> to` and take a reference on `to`.
    ///
    /// Parallel links between the same pair are allowed.
    pub fn create_link(&self, to: &AtomHandle, link_type: u32, strength: f32) -> AgencyResult<()> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(AtomError::LinkStrengthOutOfRange { strength }.into());
        }
        let mut pair = lock_pair(self, to);
        let seq = {
            let source = pair.source();
            let seq = source.next_seq;
            source.next_seq += 1;
            source.outgoing.push(Link {
                target: to.clone(),
                link_type,
                strength,
                seq,
            });
            seq
        };
        pair.target().incoming.push(IncomingLink {
            source: Arc::downgrade(&self.0),
            seq,
        });
        drop(pair);
        tracing::debug!(from = self.id.get(), to = to.id.get(), link_type, "link created");
        Ok(())
    }

    /// Remove the first outgoing link `self -> to` (insertion order) from both
    /// atoms and release its reference on `to`.
    pub fn remove_link(&self, to: &AtomHandle) -> AgencyResult<()> {
        let removed = {
            let mut pair = lock_pair(self, to);
            let source = pair.source();
            let Some(pos) = source
                .outgoing
                .iter()
                .position(|l| AtomHandle::ptr_eq(&l.target, to))
            else {
                return Err(AtomError::LinkNotFound {
                    from: self.id.get(),
                    to: to.id.get(),
                }
                .into());
            };
            let link = source.outgoing.remove(pos);
            let me = Arc::as_ptr(&self.0);
            let target = pair.target();
            if let Some(i) = target
                .incoming
                .iter()
                .position(|i| i.seq == link.seq && i.is_from(me))
            {
                target.incoming.remove(i);
            }
            link
        };
        drop(removed);
        tracing::debug!(from = self.id.get(), to = to.id.get(), "link removed");
        Ok(())
    }

    /// Drop every link touching this atom, on both sides, and mark it detached.
    pub(crate) fn detach(&self) {
        let (outgoing, incoming) = {
            let mut table = self.lock_links();
            (
                std::mem::take(&mut table.outgoing),
                std::mem::take(&mut table.incoming),
            )
        };
        let me = Arc::as_ptr(&self.0);
        for link in &outgoing {
            if !AtomHandle::ptr_eq(&link.target, self) {
                link.target.lock_links().incoming.retain(|i| !i.is_from(me));
            }
        }
        let mut released = Vec::new();
        let mut sources = Vec::new();
        for entry in &incoming {
            let Some(source) = entry.source.upgrade().map(AtomHandle) else {
                continue;
            };
            if AtomHandle::ptr_eq(&source, self) {
                continue;
            }
            {
                let mut table = source.lock_links();
                let (gone, kept): (Vec<Link>, Vec<Link>) = std::mem::take(&mut table.outgoing)
                    .into_iter()
                    .partition(|l| AtomHandle::ptr_eq(&l.target, self));
                table.outgoing = kept;
                released.extend(gone);
            }
            sources.push(source);
        }
        self.detached.store(true, Ordering::Release);
        // Handles are released only after every table lock above is gone.
        drop(outgoing);
        drop(released);
        drop(sources);
    }

    fn lock_key(&self) -> (AtomId, usize) {
        (self.id, Arc::as_ptr(&self.0) as usize)
    }
}

impl Deref for AtomHandle {
    type Target = Atom;

    fn deref(&self) -> &Atom {
        &self.0
    }
}

impl PartialEq for AtomHandle {
    fn eq(&self, other: &Self) -> bool {
        AtomHandle::ptr_eq(self, other)
    }
}

impl Eq for AtomHandle {}

/// Both link tables of a link operation, locked in ascending
/// `(AtomId, address)` order. A self-link locks its single table once.
enum PairGuard<'a> {
    Same(MutexGuard<'a, LinkTable>),
    Distinct {
        source: MutexGuard<'a, LinkTable>,
        target: MutexGuard<'a, LinkTable>,
    },
}

impl PairGuard<'_> {
    fn source(&mut self) -> &mut LinkTable {
        match self {
            PairGuard::Same(table) => &mut **table,
            PairGuard::Distinct { source, .. } => &mut **source,
        }
    }

    fn target(&mut self) -> &mut LinkTable {
        match self {
            PairGuard::Same(table) => &mut **table,
            PairGuard::Distinct { target, .. } => &mut **target,
        }
    }
}

fn lock_pair<'a>(source: &'a AtomHandle, target: &'a AtomHandle) -> PairGuard<'a> {
    if AtomHandle::ptr_eq(source, target) {
        return PairGuard::Same(source.lock_links());
    }
    if source.lock_key() < target.lock_key() {
        let source = source.lock_links();
        let target = target.lock_links();
        PairGuard::Distinct { source, target }
    } else {
        let target = target.lock_links();
        let source = source.lock_links();
        PairGuard::Distinct { source, target }
    }
}

/// Truncate `name` to at most [`MAX_NAME_LEN`] bytes on a char boundary.
pub(crate) fn bounded_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
