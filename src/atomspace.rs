//! Bounded, insertion-ordered collection of atoms.
//!
//! The atomspace holds one handle per member atom. Lookups hand out further
//! handles; `release` drops the atomspace's own.

use std::sync::{Mutex, MutexGuard};

use crate::atom::{AtomHandle, AtomId, AtomIdAllocator, AtomType};
use crate::error::{AgencyResult, AtomspaceError};

/// Default capacity of an atomspace.
pub const DEFAULT_MAX_ATOMS: usize = 10_000;

/// Capacity-bounded set of atoms shared by every agent of an agency.
pub struct Atomspace {
    atoms: Mutex<Vec<AtomHandle>>,
    max_atoms: usize,
    ids: AtomIdAllocator,
}

impl Atomspace {
    /// Create an empty atomspace holding at most `max_atoms` atoms.
    pub fn new(max_atoms: usize) -> Self {
        Self {
            atoms: Mutex::new(Vec::new()),
            max_atoms,
            ids: AtomIdAllocator::new(),
        }
    }

    /// Allocate a new member atom with default truth `(0.5, 0.5, 0)`.
    ///
    /// The returned handle is the caller's; the atomspace keeps its own.
    pub fn allocate(&self, atom_type: AtomType, name: &str) -> AgencyResult<AtomHandle> {
        if name.is_empty() {
            return Err(AtomspaceError::EmptyName.into());
        }
        let mut atoms = self.lock();
        if atoms.len() >= self.max_atoms {
            return Err(AtomspaceError::Full {
                capacity: self.max_atoms,
            }
            .into());
        }
        let atom = AtomHandle::new(self.ids.next_id()?, atom_type, name);
        atoms.push(atom.clone());
        tracing::debug!(id = atom.id().get(), %atom_type, name = atom.name(), "atom allocated");
        Ok(atom)
    }

    /// First member (insertion order) named `name`.
    pub fn lookup(&self, name: &str) -> Option<AtomHandle> {
        self.lock().iter().find(|a| a.name() == name).cloned()
    }

    /// First member (insertion order) of the given type.
    pub fn find_by_type(&self, atom_type: AtomType) -> Option<AtomHandle> {
        self.lock()
            .iter()
            .find(|a| a.atom_type() == atom_type)
            .cloned()
    }

    /// Up to `max_results` members of the given type, in insertion order.
    pub fn query(&self, atom_type: AtomType, max_results: usize) -> Vec<AtomHandle> {
        self.lock()
            .iter()
            .filter(|a| a.atom_type() == atom_type)
            .take(max_results)
            .cloned()
            .collect()
    }

    /// Member with the given id.
    pub fn get(&self, id: AtomId) -> Option<AtomHandle> {
        self.lock().iter().find(|a| a.id() == id).cloned()
    }

    /// Drop the atomspace's membership of `id`.
    ///
    /// The atom lives on while other handles (agents, links, callers) exist.
    pub fn release(&self, id: AtomId) -> AgencyResult<()> {
        let removed = {
            let mut atoms = self.lock();
            let pos = atoms
                .iter()
                .position(|a| a.id() == id)
                .ok_or(AtomspaceError::NotMember { id: id.get() })?;
            atoms.remove(pos)
        };
        tracing::debug!(id = id.get(), refs = removed.ref_count() - 1, "atom released");
        drop(removed);
        Ok(())
    }

    pub fn atom_count(&self) -> usize {
        self.lock().len()
    }

    pub fn max_atoms(&self) -> usize {
        self.max_atoms
    }

    /// Tear the atomspace down.
    ///
    /// Every member loses all of its links and is marked detached, whoever
    /// else still holds it. Only meant for full teardown.
    pub fn destroy(self) {
        tracing::debug!(atoms = self.atom_count(), "destroying atomspace");
        drop(self);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AtomHandle>> {
        self.atoms.lock().expect("atomspace lock poisoned")
    }
}

impl Default for Atomspace {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATOMS)
    }
}

impl Drop for Atomspace {
    fn drop(&mut self) {
        let atoms = std::mem::take(self.atoms.get_mut().expect("atomspace lock poisoned"));
        for atom in &atoms {
            atom.detach();
        }
    }
}

impl std::fmt::Debug for Atomspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atomspace")
            .field("atom_count", &self.atom_count())
            .field("max_atoms", &self.max_atoms)
            .finish()
    }
}
