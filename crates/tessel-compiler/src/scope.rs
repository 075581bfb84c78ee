//! Reference tables for name resolution
//!
//! Each lexical scope gets a table of the bindings it owns plus a link to the
//! table it was forked from. Lookups walk the parent chain at query time, so
//! a binding added to an ancestor after a fork is visible to the descendants.
//!
//! Tables live in a [`ReferenceTables`] arena and are addressed by
//! [`TableId`]; a child only stores its parent's id and never owns it.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::symbols::SymbolGenerator;

pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors raised by reference-table operations (programming errors)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Invalid reference: a binding needs a non-empty name")]
    InvalidReference,

    #[error("Unknown reference table {0}")]
    UnknownTable(TableId),
}

/// Binding kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// `let` binding, assigned once
    Constant,
    /// `var` binding
    Variable,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Constant => write!(f, "let"),
            ReferenceKind::Variable => write!(f, "var"),
        }
    }
}

/// A single binding and the storage slot chosen for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReference {
    name: String,
    kind: ReferenceKind,
    index: Option<u32>,
    captured: bool,
}

impl LocalReference {
    pub fn new(name: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            index: None,
            captured: false,
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::new(name, ReferenceKind::Constant)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(name, ReferenceKind::Variable)
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn is_constant(&self) -> bool {
        self.kind == ReferenceKind::Constant
    }

    /// Storage slot, `None` until the resolver assigns one
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn set_index(&mut self, index: u32) {
        self.index = Some(index);
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
    }

    /// Whether the name was minted by the compiler
    pub fn is_synthetic(&self) -> bool {
        SymbolGenerator::is_synthetic(&self.name)
    }
}

/// Reference table identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

impl TableId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Bindings owned by one scope, in declaration order
#[derive(Debug, Clone, Default)]
struct ReferenceTable {
    parent: Option<TableId>,
    bindings: Vec<LocalReference>,
    positions: FxHashMap<String, usize>,
}

impl ReferenceTable {
    fn with_parent(parent: Option<TableId>) -> Self {
        Self {
            parent,
            ..Default::default()
        }
    }

    fn get(&self, name: &str) -> Option<&LocalReference> {
        self.positions.get(name).map(|&i| &self.bindings[i])
    }

    fn insert(&mut self, reference: LocalReference) {
        match self.positions.get(reference.name()) {
            Some(&i) => self.bindings[i] = reference,
            None => {
                self.positions
                    .insert(reference.name().to_string(), self.bindings.len());
                self.bindings.push(reference);
            }
        }
    }

    fn remove(&mut self, name: &str) -> Option<LocalReference> {
        let position = self.positions.remove(name)?;
        let removed = self.bindings.remove(position);
        for index in self.positions.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }
        Some(removed)
    }
}

/// Arena of reference tables forming the fork tree of one compilation unit
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    tables: Vec<ReferenceTable>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parentless table
    pub fn root(&mut self) -> TableId {
        self.push(ReferenceTable::with_parent(None))
    }

    /// Create an empty child of `table`
    pub fn fork(&mut self, table: TableId) -> ScopeResult<TableId> {
        self.table(table)?;
        Ok(self.push(ReferenceTable::with_parent(Some(table))))
    }

    /// Mutable cursor on `table`, for fluent `add` chains
    pub fn at_mut(&mut self, table: TableId) -> ScopeResult<TableMut<'_>> {
        self.table(table)?;
        Ok(TableMut { tables: self, id: table })
    }

    pub fn parent(&self, table: TableId) -> Option<TableId> {
        self.tables.get(table.index()).and_then(|t| t.parent)
    }

    /// Resolve `name` in `table`, then in its ancestors
    pub fn get(&self, table: TableId, name: &str) -> Option<&LocalReference> {
        self.chain(table)
            .find_map(|id| self.tables[id.index()].get(name))
    }

    pub fn has_reference_for(&self, table: TableId, name: &str) -> bool {
        self.get(table, name).is_some()
    }

    /// Table that owns the binding `name` is resolved to from `table`
    pub fn owner_of(&self, table: TableId, name: &str) -> Option<TableId> {
        self.chain(table)
            .find(|id| self.tables[id.index()].get(name).is_some())
    }

    /// Mutable access to a binding owned by exactly `table`
    pub fn get_owned_mut(&mut self, table: TableId, name: &str) -> Option<&mut LocalReference> {
        let table = self.tables.get_mut(table.index())?;
        let position = *table.positions.get(name)?;
        table.bindings.get_mut(position)
    }

    pub fn owned_references(&self, table: TableId) -> &[LocalReference] {
        self.tables
            .get(table.index())
            .map(|t| t.bindings.as_slice())
            .unwrap_or(&[])
    }

    pub fn owned_symbols(&self, table: TableId) -> Vec<&str> {
        self.owned_references(table)
            .iter()
            .map(|r| r.name())
            .collect()
    }

    /// Every visible binding, outermost scope first; inner bindings shadow outer ones
    pub fn references(&self, table: TableId) -> Vec<&LocalReference> {
        let mut chain: Vec<TableId> = self.chain(table).collect();
        chain.reverse();

        let mut visible: Vec<&LocalReference> = Vec::new();
        let mut positions: FxHashMap<&str, usize> = FxHashMap::default();
        for id in chain {
            for reference in &self.tables[id.index()].bindings {
                match positions.get(reference.name()) {
                    Some(&i) => visible[i] = reference,
                    None => {
                        positions.insert(reference.name(), visible.len());
                        visible.push(reference);
                    }
                }
            }
        }
        visible
    }

    pub fn symbols(&self, table: TableId) -> Vec<&str> {
        self.references(table)
            .into_iter()
            .map(|r| r.name())
            .collect()
    }

    /// Remove a binding owned by exactly `table`; inherited names are left alone
    pub fn remove(&mut self, table: TableId, name: &str) -> Option<LocalReference> {
        self.tables.get_mut(table.index())?.remove(name)
    }

    /// Snapshot every visible binding into a new parentless table
    ///
    /// With `preserve_indices == false` the copies are renumbered `0..n` in
    /// visibility order, so the snapshot's slot layout no longer follows the
    /// source's.
    pub fn flat_deep_copy(&mut self, table: TableId, preserve_indices: bool) -> ScopeResult<TableId> {
        self.table(table)?;
        let mut copy = ReferenceTable::with_parent(None);
        for (index, reference) in self.references(table).into_iter().enumerate() {
            let mut reference = reference.clone();
            if !preserve_indices {
                reference.set_index(index as u32);
            }
            copy.insert(reference);
        }
        Ok(self.push(copy))
    }

    /// Number of tables in the arena
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn push(&mut self, table: ReferenceTable) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push(table);
        id
    }

    fn table(&self, table: TableId) -> ScopeResult<&ReferenceTable> {
        self.tables
            .get(table.index())
            .ok_or(ScopeError::UnknownTable(table))
    }

    /// `table` followed by its ancestors, innermost first
    fn chain(&self, table: TableId) -> impl Iterator<Item = TableId> + '_ {
        let start = self.tables.get(table.index()).map(|_| table);
        std::iter::successors(start, move |id| self.tables[id.index()].parent)
    }
}

/// Mutable cursor on one table
pub struct TableMut<'t> {
    tables: &'t mut ReferenceTables,
    id: TableId,
}

impl<'t> TableMut<'t> {
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Insert an owned binding, replacing one of the same name owned here
    pub fn add(self, reference: LocalReference) -> ScopeResult<Self> {
        if reference.name().is_empty() {
            return Err(ScopeError::InvalidReference);
        }
        self.tables.tables[self.id.index()].insert(reference);
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) -> Option<LocalReference> {
        self.tables.remove(self.id, name)
    }
}
