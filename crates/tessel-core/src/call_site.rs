//! Polymorphic inline cache for one dynamic call site
//!
//! # State machine
//!
//! ```text
//! Unlinked --first call--> Monomorphic --new signature--> Polymorphic
//!                                                             |
//!                          signature count exceeds the limit  v
//!                                                         Megamorphic
//! ```
//!
//! Readers pin an epoch, load the current immutable cache snapshot and
//! compare guards without taking a lock. A miss takes the per-site
//! transition lock, re-checks, resolves, and publishes a new snapshot with a
//! single atomic swap; the old snapshot is destroyed once no pinned reader
//! can still see it. A megamorphic site keeps no entries and resolves
//! through the runtime's shared table from then on.

use crate::error::{DispatchError, DispatchResult};
use crate::runtime::{signature_of, Runtime, Target};
use crate::value::{RuntimeType, Value};
use crossbeam::epoch::{self, Atomic, Owned};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tessel_compiler::CallSiteDescriptor;

/// Caching mode of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheMode {
    Unlinked,
    Monomorphic,
    Polymorphic,
    Megamorphic,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheMode::Unlinked => "unlinked",
            CacheMode::Monomorphic => "monomorphic",
            CacheMode::Polymorphic => "polymorphic",
            CacheMode::Megamorphic => "megamorphic",
        };
        f.write_str(name)
    }
}

/// Snapshot of a call site's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSiteStats {
    pub mode: CacheMode,
    /// Guarded entries currently retained
    pub entries: usize,
    /// Target resolutions performed for this site
    pub resolutions: usize,
    pub invocations: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    signature: Box<[RuntimeType]>,
    target: Target,
}

impl CacheEntry {
    #[inline]
    fn guard(&self, args: &[Value]) -> bool {
        self.signature.len() == args.len()
            && self
                .signature
                .iter()
                .zip(args)
                .all(|(ty, value)| *ty == value.runtime_type())
    }
}

/// Immutable cache contents; replaced wholesale on every transition
#[derive(Debug)]
struct CacheState {
    mode: CacheMode,
    entries: Vec<CacheEntry>,
}

impl CacheState {
    fn unlinked() -> Self {
        Self {
            mode: CacheMode::Unlinked,
            entries: Vec::new(),
        }
    }

    fn lookup(&self, args: &[Value]) -> Option<&Target> {
        self.entries
            .iter()
            .find(|entry| entry.guard(args))
            .map(|entry| &entry.target)
    }
}

enum Probe {
    Hit(Target),
    Miss,
    Megamorphic,
}

/// A linked dynamic call site
pub struct CallSite {
    descriptor: CallSiteDescriptor,
    runtime: Arc<Runtime>,
    limit: usize,
    state: Atomic<CacheState>,
    transition: Mutex<()>,
    resolutions: AtomicUsize,
    invocations: AtomicUsize,
}

impl CallSite {
    /// Create an unlinked site using the runtime's policy
    pub fn new(descriptor: CallSiteDescriptor, runtime: Arc<Runtime>) -> Self {
        let limit = runtime.policy().polymorphic_limit.max(1);
        Self {
            descriptor,
            runtime,
            limit,
            state: Atomic::new(CacheState::unlinked()),
            transition: Mutex::new(()),
            resolutions: AtomicUsize::new(0),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn descriptor(&self) -> &CallSiteDescriptor {
        &self.descriptor
    }

    /// Invoke the site with its operands (receiver first for methods)
    pub fn invoke(&self, args: &[Value]) -> DispatchResult<Value> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        if args.len() != self.descriptor.arity {
            return Err(DispatchError::ArityMismatch {
                name: self.descriptor.name(),
                expected: self.descriptor.arity,
                actual: args.len(),
            });
        }

        match self.probe(args) {
            Probe::Hit(target) => target.invoke(args),
            Probe::Megamorphic => self.invoke_megamorphic(args),
            Probe::Miss => self.relink(args),
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.stats().mode
    }

    pub fn stats(&self) -> CallSiteStats {
        let guard = epoch::pin();
        let state = self.state.load(Ordering::Acquire, &guard);
        // SAFETY: the pointer is live while `guard` is pinned (see `probe`).
        let (mode, entries) = unsafe { state.as_ref() }
            .map(|s| (s.mode, s.entries.len()))
            .unwrap_or((CacheMode::Unlinked, 0));
        CallSiteStats {
            mode,
            entries,
            resolutions: self.resolutions.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
        }
    }

    /// Lock-free guard check against the current snapshot
    #[inline]
    fn probe(&self, args: &[Value]) -> Probe {
        let guard = epoch::pin();
        let state = self.state.load(Ordering::Acquire, &guard);
        // SAFETY: snapshots are only retired through `defer_destroy`, which
        // waits for every guard pinned before the swap.
        match unsafe { state.as_ref() } {
            Some(state) if state.mode == CacheMode::Megamorphic => Probe::Megamorphic,
            Some(state) => match state.lookup(args) {
                Some(target) => Probe::Hit(target.clone()),
                None => Probe::Miss,
            },
            None => Probe::Miss,
        }
    }

    /// Slow path: resolve under the transition lock and publish a new snapshot
    fn relink(&self, args: &[Value]) -> DispatchResult<Value> {
        let target = {
            let _transition = self.transition.lock();
            let guard = epoch::pin();
            let current = self.state.load(Ordering::Acquire, &guard);
            // SAFETY: as in `probe`; writers are serialized by `transition`.
            let state = unsafe { current.as_ref() };
            let (mode, entries) = state
                .map(|s| (s.mode, s.entries.as_slice()))
                .unwrap_or((CacheMode::Unlinked, &[][..]));

            if mode == CacheMode::Megamorphic {
                None
            } else if let Some(target) = state.and_then(|s| s.lookup(args)) {
                // linked by another thread while we waited
                Some(target.clone())
            } else {
                let target = self.runtime.resolve(&self.descriptor.kind, args)?;
                self.resolutions.fetch_add(1, Ordering::Relaxed);
                let signature = signature_of(args);

                let next = if entries.len() >= self.limit {
                    log::debug!(
                        "call site #{} '{}' at {} is megamorphic after {} signatures",
                        self.descriptor.id,
                        self.descriptor.kind,
                        self.descriptor.span,
                        entries.len() + 1
                    );
                    self.runtime.megamorphic().insert(
                        self.descriptor.kind.clone(),
                        &signature,
                        target.clone(),
                    );
                    CacheState {
                        mode: CacheMode::Megamorphic,
                        entries: Vec::new(),
                    }
                } else {
                    let mut entries = entries.to_vec();
                    entries.push(CacheEntry {
                        signature: signature.into_boxed_slice(),
                        target: target.clone(),
                    });
                    let mode = if entries.len() == 1 {
                        CacheMode::Monomorphic
                    } else {
                        CacheMode::Polymorphic
                    };
                    if mode != mode_before(state) {
                        log::trace!(
                            "call site #{} '{}' is {}",
                            self.descriptor.id,
                            self.descriptor.kind,
                            mode
                        );
                    }
                    CacheState { mode, entries }
                };

                let previous = self.state.swap(Owned::new(next), Ordering::AcqRel, &guard);
                if !previous.is_null() {
                    // SAFETY: `previous` is no longer reachable from `self.state`;
                    // readers that loaded it before the swap keep it alive
                    // through their pinned guards.
                    unsafe { guard.defer_destroy(previous) };
                }
                Some(target)
            }
        };

        match target {
            Some(target) => target.invoke(args),
            None => self.invoke_megamorphic(args),
        }
    }

    fn invoke_megamorphic(&self, args: &[Value]) -> DispatchResult<Value> {
        let table = self.runtime.megamorphic();
        let signature = signature_of(args);
        let target = match table.lookup(&self.descriptor.kind, &signature) {
            Some(target) => target,
            None => {
                let target = self.runtime.resolve(&self.descriptor.kind, args)?;
                self.resolutions.fetch_add(1, Ordering::Relaxed);
                table.insert(self.descriptor.kind.clone(), &signature, target.clone());
                target
            }
        };
        target.invoke(args)
    }
}

fn mode_before(state: Option<&CacheState>) -> CacheMode {
    state.map(|s| s.mode).unwrap_or(CacheMode::Unlinked)
}

impl Drop for CallSite {
    fn drop(&mut self) {
        // SAFETY: `&mut self` guarantees no other thread can load the snapshot.
        unsafe {
            let guard = epoch::unprotected();
            let state = self.state.load(Ordering::Relaxed, guard);
            if !state.is_null() {
                drop(state.into_owned());
            }
        }
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("descriptor", &self.descriptor)
            .field("limit", &self.limit)
            .field("stats", &self.stats())
            .finish()
    }
}
