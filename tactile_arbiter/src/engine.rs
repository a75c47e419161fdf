// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine: one explicitly constructed owner for the registry, the scene,
//! and every gesture, with the per-frame arbitration loop.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use tactile_gesture::{GestureCore, GestureState, Recognizer, RecognizerCx};
use tactile_pointer::{FrameBatch, PointerHandle, PointerId, PointerRegistry};
use tactile_scene::{Exclusivity, Hit, HitResolver, NodeId, SceneTree, StaleNode};

use crate::GestureId;
use crate::delegate::GestureDelegate;
use crate::hierarchy::{HierarchyCache, NodeGestures};

struct GestureEntry {
    node: NodeId,
    core: GestureCore,
    /// Taken out for the duration of a recognizer call, put back after.
    recognizer: Option<Box<dyn Recognizer>>,
    delegate: Option<Box<dyn GestureDelegate>>,
    require_to_fail: Option<GestureId>,
    enabled: bool,
}

struct Slot {
    generation: u32,
    entry: Option<GestureEntry>,
}

#[derive(Copy, Clone)]
enum DispatchKind {
    Pressed,
    Updated,
    Released,
    Cancelled,
}

/// How a commit treats pointers retained by the gesture.
#[derive(Copy, Clone)]
struct CommitOpts {
    /// Cancel a retained pointer whose retention count reaches zero during a
    /// cancellation.
    cancel_retained: bool,
    /// Ask the registry to re-synthesize cancelled pointers.
    return_pointers: bool,
}

impl Default for CommitOpts {
    fn default() -> Self {
        Self {
            cancel_retained: true,
            return_pointers: true,
        }
    }
}

/// The gesture recognition engine.
///
/// Owns the pointer registry, the scene tree, and the gesture arena, and
/// runs the whole per-frame pipeline from [`Engine::update`]: flush the
/// registry, resolve hits for newly pressed pointers, distribute pointers to
/// candidate gestures with prevention applied, redeliver later lifecycle
/// events to the gestures that claimed each pointer, tick time-based
/// recognizers, and reset every gesture that reached a terminal state this
/// frame.
///
/// There are no singletons anywhere: construct an engine, keep it wherever
/// the frame loop lives, and hand [`Engine::pointer_handle`] clones to input
/// sources.
pub struct Engine {
    scene: SceneTree,
    registry: PointerRegistry<Hit>,
    handle: PointerHandle,
    resolver: Option<Box<dyn HitResolver>>,
    resolver_warned: bool,
    slots: Vec<Slot>,
    free: Vec<u32>,
    on_node: NodeGestures,
    friendly: HashSet<(GestureId, GestureId)>,
    claims: HashMap<PointerId, SmallVec<[GestureId; 2]>>,
    reset_queue: Vec<GestureId>,
    exclusivity: Exclusivity,
}

impl Engine {
    /// Creates an engine with the given hit resolver.
    #[must_use]
    pub fn new(resolver: impl HitResolver + 'static) -> Self {
        Self::build(Some(Box::new(resolver)))
    }

    /// Creates an engine with no hit resolver.
    ///
    /// Pointers are still tracked and batched, but no gesture will ever
    /// claim one; the first press reports the missing collaborator once.
    #[must_use]
    pub fn without_resolver() -> Self {
        Self::build(None)
    }

    fn build(resolver: Option<Box<dyn HitResolver>>) -> Self {
        let registry = PointerRegistry::new();
        let handle = registry.handle();
        Self {
            scene: SceneTree::new(),
            registry,
            handle,
            resolver,
            resolver_warned: false,
            slots: Vec::new(),
            free: Vec::new(),
            on_node: NodeGestures::default(),
            friendly: HashSet::new(),
            claims: HashMap::new(),
            reset_queue: Vec::new(),
            exclusivity: Exclusivity::new(),
        }
    }

    /// A submission handle for input sources; freely cloneable across
    /// threads.
    #[must_use]
    pub fn pointer_handle(&self) -> PointerHandle {
        self.handle.clone()
    }

    /// Installs or replaces the hit resolver.
    ///
    /// Resolvers usually need node ids from the scene, so the common order
    /// is: build the engine, populate the scene, then install the resolver.
    pub fn set_resolver(&mut self, resolver: impl HitResolver + 'static) {
        self.resolver = Some(Box::new(resolver));
        self.resolver_warned = false;
    }

    /// The scene tree gestures attach to.
    #[must_use]
    pub fn scene(&self) -> &SceneTree {
        &self.scene
    }

    /// Mutable access to the scene tree, for building the hierarchy between
    /// frames.
    pub fn scene_mut(&mut self) -> &mut SceneTree {
        &mut self.scene
    }

    /// The pointer registry, for reading pointer state.
    #[must_use]
    pub fn registry(&self) -> &PointerRegistry<Hit> {
        &self.registry
    }

    /// Attaches a recognizer to a scene node.
    pub fn add_gesture(
        &mut self,
        node: NodeId,
        core: GestureCore,
        recognizer: impl Recognizer + 'static,
    ) -> Result<GestureId, StaleNode> {
        if !self.scene.is_alive(node) {
            return Err(StaleNode(node));
        }
        let entry = GestureEntry {
            node,
            core,
            recognizer: Some(Box::new(recognizer)),
            delegate: None,
            require_to_fail: None,
            enabled: true,
        };
        let id = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.entry = Some(entry);
            GestureId::new(idx, slot.generation)
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 1,
                entry: Some(entry),
            });
            GestureId::new(idx, 1)
        };
        self.on_node.entry(node).or_default().push(id);
        Ok(id)
    }

    /// Detaches and destroys a gesture. A recognizing gesture is cancelled
    /// first.
    pub fn remove_gesture(&mut self, id: GestureId) {
        if self.state(id).is_none() {
            return;
        }
        self.cancel_gesture(id, false, false);
        let Some(entry) = self.entry(id) else { return };
        let node = entry.node;
        if let Some(list) = self.on_node.get_mut(&node) {
            list.retain(|g| *g != id);
            if list.is_empty() {
                self.on_node.remove(&node);
            }
        }
        for list in self.claims.values_mut() {
            list.retain(|g| *g != id);
        }
        self.claims.retain(|_, list| !list.is_empty());
        self.friendly.retain(|&(a, b)| a != id && b != id);
        self.reset_queue.retain(|&g| g != id);
        let slot = &mut self.slots[id.idx()];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.0);
    }

    /// Enables or disables a gesture. Disabling cancels a non-terminal
    /// epoch in progress.
    pub fn set_enabled(&mut self, id: GestureId, enabled: bool) {
        if !enabled && self.state(id).is_some_and(|s| !s.is_terminal()) {
            self.cancel_gesture(id, false, false);
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.enabled = enabled;
        }
    }

    /// Attaches a delegate overriding the default arbitration rules.
    pub fn set_delegate(&mut self, id: GestureId, delegate: impl GestureDelegate + 'static) {
        if let Some(entry) = self.entry_mut(id) {
            entry.delegate = Some(Box::new(delegate));
        }
    }

    /// Removes the gesture's delegate.
    pub fn clear_delegate(&mut self, id: GestureId) {
        if let Some(entry) = self.entry_mut(id) {
            entry.delegate = None;
        }
    }

    /// Makes `id` wait for `predecessor` to fail before it may begin or
    /// recognize. Pass `None` to clear the edge.
    pub fn require_failure_of(&mut self, id: GestureId, predecessor: Option<GestureId>) {
        if let Some(entry) = self.entry_mut(id) {
            entry.require_to_fail = predecessor;
        }
    }

    /// Declares two gestures friendly: neither ever prevents the other.
    /// The relation is symmetric by construction.
    pub fn add_friendship(&mut self, a: GestureId, b: GestureId) {
        if a != b {
            self.friendly.insert(Self::pair(a, b));
        }
    }

    /// Dissolves a friendship.
    pub fn remove_friendship(&mut self, a: GestureId, b: GestureId) {
        self.friendly.remove(&Self::pair(a, b));
    }

    /// Returns `true` if the two gestures are friendly.
    #[must_use]
    pub fn are_friendly(&self, a: GestureId, b: GestureId) -> bool {
        self.friendly.contains(&Self::pair(a, b))
    }

    /// Current state of a gesture, if it exists.
    #[must_use]
    pub fn state(&self, id: GestureId) -> Option<GestureState> {
        self.entry(id).map(|e| e.core.state())
    }

    /// The node a gesture is attached to.
    #[must_use]
    pub fn node_of(&self, id: GestureId) -> Option<NodeId> {
        self.entry(id).map(|e| e.node)
    }

    /// The gesture's shared bookkeeping.
    #[must_use]
    pub fn core(&self, id: GestureId) -> Option<&GestureCore> {
        self.entry(id).map(|e| &e.core)
    }

    /// Mutable access to the gesture's bookkeeping, e.g. for registering
    /// state-change listeners.
    pub fn core_mut(&mut self, id: GestureId) -> Option<&mut GestureCore> {
        self.entry_mut(id).map(|e| &mut e.core)
    }

    /// Downcasts the gesture's recognizer, for reading recognizer-specific
    /// results such as continuous transform deltas.
    #[must_use]
    pub fn recognizer_as<R: Recognizer>(&self, id: GestureId) -> Option<&R> {
        self.entry(id)?
            .recognizer
            .as_ref()?
            .as_any()
            .downcast_ref::<R>()
    }

    /// Cancels a gesture from outside.
    ///
    /// With `cancel_pointers`, the gesture's claimed pointers are cancelled
    /// too; `return_pointers` additionally re-synthesizes them next frame so
    /// other consumers can pick them up.
    pub fn cancel_gesture(&mut self, id: GestureId, cancel_pointers: bool, return_pointers: bool) {
        let Some(state) = self.state(id) else { return };
        if state == GestureState::Idle || state.is_terminal() {
            return;
        }
        let mut cache = HierarchyCache::default();
        if cancel_pointers {
            let active: SmallVec<[PointerId; 8]> = self
                .entry(id)
                .map(|e| e.core.active_pointers().into())
                .unwrap_or_default();
            for &p in &active {
                self.handle.cancel(p, return_pointers);
            }
        }
        let opts = CommitOpts {
            // Explicit cancellation above already disposed of the pointers.
            cancel_retained: !cancel_pointers,
            return_pointers,
        };
        self.commit(id, GestureState::Cancelled, opts, &mut cache);
    }

    /// Grants `node` and its subtree exclusive claim over all pointers.
    pub fn set_exclusive(&mut self, node: NodeId) {
        self.exclusivity.set_exclusive(&self.scene, node);
    }

    /// Requests release of exclusivity; takes effect two frames later.
    pub fn release_exclusive(&mut self) {
        self.exclusivity.request_release();
    }

    /// Returns `true` if `node` currently belongs to the exclusive subtree.
    #[must_use]
    pub fn is_exclusive(&self, node: NodeId) -> bool {
        self.exclusivity.is_exclusive(node)
    }

    /// Runs one frame: flush, dispatch, arbitrate, tick, reset.
    ///
    /// `dt` is the frame duration in seconds, forwarded to time-based
    /// recognizers. Returns the batch that was dispatched.
    pub fn update(&mut self, dt: f64) -> FrameBatch {
        let batch = self.registry.flush();
        let mut cache = HierarchyCache::default();

        self.dispatch_pressed(&batch.pressed, &mut cache);
        self.redeliver(&batch.updated, DispatchKind::Updated, &mut cache);
        self.redeliver(&batch.released, DispatchKind::Released, &mut cache);
        // A removed pointer that never saw a release is gone abnormally;
        // its claimers observe a cancellation.
        let claimed_removed: SmallVec<[PointerId; 4]> = batch
            .removed
            .iter()
            .copied()
            .filter(|p| self.claims.contains_key(p) && !batch.released.contains(p))
            .collect();
        self.redeliver(&claimed_removed, DispatchKind::Cancelled, &mut cache);
        self.redeliver(&batch.cancelled, DispatchKind::Cancelled, &mut cache);

        for p in batch
            .released
            .iter()
            .chain(&batch.removed)
            .chain(&batch.cancelled)
        {
            self.claims.remove(p);
        }

        self.tick_recognizers(dt, &mut cache);
        self.end_frame();
        batch
    }

    // ---- frame internals ----

    fn dispatch_pressed(&mut self, pressed: &[PointerId], cache: &mut HierarchyCache) {
        if pressed.is_empty() {
            return;
        }
        if self.resolver.is_none() {
            if !self.resolver_warned {
                log::warn!("no hit resolver configured; gestures will not recognize");
                self.resolver_warned = true;
            }
            return;
        }

        // Hit-test each pressed pointer once and group them by target,
        // preserving batch order.
        let mut order: SmallVec<[NodeId; 4]> = SmallVec::new();
        let mut by_target: HashMap<NodeId, SmallVec<[PointerId; 4]>> = HashMap::new();
        for &pid in pressed {
            let Some(position) = self.registry.get(pid).map(|p| p.position()) else {
                continue;
            };
            let Some(hit) = self.resolver.as_ref().and_then(|r| r.resolve(position)) else {
                continue;
            };
            if !self.scene.is_alive(hit.node) {
                log::warn!("hit resolver returned dead node {:?}", hit.node);
                continue;
            }
            self.registry.set_press_record(pid, hit);
            if !by_target.contains_key(&hit.node) {
                order.push(hit.node);
            }
            by_target.entry(hit.node).or_default().push(pid);
        }

        for target in order {
            let Some(pointers) = by_target.get(&target).cloned() else {
                continue;
            };
            self.dispatch_pressed_for_target(target, &pointers, cache);
        }
    }

    fn dispatch_pressed_for_target(
        &mut self,
        target: NodeId,
        pointers: &[PointerId],
        cache: &mut HierarchyCache,
    ) {
        // Only gestures on the target or its ancestors may claim pointers
        // hit there; the full union is consulted for prevention.
        let claimers = cache.ending_with(&self.scene, &self.on_node, target);
        let union = cache.candidate_union(&self.scene, &self.on_node, target);

        for g in claimers {
            if !self.is_active(g) {
                continue;
            }
            if self.exclusivity.is_active() {
                let inside = self.node_of(g).is_some_and(|n| self.exclusivity.is_exclusive(n));
                if !inside {
                    continue;
                }
            }
            let blocked = union.iter().any(|&s| {
                s != g
                    && self.is_active(s)
                    && self.state(s).is_some_and(GestureState::is_recognizing)
                    && self.can_prevent(s, g)
            });
            if blocked {
                continue;
            }

            let admitted: SmallVec<[PointerId; 4]> = pointers
                .iter()
                .copied()
                .filter(|&p| self.should_receive(g, p))
                .collect();
            if admitted.is_empty() {
                continue;
            }

            for &p in &admitted {
                let list = self.claims.entry(p).or_default();
                if !list.contains(&g) {
                    list.push(g);
                }
            }
            let recognizing = if let Some(entry) = self.entry_mut(g) {
                entry.core.add_pointers(&admitted);
                entry.core.state().is_recognizing()
            } else {
                false
            };
            // Pointers joining a recognizing gesture are retained like the
            // ones it began with.
            if recognizing {
                for &p in &admitted {
                    self.registry.retain(p);
                }
            }
            if self.state(g) == Some(GestureState::Idle) {
                self.commit(g, GestureState::Possible, CommitOpts::default(), cache);
            }
            // A predecessor that already succeeded this epoch dooms the
            // gesture no matter when it was registered.
            if self.state(g) == Some(GestureState::Possible)
                && let Some(pred) = self.entry(g).and_then(|e| e.require_to_fail)
                && self.state(pred).is_some_and(|s| {
                    s.is_recognizing()
                        || matches!(s, GestureState::Ended | GestureState::Cancelled)
                })
            {
                self.commit(g, GestureState::Failed, CommitOpts::default(), cache);
                continue;
            }
            if let Some(request) = self.call_recognizer(g, DispatchKind::Pressed, &admitted) {
                self.resolve_request(g, request, cache);
            }
        }
    }

    /// Redelivers update/release/cancel events to the gestures that claimed
    /// each pointer at press time. No fresh hierarchy resolution happens
    /// here.
    fn redeliver(&mut self, ids: &[PointerId], kind: DispatchKind, cache: &mut HierarchyCache) {
        if ids.is_empty() {
            return;
        }
        let mut order: SmallVec<[GestureId; 4]> = SmallVec::new();
        let mut by_gesture: HashMap<GestureId, SmallVec<[PointerId; 4]>> = HashMap::new();
        for &pid in ids {
            let Some(claimers) = self.claims.get(&pid) else {
                continue;
            };
            for &g in claimers {
                if !by_gesture.contains_key(&g) {
                    order.push(g);
                }
                by_gesture.entry(g).or_default().push(pid);
            }
        }

        for g in order {
            let Some(pids) = by_gesture.get(&g).cloned() else {
                continue;
            };
            // A gesture already terminal at dispatch time is skipped.
            if !self.is_active(g) {
                continue;
            }
            if matches!(kind, DispatchKind::Released | DispatchKind::Cancelled) {
                let recognizing = self
                    .state(g)
                    .is_some_and(GestureState::is_recognizing);
                if let Some(entry) = self.entry_mut(g) {
                    entry.core.remove_pointers(&pids);
                }
                // The gesture no longer holds these pointers.
                if recognizing {
                    for &p in &pids {
                        self.registry.release_retain(p);
                    }
                }
            }
            if let Some(request) = self.call_recognizer(g, kind, &pids) {
                self.resolve_request(g, request, cache);
            }
            // A gesture cannot keep recognizing with no pointers left; if its
            // recognizer had no verdict, the engine supplies the default one.
            if matches!(kind, DispatchKind::Released | DispatchKind::Cancelled)
                && self.state(g).is_some_and(GestureState::is_recognizing)
                && self.core(g).is_some_and(|c| c.active_pointers().is_empty())
            {
                let to = match kind {
                    DispatchKind::Released => GestureState::Ended,
                    _ => GestureState::Cancelled,
                };
                self.commit(g, to, CommitOpts::default(), cache);
            }
        }
    }

    fn tick_recognizers(&mut self, dt: f64, cache: &mut HierarchyCache) {
        let ids: Vec<GestureId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let idx = u32::try_from(idx).unwrap_or(u32::MAX);
                slot.entry
                    .as_ref()
                    .map(|_| GestureId::new(idx, slot.generation))
            })
            .collect();
        for g in ids {
            if !self.is_active(g) {
                continue;
            }
            if let Some(request) = self.call_recognizer_tick(g, dt) {
                self.resolve_request(g, request, cache);
            }
        }
    }

    fn end_frame(&mut self) {
        let queue = core::mem::take(&mut self.reset_queue);
        for g in queue {
            for list in self.claims.values_mut() {
                list.retain(|x| *x != g);
            }
            self.claims.retain(|_, list| !list.is_empty());
            if let Some(entry) = self.entry_mut(g) {
                entry.core.reset();
                if let Some(recognizer) = entry.recognizer.as_mut() {
                    recognizer.reset();
                }
            }
        }
        for slot in &mut self.slots {
            if let Some(entry) = slot.entry.as_mut() {
                entry.core.settle_count_state();
            }
        }
        self.exclusivity.tick();
        self.registry.end_frame();
    }

    // ---- transition arbitration ----

    /// Resolves a recognizer's transition request into an authoritative
    /// state change, applying fail-chains and prevention.
    fn resolve_request(
        &mut self,
        g: GestureId,
        requested: GestureState,
        cache: &mut HierarchyCache,
    ) {
        let Some(current) = self.state(g) else { return };
        // A continuous gesture re-requesting Began is reporting another
        // delta.
        let requested = if requested == GestureState::Began && current.is_recognizing() {
            GestureState::Changed
        } else {
            requested
        };
        if !current.can_transition(requested) {
            log::warn!("gesture {g:?} requested illegal transition {current:?} -> {requested:?}");
            if current.can_transition(GestureState::Failed) {
                self.commit(g, GestureState::Failed, CommitOpts::default(), cache);
            }
            return;
        }
        match requested {
            GestureState::Began | GestureState::Ended if !current.is_recognizing() => {
                self.try_begin(g, requested, cache);
            }
            _ => self.commit(g, requested, CommitOpts::default(), cache),
        }
    }

    /// The begin/recognize gate: fail-chain, owner veto, prevention scan,
    /// and the kill-list for `Possible` rivals.
    fn try_begin(&mut self, g: GestureId, target: GestureState, cache: &mut HierarchyCache) {
        if let Some(pred) = self.entry(g).and_then(|e| e.require_to_fail)
            && let Some(pred_state) = self.state(pred)
        {
            match pred_state {
                GestureState::Failed => {}
                s if s.is_recognizing()
                    || matches!(s, GestureState::Ended | GestureState::Cancelled) =>
                {
                    if let Some(entry) = self.entry_mut(g) {
                        entry.core.set_pending_state(None);
                    }
                    self.commit(g, GestureState::Failed, CommitOpts::default(), cache);
                    return;
                }
                _ => {
                    // Predecessor undecided: keep exactly one deferred target.
                    if let Some(entry) = self.entry_mut(g) {
                        entry.core.set_pending_state(Some(target));
                    }
                    return;
                }
            }
        }

        let vetoed = self
            .entry(g)
            .and_then(|e| e.delegate.as_ref())
            .is_some_and(|d| !d.should_begin(g));
        if vetoed {
            self.commit(g, GestureState::Failed, CommitOpts::default(), cache);
            return;
        }

        let Some(node) = self.node_of(g) else { return };
        let union = cache.candidate_union(&self.scene, &self.on_node, node);
        let mut kill: SmallVec<[GestureId; 4]> = SmallVec::new();
        for &s in &union {
            if s == g || !self.is_active(s) {
                continue;
            }
            let Some(s_state) = self.state(s) else { continue };
            // An already-started gesture always wins over one attempting to
            // start.
            if s_state.is_recognizing() && self.can_prevent(s, g) {
                self.commit(g, GestureState::Failed, CommitOpts::default(), cache);
                return;
            }
            if s_state == GestureState::Possible && self.can_prevent(g, s) {
                kill.push(s);
            }
        }

        self.commit(g, target, CommitOpts::default(), cache);
        // Recognizing eagerly eliminates rivals that were merely sampling.
        for s in kill {
            if self.state(s) == Some(GestureState::Possible) {
                self.commit(s, GestureState::Failed, CommitOpts::default(), cache);
            }
        }
    }

    /// Applies a validated transition: retention effects, the state change
    /// itself, fail-chain notifications, and reset queueing.
    fn commit(
        &mut self,
        g: GestureId,
        to: GestureState,
        opts: CommitOpts,
        cache: &mut HierarchyCache,
    ) {
        let Some(entry) = self.entry(g) else { return };
        let from = entry.core.state();
        if !from.can_transition(to) {
            log::warn!("dropping invalid commit {from:?} -> {to:?} for gesture {g:?}");
            return;
        }
        let active: SmallVec<[PointerId; 8]> = entry.core.active_pointers().into();

        if to == GestureState::Began {
            for &p in &active {
                self.registry.retain(p);
            }
        } else if from.is_recognizing() && !to.is_recognizing() {
            for &p in &active {
                let remaining = self.registry.release_retain(p);
                if remaining == Some(0) && to == GestureState::Cancelled && opts.cancel_retained {
                    self.handle.cancel(p, opts.return_pointers);
                }
            }
        }

        if to.is_terminal() {
            if let Some(entry) = self.entry_mut(g) {
                entry.core.set_pending_state(None);
            }
            if !self.reset_queue.contains(&g) {
                self.reset_queue.push(g);
            }
        }
        if let Some(entry) = self.entry_mut(g) {
            entry.core.set_state(to);
        }

        match to {
            GestureState::Failed => {
                // Dependents whose deferred transition was waiting on this
                // failure may proceed now.
                for d in self.dependents_of(g) {
                    let pending = self.entry(d).and_then(|e| e.core.pending_state());
                    let Some(pending) = pending else { continue };
                    if let Some(entry) = self.entry_mut(d) {
                        entry.core.set_pending_state(None);
                    }
                    if self.state(d) == Some(GestureState::Possible) {
                        self.resolve_request(d, pending, cache);
                    }
                }
            }
            GestureState::Began | GestureState::Ended | GestureState::Cancelled => {
                // The predecessor succeeded (or was cancelled): dependents
                // still sampling are out of luck.
                for d in self.dependents_of(g) {
                    if let Some(entry) = self.entry_mut(d) {
                        entry.core.set_pending_state(None);
                    }
                    if self.state(d) == Some(GestureState::Possible) {
                        self.commit(d, GestureState::Failed, CommitOpts::default(), cache);
                    }
                }
            }
            _ => {}
        }
    }

    fn dependents_of(&self, g: GestureId) -> SmallVec<[GestureId; 4]> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let entry = slot.entry.as_ref()?;
                let idx = u32::try_from(idx).unwrap_or(u32::MAX);
                (entry.require_to_fail == Some(g)).then(|| GestureId::new(idx, slot.generation))
            })
            .collect()
    }

    // ---- rules ----

    /// Default prevention rule: `s` prevents `g` unless they are friendly or
    /// either side's delegate allows simultaneous recognition.
    fn can_prevent(&self, s: GestureId, g: GestureId) -> bool {
        if self.are_friendly(s, g) {
            return false;
        }
        let s_allows = self
            .entry(s)
            .and_then(|e| e.delegate.as_ref())
            .is_some_and(|d| d.should_recognize_simultaneously(s, g));
        let g_allows = self
            .entry(g)
            .and_then(|e| e.delegate.as_ref())
            .is_some_and(|d| d.should_recognize_simultaneously(g, s));
        !(s_allows || g_allows)
    }

    fn should_receive(&self, g: GestureId, pointer: PointerId) -> bool {
        let Some(delegate) = self.entry(g).and_then(|e| e.delegate.as_ref()) else {
            return true;
        };
        self.registry
            .get(pointer)
            .is_some_and(|p| delegate.should_receive_pointer(g, p))
    }

    /// Enabled, alive, and not yet terminal this epoch.
    fn is_active(&self, id: GestureId) -> bool {
        self.entry(id)
            .is_some_and(|e| e.enabled && !e.core.state().is_terminal())
    }

    // ---- plumbing ----

    fn pair(a: GestureId, b: GestureId) -> (GestureId, GestureId) {
        if a <= b { (a, b) } else { (b, a) }
    }

    fn entry(&self, id: GestureId) -> Option<&GestureEntry> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: GestureId) -> Option<&mut GestureEntry> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.entry.as_mut()
    }

    fn call_recognizer(
        &mut self,
        g: GestureId,
        kind: DispatchKind,
        changed: &[PointerId],
    ) -> Option<GestureState> {
        let mut recognizer = self.entry_mut(g).and_then(|e| e.recognizer.take())?;
        let request = match self.entry(g) {
            Some(entry) => {
                let cx = RecognizerCx {
                    core: &entry.core,
                    pointers: &self.registry,
                    changed,
                };
                match kind {
                    DispatchKind::Pressed => recognizer.pointers_pressed(cx),
                    DispatchKind::Updated => recognizer.pointers_updated(cx),
                    DispatchKind::Released => recognizer.pointers_released(cx),
                    DispatchKind::Cancelled => recognizer.pointers_cancelled(cx),
                }
            }
            None => None,
        };
        if let Some(entry) = self.entry_mut(g) {
            entry.recognizer = Some(recognizer);
        }
        request
    }

    fn call_recognizer_tick(&mut self, g: GestureId, dt: f64) -> Option<GestureState> {
        let mut recognizer = self.entry_mut(g).and_then(|e| e.recognizer.take())?;
        let request = match self.entry(g) {
            Some(entry) => recognizer.update(&entry.core, dt),
            None => None,
        };
        if let Some(entry) = self.entry_mut(g) {
            entry.recognizer = Some(recognizer);
        }
        request
    }
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("gestures", &self.slots.iter().filter(|s| s.entry.is_some()).count())
            .field("scene_nodes", &self.scene.len())
            .field("pointers", &self.registry.len())
            .field("claims", &self.claims.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactile_gesture::{Tap, Transform};

    fn engine_with_root() -> (Engine, NodeId) {
        let mut engine = Engine::without_resolver();
        let root = engine.scene_mut().insert_root();
        (engine, root)
    }

    #[test]
    fn gesture_ids_go_stale_on_removal() {
        let (mut engine, root) = engine_with_root();
        let old = engine
            .add_gesture(root, GestureCore::new(), Tap::new())
            .unwrap();
        engine.remove_gesture(old);
        assert_eq!(engine.state(old), None);

        let fresh = engine
            .add_gesture(root, GestureCore::new(), Tap::new())
            .unwrap();
        // The slot is reused under a new generation.
        assert_ne!(old, fresh);
        assert_eq!(engine.state(old), None);
        assert_eq!(engine.state(fresh), Some(GestureState::Idle));
    }

    #[test]
    fn adding_to_a_dead_node_errors() {
        let (mut engine, root) = engine_with_root();
        let node = engine.scene_mut().insert(root).unwrap();
        engine.scene_mut().remove(node);
        assert!(engine.add_gesture(node, GestureCore::new(), Tap::new()).is_err());
    }

    #[test]
    fn friendships_are_symmetric_and_dissolvable() {
        let (mut engine, root) = engine_with_root();
        let a = engine.add_gesture(root, GestureCore::new(), Tap::new()).unwrap();
        let b = engine.add_gesture(root, GestureCore::new(), Tap::new()).unwrap();

        engine.add_friendship(a, b);
        assert!(engine.are_friendly(a, b));
        assert!(engine.are_friendly(b, a));

        engine.remove_friendship(b, a);
        assert!(!engine.are_friendly(a, b));

        // Self-friendship is meaningless and refused.
        engine.add_friendship(a, a);
        assert!(!engine.are_friendly(a, a));
    }

    #[test]
    fn recognizer_downcast_finds_the_concrete_type() {
        let (mut engine, root) = engine_with_root();
        let pan = engine
            .add_gesture(root, GestureCore::new(), Transform::pan())
            .unwrap();
        assert!(engine.recognizer_as::<Transform>(pan).is_some());
        assert!(engine.recognizer_as::<Tap>(pan).is_none());
    }

    #[test]
    fn cancelling_an_idle_gesture_is_a_noop() {
        let (mut engine, root) = engine_with_root();
        let tap = engine.add_gesture(root, GestureCore::new(), Tap::new()).unwrap();
        engine.cancel_gesture(tap, true, true);
        assert_eq!(engine.state(tap), Some(GestureState::Idle));
    }
}
