// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-gesture bookkeeping shared by every recognizer.

use smallvec::SmallVec;
use tactile_pointer::PointerId;

use crate::listeners::{ListenerId, Listeners};
use crate::state::{GestureState, PointerCountState};

/// A state transition that was committed on a gesture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StateChange {
    /// The state before the transition.
    pub previous: GestureState,
    /// The state after the transition.
    pub current: GestureState,
}

/// The state every gesture carries regardless of what it recognizes.
///
/// Holds the recognition state, the pointer-count limits and their
/// edge-triggered classification, the insertion-ordered set of claimed
/// pointers (index 0 is the primary pointer used for position reporting),
/// the deferred transition slot used by fail-chains, and the state-change
/// listener list.
///
/// `GestureCore` is pure bookkeeping. It does not decide transitions; the
/// arbitration engine commits states through [`set_state`](Self::set_state)
/// after resolving conflicts, and recognizers only read from the core.
#[derive(Debug, Default)]
pub struct GestureCore {
    state: GestureState,
    previous_state: GestureState,
    min_pointers: u32,
    max_pointers: u32,
    active_pointers: SmallVec<[PointerId; 4]>,
    count_state: Option<PointerCountState>,
    pending: Option<GestureState>,
    state_listeners: Listeners<StateChange>,
}

impl GestureCore {
    /// Creates a core with unbounded pointer limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a core with the given pointer-count limits (`0` = unbounded).
    #[must_use]
    pub fn with_limits(min_pointers: u32, max_pointers: u32) -> Self {
        Self {
            min_pointers,
            max_pointers,
            ..Self::default()
        }
    }

    /// Current recognition state.
    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// The state before the most recent transition.
    #[must_use]
    pub fn previous_state(&self) -> GestureState {
        self.previous_state
    }

    /// Commits a state transition and notifies listeners.
    ///
    /// Only the arbitration engine calls this; it has already validated the
    /// edge and resolved conflicts by the time it commits.
    pub fn set_state(&mut self, to: GestureState) {
        self.previous_state = self.state;
        self.state = to;
        self.state_listeners.emit(&StateChange {
            previous: self.previous_state,
            current: to,
        });
    }

    /// Registers a state-change listener.
    pub fn on_state_changed(&mut self, listener: impl FnMut(&StateChange) + 'static) -> ListenerId {
        self.state_listeners.add(listener)
    }

    /// Removes a previously registered state-change listener.
    pub fn remove_state_listener(&mut self, id: ListenerId) -> bool {
        self.state_listeners.remove(id)
    }

    /// Registers a listener fired only when the gesture is cancelled.
    ///
    /// Sugar over [`on_state_changed`](Self::on_state_changed); remove it
    /// with [`remove_state_listener`](Self::remove_state_listener).
    pub fn on_cancelled(&mut self, mut listener: impl FnMut() + 'static) -> ListenerId {
        self.state_listeners.add(move |change| {
            if change.current == GestureState::Cancelled {
                listener();
            }
        })
    }

    /// Minimum pointers for recognition (`0` = unbounded).
    #[must_use]
    pub fn min_pointers(&self) -> u32 {
        self.min_pointers
    }

    /// Maximum pointers for recognition (`0` = unbounded).
    #[must_use]
    pub fn max_pointers(&self) -> u32 {
        self.max_pointers
    }

    /// The claimed pointers in claim order; index 0 is the primary pointer.
    #[must_use]
    pub fn active_pointers(&self) -> &[PointerId] {
        &self.active_pointers
    }

    /// The primary pointer, if any is claimed.
    #[must_use]
    pub fn primary_pointer(&self) -> Option<PointerId> {
        self.active_pointers.first().copied()
    }

    /// Number of claimed pointers.
    #[must_use]
    pub fn pointer_count(&self) -> u32 {
        u32::try_from(self.active_pointers.len()).unwrap_or(u32::MAX)
    }

    /// The edge-triggered pointer-count classification of the most recent
    /// add/remove delta, or the steady-state classification if the count has
    /// not changed since.
    #[must_use]
    pub fn pointer_count_state(&self) -> PointerCountState {
        self.count_state.unwrap_or_else(|| self.steady_state())
    }

    /// Returns `true` if the current count satisfies both limits.
    #[must_use]
    pub fn pointers_in_range(&self) -> bool {
        let count = self.pointer_count();
        (self.min_pointers == 0 || count >= self.min_pointers)
            && (self.max_pointers == 0 || count <= self.max_pointers)
    }

    /// Claims pointers, appended in order after the existing ones.
    ///
    /// Already claimed ids are skipped. Recomputes the count classification
    /// edge-triggered against the count before the delta.
    pub fn add_pointers(&mut self, ids: &[PointerId]) {
        let before = self.pointer_count();
        for &id in ids {
            if !self.active_pointers.contains(&id) {
                self.active_pointers.push(id);
            }
        }
        let after = self.pointer_count();
        self.count_state = Some(PointerCountState::classify(
            self.min_pointers,
            self.max_pointers,
            before,
            after,
        ));
    }

    /// Releases claimed pointers.
    ///
    /// Unclaimed ids are skipped. Recomputes the count classification
    /// edge-triggered against the count before the delta.
    pub fn remove_pointers(&mut self, ids: &[PointerId]) {
        let before = self.pointer_count();
        self.active_pointers.retain(|id| !ids.contains(id));
        let after = self.pointer_count();
        self.count_state = Some(PointerCountState::classify(
            self.min_pointers,
            self.max_pointers,
            before,
            after,
        ));
    }

    /// Decays an edge-triggered `Passed…` classification to the steady
    /// state of the current count.
    ///
    /// The engine calls this at frame end so crossings are observable only
    /// on the exact frame they happen.
    pub fn settle_count_state(&mut self) {
        self.count_state = Some(self.steady_state());
    }

    /// The deferred transition stored while a fail-chain predecessor is
    /// undecided.
    #[must_use]
    pub fn pending_state(&self) -> Option<GestureState> {
        self.pending
    }

    /// Stores or clears the deferred fail-chain transition.
    pub fn set_pending_state(&mut self, pending: Option<GestureState>) {
        self.pending = pending;
    }

    /// Clears all per-epoch bookkeeping and forces the state back to `Idle`.
    ///
    /// Listeners are not notified; the reset is the epoch boundary, not a
    /// transition within one.
    pub fn reset(&mut self) {
        self.active_pointers.clear();
        self.pending = None;
        self.previous_state = self.state;
        self.state = GestureState::Idle;
        self.count_state = None;
    }

    fn steady_state(&self) -> PointerCountState {
        let count = self.pointer_count();
        PointerCountState::classify(self.min_pointers, self.max_pointers, count, count)
    }
}
