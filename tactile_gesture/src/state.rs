// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recognition state graph and pointer-count threshold classification.

/// Recognition state of a gesture.
///
/// The legal edges are:
///
/// - `Idle → Possible` (the gesture received its first pointers)
/// - `Idle | Possible → Began` (a continuous gesture commits)
/// - `Idle | Possible → Ended` (a one-shot gesture recognizes immediately)
/// - `Began → Changed`, `Changed → Changed` (continuous updates)
/// - `Began | Changed → Ended | Cancelled`
/// - any non-terminal state `→ Failed | Cancelled`
/// - `Ended | Cancelled | Failed → Idle` (epoch reset)
///
/// `Ended` doubles as "recognized" for one-shot gestures; there is no
/// separate recognized state. Anything else is illegal and is substituted by
/// the arbitration engine rather than applied.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GestureState {
    /// Not tracking anything; the initial state and the reset target.
    #[default]
    Idle,
    /// Sampling pointers without having committed to recognition.
    Possible,
    /// A continuous gesture committed and reported its first delta.
    Began,
    /// A continuous gesture reported a subsequent delta.
    Changed,
    /// Recognition succeeded; terminal for this epoch.
    Ended,
    /// Recognition was aborted from outside; terminal for this epoch.
    Cancelled,
    /// Recognition failed; terminal for this epoch.
    Failed,
}

impl GestureState {
    /// Returns `true` for the three terminal states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled | Self::Failed)
    }

    /// Returns `true` while the gesture is actively recognizing
    /// (`Began` or `Changed`).
    #[must_use]
    pub fn is_recognizing(self) -> bool {
        matches!(self, Self::Began | Self::Changed)
    }

    /// Returns `true` if the edge `self → to` is legal.
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        use GestureState::*;
        match (self, to) {
            (Idle, Possible) => true,
            (Idle | Possible, Began | Ended) => true,
            (Began | Changed, Changed) => true,
            (Began | Changed, Ended) => true,
            (Idle | Possible | Began | Changed, Failed | Cancelled) => true,
            (Ended | Cancelled | Failed, Idle) => true,
            _ => false,
        }
    }
}

/// Where a gesture's pointer count sits relative to its configured limits.
///
/// The `Passed…` variants are edge-triggered: they are reported only on the
/// exact update where the count crossed a configured boundary (in either
/// direction), letting gestures react to the crossing itself distinctly from
/// steady-state range membership.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PointerCountState {
    /// The count satisfies both limits.
    InRange,
    /// The count is below the configured minimum.
    TooFew,
    /// The count is above the configured maximum.
    TooMany,
    /// This update crossed the minimum boundary.
    PassedMinThreshold,
    /// This update crossed the maximum boundary.
    PassedMaxThreshold,
    /// This update crossed both boundaries at once.
    PassedMinMaxThreshold,
}

impl PointerCountState {
    /// Classifies a pointer-count delta against `min`/`max` limits.
    ///
    /// A limit of `0` means unbounded on that side. `before` and `after` are
    /// the counts on either side of the delta; passing the same value twice
    /// yields the steady-state classification.
    #[must_use]
    pub fn classify(min: u32, max: u32, before: u32, after: u32) -> Self {
        let crossed_min = min > 0 && (before < min) != (after < min);
        let crossed_max = max > 0 && (before > max) != (after > max);
        match (crossed_min, crossed_max) {
            (true, true) => Self::PassedMinMaxThreshold,
            (true, false) => Self::PassedMinThreshold,
            (false, true) => Self::PassedMaxThreshold,
            (false, false) => {
                if min > 0 && after < min {
                    Self::TooFew
                } else if max > 0 && after > max {
                    Self::TooMany
                } else {
                    Self::InRange
                }
            }
        }
    }

    /// Returns `true` if this update crossed the minimum boundary.
    #[must_use]
    pub fn passed_min(self) -> bool {
        matches!(self, Self::PassedMinThreshold | Self::PassedMinMaxThreshold)
    }

    /// Returns `true` if this update crossed the maximum boundary.
    #[must_use]
    pub fn passed_max(self) -> bool {
        matches!(self, Self::PassedMaxThreshold | Self::PassedMinMaxThreshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GestureState::*;

    #[test]
    fn terminal_and_recognizing_partitions() {
        for state in [Idle, Possible, Began, Changed, Ended, Cancelled, Failed] {
            assert_eq!(
                state.is_terminal(),
                matches!(state, Ended | Cancelled | Failed),
                "terminal classification for {state:?}"
            );
        }
        assert!(Began.is_recognizing());
        assert!(Changed.is_recognizing());
        assert!(!Possible.is_recognizing());
    }

    #[test]
    fn legal_edges() {
        assert!(Idle.can_transition(Possible));
        assert!(Possible.can_transition(Began));
        assert!(Possible.can_transition(Ended));
        assert!(Began.can_transition(Changed));
        assert!(Changed.can_transition(Changed));
        assert!(Changed.can_transition(Ended));
        assert!(Began.can_transition(Cancelled));
        assert!(Possible.can_transition(Failed));
        assert!(Failed.can_transition(Idle));
        assert!(Ended.can_transition(Idle));
    }

    #[test]
    fn illegal_edges() {
        assert!(!Idle.can_transition(Changed));
        assert!(!Possible.can_transition(Changed));
        assert!(!Changed.can_transition(Began));
        assert!(!Ended.can_transition(Began));
        assert!(!Failed.can_transition(Possible));
        assert!(!Ended.can_transition(Failed));
        assert!(!Idle.can_transition(Idle));
    }

    #[test]
    fn count_classification_steady_states() {
        // min 2, max 3.
        assert_eq!(
            PointerCountState::classify(2, 3, 1, 1),
            PointerCountState::TooFew
        );
        assert_eq!(
            PointerCountState::classify(2, 3, 2, 2),
            PointerCountState::InRange
        );
        assert_eq!(
            PointerCountState::classify(2, 3, 4, 4),
            PointerCountState::TooMany
        );
        // Unbounded on both sides.
        assert_eq!(
            PointerCountState::classify(0, 0, 0, 0),
            PointerCountState::InRange
        );
    }

    #[test]
    fn count_classification_crossings() {
        // Crossing up through min.
        assert_eq!(
            PointerCountState::classify(2, 0, 1, 2),
            PointerCountState::PassedMinThreshold
        );
        // Crossing down through min.
        assert_eq!(
            PointerCountState::classify(2, 0, 2, 1),
            PointerCountState::PassedMinThreshold
        );
        // Crossing up through max.
        assert_eq!(
            PointerCountState::classify(0, 2, 2, 3),
            PointerCountState::PassedMaxThreshold
        );
        // One delta across both boundaries.
        assert_eq!(
            PointerCountState::classify(2, 3, 0, 5),
            PointerCountState::PassedMinMaxThreshold
        );
    }

    #[test]
    fn crossing_is_edge_triggered() {
        // The frame after a crossing reports steady state again.
        let crossing = PointerCountState::classify(2, 0, 1, 2);
        assert!(crossing.passed_min());
        let settled = PointerCountState::classify(2, 0, 2, 2);
        assert_eq!(settled, PointerCountState::InRange);
    }
}
