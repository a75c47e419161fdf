// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Long-press recognition: hold still long enough and the gesture recognizes.
//!
//! The recognizer accumulates frame time while in `Possible` with its
//! pointer count in range and recognizes one-shot (`Possible → Ended`) once
//! the hold duration is reached. Releasing early or straying past the
//! movement limit fails the epoch instead.

use kurbo::Point;

use crate::core::GestureCore;
use crate::recognizer::{Recognizer, RecognizerCx};
use crate::state::GestureState;

const DEFAULT_DURATION: f64 = 1.0;
const DEFAULT_DISTANCE_LIMIT: f64 = 24.0;

/// Recognizes a press held in place for a configured duration.
#[derive(Debug)]
pub struct LongPress {
    duration: f64,
    distance_limit: f64,
    elapsed: f64,
    press_position: Option<Point>,
}

impl Default for LongPress {
    fn default() -> Self {
        Self::new()
    }
}

impl LongPress {
    /// Creates a recognizer with the default one-second hold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            distance_limit: DEFAULT_DISTANCE_LIMIT,
            elapsed: 0.0,
            press_position: None,
        }
    }

    /// Sets the hold duration in seconds.
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    /// Sets how far, in pixels, the primary pointer may stray during the
    /// hold.
    #[must_use]
    pub fn with_distance_limit(mut self, pixels: f64) -> Self {
        self.distance_limit = pixels;
        self
    }
}

impl Recognizer for LongPress {
    fn pointers_pressed(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        if self.press_position.is_none() {
            self.press_position = cx
                .core
                .primary_pointer()
                .and_then(|id| cx.pointers.position(id));
            self.elapsed = 0.0;
        }
        None
    }

    fn pointers_updated(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        let origin = self.press_position?;
        let current = cx
            .core
            .primary_pointer()
            .and_then(|id| cx.pointers.position(id))?;
        if (current - origin).hypot() > self.distance_limit {
            return Some(GestureState::Failed);
        }
        None
    }

    fn pointers_released(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        // Losing required pointers before the hold completed is a failure;
        // after recognition the gesture is already terminal.
        if cx.core.state() == GestureState::Possible && !cx.core.pointers_in_range() {
            return Some(GestureState::Failed);
        }
        None
    }

    fn pointers_cancelled(&mut self, _cx: RecognizerCx<'_>) -> Option<GestureState> {
        Some(GestureState::Failed)
    }

    fn update(&mut self, core: &GestureCore, dt: f64) -> Option<GestureState> {
        if core.state() != GestureState::Possible || !core.pointers_in_range() {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            return Some(GestureState::Ended);
        }
        None
    }

    fn reset(&mut self) {
        self.elapsed = 0.0;
        self.press_position = None;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::test_support::{MapLookup, mint_ids};

    fn cx<'a>(
        core: &'a GestureCore,
        lookup: &'a MapLookup,
        changed: &'a [tactile_pointer::PointerId],
    ) -> RecognizerCx<'a> {
        RecognizerCx {
            core,
            pointers: lookup,
            changed,
        }
    }

    #[test]
    fn holding_long_enough_recognizes() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        let mut press = LongPress::new().with_duration(0.5);

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        press.pointers_pressed(cx(&core, &lookup, &ids));

        assert_eq!(press.update(&core, 0.3), None);
        assert_eq!(press.update(&core, 0.3), Some(GestureState::Ended));
    }

    #[test]
    fn releasing_early_fails() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        let mut press = LongPress::new().with_duration(0.5);

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        press.pointers_pressed(cx(&core, &lookup, &ids));
        press.update(&core, 0.2);

        core.remove_pointers(&ids);
        assert_eq!(
            press.pointers_released(cx(&core, &lookup, &ids)),
            Some(GestureState::Failed)
        );
    }

    #[test]
    fn drifting_fails_the_hold() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        let mut press = LongPress::new().with_distance_limit(5.0);

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        press.pointers_pressed(cx(&core, &lookup, &ids));

        lookup.advance(ids[0], Point::new(9.0, 0.0));
        assert_eq!(
            press.pointers_updated(cx(&core, &lookup, &ids)),
            Some(GestureState::Failed)
        );
    }

    #[test]
    fn the_clock_only_runs_while_in_range() {
        let ids = mint_ids(2);
        let mut core = GestureCore::with_limits(2, 2);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        lookup.set(ids[1], Point::ZERO, Point::ZERO);
        let mut press = LongPress::new().with_duration(0.4);

        // One of two required pointers: the clock must not run.
        core.add_pointers(&ids[..1]);
        core.set_state(GestureState::Possible);
        press.pointers_pressed(cx(&core, &lookup, &ids[..1]));
        assert_eq!(press.update(&core, 1.0), None);

        core.add_pointers(&ids[1..]);
        press.pointers_pressed(cx(&core, &lookup, &ids[1..]));
        assert_eq!(press.update(&core, 0.2), None);
        assert_eq!(press.update(&core, 0.3), Some(GestureState::Ended));
    }
}
