// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tap recognition: a time-boxed press and release within a movement limit.
//!
//! A tap recognizes one-shot (`Possible → Ended`) the moment the last
//! pointer is released, provided the press stayed within
//! [`Tap::with_distance_limit`] of where it started and the whole sequence
//! fit inside [`Tap::with_time_limit`]. With
//! [`Tap::with_taps_required`]`(n)`, the recognizer stays in `Possible`
//! between releases and only recognizes on the `n`-th complete tap; the time
//! limit then also bounds the gap between consecutive taps, since the clock
//! restarts on every press.
//!
//! Time is measured from the frame ticks the engine feeds to
//! [`Recognizer::update`]; there is no timer mechanism underneath.

use kurbo::Point;

use crate::core::GestureCore;
use crate::recognizer::{Recognizer, RecognizerCx};
use crate::state::GestureState;

const DEFAULT_TIME_LIMIT: f64 = 0.5;
const DEFAULT_DISTANCE_LIMIT: f64 = 24.0;

/// Recognizes single and multi-taps.
#[derive(Debug)]
pub struct Tap {
    time_limit: f64,
    distance_limit: f64,
    taps_required: u32,
    elapsed: f64,
    taps_done: u32,
    press_position: Option<Point>,
}

impl Default for Tap {
    fn default() -> Self {
        Self::new()
    }
}

impl Tap {
    /// Creates a single-tap recognizer with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            distance_limit: DEFAULT_DISTANCE_LIMIT,
            taps_required: 1,
            elapsed: 0.0,
            taps_done: 0,
            press_position: None,
        }
    }

    /// Sets the number of complete taps required to recognize.
    #[must_use]
    pub fn with_taps_required(mut self, taps: u32) -> Self {
        self.taps_required = taps.max(1);
        self
    }

    /// Sets the time budget, in seconds, restarted on every press.
    #[must_use]
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = seconds;
        self
    }

    /// Sets how far, in pixels, the primary pointer may stray from its press
    /// position.
    #[must_use]
    pub fn with_distance_limit(mut self, pixels: f64) -> Self {
        self.distance_limit = pixels;
        self
    }
}

impl Recognizer for Tap {
    fn pointers_pressed(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        self.elapsed = 0.0;
        if self.press_position.is_none() {
            self.press_position = cx
                .core
                .primary_pointer()
                .and_then(|id| cx.pointers.position(id));
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
        if !cx.core.active_pointers().is_empty() {
            return None;
        }
        if self.elapsed > self.time_limit {
            return Some(GestureState::Failed);
        }
        self.taps_done += 1;
        if self.taps_done >= self.taps_required {
            Some(GestureState::Ended)
        } else {
            // Await the next press of the sequence; the primary of the next
            // tap restarts the movement origin.
            self.press_position = None;
            None
        }
    }

    fn pointers_cancelled(&mut self, _cx: RecognizerCx<'_>) -> Option<GestureState> {
        Some(GestureState::Failed)
    }

    fn update(&mut self, core: &GestureCore, dt: f64) -> Option<GestureState> {
        if core.state() != GestureState::Possible {
            return None;
        }
        self.elapsed += dt;
        if self.elapsed > self.time_limit {
            return Some(GestureState::Failed);
        }
        None
    }

    fn reset(&mut self) {
        self.elapsed = 0.0;
        self.taps_done = 0;
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
    fn quick_release_recognizes() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::new(5.0, 5.0), Point::new(5.0, 5.0));
        let mut tap = Tap::new();

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        assert_eq!(tap.pointers_pressed(cx(&core, &lookup, &ids)), None);
        assert_eq!(tap.update(&core, 0.1), None);

        core.remove_pointers(&ids);
        assert_eq!(
            tap.pointers_released(cx(&core, &lookup, &ids)),
            Some(GestureState::Ended)
        );
    }

    #[test]
    fn holding_too_long_fails() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        let mut tap = Tap::new().with_time_limit(0.3);

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        tap.pointers_pressed(cx(&core, &lookup, &ids));

        assert_eq!(tap.update(&core, 0.2), None);
        assert_eq!(tap.update(&core, 0.2), Some(GestureState::Failed));
    }

    #[test]
    fn straying_past_the_distance_limit_fails() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        let mut tap = Tap::new().with_distance_limit(10.0);

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        tap.pointers_pressed(cx(&core, &lookup, &ids));

        lookup.advance(ids[0], Point::new(8.0, 0.0));
        assert_eq!(tap.pointers_updated(cx(&core, &lookup, &ids)), None);
        lookup.advance(ids[0], Point::new(15.0, 0.0));
        assert_eq!(
            tap.pointers_updated(cx(&core, &lookup, &ids)),
            Some(GestureState::Failed)
        );
    }

    #[test]
    fn double_tap_waits_for_the_second_release() {
        let ids = mint_ids(2);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        lookup.set(ids[1], Point::ZERO, Point::ZERO);
        let mut tap = Tap::new().with_taps_required(2);

        // First tap: press and release, no recognition yet.
        core.add_pointers(&ids[..1]);
        core.set_state(GestureState::Possible);
        tap.pointers_pressed(cx(&core, &lookup, &ids[..1]));
        core.remove_pointers(&ids[..1]);
        assert_eq!(tap.pointers_released(cx(&core, &lookup, &ids[..1])), None);

        // Second tap recognizes.
        core.add_pointers(&ids[1..]);
        tap.pointers_pressed(cx(&core, &lookup, &ids[1..]));
        core.remove_pointers(&ids[1..]);
        assert_eq!(
            tap.pointers_released(cx(&core, &lookup, &ids[1..])),
            Some(GestureState::Ended)
        );
    }

    #[test]
    fn cancelled_pointer_fails_the_tap() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let lookup = MapLookup::default();
        let mut tap = Tap::new();

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        core.remove_pointers(&ids);
        assert_eq!(
            tap.pointers_cancelled(cx(&core, &lookup, &ids)),
            Some(GestureState::Failed)
        );
    }

    #[test]
    fn reset_restores_a_fresh_sequence() {
        let ids = mint_ids(1);
        let mut core = GestureCore::with_limits(1, 1);
        let mut lookup = MapLookup::default();
        lookup.set(ids[0], Point::ZERO, Point::ZERO);
        let mut tap = Tap::new().with_taps_required(2);

        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        tap.pointers_pressed(cx(&core, &lookup, &ids));
        core.remove_pointers(&ids);
        tap.pointers_released(cx(&core, &lookup, &ids));

        tap.reset();
        core.reset();

        // After reset a single release is again only the first of two taps.
        core.add_pointers(&ids);
        core.set_state(GestureState::Possible);
        tap.pointers_pressed(cx(&core, &lookup, &ids));
        core.remove_pointers(&ids);
        assert_eq!(tap.pointers_released(cx(&core, &lookup, &ids)), None);
    }
}
