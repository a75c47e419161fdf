// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The capability object a gesture's owner can attach to bend arbitration.

use tactile_pointer::Pointer;
use tactile_scene::Hit;

use crate::GestureId;

/// Optional per-gesture overrides for the default arbitration rules.
///
/// Every method has a permissive default; attach a delegate only to the
/// gestures whose behavior you need to bend. The engine consults delegates
/// at three points:
///
/// - [`should_receive_pointer`](Self::should_receive_pointer) filters which
///   pressed pointers the gesture claims at all (limit a recognizer to
///   stylus-tagged pointers, for example).
/// - [`should_begin`](Self::should_begin) is the final veto right before the
///   gesture would enter `Began` or recognize.
/// - [`should_recognize_simultaneously`](Self::should_recognize_simultaneously)
///   waives prevention between this gesture and another; either side's
///   delegate saying `true` is enough.
pub trait GestureDelegate {
    /// Whether the gesture should claim `pointer` at press time.
    fn should_receive_pointer(&self, gesture: GestureId, pointer: &Pointer<Hit>) -> bool {
        let _ = (gesture, pointer);
        true
    }

    /// Final veto before the gesture begins or recognizes.
    fn should_begin(&self, gesture: GestureId) -> bool {
        let _ = gesture;
        true
    }

    /// Whether `gesture` may recognize at the same time as `other`.
    fn should_recognize_simultaneously(&self, gesture: GestureId, other: GestureId) -> bool {
        let _ = (gesture, other);
        false
    }
}
