// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer identity and per-pointer state.

use kurbo::{Point, Vec2};

/// Identifier for a pointer.
///
/// Monotonically increasing and never reused within the lifetime of the
/// registry that issued it, so a stale id can never alias a newer contact.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PointerId(pub(crate) u64);

impl PointerId {
    /// Returns the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Identifier of the input source a pointer belongs to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct SourceId(pub u32);

bitflags::bitflags! {
    /// Button state of a pointer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        /// Primary button (left mouse button, touch contact, pen tip).
        const PRIMARY   = 0b0000_0001;
        /// Secondary button (right mouse button, pen barrel).
        const SECONDARY = 0b0000_0010;
        /// Tertiary button (middle mouse button).
        const TERTIARY  = 0b0000_0100;
        /// Fourth button (back).
        const BUTTON_4  = 0b0000_1000;
        /// Fifth button (forward).
        const BUTTON_5  = 0b0001_0000;
    }
}

/// A small ordered set of string tags attached to a pointer.
///
/// Tags describe where a contact came from ("touch", "mouse", "pen") or any
/// application-specific trait recognizers may want to filter on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tag set from an iterator of tags. Duplicates are dropped.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for tag in tags {
            set.add(tag);
        }
        set
    }

    /// Adds a tag. Returns `true` if it was not already present.
    pub fn add(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.contains(&tag) {
            false
        } else {
            self.tags.push(tag);
            true
        }
    }

    /// Removes a tag. Returns `true` if it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Returns `true` if the tag is present.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns `true` if no tags are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates the tags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

/// A tracked pointer: one touch contact, mouse cursor, or pen.
///
/// The press record `H` is an opaque payload the consumer fixes at press time
/// (the arbitration layer stores the resolved hit there); the registry clears
/// it again on release and cancel.
#[derive(Debug)]
pub struct Pointer<H> {
    pub(crate) id: PointerId,
    pub(crate) position: Point,
    pub(crate) previous_position: Point,
    pub(crate) buttons: Buttons,
    pub(crate) tags: TagSet,
    pub(crate) source: SourceId,
    pub(crate) pressed: bool,
    pub(crate) press: Option<H>,
    pub(crate) retain_count: u32,
}

impl<H> Pointer<H> {
    pub(crate) fn new(id: PointerId, position: Point, source: SourceId, tags: TagSet) -> Self {
        Self {
            id,
            position,
            previous_position: position,
            buttons: Buttons::empty(),
            tags,
            source,
            pressed: false,
            press: None,
            retain_count: 0,
        }
    }

    /// The pointer's id.
    #[must_use]
    pub fn id(&self) -> PointerId {
        self.id
    }

    /// Current position in screen coordinates.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Position at the start of the current frame.
    #[must_use]
    pub fn previous_position(&self) -> Point {
        self.previous_position
    }

    /// Movement since the start of the current frame.
    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.position - self.previous_position
    }

    /// Current button state.
    #[must_use]
    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    /// Tags attached to this pointer.
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// The input source that owns this pointer.
    #[must_use]
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Returns `true` between the press and release (or cancel) events.
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// The press record fixed at press time, if the pointer is pressed and a
    /// consumer stored one.
    #[must_use]
    pub fn press_record(&self) -> Option<&H> {
        self.press.as_ref()
    }

    /// Number of outstanding retains on this pointer.
    #[must_use]
    pub fn retain_count(&self) -> u32 {
        self.retain_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_set_dedups_and_preserves_order() {
        let mut tags = TagSet::from_tags(["touch", "stylus", "touch"]);
        assert_eq!(tags.iter().collect::<Vec<_>>(), ["touch", "stylus"]);

        assert!(!tags.add("stylus"));
        assert!(tags.remove("touch"));
        assert!(!tags.remove("touch"));
        assert!(tags.contains("stylus"));
    }

    #[test]
    fn new_pointer_has_coincident_positions() {
        let p: Pointer<()> = Pointer::new(
            PointerId(7),
            Point::new(3.0, 4.0),
            SourceId(0),
            TagSet::new(),
        );
        assert_eq!(p.position(), p.previous_position());
        assert_eq!(p.delta(), Vec2::ZERO);
        assert!(!p.is_pressed());
        assert!(p.press_record().is_none());
    }
}
