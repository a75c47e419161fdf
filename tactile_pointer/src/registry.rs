// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pointer registry: concurrent submission in, ordered frame batches out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;
use kurbo::Point;

use crate::pointer::{Buttons, Pointer, PointerId, SourceId, TagSet};

/// One frame's worth of pointer lifecycle events, in dispatch order.
///
/// Categories are dispatched in the fixed order the fields are declared in:
/// a pointer must exist before it can be pressed, be pressed before it is
/// updated as a press, and so on. A pointer id appears at most once per
/// category per frame.
#[derive(Debug, Default)]
pub struct FrameBatch {
    /// Pointers that came into existence this frame.
    pub added: Vec<PointerId>,
    /// Pointers that went down this frame.
    pub pressed: Vec<PointerId>,
    /// Pointers whose position changed this frame.
    pub updated: Vec<PointerId>,
    /// Pointers that went up this frame.
    pub released: Vec<PointerId>,
    /// Pointers leaving the system normally this frame.
    pub removed: Vec<PointerId>,
    /// Pointers leaving the system abnormally this frame.
    pub cancelled: Vec<PointerId>,
}

impl FrameBatch {
    /// Returns `true` if no category has any entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.pressed.is_empty()
            && self.updated.is_empty()
            && self.released.is_empty()
            && self.removed.is_empty()
            && self.cancelled.is_empty()
    }
}

#[derive(Debug)]
struct PendingAdd {
    id: PointerId,
    position: Point,
    source: SourceId,
    tags: TagSet,
}

/// Frame-local pending operations, filled by handles, drained by `flush`.
#[derive(Debug, Default)]
struct Pending {
    added: Vec<PendingAdd>,
    pressed: Vec<PointerId>,
    updated: Vec<(PointerId, Point)>,
    released: Vec<PointerId>,
    removed: Vec<PointerId>,
    cancelled: Vec<(PointerId, bool)>,
}

#[derive(Debug)]
struct Shared {
    next_id: AtomicU64,
    pending: Mutex<Pending>,
}

impl Shared {
    fn alloc_id(&self) -> PointerId {
        PointerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // Recover the guard if a submitter panicked; the pending sets are
        // still well-formed.
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cloneable submission surface for input sources.
///
/// All operations append to the registry's frame-local pending sets under one
/// coarse lock and return immediately; nothing is dispatched until the owner
/// calls [`PointerRegistry::flush`]. Handles may be used freely from multiple
/// threads.
#[derive(Clone, Debug)]
pub struct PointerHandle {
    shared: Arc<Shared>,
}

impl PointerHandle {
    /// Adds a new pointer at `position` and returns its id.
    ///
    /// The id is valid for same-frame follow-up operations (press, update)
    /// even before the add is flushed.
    pub fn add(&self, position: Point) -> PointerId {
        self.add_from(position, SourceId::default(), TagSet::new())
    }

    /// Adds a new pointer with an explicit source and tag set.
    pub fn add_from(&self, position: Point, source: SourceId, tags: TagSet) -> PointerId {
        let id = self.shared.alloc_id();
        self.shared.lock().added.push(PendingAdd {
            id,
            position,
            source,
            tags,
        });
        id
    }

    /// Records a position update for `id`.
    pub fn update(&self, id: PointerId, position: Point) {
        self.shared.lock().updated.push((id, position));
    }

    /// Records that `id` went down.
    pub fn press(&self, id: PointerId) {
        self.shared.lock().pressed.push(id);
    }

    /// Records that `id` went up.
    pub fn release(&self, id: PointerId) {
        self.shared.lock().released.push(id);
    }

    /// Records that `id` is leaving the system normally.
    pub fn remove(&self, id: PointerId) {
        self.shared.lock().removed.push(id);
    }

    /// Records that `id` is leaving the system abnormally.
    ///
    /// With `should_return`, the registry re-synthesizes a fresh pointer (new
    /// id, same position, re-pressed if `id` was pressed) into the next
    /// frame's batch.
    pub fn cancel(&self, id: PointerId, should_return: bool) {
        self.shared.lock().cancelled.push((id, should_return));
    }
}

/// Owns committed pointers and turns pending submissions into frame batches.
///
/// `H` is the press-record payload consumers fix at press time; the registry
/// stores it opaquely and clears it on release and cancel.
#[derive(Debug)]
pub struct PointerRegistry<H> {
    shared: Arc<Shared>,
    pointers: HashMap<PointerId, Pointer<H>>,
    /// Pointers whose terminal event was dispatched this frame; destroyed at
    /// `end_frame` so every consumer can observe the terminal event first.
    dying: Vec<PointerId>,
}

impl<H> Default for PointerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PointerRegistry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                next_id: AtomicU64::new(0),
                pending: Mutex::new(Pending::default()),
            }),
            pointers: HashMap::new(),
            dying: Vec::new(),
        }
    }

    /// Returns a submission handle for input sources.
    #[must_use]
    pub fn handle(&self) -> PointerHandle {
        PointerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the pointer for `id`, if it is still alive this frame.
    #[must_use]
    pub fn get(&self, id: PointerId) -> Option<&Pointer<H>> {
        self.pointers.get(&id)
    }

    /// Iterates all live pointers.
    pub fn pointers(&self) -> impl Iterator<Item = &Pointer<H>> {
        self.pointers.values()
    }

    /// Number of live pointers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// Returns `true` if no pointers are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Stores the press record for `id`.
    ///
    /// Called by the arbitration layer on the press frame, after hit
    /// resolution. The record is cleared automatically on release and cancel.
    pub fn set_press_record(&mut self, id: PointerId, record: H) {
        match self.pointers.get_mut(&id) {
            Some(pointer) => pointer.press = Some(record),
            None => log::warn!("press record for unknown pointer {id:?}"),
        }
    }

    /// Increments the retention count of `id`.
    ///
    /// Returns `false` (with a warning) for unknown ids.
    pub fn retain(&mut self, id: PointerId) -> bool {
        match self.pointers.get_mut(&id) {
            Some(pointer) => {
                pointer.retain_count += 1;
                true
            }
            None => {
                log::warn!("retain of unknown pointer {id:?}");
                false
            }
        }
    }

    /// Decrements the retention count of `id`, returning the remaining count.
    ///
    /// Returns `None` (with a warning) for unknown ids or ids that were not
    /// retained.
    pub fn release_retain(&mut self, id: PointerId) -> Option<u32> {
        match self.pointers.get_mut(&id) {
            Some(pointer) if pointer.retain_count > 0 => {
                pointer.retain_count -= 1;
                Some(pointer.retain_count)
            }
            Some(_) => {
                log::warn!("retain release of unretained pointer {id:?}");
                None
            }
            None => {
                log::warn!("retain release of unknown pointer {id:?}");
                None
            }
        }
    }

    /// Produces this frame's batch from the pending submissions.
    ///
    /// Call once per tick. Finalizes the previous frame first (see
    /// [`end_frame`](Self::end_frame)), advances every committed pointer's
    /// previous position, then applies and categorizes the pending
    /// operations in dispatch order.
    pub fn flush(&mut self) -> FrameBatch {
        self.end_frame();

        let pending = core::mem::take(&mut *self.shared.lock());
        let mut batch = FrameBatch::default();

        for pointer in self.pointers.values_mut() {
            pointer.previous_position = pointer.position;
        }

        for add in pending.added {
            let pointer = Pointer::new(add.id, add.position, add.source, add.tags);
            self.pointers.insert(add.id, pointer);
            batch.added.push(add.id);
        }

        for id in pending.pressed {
            if batch.pressed.contains(&id) {
                log::warn!("pointer {id:?} pressed twice in one frame");
                continue;
            }
            match self.pointers.get_mut(&id) {
                Some(pointer) if pointer.pressed => {
                    log::warn!("press of already pressed pointer {id:?}");
                }
                Some(pointer) => {
                    pointer.pressed = true;
                    pointer.buttons.insert(Buttons::PRIMARY);
                    batch.pressed.push(id);
                }
                None => log::warn!("press of unknown pointer {id:?}"),
            }
        }

        for (id, position) in pending.updated {
            match self.pointers.get_mut(&id) {
                Some(pointer) => {
                    pointer.position = position;
                    // Several updates per frame coalesce into one dispatch
                    // with the final position.
                    if !batch.updated.contains(&id) {
                        batch.updated.push(id);
                    }
                }
                None => log::warn!("update of unknown pointer {id:?}"),
            }
        }

        for id in pending.released {
            if batch.released.contains(&id) {
                log::warn!("pointer {id:?} released twice in one frame");
                continue;
            }
            match self.pointers.get_mut(&id) {
                Some(pointer) if !pointer.pressed => {
                    log::warn!("release of unpressed pointer {id:?}");
                }
                Some(pointer) => {
                    pointer.pressed = false;
                    pointer.buttons.remove(Buttons::PRIMARY);
                    pointer.press = None;
                    batch.released.push(id);
                }
                None => log::warn!("release of unknown pointer {id:?}"),
            }
        }

        for id in pending.removed {
            if batch.removed.contains(&id) {
                log::warn!("pointer {id:?} removed twice in one frame");
                continue;
            }
            if self.pointers.contains_key(&id) {
                batch.removed.push(id);
                self.dying.push(id);
            } else {
                log::warn!("remove of unknown pointer {id:?}");
            }
        }

        for (id, should_return) in pending.cancelled {
            if batch.cancelled.contains(&id) {
                log::warn!("pointer {id:?} cancelled twice in one frame");
                continue;
            }
            let Some(pointer) = self.pointers.get_mut(&id) else {
                log::warn!("cancel of unknown pointer {id:?}");
                continue;
            };
            let was_pressed = pointer.pressed;
            pointer.pressed = false;
            pointer.press = None;
            batch.cancelled.push(id);
            self.dying.push(id);

            if should_return {
                let position = pointer.position;
                let source = pointer.source;
                let tags = pointer.tags.clone();
                let new_id = self.shared.alloc_id();
                let mut pending = self.shared.lock();
                pending.added.push(PendingAdd {
                    id: new_id,
                    position,
                    source,
                    tags,
                });
                if was_pressed {
                    pending.pressed.push(new_id);
                }
            }
        }

        batch
    }

    /// Destroys pointers whose terminal event was dispatched this frame.
    ///
    /// Safe to call any number of times; [`flush`](Self::flush) also calls it
    /// before starting the next frame.
    pub fn end_frame(&mut self) {
        for id in self.dying.drain(..) {
            self.pointers.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PointerRegistry<u32> {
        PointerRegistry::new()
    }

    #[test]
    fn add_and_press_within_one_frame() {
        let mut reg = registry();
        let handle = reg.handle();

        let id = handle.add(Point::new(1.0, 2.0));
        handle.press(id);

        let batch = reg.flush();
        assert_eq!(batch.added, [id]);
        assert_eq!(batch.pressed, [id]);
        assert!(reg.get(id).unwrap().is_pressed());
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut reg = registry();
        let handle = reg.handle();

        let a = handle.add(Point::ZERO);
        let b = handle.add(Point::ZERO);
        assert!(b > a);

        reg.flush();
        handle.remove(a);
        reg.flush();
        reg.end_frame();

        let c = handle.add(Point::ZERO);
        assert!(c > b);
    }

    #[test]
    fn previous_position_advances_at_flush() {
        let mut reg = registry();
        let handle = reg.handle();

        let id = handle.add(Point::new(0.0, 0.0));
        reg.flush();

        handle.update(id, Point::new(5.0, 0.0));
        reg.flush();
        let p = reg.get(id).unwrap();
        assert_eq!(p.previous_position(), Point::new(0.0, 0.0));
        assert_eq!(p.position(), Point::new(5.0, 0.0));

        // A frame with no updates still advances previous.
        reg.flush();
        let p = reg.get(id).unwrap();
        assert_eq!(p.previous_position(), Point::new(5.0, 0.0));
    }

    #[test]
    fn updates_coalesce_to_one_dispatch() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::ZERO);
        reg.flush();

        handle.update(id, Point::new(1.0, 0.0));
        handle.update(id, Point::new(2.0, 0.0));
        let batch = reg.flush();

        assert_eq!(batch.updated, [id]);
        assert_eq!(reg.get(id).unwrap().position(), Point::new(2.0, 0.0));
    }

    #[test]
    fn duplicate_press_is_dropped() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::ZERO);
        handle.press(id);
        handle.press(id);

        let batch = reg.flush();
        assert_eq!(batch.pressed, [id]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut reg = registry();
        let handle = reg.handle();
        let ghost = PointerId(999);

        handle.update(ghost, Point::ZERO);
        handle.press(ghost);
        handle.release(ghost);
        handle.remove(ghost);
        handle.cancel(ghost, true);

        let batch = reg.flush();
        assert!(batch.is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn release_clears_press_record() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::ZERO);
        handle.press(id);
        reg.flush();
        reg.set_press_record(id, 42);
        assert_eq!(reg.get(id).unwrap().press_record(), Some(&42));

        handle.release(id);
        let batch = reg.flush();
        assert_eq!(batch.released, [id]);
        let p = reg.get(id).unwrap();
        assert!(!p.is_pressed());
        assert!(p.press_record().is_none());
    }

    #[test]
    fn removed_pointer_survives_until_end_frame() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::ZERO);
        reg.flush();

        handle.remove(id);
        let batch = reg.flush();
        assert_eq!(batch.removed, [id]);
        // Still observable while the frame's consumers run.
        assert!(reg.get(id).is_some());

        reg.end_frame();
        assert!(reg.get(id).is_none());
    }

    #[test]
    fn cancel_with_return_resynthesizes_next_frame() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::new(7.0, 8.0));
        handle.press(id);
        reg.flush();

        handle.cancel(id, true);
        let batch = reg.flush();
        assert_eq!(batch.cancelled, [id]);

        let batch = reg.flush();
        assert_eq!(batch.added.len(), 1);
        assert_eq!(batch.pressed, batch.added);
        let returned = batch.added[0];
        assert_ne!(returned, id);
        let p = reg.get(returned).unwrap();
        assert_eq!(p.position(), Point::new(7.0, 8.0));
        assert!(p.is_pressed());
    }

    #[test]
    fn cancel_without_return_just_dies() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::ZERO);
        handle.press(id);
        reg.flush();

        handle.cancel(id, false);
        let batch = reg.flush();
        assert_eq!(batch.cancelled, [id]);

        let batch = reg.flush();
        assert!(batch.is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn retention_counts() {
        let mut reg = registry();
        let handle = reg.handle();
        let id = handle.add(Point::ZERO);
        reg.flush();

        assert!(reg.retain(id));
        assert!(reg.retain(id));
        assert_eq!(reg.get(id).unwrap().retain_count(), 2);
        assert_eq!(reg.release_retain(id), Some(1));
        assert_eq!(reg.release_retain(id), Some(0));
        assert_eq!(reg.release_retain(id), None);
    }

    #[test]
    fn submissions_from_multiple_threads_land_in_one_batch() {
        let mut reg = registry();
        let handle = reg.handle();

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    let id = handle.add(Point::new(f64::from(i), 0.0));
                    handle.press(id);
                    id
                })
            })
            .collect();
        let mut ids: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        let mut batch = reg.flush();
        ids.sort();
        batch.added.sort();
        batch.pressed.sort();
        assert_eq!(batch.added, ids);
        assert_eq!(batch.pressed, ids);
    }
}
