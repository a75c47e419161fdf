// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tactile Pointer: pointer identity, lifecycle, and per-frame batching.
//!
//! Raw input arrives asynchronously: platform callbacks may run on several
//! threads, and a single frame can see a pointer appear, press, and move
//! before anyone has looked at it. This crate serializes that into one
//! consistent, ordered [`FrameBatch`] per tick.
//!
//! - [`PointerRegistry`] owns the committed pointers and produces the batch.
//! - [`PointerHandle`] is the cloneable submission surface input sources use
//!   from any thread. All six mutation operations append to frame-local
//!   pending sets under one coarse lock, held only for the duration of the
//!   mutation, never across dispatch.
//! - [`Pointer`] carries current/previous position, button state, a tag set,
//!   the owning source, an opaque press record fixed at press time, and the
//!   retention count continuous gestures use to keep a pointer alive past its
//!   release.
//!
//! ## Frame protocol
//!
//! [`PointerRegistry::flush`] runs once per tick: it snapshots and clears the
//! pending sets under the lock, advances every committed pointer's previous
//! position to its current one (so consumers observe a consistent
//! previous/current pair for the whole frame), applies the pending updates,
//! and returns the six disjoint id lists in their fixed dispatch order:
//! added, pressed, updated, released, removed, cancelled. Pointers that
//! reached a terminal category stay queryable until
//! [`PointerRegistry::end_frame`], so every consumer can observe the terminal
//! event first.
//!
//! Duplicate or unknown-id operations within a frame are warned through
//! [`log`] and dropped; they never fail the frame.
//!
//! ```rust
//! use kurbo::Point;
//! use tactile_pointer::PointerRegistry;
//!
//! let mut registry: PointerRegistry<()> = PointerRegistry::new();
//! let handle = registry.handle();
//!
//! // An input source adds and presses a pointer before the next tick.
//! let id = handle.add(Point::new(10.0, 20.0));
//! handle.press(id);
//!
//! let batch = registry.flush();
//! assert_eq!(batch.added, vec![id]);
//! assert_eq!(batch.pressed, vec![id]);
//! assert!(registry.get(id).is_some());
//! registry.end_frame();
//! ```

mod pointer;
mod registry;

pub use pointer::{Buttons, Pointer, PointerId, SourceId, TagSet};
pub use registry::{FrameBatch, PointerHandle, PointerRegistry};
