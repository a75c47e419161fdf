// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit resolution: the interface to the external hit-test oracle.
//!
//! This crate does not perform hit testing. The owning application supplies a
//! [`HitResolver`] (backed by a box tree, a 3D ray cast, a UI canvas walk, or
//! anything else); arbitration calls it once per pointer at press time and
//! caches the returned [`Hit`] on the pointer for the duration of that press.

use kurbo::Point;

use crate::NodeId;

/// Identifier of the layer a hit landed on.
///
/// Layers are an external concept (camera, UI canvas, fullscreen overlay).
/// The arbitration core only carries the id through so consumers can tell
/// hits apart.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LayerId(pub u32);

/// The projection space a hit was resolved in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HitKind {
    /// Scene content hit through a world-space projection.
    World,
    /// UI canvas content.
    Ui,
    /// Screen-space content (no projection).
    Screen,
}

/// The result of resolving a pointer position against scene content.
///
/// Immutable for the life of a press: arbitration resolves it exactly once,
/// on the press frame, and reuses it for every later batch that pointer
/// appears in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// The topmost node under the pointer.
    pub node: NodeId,
    /// The layer that produced the hit.
    pub layer: LayerId,
    /// The projection space the hit was resolved in.
    pub kind: HitKind,
    /// Distance from the projection origin; `0.0` for flat layers.
    pub distance: f64,
}

/// External hit-test oracle.
///
/// Implementations are expected to be cheap enough to call once per newly
/// pressed pointer. Returning `None` means the pointer landed on nothing that
/// participates in gesture recognition; such pointers are tracked but claimed
/// by no gesture.
pub trait HitResolver {
    /// Resolves the topmost target under `position`, if any.
    fn resolve(&self, position: Point) -> Option<Hit>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SceneTree;

    struct FixedResolver(Option<Hit>);

    impl HitResolver for FixedResolver {
        fn resolve(&self, _position: Point) -> Option<Hit> {
            self.0
        }
    }

    #[test]
    fn resolver_is_object_safe() {
        let mut tree = SceneTree::new();
        let node = tree.insert_root();
        let hit = Hit {
            node,
            layer: LayerId(0),
            kind: HitKind::World,
            distance: 1.5,
        };
        let resolver: &dyn HitResolver = &FixedResolver(Some(hit));
        assert_eq!(resolver.resolve(Point::new(1.0, 2.0)), Some(hit));
    }

    #[test]
    fn missing_hits_are_representable() {
        let resolver = FixedResolver(None);
        assert!(resolver.resolve(Point::ZERO).is_none());
    }
}
