//! Interactor registry.
//!
//! The XR runtime owns the real interactors; this registry mirrors what the
//! behaviors need from them: hand ownership, kind, attach point and the sets of
//! hovered and selected nodes. Behaviors keep [`InteractorId`] values only, so
//! an interactor removed by the host simply stops resolving.

use glam::Vec3;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use xrscene_core::{Hand, InteractorId, InteractorKind};
use xrscene_scene::{NodeId, SceneGraph};

/// Hover edge delivered to an interactable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverEvent {
    /// Who is hovering.
    pub interactor: InteractorId,
    /// What kind of interactor it is.
    pub kind: InteractorKind,
    /// World-space attach point at the moment of the edge.
    pub attach_point: Vec3,
}

/// Mirror of one runtime interactor.
#[derive(Debug, Clone)]
pub struct Interactor {
    /// Display name.
    pub name: String,
    /// Owning hand.
    pub hand: Hand,
    /// Interactor flavour.
    pub kind: InteractorKind,
    /// World-space attach point.
    pub attach_point: Vec3,
    hovered: BTreeSet<NodeId>,
    selected: BTreeSet<NodeId>,
}

impl Interactor {
    /// Nodes currently hovered.
    pub fn hovered(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.hovered.iter().copied()
    }

    /// Nodes currently selected.
    pub fn selected(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selected.iter().copied()
    }
}

/// All interactors known to the host.
#[derive(Debug, Default)]
pub struct InteractorRegistry {
    interactors: BTreeMap<InteractorId, Interactor>,
    next_id: u64,
}

impl InteractorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interactor.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        hand: Hand,
        kind: InteractorKind,
        attach_point: Vec3,
    ) -> InteractorId {
        let id = InteractorId(self.next_id);
        self.next_id += 1;
        self.interactors.insert(
            id,
            Interactor {
                name: name.into(),
                hand,
                kind,
                attach_point,
                hovered: BTreeSet::new(),
                selected: BTreeSet::new(),
            },
        );
        id
    }

    /// Remove an interactor; stored ids for it stop resolving.
    pub fn remove(&mut self, id: InteractorId) -> Option<Interactor> {
        debug!(interactor = id.0, "interactor removed");
        self.interactors.remove(&id)
    }

    /// Look up an interactor.
    pub fn get(&self, id: InteractorId) -> Option<&Interactor> {
        self.interactors.get(&id)
    }

    /// First interactor with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<InteractorId> {
        self.interactors
            .iter()
            .find(|(_, interactor)| interactor.name == name)
            .map(|(id, _)| *id)
    }

    /// Move an interactor's attach point. Returns false for unknown ids.
    pub fn set_attach_point(&mut self, id: InteractorId, point: Vec3) -> bool {
        match self.interactors.get_mut(&id) {
            Some(interactor) => {
                interactor.attach_point = point;
                true
            }
            None => false,
        }
    }

    /// Current attach point of a live interactor.
    pub fn attach_point(&self, id: InteractorId) -> Option<Vec3> {
        self.get(id).map(|interactor| interactor.attach_point)
    }

    /// Record a hover start and build the event to deliver to `target`.
    pub fn hover_enter(&mut self, id: InteractorId, target: NodeId) -> Option<HoverEvent> {
        let interactor = self.interactors.get_mut(&id)?;
        interactor.hovered.insert(target);
        Some(HoverEvent {
            interactor: id,
            kind: interactor.kind,
            attach_point: interactor.attach_point,
        })
    }

    /// Record a hover end and build the event to deliver to `target`.
    pub fn hover_exit(&mut self, id: InteractorId, target: NodeId) -> Option<HoverEvent> {
        let interactor = self.interactors.get_mut(&id)?;
        interactor.hovered.remove(&target);
        Some(HoverEvent {
            interactor: id,
            kind: interactor.kind,
            attach_point: interactor.attach_point,
        })
    }

    /// Record a selection start. Returns false for unknown ids.
    pub fn select_enter(&mut self, id: InteractorId, target: NodeId) -> bool {
        match self.interactors.get_mut(&id) {
            Some(interactor) => {
                interactor.selected.insert(target);
                true
            }
            None => false,
        }
    }

    /// Record a selection end. Returns whether the target was selected.
    pub fn select_exit(&mut self, id: InteractorId, target: NodeId) -> bool {
        self.interactors
            .get_mut(&id)
            .is_some_and(|interactor| interactor.selected.remove(&target))
    }

    /// Interactors belonging to `hand`.
    pub fn owned_by(&self, hand: Hand) -> Vec<InteractorId> {
        self.interactors
            .iter()
            .filter(|(_, interactor)| interactor.hand == hand)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Whether the interactor holds anything grabbable. Despawned targets are skipped.
    pub fn is_selecting_grabbable(&self, id: InteractorId, scene: &SceneGraph) -> bool {
        self.get(id)
            .is_some_and(|interactor| any_grabbable(interactor.selected(), scene))
    }

    /// Whether the interactor hovers anything grabbable. Despawned targets are skipped.
    pub fn is_hovering_grabbable(&self, id: InteractorId, scene: &SceneGraph) -> bool {
        self.get(id)
            .is_some_and(|interactor| any_grabbable(interactor.hovered(), scene))
    }
}

fn any_grabbable(mut nodes: impl Iterator<Item = NodeId>, scene: &SceneGraph) -> bool {
    nodes.any(|node| scene.is_grabbable_in_parent(node).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrscene_scene::Transform;

    #[test]
    fn hover_events_carry_kind_and_attach_point() {
        let mut registry = InteractorRegistry::new();
        let mut scene = SceneGraph::new();
        let button = scene.spawn("button", Transform::default());
        let finger = registry.register("finger", Hand::Right, InteractorKind::Poke, Vec3::X);

        let event = registry.hover_enter(finger, button).unwrap();
        assert_eq!(event.kind, InteractorKind::Poke);
        assert_eq!(event.attach_point, Vec3::X);
        assert_eq!(registry.get(finger).unwrap().hovered().count(), 1);

        registry.hover_exit(finger, button).unwrap();
        assert_eq!(registry.get(finger).unwrap().hovered().count(), 0);
    }

    #[test]
    fn removed_interactors_stop_resolving() {
        let mut registry = InteractorRegistry::new();
        let ray = registry.register("ray", Hand::Left, InteractorKind::Ray, Vec3::ZERO);
        registry.remove(ray);
        assert!(registry.attach_point(ray).is_none());
        assert!(!registry.set_attach_point(ray, Vec3::ONE));
    }

    #[test]
    fn grabbable_selection_follows_scene_markers() {
        let mut scene = SceneGraph::new();
        let mug = scene.spawn("mug", Transform::default());
        let handle = scene.spawn_child(mug, "handle", Transform::default()).unwrap();
        let wall = scene.spawn("wall", Transform::default());
        scene.set_grabbable(mug, true).unwrap();

        let mut registry = InteractorRegistry::new();
        let hand = registry.register("direct", Hand::Left, InteractorKind::Direct, Vec3::ZERO);

        registry.select_enter(hand, wall);
        assert!(!registry.is_selecting_grabbable(hand, &scene));

        registry.select_enter(hand, handle);
        assert!(registry.is_selecting_grabbable(hand, &scene));

        scene.despawn(mug).unwrap();
        assert!(!registry.is_selecting_grabbable(hand, &scene));
    }

    #[test]
    fn owned_by_filters_hand() {
        let mut registry = InteractorRegistry::new();
        let left = registry.register("l", Hand::Left, InteractorKind::Direct, Vec3::ZERO);
        registry.register("r", Hand::Right, InteractorKind::Direct, Vec3::ZERO);
        assert_eq!(registry.owned_by(Hand::Left), vec![left]);
    }
}
