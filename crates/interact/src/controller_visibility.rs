//! Hide a controller's visuals while its hand is holding something.

use crate::interactor::InteractorRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xrscene_core::{Hand, InteractorId};
use xrscene_scene::{NodeId, SceneGraph, SceneResult};

/// Configuration for [`ControllerVisibility`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Also hide while merely hovering a grabbable.
    pub hide_on_hover: bool,
}

/// Shows or hides every renderer under a controller's visual root.
#[derive(Debug)]
pub struct ControllerVisibility {
    config: VisibilityConfig,
    hand: Hand,
    renderers: Vec<NodeId>,
    interactors: Vec<InteractorId>,
    visible: bool,
}

impl ControllerVisibility {
    /// Collect the renderers under `visual_root` and the interactors owned by `hand`.
    ///
    /// Without a root the behavior logs a warning and never changes anything.
    pub fn new(
        scene: &SceneGraph,
        registry: &InteractorRegistry,
        config: VisibilityConfig,
        visual_root: Option<NodeId>,
        hand: Hand,
    ) -> SceneResult<Self> {
        let renderers = match visual_root.filter(|id| scene.contains(*id)) {
            Some(root) => {
                let mut found = Vec::new();
                for id in scene.descendants(root)? {
                    if scene.renderer(id)?.is_some() {
                        found.push(id);
                    }
                }
                found
            }
            None => {
                warn!("ControllerVisibility ({hand:?}): assign the controller visual root");
                Vec::new()
            }
        };
        let interactors = registry.owned_by(hand);
        debug!(
            ?hand,
            interactors = interactors.len(),
            renderers = renderers.len(),
            "controller visibility ready"
        );

        Ok(Self {
            config,
            hand,
            renderers,
            interactors,
            visible: true,
        })
    }

    /// Per-frame update. Returns the new visibility when it changed.
    pub fn update(
        &mut self,
        scene: &mut SceneGraph,
        registry: &InteractorRegistry,
    ) -> SceneResult<Option<bool>> {
        if self.renderers.is_empty() || self.interactors.is_empty() {
            return Ok(None);
        }

        let view: &SceneGraph = scene;
        let selecting = self
            .interactors
            .iter()
            .any(|id| registry.is_selecting_grabbable(*id, view));
        let hovering = self.config.hide_on_hover
            && self
                .interactors
                .iter()
                .any(|id| registry.is_hovering_grabbable(*id, view));
        let should_be_visible = !(selecting || hovering);

        if should_be_visible == self.visible {
            return Ok(None);
        }
        for id in &self.renderers {
            if scene.contains(*id) {
                scene.set_renderer_enabled(*id, should_be_visible)?;
            }
        }
        self.visible = should_be_visible;
        debug!(hand = ?self.hand, visible = self.visible, "controller visuals");
        Ok(Some(self.visible))
    }

    /// Whether the controller visuals are shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Renderers managed by this behavior.
    pub fn renderers(&self) -> &[NodeId] {
        &self.renderers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use xrscene_core::InteractorKind;
    use xrscene_physics::Aabb;
    use xrscene_scene::Transform;

    struct Rig {
        scene: SceneGraph,
        registry: InteractorRegistry,
        shell: NodeId,
        trigger: NodeId,
        mug: NodeId,
        direct: InteractorId,
    }

    fn rig() -> Rig {
        let mut scene = SceneGraph::new();
        let root = scene.spawn("right_controller_visual", Transform::default());
        let shell = scene.spawn_child(root, "shell", Transform::default()).unwrap();
        let trigger = scene.spawn_child(shell, "trigger", Transform::default()).unwrap();
        let bounds = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(0.05));
        scene.set_renderer(shell, bounds).unwrap();
        scene.set_renderer(trigger, bounds).unwrap();

        let mug = scene.spawn("mug", Transform::default());
        scene.set_grabbable(mug, true).unwrap();

        let mut registry = InteractorRegistry::new();
        let direct = registry.register("right_direct", Hand::Right, InteractorKind::Direct, Vec3::ZERO);
        registry.register("left_direct", Hand::Left, InteractorKind::Direct, Vec3::ZERO);

        Rig {
            scene,
            registry,
            shell,
            trigger,
            mug,
            direct,
        }
    }

    fn enabled(scene: &SceneGraph, id: NodeId) -> bool {
        scene.renderer(id).unwrap().unwrap().enabled
    }

    #[test]
    fn hides_while_selecting_grabbable() {
        let mut rig = rig();
        let root = rig.scene.find_by_name("right_controller_visual");
        let mut vis = ControllerVisibility::new(
            &rig.scene,
            &rig.registry,
            VisibilityConfig::default(),
            root,
            Hand::Right,
        )
        .unwrap();
        assert_eq!(vis.renderers().len(), 2);

        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), None);

        rig.registry.select_enter(rig.direct, rig.mug);
        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), Some(false));
        assert!(!enabled(&rig.scene, rig.shell));
        assert!(!enabled(&rig.scene, rig.trigger));
        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), None);

        rig.registry.select_exit(rig.direct, rig.mug);
        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), Some(true));
        assert!(enabled(&rig.scene, rig.shell));
    }

    #[test]
    fn hover_only_hides_when_configured() {
        let mut rig = rig();
        let root = rig.scene.find_by_name("right_controller_visual");
        rig.registry.hover_enter(rig.direct, rig.mug);

        let mut plain = ControllerVisibility::new(
            &rig.scene,
            &rig.registry,
            VisibilityConfig::default(),
            root,
            Hand::Right,
        )
        .unwrap();
        assert_eq!(plain.update(&mut rig.scene, &rig.registry).unwrap(), None);

        let mut hover = ControllerVisibility::new(
            &rig.scene,
            &rig.registry,
            VisibilityConfig { hide_on_hover: true },
            root,
            Hand::Right,
        )
        .unwrap();
        assert_eq!(hover.update(&mut rig.scene, &rig.registry).unwrap(), Some(false));
    }

    #[test]
    fn other_hand_does_not_hide() {
        let mut rig = rig();
        let root = rig.scene.find_by_name("right_controller_visual");
        let left = rig.registry.find_by_name("left_direct").unwrap();
        let mut vis = ControllerVisibility::new(
            &rig.scene,
            &rig.registry,
            VisibilityConfig::default(),
            root,
            Hand::Right,
        )
        .unwrap();
        rig.registry.select_enter(left, rig.mug);
        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), None);
        assert!(vis.is_visible());
    }

    #[test]
    fn despawned_renderers_are_skipped() {
        let mut rig = rig();
        let root = rig.scene.find_by_name("right_controller_visual");
        let mut vis = ControllerVisibility::new(
            &rig.scene,
            &rig.registry,
            VisibilityConfig::default(),
            root,
            Hand::Right,
        )
        .unwrap();
        rig.scene.despawn(rig.trigger).unwrap();
        rig.registry.select_enter(rig.direct, rig.mug);
        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), Some(false));
        assert!(!enabled(&rig.scene, rig.shell));
    }

    #[test]
    fn missing_root_is_inert() {
        let mut rig = rig();
        let mut vis = ControllerVisibility::new(
            &rig.scene,
            &rig.registry,
            VisibilityConfig::default(),
            None,
            Hand::Right,
        )
        .unwrap();
        rig.registry.select_enter(rig.direct, rig.mug);
        assert_eq!(vis.update(&mut rig.scene, &rig.registry).unwrap(), None);
    }
}
