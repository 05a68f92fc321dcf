//! Send a grabbable back to its reference pose when it is let go.

use crate::InteractError;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xrscene_scene::{NodeId, SceneGraph, SceneResult};

/// Shortest allowed return tween, in seconds.
pub const MIN_RETURN_DURATION: f32 = 0.01;

const BEHAVIOR: &str = "ReturnToHome";

/// Configuration for [`ReturnToHome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnConfig {
    /// Tween back instead of teleporting.
    pub smooth_return: bool,
    /// Tween length in seconds.
    pub return_duration: f32,
}

impl Default for ReturnConfig {
    fn default() -> Self {
        Self {
            smooth_return: false,
            return_duration: 0.35,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReturnTween {
    start_position: Vec3,
    start_rotation: Quat,
    t: f32,
}

/// Returns a released object to where it started.
#[derive(Debug)]
pub struct ReturnToHome {
    config: ReturnConfig,
    node: NodeId,
    home_position: Vec3,
    home_rotation: Quat,
    initial_kinematic: bool,
    tween: Option<ReturnTween>,
}

impl ReturnToHome {
    /// Capture the reference pose.
    ///
    /// The pose comes from `home` when given, otherwise from the object itself.
    /// The object must exist and carry a rigid body.
    pub fn new(
        scene: &SceneGraph,
        config: ReturnConfig,
        node: Option<NodeId>,
        home: Option<NodeId>,
    ) -> Result<Self, InteractError> {
        let node = node
            .filter(|id| scene.contains(*id))
            .ok_or(InteractError::MissingDependency {
                behavior: BEHAVIOR,
                dependency: "target object",
            })?;
        let initial_kinematic = scene
            .body(node)?
            .map(|body| body.kinematic)
            .ok_or(InteractError::MissingDependency {
                behavior: BEHAVIOR,
                dependency: "rigid body",
            })?;

        let reference = home.filter(|id| scene.contains(*id)).unwrap_or(node);
        let home_position = scene.world_position(reference)?;
        let home_rotation = scene.world_rotation(reference)?;

        Ok(Self {
            config: ReturnConfig {
                return_duration: config.return_duration.max(MIN_RETURN_DURATION),
                ..config
            },
            node,
            home_position,
            home_rotation,
            initial_kinematic,
            tween: None,
        })
    }

    /// The grab ended: stop the body and start heading home.
    pub fn on_select_exit(&mut self, scene: &mut SceneGraph) -> SceneResult<()> {
        if let Some(body) = scene.body_mut(self.node)? {
            body.zero_velocities();
            body.kinematic = true;
        }
        self.tween = None;

        if self.config.smooth_return {
            self.tween = Some(ReturnTween {
                start_position: scene.world_position(self.node)?,
                start_rotation: scene.world_rotation(self.node)?,
                t: 0.0,
            });
            debug!(node = %self.node, "returning home");
            Ok(())
        } else {
            self.finish(scene)
        }
    }

    /// Per-frame update; advances an in-flight return.
    pub fn update(&mut self, scene: &mut SceneGraph, dt: f32) -> SceneResult<()> {
        let Some(mut tween) = self.tween else {
            return Ok(());
        };
        tween.t = (tween.t + dt / self.config.return_duration).min(1.0);
        if tween.t >= 1.0 {
            self.tween = None;
            return self.finish(scene);
        }
        let position = tween.start_position.lerp(self.home_position, tween.t);
        let rotation = tween.start_rotation.slerp(self.home_rotation, tween.t);
        scene.set_world_pose(self.node, position, rotation)?;
        self.tween = Some(tween);
        Ok(())
    }

    /// Whether a tween is in flight.
    pub fn is_returning(&self) -> bool {
        self.tween.is_some()
    }

    /// Reference pose in world space.
    pub fn home_pose(&self) -> (Vec3, Quat) {
        (self.home_position, self.home_rotation)
    }

    fn finish(&mut self, scene: &mut SceneGraph) -> SceneResult<()> {
        scene.set_world_pose(self.node, self.home_position, self.home_rotation)?;
        if let Some(body) = scene.body_mut(self.node)? {
            body.kinematic = self.initial_kinematic;
        }
        debug!(node = %self.node, "back home");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrscene_physics::RigidBody;
    use xrscene_scene::Transform;

    fn scene_with_mask() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let mask = scene.spawn("oxygen_mask", Transform::new(Vec3::new(0.0, 1.0, 0.0)));
        scene.set_body(mask, RigidBody::dynamic()).unwrap();
        (scene, mask)
    }

    fn drag(scene: &mut SceneGraph, node: NodeId) {
        scene
            .set_world_pose(node, Vec3::new(2.0, 1.0, 0.0), Quat::from_rotation_y(1.0))
            .unwrap();
        scene.body_mut(node).unwrap().unwrap().linear_velocity = Vec3::new(0.0, -3.0, 0.0);
    }

    #[test]
    fn snap_return_restores_pose_and_body_mode() {
        let (mut scene, mask) = scene_with_mask();
        let mut behavior = ReturnToHome::new(&scene, ReturnConfig::default(), Some(mask), None).unwrap();
        drag(&mut scene, mask);

        behavior.on_select_exit(&mut scene).unwrap();
        assert!((scene.world_position(mask).unwrap() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        let body = scene.body(mask).unwrap().unwrap();
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert!(!body.kinematic);
        assert!(!behavior.is_returning());
    }

    #[test]
    fn smooth_return_tweens_then_restores() {
        let (mut scene, mask) = scene_with_mask();
        let config = ReturnConfig {
            smooth_return: true,
            return_duration: 0.4,
        };
        let mut behavior = ReturnToHome::new(&scene, config, Some(mask), None).unwrap();
        drag(&mut scene, mask);

        behavior.on_select_exit(&mut scene).unwrap();
        assert!(scene.body(mask).unwrap().unwrap().kinematic);

        behavior.update(&mut scene, 0.2).unwrap();
        let halfway = scene.world_position(mask).unwrap();
        assert!((halfway - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-4);
        assert!(scene.body(mask).unwrap().unwrap().kinematic);

        behavior.update(&mut scene, 0.2).unwrap();
        assert!(!behavior.is_returning());
        assert!((scene.world_position(mask).unwrap() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!(scene.world_rotation(mask).unwrap().angle_between(Quat::IDENTITY) < 1e-4);
        assert!(!scene.body(mask).unwrap().unwrap().kinematic);
    }

    #[test]
    fn new_release_restarts_the_tween() {
        let (mut scene, mask) = scene_with_mask();
        let config = ReturnConfig {
            smooth_return: true,
            return_duration: 1.0,
        };
        let mut behavior = ReturnToHome::new(&scene, config, Some(mask), None).unwrap();
        drag(&mut scene, mask);
        behavior.on_select_exit(&mut scene).unwrap();
        behavior.update(&mut scene, 0.5).unwrap();

        drag(&mut scene, mask);
        behavior.on_select_exit(&mut scene).unwrap();
        behavior.update(&mut scene, 0.5).unwrap();
        // Halfway from the fresh drag point, not three quarters of the old one.
        assert!((scene.world_position(mask).unwrap() - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn home_override_is_used() {
        let (mut scene, mask) = scene_with_mask();
        let hook = scene.spawn("hook", Transform::new(Vec3::new(0.0, 2.0, -1.0)));
        let behavior = ReturnToHome::new(&scene, ReturnConfig::default(), Some(mask), Some(hook)).unwrap();
        assert_eq!(behavior.home_pose().0, Vec3::new(0.0, 2.0, -1.0));
    }

    #[test]
    fn body_is_required() {
        let mut scene = SceneGraph::new();
        let prop = scene.spawn("prop", Transform::default());
        let err = ReturnToHome::new(&scene, ReturnConfig::default(), Some(prop), None).unwrap_err();
        assert_eq!(
            err,
            InteractError::MissingDependency {
                behavior: BEHAVIOR,
                dependency: "rigid body"
            }
        );
    }

    #[test]
    fn duration_is_floored() {
        let (scene, mask) = scene_with_mask();
        let config = ReturnConfig {
            smooth_return: true,
            return_duration: 0.0,
        };
        let behavior = ReturnToHome::new(&scene, config, Some(mask), None).unwrap();
        assert_eq!(behavior.config.return_duration, MIN_RETURN_DURATION);
    }
}
