//! Poke button with depth-limited travel.
//!
//! The visual follows the poking fingertip along a single travel axis, clamped
//! to `[0, max_travel]`. Reaching the limit raises [`ButtonEvent::Pressed`]
//! once per contact cycle; the cycle ends with exactly one
//! [`ButtonEvent::Released`], whether that comes from the snap-back or from
//! the contact leaving.
//!
//! ```text
//! Idle --contact_start--> Following --limit--> Frozen (require_release_to_reset)
//!   ^                        |   \--limit--> Following (keeps tracking)
//!   +------contact_end-------+-----------------+
//! ```

use crate::interactor::{HoverEvent, InteractorRegistry};
use crate::schedule::{Delay, Pending};
use crate::InteractError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xrscene_core::{InteractorId, InteractorKind};
use xrscene_scene::{NodeId, SceneGraph, SceneResult};

/// Smallest travel the button will ever allow.
pub const MIN_TRAVEL: f32 = 1e-4;
/// Slack when deciding the limit has been reached.
pub const LIMIT_EPSILON: f32 = 1e-5;
/// Extent used when the visual has neither mesh nor renderer bounds.
pub const FALLBACK_EXTENT: f32 = 0.1;

const BEHAVIOR: &str = "DepthLimitedPushButton";

/// Tuning for a [`DepthLimitedPushButton`]. Fixed after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Push direction in the axis-space frame.
    pub axis: [f32; 3],
    /// Fraction of the visual's extent along the axis that the button may travel.
    pub depth_fraction: f32,
    /// Floor pull-backs at home before the limit clamp. Travel stays within
    /// `[0, max_travel]` either way.
    pub one_direction_only: bool,
    /// Exponential easing rate back to home, per second.
    pub return_speed: f32,
    /// Jump back to home on the tick after the limit is reached.
    pub snap_back_on_limit: bool,
    /// After the limit, ignore the finger until the contact ends.
    pub require_release_to_reset: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            axis: [0.0, 1.0, 0.0],
            depth_fraction: 0.25,
            one_direction_only: true,
            return_speed: 12.0,
            snap_back_on_limit: true,
            require_release_to_reset: true,
        }
    }
}

/// Edge notifications raised by the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonEvent {
    /// Travel limit reached; at most once per cycle.
    Pressed,
    /// Cycle finished; at most once per cycle.
    Released,
}

/// Coarse state for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    /// No contact is being followed; the visual eases home.
    Idle,
    /// The visual tracks the active contact.
    Following,
    /// Limit reached; waiting for the contact to end.
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonAction {
    SnapBack,
}

/// Depth-limited push button driven by hover edges and per-frame ticks.
#[derive(Debug)]
pub struct DepthLimitedPushButton {
    config: ButtonConfig,
    visual: NodeId,
    parent: NodeId,
    home: Vec3,
    /// Unit travel axis in the parent's frame.
    axis: Vec3,
    max_travel: f32,

    active: Option<InteractorId>,
    following: bool,
    frozen_until_release: bool,
    pressed_fired: bool,
    release_fired: bool,
    world_offset: Vec3,

    pending: Pending<ButtonAction>,
    events: Vec<ButtonEvent>,
}

impl DepthLimitedPushButton {
    /// Build a button around `visual`.
    ///
    /// `axis_space` is the frame `config.axis` is expressed in and defaults to
    /// the visual itself. Fails with [`InteractError::MissingDependency`] when
    /// the visual is unset, gone, or has no parent.
    pub fn new(
        scene: &SceneGraph,
        config: ButtonConfig,
        visual: Option<NodeId>,
        axis_space: Option<NodeId>,
    ) -> Result<Self, InteractError> {
        let visual = visual
            .filter(|id| scene.contains(*id))
            .ok_or(InteractError::MissingDependency {
                behavior: BEHAVIOR,
                dependency: "visual target",
            })?;
        let parent = scene
            .parent(visual)?
            .ok_or(InteractError::MissingDependency {
                behavior: BEHAVIOR,
                dependency: "visual parent",
            })?;
        let axis_space = axis_space.filter(|id| scene.contains(*id)).unwrap_or(visual);

        let raw_axis = Vec3::from(config.axis).try_normalize().unwrap_or_else(|| {
            warn!("{BEHAVIOR}: zero push axis, using +Y");
            Vec3::Y
        });
        let axis_world = scene.transform_direction(axis_space, raw_axis)?;
        let axis = scene
            .inverse_transform_direction(parent, axis_world)?
            .normalize();

        let extent = estimate_extent(scene, visual, axis_world)?;
        let max_travel = (config.depth_fraction * extent).max(MIN_TRAVEL);
        let home = scene.local_position(visual)?;

        debug!(%visual, ?axis, extent, max_travel, "push button ready");

        Ok(Self {
            config,
            visual,
            parent,
            home,
            axis,
            max_travel,
            active: None,
            following: false,
            frozen_until_release: false,
            pressed_fired: false,
            release_fired: false,
            world_offset: Vec3::ZERO,
            pending: Pending::new(),
            events: Vec::new(),
        })
    }

    /// A contact started hovering the button.
    ///
    /// Only poke interactors are followed, and only one at a time.
    pub fn contact_start(&mut self, scene: &SceneGraph, event: &HoverEvent) -> SceneResult<()> {
        if self.frozen_until_release {
            debug!(interactor = event.interactor.0, "ignoring contact while frozen");
            return Ok(());
        }
        if event.kind != InteractorKind::Poke {
            return Ok(());
        }
        if let Some(active) = self.active {
            if active != event.interactor {
                debug!(interactor = event.interactor.0, "ignoring contact, button already tracked");
            }
            return Ok(());
        }

        // A snap-back left over from the previous cycle belongs to that cycle.
        let visual_world = if self.pending.cancel().is_some() {
            scene.world_matrix(self.parent)?.transform_point3(self.home)
        } else {
            scene.world_position(self.visual)?
        };
        self.active = Some(event.interactor);
        self.following = true;
        self.pressed_fired = false;
        self.release_fired = false;
        self.world_offset = visual_world - event.attach_point;
        Ok(())
    }

    /// A contact stopped hovering the button.
    pub fn contact_end(&mut self, interactor: InteractorId) {
        if self.active != Some(interactor) {
            return;
        }
        self.active = None;
        self.following = false;
        self.fire_release();
        self.frozen_until_release = false;
    }

    /// Per-frame update.
    pub fn update(
        &mut self,
        scene: &mut SceneGraph,
        interactors: &InteractorRegistry,
        dt: f32,
    ) -> SceneResult<()> {
        if let Some(ButtonAction::SnapBack) = self.pending.poll(dt) {
            scene.set_local_position(self.visual, self.home)?;
            debug!(visual = %self.visual, "snapped back");
            self.fire_release();
        }

        let sample = if self.following {
            self.active.and_then(|id| interactors.attach_point(id))
        } else {
            None
        };
        let Some(contact) = sample else {
            let current = scene.local_position(self.visual)?;
            let t = (dt * self.config.return_speed).clamp(0.0, 1.0);
            scene.set_local_position(self.visual, current.lerp(self.home, t))?;
            return Ok(());
        };
        if self.frozen_until_release {
            return Ok(());
        }

        let desired = scene.inverse_transform_point(self.parent, contact + self.world_offset)?;
        let along = (desired - self.home).dot(self.axis);
        let clamped = self.clamp_travel(along);
        scene.set_local_position(self.visual, self.home + self.axis * clamped)?;

        if clamped >= self.max_travel - LIMIT_EPSILON {
            if !self.pressed_fired {
                self.pressed_fired = true;
                self.emit(ButtonEvent::Pressed);
            }
            if self.config.snap_back_on_limit {
                self.pending.schedule(ButtonAction::SnapBack, Delay::NextTick);
            }
            if self.config.require_release_to_reset {
                self.frozen_until_release = true;
                self.following = false;
            }
        }
        Ok(())
    }

    /// Clamp a signed displacement along the axis to the allowed travel.
    pub fn clamp_travel(&self, along: f32) -> f32 {
        let along = if self.config.one_direction_only {
            along.max(0.0)
        } else {
            along
        };
        along.clamp(0.0, self.max_travel)
    }

    /// Take the events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<ButtonEvent> {
        std::mem::take(&mut self.events)
    }

    /// Coarse state.
    pub fn phase(&self) -> ButtonPhase {
        if self.frozen_until_release {
            ButtonPhase::Frozen
        } else if self.following {
            ButtonPhase::Following
        } else {
            ButtonPhase::Idle
        }
    }

    /// Contact currently being followed.
    pub fn active_contact(&self) -> Option<InteractorId> {
        self.active
    }

    /// Whether the button waits for the contact to end before re-arming.
    pub fn is_frozen(&self) -> bool {
        self.frozen_until_release
    }

    /// Whether the visual is tracking a contact.
    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Whether the press edge fired this cycle.
    pub fn pressed_fired(&self) -> bool {
        self.pressed_fired
    }

    /// Whether the release edge fired this cycle.
    pub fn release_fired(&self) -> bool {
        self.release_fired
    }

    /// Maximum travel along the axis, in parent units.
    pub fn max_travel(&self) -> f32 {
        self.max_travel
    }

    /// Unit travel axis in the parent's frame.
    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    /// Rest position of the visual in the parent's frame.
    pub fn home(&self) -> Vec3 {
        self.home
    }

    /// The moving visual.
    pub fn visual(&self) -> NodeId {
        self.visual
    }

    /// Configuration the button was built with.
    pub fn config(&self) -> &ButtonConfig {
        &self.config
    }

    fn fire_release(&mut self) {
        if !self.release_fired {
            self.release_fired = true;
            self.emit(ButtonEvent::Released);
        }
    }

    fn emit(&mut self, event: ButtonEvent) {
        debug!(visual = %self.visual, ?event, "button event");
        self.events.push(event);
    }
}

/// Size of the visual projected onto `axis_world`.
///
/// Prefers local mesh bounds scaled into world units, then renderer bounds,
/// then [`FALLBACK_EXTENT`].
fn estimate_extent(scene: &SceneGraph, visual: NodeId, axis_world: Vec3) -> SceneResult<f32> {
    let axis_abs = axis_world.normalize_or_zero().abs();
    let extent = if let Some(mesh) = scene.mesh_bounds(visual)? {
        (mesh.size() * scene.lossy_scale(visual)?.abs()).dot(axis_abs)
    } else if let Some(renderer) = scene.renderer(visual)? {
        renderer.bounds.extent_along(axis_abs)
    } else {
        FALLBACK_EXTENT
    };
    if extent.is_finite() && extent > 0.0 {
        Ok(extent)
    } else {
        debug!(%visual, "degenerate bounds, using fallback extent");
        Ok(FALLBACK_EXTENT)
    }
}
