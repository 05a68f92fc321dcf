//! Scene files: the TOML description of nodes, devices and behavior wiring.

use anyhow::{Context, Result};
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;
use xrscene_audio::{AudioClip, AudioSettings};
use xrscene_core::{Hand, InteractorKind};
use xrscene_interact::{ButtonConfig, DualContactConfig, ReturnConfig, ToggleConfig, VisibilityConfig};
use xrscene_physics::RigidBody;
use xrscene_scene::Transform;

/// Fixed step used when neither the scene nor the CLI sets one.
pub const DEFAULT_DT: f32 = 1.0 / 72.0;

/// Runner knobs stored alongside the scene.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunSettings {
    /// Seconds per tick.
    pub dt: f32,
    /// Ticks to keep running after the script finishes.
    pub settle_ticks: u64,
    /// Mixer volumes.
    pub audio: AudioSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            settle_ticks: 60,
            audio: AudioSettings::default(),
        }
    }
}

/// Top-level scene file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneFile {
    pub settings: RunSettings,
    pub nodes: Vec<NodeDecl>,
    pub interactors: Vec<InteractorDecl>,
    pub audio: Vec<AudioSourceDecl>,
    pub animators: Vec<AnimatorDecl>,
    pub buttons: Vec<ButtonDecl>,
    pub toggles: Vec<ToggleDecl>,
    pub dual_triggers: Vec<DualTriggerDecl>,
    pub returns: Vec<ReturnDecl>,
    pub visibility: Vec<VisibilityDecl>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeDecl {
    pub name: String,
    pub parent: Option<String>,
    pub translation: [f32; 3],
    /// XYZ euler angles in degrees.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    /// Local mesh bounds size, centered on the node.
    pub mesh_size: Option<[f32; 3]>,
    /// World renderer bounds size, centered on the node's world position.
    pub renderer_size: Option<[f32; 3]>,
    pub grabbable: bool,
    pub body: Option<RigidBody>,
}

impl Default for NodeDecl {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            mesh_size: None,
            renderer_size: None,
            grabbable: false,
            body: None,
        }
    }
}

impl NodeDecl {
    /// Local transform described by this node.
    pub fn transform(&self) -> Transform {
        let [x, y, z] = self.rotation.map(f32::to_radians);
        Transform::new(Vec3::from(self.translation))
            .with_rotation(Quat::from_euler(EulerRot::XYZ, x, y, z))
            .with_scale(Vec3::from(self.scale))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractorDecl {
    pub name: String,
    pub hand: Hand,
    pub kind: InteractorKind,
    #[serde(default)]
    pub attach_point: [f32; 3],
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioSourceDecl {
    pub name: String,
    #[serde(default)]
    pub clip: Option<AudioClip>,
    #[serde(default)]
    pub looping: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimatorDecl {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ButtonDecl {
    pub name: String,
    /// Node that moves.
    pub visual: Option<String>,
    /// Node that receives hover events; defaults to the visual's parent.
    #[serde(default)]
    pub interactable: Option<String>,
    /// Frame the push axis is expressed in; defaults to the visual.
    #[serde(default)]
    pub axis_space: Option<String>,
    #[serde(default)]
    pub config: ButtonConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToggleDecl {
    pub name: String,
    #[serde(default)]
    pub animator: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    /// Buttons whose press flips this toggle.
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default)]
    pub config: ToggleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DualTriggerDecl {
    pub name: String,
    #[serde(default)]
    pub animator: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub config: DualContactConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReturnDecl {
    pub name: String,
    pub node: Option<String>,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub config: ReturnConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisibilityDecl {
    pub name: String,
    pub hand: Hand,
    #[serde(default)]
    pub visual_root: Option<String>,
    #[serde(default)]
    pub config: VisibilityConfig,
}

impl SceneFile {
    /// Load a scene from `path`. Unlike user preferences, a broken scene is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse scene {}", path.display()))
    }

    /// Parse scene TOML and sanitize the run settings.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut scene: SceneFile = toml::from_str(contents)?;
        if !(scene.settings.dt.is_finite() && scene.settings.dt > 0.0) {
            warn!(dt = scene.settings.dt, "Invalid tick length in scene. Using default");
            scene.settings.dt = DEFAULT_DT;
        }
        Ok(scene)
    }
}
