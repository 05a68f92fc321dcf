//! The live scene: host state plus every behavior wired up from a scene file.
//!
//! The stage plays the host's role. It delivers hover, select and trigger
//! events to the behaviors that listen for them, ticks every behavior once per
//! frame, routes button presses to the toggles bound to them, and records each
//! emitted event.

use crate::config::SceneFile;
use crate::script::ScriptStep;
use anyhow::{Context, Result};
use glam::Vec3;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};
use xrscene_animation::{Animator, AnimatorCommand, AnimatorSet};
use xrscene_audio::AudioMixer;
use xrscene_core::{ColliderId, InteractorId, SimTick};
use xrscene_interact::{
    AnimatorToggle, ButtonEvent, ColliderContact, ControllerVisibility, DepthLimitedPushButton,
    DualContactTrigger, InteractError, InteractorRegistry, ReturnToHome,
};
use xrscene_physics::Aabb;
use xrscene_scene::{NodeId, SceneGraph};
use xrscene_testkit::{EventRecord, EventSink};

struct ButtonSlot {
    name: String,
    interactable: NodeId,
    button: DepthLimitedPushButton,
}

struct ToggleSlot {
    name: String,
    buttons: Vec<String>,
    toggle: AnimatorToggle,
}

struct ReturnSlot {
    name: String,
    node: NodeId,
    behavior: ReturnToHome,
}

struct Named<B> {
    name: String,
    behavior: B,
}

/// Host state and behaviors for one headless session.
pub struct Stage {
    tick: SimTick,
    scene: SceneGraph,
    nodes: BTreeMap<String, NodeId>,
    interactors: InteractorRegistry,
    audio: AudioMixer,
    animators: AnimatorSet,
    buttons: Vec<ButtonSlot>,
    toggles: Vec<ToggleSlot>,
    dual_triggers: Vec<Named<DualContactTrigger>>,
    returns: Vec<ReturnSlot>,
    visibility: Vec<Named<ControllerVisibility>>,
    disabled: Vec<String>,
}

/// Keep a built behavior, or log and drop one whose references are missing.
fn admit<B>(built: Result<B, InteractError>, name: &str, disabled: &mut Vec<String>) -> Result<Option<B>> {
    match built {
        Ok(behavior) => Ok(Some(behavior)),
        Err(err @ InteractError::MissingDependency { .. }) => {
            error!(behavior = name, %err, "behavior disabled");
            disabled.push(name.to_string());
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("Failed to build {name}")),
    }
}

/// Resolve an optional by-name reference, warning when the name is unknown.
fn resolve<T>(owner: &str, what: &str, name: Option<&str>, find: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let name = name?;
    let found = find(name);
    if found.is_none() {
        warn!(owner, what, name, "unknown reference");
    }
    found
}

fn emit(sink: &mut dyn EventSink, tick: SimTick, source: &str, kind: &str, payload: Value) -> Result<()> {
    debug!(tick = tick.0, source, kind, "event");
    sink.write(&EventRecord {
        tick,
        source,
        kind,
        payload,
    })
}

fn button_kind(event: ButtonEvent) -> &'static str {
    match event {
        ButtonEvent::Pressed => "pressed",
        ButtonEvent::Released => "released",
    }
}

fn command_kind(command: &AnimatorCommand) -> &'static str {
    match command {
        AnimatorCommand::SetBool { .. } => "set_bool",
        AnimatorCommand::SetTrigger { .. } => "set_trigger",
    }
}

impl Stage {
    /// Build the scene graph, devices and behaviors described by `file`.
    ///
    /// Behaviors missing a required reference are logged once and skipped;
    /// structural problems such as an undeclared parent are errors.
    pub fn build(file: &SceneFile, mut audio: AudioMixer) -> Result<Self> {
        let mut scene = SceneGraph::new();
        let mut nodes = BTreeMap::new();
        for decl in &file.nodes {
            let id = match &decl.parent {
                Some(parent) => {
                    let parent_id = *nodes.get(parent).with_context(|| {
                        format!("Node {} names parent {parent} before it is declared", decl.name)
                    })?;
                    scene.spawn_child(parent_id, decl.name.clone(), decl.transform())?
                }
                None => scene.spawn(decl.name.clone(), decl.transform()),
            };
            if let Some(size) = decl.mesh_size {
                scene.set_mesh_bounds(id, Aabb::from_center_size(Vec3::ZERO, Vec3::from(size)))?;
            }
            if let Some(size) = decl.renderer_size {
                let center = scene.world_position(id)?;
                scene.set_renderer(id, Aabb::from_center_size(center, Vec3::from(size)))?;
            }
            if decl.grabbable {
                scene.set_grabbable(id, true)?;
            }
            if let Some(body) = decl.body {
                scene.set_body(id, body)?;
            }
            if nodes.contains_key(&decl.name) {
                warn!(name = %decl.name, "duplicate node name, keeping the first");
            } else {
                nodes.insert(decl.name.clone(), id);
            }
        }

        let mut interactors = InteractorRegistry::new();
        for decl in &file.interactors {
            interactors.register(decl.name.clone(), decl.hand, decl.kind, Vec3::from(decl.attach_point));
        }

        audio.update_settings(file.settings.audio.clone());
        for decl in &file.audio {
            let id = audio.add_source(decl.name.clone(), decl.clip.clone());
            audio.set_looping(id, decl.looping);
        }

        let mut animators = AnimatorSet::new();
        for decl in &file.animators {
            animators.add(Animator::new(decl.name.clone()));
        }

        let node = |owner: &str, what: &str, name: Option<&String>| {
            resolve(owner, what, name.map(String::as_str), |n| nodes.get(n).copied())
        };
        let mut disabled = Vec::new();

        let mut buttons = Vec::new();
        for decl in &file.buttons {
            let visual = node(&decl.name, "visual", decl.visual.as_ref());
            let axis_space = node(&decl.name, "axis_space", decl.axis_space.as_ref());
            let built = DepthLimitedPushButton::new(&scene, decl.config.clone(), visual, axis_space);
            let Some(button) = admit(built, &decl.name, &mut disabled)? else {
                continue;
            };
            let interactable = match node(&decl.name, "interactable", decl.interactable.as_ref()) {
                Some(id) => id,
                None => scene.parent(button.visual())?.unwrap_or(button.visual()),
            };
            buttons.push(ButtonSlot {
                name: decl.name.clone(),
                interactable,
                button,
            });
        }

        let mut toggles = Vec::new();
        for decl in &file.toggles {
            let animator = resolve(&decl.name, "animator", decl.animator.as_deref(), |n| {
                animators.find_by_name(n)
            });
            let source = resolve(&decl.name, "audio", decl.audio.as_deref(), |n| audio.find_by_name(n));
            if animator.is_none() {
                warn!(toggle = %decl.name, "no animator assigned, toggling does nothing");
            }
            for button in &decl.buttons {
                if !buttons.iter().any(|slot| &slot.name == button) {
                    warn!(toggle = %decl.name, button = %button, "bound button is not active");
                }
            }
            toggles.push(ToggleSlot {
                name: decl.name.clone(),
                buttons: decl.buttons.clone(),
                toggle: AnimatorToggle::new(decl.config.clone(), animator, source),
            });
        }

        let mut dual_triggers = Vec::new();
        for decl in &file.dual_triggers {
            let animator = resolve(&decl.name, "animator", decl.animator.as_deref(), |n| {
                animators.find_by_name(n)
            });
            let source = resolve(&decl.name, "audio", decl.audio.as_deref(), |n| audio.find_by_name(n));
            dual_triggers.push(Named {
                name: decl.name.clone(),
                behavior: DualContactTrigger::new(decl.config.clone(), animator, source),
            });
        }

        let mut returns = Vec::new();
        for decl in &file.returns {
            let target = node(&decl.name, "node", decl.node.as_ref());
            let home = node(&decl.name, "home", decl.home.as_ref());
            let built = ReturnToHome::new(&scene, decl.config.clone(), target, home);
            if let (Some(behavior), Some(target)) = (admit(built, &decl.name, &mut disabled)?, target) {
                returns.push(ReturnSlot {
                    name: decl.name.clone(),
                    node: target,
                    behavior,
                });
            }
        }

        let mut visibility = Vec::new();
        for decl in &file.visibility {
            let root = node(&decl.name, "visual_root", decl.visual_root.as_ref());
            let behavior =
                ControllerVisibility::new(&scene, &interactors, decl.config.clone(), root, decl.hand)
                    .with_context(|| format!("Failed to build {}", decl.name))?;
            visibility.push(Named {
                name: decl.name.clone(),
                behavior,
            });
        }

        debug!(
            nodes = scene.len(),
            buttons = buttons.len(),
            toggles = toggles.len(),
            dual_triggers = dual_triggers.len(),
            returns = returns.len(),
            visibility = visibility.len(),
            disabled = disabled.len(),
            "stage built"
        );

        Ok(Self {
            tick: SimTick::ZERO,
            scene,
            nodes,
            interactors,
            audio,
            animators,
            buttons,
            toggles,
            dual_triggers,
            returns,
            visibility,
            disabled,
        })
    }

    /// Apply this tick's host events, then advance every behavior by `dt`.
    ///
    /// Returns the number of events written to `sink`.
    pub fn tick(&mut self, steps: Vec<ScriptStep>, dt: f32, sink: &mut dyn EventSink) -> Result<usize> {
        let mut emitted = 0;
        for step in steps {
            emitted += self.apply(step, sink)?;
        }
        let tick = self.tick;

        let mut presses = Vec::new();
        for slot in &mut self.buttons {
            slot.button.update(&mut self.scene, &self.interactors, dt)?;
            for event in slot.button.drain_events() {
                let travel = (self.scene.local_position(slot.button.visual())? - slot.button.home())
                    .dot(slot.button.axis());
                emit(sink, tick, &slot.name, button_kind(event), json!({ "travel": travel }))?;
                emitted += 1;
                if event == ButtonEvent::Pressed {
                    presses.push(slot.name.clone());
                }
            }
        }
        for pressed in &presses {
            for slot in self.toggles.iter_mut().filter(|slot| slot.buttons.contains(pressed)) {
                slot.toggle.toggle(&mut self.animators, &mut self.audio);
                emit(
                    sink,
                    tick,
                    &slot.name,
                    "toggled",
                    json!({ "playing": slot.toggle.is_playing(), "button": pressed }),
                )?;
                emitted += 1;
            }
        }

        for slot in &mut self.dual_triggers {
            slot.behavior.update(&mut self.animators, dt);
        }

        for slot in &mut self.returns {
            let was_returning = slot.behavior.is_returning();
            slot.behavior.update(&mut self.scene, dt)?;
            if was_returning && !slot.behavior.is_returning() {
                emit(sink, tick, &slot.name, "returned", Value::Null)?;
                emitted += 1;
            }
        }

        for slot in &mut self.visibility {
            if let Some(visible) = slot.behavior.update(&mut self.scene, &self.interactors)? {
                emit(sink, tick, &slot.name, "visibility", json!({ "visible": visible }))?;
                emitted += 1;
            }
        }

        self.audio.update(dt);
        for (animator, command) in self.animators.drain_commands() {
            emit(sink, tick, &animator, command_kind(&command), serde_json::to_value(&command)?)?;
            emitted += 1;
        }

        self.scene.step_physics(dt)?;
        self.tick = self.tick.advance(1);
        Ok(emitted)
    }

    fn apply(&mut self, step: ScriptStep, sink: &mut dyn EventSink) -> Result<usize> {
        let tick = self.tick;
        let mut emitted = 0;
        match step {
            ScriptStep::HoverEnter { interactor, target } => {
                let (Some(id), Some(target)) = (self.interactor(&interactor), self.node(&target)) else {
                    return Ok(0);
                };
                if let Some(event) = self.interactors.hover_enter(id, target) {
                    for slot in self.buttons.iter_mut().filter(|slot| slot.interactable == target) {
                        slot.button.contact_start(&self.scene, &event)?;
                    }
                }
            }
            ScriptStep::HoverExit { interactor, target } => {
                let (Some(id), Some(target)) = (self.interactor(&interactor), self.node(&target)) else {
                    return Ok(0);
                };
                self.interactors.hover_exit(id, target);
                for slot in self.buttons.iter_mut().filter(|slot| slot.interactable == target) {
                    slot.button.contact_end(id);
                }
            }
            ScriptStep::MoveInteractor { interactor, position } => {
                if let Some(id) = self.interactor(&interactor) {
                    self.interactors.set_attach_point(id, Vec3::from(position));
                }
            }
            ScriptStep::RemoveInteractor { interactor } => {
                if let Some(id) = self.interactor(&interactor) {
                    self.interactors.remove(id);
                }
            }
            ScriptStep::SelectEnter { interactor, target } => {
                if let (Some(id), Some(target)) = (self.interactor(&interactor), self.node(&target)) {
                    self.interactors.select_enter(id, target);
                }
            }
            ScriptStep::SelectExit { interactor, target } => {
                let (Some(id), Some(target)) = (self.interactor(&interactor), self.node(&target)) else {
                    return Ok(0);
                };
                self.interactors.select_exit(id, target);
                for slot in self.returns.iter_mut().filter(|slot| slot.node == target) {
                    slot.behavior.on_select_exit(&mut self.scene)?;
                    let kind = if slot.behavior.is_returning() { "returning" } else { "returned" };
                    emit(sink, tick, &slot.name, kind, Value::Null)?;
                    emitted += 1;
                }
            }
            ScriptStep::TriggerEnter { trigger, collider, tag } => {
                let contact = ColliderContact {
                    collider: ColliderId(collider),
                    tag,
                };
                let Some(slot) = self.dual_triggers.iter_mut().find(|slot| slot.name == trigger) else {
                    warn!(trigger = %trigger, "unknown dual trigger");
                    return Ok(0);
                };
                let had_played = slot.behavior.has_played();
                slot.behavior
                    .trigger_enter(&contact, &mut self.animators, &mut self.audio);
                if !had_played && slot.behavior.has_played() {
                    emit(
                        sink,
                        tick,
                        &slot.name,
                        "sequence_started",
                        json!({ "trigger_delay": slot.behavior.pending_delay() }),
                    )?;
                    emitted += 1;
                }
            }
            ScriptStep::TriggerExit { trigger, collider, tag } => {
                let contact = ColliderContact {
                    collider: ColliderId(collider),
                    tag,
                };
                match self.dual_triggers.iter_mut().find(|slot| slot.name == trigger) {
                    Some(slot) => slot.behavior.trigger_exit(&contact),
                    None => warn!(trigger = %trigger, "unknown dual trigger"),
                }
            }
            ScriptStep::Toggle { toggle } => {
                let Some(slot) = self.toggles.iter_mut().find(|slot| slot.name == toggle) else {
                    warn!(toggle = %toggle, "unknown toggle");
                    return Ok(0);
                };
                slot.toggle.toggle(&mut self.animators, &mut self.audio);
                emit(sink, tick, &slot.name, "toggled", json!({ "playing": slot.toggle.is_playing() }))?;
                emitted += 1;
            }
            ScriptStep::Wait { .. } => {}
        }
        Ok(emitted)
    }

    fn interactor(&self, name: &str) -> Option<InteractorId> {
        let found = self.interactors.find_by_name(name);
        if found.is_none() {
            warn!(interactor = name, "unknown interactor");
        }
        found
    }

    /// Node id for a declared node name.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        let found = self.nodes.get(name).copied();
        if found.is_none() {
            warn!(node = name, "unknown node");
        }
        found
    }

    /// Names of behaviors skipped for missing references.
    pub fn disabled(&self) -> &[String] {
        &self.disabled
    }
}

#[cfg(test)]
impl Stage {
    /// Ticks run so far.
    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn audio(&self) -> &AudioMixer {
        &self.audio
    }

    pub fn animators(&self) -> &AnimatorSet {
        &self.animators
    }

    pub fn button(&self, name: &str) -> Option<&DepthLimitedPushButton> {
        self.buttons
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| &slot.button)
    }

    pub fn toggle(&self, name: &str) -> Option<&AnimatorToggle> {
        self.toggles
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| &slot.toggle)
    }

    pub fn is_controller_visible(&self, name: &str) -> Option<bool> {
        self.visibility
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.behavior.is_visible())
    }
}
