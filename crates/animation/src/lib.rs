#![warn(missing_docs)]
//! Animator parameter owners.
//!
//! The host's animation state machine is out of scope; behaviors only drive its
//! parameters. An [`Animator`] stores boolean parameters and latched one-shot
//! triggers, and keeps a log of every command so the host can forward them.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Handle to an animator owned by an [`AnimatorSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimatorId(pub u32);

/// A parameter change issued to an animator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AnimatorCommand {
    /// Boolean parameter written.
    SetBool {
        /// Parameter name.
        name: String,
        /// New value.
        value: bool,
    },
    /// One-shot trigger latched.
    SetTrigger {
        /// Trigger name.
        name: String,
    },
}

/// Parameter store for one animated object.
#[derive(Debug, Default, Clone)]
pub struct Animator {
    name: String,
    bools: BTreeMap<String, bool>,
    triggers: BTreeSet<String>,
    commands: Vec<AnimatorCommand>,
}

impl Animator {
    /// Empty animator.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Animator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write a boolean parameter.
    pub fn set_bool(&mut self, name: &str, value: bool) {
        debug!(animator = %self.name, param = name, value, "set bool");
        self.bools.insert(name.to_owned(), value);
        self.commands.push(AnimatorCommand::SetBool {
            name: name.to_owned(),
            value,
        });
    }

    /// Read a boolean parameter; unset parameters read as `false`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.bools.get(name).copied().unwrap_or(false)
    }

    /// Latch a trigger until the state machine consumes it.
    pub fn set_trigger(&mut self, name: &str) {
        debug!(animator = %self.name, trigger = name, "set trigger");
        self.triggers.insert(name.to_owned());
        self.commands.push(AnimatorCommand::SetTrigger {
            name: name.to_owned(),
        });
    }

    /// Clear a latched trigger without consuming it.
    pub fn reset_trigger(&mut self, name: &str) {
        self.triggers.remove(name);
    }

    /// Whether a trigger is latched.
    pub fn is_trigger_set(&self, name: &str) -> bool {
        self.triggers.contains(name)
    }

    /// Consume a latched trigger, returning whether it was set.
    pub fn consume_trigger(&mut self, name: &str) -> bool {
        self.triggers.remove(name)
    }

    /// Commands issued so far.
    pub fn commands(&self) -> &[AnimatorCommand] {
        &self.commands
    }

    /// Drain the command log.
    pub fn take_commands(&mut self) -> Vec<AnimatorCommand> {
        std::mem::take(&mut self.commands)
    }
}

/// Registry of animators addressed by [`AnimatorId`].
#[derive(Debug, Default)]
pub struct AnimatorSet {
    animators: BTreeMap<AnimatorId, Animator>,
    next_id: u32,
}

impl AnimatorSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an animator and return its handle.
    pub fn add(&mut self, animator: Animator) -> AnimatorId {
        let id = AnimatorId(self.next_id);
        self.next_id += 1;
        self.animators.insert(id, animator);
        id
    }

    /// Remove an animator; its handle stops resolving.
    pub fn remove(&mut self, id: AnimatorId) -> Option<Animator> {
        self.animators.remove(&id)
    }

    /// Borrow an animator.
    pub fn get(&self, id: AnimatorId) -> Option<&Animator> {
        self.animators.get(&id)
    }

    /// Mutably borrow an animator.
    pub fn get_mut(&mut self, id: AnimatorId) -> Option<&mut Animator> {
        self.animators.get_mut(&id)
    }

    /// First animator with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<AnimatorId> {
        self.animators
            .iter()
            .find(|(_, animator)| animator.name == name)
            .map(|(id, _)| *id)
    }

    /// Drain command logs from every animator, tagged with the animator name.
    pub fn drain_commands(&mut self) -> Vec<(String, AnimatorCommand)> {
        let mut out = Vec::new();
        for animator in self.animators.values_mut() {
            let name = animator.name.clone();
            out.extend(animator.take_commands().into_iter().map(|cmd| (name.clone(), cmd)));
        }
        out
    }
}
