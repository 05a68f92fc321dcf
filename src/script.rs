//! Scripted host events for headless runs.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
struct ScriptFile {
    steps: Vec<ScriptStep>,
}

/// One host event, or a pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    HoverEnter { interactor: String, target: String },
    HoverExit { interactor: String, target: String },
    MoveInteractor { interactor: String, position: [f32; 3] },
    RemoveInteractor { interactor: String },
    SelectEnter { interactor: String, target: String },
    SelectExit { interactor: String, target: String },
    TriggerEnter { trigger: String, collider: u64, tag: String },
    TriggerExit { trigger: String, collider: u64, tag: String },
    Toggle { toggle: String },
    /// Resume `ticks` ticks later (at least one).
    Wait { ticks: u64 },
}

/// Hands out the steps due on each tick.
pub struct ScriptPlayer {
    steps: Vec<ScriptStep>,
    index: usize,
    waiting: u64,
}

impl ScriptPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let file: ScriptFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("script file contains no steps");
        }
        Ok(Self::new(file.steps))
    }

    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            index: 0,
            waiting: 0,
        }
    }

    /// Empty script; the run only settles.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    /// Steps to apply this tick, up to the next wait.
    pub fn advance(&mut self) -> Vec<ScriptStep> {
        if self.waiting > 0 {
            self.waiting -= 1;
            return Vec::new();
        }

        let mut due = Vec::new();
        while let Some(step) = self.steps.get(self.index) {
            self.index += 1;
            if let ScriptStep::Wait { ticks } = step {
                self.waiting = (*ticks).max(1) - 1;
                break;
            }
            due.push(step.clone());
        }
        due
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.steps.len() && self.waiting == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(name: &str) -> ScriptStep {
        ScriptStep::Toggle {
            toggle: name.to_string(),
        }
    }

    #[test]
    fn waits_split_steps_across_ticks() {
        let mut player = ScriptPlayer::new(vec![
            toggle("a"),
            toggle("b"),
            ScriptStep::Wait { ticks: 3 },
            toggle("c"),
            ScriptStep::Wait { ticks: 0 },
            toggle("d"),
        ]);
        assert_eq!(player.advance(), vec![toggle("a"), toggle("b")]);
        assert!(player.advance().is_empty());
        assert!(player.advance().is_empty());
        assert_eq!(player.advance(), vec![toggle("c")]);
        assert_eq!(player.advance(), vec![toggle("d")]);
        assert!(player.is_finished());
        assert!(player.advance().is_empty());
    }

    #[test]
    fn parses_tagged_steps() {
        let player = ScriptPlayer::parse(
            r#"{"steps":[
                {"op":"move_interactor","interactor":"poke","position":[0.0,1.0,0.0]},
                {"op":"trigger_enter","trigger":"defib","collider":4,"tag":"LeftHandle"},
                {"op":"wait","ticks":2}
            ]}"#,
        )
        .unwrap();
        assert_eq!(player.steps.len(), 3);
        assert_eq!(
            player.steps[1],
            ScriptStep::TriggerEnter {
                trigger: "defib".into(),
                collider: 4,
                tag: "LeftHandle".into()
            }
        );
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(ScriptPlayer::parse(r#"{"steps":[]}"#).is_err());
    }
}
