#![warn(missing_docs)]
//! Core primitives shared across the workspace: ticks, identity handles and hands.

use serde::{Deserialize, Serialize};

/// Frame counter advanced once per host tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick of any session.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Stable identity for an interactor (poke finger, ray, direct grab).
///
/// Handles are compared by value; a removed interactor simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InteractorId(pub u64);

/// Stable identity for a trigger collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub u64);

/// Which hand owns an interactor or a controller visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    /// Left hand / controller.
    Left,
    /// Right hand / controller.
    Right,
}

/// Interactor flavours reported by the XR runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractorKind {
    /// Fingertip poke.
    Poke,
    /// Direct (near) grab.
    Direct,
    /// Far ray.
    Ray,
    /// Combined near/far interactor.
    NearFar,
}

impl InteractorKind {
    /// Short label used in logs and event records.
    pub fn label(self) -> &'static str {
        match self {
            InteractorKind::Poke => "poke",
            InteractorKind::Direct => "direct",
            InteractorKind::Ray => "ray",
            InteractorKind::NearFar => "near_far",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances() {
        assert_eq!(SimTick::ZERO.advance(3), SimTick(3));
    }

    #[test]
    fn hand_uses_snake_case_names() {
        let json = serde_json::to_string(&Hand::Left).unwrap();
        assert_eq!(json, "\"left\"");
        let kind: InteractorKind = serde_json::from_str("\"near_far\"").unwrap();
        assert_eq!(kind, InteractorKind::NearFar);
    }
}
