#![warn(missing_docs)]
//! Interaction behaviors for XR scenes.
//!
//! Each behavior is a small state machine fed by two inbound channels: discrete
//! host events (hover, select, trigger contacts) and a periodic tick carrying
//! the frame's elapsed time. Behaviors own their state exclusively and reach
//! the scene, audio and animators through handles passed in per call.
//!
//! - [`DepthLimitedPushButton`] - poke button with clamped travel and press/release edges
//! - [`AnimatorToggle`] - flips an animator and a looping audio source
//! - [`DualContactTrigger`] - plays audio then an animation once both handles are held
//! - [`ReturnToHome`] - sends a released grabbable back to its reference pose
//! - [`ControllerVisibility`] - hides controller visuals while a hand holds something

pub mod animator_toggle;
pub mod controller_visibility;
pub mod dual_contact;
mod error;
pub mod interactor;
pub mod poke_button;
pub mod return_home;
pub mod schedule;

pub use animator_toggle::{AnimatorDrive, AnimatorToggle, ToggleConfig};
pub use controller_visibility::{ControllerVisibility, VisibilityConfig};
pub use dual_contact::{ColliderContact, DualContactConfig, DualContactTrigger};
pub use error::InteractError;
pub use interactor::{HoverEvent, Interactor, InteractorRegistry};
pub use poke_button::{ButtonConfig, ButtonEvent, ButtonPhase, DepthLimitedPushButton};
pub use return_home::{ReturnConfig, ReturnToHome};
pub use schedule::{Delay, Pending};
