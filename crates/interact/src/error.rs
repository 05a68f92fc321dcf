use thiserror::Error;
use xrscene_scene::SceneError;

/// Errors raised while building or driving a behavior.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InteractError {
    /// A required reference was not assigned or no longer exists.
    ///
    /// The behavior is never constructed and stays inert for the session.
    #[error("{behavior}: missing {dependency}")]
    MissingDependency {
        /// Behavior that could not be built.
        behavior: &'static str,
        /// What it needed.
        dependency: &'static str,
    },
    /// A scene query failed mid-operation.
    #[error(transparent)]
    Scene(#[from] SceneError),
}
