//! Error types for the Virtual Lab engine.
//!
//! Errors are grouped the way they are handled:
//! - [`DescriptorError`]: a malformed experiment descriptor, caught at registration
//! - [`SceneError`]: scene-graph allocation failures during `setup`
//! - [`RenderError`]: backend failures, swallowed by the scene host
//! - [`LabError`]: everything surfaced to the caller of the controller API

use thiserror::Error;

/// A descriptor failed validation and is excluded from the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error("parameter '{param}' of '{experiment}' has min {min} greater than max {max}")]
    InvertedBounds {
        experiment: String,
        param: String,
        min: f64,
        max: f64,
    },

    #[error("parameter '{param}' of '{experiment}' has default {default} outside [{min}, {max}]")]
    DefaultOutOfBounds {
        experiment: String,
        param: String,
        default: f64,
        min: f64,
        max: f64,
    },

    #[error("parameter '{param}' appears more than once in '{experiment}'")]
    DuplicateParameter { experiment: String, param: String },

    #[error("divisor parameter '{param}' of '{experiment}' must have min >= 1, got {min}")]
    DivisorBelowOne {
        experiment: String,
        param: String,
        min: f64,
    },

    #[error("experiment id '{0}' is already registered")]
    DuplicateExperiment(String),

    #[error("experiment '{experiment}' is missing required parameter '{param}'")]
    MissingParameter { experiment: String, param: String },
}

/// Scene-graph failures raised while an experiment builds its objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("scene node budget of {budget} exhausted")]
    NodeBudgetExhausted { budget: usize },

    #[error("node {0} does not exist in this scene")]
    MissingNode(u64),

    #[error("object bundle was built in a different scene")]
    ForeignScene,

    #[error("render surface unavailable: {0}")]
    Surface(#[from] RenderError),
}

/// Failures reported by a render backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("failed to create render surface: {0}")]
    SurfaceCreation(String),

    #[error("failed to resize surface to {width}x{height}: {reason}")]
    Resize {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("render call failed: {0}")]
    Render(String),
}

/// Errors surfaced through the controller API.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("unknown experiment '{0}'")]
    UnknownExperiment(String),

    #[error("unknown parameter '{param}' for experiment '{experiment}'")]
    UnknownParameter { experiment: String, param: String },

    #[error("value {value} for '{param}' is outside [{min}, {max}]")]
    ParameterOutOfRange {
        param: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("no experiment is selected")]
    NoExperiment,

    #[error("experiment '{id}' failed to load: {source}")]
    SetupFailed {
        id: String,
        #[source]
        source: SceneError,
    },

    #[error("invalid speed multiplier {0}")]
    InvalidSpeed(f64),

    #[error("scene update failed: {0}")]
    Scene(#[from] SceneError),
}

pub type LabResult<T> = Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failure_message_names_experiment() {
        let err = LabError::SetupFailed {
            id: "pendulum".into(),
            source: SceneError::NodeBudgetExhausted { budget: 4 },
        };
        let msg = err.to_string();
        assert!(msg.contains("pendulum"));
        assert!(msg.contains("failed to load"));
    }

    #[test]
    fn render_error_converts_into_scene_error() {
        let err: SceneError = RenderError::SurfaceCreation("no adapter".into()).into();
        assert!(matches!(err, SceneError::Surface(_)));
    }
}
