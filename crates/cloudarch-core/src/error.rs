//! Error types for diagram generation.
//!
//! [`DiagramError`] covers everything that can go wrong between receiving the
//! tool arguments and returning an image. Each variant maps onto one
//! [`ErrorKind`], which is what callers see in the `error_kind` field.

use std::{fmt, io, process::ExitStatus};

use serde::Serialize;
use thiserror::Error;

use crate::provider::Provider;

/// Failure while producing a diagram.
#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown {provider} component type '{component_type}' for '{name}' (supported: {})", .provider.component_types().join(", "))]
    UnknownComponentType {
        provider: Provider,
        component_type: String,
        name: String,
    },

    #[error("component name '{0}' is declared more than once")]
    DuplicateComponentName(String),

    #[error("{site} references undeclared component '{name}'")]
    UnknownComponentReference { site: ReferenceSite, name: String },

    #[error("component '{name}' is in both '{first}' and '{second}'; a component may belong to one grouping only")]
    DuplicateGroupMembership {
        name: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DiagramError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagramError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            DiagramError::UnknownComponentType { .. } => ErrorKind::UnknownComponentType,
            DiagramError::DuplicateComponentName(_) => ErrorKind::DuplicateComponentName,
            DiagramError::UnknownComponentReference { .. } => ErrorKind::UnknownComponentReference,
            DiagramError::DuplicateGroupMembership { .. } => ErrorKind::DuplicateGroupMembership,
            DiagramError::Render(_) => ErrorKind::RenderError,
        }
    }
}

/// Where an unresolved component name was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSite {
    ConnectionFrom(usize),
    ConnectionTo(usize),
    Grouping(String),
}

impl fmt::Display for ReferenceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSite::ConnectionFrom(index) => write!(f, "connections[{index}].from"),
            ReferenceSite::ConnectionTo(index) => write!(f, "connections[{index}].to"),
            ReferenceSite::Grouping(name) => write!(f, "grouping '{name}'"),
        }
    }
}

/// Failure of the external layout engine.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Graphviz is not available: {0}")]
    EngineUnavailable(String),

    #[error("Graphviz exited with {status}: {stderr}")]
    EngineFailed { status: ExitStatus, stderr: String },

    #[error("Graphviz produced an empty image")]
    EmptyImage,

    #[error("I/O error while rendering: {0}")]
    Io(#[from] io::Error),
}

/// Machine-readable error category returned to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidRequest,
    UnknownComponentType,
    DuplicateComponentName,
    UnknownComponentReference,
    DuplicateGroupMembership,
    RenderError,
}

/// Structured error object: `{"error_kind": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolFailure {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<&DiagramError> for ToolFailure {
    fn from(err: &DiagramError) -> Self {
        Self {
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }
}
