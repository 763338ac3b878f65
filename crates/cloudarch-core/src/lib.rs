//! Core of cloudarch: turns a JSON description of Kubernetes, AWS or GCP
//! components into a rendered architecture diagram.
//!
//! The pipeline is [`generate`]: shape check ([`model`]), graph construction
//! against the provider's icon registry ([`graph`], [`provider`]), DOT
//! emission ([`dot`]) and rendering ([`render`]).

pub mod config;
pub mod dot;
pub mod error;
pub mod graph;
pub mod model;
pub mod provider;
pub mod render;

use log::info;
use serde_json::Value;

pub use error::{DiagramError, ErrorKind, RenderError, ToolFailure};
pub use graph::DiagramGraph;
pub use model::DiagramRequest;
pub use provider::Provider;
pub use render::{EncodedImage, GraphvizRenderer, Render, RenderedImage};

/// A rendered diagram plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramOutput {
    pub provider: Provider,
    pub name: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub grouping_count: usize,
    pub image: EncodedImage,
}

impl DiagramOutput {
    /// One-line confirmation returned alongside the image.
    pub fn summary(&self) -> String {
        format!(
            "{} architecture diagram '{}' created successfully with {} components.",
            self.provider, self.name, self.node_count
        )
    }
}

/// Validate `arguments`, build the diagram for `provider` and render it.
///
/// Nothing is rendered unless the whole request resolves.
///
/// # Errors
///
/// - [`DiagramError::InvalidRequest`] for malformed arguments
/// - [`DiagramError::UnknownComponentType`], [`DiagramError::DuplicateComponentName`],
///   [`DiagramError::UnknownComponentReference`] and
///   [`DiagramError::DuplicateGroupMembership`] from graph construction
/// - [`DiagramError::Render`] when the renderer fails
pub fn generate<R>(
    provider: Provider,
    arguments: &Value,
    renderer: &R,
) -> Result<DiagramOutput, DiagramError>
where
    R: Render + ?Sized,
{
    let request = DiagramRequest::from_arguments(provider, arguments)?;
    let graph = graph::build(&request, provider)?;
    let rendered = renderer.render(&graph)?;

    info!(
        provider = provider.display_name(),
        diagram = graph.name.as_str(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        bytes = rendered.bytes.len();
        "Rendered diagram"
    );

    Ok(DiagramOutput {
        provider,
        name: graph.name.clone(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        grouping_count: graph.grouping_count(),
        image: EncodedImage::from(&rendered),
    })
}
