//! Request types for the diagram tools.
//!
//! Arguments arrive as raw JSON. [`DiagramRequest::from_arguments`] checks
//! the top-level shape field by field so the first structural violation can be
//! reported with its location (`components[2]: missing field `type``). The
//! `*DiagramArgs` types describe the same shape for the published tool schema.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DiagramError;
use crate::provider::Provider;

// --- Types ---

/// One infrastructure element to draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Component {
    /// Component type, e.g. "deployment", "ec2", "bigquery"
    #[serde(rename = "type")]
    pub component_type: String,
    /// Unique name of the component. Connections and groupings refer to it.
    pub name: String,
    /// Replica count, shown in the node label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u64>,
    /// Extra key/value attributes, shown in the node label
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// Directed edge between two named components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Connection {
    /// Name of the source component
    pub from: String,
    /// Name of the target component
    pub to: String,
    /// Optional edge label, e.g. "HTTPS"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connection {
    /// The label, with an empty string treated as no label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }
}

/// Named container (namespace, VPC) holding a subset of the components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Grouping {
    /// Label of the container
    pub name: String,
    /// Names of the member components, in drawing order
    #[serde(default)]
    pub components: Vec<String>,
}

/// Graphviz rank direction.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema,
)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR", alias = "lr")]
    LeftRight,
    #[serde(rename = "TB", alias = "tb")]
    TopBottom,
    #[serde(rename = "RL", alias = "rl")]
    RightLeft,
    #[serde(rename = "BT", alias = "bt")]
    BottomTop,
}

impl Direction {
    pub fn as_rankdir(self) -> &'static str {
        match self {
            Direction::LeftRight => "LR",
            Direction::TopBottom => "TB",
            Direction::RightLeft => "RL",
            Direction::BottomTop => "BT",
        }
    }
}

/// Input schema of `build-kubernetes-diagram`.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct KubernetesDiagramArgs {
    /// Name of the diagram
    pub name: String,
    /// List of Kubernetes components to include (type is one of: deployment, statefulset, daemonset, job, pod, replicaset, service, ingress, pvc, pv, storageclass, configmap, secret, hpa)
    pub components: Vec<Component>,
    /// Optional cluster groupings (namespaces)
    #[serde(default)]
    pub clusters: Vec<Grouping>,
    /// Connections between components
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Layout direction, "LR" when omitted
    #[serde(default)]
    pub direction: Option<Direction>,
}

/// Input schema of `build-aws-diagram` and `build-gcp-diagram`.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CloudDiagramArgs {
    /// Name of the diagram
    pub name: String,
    /// List of cloud components to include
    pub components: Vec<Component>,
    /// Optional VPC groupings
    #[serde(default)]
    pub vpcs: Vec<Grouping>,
    /// Connections between components
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Layout direction, "LR" when omitted
    #[serde(default)]
    pub direction: Option<Direction>,
}

/// A validated-shape diagram request, independent of provider key names.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramRequest {
    pub name: String,
    pub components: Vec<Component>,
    pub connections: Vec<Connection>,
    pub groupings: Vec<Grouping>,
    pub direction: Option<Direction>,
}

impl From<KubernetesDiagramArgs> for DiagramRequest {
    fn from(args: KubernetesDiagramArgs) -> Self {
        Self {
            name: args.name,
            components: args.components,
            connections: args.connections,
            groupings: args.clusters,
            direction: args.direction,
        }
    }
}

impl From<CloudDiagramArgs> for DiagramRequest {
    fn from(args: CloudDiagramArgs) -> Self {
        Self {
            name: args.name,
            components: args.components,
            connections: args.connections,
            groupings: args.vpcs,
            direction: args.direction,
        }
    }
}

impl DiagramRequest {
    /// Check the shape of raw tool arguments and extract the request.
    ///
    /// Only structure is checked here. Name resolution happens in
    /// [`crate::graph::build`].
    pub fn from_arguments(provider: Provider, arguments: &Value) -> Result<Self, DiagramError> {
        let object = arguments
            .as_object()
            .ok_or_else(|| invalid("arguments must be a JSON object"))?;

        let foreign_key = match provider {
            Provider::Kubernetes => "vpcs",
            Provider::Aws | Provider::Gcp => "clusters",
        };
        if object.contains_key(foreign_key) {
            return Err(invalid(format!(
                "`{}` is not accepted by {}; use `{}` for groupings",
                foreign_key,
                provider.tool_name(),
                provider.grouping_key()
            )));
        }

        let name = match object.get("name") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => return Err(invalid("`name` must not be empty")),
            Some(_) => return Err(invalid("`name` must be a string")),
            None => return Err(invalid("missing required field `name`")),
        };

        let components: Vec<Component> = list_field(object, "components", true)?;
        for (i, component) in components.iter().enumerate() {
            if component.name.trim().is_empty() {
                return Err(invalid(format!("components[{i}].name must not be empty")));
            }
            if component.component_type.trim().is_empty() {
                return Err(invalid(format!("components[{i}].type must not be empty")));
            }
        }

        let connections: Vec<Connection> = list_field(object, "connections", false)?;
        let groupings: Vec<Grouping> = list_field(object, provider.grouping_key(), false)?;
        for (i, grouping) in groupings.iter().enumerate() {
            if grouping.name.trim().is_empty() {
                return Err(invalid(format!(
                    "{}[{i}].name must not be empty",
                    provider.grouping_key()
                )));
            }
        }

        let direction = match object.get("direction") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                Direction::deserialize(value)
                    .map_err(|e| invalid(format!("`direction`: {e}")))?,
            ),
        };

        Ok(Self {
            name,
            components,
            connections,
            groupings,
            direction,
        })
    }
}

// --- Helpers ---

fn invalid(message: impl Into<String>) -> DiagramError {
    DiagramError::InvalidRequest(message.into())
}

/// Deserialize an array field item by item so errors carry the index.
fn list_field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    key: &str,
    required: bool,
) -> Result<Vec<T>, DiagramError> {
    let value = match object.get(key) {
        None | Some(Value::Null) if !required => return Ok(Vec::new()),
        None => return Err(invalid(format!("missing required field `{key}`"))),
        Some(value) => value,
    };
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("`{key}` must be an array")))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| T::deserialize(item).map_err(|e| invalid(format!("{key}[{i}]: {e}"))))
        .collect()
}
