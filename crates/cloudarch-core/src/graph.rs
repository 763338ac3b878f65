//! In-memory diagram graph built from a [`DiagramRequest`].
//!
//! [`build`] makes one pass over components, then groupings, then
//! connections, in input order. The first unresolved name aborts the whole
//! build, so a graph that exists has every reference resolved.

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::{DiagramError, ReferenceSite};
use crate::model::{DiagramRequest, Direction};
use crate::provider::{Icon, Provider};

/// A component resolved against its provider's registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    pub name: String,
    pub icon: Icon,
    /// `(key, value)` pairs shown under the name, replicas first.
    pub attributes: Vec<(String, String)>,
    /// Index into [`DiagramGraph::groupings`].
    pub grouping: Option<usize>,
}

impl DiagramNode {
    /// Node label: the name, then one line per attribute.
    pub fn label(&self) -> String {
        let mut label = self.name.clone();
        for (key, value) in &self.attributes {
            label.push('\n');
            label.push_str(key);
            label.push_str(": ");
            label.push_str(value);
        }
        label
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramGroup {
    pub name: String,
    /// Member component names in declaration order.
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// Nodes, groupings and edges of one diagram, ready to lay out.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramGraph {
    pub name: String,
    pub provider: Provider,
    pub direction: Option<Direction>,
    nodes: IndexMap<String, DiagramNode>,
    groupings: Vec<DiagramGroup>,
    edges: Vec<DiagramEdge>,
}

impl DiagramGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn grouping_count(&self) -> usize {
        self.groupings.len()
    }

    /// All nodes in component declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.values()
    }

    pub fn node(&self, name: &str) -> Option<&DiagramNode> {
        self.nodes.get(name)
    }

    pub fn groupings(&self) -> &[DiagramGroup] {
        &self.groupings
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.edges
    }

    /// Nodes that belong to no grouping, in declaration order.
    pub fn ungrouped(&self) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.values().filter(|n| n.grouping.is_none())
    }
}

/// Build the diagram graph for `request` using `provider`'s registry.
pub fn build(request: &DiagramRequest, provider: Provider) -> Result<DiagramGraph, DiagramError> {
    let mut nodes: IndexMap<String, DiagramNode> =
        IndexMap::with_capacity(request.components.len());

    for component in &request.components {
        let icon = provider.resolve(&component.component_type).ok_or_else(|| {
            DiagramError::UnknownComponentType {
                provider,
                component_type: component.component_type.clone(),
                name: component.name.clone(),
            }
        })?;
        if nodes.contains_key(&component.name) {
            return Err(DiagramError::DuplicateComponentName(component.name.clone()));
        }

        let mut attributes = Vec::new();
        if let Some(replicas) = component.replicas {
            attributes.push(("replicas".to_string(), replicas.to_string()));
        }
        for (key, value) in &component.attributes {
            if key == "replicas" && component.replicas.is_some() {
                continue;
            }
            attributes.push((key.clone(), attribute_text(value)));
        }

        nodes.insert(
            component.name.clone(),
            DiagramNode {
                name: component.name.clone(),
                icon,
                attributes,
                grouping: None,
            },
        );
    }

    let mut groupings: Vec<DiagramGroup> = Vec::with_capacity(request.groupings.len());
    for (index, grouping) in request.groupings.iter().enumerate() {
        let mut members = Vec::with_capacity(grouping.components.len());
        for member in &grouping.components {
            let node = nodes.get_mut(member).ok_or_else(|| {
                DiagramError::UnknownComponentReference {
                    site: ReferenceSite::Grouping(grouping.name.clone()),
                    name: member.clone(),
                }
            })?;
            match node.grouping {
                // Listed twice in the same grouping.
                Some(existing) if existing == index => continue,
                Some(existing) => {
                    return Err(DiagramError::DuplicateGroupMembership {
                        name: member.clone(),
                        first: groupings[existing].name.clone(),
                        second: grouping.name.clone(),
                    });
                }
                None => {}
            }
            node.grouping = Some(index);
            members.push(member.clone());
        }
        groupings.push(DiagramGroup {
            name: grouping.name.clone(),
            members,
        });
    }

    let mut edges = Vec::with_capacity(request.connections.len());
    for (index, connection) in request.connections.iter().enumerate() {
        if !nodes.contains_key(&connection.from) {
            return Err(DiagramError::UnknownComponentReference {
                site: ReferenceSite::ConnectionFrom(index),
                name: connection.from.clone(),
            });
        }
        if !nodes.contains_key(&connection.to) {
            return Err(DiagramError::UnknownComponentReference {
                site: ReferenceSite::ConnectionTo(index),
                name: connection.to.clone(),
            });
        }
        edges.push(DiagramEdge {
            from: connection.from.clone(),
            to: connection.to.clone(),
            label: connection.label().map(str::to_string),
        });
    }

    debug!(
        diagram = request.name.as_str(),
        nodes = nodes.len(),
        groupings = groupings.len(),
        edges = edges.len();
        "Built diagram graph"
    );

    Ok(DiagramGraph {
        name: request.name.clone(),
        provider,
        direction: request.direction,
        nodes,
        groupings,
        edges,
    })
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Component, Connection, Grouping};
    use crate::provider::KubernetesIcon;
    use serde_json::json;

    fn component(component_type: &str, name: &str) -> Component {
        Component {
            component_type: component_type.to_string(),
            name: name.to_string(),
            replicas: None,
            attributes: Default::default(),
        }
    }

    fn connection(from: &str, to: &str) -> Connection {
        Connection {
            from: from.to_string(),
            to: to.to_string(),
            label: None,
        }
    }

    fn grouping(name: &str, members: &[&str]) -> Grouping {
        Grouping {
            name: name.to_string(),
            components: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn request(
        components: Vec<Component>,
        connections: Vec<Connection>,
        groupings: Vec<Grouping>,
    ) -> DiagramRequest {
        DiagramRequest {
            name: "test".to_string(),
            components,
            connections,
            groupings,
            direction: None,
        }
    }

    #[test]
    fn kubernetes_web_stack() {
        let mut nginx = component("deployment", "nginx");
        nginx.replicas = Some(3);
        let req = request(
            vec![
                nginx,
                component("service", "nginx-svc"),
                component("ingress", "web-ingress"),
            ],
            vec![
                connection("web-ingress", "nginx-svc"),
                connection("nginx-svc", "nginx"),
            ],
            vec![],
        );

        let graph = build(&req, Provider::Kubernetes).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.grouping_count(), 0);

        let node = graph.node("nginx").unwrap();
        assert_eq!(node.icon, Icon::Kubernetes(KubernetesIcon::Deployment));
        assert_eq!(node.label(), "nginx\nreplicas: 3");
    }

    #[test]
    fn preserves_declaration_order() {
        let req = request(
            vec![
                component("s3", "zeta"),
                component("ec2", "alpha"),
                component("rds", "mid"),
            ],
            vec![],
            vec![],
        );
        let graph = build(&req, Provider::Aws).unwrap();
        let names: Vec<_> = graph.nodes().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn unknown_type_fails() {
        let req = request(vec![component("not-a-real-gcp-service", "x")], vec![], vec![]);
        let err = build(&req, Provider::Gcp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownComponentType);
    }

    #[test]
    fn duplicate_name_fails() {
        let req = request(
            vec![component("ec2", "web"), component("lambda", "web")],
            vec![],
            vec![],
        );
        let err = build(&req, Provider::Aws).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateComponentName);
    }

    #[test]
    fn dangling_connection_fails() {
        let req = request(
            vec![component("route53", "dns")],
            vec![connection("dns", "nonexistent")],
            vec![],
        );
        let err = build(&req, Provider::Aws).unwrap_err();
        assert!(matches!(
            err,
            DiagramError::UnknownComponentReference {
                site: ReferenceSite::ConnectionTo(0),
                ref name,
            } if name == "nonexistent"
        ));
    }

    #[test]
    fn dangling_connection_source_fails() {
        let req = request(
            vec![component("gcs", "bucket")],
            vec![connection("ghost", "bucket")],
            vec![],
        );
        let err = build(&req, Provider::Gcp).unwrap_err();
        assert!(matches!(
            err,
            DiagramError::UnknownComponentReference {
                site: ReferenceSite::ConnectionFrom(0),
                ..
            }
        ));
    }

    #[test]
    fn groups_members_in_declaration_order() {
        let req = request(
            vec![
                component("ec2", "a"),
                component("ec2", "b"),
                component("s3", "c"),
            ],
            vec![],
            vec![grouping("vpc", &["b", "a"])],
        );
        let graph = build(&req, Provider::Aws).unwrap();
        assert_eq!(graph.groupings()[0].members, ["b", "a"]);
        assert_eq!(graph.node("a").unwrap().grouping, Some(0));
        let ungrouped: Vec<_> = graph.ungrouped().map(|n| n.name.as_str()).collect();
        assert_eq!(ungrouped, ["c"]);
    }

    #[test]
    fn unknown_grouping_member_fails() {
        let req = request(
            vec![component("pod", "p")],
            vec![],
            vec![grouping("ns", &["p", "q"])],
        );
        let err = build(&req, Provider::Kubernetes).unwrap_err();
        assert!(matches!(
            err,
            DiagramError::UnknownComponentReference {
                site: ReferenceSite::Grouping(ref g),
                ref name,
            } if g == "ns" && name == "q"
        ));
    }

    #[test]
    fn membership_in_two_groupings_fails() {
        let req = request(
            vec![component("pod", "p")],
            vec![],
            vec![grouping("one", &["p"]), grouping("two", &["p"])],
        );
        let err = build(&req, Provider::Kubernetes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateGroupMembership);
        assert!(err.to_string().contains("'one' and 'two'"));
    }

    #[test]
    fn repeated_member_in_same_grouping_is_kept_once() {
        let req = request(
            vec![component("pod", "p")],
            vec![],
            vec![grouping("ns", &["p", "p"])],
        );
        let graph = build(&req, Provider::Kubernetes).unwrap();
        assert_eq!(graph.groupings()[0].members, ["p"]);
    }

    #[test]
    fn attributes_render_into_label() {
        let mut db = component("rds", "db");
        db.attributes = json!({"engine": "postgres", "multi_az": true})
            .as_object()
            .cloned()
            .unwrap();
        let req = request(vec![db], vec![], vec![]);
        let graph = build(&req, Provider::Aws).unwrap();
        assert_eq!(
            graph.node("db").unwrap().label(),
            "db\nengine: postgres\nmulti_az: true"
        );
    }

    #[test]
    fn explicit_replicas_win_over_attribute() {
        let mut web = component("deployment", "web");
        web.replicas = Some(2);
        web.attributes = json!({"replicas": 9}).as_object().cloned().unwrap();
        let req = request(vec![web], vec![], vec![]);
        let graph = build(&req, Provider::Kubernetes).unwrap();
        assert_eq!(graph.node("web").unwrap().label(), "web\nreplicas: 2");
    }

    #[test]
    fn edge_labels_pass_through() {
        let mut edge = connection("a", "b");
        edge.label = Some("HTTPS".to_string());
        let req = request(
            vec![component("cloudfront", "a"), component("s3", "b")],
            vec![edge],
            vec![],
        );
        let graph = build(&req, Provider::Aws).unwrap();
        assert_eq!(graph.edges()[0].label.as_deref(), Some("HTTPS"));
    }
}
