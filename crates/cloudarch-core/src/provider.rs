//! Icon registry: the component types each provider can draw.
//!
//! Every provider has a closed enum of component types. Lookups go through an
//! exhaustive `match` on the lowercased type tag, so adding a type means adding
//! one line to the table below and the compiler checks every use.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Service family of a component. Drives the fallback node shape and colour
/// when no icon image is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Compute,
    Network,
    Storage,
    Database,
    Config,
    Scaling,
    Integration,
    Analytics,
}

macro_rules! icon_table {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident => $tag:literal $(| $alias:literal)*, $class:literal, $category:ident; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every variant, in table order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Case-insensitive lookup of a type tag (aliases included).
            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag.to_ascii_lowercase().as_str() {
                    $( $tag $(| $alias)* => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Canonical type tag.
            pub fn tag(self) -> &'static str {
                match self {
                    $( $name::$variant => $tag, )+
                }
            }

            /// Display name of the resource class, shown in node tooltips.
            pub fn class_name(self) -> &'static str {
                match self {
                    $( $name::$variant => $class, )+
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $( $name::$variant => Category::$category, )+
                }
            }
        }
    };
}

icon_table! {
    /// Kubernetes resource kinds.
    KubernetesIcon {
        Deployment => "deployment", "Deployment", Compute;
        StatefulSet => "statefulset", "StatefulSet", Compute;
        DaemonSet => "daemonset", "DaemonSet", Compute;
        Job => "job", "Job", Compute;
        Pod => "pod", "Pod", Compute;
        ReplicaSet => "replicaset", "ReplicaSet", Compute;
        Service => "service", "Service", Network;
        Ingress => "ingress", "Ingress", Network;
        Pvc => "pvc", "PersistentVolumeClaim", Storage;
        Pv => "pv", "PersistentVolume", Storage;
        StorageClass => "storageclass", "StorageClass", Storage;
        ConfigMap => "configmap", "ConfigMap", Config;
        Secret => "secret", "Secret", Config;
        Hpa => "hpa", "HorizontalPodAutoscaler", Scaling;
    }
}

icon_table! {
    /// AWS services.
    AwsIcon {
        Ec2 => "ec2", "EC2", Compute;
        Ecs => "ecs", "ECS", Compute;
        Eks => "eks", "EKS", Compute;
        Lambda => "lambda", "Lambda", Compute;
        Rds => "rds", "RDS", Database;
        DynamoDb => "dynamodb", "DynamoDB", Database;
        ElastiCache => "elasticache", "ElastiCache", Database;
        Redshift => "redshift", "Redshift", Database;
        S3 => "s3", "S3", Storage;
        Ebs => "ebs", "EBS", Storage;
        Efs => "efs", "EFS", Storage;
        Alb => "alb", "Application Load Balancer", Network;
        Nlb => "nlb", "Network Load Balancer", Network;
        Elb => "elb", "Elastic Load Balancing", Network;
        CloudFront => "cloudfront", "CloudFront", Network;
        Route53 => "route53", "Route 53", Network;
        Vpc => "vpc", "VPC", Network;
        Sqs => "sqs", "SQS", Integration;
        Sns => "sns", "SNS", Integration;
        EventBridge => "eventbridge", "EventBridge", Integration;
    }
}

icon_table! {
    /// Google Cloud services.
    GcpIcon {
        Gce => "gce", "Compute Engine", Compute;
        ComputeEngine => "computeengine", "Compute Engine", Compute;
        Gke => "gke", "Kubernetes Engine", Compute;
        Functions => "functions", "Cloud Functions", Compute;
        CloudSql => "cloudsql" | "sql", "Cloud SQL", Database;
        Firestore => "firestore", "Firestore", Database;
        Bigtable => "bigtable", "Bigtable", Database;
        Spanner => "spanner", "Spanner", Database;
        Gcs => "gcs", "Cloud Storage", Storage;
        PersistentDisk => "persistentdisk", "Persistent Disk", Storage;
        LoadBalancing => "loadbalancing", "Cloud Load Balancing", Network;
        CloudDns => "clouddns" | "dns", "Cloud DNS", Network;
        Vpc => "vpc", "VPC", Network;
        BigQuery => "bigquery", "BigQuery", Analytics;
        Dataflow => "dataflow", "Dataflow", Analytics;
        PubSub => "pubsub", "Pub/Sub", Analytics;
    }
}

/// A resolved component type for one of the providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Kubernetes(KubernetesIcon),
    Aws(AwsIcon),
    Gcp(GcpIcon),
}

impl Icon {
    pub fn provider(self) -> Provider {
        match self {
            Icon::Kubernetes(_) => Provider::Kubernetes,
            Icon::Aws(_) => Provider::Aws,
            Icon::Gcp(_) => Provider::Gcp,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Icon::Kubernetes(icon) => icon.tag(),
            Icon::Aws(icon) => icon.tag(),
            Icon::Gcp(icon) => icon.tag(),
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Icon::Kubernetes(icon) => icon.class_name(),
            Icon::Aws(icon) => icon.class_name(),
            Icon::Gcp(icon) => icon.class_name(),
        }
    }

    pub fn category(self) -> Category {
        match self {
            Icon::Kubernetes(icon) => icon.category(),
            Icon::Aws(icon) => icon.category(),
            Icon::Gcp(icon) => icon.category(),
        }
    }
}

/// Infrastructure provider a diagram is drawn for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Kubernetes,
    Aws,
    Gcp,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Kubernetes, Provider::Aws, Provider::Gcp];

    /// Look up a component type tag in this provider's table.
    pub fn resolve(self, component_type: &str) -> Option<Icon> {
        match self {
            Provider::Kubernetes => KubernetesIcon::from_tag(component_type).map(Icon::Kubernetes),
            Provider::Aws => AwsIcon::from_tag(component_type).map(Icon::Aws),
            Provider::Gcp => GcpIcon::from_tag(component_type).map(Icon::Gcp),
        }
    }

    /// Canonical tags accepted by [`Provider::resolve`], aliases excluded.
    pub fn component_types(self) -> Vec<&'static str> {
        match self {
            Provider::Kubernetes => KubernetesIcon::ALL.iter().map(|i| i.tag()).collect(),
            Provider::Aws => AwsIcon::ALL.iter().map(|i| i.tag()).collect(),
            Provider::Gcp => GcpIcon::ALL.iter().map(|i| i.tag()).collect(),
        }
    }

    /// Name of the MCP tool that builds diagrams for this provider.
    pub fn tool_name(self) -> &'static str {
        match self {
            Provider::Kubernetes => "build-kubernetes-diagram",
            Provider::Aws => "build-aws-diagram",
            Provider::Gcp => "build-gcp-diagram",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Kubernetes => "Kubernetes",
            Provider::Aws => "AWS",
            Provider::Gcp => "GCP",
        }
    }

    /// Request key holding the groupings: namespaces are clusters on
    /// Kubernetes, networks are VPCs on the clouds.
    pub fn grouping_key(self) -> &'static str {
        match self {
            Provider::Kubernetes => "clusters",
            Provider::Aws | Provider::Gcp => "vpcs",
        }
    }

    /// Directory name under the icon root, e.g. `k8s/deployment.png`.
    pub fn icon_dir(self) -> &'static str {
        match self {
            Provider::Kubernetes => "k8s",
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Provider::Kubernetes),
            "aws" => Ok(Provider::Aws),
            "gcp" => Ok(Provider::Gcp),
            other => Err(format!(
                "unknown provider '{other}' (expected kubernetes, aws or gcp)"
            )),
        }
    }
}
