use serde::Serialize;
use std::fmt::{Display, Formatter};

const MEBIBYTE: u64 = 1024 * 1024;

/// Schedulable capacity of a node, as reported by its `status.allocatable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCapacity {
    pub name: String,
    pub allocatable_cpu_millicores: u64,
    pub allocatable_memory_bytes: u64,
}

/// Declared requests and limits of one container. `None` means the field is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerResources {
    pub cpu_request_millicores: Option<u64>,
    pub memory_request_bytes: Option<u64>,
    pub cpu_limit_millicores: Option<u64>,
    pub memory_limit_bytes: Option<u64>,
}

impl ContainerResources {
    pub fn has_requests(&self) -> bool {
        self.cpu_request_millicores.is_some() || self.memory_request_bytes.is_some()
    }

    pub fn has_limits(&self) -> bool {
        self.cpu_limit_millicores.is_some() || self.memory_limit_bytes.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodResources {
    pub namespace: String,
    pub name: String,
    pub node_name: Option<String>,
    pub containers: Vec<ContainerResources>,
}

/// Reservation and commitment totals of one node for a single report.
///
/// Fractions are `sum / allocatable` and stay non-finite when the node
/// reports zero allocatable capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeAggregate {
    pub name: String,
    pub total_pods: usize,
    pub unrestricted_pods: usize,
    pub allocatable_cpu_millicores: u64,
    pub allocatable_memory_bytes: u64,
    pub reserved_cpu_millicores: u64,
    pub reserved_memory_bytes: u64,
    pub committed_cpu_millicores: u64,
    pub committed_memory_bytes: u64,
    pub reserved_cpu_fraction: f64,
    pub reserved_memory_fraction: f64,
    pub committed_cpu_fraction: f64,
    pub committed_memory_fraction: f64,
}

impl NodeAggregate {
    pub fn table_headers() -> [&'static str; 7] {
        [
            "name",
            "total pods",
            "unrestricted pods",
            "CPU reservations",
            "CPU limits",
            "RAM reservations",
            "RAM limits",
        ]
    }

    pub fn table_columns(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.total_pods.to_string(),
            self.unrestricted_pods.to_string(),
            format_percent(self.reserved_cpu_fraction),
            format_percent(self.committed_cpu_fraction),
            format_percent(self.reserved_memory_fraction),
            format_percent(self.committed_memory_fraction),
        ]
    }
}

/// Live usage of one pod from the metrics API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodUsageSample {
    pub namespace: String,
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
    pub node: Option<String>,
}

impl PodUsageSample {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        cpu_millicores: u64,
        memory_bytes: u64,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            cpu_millicores,
            memory_bytes,
            node: None,
        }
    }

    pub fn table_headers() -> [&'static str; 6] {
        ["#", "namespace", "name", "node", "CPU", "RAM"]
    }

    pub fn table_columns(&self, rank: usize) -> Vec<String> {
        vec![
            rank.to_string(),
            self.namespace.clone(),
            self.name.clone(),
            self.node.clone().unwrap_or_default(),
            format_cpu(self.cpu_millicores),
            format_ram(self.memory_bytes),
        ]
    }
}

impl Display for PodUsageSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub fn format_cpu(millicores: u64) -> String {
    format!("{millicores}m")
}

/// Whole mebibytes, truncated, the same way `kubectl top` prints memory.
pub fn format_ram(bytes: u64) -> String {
    format!("{}Mi", bytes / MEBIBYTE)
}

pub fn format_percent(fraction: f64) -> String {
    if fraction.is_nan() {
        "NaN%".to_string()
    } else if fraction.is_infinite() {
        "∞%".to_string()
    } else {
        format!("{:.2}%", fraction * 100.0)
    }
}
