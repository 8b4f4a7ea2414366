//! Per-node reservation and commitment report.

use tracing::{debug, info};

use crate::error::HoggersError;
use crate::k8s::ClusterLister;
use crate::model::{NodeAggregate, NodeCapacity, PodResources};

/// Lists every node, then the pods bound to each, and aggregates them in
/// node listing order. Any listing failure aborts the whole report.
pub async fn build_report(
    lister: &dyn ClusterLister,
) -> Result<Vec<NodeAggregate>, HoggersError> {
    let nodes = lister
        .list_nodes()
        .await
        .map_err(|error| HoggersError::listing("nodes", error))?;
    info!(nodes = nodes.len(), "building node report");

    let mut report = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let selector = format!("spec.nodeName={}", node.name);
        let pods = lister
            .list_pods(&selector)
            .await
            .map_err(|error| HoggersError::listing("pods", error))?;
        debug!(node = %node.name, pods = pods.len(), "aggregating node");
        report.push(aggregate_node(node, &pods));
    }

    Ok(report)
}

pub fn aggregate_node(node: &NodeCapacity, pods: &[PodResources]) -> NodeAggregate {
    let mut reserved_cpu = 0u64;
    let mut reserved_memory = 0u64;
    let mut committed_cpu = 0u64;
    let mut committed_memory = 0u64;
    let mut unrestricted_pods = 0usize;

    for pod in pods {
        let mut restricted = false;
        for container in &pod.containers {
            if container.has_requests() {
                reserved_cpu =
                    reserved_cpu.saturating_add(container.cpu_request_millicores.unwrap_or(0));
                reserved_memory =
                    reserved_memory.saturating_add(container.memory_request_bytes.unwrap_or(0));
                restricted = true;
            }
            if container.has_limits() {
                committed_cpu =
                    committed_cpu.saturating_add(container.cpu_limit_millicores.unwrap_or(0));
                committed_memory =
                    committed_memory.saturating_add(container.memory_limit_bytes.unwrap_or(0));
                restricted = true;
            }
        }
        if !restricted {
            debug!(
                pod = %format!("{}/{}", pod.namespace, pod.name),
                node = pod.node_name.as_deref().unwrap_or(&node.name),
                "pod has no requests or limits"
            );
            unrestricted_pods += 1;
        }
    }

    let cpu = node.allocatable_cpu_millicores;
    let memory = node.allocatable_memory_bytes;
    NodeAggregate {
        name: node.name.clone(),
        total_pods: pods.len(),
        unrestricted_pods,
        allocatable_cpu_millicores: cpu,
        allocatable_memory_bytes: memory,
        reserved_cpu_millicores: reserved_cpu,
        reserved_memory_bytes: reserved_memory,
        committed_cpu_millicores: committed_cpu,
        committed_memory_bytes: committed_memory,
        reserved_cpu_fraction: fraction(reserved_cpu, cpu),
        reserved_memory_fraction: fraction(reserved_memory, memory),
        committed_cpu_fraction: fraction(committed_cpu, cpu),
        committed_memory_fraction: fraction(committed_memory, memory),
    }
}

// Zero allocatable yields inf, or NaN for 0/0.
fn fraction(sum: u64, allocatable: u64) -> f64 {
    sum as f64 / allocatable as f64
}
