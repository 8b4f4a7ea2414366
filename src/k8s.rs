use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::debug;

use crate::error::HoggersError;
use crate::model::{ContainerResources, NodeCapacity, PodResources, PodUsageSample};
use crate::quantity::{parse_cpu_millicores, parse_memory_bytes};

const PAGE_SIZE: u32 = 500;

/// Lists nodes and pods from the core API.
#[async_trait]
pub trait ClusterLister: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeCapacity>>;

    /// Lists pods in all namespaces matching a field selector such as
    /// `spec.nodeName=worker-1`.
    async fn list_pods(&self, field_selector: &str) -> Result<Vec<PodResources>>;

    /// Returns the node a pod is currently bound to, `None` while unscheduled.
    async fn pod_node(&self, namespace: &str, name: &str) -> Result<Option<String>>;
}

/// Lists live usage from the `metrics.k8s.io` API.
#[async_trait]
pub trait MetricsLister: Send + Sync {
    async fn list_pod_metrics(&self) -> Result<Vec<PodUsageSample>>;
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
}

impl KubeGateway {
    /// Reads and merges every kubeconfig in `paths`, then connects using
    /// `context` or the file's current context.
    pub async fn connect(paths: &[PathBuf], context: Option<String>) -> Result<Self> {
        let mut merged: Option<Kubeconfig> = None;
        for path in paths {
            let next = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            merged = Some(match merged {
                Some(current) => current
                    .merge(next)
                    .context("failed to merge kubeconfig files")?,
                None => next,
            });
        }
        let kubeconfig = merged.ok_or(HoggersError::MissingKubeconfig)?;

        let options = KubeConfigOptions {
            context: context.clone(),
            cluster: None,
            user: None,
        };
        let config = Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
            .await
            .context("failed to load Kubernetes configuration")?;
        let cluster = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        let context = context
            .or(kubeconfig.current_context)
            .unwrap_or_else(|| "-".to_string());

        Ok(Self {
            client,
            context,
            cluster,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    fn pod_metrics_api(&self) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        Api::all_with(self.client.clone(), &resource)
    }
}

#[async_trait]
impl ClusterLister for KubeGateway {
    async fn list_nodes(&self) -> Result<Vec<NodeCapacity>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let items = list_all(&nodes, ListParams::default()).await?;
        Ok(items.iter().map(node_capacity).collect())
    }

    async fn list_pods(&self, field_selector: &str) -> Result<Vec<PodResources>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let items = list_all(&pods, ListParams::default().fields(field_selector)).await?;
        Ok(items.iter().map(pod_resources).collect())
    }

    async fn pod_node(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods.get(name).await?;
        Ok(pod.spec.and_then(|spec| spec.node_name))
    }
}

#[async_trait]
impl MetricsLister for KubeGateway {
    async fn list_pod_metrics(&self) -> Result<Vec<PodUsageSample>> {
        let items = list_all(&self.pod_metrics_api(), ListParams::default()).await?;
        Ok(items
            .into_iter()
            .map(|pod_metric| {
                let namespace = pod_metric.namespace().unwrap_or_else(|| "-".to_string());
                let name = pod_metric.name_any();
                let (cpu_millicores, memory_bytes) = parse_pod_metrics_usage(&pod_metric.data);
                PodUsageSample::new(namespace, name, cpu_millicores, memory_bytes)
            })
            .collect())
    }
}

async fn list_all<K>(api: &Api<K>, params: ListParams) -> Result<Vec<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut params = params.limit(PAGE_SIZE);
    let mut items = Vec::new();
    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);
        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => params = params.continue_token(&token),
            _ => break,
        }
    }
    Ok(items)
}

fn node_capacity(node: &Node) -> NodeCapacity {
    let allocatable = node
        .status
        .as_ref()
        .and_then(|status| status.allocatable.as_ref());
    NodeCapacity {
        name: node.name_any(),
        allocatable_cpu_millicores: allocatable
            .and_then(|values| cpu_quantity(values, "cpu"))
            .unwrap_or(0),
        allocatable_memory_bytes: allocatable
            .and_then(|values| memory_quantity(values, "memory"))
            .unwrap_or(0),
    }
}

fn pod_resources(pod: &Pod) -> PodResources {
    let spec = pod.spec.as_ref();
    PodResources {
        namespace: pod.namespace().unwrap_or_default(),
        name: pod.name_any(),
        node_name: spec.and_then(|spec| spec.node_name.clone()),
        containers: spec
            .map(|spec| spec.containers.iter().map(container_resources).collect())
            .unwrap_or_default(),
    }
}

fn container_resources(container: &Container) -> ContainerResources {
    let resources = container.resources.as_ref();
    let requests = resources.and_then(|resources| resources.requests.as_ref());
    let limits = resources.and_then(|resources| resources.limits.as_ref());
    ContainerResources {
        cpu_request_millicores: requests.and_then(|values| cpu_quantity(values, "cpu")),
        memory_request_bytes: requests.and_then(|values| memory_quantity(values, "memory")),
        cpu_limit_millicores: limits.and_then(|values| cpu_quantity(values, "cpu")),
        memory_limit_bytes: limits.and_then(|values| memory_quantity(values, "memory")),
    }
}

// A present but unparseable quantity still counts as set, with value 0.
fn cpu_quantity(values: &BTreeMap<String, Quantity>, key: &str) -> Option<u64> {
    values.get(key).map(|quantity| {
        parse_cpu_millicores(&quantity.0).unwrap_or_else(|| {
            debug!(quantity = %quantity.0, "unparseable cpu quantity");
            0
        })
    })
}

fn memory_quantity(values: &BTreeMap<String, Quantity>, key: &str) -> Option<u64> {
    values.get(key).map(|quantity| {
        parse_memory_bytes(&quantity.0).unwrap_or_else(|| {
            debug!(quantity = %quantity.0, "unparseable memory quantity");
            0
        })
    })
}

/// Sums usage over every container of a `PodMetrics` object.
fn parse_pod_metrics_usage(data: &Value) -> (u64, u64) {
    let Some(containers) = data.get("containers").and_then(Value::as_array) else {
        return (0, 0);
    };

    containers
        .iter()
        .fold((0u64, 0u64), |(cpu, memory), container| {
            let (container_cpu, container_memory) = container
                .get("usage")
                .map(parse_usage_from_value)
                .unwrap_or((0, 0));
            (
                cpu.saturating_add(container_cpu),
                memory.saturating_add(container_memory),
            )
        })
}

fn parse_usage_from_value(value: &Value) -> (u64, u64) {
    let cpu = value
        .get("cpu")
        .and_then(Value::as_str)
        .and_then(parse_cpu_millicores)
        .unwrap_or(0);
    let memory = value
        .get("memory")
        .and_then(Value::as_str)
        .and_then(parse_memory_bytes)
        .unwrap_or(0);
    (cpu, memory)
}

#[cfg(test)]
mod tests {
    use super::{node_capacity, parse_pod_metrics_usage, pod_resources};
    use crate::model::ContainerResources;
    use k8s_openapi::api::core::v1::{Node, Pod};
    use serde_json::json;

    #[test]
    fn node_capacity_reads_allocatable() {
        let node: Node = serde_json::from_value(json!({
            "metadata": { "name": "worker-1" },
            "status": { "allocatable": { "cpu": "3920m", "memory": "16Gi", "pods": "110" } }
        }))
        .expect("node fixture");

        let capacity = node_capacity(&node);
        assert_eq!(capacity.name, "worker-1");
        assert_eq!(capacity.allocatable_cpu_millicores, 3_920);
        assert_eq!(capacity.allocatable_memory_bytes, 17_179_869_184);
    }

    #[test]
    fn node_without_status_has_zero_capacity() {
        let node: Node = serde_json::from_value(json!({ "metadata": { "name": "cordoned" } }))
            .expect("node fixture");
        let capacity = node_capacity(&node);
        assert_eq!(capacity.allocatable_cpu_millicores, 0);
        assert_eq!(capacity.allocatable_memory_bytes, 0);
    }

    #[test]
    fn pod_resources_keep_unset_fields_empty() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": { "name": "api-0", "namespace": "web" },
            "spec": {
                "nodeName": "worker-1",
                "containers": [
                    {
                        "name": "app",
                        "resources": {
                            "requests": { "cpu": "250m", "memory": "128Mi" },
                            "limits": { "memory": "256Mi" }
                        }
                    },
                    { "name": "sidecar" }
                ]
            }
        }))
        .expect("pod fixture");

        let resources = pod_resources(&pod);
        assert_eq!(resources.namespace, "web");
        assert_eq!(resources.node_name.as_deref(), Some("worker-1"));
        assert_eq!(
            resources.containers,
            vec![
                ContainerResources {
                    cpu_request_millicores: Some(250),
                    memory_request_bytes: Some(134_217_728),
                    cpu_limit_millicores: None,
                    memory_limit_bytes: Some(268_435_456),
                },
                ContainerResources::default(),
            ]
        );
    }

    #[test]
    fn pod_metrics_usage_sums_all_containers() {
        let data = json!({
            "containers": [
                { "name": "app", "usage": { "cpu": "1200000000n", "memory": "512Mi" } },
                { "name": "proxy", "usage": { "cpu": "300m", "memory": "64Mi" } }
            ]
        });
        assert_eq!(parse_pod_metrics_usage(&data), (1_500, 603_979_776));
        assert_eq!(parse_pod_metrics_usage(&json!({})), (0, 0));
    }
}
