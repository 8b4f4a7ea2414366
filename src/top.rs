//! Live view of the pods consuming the most CPU.
//!
//! The refresh loop runs on its own task and never touches display state.
//! Everything it learns travels as [`RefreshEvent`]s to the single owner of
//! the terminal, which applies them in order.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::error::HoggersError;
use crate::k8s::{ClusterLister, MetricsLister};
use crate::model::PodUsageSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopConfig {
    pub interval: Duration,
    pub rows_limit: usize,
    /// Log a failed cycle and wait for the next one instead of exiting.
    pub keep_going: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    Progress {
        resolved: usize,
        total: usize,
    },
    Completed {
        rows: Vec<PodUsageSample>,
        refreshed_at: DateTime<Local>,
    },
    Failed {
        message: String,
    },
}

/// Orders samples by CPU usage, highest first, and keeps the top `limit`.
/// Equal CPU keeps the incoming order.
pub fn rank_top(mut samples: Vec<PodUsageSample>, limit: usize) -> Vec<PodUsageSample> {
    samples.sort_by(|left, right| right.cpu_millicores.cmp(&left.cpu_millicores));
    samples.truncate(limit);
    samples
}

/// Runs refresh cycles until the receiving side goes away or a cycle fails
/// without `keep_going`.
pub async fn run_refresh_loop(
    cluster: Arc<dyn ClusterLister>,
    metrics: Arc<dyn MetricsLister>,
    config: TopConfig,
    events: UnboundedSender<RefreshEvent>,
) -> Result<(), HoggersError> {
    loop {
        if events.is_closed() {
            return Ok(());
        }

        let cycle =
            refresh_cycle(cluster.as_ref(), metrics.as_ref(), config.rows_limit, &events).await;
        match cycle {
            Ok(Some(rows)) => {
                let completed = RefreshEvent::Completed {
                    rows,
                    refreshed_at: Local::now(),
                };
                if events.send(completed).is_err() {
                    return Ok(());
                }
            }
            Ok(None) => return Ok(()),
            Err(error) if config.keep_going => {
                let message = format!("{:#}", anyhow::Error::new(error));
                warn!(error = %message, "refresh cycle failed, waiting for the next one");
                if events.send(RefreshEvent::Failed { message }).is_err() {
                    return Ok(());
                }
            }
            Err(error) => return Err(error),
        }

        sleep(config.interval).await;
    }
}

/// Fetches, ranks and resolves one cycle. Returns `None` when the receiver
/// was dropped part way through.
pub async fn refresh_cycle(
    cluster: &dyn ClusterLister,
    metrics: &dyn MetricsLister,
    rows_limit: usize,
    events: &UnboundedSender<RefreshEvent>,
) -> Result<Option<Vec<PodUsageSample>>, HoggersError> {
    let started = Instant::now();
    let samples = metrics
        .list_pod_metrics()
        .await
        .map_err(|error| HoggersError::listing("pod metrics", error))?;
    let sampled = samples.len();
    let mut rows = rank_top(samples, rows_limit);
    let total = rows.len();

    if events
        .send(RefreshEvent::Progress { resolved: 0, total })
        .is_err()
    {
        return Ok(None);
    }

    for (index, row) in rows.iter_mut().enumerate() {
        if events.is_closed() {
            return Ok(None);
        }
        row.node = cluster
            .pod_node(&row.namespace, &row.name)
            .await
            .map_err(|error| HoggersError::resolution(&row.namespace, &row.name, error))?;
        debug!(pod = %row, node = row.node.as_deref().unwrap_or("-"), "resolved pod node");
        if events
            .send(RefreshEvent::Progress {
                resolved: index + 1,
                total,
            })
            .is_err()
        {
            return Ok(None);
        }
    }

    info!(
        sampled,
        shown = total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "refresh cycle complete"
    );
    Ok(Some(rows))
}
