use chrono::{DateTime, Local};

use crate::input::Action;
use crate::model::{NodeAggregate, PodUsageSample};
use crate::top::{RefreshEvent, TopConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Report {
        nodes: Vec<NodeAggregate>,
    },
    Top {
        pods: Vec<PodUsageSample>,
        refresh_secs: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub resolved: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(self) -> u16 {
        if self.total == 0 || self.resolved >= self.total {
            return 100;
        }
        ((self.resolved * 100) / self.total) as u16
    }

    pub fn done(self) -> bool {
        self.percent() == 100
    }
}

/// Sole owner of everything drawn on screen. Refresh results reach it as
/// events and are applied on the rendering task.
#[derive(Debug, Clone)]
pub struct App {
    running: bool,
    context: String,
    cluster: String,
    view: View,
    progress: Progress,
    last_refresh: Option<DateTime<Local>>,
    status: String,
}

impl App {
    pub fn report(context: String, cluster: String, nodes: Vec<NodeAggregate>) -> Self {
        let status = format!("{} nodes", nodes.len());
        Self {
            running: true,
            context,
            cluster,
            view: View::Report { nodes },
            progress: Progress::default(),
            last_refresh: Some(Local::now()),
            status,
        }
    }

    pub fn top(context: String, cluster: String, config: &TopConfig) -> Self {
        Self {
            running: true,
            context,
            cluster,
            view: View::Top {
                pods: Vec::new(),
                refresh_secs: config.interval.as_secs(),
            },
            progress: Progress {
                resolved: 0,
                total: config.rows_limit,
            },
            last_refresh: None,
            status: "Fetching pod metrics…".to_string(),
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_refresh(&self) -> Option<String> {
        self.last_refresh
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn title(&self) -> String {
        match &self.view {
            View::Report { .. } => {
                "Resources reservations and limits by pods for each node".to_string()
            }
            View::Top { refresh_secs, .. } => {
                format!("Pods consuming most CPU (refreshes every {refresh_secs} seconds)")
            }
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        match &self.view {
            View::Report { .. } => NodeAggregate::table_headers().to_vec(),
            View::Top { .. } => PodUsageSample::table_headers().to_vec(),
        }
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        match &self.view {
            View::Report { nodes } => nodes.iter().map(NodeAggregate::table_columns).collect(),
            View::Top { pods, .. } => pods
                .iter()
                .enumerate()
                .map(|(index, pod)| pod.table_columns(index + 1))
                .collect(),
        }
    }

    pub fn apply_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
        }
    }

    /// Applies one refresh event. Within a cycle the latest progress wins;
    /// the table only changes when a cycle completes.
    pub fn update(&mut self, event: RefreshEvent) {
        match event {
            RefreshEvent::Progress { resolved, total } => {
                self.progress = Progress { resolved, total };
                if !self.progress.done() {
                    self.status = format!("Resolving nodes {resolved}/{total}");
                }
            }
            RefreshEvent::Completed { rows, refreshed_at } => {
                self.progress = Progress {
                    resolved: rows.len(),
                    total: rows.len(),
                };
                self.status = format!("{} pods shown", rows.len());
                self.last_refresh = Some(refreshed_at);
                if let View::Top { pods, .. } = &mut self.view {
                    *pods = rows;
                }
            }
            RefreshEvent::Failed { message } => {
                self.progress = Progress {
                    resolved: self.progress.total,
                    total: self.progress.total,
                };
                self.status = format!("Refresh failed: {message}");
            }
        }
    }
}
