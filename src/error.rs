use thiserror::Error;

/// Failures that end a report or a refresh cycle. None of them are retried.
#[derive(Debug, Error)]
pub enum HoggersError {
    #[error("no kubeconfig available: pass --kubeconfig or set $KUBECONFIG")]
    MissingKubeconfig,

    #[error("failed to list {what}")]
    Listing {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to resolve node of pod {namespace}/{name}")]
    Resolution {
        namespace: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl HoggersError {
    pub fn listing(what: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Listing {
            what,
            source: source.into(),
        }
    }

    pub fn resolution(
        namespace: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Resolution {
            namespace: namespace.into(),
            name: name.into(),
            source: source.into(),
        }
    }
}
