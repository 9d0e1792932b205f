pub mod mesh;

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ClusterConfig;

/// Outcome of probing one service's health endpoint.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub name: String,
    pub url: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub namespace: String,
    pub checked_at: DateTime<Utc>,
    pub skipped: bool,
    pub services: Vec<ServiceHealth>,
}

/// Probes the `/healthz` endpoint of every configured service in the
/// deployment, one round per report request.
pub struct ClusterHealth {
    client: reqwest::Client,
    config: ClusterConfig,
    namespace: String,
}

impl ClusterHealth {
    pub fn new(config: ClusterConfig, namespace: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            namespace: namespace.into(),
        })
    }

    pub async fn check_all(&self) -> HealthReport {
        if self.config.skip {
            return HealthReport {
                namespace: self.namespace.clone(),
                checked_at: Utc::now(),
                skipped: true,
                services: Vec::new(),
            };
        }

        let mut services = Vec::with_capacity(self.config.services.len());
        for endpoint in &self.config.services {
            let url = format!("{}/healthz?full=true", endpoint.url.trim_end_matches('/'));
            info!("🩺 probing service health: {} ({url})", endpoint.name);
            services.push(self.probe(&endpoint.name, &url).await);
        }

        HealthReport {
            namespace: self.namespace.clone(),
            checked_at: Utc::now(),
            skipped: false,
            services,
        }
    }

    async fn probe(&self, name: &str, url: &str) -> ServiceHealth {
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                ServiceHealth {
                    name: name.to_string(),
                    url: url.to_string(),
                    reachable: true,
                    status: Some(status),
                    body: Some(body),
                    error: None,
                }
            }
            Err(err) => {
                warn!("service {name} unreachable: {err}");
                ServiceHealth {
                    name: name.to_string(),
                    url: url.to_string(),
                    reachable: false,
                    status: None,
                    body: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
