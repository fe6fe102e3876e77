use crate::config::DataConfig;
use crate::error::FetchError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use tracing::info;

/// Anything that can hand over the raw facility records.
pub trait FacilitySource: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Value>, FetchError>> + Send;
}

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<Value>,
}

/// Client for the Paris open-data `records/1.0/search` API.
pub struct OpenDataClient {
    client: Client,
    endpoint: String,
    dataset: String,
    rows: u32,
}

impl OpenDataClient {
    pub fn new(config: &DataConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            dataset: config.dataset.clone(),
            rows: config.rows,
        })
    }
}

impl FacilitySource for OpenDataClient {
    async fn fetch_all(&self) -> Result<Vec<Value>, FetchError> {
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[("dataset", self.dataset.as_str())])
            .query(&[("rows", self.rows)])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = res.json::<RecordsResponse>().await?;
        info!("Fetched {} raw records from '{}'", body.records.len(), self.dataset);
        Ok(body.records)
    }
}
