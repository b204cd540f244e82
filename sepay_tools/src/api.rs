use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::{config::SepayConfig, data_objects::SearchResponse, SepayApiError, SepayTransaction};

#[derive(Clone)]
pub struct SepayApi {
    config: SepayConfig,
    client: Arc<Client>,
}

impl SepayApi {
    pub fn new(config: SepayConfig) -> Result<Self, SepayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut val = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| SepayApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| SepayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &SepayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    pub async fn rest_query<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, SepayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.get(url);
        if !params.is_empty() {
            req = req.query(params);
        }
        let response = req.send().await.map_err(|e| SepayApiError::RestRequestError(e.to_string()))?;
        match response.status() {
            s if s.is_success() => {
                trace!("REST query successful. {s}");
                response.json::<T>().await.map_err(|e| SepayApiError::JsonError(e.to_string()))
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SepayApiError::Unauthorized),
            s => {
                let status = s.as_u16();
                let message = response.text().await.map_err(|e| SepayApiError::RestResponseError(e.to_string()))?;
                Err(SepayApiError::QueryError { status, message })
            },
        }
    }

    /// Transactions whose memo contains `add_info`, most recent first.
    pub async fn search_transactions(&self, add_info: &str) -> Result<Vec<SepayTransaction>, SepayApiError> {
        debug!("💳️ Searching SePay transactions for {add_info}");
        let res = self.rest_query::<SearchResponse>("/transactions/search", &[("addInfo", add_info)]).await?;
        if !res.success {
            debug!("💳️ SePay reported no success for {add_info}");
            return Ok(Vec::new());
        }
        trace!("💳️ SePay returned {} transactions for {add_info}", res.data.len());
        Ok(res.data)
    }

    /// The most recent transaction whose memo carries `add_info` as a whole reference, if any. The search itself
    /// matches substrings, so longer references sharing the same prefix are skipped.
    pub async fn latest_transaction(&self, add_info: &str) -> Result<Option<SepayTransaction>, SepayApiError> {
        let found = self.search_transactions(add_info).await?;
        Ok(latest_for_reference(found, add_info))
    }
}

fn latest_for_reference(transactions: Vec<SepayTransaction>, reference: &str) -> Option<SepayTransaction> {
    transactions.into_iter().find(|tx| {
        let keep = tx.carries_reference(reference);
        if !keep {
            debug!("💳️ Skipping SePay transaction {}: \"{}\" does not carry {reference}", tx.id(), tx.memo());
        }
        keep
    })
}
