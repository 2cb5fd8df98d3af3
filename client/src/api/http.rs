use super::utils::{authenticated_request, network_error, send};
use super::{ListApi, MutationMethod};
use crate::config::ClientConfig;
use crate::session::Session;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method};
use serde_json::Value;
use shared::dto::common::MutationResponse;
use shared::error::{ClientError, Result};
use shared::query::ListQuery;

/// `ListApi` over the backend's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(network_error)?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

#[async_trait]
impl ListApi for HttpApi {
    async fn get_list(&self, session: &Session, path: &str, query: &ListQuery) -> Result<String> {
        let url = self.url(&query.apply_to(path));
        let request = authenticated_request(&self.client, Method::GET, &url, session)?;
        let response = send(request).await?;
        let body = response.text().await.map_err(network_error)?;
        debug!("GET {} returned {} bytes", url, body.len());
        Ok(body)
    }

    async fn export(&self, session: &Session, path: &str, query: &ListQuery) -> Result<Vec<u8>> {
        let url = self.url(&query.apply_to(path));
        let request = authenticated_request(&self.client, Method::GET, &url, session)?
            .header("Accept", "text/csv");
        let response = send(request).await?;
        let bytes = response.bytes().await.map_err(network_error)?;
        info!("Exported {} bytes from {}", bytes.len(), path);
        Ok(bytes.to_vec())
    }

    async fn mutate(
        &self,
        session: &Session,
        method: MutationMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<MutationResponse> {
        let url = self.url(path);
        let http_method = match method {
            MutationMethod::Post => Method::POST,
            MutationMethod::Put => Method::PUT,
            MutationMethod::Delete => Method::DELETE,
        };
        let mut request = authenticated_request(&self.client, http_method, &url, session)?;
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = send(request).await?;
        let text = response.text().await.map_err(network_error)?;
        if text.trim().is_empty() {
            // 204 and friends
            return Ok(MutationResponse::ok());
        }
        serde_json::from_str(&text).map_err(|e| {
            ClientError::Decode(format!("{} {} returned an unexpected body: {}", method, path, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::filter::FilterState;
    use shared::query::build_query;

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let config = ClientConfig {
            // Nothing listens here; the request must not be attempted.
            api_url: "http://127.0.0.1:9".to_string(),
            ..ClientConfig::default()
        };
        let api = tokio_test::assert_ok!(HttpApi::new(&config));
        let query = build_query(&FilterState::new(), None, 1, 25);

        let result = api.get_list(&Session::new(), "/api/admin/tickets", &query).await;
        assert!(matches!(result, Err(ClientError::Auth(_))));

        let result = api
            .mutate(&Session::new(), MutationMethod::Delete, "/api/admin/tickets/1", None)
            .await;
        assert!(matches!(result, Err(ClientError::Auth(_))));
    }
}
