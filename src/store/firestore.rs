use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::RemoteStoreConfig;

use super::{RemoteStore, StoreError};

/// Subset of a Google service account file we care about.
#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: String,
    #[serde(default)]
    client_email: String,
    /// Legacy database secret; sent as the `auth` query parameter when set.
    #[serde(default)]
    database_secret: Option<String>,
}

/// REST client for the Firebase realtime database.
///
/// Documents live under `/config/{key}.json`. The client is unusable
/// until `connect()` has loaded the service account file and verified
/// the database is reachable.
pub struct FirestoreClient {
    client: Client,
    config: RemoteStoreConfig,
    base_url: String,
    auth_token: Option<String>,
    connected: bool,
}

impl FirestoreClient {
    pub fn new(config: &RemoteStoreConfig) -> Result<Self, StoreError> {
        let parsed = Url::parse(&config.database_url).map_err(|source| StoreError::InvalidUrl {
            url: config.database_url.clone(),
            source,
        })?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            auth_token: None,
            connected: false,
        })
    }

    fn document_url(&self, key: &str) -> String {
        let mut url = format!("{}/config/{}.json", self.base_url, key);
        if let Some(token) = &self.auth_token {
            url.push_str(&format!("?auth={}", token));
        }
        url
    }

    async fn check_reachable(&self) -> Result<(), StoreError> {
        let mut url = format!("{}/.json?shallow=true", self.base_url);
        if let Some(token) = &self.auth_token {
            url.push_str(&format!("&auth={}", token));
        }

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedResponse { status, body });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteStore for FirestoreClient {
    #[instrument(skip(self))]
    async fn connect(&mut self) -> Result<(), StoreError> {
        let raw = std::fs::read_to_string(&self.config.credentials_path)?;
        let account: ServiceAccount = serde_json::from_str(&raw)?;

        if account.project_id != self.config.project_id {
            return Err(StoreError::ProjectMismatch {
                expected: self.config.project_id.clone(),
                found: account.project_id,
            });
        }

        self.auth_token = account.database_secret;

        debug!(
            project_id = %account.project_id,
            client_email = %account.client_email,
            "Verifying remote store is reachable"
        );
        self.check_reachable().await?;

        self.connected = true;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if !self.connected {
            return Err(StoreError::NotConnected);
        }

        debug!("Reading config document '{}'", key);

        let response = self.client.get(self.document_url(key)).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::UnexpectedResponse { status, body: text });
        }

        // The realtime database answers a missing path with a literal null.
        let value: Value = serde_json::from_str(&text)?;
        if value.is_null() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    #[instrument(skip(self, value))]
    async fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if !self.connected {
            return Err(StoreError::NotConnected);
        }

        debug!("Writing config document '{}'", key);

        let response = self
            .client
            .put(self.document_url(key))
            .json(value)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::UnexpectedResponse { status, body });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_config(database_url: &str) -> RemoteStoreConfig {
        RemoteStoreConfig::new("test-project", "/nonexistent/service-account.json", database_url)
            .unwrap()
    }

    #[test]
    fn test_invalid_database_url_rejected() {
        let config = store_config("not a url");
        assert!(matches!(
            FirestoreClient::new(&config),
            Err(StoreError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_document_url_layout() {
        let config = store_config("https://test-project.firebaseio.com/");
        let client = FirestoreClient::new(&config).unwrap();
        assert_eq!(
            client.document_url("trading"),
            "https://test-project.firebaseio.com/config/trading.json"
        );
    }

    #[test]
    fn test_document_url_carries_auth_token() {
        let config = store_config("https://test-project.firebaseio.com");
        let mut client = FirestoreClient::new(&config).unwrap();
        client.auth_token = Some("s3cret".to_string());
        assert_eq!(
            client.document_url("trading"),
            "https://test-project.firebaseio.com/config/trading.json?auth=s3cret"
        );
    }

    #[tokio::test]
    async fn test_read_before_connect_fails() {
        let config = store_config("https://test-project.firebaseio.com");
        let client = FirestoreClient::new(&config).unwrap();
        assert!(matches!(
            client.read("trading").await,
            Err(StoreError::NotConnected)
        ));
    }
}
