use crate::models::subscription::Subscription;
use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Client for the backend that owns subscription records
pub struct SubscriptionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSubscriptionEnvelope {
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

impl SubscriptionClient {
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the subscription of `user_id`.
    /// A 404 or an empty envelope means the user has no subscription.
    pub async fn fetch_subscription(&self, user_id: &str) -> Result<Option<Subscription>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str()), ("user_id", user_id)])
            .send()
            .await
            .context("Failed to send request to subscription API")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            bail!(
                "Subscription API returned error status: {}",
                response.status()
            );
        }

        let envelope = response
            .json::<ApiSubscriptionEnvelope>()
            .await
            .context("Failed to parse JSON response from subscription API")?;

        Ok(envelope.subscription)
    }

    /// Push an upgraded or cancelled subscription back to the backend
    pub async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("api_key", &self.api_key)])
            .json(subscription)
            .send()
            .await
            .context("Failed to send subscription update to subscription API")?;

        if !response.status().is_success() {
            bail!(
                "Subscription API returned error status: {}",
                response.status()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = SubscriptionClient::new(
            "http://localhost:8000/api/subscriptions".to_string(),
            "test-api-key".to_string(),
        );
        assert!(client.is_ok());
        assert_eq!(
            client.unwrap().endpoint(),
            "http://localhost:8000/api/subscriptions"
        );
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope: ApiSubscriptionEnvelope = serde_json::from_str(
            r#"{"subscription":{"userId":"7","planName":"basic","status":"active","startDate":1,"endDate":2,"features":["patients"]}}"#,
        )
        .unwrap();
        assert_eq!(envelope.subscription.unwrap().plan_name, "basic");

        let empty: ApiSubscriptionEnvelope = serde_json::from_str("{}").unwrap();
        assert!(empty.subscription.is_none());
    }
}
