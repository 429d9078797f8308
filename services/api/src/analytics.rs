//! Azure Text Analytics client for post-class insights.

use crate::config::TextAnalyticsConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use classroom_core::analytics::{
    AnalyticsDocument, DocumentKeyPhrases, DocumentSentiment, TextAnalytics,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const API_PATH: &str = "text/analytics/v3.1";

#[derive(Serialize)]
struct RequestDocument<'a> {
    id: &'a str,
    language: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct AnalyticsRequest<'a> {
    documents: Vec<RequestDocument<'a>>,
}

impl<'a> AnalyticsRequest<'a> {
    fn new(documents: &'a [AnalyticsDocument]) -> Self {
        Self {
            documents: documents
                .iter()
                .map(|d| RequestDocument {
                    id: &d.id,
                    language: "en",
                    text: &d.text,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct AnalyticsResponse<T> {
    documents: Vec<T>,
}

pub struct AzureTextAnalytics {
    client: reqwest::Client,
    endpoint: String,
    key: String,
}

impl AzureTextAnalytics {
    pub fn new(client: reqwest::Client, config: &TextAnalyticsConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        }
    }

    fn url(&self, operation: &str) -> String {
        format!("{}/{API_PATH}/{operation}", self.endpoint)
    }

    async fn analyze<T: DeserializeOwned>(
        &self,
        operation: &str,
        documents: &[AnalyticsDocument],
    ) -> Result<Vec<T>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .post(self.url(operation))
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .json(&AnalyticsRequest::new(documents))
            .send()
            .await
            .with_context(|| format!("Text analytics {operation} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("Text analytics {operation} error: {status} - {detail}");
        }
        let body: AnalyticsResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Malformed text analytics {operation} response"))?;
        Ok(body.documents)
    }
}

#[async_trait]
impl TextAnalytics for AzureTextAnalytics {
    async fn sentiment(&self, documents: &[AnalyticsDocument]) -> Result<Vec<DocumentSentiment>> {
        self.analyze("sentiment", documents).await
    }

    async fn key_phrases(&self, documents: &[AnalyticsDocument]) -> Result<Vec<DocumentKeyPhrases>> {
        self.analyze("keyPhrases", documents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classroom_core::analytics::Sentiment;

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let client = AzureTextAnalytics::new(
            reqwest::Client::new(),
            &TextAnalyticsConfig {
                endpoint: "https://example.cognitiveservices.azure.com/".to_string(),
                key: "k".to_string(),
            },
        );
        assert_eq!(
            client.url("sentiment"),
            "https://example.cognitiveservices.azure.com/text/analytics/v3.1/sentiment"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let docs = vec![AnalyticsDocument {
            id: "42".to_string(),
            text: "Plants eat light.".to_string(),
        }];
        let json = serde_json::to_value(AnalyticsRequest::new(&docs)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "documents": [{ "id": "42", "language": "en", "text": "Plants eat light." }]
            })
        );
    }

    #[test]
    fn test_response_parsing_ignores_extra_fields() {
        let raw = r#"{
            "documents": [{
                "id": "1",
                "sentiment": "positive",
                "confidenceScores": { "positive": 0.9, "neutral": 0.08, "negative": 0.02 },
                "sentences": [],
                "warnings": []
            }],
            "errors": [],
            "modelVersion": "2022-11-01"
        }"#;
        let parsed: AnalyticsResponse<DocumentSentiment> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.documents[0].sentiment, Sentiment::Positive);

        let raw = r#"{"documents":[{"id":"1","keyPhrases":["chlorophyll","light"],"warnings":[]}]}"#;
        let parsed: AnalyticsResponse<DocumentKeyPhrases> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.documents[0].key_phrases, vec!["chlorophyll", "light"]);
    }

    #[tokio::test]
    async fn test_no_documents_skips_the_request() {
        let client = AzureTextAnalytics::new(
            reqwest::Client::new(),
            &TextAnalyticsConfig {
                endpoint: "http://127.0.0.1:1".to_string(),
                key: "k".to_string(),
            },
        );
        assert!(client.sentiment(&[]).await.unwrap().is_empty());
    }
}
