//! HTTP API client for the tournament arrangement service.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tourney_lineup::arrangement::{
    Arrangement, ArrangementError, ArrangementResult, ContentItem, ContentType, RandomizeRequest,
    SaveArrangement,
};
use tourney_lineup::gateway::ArrangementGateway;

/// API client implementing the arrangement gateway over HTTP
pub struct ArrangementApiClient {
    base_url: String,
    client: reqwest::Client,
    access_token: Option<String>,
}

/// Save body: competition id plus the section order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest<'a> {
    competition_id: &'a str,
    #[serde(flatten)]
    arrangement: &'a SaveArrangement,
}

/// Randomize body: competition id plus the draw parameters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RandomizeBody<'a> {
    competition_id: &'a str,
    #[serde(flatten)]
    request: &'a RandomizeRequest,
}

fn transport_error(err: reqwest::Error) -> ArrangementError {
    if err.is_decode() {
        ArrangementError::MalformedPayload(err.to_string())
    } else {
        ArrangementError::Transport(err.to_string())
    }
}

impl ArrangementApiClient {
    /// Create a new API client
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            access_token: None,
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: String, timeout: Duration) -> ArrangementResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            access_token: None,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn arrangement_url(&self, competition_id: &str) -> String {
        format!(
            "{}/api/competitions/{}/arrangement",
            self.base_url, competition_id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Send a request and turn non-success statuses into `Remote` errors
    async fn send(&self, request: reqwest::RequestBuilder) -> ArrangementResult<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
            return Err(ArrangementError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> ArrangementResult<T> {
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| ArrangementError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
impl ArrangementGateway for ArrangementApiClient {
    async fn fetch_arrangement(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> ArrangementResult<Arrangement> {
        let request = self
            .client
            .get(self.arrangement_url(competition_id))
            .query(&[("contentType", content_type.as_str())]);

        let response = self.send(request).await?;
        Self::parse(response).await
    }

    async fn save_arrangement(
        &self,
        competition_id: &str,
        arrangement: &SaveArrangement,
    ) -> ArrangementResult<()> {
        let body = SaveRequest {
            competition_id,
            arrangement,
        };
        let request = self
            .client
            .post(self.arrangement_url(competition_id))
            .json(&body);

        self.send(request).await?;
        Ok(())
    }

    async fn randomize_arrangement(
        &self,
        competition_id: &str,
        request: &RandomizeRequest,
    ) -> ArrangementResult<Arrangement> {
        let body = RandomizeBody {
            competition_id,
            request,
        };
        let request = self
            .client
            .post(format!("{}/randomize", self.arrangement_url(competition_id)))
            .json(&body);

        let response = self.send(request).await?;
        Self::parse(response).await
    }

    async fn fetch_content_catalog(
        &self,
        competition_id: &str,
        content_type: ContentType,
    ) -> ArrangementResult<Vec<ContentItem>> {
        let request = self
            .client
            .get(format!(
                "{}/api/competitions/{}/contents",
                self.base_url, competition_id
            ))
            .query(&[("contentType", content_type.as_str())]);

        let response = self.send(request).await?;
        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_lineup::arrangement::{Gender, ItemFilters, ItemKind, ItemPlacement, SectionOrder};

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ArrangementApiClient::new("http://localhost:8080/".to_string());
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.arrangement_url("cup"),
            "http://localhost:8080/api/competitions/cup/arrangement"
        );
    }

    #[test]
    fn test_save_body_shape() {
        let arrangement = SaveArrangement {
            content_type: ContentType::Music,
            sections: vec![SectionOrder {
                content_id: "m1".to_string(),
                items: vec![ItemPlacement {
                    id: "t9".to_string(),
                    kind: ItemKind::Team,
                    order_index: 1,
                }],
            }],
        };
        let body = serde_json::to_value(SaveRequest {
            competition_id: "cup",
            arrangement: &arrangement,
        })
        .unwrap();

        assert_eq!(body["competitionId"], "cup");
        assert_eq!(body["contentType"], "MUSIC");
        assert_eq!(body["sections"][0]["contentId"], "m1");
        assert_eq!(body["sections"][0]["items"][0]["kind"], "TEAM");
        assert_eq!(body["sections"][0]["items"][0]["orderIndex"], 1);
    }

    #[test]
    fn test_randomize_body_shape() {
        let request = RandomizeRequest {
            content_type: ContentType::Quyen,
            randomize: true,
            filters: ItemFilters {
                gender: Some(Gender::Female),
                form_label: Some("Long Ho".to_string()),
            },
        };
        let body = serde_json::to_value(RandomizeBody {
            competition_id: "cup",
            request: &request,
        })
        .unwrap();

        assert_eq!(body["competitionId"], "cup");
        assert_eq!(body["contentType"], "QUYEN");
        assert_eq!(body["randomize"], true);
        assert_eq!(body["gender"], "female");
        assert_eq!(body["formLabel"], "Long Ho");
    }
}
