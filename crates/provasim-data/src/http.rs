//! HTTP reference source.
//!
//! Fetches the same two JSON files a static site serves, once per
//! attempt start.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use provasim_core::error::ReferenceDataError;
use provasim_core::tables::{AnswerKeyTable, PositionTable};
use provasim_core::traits::ReferenceSource;

use crate::{ANSWER_KEYS_FILE, POSITIONS_FILE};

/// Loads the reference tables from a base URL.
#[derive(Debug, Clone)]
pub struct HttpReferenceSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpReferenceSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        file: &str,
        table: &'static str,
    ) -> Result<T, ReferenceDataError> {
        let url = format!("{}/{file}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|err| ReferenceDataError::Load {
                table,
                location: url.clone(),
                reason: err.to_string(),
            })?;

        let body = response
            .text()
            .await
            .map_err(|err| ReferenceDataError::Load {
                table,
                location: url.clone(),
                reason: err.to_string(),
            })?;
        tracing::debug!("fetched {table} from {url} ({} bytes)", body.len());

        serde_json::from_str(&body).map_err(|err| ReferenceDataError::Parse {
            table,
            location: url,
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl ReferenceSource for HttpReferenceSource {
    async fn load_positions(&self) -> Result<PositionTable, ReferenceDataError> {
        self.fetch(POSITIONS_FILE, "positions").await
    }

    async fn load_answer_keys(&self) -> Result<AnswerKeyTable, ReferenceDataError> {
        self.fetch(ANSWER_KEYS_FILE, "answer keys").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provasim_core::model::{ExamColor, OptionLetter, Subject};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_server(positions: &str, meta: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{POSITIONS_FILE}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(positions.to_string()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{ANSWER_KEYS_FILE}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(meta.to_string()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fetches_and_parses_both_tables() {
        let server = mock_server(
            r#"{"2023": {"CN": {"91": {"AZUL": 91, "ROSA": 95}}}}"#,
            r#"{"2023": {"CN": {"91": {"answer": "E"}}}}"#,
        )
        .await;

        let source = HttpReferenceSource::new(server.uri());
        let data = source.load_all().await.unwrap();

        assert_eq!(
            data.positions
                .variant_to_canonical(2023, Subject::Cn, ExamColor::Rosa, 95),
            Ok(91)
        );
        assert_eq!(
            data.answer_keys.entry(2023, Subject::Cn, 91).unwrap().answer,
            Some(OptionLetter::E)
        );
    }

    #[tokio::test]
    async fn http_error_status_is_a_load_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{POSITIONS_FILE}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpReferenceSource::new(server.uri());
        let err = source.load_positions().await.unwrap_err();
        assert!(matches!(err, ReferenceDataError::Load { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = mock_server("<html>oops</html>", "{}").await;
        let source = HttpReferenceSource::new(server.uri());
        let err = source.load_positions().await.unwrap_err();
        assert!(matches!(err, ReferenceDataError::Parse { .. }));
    }
}
