//! Upstream financial-data source

use crate::{FetchError, FinancialReport};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default timeout of one data-service call
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of the financial-data document for a stock code
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FinancialDataSource: Send + Sync {
    /// Fetch the document for `code`
    async fn fetch(&self, code: &str) -> Result<FinancialReport, FetchError>;
}

/// Client of the data service's `POST {base}/analyze` endpoint
pub struct HttpFinancialDataClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    code: &'a str,
}

impl HttpFinancialDataClient {
    /// Create a client with the default 30 second timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl FinancialDataSource for HttpFinancialDataClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch(&self, code: &str) -> Result<FinancialReport, FetchError> {
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&AnalyzeBody { code })
            .send()
            .await?;

        // the data service answers 200 only when the document is complete
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Data service rejected request");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let report: FinancialReport = serde_json::from_slice(&bytes)?;
        debug!(name = %report.name, risks = report.risks.len(), "Fetched financial data");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_posts_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(json!({"code": "000001"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "000001",
                "name": "Test Co",
                "price": {"latest_price": 12.5},
                "financial_metrics": {"roe": 15.2, "debt_ratio": 45.0, "revenue_growth": 8.0},
                "risks": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpFinancialDataClient::new(format!("{}/", server.uri())).unwrap();
        let report = tokio_test::assert_ok!(client.fetch("000001").await);

        assert_eq!(report.name, "Test Co");
        assert!((report.price.latest_price - 12.5).abs() < f64::EPSILON);
        assert_eq!(report.basic_info.pe_ttm, 0.0);
    }

    #[tokio::test]
    async fn test_fetch_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("stock not found"))
            .mount(&server)
            .await;

        let client = HttpFinancialDataClient::new(server.uri()).unwrap();
        let err = client.fetch("999999").await.unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "stock not found");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_other_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(json!({"code": "000001", "name": "Queued"})),
            )
            .mount(&server)
            .await;

        let client = HttpFinancialDataClient::new(server.uri()).unwrap();
        let err = client.fetch("000001").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 202, .. }));
    }

    #[tokio::test]
    async fn test_fetch_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = HttpFinancialDataClient::new(server.uri()).unwrap();
        let err = client.fetch("000001").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client =
            HttpFinancialDataClient::with_timeout(server.uri(), Duration::from_millis(100)).unwrap();
        let err = client.fetch("000001").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(ref e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_mock_source() {
        let mut source = MockFinancialDataSource::new();
        source
            .expect_fetch()
            .withf(|code: &str| code == "600519")
            .times(1)
            .returning(|_| Ok(FinancialReport::default()));

        let report = source.fetch("600519").await.unwrap();
        assert_eq!(report, FinancialReport::default());
    }
}
