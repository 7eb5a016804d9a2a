use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};


#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}


/// One liveness check against the monitored host.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Returns the observed latency if the host is reachable.
    async fn check(&self) -> Result<Duration, ProbeError>;
}


#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: Url,
}

impl HttpProbe {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self>
    {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ispmon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let url = Url::parse(url)?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url
    {
        &self.url
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> Result<Duration, ProbeError>
    {
        let started = Instant::now();

        let response = self.client.get(self.url.clone()).send().await
            .inspect_err(|e| warn!("probe of {} failed: {}", self.url, e))?;
        let status = response.status();
        // the request only counts as complete once the body has arrived
        let body = response.bytes().await
            .inspect_err(|e| warn!("probe of {} failed while reading body: {}", self.url, e))?;

        if status != StatusCode::OK {
            warn!("probe of {} returned {}", self.url, status);
            return Err(ProbeError::Status(status));
        }

        let latency = started.elapsed();
        debug!(url = %self.url, bytes = body.len(), ?latency, "probe succeeded");
        Ok(latency)
    }
}


#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn probe_for(server: &MockServer, timeout: Duration) -> HttpProbe
    {
        HttpProbe::new(&format!("{}/generate_204", server.uri()), timeout).unwrap()
    }

    #[tokio::test]
    async fn ok_status_is_reachable()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let probe = probe_for(&server, Duration::from_secs(5)).await;
        assert!(probe.check().await.is_ok());
    }

    #[tokio::test]
    async fn other_success_statuses_are_unreachable()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let probe = probe_for(&server, Duration::from_secs(5)).await;
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, ProbeError::Status(StatusCode::NO_CONTENT)));
    }

    #[tokio::test]
    async fn server_errors_are_unreachable()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = probe_for(&server, Duration::from_secs(5)).await;
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, ProbeError::Status(StatusCode::SERVICE_UNAVAILABLE)));
    }

    #[tokio::test]
    async fn timeout_is_unreachable()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let probe = probe_for(&server, Duration::from_millis(200)).await;
        match probe.check().await {
            Err(ProbeError::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable()
    {
        // bind and drop to get a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let probe = HttpProbe::new(&format!("http://127.0.0.1:{port}/"), Duration::from_secs(1)).unwrap();
        assert!(matches!(probe.check().await, Err(ProbeError::Transport(_))));
    }
}
