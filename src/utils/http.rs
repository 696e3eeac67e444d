use anyhow::Result;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::FetchError;

pub fn create_client(user_agent: &str) -> Result<Client> {
    let client = ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .cookie_store(true)
        .pool_max_idle_per_host(4)
        .build()?;

    Ok(client)
}

/// GET `url`, retrying up to `max_retries` times in total.
///
/// The wait before attempt `n + 1` is `base_delay * n`.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    max_retries: u32,
    base_delay: Duration,
) -> Result<Response, FetchError> {
    let mut attempts = 0;

    loop {
        let error = match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                warn!("HTTP error {}: {}", status, url);
                FetchError::Status {
                    status,
                    url: url.to_string(),
                }
            }
            Err(e) => {
                error!("Request failed for {}: {}", url, e);
                FetchError::Http(e)
            }
        };

        attempts += 1;
        if attempts >= max_retries.max(1) {
            return Err(error);
        }

        let delay = base_delay * attempts;
        warn!("Retrying in {:?}... (attempt {}/{})", delay, attempts + 1, max_retries);
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = Client::new();
        let response = fetch_with_retry(&client, &format!("{}/page", server.uri()), 3, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = Client::new();
        let err = fetch_with_retry(&client, &format!("{}/page", server.uri()), 3, Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 429));
    }
}
