use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Turns a listing title into the title shown to users.
///
/// The result is also what the listing signature hashes, so it must be
/// stable for the same input.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn display_title(&self, client: &Client, title: &str) -> String;
}

/// Japanese to English through the public Google Translate endpoint.
///
/// A translated title reads `"{english} ({japanese})"`. Any failure, an
/// empty result or an unchanged text keeps the original title.
pub struct GoogleTranslator {
    api_url: String,
    source: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            source: "ja".to_string(),
            target: "en".to_string(),
        }
    }

    async fn translate(&self, client: &Client, text: &str) -> Result<String> {
        let response = client
            .get(&self.api_url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source.as_str()),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .context("Failed to reach translate API")?
            .error_for_status()?;

        let data: serde_json::Value = response.json().await?;

        // [[["<translated>", "<source>", ...], ...], ...], one entry per sentence
        let segments = data[0]
            .as_array()
            .context("Translate response has no segments")?;
        let translated: String = segments
            .iter()
            .filter_map(|segment| segment[0].as_str())
            .collect();

        Ok(translated.trim().to_string())
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn display_title(&self, client: &Client, title: &str) -> String {
        match self.translate(client, title).await {
            Ok(english) if !english.is_empty() && english != title => {
                format!("{} ({})", english, title)
            }
            Ok(_) => {
                debug!("Translation left title unchanged: {}", title);
                title.to_string()
            }
            Err(e) => {
                let short: String = title.chars().take(50).collect();
                warn!("Translation failed for title: {}... | Error: {:#}", short, e);
                title.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator_for(server: &MockServer) -> GoogleTranslator {
        GoogleTranslator::new(format!("{}/translate_a/single", server.uri()))
    }

    #[tokio::test]
    async fn shows_english_with_original_in_parentheses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("sl", "ja"))
            .and(query_param("tl", "en"))
            .and(query_param("q", "ポーター タンカー"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                [["Porter Tanker", "ポーター タンカー", null, null, 10]],
                null,
                "ja"
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let title = translator_for(&server)
            .display_title(&Client::new(), "ポーター タンカー")
            .await;

        assert_eq!(title, "Porter Tanker (ポーター タンカー)");
    }

    #[tokio::test]
    async fn joins_sentence_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                [
                    ["Porter bag. ", "ポーター。", null, null, 10],
                    ["Unused", "未使用", null, null, 10]
                ],
                null,
                "ja"
            ])))
            .mount(&server)
            .await;

        let title = translator_for(&server)
            .display_title(&Client::new(), "ポーター。未使用")
            .await;

        assert_eq!(title, "Porter bag. Unused (ポーター。未使用)");
    }

    #[tokio::test]
    async fn keeps_title_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let title = translator_for(&server)
            .display_title(&Client::new(), "ヴィスヴィム")
            .await;

        assert_eq!(title, "ヴィスヴィム");
    }

    #[tokio::test]
    async fn keeps_title_on_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let title = translator_for(&server)
            .display_title(&Client::new(), "ヴィスヴィム")
            .await;

        assert_eq!(title, "ヴィスヴィム");
    }

    #[tokio::test]
    async fn keeps_title_when_translation_is_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                [["Porter Tanker", "Porter Tanker", null, null, 10]],
                null,
                "en"
            ])))
            .mount(&server)
            .await;

        let title = translator_for(&server)
            .display_title(&Client::new(), "Porter Tanker")
            .await;

        assert_eq!(title, "Porter Tanker");
    }
}
