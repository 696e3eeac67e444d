use async_trait::async_trait;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::FetchError;
use crate::models::{item_id_from_url, Listing};
use crate::parsers::{clean_text, parse_price};
use crate::scrapers::ListingFetcher;
use crate::utils::http::fetch_with_retry;

const MAX_RETRIES: u32 = 3;

// Buyee fills the result iframe from an inline script instead of a src attribute
static IFRAME_SRC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"document\.querySelector\('#search_result_iframe'\)\.src\s*=\s*'([^']+)'")
        .expect("Invalid iframe regex")
});

static IFRAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe#search_result_iframe").expect("Invalid selector"));
static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("Invalid selector"));
static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.simple_item__Ewdl1").expect("Invalid selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.simple_container__llX1q").expect("Invalid selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.simple_name__XMcbt").expect("Invalid selector"));
static PRICE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.simple_price__h13DP").expect("Invalid selector"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img.cdn_container__T7Lek").expect("Invalid selector"));

/// Mercari search through the Buyee proxy, newest listings first.
pub struct BuyeeScraper {
    base_url: String,
    retry_delay: Duration,
}

impl BuyeeScraper {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            retry_delay: Duration::from_secs(2),
        }
    }

    #[cfg(test)]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}/mercari/search?keyword={}&order-sort=desc-created_time&status=on_sale",
            self.base_url.trim_end_matches('/'),
            utf8_percent_encode(keyword, NON_ALPHANUMERIC)
        )
    }

    async fn get_html(&self, client: &Client, url: &str) -> Result<String, FetchError> {
        let response = fetch_with_retry(client, url, MAX_RETRIES, self.retry_delay).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ListingFetcher for BuyeeScraper {
    async fn fetch(&self, client: &Client, keyword: &str) -> Result<Vec<Listing>, FetchError> {
        info!("Checking keyword: {}", keyword);

        let parent_url = self.search_url(keyword);
        debug!("Fetching parent URL: {}", parent_url);
        let parent_html = self.get_html(client, &parent_url).await?;

        let iframe_url = extract_iframe_url(&parent_html, &self.base_url)?;
        debug!("Extracted iframe URL: {}", iframe_url);

        let results_html = self.get_html(client, &iframe_url).await?;
        let listings = extract_listings(&results_html, &self.base_url, keyword);

        if listings.is_empty() {
            warn!("No item elements found for keyword: {}", keyword);
        } else {
            info!("Found {} potential items for keyword: {}", listings.len(), keyword);
        }
        Ok(listings)
    }
}

fn extract_iframe_url(html: &str, base_url: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);

    if document.select(&IFRAME_SELECTOR).next().is_none() {
        return Err(FetchError::Parse("could not find search_result_iframe".to_string()));
    }

    let src = document
        .select(&SCRIPT_SELECTOR)
        .map(|script| script.text().collect::<String>())
        .find_map(|content| {
            IFRAME_SRC_REGEX
                .captures(&content)
                .map(|captures| captures[1].to_string())
        })
        .ok_or_else(|| {
            FetchError::Parse("could not extract iframe URL from page scripts".to_string())
        })?;

    absolute_url(base_url, &src)
        .ok_or_else(|| FetchError::Parse(format!("invalid iframe URL '{}'", src)))
}

fn extract_listings(html: &str, base_url: &str, keyword: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);

    document
        .select(&ITEM_SELECTOR)
        .filter_map(|element| parse_item(element, base_url, keyword))
        .collect()
}

fn parse_item(element: ElementRef<'_>, base_url: &str, keyword: &str) -> Option<Listing> {
    let link = element.select(&LINK_SELECTOR).next()?;
    let href = link.value().attr("href").filter(|href| !href.is_empty())?;
    let item_url = absolute_url(base_url, href)?;

    let title = link
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| clean_text(&title.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "No title".to_string());

    let price_text = link
        .select(&PRICE_SELECTOR)
        .next()
        .map(|price| clean_text(&price.text().collect::<String>()))
        .unwrap_or_default();

    let Some(price) = parse_price(&price_text) else {
        debug!("Skipping item due to unparseable price: {} ({})", title, price_text);
        return None;
    };

    let image_url = link
        .select(&IMAGE_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .and_then(|src| absolute_url(base_url, src));

    Some(Listing {
        id: item_id_from_url(&item_url),
        title,
        price,
        price_text,
        image_url,
        item_url,
        keyword: keyword.to_string(),
    })
}

fn absolute_url(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Price};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parent_page(iframe_src: &str) -> String {
        format!(
            r#"<html><body>
                <iframe id="search_result_iframe"></iframe>
                <script>var x = 1;</script>
                <script>document.querySelector('#search_result_iframe').src = '{}';</script>
            </body></html>"#,
            iframe_src
        )
    }

    const RESULTS_PAGE: &str = r#"<html><body>
        <div class="simple_item__Ewdl1">
          <a class="simple_container__llX1q" href="/mercari/item/m111?conversionType=Mercari">
            <img class="cdn_container__T7Lek" src="https://static.mercdn.net/item/m111.jpg">
            <span class="simple_name__XMcbt">PORTER  tanker &amp; wallet</span>
            <span class="simple_price__h13DP">9,800 yen</span>
          </a>
        </div>
        <div class="simple_item__Ewdl1">
          <a class="simple_container__llX1q" href="/mercari/item/m222">
            <span class="simple_name__XMcbt">Visvim boots</span>
            <span class="simple_price__h13DP">US$ 120</span>
          </a>
        </div>
        <div class="simple_item__Ewdl1">
          <a class="simple_container__llX1q" href="/mercari/item/m333">
            <span class="simple_name__XMcbt">Sold out</span>
            <span class="simple_price__h13DP">---</span>
          </a>
        </div>
        <div class="simple_item__Ewdl1"><span>advert</span></div>
    </body></html>"#;

    #[test]
    fn parses_result_cards() {
        let listings = extract_listings(RESULTS_PAGE, "https://buyee.jp", "porter");

        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.id, "m111");
        assert_eq!(first.title, "PORTER tanker & wallet");
        assert_eq!(first.price, Price::new(9800.0, Currency::Jpy));
        assert_eq!(first.price_text, "9,800 yen");
        assert_eq!(
            first.item_url,
            "https://buyee.jp/mercari/item/m111?conversionType=Mercari"
        );
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://static.mercdn.net/item/m111.jpg")
        );
        assert_eq!(first.keyword, "porter");

        let second = &listings[1];
        assert_eq!(second.id, "m222");
        assert_eq!(second.price, Price::new(120.0, Currency::Usd));
        assert_eq!(second.image_url, None);
    }

    #[test]
    fn missing_iframe_is_a_parse_error() {
        let err = extract_iframe_url("<html><body></body></html>", "https://buyee.jp").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn iframe_without_script_is_a_parse_error() {
        let html = r#"<iframe id="search_result_iframe"></iframe>"#;
        let err = extract_iframe_url(html, "https://buyee.jp").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn search_url_encodes_keyword() {
        let scraper = BuyeeScraper::new("https://buyee.jp/");
        assert_eq!(
            scraper.search_url("ポーター タンカー"),
            "https://buyee.jp/mercari/search?keyword=%E3%83%9D%E3%83%BC%E3%82%BF%E3%83%BC%20%E3%82%BF%E3%83%B3%E3%82%AB%E3%83%BC&order-sort=desc-created_time&status=on_sale"
        );
    }

    #[tokio::test]
    async fn fetches_through_iframe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mercari/search"))
            .and(query_param("keyword", "porter"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(parent_page("/mercari/search_results?keyword=porter")),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mercari/search_results"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let scraper = BuyeeScraper::new(server.uri()).with_retry_delay(Duration::ZERO);
        let listings = scraper.fetch(&Client::new(), "porter").await.unwrap();

        assert_eq!(
            listings.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec!["m111", "m222"]
        );
        assert!(listings[0].item_url.starts_with(&server.uri()));
    }

    #[tokio::test]
    async fn blocked_search_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(3)
            .mount(&server)
            .await;

        let scraper = BuyeeScraper::new(server.uri()).with_retry_delay(Duration::ZERO);
        let err = scraper.fetch(&Client::new(), "porter").await.unwrap_err();

        assert!(matches!(err, FetchError::Status { .. }));
    }
}
