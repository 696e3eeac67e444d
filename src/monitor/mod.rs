pub mod digest;
pub mod schedule;

use chrono::Local;
use reqwest::Client;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{Currency, Listing};
use crate::parsers::format_yen_display;
use crate::scrapers::ListingFetcher;
use crate::storage::{SeenItemId, SeenItemStore, Storage};
use crate::telegram::{message, Notifier};
use crate::utils::exchange_rate::ExchangeRateClient;
use crate::utils::translate::Translator;
use digest::DailyDigest;
use schedule::DailyTrigger;

/// Pause between two item notifications.
const NOTIFICATION_DELAY: Duration = Duration::from_secs(1);

/// Owns the seen-item store and drives the keyword sweep and daily digest.
pub struct Monitor {
    config: Arc<Config>,
    client: Client,
    fetcher: Box<dyn ListingFetcher>,
    notifier: Box<dyn Notifier>,
    storage: Box<dyn Storage>,
    exchange_rates: ExchangeRateClient,
    translator: Box<dyn Translator>,
    seen: SeenItemStore,
    dirty: bool,
    digest: DailyDigest,
    notification_delay: Duration,
}

impl Monitor {
    pub async fn new(
        config: Arc<Config>,
        client: Client,
        fetcher: Box<dyn ListingFetcher>,
        notifier: Box<dyn Notifier>,
        storage: Box<dyn Storage>,
        exchange_rates: ExchangeRateClient,
        translator: Box<dyn Translator>,
    ) -> Self {
        let seen = storage.load(config.max_seen_items).await;

        Self {
            config,
            client,
            fetcher,
            notifier,
            storage,
            exchange_rates,
            translator,
            seen,
            dirty: false,
            digest: DailyDigest::default(),
            notification_delay: NOTIFICATION_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_notification_delay(mut self, delay: Duration) -> Self {
        self.notification_delay = delay;
        self
    }

    pub fn seen(&self) -> &SeenItemStore {
        &self.seen
    }

    #[cfg(test)]
    pub fn digest(&self) -> &DailyDigest {
        &self.digest
    }

    /// Search one keyword and notify every listing not seen before.
    ///
    /// Returns the number of new listings. A failed fetch counts as zero.
    pub async fn process_keyword(&mut self, keyword: &str) -> usize {
        let label = self.config.label_for(keyword).to_string();
        info!("Starting search for keyword: {} ({})", keyword, label);

        let listings = match self.fetcher.fetch(&self.client, keyword).await {
            Ok(listings) => listings,
            Err(e) => {
                error!("Failed to fetch listings for keyword '{}': {}", keyword, e);
                return 0;
            }
        };

        let listings = self.translate_titles(listings).await;
        let fresh = self.unseen(listings);
        if fresh.is_empty() {
            info!("No new items found for keyword: {}", keyword);
            return 0;
        }

        info!("Sending {} new items for keyword: {}", fresh.len(), keyword);
        self.notify_text(&message::keyword_header(&label)).await;

        // Newest results come first on the page; post them last
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        for (i, (signature, listing)) in fresh.iter().rev().enumerate() {
            if i > 0 && !self.notification_delay.is_zero() {
                sleep(self.notification_delay).await;
            }

            let yen = self
                .exchange_rates
                .convert(&self.client, listing.price.amount, listing.price.currency, Currency::Jpy)
                .await;
            let caption = message::listing_caption(listing, &format_yen_display(yen), &timestamp);

            if let Err(e) = self.notifier.send(&caption, listing.image_url.as_deref()).await {
                error!("Failed to send notification for {}: {:#}", listing.title, e);
            }

            // Marked seen even when delivery failed
            self.seen.record(signature.clone());
            self.dirty = true;
            info!("New item found: {} at {}", listing.title, listing.price_text);
        }

        self.notify_text(&message::keyword_footer(&label, fresh.len())).await;
        self.digest.add(keyword, fresh.len());
        self.persist().await;

        fresh.len()
    }

    // Signatures hash the display title, so this runs before de-duplication
    async fn translate_titles(&self, mut listings: Vec<Listing>) -> Vec<Listing> {
        for listing in &mut listings {
            listing.title = self
                .translator
                .display_title(&self.client, &listing.title)
                .await;
        }
        listings
    }

    fn unseen(&self, listings: Vec<Listing>) -> Vec<(SeenItemId, Listing)> {
        let mut batch = HashSet::new();
        listings
            .into_iter()
            .filter_map(|listing| {
                let signature = listing.signature();
                if self.seen.contains(&signature) || !batch.insert(signature.clone()) {
                    None
                } else {
                    Some((signature, listing))
                }
            })
            .collect()
    }

    async fn notify_text(&self, text: &str) {
        if let Err(e) = self.notifier.send(text, None).await {
            error!("Failed to send message: {:#}", e);
        }
    }

    /// Write the seen store if it changed since the last successful save.
    pub async fn persist(&mut self) {
        if !self.dirty {
            return;
        }
        if self.storage.save(&self.seen).await.is_ok() {
            self.dirty = false;
        }
    }

    pub async fn send_digest(&mut self) {
        let text = self.digest.render(Local::now().date_naive(), &self.config);
        self.notify_text(&text).await;
        self.digest.clear();
        info!("Daily summary sent and daily counts cleared");
    }

    /// Run the keyword sweep and the daily digest until `shutdown` resolves.
    ///
    /// Both are timers on the same loop, so a long sweep only delays the
    /// digest by the keyword in progress.
    pub async fn run<S>(&mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let keywords: Vec<String> = self.config.keywords.keys().cloned().collect();
        if keywords.is_empty() {
            warn!("No keywords configured, nothing to monitor");
            return;
        }

        let mut trigger = DailyTrigger::new(self.config.daily_summary_time);
        let mut next_keyword = 0;

        let sweep = sleep(Duration::ZERO);
        let digest = sleep(trigger.delay_until_next(Local::now().naive_local()));
        tokio::pin!(shutdown, sweep, digest);

        info!("Mercari monitor is running with {} keywords", keywords.len());

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut digest => {
                    self.send_digest().await;
                    let now = Local::now().naive_local();
                    trigger.mark_fired(now);
                    digest.as_mut().reset(Instant::now() + trigger.delay_until_next(now));
                }
                _ = &mut sweep => {
                    let keyword = &keywords[next_keyword];
                    self.process_keyword(keyword).await;

                    next_keyword += 1;
                    let delay = if next_keyword == keywords.len() {
                        next_keyword = 0;
                        self.persist().await;
                        info!(
                            "Finished a full cycle of keyword searches, next cycle in {:?}",
                            self.config.full_cycle_delay
                        );
                        self.config.full_cycle_delay
                    } else {
                        self.config.keyword_batch_delay
                    };
                    sweep.as_mut().reset(Instant::now() + delay);
                }
            }
        }

        self.persist().await;
        self.notify_text(&message::stopped_message()).await;
    }
}
