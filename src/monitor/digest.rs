use chrono::NaiveDate;
use html_escape::encode_text;
use indexmap::IndexMap;

use crate::config::Config;
use crate::models::{EMOJI_BULLET, EMOJI_SUMMARY};
use crate::telegram::message::plural_items;

/// New-item counts per keyword since the last digest, in first-seen order.
#[derive(Debug, Default)]
pub struct DailyDigest {
    counts: IndexMap<String, usize>,
}

impl DailyDigest {
    pub fn add(&mut self, keyword: &str, count: usize) {
        if count == 0 {
            return;
        }
        *self.counts.entry(keyword.to_string()).or_insert(0) += count;
    }

    #[cfg(test)]
    pub fn count(&self, keyword: &str) -> usize {
        self.counts.get(keyword).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn render(&self, date: NaiveDate, config: &Config) -> String {
        let mut lines = vec![format!("{} Mercari Summary — {}\n", EMOJI_SUMMARY, date.format("%Y-%m-%d"))];

        if self.is_empty() {
            lines.push("No activity recorded today.".to_string());
        } else {
            for (keyword, count) in &self.counts {
                lines.push(format!(
                    "{} {}: {} new {}",
                    EMOJI_BULLET,
                    encode_text(config.label_for(keyword)),
                    count,
                    plural_items(*count)
                ));
            }
        }

        lines.join("\n")
    }
}
