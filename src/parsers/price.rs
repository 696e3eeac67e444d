use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{Currency, Price};

static YEN_WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\d,]+)\s*yen")
        .expect("Invalid yen regex")
});

static SYMBOL_PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(¥|US\$|\$)\s*([\d,]+)")
        .expect("Invalid price regex")
});

/// Parse a price shown on a search card.
///
/// Understands `9,800 yen`, `¥9,800`, `US$ 65` and `$65`.
pub fn parse_price(text: &str) -> Option<Price> {
    if let Some(captures) = YEN_WORD_REGEX.captures(text) {
        return parse_amount(&captures[1]).map(|amount| Price::new(amount, Currency::Jpy));
    }

    let Some(captures) = SYMBOL_PRICE_REGEX.captures(text) else {
        debug!("No price found in text: {}", text);
        return None;
    };

    let currency = match &captures[1] {
        "¥" => Currency::Jpy,
        _ => Currency::Usd,
    };
    parse_amount(&captures[2]).map(|amount| Price::new(amount, currency))
}

fn parse_amount(raw: &str) -> Option<f64> {
    let digits = raw.replace(',', "");
    match digits.parse::<u64>() {
        Ok(value) => Some(value as f64),
        Err(_) => {
            debug!("Could not parse amount '{}'", raw);
            None
        }
    }
}

/// Format a yen amount for display, e.g. `¥12.345`.
pub fn format_yen_display(amount: f64) -> String {
    let whole = amount.max(0.0).trunc() as u64;
    let digits = whole.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("¥{}", grouped)
}
