//! Best-effort extraction of stay parameters from free text.
//!
//! The decoder is a pattern matcher, not a grammar: it looks for ISO dates,
//! "next weekend", guest counts and a capitalized place name. Callers depend
//! on the [`IntentDecoder`] trait so a real NLU component can replace
//! [`HeuristicIntentDecoder`] without touching them.

use std::sync::OnceLock;

use chrono::{Datelike, Days, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedIntent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adults: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<u32>,
}

impl DecodedIntent {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub trait IntentDecoder: Send + Sync {
    fn decode(&self, text: &str) -> DecodedIntent;
}

#[derive(Clone, Debug, Default)]
pub struct HeuristicIntentDecoder {
    today: Option<NaiveDate>,
}

impl HeuristicIntentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins "today" for relative phrases such as "next weekend".
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

impl IntentDecoder for HeuristicIntentDecoder {
    fn decode(&self, text: &str) -> DecodedIntent {
        let mut intent = DecodedIntent::default();

        let dates = extract_iso_dates(text);
        if let Some(first) = dates.first() {
            intent.checkin = Some(first.clone());
            intent.checkout = dates.iter().find(|date| *date != first).cloned();
        } else if text.to_lowercase().contains("next weekend") {
            let (checkin, checkout) = next_weekend(self.today());
            intent.checkin = Some(checkin.format("%Y-%m-%d").to_string());
            intent.checkout = Some(checkout.format("%Y-%m-%d").to_string());
        }

        intent.adults = capture_count(adults_pattern(), text);
        intent.children = capture_count(children_pattern(), text);
        intent.text_query =
            location_pattern().captures(text).map(|captures| captures[1].to_string());

        intent
    }
}

/// Saturday strictly after `today`, and the Sunday that follows it.
pub fn next_weekend(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_sunday();
    let until_saturday = match (6 + 7 - weekday) % 7 {
        0 => 7,
        days => days,
    };
    let saturday = today + Days::new(u64::from(until_saturday));
    (saturday, saturday + Days::new(1))
}

fn extract_iso_dates(text: &str) -> Vec<String> {
    iso_date_pattern().find_iter(text).map(|found| found.as_str().to_string()).collect()
}

fn capture_count(pattern: &Regex, text: &str) -> Option<u32> {
    pattern.captures(text).and_then(|captures| captures[1].parse::<u32>().ok())
}

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b20\d{2}-(?:0[1-9]|1[0-2])-(?:[0-2]\d|3[01])\b").expect("static regex")
    })
}

fn adults_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b(\d+)\s+adults?\b").expect("static regex"))
}

fn children_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b(\d+)\s+child(?:ren)?\b").expect("static regex"))
}

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b").expect("static regex")
    })
}
