//! Human-readable "expires in ..." phrases.
//!
//! The server hands the page a number of seconds until the secret expires.
//! `format_relative_duration` turns that into a future-tense phrase in the
//! coarsest whole unit (seconds, minutes, hours, days), pluralised for the
//! chosen locale. `render_expiry` is the one-shot binding that rewrites the
//! expiry element in place.

use std::collections::HashMap;

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use log::{error, warn};
use once_cell::sync::Lazy;

use crate::i18n::Locale;
use crate::page::Page;

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpiryError {
    #[error("no element with id `{0}`")]
    MissingElement(String),
    #[error("expiry is empty")]
    Empty,
    #[error("expiry must not be negative: {0}")]
    Negative(String),
    #[error("expiry is not a number: {0}")]
    Invalid(String),
    #[error("expiry is too large: {0}")]
    TooLarge(String),
}

/// Whole seconds until expiry, as read from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExpiryDuration(u64);

impl ExpiryDuration {
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Parse element text. Accepts non-negative integers and decimals
    /// (fractions are floored); rejects everything else, including values
    /// that do not fit in a `u64`.
    pub fn parse(text: &str) -> Result<Self, ExpiryError> {
        let s = text.trim();
        if s.is_empty() {
            return Err(ExpiryError::Empty);
        }
        if let Ok(n) = s.parse::<u64>() {
            return Ok(ExpiryDuration(n));
        }
        let value: f64 = s
            .parse()
            .map_err(|_| ExpiryError::Invalid(s.to_string()))?;
        if !value.is_finite() {
            return Err(ExpiryError::Invalid(s.to_string()));
        }
        if value < 0.0 {
            return Err(ExpiryError::Negative(s.to_string()));
        }
        // `u64::MAX as f64` rounds up to 2^64, the first value that overflows.
        if value >= u64::MAX as f64 {
            return Err(ExpiryError::TooLarge(s.to_string()));
        }
        Ok(ExpiryDuration(value.floor() as u64))
    }
}

/// Pick the coarsest unit that keeps the value at or above one, with the
/// value floored to whole units.
pub fn select_unit(seconds: u64) -> (u64, TimeUnit) {
    if seconds < MINUTE {
        (seconds, TimeUnit::Second)
    } else if seconds / MINUTE < 60 {
        (seconds / MINUTE, TimeUnit::Minute)
    } else if seconds / HOUR < 24 {
        (seconds / HOUR, TimeUnit::Hour)
    } else {
        (seconds / DAY, TimeUnit::Day)
    }
}

/// First supported locale in `preferences`, English when none matches.
fn resolve_locale(preferences: &[&str]) -> Locale {
    preferences
        .iter()
        .find_map(|tag| Locale::from_tag(tag))
        .unwrap_or(Locale::DEFAULT)
}

const EN_MESSAGES: &str = include_str!("../assets/i18n/en.ftl");
const RU_MESSAGES: &str = include_str!("../assets/i18n/ru.ftl");

static BUNDLES: Lazy<HashMap<Locale, FluentBundle<FluentResource>>> = Lazy::new(|| {
    [(Locale::En, EN_MESSAGES), (Locale::Ru, RU_MESSAGES)]
        .into_iter()
        .map(|(locale, source)| (locale, build_bundle(locale, source)))
        .collect()
});

fn build_bundle(locale: Locale, source: &str) -> FluentBundle<FluentResource> {
    let mut bundle = FluentBundle::new_concurrent(vec![locale.language_id()]);
    // Plain text goes into the page; no bidi isolation marks around `$n`.
    bundle.set_use_isolating(false);
    let resource = FluentResource::try_new(source.to_string()).unwrap_or_else(|(res, errors)| {
        error!("{} relative-time messages: {:?}", locale.tag(), errors);
        res
    });
    if let Err(errors) = bundle.add_resource(resource) {
        error!("{} relative-time messages: {:?}", locale.tag(), errors);
    }
    bundle
}

impl TimeUnit {
    fn message_id(&self) -> &'static str {
        match self {
            TimeUnit::Second => "expire-second",
            TimeUnit::Minute => "expire-minute",
            TimeUnit::Hour => "expire-hour",
            TimeUnit::Day => "expire-day",
        }
    }
}

/// Render `value` `unit`s in the future for `locale`. Plural forms come from
/// the locale's CLDR rules. Returns the message id if it is missing.
pub fn format_future(locale: Locale, value: u64, unit: TimeUnit) -> String {
    let id = unit.message_id();
    let Some(bundle) = BUNDLES.get(&locale) else {
        return id.to_string();
    };
    let Some(msg) = bundle.get_message(id) else {
        return id.to_string();
    };
    let Some(pattern) = msg.value() else {
        return id.to_string();
    };
    let mut args = FluentArgs::new();
    args.set("n", value);
    let mut errors = vec![];
    let phrase = bundle
        .format_pattern(pattern, Some(&args), &mut errors)
        .to_string();
    if !errors.is_empty() {
        warn!("formatting `{}` for {}: {:?}", id, locale.tag(), errors);
    }
    phrase
}

/// Describe `seconds` from now, e.g. `in 5 minutes`.
///
/// `locales` is an ordered preference list; the first supported tag wins.
/// Zero is rendered as `in 0 seconds`, never as "now".
pub fn format_relative_duration(seconds: u64, locales: &[&str]) -> String {
    let (value, unit) = select_unit(seconds);
    format_future(resolve_locale(locales), value, unit)
}

/// Single-locale shorthand for `format_relative_duration`.
pub fn relative_time(seconds: u64, locale: &str) -> String {
    format_relative_duration(seconds, &[locale])
}

/// Replace the seconds count in element `id` with its relative phrase.
///
/// Meant to run once at load. On invalid input the element keeps its text.
pub fn render_expiry(page: &mut Page, id: &str, locales: &[&str]) -> Result<String, ExpiryError> {
    let result = page
        .text(id)
        .ok_or_else(|| ExpiryError::MissingElement(id.to_string()))
        .and_then(ExpiryDuration::parse);

    match result {
        Ok(expiry) => {
            let phrase = format_relative_duration(expiry.as_secs(), locales);
            page.set_text(id, &phrase);
            Ok(phrase)
        }
        Err(e) => {
            warn!("leaving expiry untouched: {}", e);
            Err(e)
        }
    }
}
