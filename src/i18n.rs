//! UI localisation.
//!
//! Supported languages: English (`en`, default) and Russian (`ru`). The
//! locale comes from the environment's reported language and collapses to one
//! of the two with a simple prefix rule. Translatable elements carry a key;
//! `apply_locale` swaps their text for the table entry when one exists.

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    Ru,
}

impl Locale {
    pub const DEFAULT: Locale = Locale::En;

    pub fn tag(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }

    /// Language identifier used to pick CLDR plural rules.
    pub fn language_id(&self) -> LanguageIdentifier {
        self.tag().parse().unwrap_or_default()
    }

    /// Match the primary subtag of `tag` (`ru-RU`, `ru_RU.UTF-8`, `EN`).
    pub fn from_tag(tag: &str) -> Option<Locale> {
        let primary = tag.split(['-', '_', '.']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Locale::En),
            "ru" => Some(Locale::Ru),
            _ => None,
        }
    }
}

/// Collapse a reported language preference to a supported locale: anything
/// starting with `ru` is Russian, everything else English.
pub fn detect_locale(preference: &str) -> Locale {
    if preference.starts_with("ru") {
        Locale::Ru
    } else {
        Locale::DEFAULT
    }
}

/// Language reported by the operating system, if any.
pub fn system_preference() -> Option<String> {
    sys_locale::get_locale()
}

/// Pick the page locale. An explicit choice wins (unsupported choices fall
/// back to English); otherwise the reported preference is used.
pub fn resolve_locale(explicit: Option<&str>, reported: Option<&str>) -> Locale {
    match explicit {
        Some(tag) => Locale::from_tag(tag).unwrap_or(Locale::DEFAULT),
        None => detect_locale(reported.unwrap_or_default()),
    }
}

const EN: &[(&str, &str)] = &[
    ("index_heading", "Create Secret"),
    ("index_input", "Enter your secret:"),
    ("index_note", "Your secret will be encrypted and can only be viewed once."),
    ("index_create", "Create Secret"),
    ("saved_title", "Ephemera Link - Secret Created"),
    ("saved_heading", "Secret Created"),
    ("saved_note", "It can only be viewed once and will expire in"),
    ("saved_copy", "Copy Link to Clipboard"),
    ("saved_create", "Create Another Secret"),
    ("view_title", "Ephemera Link - View Secret"),
    ("view_heading", "View Secret"),
    ("view_show", "Show Secret"),
    ("retrieve_title", "Ephemera Link - View Secret"),
    ("retrieve_heading", "View Secret"),
    ("retrieve_note", "Your Secret:"),
    ("retrieve_copy", "Copy Secret to Clipboard"),
    ("retrieve_create", "Create Another Secret"),
    ("error_title", "Ephemera Link - Error"),
    ("error_heading", "Error"),
    ("error_create", "Create New Secret"),
];

const RU: &[(&str, &str)] = &[
    ("index_heading", "Создать секрет"),
    ("index_input", "Введите ваш секрет:"),
    ("index_note", "Ваш секрет будет зашифрован и может быть просмотрен только один раз."),
    ("index_create", "Создать секрет"),
    ("saved_title", "Ephemera Link - Секрет создан"),
    ("saved_heading", "Секрет создан"),
    ("saved_note", "Он может быть просмотрен один раз и исчезнет через"),
    ("saved_copy", "Скопировать ссылку"),
    ("saved_create", "Создать другой секрет"),
    ("view_title", "Ephemera Link - Просмотреть секрет"),
    ("view_heading", "Просмотреть секрет"),
    ("view_show", "Показать секрет"),
    ("retrieve_title", "Ephemera Link - Просмотреть секрет"),
    ("retrieve_heading", "Просмотреть секрет"),
    ("retrieve_note", "Ваш секрет:"),
    ("retrieve_copy", "Скопировать секрет"),
    ("retrieve_create", "Создать другой секрет"),
    ("error_title", "Ephemera Link - Ошибка"),
    ("error_heading", "Ошибка"),
    ("error_create", "Создать новый секрет"),
];

static TRANSLATIONS: Lazy<TranslationTable> =
    Lazy::new(|| TranslationTable::from_entries(&[("en", EN), ("ru", RU)]));

/// Locale tag -> key -> text. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    locales: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl TranslationTable {
    pub fn from_entries(entries: &[(&'static str, &[(&'static str, &'static str)])]) -> Self {
        let locales: HashMap<_, HashMap<_, _>> = entries
            .iter()
            .map(|(tag, strings)| (*tag, strings.iter().copied().collect()))
            .collect();
        TranslationTable { locales }
    }

    /// The tables shipped with the pages.
    pub fn builtin() -> &'static TranslationTable {
        &TRANSLATIONS
    }

    pub fn lookup(&self, locale: &str, key: &str) -> Option<&'static str> {
        self.locales.get(locale)?.get(key).copied()
    }

    /// Keys defined for `locale`, sorted.
    pub fn keys(&self, locale: &str) -> Vec<&'static str> {
        let mut keys: Vec<_> = self
            .locales
            .get(locale)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }
}

/// Lookup that falls back to the key itself.
pub fn translate<'a>(table: &TranslationTable, key: &'a str, locale: &str) -> &'a str {
    table.lookup(locale, key).unwrap_or(key)
}

/// Set the page language and translate every tagged element.
///
/// Elements whose key (or whole locale) is missing keep their current text.
/// Returns how many elements were rewritten.
pub fn apply_locale(page: &mut Page, table: &TranslationTable, locale: &str) -> usize {
    page.set_lang(locale);
    let mut updated = 0;
    for element in page.tagged_mut() {
        let Some(key) = element.i18n_key.as_deref() else {
            continue;
        };
        match table.lookup(locale, key) {
            Some(text) => {
                element.text = text.to_string();
                updated += 1;
            }
            None => debug!("no `{}` translation for key `{}`", locale, key),
        }
    }
    updated
}
