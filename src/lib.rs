//! Ephemera library crate
//!
//! Client-side behaviour of the one-time secret pages, runnable natively. It
//! is organized into small modules: `clipboard` (copy with a three-tier
//! fallback chain), `relative_time` (expiry seconds to "in 5 minutes"),
//! `i18n` (locale detection and the static translation tables), `page` (the
//! in-memory document those act on) and `templates` (page layouts and the
//! share-link fix-up). The binary `src/main.rs` calls `ephemera_lib::run()`.
//!
//! Public API
//!
//! - `run()` — CLI entrypoint used by the binary.
//!
//! See each module for detailed documentation on functions and behavior.

pub mod clipboard;
pub mod i18n;
pub mod page;
pub mod relative_time;
pub mod templates;

use clap::{ArgAction, Parser, Subcommand};
use log::info;

use crate::clipboard::{ClipboardCopier, FEEDBACK_DELAY, Tier};
use crate::i18n::{Locale, TranslationTable, apply_locale, resolve_locale, system_preference};
use crate::page::{ConsoleSink, Page};
use crate::relative_time::{ExpiryDuration, format_relative_duration, render_expiry};
use crate::templates::{CONTROL_ID, EXPIRE_ID, SOURCE_ID};

/// Top-level CLI types and runner. Keep `main.rs` thin.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// UI language (en, ru). Detected from the system locale when omitted.
    #[arg(long = "lang", env = "EPHEMERA_LANG", global = true)]
    lang: Option<String>,

    /// Base URL secret links are relative to
    #[arg(
        long = "base-url",
        env = "EPHEMERA_BASE_URL",
        default_value = "http://localhost:8080/",
        global = true
    )]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy text to the clipboard, falling back to the legacy copy command
    /// and finally a manual-copy prompt
    Copy {
        /// Text to copy
        text: String,
    },
    /// Print how far in the future an expiry of SECONDS is
    Expires {
        /// Seconds until expiry
        seconds: String,
    },
    /// Print one translation, or the whole table for the current language
    Translate {
        /// Translation key
        key: Option<String>,
    },
    /// Render the "secret created" page for a link
    Saved {
        /// Link path (c/<id>/<key>) or absolute link
        link: String,

        /// Seconds until the secret expires
        #[arg(long = "expire", env = "EPHEMERA_SECRETS_EXPIRE", default_value_t = 86400u64)]
        expire: u64,

        /// Copy the link to the clipboard
        #[arg(long = "copy", action = ArgAction::SetTrue)]
        copy: bool,
    },
    /// Render the page that reveals a secret
    Retrieve {
        /// Secret text
        secret: String,

        /// Copy the secret to the clipboard
        #[arg(long = "copy", action = ArgAction::SetTrue)]
        copy: bool,
    },
}

/// Run the Ephemera CLI.
///
/// This function is the high-level entrypoint used by the `ephemera` binary.
/// It initialises logging (`RUST_LOG`, default `warn`), resolves the UI
/// language and dispatches to module functions. Errors are printed to stderr
/// and cause the process to exit with a non-zero code where appropriate.
///
/// Behavior summary:
/// - `copy` — copy text through the clipboard fallback chain.
/// - `expires` — print the relative-time phrase for a number of seconds.
/// - `translate` — look up translation strings.
/// - `saved` / `retrieve` — build, localise and print a page, optionally
///   clicking its copy button.
///
/// Example:
///
/// ```no_run
/// ephemera_lib::run(); // called from src/main.rs
/// ```
pub fn run() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();

    let cli = Cli::parse();
    let reported = system_preference();
    let locale = resolve_locale(cli.lang.as_deref(), reported.as_deref());
    info!("using locale {} (reported {:?})", locale.tag(), reported);

    match cli.command {
        Commands::Copy { text } => {
            let mut page = Page::with_sink(ConsoleSink);
            templates::retrieve_page(&mut page, &text);
            apply_locale(&mut page, TranslationTable::builtin(), locale.tag());
            click_copy(&mut page);
        }
        Commands::Expires { seconds } => {
            let expiry = ExpiryDuration::parse(&seconds).unwrap_or_else(|e| {
                eprintln!("error: {}", e);
                std::process::exit(1);
            });
            println!(
                "{}",
                format_relative_duration(expiry.as_secs(), &preferences(locale))
            );
        }
        Commands::Translate { key } => {
            let table = TranslationTable::builtin();
            match key {
                Some(key) => println!("{}", i18n::translate(table, &key, locale.tag())),
                None => {
                    for key in table.keys(locale.tag()) {
                        println!("{} = {}", key, i18n::translate(table, key, locale.tag()));
                    }
                }
            }
        }
        Commands::Saved { link, expire, copy } => {
            let mut page = Page::with_sink(ConsoleSink);
            templates::saved_page(&mut page, &link, expire);
            templates::fix_share_link(&mut page, SOURCE_ID, &cli.base_url);
            apply_locale(&mut page, TranslationTable::builtin(), locale.tag());
            if let Err(e) = render_expiry(&mut page, EXPIRE_ID, &preferences(locale)) {
                eprintln!("warning: {}", e);
            }
            println!("{}", page.render());
            if copy {
                click_copy(&mut page);
            }
        }
        Commands::Retrieve { secret, copy } => {
            let mut page = Page::with_sink(ConsoleSink);
            templates::retrieve_page(&mut page, &secret);
            apply_locale(&mut page, TranslationTable::builtin(), locale.tag());
            println!("{}", page.render());
            if copy {
                click_copy(&mut page);
            }
        }
    }
}

/// Locale preference list for relative times: the page locale, then English.
fn preferences(locale: Locale) -> Vec<&'static str> {
    let mut prefs = vec![locale.tag()];
    if locale != Locale::DEFAULT {
        prefs.push(Locale::DEFAULT.tag());
    }
    prefs
}

/// Press the page's copy button and show the label feedback.
///
/// On Linux the clipboard only serves its content while the `arboard` handle
/// lives. `copier` keeps that handle until the end of this function, so the
/// feedback delay doubles as a short hold.
fn click_copy(page: &mut Page) {
    let mut copier = ClipboardCopier::system();
    let tier = copier.copy(page, SOURCE_ID, CONTROL_ID);
    info!("copy handled by {:?} tier", tier);
    if tier == Tier::Primary {
        println!("[{}]", page.text(CONTROL_ID).unwrap_or_default());
        std::thread::sleep(FEEDBACK_DELAY);
        page.advance(FEEDBACK_DELAY);
        println!("[{}]", page.text(CONTROL_ID).unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_end_in_default() {
        assert_eq!(preferences(Locale::En), vec!["en"]);
        assert_eq!(preferences(Locale::Ru), vec!["ru", "en"]);
    }

    #[test]
    fn cli_parses_saved_with_defaults() {
        let cli = Cli::try_parse_from(["ephemera", "saved", "c/id/key"]).unwrap();
        assert_eq!(cli.base_url, "http://localhost:8080/");
        match cli.command {
            Commands::Saved { link, copy, .. } => {
                assert_eq!(link, "c/id/key");
                assert!(!copy);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn cli_accepts_global_lang_after_subcommand() {
        let cli = Cli::try_parse_from(["ephemera", "expires", "90", "--lang", "ru"]).unwrap();
        assert_eq!(cli.lang.as_deref(), Some("ru"));
    }
}
