//! Copy a link or secret to the clipboard, falling back through three tiers.
//!
//! 1. `PrimaryTier` writes through the platform clipboard (`arboard`) and
//!    swaps the control's label to "Copied!" for two seconds.
//! 2. `ScratchInputTier` puts the text into a hidden, selected input and runs
//!    the legacy copy command on the selection, then acknowledges with a
//!    notice. The scratch input is always detached before the tier returns.
//! 3. `ManualPromptTier` hands the text to the user in a prompt. It cannot
//!    fail, so it is not part of the fallible chain.
//!
//! Nothing escapes `ClipboardCopier::copy`: every failure moves on to the next
//! tier.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{debug, error};

use crate::page::Page;

/// Label shown on the control after a successful primary copy.
pub const COPIED_LABEL: &str = "Copied!";
/// How long the "Copied!" label stays before the original comes back.
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(2000);
/// Acknowledgement shown after the legacy copy command succeeded.
pub const SCRATCH_COPIED_MESSAGE: &str = "Link copied to clipboard!";
/// Message of the manual-copy prompt.
pub const MANUAL_COPY_MESSAGE: &str = "Press Ctrl+C to copy:";

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write rejected: {0}")]
    Rejected(String),
    #[error("nothing selected")]
    NothingSelected,
}

/// Something that can put text on the system clipboard.
pub trait ClipboardBackend {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Platform clipboard through the `arboard` crate.
///
/// The handle is opened on first write and kept for the lifetime of the
/// backend: on Linux the copied text is only served while it is alive. On
/// headless machines opening it fails and the copier moves on.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Option<arboard::Clipboard>,
}

impl ClipboardBackend for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut ctx = match self.handle.take() {
            Some(ctx) => ctx,
            None => arboard::Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(format!("clipboard init: {}", e)))?,
        };
        let result = ctx
            .set_text(text.to_owned())
            .map_err(|e| ClipboardError::Rejected(format!("clipboard set: {}", e)));
        // A handle that failed to write is dropped and reopened next time.
        if result.is_ok() {
            self.handle = Some(ctx);
        }
        result
    }
}

/// Legacy copy command: pipes the text into an external clipboard tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: &str, args: &[&str]) -> Self {
        CommandClipboard {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The usual clipboard tool for the current platform.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("pbcopy", &[])
        } else if cfg!(target_os = "windows") {
            Self::new("clip", &[])
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Self::new("wl-copy", &[])
        } else {
            Self::new("xclip", &["-selection", "clipboard"])
        }
    }
}

impl ClipboardBackend for CommandClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", self.program, e)))?;

        // stdin is closed at the end of this block so the tool sees EOF.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        if written.is_err() {
            let _ = child.kill();
        }

        // Always reap the child, even when the write failed.
        let status = child
            .wait()
            .map_err(|e| ClipboardError::Rejected(format!("{}: {}", self.program, e)));
        written.map_err(|e| ClipboardError::Rejected(format!("{}: {}", self.program, e)))?;
        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Rejected(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Position of a strategy in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    ScratchInput,
    ManualPrompt,
}

/// One copy attempt: what to copy and which control gets feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub text: String,
    pub control_id: String,
}

impl CopyRequest {
    /// Read the trimmed text of `source_id` at click time. A missing source
    /// yields an empty request rather than aborting the click.
    pub fn from_page(page: &Page, source_id: &str, control_id: &str) -> Self {
        CopyRequest {
            text: page.text(source_id).unwrap_or_default().trim().to_string(),
            control_id: control_id.to_string(),
        }
    }
}

/// A fallible tier of the chain.
pub trait CopyStrategy {
    fn tier(&self) -> Tier;
    fn attempt(&mut self, request: &CopyRequest, page: &mut Page) -> Result<(), ClipboardError>;
}

/// Tier 1: platform clipboard plus transient label feedback.
pub struct PrimaryTier {
    backend: Box<dyn ClipboardBackend>,
    // Label each control had before it first showed "Copied!". A second click
    // during the feedback window must not capture "Copied!" as the original.
    originals: HashMap<String, String>,
}

impl PrimaryTier {
    pub fn new(backend: impl ClipboardBackend + 'static) -> Self {
        PrimaryTier {
            backend: Box::new(backend),
            originals: HashMap::new(),
        }
    }
}

impl CopyStrategy for PrimaryTier {
    fn tier(&self) -> Tier {
        Tier::Primary
    }

    fn attempt(&mut self, request: &CopyRequest, page: &mut Page) -> Result<(), ClipboardError> {
        self.backend.write_text(&request.text)?;

        let control = request.control_id.as_str();
        let Some(current) = page.text(control).map(str::to_owned) else {
            return Ok(());
        };
        if current != COPIED_LABEL {
            self.originals.insert(control.to_string(), current);
        }
        let original = self
            .originals
            .get(control)
            .cloned()
            .unwrap_or_else(|| COPIED_LABEL.to_string());

        page.set_text(control, COPIED_LABEL);
        page.schedule_set_text(FEEDBACK_DELAY, control, &original);
        Ok(())
    }
}

/// Tier 2: hidden input + legacy copy command.
pub struct ScratchInputTier {
    backend: Box<dyn ClipboardBackend>,
}

impl ScratchInputTier {
    pub fn new(backend: impl ClipboardBackend + 'static) -> Self {
        ScratchInputTier {
            backend: Box::new(backend),
        }
    }
}

impl CopyStrategy for ScratchInputTier {
    fn tier(&self) -> Tier {
        Tier::ScratchInput
    }

    fn attempt(&mut self, request: &CopyRequest, page: &mut Page) -> Result<(), ClipboardError> {
        let node = page.insert_scratch(&request.text);
        let result = match page.selection().map(str::to_owned) {
            Some(selected) => self.backend.write_text(&selected),
            None => Err(ClipboardError::NothingSelected),
        };
        page.remove(node);

        match result {
            Ok(()) => {
                page.sink_mut().notify(SCRATCH_COPIED_MESSAGE);
                Ok(())
            }
            Err(e) => {
                error!("Failed to copy: {}", e);
                Err(e)
            }
        }
    }
}

/// Tier 3: ask the user to copy by hand.
#[derive(Debug, Default)]
pub struct ManualPromptTier;

impl ManualPromptTier {
    pub fn prompt(&self, request: &CopyRequest, page: &mut Page) {
        page.sink_mut().prompt_copy(MANUAL_COPY_MESSAGE, &request.text);
    }
}

/// The ordered fallback chain.
pub struct ClipboardCopier {
    strategies: Vec<Box<dyn CopyStrategy>>,
    last_resort: ManualPromptTier,
}

impl ClipboardCopier {
    /// Chain `primary` (tier 1) and `legacy` (tier 2), ending in the manual
    /// prompt.
    pub fn new(
        primary: impl ClipboardBackend + 'static,
        legacy: impl ClipboardBackend + 'static,
    ) -> Self {
        ClipboardCopier {
            strategies: vec![
                Box::new(PrimaryTier::new(primary)),
                Box::new(ScratchInputTier::new(legacy)),
            ],
            last_resort: ManualPromptTier,
        }
    }

    /// Chain wired to the real platform clipboard and clipboard tool.
    pub fn system() -> Self {
        Self::new(SystemClipboard::default(), CommandClipboard::platform_default())
    }

    /// Handle a click on `control_id`: copy the text of `source_id`.
    pub fn copy(&mut self, page: &mut Page, source_id: &str, control_id: &str) -> Tier {
        let request = CopyRequest::from_page(page, source_id, control_id);
        self.run(&request, page)
    }

    /// Same as `copy` for text the caller already has.
    pub fn copy_text(&mut self, page: &mut Page, text: &str, control_id: &str) -> Tier {
        let request = CopyRequest {
            text: text.to_string(),
            control_id: control_id.to_string(),
        };
        self.run(&request, page)
    }

    fn run(&mut self, request: &CopyRequest, page: &mut Page) -> Tier {
        for strategy in self.strategies.iter_mut() {
            match strategy.attempt(request, page) {
                Ok(()) => {
                    debug!("copied via {:?}", strategy.tier());
                    return strategy.tier();
                }
                Err(e) => debug!("{:?} tier failed: {}", strategy.tier(), e),
            }
        }
        self.last_resort.prompt(request, page);
        Tier::ManualPrompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Dialog, Element, RecordingSink};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakeBackend {
        fail: bool,
        written: Rc<RefCell<Vec<String>>>,
    }

    impl FakeBackend {
        fn failing() -> Self {
            FakeBackend {
                fail: true,
                ..Default::default()
            }
        }
    }

    impl ClipboardBackend for FakeBackend {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("fake".into()));
            }
            self.written.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    fn page_with_link(sink: &RecordingSink) -> Page {
        let mut page = Page::with_sink(sink.clone());
        page.push(Element::with_id("copy", "  http://localhost:8080/abc  "));
        page.push(Element::with_id("copyBtn", "Copy Link to Clipboard"));
        page
    }

    #[test]
    fn primary_success_swaps_and_restores_label() {
        let sink = RecordingSink::default();
        let mut page = page_with_link(&sink);
        let primary = FakeBackend::default();
        let mut copier = ClipboardCopier::new(primary.clone(), FakeBackend::failing());

        let tier = copier.copy(&mut page, "copy", "copyBtn");
        assert_eq!(tier, Tier::Primary);
        assert_eq!(*primary.written.borrow(), vec!["http://localhost:8080/abc"]);
        assert_eq!(page.text("copyBtn"), Some(COPIED_LABEL));
        assert!(sink.is_empty());

        page.advance(FEEDBACK_DELAY);
        assert_eq!(page.text("copyBtn"), Some("Copy Link to Clipboard"));
    }

    #[test]
    fn double_click_still_restores_original_label() {
        let sink = RecordingSink::default();
        let mut page = page_with_link(&sink);
        let mut copier = ClipboardCopier::new(FakeBackend::default(), FakeBackend::failing());

        copier.copy(&mut page, "copy", "copyBtn");
        page.advance(Duration::from_millis(500));
        copier.copy(&mut page, "copy", "copyBtn");
        assert_eq!(page.pending_timers(), 2);

        page.advance(Duration::from_millis(1500));
        assert_eq!(page.text("copyBtn"), Some("Copy Link to Clipboard"));
        page.advance(Duration::from_millis(500));
        assert_eq!(page.text("copyBtn"), Some("Copy Link to Clipboard"));
    }

    #[test]
    fn scratch_tier_runs_when_primary_fails() {
        let sink = RecordingSink::default();
        let mut page = page_with_link(&sink);
        let legacy = FakeBackend::default();
        let mut copier = ClipboardCopier::new(FakeBackend::failing(), legacy.clone());

        let tier = copier.copy(&mut page, "copy", "copyBtn");
        assert_eq!(tier, Tier::ScratchInput);
        assert_eq!(*legacy.written.borrow(), vec!["http://localhost:8080/abc"]);
        assert_eq!(
            sink.take(),
            vec![Dialog::Notice(SCRATCH_COPIED_MESSAGE.into())]
        );
        assert_eq!(page.scratch_count(), 0);
        assert_eq!(page.text("copyBtn"), Some("Copy Link to Clipboard"));
    }

    #[test]
    fn manual_prompt_when_everything_fails() {
        let sink = RecordingSink::default();
        let mut page = page_with_link(&sink);
        let mut copier = ClipboardCopier::new(FakeBackend::failing(), FakeBackend::failing());

        let tier = copier.copy(&mut page, "copy", "copyBtn");
        assert_eq!(tier, Tier::ManualPrompt);
        assert_eq!(
            sink.take(),
            vec![Dialog::CopyPrompt {
                message: MANUAL_COPY_MESSAGE.into(),
                text: "http://localhost:8080/abc".into()
            }]
        );
        assert_eq!(page.scratch_count(), 0);
    }

    #[test]
    fn failed_primary_reaches_exactly_one_fallback() {
        for legacy_fails in [false, true] {
            let sink = RecordingSink::default();
            let mut page = page_with_link(&sink);
            let legacy = FakeBackend {
                fail: legacy_fails,
                ..Default::default()
            };
            let mut copier = ClipboardCopier::new(FakeBackend::failing(), legacy);
            let tier = copier.copy(&mut page, "copy", "copyBtn");
            assert_ne!(tier, Tier::Primary);
            assert_eq!(sink.len(), 1);
            assert_eq!(page.scratch_count(), 0);
        }
    }

    #[test]
    fn missing_source_copies_empty_text() {
        let mut page = Page::new();
        let primary = FakeBackend::default();
        let mut copier = ClipboardCopier::new(primary.clone(), FakeBackend::failing());
        assert_eq!(copier.copy(&mut page, "nope", "nobtn"), Tier::Primary);
        assert_eq!(*primary.written.borrow(), vec![String::new()]);
        assert_eq!(page.pending_timers(), 0);
    }

    #[test]
    fn command_clipboard_reports_missing_program() {
        let mut cmd = CommandClipboard::new("ephemera-no-such-clipboard-tool", &[]);
        assert!(matches!(
            cmd.write_text("x"),
            Err(ClipboardError::Unavailable(_))
        ));
    }

    /// Unreaped children of this process named `comm`.
    #[cfg(target_os = "linux")]
    fn zombie_children(comm: &str) -> usize {
        let me = std::process::id().to_string();
        std::fs::read_dir("/proc")
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| std::fs::read_to_string(entry.path().join("stat")).ok())
            .filter(|stat| {
                // "pid (comm) state ppid ..."
                let Some((head, rest)) = stat.rsplit_once(')') else {
                    return false;
                };
                let mut fields = rest.split_whitespace();
                head.ends_with(&format!("({}", comm))
                    && fields.next() == Some("Z")
                    && fields.next() == Some(me.as_str())
            })
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn command_clipboard_reaps_tool_that_ignores_stdin() {
        let mut cmd = CommandClipboard::new("true", &[]);
        let result = cmd.write_text(&"x".repeat(4 << 20));
        assert!(matches!(result, Err(ClipboardError::Rejected(_))));
        assert_eq!(zombie_children("true"), 0);
    }

    #[cfg(unix)]
    #[test]
    fn command_clipboard_reports_failing_tool() {
        let mut cmd = CommandClipboard::new("false", &[]);
        assert!(matches!(cmd.write_text(""), Err(ClipboardError::Rejected(_))));
    }

    #[test]
    fn system_clipboard_keeps_handle_only_after_success() {
        // Headless runners usually have no clipboard; either way the handle
        // must be held exactly when the write went through.
        let mut clipboard = SystemClipboard::default();
        let result = clipboard.write_text("test");
        assert_eq!(clipboard.handle.is_some(), result.is_ok());
    }

    #[test]
    fn copy_text_skips_source_lookup() {
        let sink = RecordingSink::default();
        let mut page = page_with_link(&sink);
        let primary = FakeBackend::default();
        let mut copier = ClipboardCopier::new(primary.clone(), FakeBackend::failing());

        let tier = copier.copy_text(&mut page, "typed by hand", "copyBtn");
        assert_eq!(tier, Tier::Primary);
        assert_eq!(*primary.written.borrow(), vec!["typed by hand"]);
        assert_eq!(page.text("copy"), Some("  http://localhost:8080/abc  "));
        assert_eq!(page.text("copyBtn"), Some(COPIED_LABEL));
    }
}
