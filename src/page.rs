//! In-memory document model shared by the copier, the expiry renderer and the
//! localizer.
//!
//! A `Page` is a flat, ordered list of elements plus the handful of
//! document-level facts the components touch: the `lang` attribute, a virtual
//! clock with single-shot timers, and a `UiSink` for blocking dialogs. Nothing
//! here outlives one page load.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Opaque handle for an element attached to a `Page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// A single element of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub id: Option<String>,
    pub text: String,
    pub href: Option<String>,
    /// Translation key (the `data-i18n` attribute).
    pub i18n_key: Option<String>,
    /// Off-screen element that never shows up in `render()`.
    pub hidden: bool,
    pub selected: bool,
}

impl Element {
    /// Element addressable by `id` with initial `text`.
    pub fn with_id(id: &str, text: &str) -> Self {
        Element {
            id: Some(id.to_string()),
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Element tagged with a translation key; `text` is what shows when no
    /// translation applies.
    pub fn translatable(key: &str, text: &str) -> Self {
        Element {
            text: text.to_string(),
            i18n_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn i18n(mut self, key: &str) -> Self {
        self.i18n_key = Some(key.to_string());
        self
    }
}

/// A blocking dialog shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    /// `alert(message)`
    Notice(String),
    /// `prompt(message, text)`
    CopyPrompt { message: String, text: String },
}

/// Dialog capability of the host surface.
pub trait UiSink {
    /// Show a blocking acknowledgement.
    fn notify(&mut self, message: &str);
    /// Show a blocking prompt pre-filled with `text` for manual copying.
    fn prompt_copy(&mut self, message: &str, text: &str);
}

/// Prints dialogs to the terminal. Used by the binary.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl UiSink for ConsoleSink {
    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }

    fn prompt_copy(&mut self, message: &str, text: &str) {
        println!("{} {}", message, text);
    }
}

/// Records dialogs instead of showing them.
///
/// Clones share the same log, so a caller can keep one handle and give the
/// other to a `Page`.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    dialogs: Rc<RefCell<Vec<Dialog>>>,
}

impl RecordingSink {
    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Dialog> {
        std::mem::take(&mut *self.dialogs.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.dialogs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogs.borrow().is_empty()
    }
}

impl UiSink for RecordingSink {
    fn notify(&mut self, message: &str) {
        self.dialogs
            .borrow_mut()
            .push(Dialog::Notice(message.to_string()));
    }

    fn prompt_copy(&mut self, message: &str, text: &str) {
        self.dialogs.borrow_mut().push(Dialog::CopyPrompt {
            message: message.to_string(),
            text: text.to_string(),
        });
    }
}

#[derive(Debug)]
struct Timer {
    due: Duration,
    seq: u64,
    target: String,
    text: String,
}

/// The document.
pub struct Page {
    nodes: Vec<(NodeId, Element)>,
    next_node: u64,
    lang: String,
    now: Duration,
    timers: Vec<Timer>,
    next_timer: u64,
    sink: Box<dyn UiSink>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Empty page whose dialogs are recorded and discarded.
    pub fn new() -> Self {
        Self::with_sink(RecordingSink::default())
    }

    pub fn with_sink(sink: impl UiSink + 'static) -> Self {
        Page {
            nodes: Vec::new(),
            next_node: 0,
            lang: String::new(),
            now: Duration::ZERO,
            timers: Vec::new(),
            next_timer: 0,
            sink: Box::new(sink),
        }
    }

    /// Append `element` to the end of the document.
    pub fn push(&mut self, element: Element) -> NodeId {
        let node = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.push((node, element));
        node
    }

    /// Detach an element. Returns `None` if it was already gone.
    pub fn remove(&mut self, node: NodeId) -> Option<Element> {
        let pos = self.nodes.iter().position(|(n, _)| *n == node)?;
        Some(self.nodes.remove(pos).1)
    }

    fn find(&self, id: &str) -> Option<&Element> {
        self.nodes
            .iter()
            .map(|(_, e)| e)
            .find(|e| e.id.as_deref() == Some(id))
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.nodes
            .iter_mut()
            .map(|(_, e)| e)
            .find(|e| e.id.as_deref() == Some(id))
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.find(id).map(|e| e.text.as_str())
    }

    /// Overwrite the text of the element with `id`. Returns `false` when no
    /// such element exists.
    pub fn set_text(&mut self, id: &str, value: &str) -> bool {
        match self.find_mut(id) {
            Some(e) => {
                e.text = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn href(&self, id: &str) -> Option<&str> {
        self.find(id).and_then(|e| e.href.as_deref())
    }

    pub fn set_href(&mut self, id: &str, value: &str) -> bool {
        match self.find_mut(id) {
            Some(e) => {
                e.href = Some(value.to_string());
                true
            }
            None => false,
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn set_lang(&mut self, tag: &str) {
        self.lang = tag.to_string();
    }

    /// Elements carrying a translation key, in document order.
    pub fn tagged_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.nodes
            .iter_mut()
            .map(|(_, e)| e)
            .filter(|e| e.i18n_key.is_some())
    }

    /// Attach an off-screen input holding `text` and select its contents.
    /// Any previous selection is cleared.
    pub fn insert_scratch(&mut self, text: &str) -> NodeId {
        for (_, e) in self.nodes.iter_mut() {
            e.selected = false;
        }
        self.push(Element {
            text: text.to_string(),
            hidden: true,
            selected: true,
            ..Default::default()
        })
    }

    /// Text of the currently selected element.
    pub fn selection(&self) -> Option<&str> {
        self.nodes
            .iter()
            .map(|(_, e)| e)
            .find(|e| e.selected)
            .map(|e| e.text.as_str())
    }

    /// Number of off-screen elements still attached.
    pub fn scratch_count(&self) -> usize {
        self.nodes.iter().filter(|(_, e)| e.hidden).count()
    }

    pub fn sink_mut(&mut self) -> &mut dyn UiSink {
        self.sink.as_mut()
    }

    /// Set the text of `target` once `delay` has elapsed. Not cancellable.
    pub fn schedule_set_text(&mut self, delay: Duration, target: &str, text: &str) {
        let seq = self.next_timer;
        self.next_timer += 1;
        self.timers.push(Timer {
            due: self.now + delay,
            seq,
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Move the clock forward and fire every timer that became due, oldest
    /// deadline first. Returns how many fired.
    pub fn advance(&mut self, by: Duration) -> usize {
        self.now += by;
        let now = self.now;
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            std::mem::take(&mut self.timers)
                .into_iter()
                .partition(|t| t.due <= now);
        self.timers = pending;
        due.sort_by_key(|t| (t.due, t.seq));
        let fired = due.len();
        for t in due {
            self.set_text(&t.target, &t.text);
        }
        fired
    }

    /// Visible text of the page, one element per line.
    pub fn render(&self) -> String {
        self.nodes
            .iter()
            .map(|(_, e)| e)
            .filter(|e| !e.hidden)
            .map(|e| match &e.href {
                Some(href) if *href != e.text => format!("{} <{}>", e.text, href),
                _ => e.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_on_missing_element_is_noop() {
        let mut page = Page::new();
        page.push(Element::with_id("a", "one"));
        assert!(!page.set_text("b", "two"));
        assert_eq!(page.text("a"), Some("one"));
    }

    #[test]
    fn scratch_is_selected_and_removable() {
        let mut page = Page::new();
        page.push(Element::with_id("a", "one"));
        let node = page.insert_scratch("secret");
        assert_eq!(page.selection(), Some("secret"));
        assert_eq!(page.scratch_count(), 1);
        assert!(!page.render().contains("secret"));
        page.remove(node);
        assert_eq!(page.scratch_count(), 0);
        assert_eq!(page.selection(), None);
        assert!(page.remove(node).is_none());
    }

    #[test]
    fn timers_fire_only_when_due() {
        let mut page = Page::new();
        page.push(Element::with_id("btn", "Copied!"));
        page.schedule_set_text(Duration::from_millis(2000), "btn", "Copy");
        assert_eq!(page.advance(Duration::from_millis(1999)), 0);
        assert_eq!(page.text("btn"), Some("Copied!"));
        assert_eq!(page.advance(Duration::from_millis(1)), 1);
        assert_eq!(page.text("btn"), Some("Copy"));
        assert_eq!(page.pending_timers(), 0);
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut page = Page::new();
        page.push(Element::with_id("x", ""));
        page.schedule_set_text(Duration::from_millis(30), "x", "late");
        page.schedule_set_text(Duration::from_millis(10), "x", "early");
        page.advance(Duration::from_millis(50));
        assert_eq!(page.text("x"), Some("late"));
    }

    #[test]
    fn recording_sink_shares_log_between_clones() {
        let sink = RecordingSink::default();
        let mut page = Page::with_sink(sink.clone());
        page.sink_mut().notify("hello");
        page.sink_mut().prompt_copy("copy:", "abc");
        assert_eq!(
            sink.take(),
            vec![
                Dialog::Notice("hello".into()),
                Dialog::CopyPrompt {
                    message: "copy:".into(),
                    text: "abc".into()
                }
            ]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn render_shows_href_when_it_differs() {
        let mut page = Page::new();
        page.push(Element::with_id("copy", "abc"));
        page.set_href("copy", "http://x/abc");
        assert_eq!(page.render(), "abc <http://x/abc>");
    }
}
