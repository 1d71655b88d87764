//! Element layouts of the secret pages, and the saved page's link fix-up.
//!
//! Each builder appends the elements the client behaviours act on: the copy
//! source (`copy`), the copy control (`copyBtn`), the expiry cell (`expire`)
//! and the translatable labels. The English text doubles as the fallback
//! when a translation is missing.

use crate::page::{Element, Page};

/// Element holding the link or secret to copy.
pub const SOURCE_ID: &str = "copy";
/// The copy button.
pub const CONTROL_ID: &str = "copyBtn";
/// Element holding the seconds until expiry.
pub const EXPIRE_ID: &str = "expire";

/// Link that opens secret `id` with `key`, as the server hands it out.
pub fn secret_link(base_url: &str, id: &str, key: &str) -> String {
    compose_share_link(base_url, &format!("c/{}/{}", id, key))
}

/// Join the page's base URL with a link path. Absolute links are returned
/// unchanged; otherwise exactly one `/` separates the two halves.
pub fn compose_share_link(base_url: &str, link: &str) -> String {
    let link = link.trim();
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        link.trim_start_matches('/')
    )
}

/// Rewrite element `id` so both its text and `href` hold the full link.
/// Returns the composed link, or `None` if the element does not exist.
pub fn fix_share_link(page: &mut Page, id: &str, base_url: &str) -> Option<String> {
    let full = compose_share_link(base_url, page.text(id)?);
    page.set_text(id, &full);
    page.set_href(id, &full);
    Some(full)
}

/// Page shown right after a secret was stored.
pub fn saved_page(page: &mut Page, link: &str, expire_seconds: u64) {
    page.push(Element::translatable("saved_title", "Ephemera Link - Secret Created"));
    page.push(Element::translatable("saved_heading", "Secret Created"));
    page.push(Element::with_id(SOURCE_ID, link));
    page.push(Element::translatable(
        "saved_note",
        "It can only be viewed once and will expire in",
    ));
    page.push(Element::with_id(EXPIRE_ID, &expire_seconds.to_string()));
    page.push(Element::with_id(CONTROL_ID, "Copy Link to Clipboard").i18n("saved_copy"));
    page.push(Element::translatable("saved_create", "Create Another Secret"));
}

/// Page that reveals a secret.
pub fn retrieve_page(page: &mut Page, secret: &str) {
    page.push(Element::translatable("retrieve_title", "Ephemera Link - View Secret"));
    page.push(Element::translatable("retrieve_heading", "View Secret"));
    page.push(Element::translatable("retrieve_note", "Your Secret:"));
    page.push(Element::with_id(SOURCE_ID, secret));
    page.push(Element::with_id(CONTROL_ID, "Copy Secret to Clipboard").i18n("retrieve_copy"));
    page.push(Element::translatable("retrieve_create", "Create Another Secret"));
}
