use chromiumoxide::Page;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::ScrapeError;

/// How many levels of nested iframes to descend into. The portal's
/// login widget sits two frames deep; anything past four is noise.
const MAX_FRAME_DEPTH: u32 = 4;

/// Where a selector matched inside the page's frame tree.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameHit {
    pub found: bool,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub depth: u32,
}

/// Locates and drives elements across the top document and every
/// same-origin iframe, breadth first.
///
/// Cross-origin frames cannot be reached from page JavaScript; the
/// probe skips them silently rather than failing the whole search.
pub struct FrameProbe<'a> {
    page: &'a Page,
}

impl<'a> FrameProbe<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page }
    }

    // Shared preamble: breadth-first walk collecting [document, depth]
    // pairs, swallowing cross-origin access errors.
    fn docs_preamble() -> String {
        format!(
            r#"const docs = [];
const queue = [[document, 0]];
while (queue.length) {{
    const [doc, depth] = queue.shift();
    docs.push([doc, depth]);
    if (depth >= {MAX_FRAME_DEPTH}) continue;
    for (const frame of doc.querySelectorAll('iframe, frame')) {{
        try {{
            if (frame.contentDocument) queue.push([frame.contentDocument, depth + 1]);
        }} catch (e) {{}}
    }}
}}"#
        )
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, ScrapeError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScrapeError::infra(format!("page script failed: {e}")))?;
        result
            .into_value::<T>()
            .map_err(|e| ScrapeError::structural(format!("unexpected script result: {e}")))
    }

    /// Searches the frame tree for `selector` and reports whether it
    /// exists and is actually rendered (two-screen logins keep the
    /// password field in the DOM but hidden until the first screen is
    /// submitted).
    pub async fn find(&self, selector: &str) -> Result<FrameHit, ScrapeError> {
        let sel = js_string(selector);
        let script = format!(
            r#"(() => {{
{preamble}
for (const [doc, depth] of docs) {{
    const el = doc.querySelector({sel});
    if (el) {{
        const visible = el.offsetParent !== null || el.getClientRects().length > 0;
        return JSON.stringify({{ found: true, visible, depth }});
    }}
}}
return JSON.stringify({{ found: false, visible: false, depth: 0 }});
}})()"#,
            preamble = Self::docs_preamble(),
        );
        let raw: String = self.eval(script).await?;
        let hit: FrameHit = serde_json::from_str(&raw)
            .map_err(|e| ScrapeError::structural(format!("unexpected script result: {e}")))?;
        trace!(selector, found = hit.found, visible = hit.visible, depth = hit.depth, "frame probe");
        Ok(hit)
    }

    /// Types `value` into the first match for `selector`, dispatching
    /// the input and change events the SPA's form bindings listen for.
    /// Returns false if no frame contains the element.
    pub async fn set_value(&self, selector: &str, value: &str) -> Result<bool, ScrapeError> {
        let sel = js_string(selector);
        let val = js_string(value);
        let script = format!(
            r#"(() => {{
{preamble}
for (const [doc, _depth] of docs) {{
    const el = doc.querySelector({sel});
    if (el) {{
        el.focus();
        el.value = {val};
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
        el.dispatchEvent(new Event('change', {{ bubbles: true }}));
        return true;
    }}
}}
return false;
}})()"#,
            preamble = Self::docs_preamble(),
        );
        let done: bool = self.eval(script).await?;
        debug!(selector, done, "set field value");
        Ok(done)
    }

    /// Clicks the first match for `selector` in any frame.
    pub async fn click(&self, selector: &str) -> Result<bool, ScrapeError> {
        let sel = js_string(selector);
        let script = format!(
            r#"(() => {{
{preamble}
for (const [doc, _depth] of docs) {{
    const el = doc.querySelector({sel});
    if (el) {{ el.click(); return true; }}
}}
return false;
}})()"#,
            preamble = Self::docs_preamble(),
        );
        let done: bool = self.eval(script).await?;
        debug!(selector, done, "click");
        Ok(done)
    }

    /// Clicks a control by element id, falling back to an exact
    /// trimmed-text match over clickable elements in every frame.
    pub async fn click_by_id_or_text(&self, id: &str, text: &str) -> Result<bool, ScrapeError> {
        let id_lit = js_string(id);
        let text_lit = js_string(text);
        let script = format!(
            r#"(() => {{
{preamble}
for (const [doc, _depth] of docs) {{
    const byId = doc.getElementById({id_lit});
    if (byId) {{ byId.click(); return true; }}
}}
for (const [doc, _depth] of docs) {{
    const candidates = doc.querySelectorAll('button, a, span, div, input[type="button"], input[type="submit"]');
    for (const el of candidates) {{
        const label = el.tagName === 'INPUT' ? el.value : el.textContent;
        if ((label || '').trim() === {text_lit}) {{ el.click(); return true; }}
    }}
}}
return false;
}})()"#,
            preamble = Self::docs_preamble(),
        );
        let done: bool = self.eval(script).await?;
        debug!(id, text, done, "click by id or text");
        Ok(done)
    }

    /// Simulates pressing Enter on the element, then asks its owning
    /// form to submit. Fallback for login forms without a reachable
    /// submit button.
    pub async fn press_enter(&self, selector: &str) -> Result<bool, ScrapeError> {
        let sel = js_string(selector);
        let script = format!(
            r#"(() => {{
{preamble}
for (const [doc, _depth] of docs) {{
    const el = doc.querySelector({sel});
    if (el) {{
        const opts = {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }};
        el.dispatchEvent(new KeyboardEvent('keydown', opts));
        el.dispatchEvent(new KeyboardEvent('keypress', opts));
        el.dispatchEvent(new KeyboardEvent('keyup', opts));
        if (el.form && el.form.requestSubmit) el.form.requestSubmit();
        return true;
    }}
}}
return false;
}})()"#,
            preamble = Self::docs_preamble(),
        );
        let done: bool = self.eval(script).await?;
        debug!(selector, done, "press enter");
        Ok(done)
    }
}

/// Escapes a Rust string into a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes_and_backslashes() {
        assert_eq!(js_string("plain"), r#""plain""#);
        assert_eq!(js_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_frame_hit_deserializes_partial_payload() {
        let hit: FrameHit = serde_json::from_str(r#"{"found":false}"#).unwrap();
        assert!(!hit.found);
        assert!(!hit.visible);
        assert_eq!(hit.depth, 0);
    }
}
