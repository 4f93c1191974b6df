//! Escaped-markup wrapper for values interpolated into rendered pages.
//!
//! Post bodies are trusted legacy HTML and pass through untouched; titles,
//! captions, comment text and paths are escaped on the way in.

use std::borrow::Cow;
use std::fmt;

/// Markup that is safe to interpolate into an HTML document or a
/// double-quoted attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlSafe(String);

impl HtmlSafe {
    /// Escape `&` `<` `>` `"` `'`.
    pub fn escape(raw: &str) -> Self {
        Self(escape_str(raw).into_owned())
    }

    /// Wrap markup that is already trusted, such as a segmented post body.
    pub fn from_trusted(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn escape_str(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 16);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

impl fmt::Display for HtmlSafe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<HtmlSafe> for String {
    fn from(safe: HtmlSafe) -> String {
        safe.0
    }
}

/// Extension trait for escaping at the call site.
pub trait EscapeHtml {
    fn escape_html(&self) -> HtmlSafe;
}

impl EscapeHtml for str {
    fn escape_html(&self) -> HtmlSafe {
        HtmlSafe::escape(self)
    }
}

impl EscapeHtml for String {
    fn escape_html(&self) -> HtmlSafe {
        HtmlSafe::escape(self)
    }
}
