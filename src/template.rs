//! Text substitution of `<%= … %>` tags using local system facts.
//!
//! A tag holds either a quoted literal (`<%= 'world' %>`) or a fact name
//! (`<%= hostname %>`).  Everything outside tags is copied verbatim.
use crate::error::TemplateError;
use crate::platform::Facts;

const OPEN: &str = "<%=";
const CLOSE: &str = "%>";

/// Renders fetched templates against a fixed set of [`Facts`].
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    facts: Facts,
}

impl TemplateRenderer {
    /// Create a renderer over `facts`.
    #[must_use]
    pub const fn new(facts: Facts) -> Self {
        Self { facts }
    }

    /// Facts available to templates.
    #[must_use]
    pub const fn facts(&self) -> &Facts {
        &self.facts
    }

    /// Render `text`, substituting every tag.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unterminated`] if a tag is not closed and
    /// [`TemplateError::UnknownFact`] if a tag names an unknown fact.
    pub fn render(&self, text: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            let (before, tag) = rest.split_at(start);
            out.push_str(before);
            let body_start = OPEN.len();
            let Some(end) = tag.get(body_start..).and_then(|t| t.find(CLOSE)) else {
                return Err(TemplateError::Unterminated(offset + start));
            };
            let expr = tag
                .get(body_start..body_start + end)
                .unwrap_or_default()
                .trim();
            out.push_str(&self.evaluate(expr)?);

            let consumed = start + body_start + end + CLOSE.len();
            rest = rest.get(consumed..).unwrap_or_default();
            offset += consumed;
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Render raw bytes; the asset must be UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotUtf8`] for binary input, otherwise the
    /// errors of [`render`](Self::render).
    pub fn render_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, TemplateError> {
        let text = std::str::from_utf8(bytes).map_err(|_| TemplateError::NotUtf8)?;
        self.render(text).map(String::into_bytes)
    }

    fn evaluate(&self, expr: &str) -> Result<String, TemplateError> {
        if let Some(literal) = unquote(expr) {
            return Ok(literal.to_string());
        }
        self.facts
            .get(expr)
            .map(str::to_string)
            .ok_or_else(|| TemplateError::UnknownFact(expr.to_string()))
    }
}

fn unquote(expr: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|q| {
        expr.strip_prefix(q)
            .and_then(|inner| inner.strip_suffix(q))
    })
}
