//! Message templates and rendering.

use platforms_live::Platform;
use rand::seq::IndexedRandom;
use serde::Deserialize;

/// A notification template: a single format string, or a list of candidates
/// picked from at random on every firing for message variety.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageTemplate {
    Single(String),
    Choices(Vec<String>),
}

impl MessageTemplate {
    /// Resolve to a concrete format string.
    ///
    /// Lists pick uniformly among non-blank entries, re-picked per call.
    /// Returns `None` when nothing usable is configured (blank string,
    /// empty or all-blank list).
    pub fn pick(&self) -> Option<&str> {
        match self {
            Self::Single(text) => {
                if text.trim().is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            Self::Choices(options) => {
                let candidates: Vec<&String> = options
                    .iter()
                    .filter(|option| !option.trim().is_empty())
                    .collect();
                candidates.choose(&mut rand::rng()).map(|s| s.as_str())
            }
        }
    }
}

/// Context fields available to notification templates.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub platform: Platform,
    pub display_name: &'a str,
    pub channel: &'a str,
    pub title: Option<&'a str>,
    pub url: &'a str,
    pub is_live: bool,
}

impl RenderContext<'_> {
    fn lookup(&self, field: &str) -> Option<&str> {
        match field {
            "platform" => Some(self.platform.as_str()),
            "display_name" => Some(self.display_name),
            "channel" => Some(self.channel),
            "title" => Some(self.title.unwrap_or("")),
            "status" => Some(if self.is_live { "live" } else { "offline" }),
            "url" => Some(self.url),
            _ => None,
        }
    }
}

/// Render a format string against the context.
///
/// `{field}` placeholders substitute the matching context value; unknown
/// fields substitute the empty string so raw tokens never leak into chat.
/// `{{` and `}}` escape literal braces. The result is trimmed.
pub fn render(template: &str, ctx: &RenderContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    field.push(inner);
                }
                if closed {
                    if let Some(value) = ctx.lookup(&field) {
                        out.push_str(value);
                    }
                } else {
                    // Unterminated placeholder: keep the raw text.
                    out.push('{');
                    out.push_str(&field);
                }
            }
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}
