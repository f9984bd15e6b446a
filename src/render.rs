//! Chat turn rendering
//!
//! Turns a [`ChatTurn`] into an HTML fragment and appends it to a transcript.
//! User turns are inserted as literal, escaped text. Assistant turns are
//! parsed as GitHub-flavoured markdown with significant line breaks, raw HTML
//! neutralised and unsafe link schemes dropped; fenced code blocks are
//! highlighted with `syntect` using class-based spans.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user
    User,
    /// Produced by the backend (or by the controller on its behalf)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who authored the turn
    pub role: Role,
    /// Raw turn text (markdown for assistant turns)
    pub content: String,
}

impl ChatTurn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A turn after rendering, ready to be inserted into a transcript view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    /// The source turn
    pub turn: ChatTurn,
    /// HTML fragment (`<div class="message ...">...</div>`)
    pub html: String,
}

/// Destination for rendered turns
///
/// Implemented by whatever displays the transcript. `append_node` must not
/// reorder; `scroll_to_latest` brings the newest node into view.
pub trait TranscriptSink: Send + Sync {
    /// Append a rendered node at the end of the transcript
    fn append_node(&self, node: &RenderedTurn);

    /// Scroll the transcript so the newest node is visible
    fn scroll_to_latest(&self);
}

/// Renders chat turns to HTML fragments
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self
    }

    /// Render a turn without inserting it anywhere
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbridge::render::{ChatTurn, Renderer};
    ///
    /// let node = Renderer::new().render(&ChatTurn::user("<b>hi</b>"));
    /// assert_eq!(node.html, r#"<div class="message user">&lt;b&gt;hi&lt;/b&gt;</div>"#);
    /// ```
    pub fn render(&self, turn: &ChatTurn) -> RenderedTurn {
        let body = match turn.role {
            Role::User => escape_html(&turn.content),
            Role::Assistant => render_markdown(&turn.content),
        };
        RenderedTurn {
            turn: turn.clone(),
            html: format!("<div class=\"message {}\">{}</div>", turn.role, body),
        }
    }

    /// Render a turn, append it to `sink` and scroll to it
    pub fn append<S>(&self, sink: &S, turn: &ChatTurn) -> RenderedTurn
    where
        S: TranscriptSink + ?Sized,
    {
        let node = self.render(turn);
        sink.append_node(&node);
        sink.scroll_to_latest();
        node
    }
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render assistant markdown to sanitized HTML
fn render_markdown(markdown: &str) -> String {
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code_block: Option<(String, String)> = None;

    for event in Parser::new_ext(markdown, markdown_options()) {
        if let Some((lang, code)) = code_block.as_mut() {
            match event {
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted = highlight_code_block(code, lang);
                    events.push(Event::Html(CowStr::from(highlighted)));
                    code_block = None;
                }
                Event::Text(text) => code.push_str(&text),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info).to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block = Some((lang, String::new()));
            }
            // Raw HTML is shown as text, never interpreted
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            Event::SoftBreak => events.push(Event::HardBreak),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            })),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            })),
            other => events.push(other),
        }
    }

    // Unterminated fence at end of input
    if let Some((lang, code)) = code_block {
        events.push(Event::Html(CowStr::from(highlight_code_block(&code, &lang))));
    }

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|prefix| scheme.starts_with(prefix))
    {
        CowStr::Borrowed("")
    } else {
        url
    }
}

fn fence_language(info: &str) -> &str {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or("")
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAXES: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAXES.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Highlight a code block, falling back to escaped text for unknown languages
fn highlight_code_block(code: &str, lang: &str) -> String {
    let class_attr = if lang.is_empty() {
        String::new()
    } else {
        format!(" class=\"language-{}\"", escape_html(lang))
    };

    let body = highlight_with_syntect(code, lang).unwrap_or_else(|| escape_html(code));
    format!("<pre><code{}>{}</code></pre>\n", class_attr, body)
}

fn highlight_with_syntect(code: &str, lang: &str) -> Option<String> {
    if lang.is_empty() {
        return None;
    }
    let syntaxes = syntax_set();
    let syntax = syntaxes
        .find_syntax_by_token(lang)
        .or_else(|| syntaxes.find_syntax_by_extension(lang))?;

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntaxes, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::debug!("Highlighting failed for language {}: {}", lang, e);
            return None;
        }
    }
    Some(generator.finalize())
}

/// Escape text for safe insertion into HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut escaped, text);
    escaped
}
