//! Markdown rendering with front-matter extraction

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use thiserror::Error;

use super::frontmatter::{FrontMatter, FrontMatterError};
use super::post::Rendered;

/// Errors from [`MarkdownRenderer::render`]
#[derive(Debug, Error)]
pub enum RenderError {
    /// The document bytes are not UTF-8; nothing could be rendered
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The body rendered but the front matter did not decode.
    /// `partial` holds the HTML with empty metadata.
    #[error("{source}")]
    Metadata {
        partial: Box<Rendered>,
        #[source]
        source: FrontMatterError,
    },
}

impl RenderError {
    /// Whether this is the non-fatal front-matter failure
    pub fn is_metadata(&self) -> bool {
        matches!(self, Self::Metadata { .. })
    }

    /// The partially rendered document, if one was produced
    pub fn partial(&self) -> Option<&Rendered> {
        match self {
            Self::Metadata { partial, .. } => Some(partial),
            Self::InvalidUtf8(_) => None,
        }
    }
}

/// Output tweaks on top of plain CommonMark
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Give headings a slug `id` and a trailing `<a class="anchor">` link
    pub heading_anchors: bool,
    /// Open `http(s)` links in a new tab
    pub external_links_new_tab: bool,
}

/// Markdown renderer.
///
/// Rendering is pure: the same bytes always produce the same output.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom settings
    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Render a raw document into HTML plus its title, date and anchor.
    ///
    /// Empty or whitespace-only input is valid and yields empty HTML.
    /// Malformed front matter returns [`RenderError::Metadata`] carrying the
    /// rendered body.
    pub fn render(&self, raw: &[u8]) -> Result<Rendered, RenderError> {
        let text = std::str::from_utf8(raw)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let (block, body) = FrontMatter::split(text);
        let content = self.render_html(body);

        let fm = match block.map(FrontMatter::from_yaml).transpose() {
            Ok(fm) => fm.unwrap_or_default(),
            Err(source) => {
                return Err(RenderError::Metadata {
                    partial: Box::new(Rendered {
                        content,
                        ..Rendered::default()
                    }),
                    source,
                });
            }
        };

        // Without a title the post carries no metadata at all
        if fm.title.is_empty() {
            return Ok(Rendered {
                content,
                ..Rendered::default()
            });
        }

        Ok(Rendered {
            content,
            anchor: slug::slugify(&fm.title),
            title: fm.title,
            date: fm.date,
        })
    }

    /// Render markdown to HTML
    fn render_html(&self, markdown: &str) -> String {
        // Front matter is split off beforehand, so no metadata-block option here
        let options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let parser = Parser::new_ext(markdown, options);

        let mut html_output = String::new();
        if self.options == RenderOptions::default() {
            html::push_html(&mut html_output, parser);
        } else {
            html::push_html(&mut html_output, self.decorate(parser).into_iter());
        }
        html_output
    }

    /// Rewrite headings and external links according to the options
    fn decorate<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events: Vec<Event<'a>> = Vec::new();
        let mut heading: Option<(HeadingLevel, Vec<Event<'a>>)> = None;
        let mut in_external_link = false;

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) if self.options.heading_anchors => {
                    heading = Some((level, Vec::new()));
                }
                Event::End(TagEnd::Heading(_)) if heading.is_some() => {
                    if let Some((level, inner)) = heading.take() {
                        push_heading(&mut events, level, inner);
                    }
                }
                Event::Start(Tag::Link {
                    dest_url, title, ..
                }) if self.options.external_links_new_tab && is_external(&dest_url) => {
                    in_external_link = true;
                    let mut open = format!(r#"<a href="{}""#, html_escape(&dest_url));
                    if !title.is_empty() {
                        open.push_str(&format!(r#" title="{}""#, html_escape(&title)));
                    }
                    open.push_str(r#" target="_blank">"#);
                    emit(&mut events, &mut heading, Event::InlineHtml(open.into()));
                }
                Event::End(TagEnd::Link) if in_external_link => {
                    in_external_link = false;
                    emit(&mut events, &mut heading, Event::InlineHtml("</a>".into()));
                }
                other => emit(&mut events, &mut heading, other),
            }
        }

        events
    }
}

/// Push into the open heading buffer if there is one
fn emit<'a>(
    events: &mut Vec<Event<'a>>,
    heading: &mut Option<(HeadingLevel, Vec<Event<'a>>)>,
    event: Event<'a>,
) {
    match heading {
        Some((_, inner)) => inner.push(event),
        None => events.push(event),
    }
}

fn push_heading<'a>(events: &mut Vec<Event<'a>>, level: HeadingLevel, inner: Vec<Event<'a>>) {
    let tag = heading_tag(level);
    let text: String = inner
        .iter()
        .filter_map(|e| match e {
            Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
            _ => None,
        })
        .collect();
    let id = slug::slugify(&text);

    if id.is_empty() {
        events.push(Event::Html(CowStr::from(format!("<{}>", tag))));
        events.extend(inner);
        events.push(Event::Html(CowStr::from(format!("</{}>\n", tag))));
        return;
    }

    events.push(Event::Html(CowStr::from(format!(r#"<{} id="{}">"#, tag, id))));
    events.extend(inner);
    events.push(Event::Html(CowStr::from(format!(
        r##"<a href="#{}" class="anchor"></a></{}>
"##,
        id, tag
    ))));
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
