use std::fmt;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};
use tracing::warn;

use crate::{Error, Result};

/// Markup shown in place of a preview that could not be rendered.
pub const RENDER_ERROR_HTML: &str = "<p>Error rendering markdown</p>";

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Create a `pulldown-cmark` parser with our default options enabled.
pub fn parser(source: &str) -> Parser<'_> {
    Parser::new_ext(source, options())
}

fn write_html<W: fmt::Write>(out: W, source: &str) -> Result<()> {
    html::write_html_fmt(out, parser(source)).map_err(Error::Render)
}

/// Render markdown to an HTML fragment.
pub fn to_html(source: &str) -> Result<String> {
    let mut out = String::with_capacity(source.len() * 3 / 2);
    write_html(&mut out, source)?;
    Ok(out)
}

fn or_error_markup(rendered: Result<String>) -> String {
    rendered.unwrap_or_else(|err| {
        warn!(error = %err, "markdown preview failed");
        RENDER_ERROR_HTML.to_owned()
    })
}

/// HTML for the preview pane. Empty documents render to nothing and render
/// failures fall back to [`RENDER_ERROR_HTML`].
pub fn preview_html(source: &str) -> String {
    if source.is_empty() {
        return String::new();
    }
    or_error_markup(to_html(source))
}

/// Render markdown to a simple plain-text representation.
///
/// Used for terminal previews where HTML is not useful.
pub fn plain_text(source: &str) -> String {
    let mut out = String::new();
    let mut last_was_newline = true;

    let push_newline = |out: &mut String, last_was_newline: &mut bool| {
        if !*last_was_newline {
            out.push('\n');
            *last_was_newline = true;
        }
    };

    for event in parser(source) {
        match event {
            Event::Text(text) | Event::Code(text) => {
                out.push_str(text.as_ref());
                last_was_newline = false;
            }
            Event::Start(Tag::Item) => {
                out.push_str("- ");
                last_was_newline = false;
            }
            Event::TaskListMarker(done) => {
                out.push_str(if done { "[x] " } else { "[ ] " });
                last_was_newline = false;
            }
            Event::SoftBreak | Event::HardBreak => push_newline(&mut out, &mut last_was_newline),
            Event::Rule => {
                push_newline(&mut out, &mut last_was_newline);
                out.push_str("---");
                last_was_newline = false;
                push_newline(&mut out, &mut last_was_newline);
            }
            Event::End(end) => match end {
                TagEnd::Paragraph
                | TagEnd::Heading { .. }
                | TagEnd::BlockQuote(_)
                | TagEnd::CodeBlock
                | TagEnd::Item
                | TagEnd::List(_)
                | TagEnd::Table
                | TagEnd::TableHead
                | TagEnd::TableRow => push_newline(&mut out, &mut last_was_newline),
                TagEnd::TableCell => {
                    if !last_was_newline {
                        out.push('\t');
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    out
}
