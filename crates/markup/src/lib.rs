//! Markdown to HTML rendering for post bodies.
//!
//! Posts are stored as Markdown source and rendered on the way out. The
//! renderer is CommonMark with a handful of common extensions switched on
//! (tables, strikethrough, footnotes and task lists). Raw HTML in the source
//! is passed through untouched; sanitizing is the presentation layer's job.

use pulldown_cmark::{Options, Parser, html};
use tracing::instrument;

/// Extensions enabled on top of plain CommonMark.
pub fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES | Options::ENABLE_TASKLISTS
}

/// Render Markdown source into an HTML fragment.
#[instrument(level = "trace", skip(source), fields(source_size = source.as_ref().len()))]
pub fn to_html(source: impl AsRef<str>) -> String {
    let source = source.as_ref();
    let parser = Parser::new_ext(source, options());
    // Rendered HTML is almost always longer than its source.
    let mut output = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut output, parser);
    output
}
