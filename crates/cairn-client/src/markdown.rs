//! Markdown ↔ HTML for article bodies.
//!
//! Articles are stored as Markdown. [`render`] turns them into sanitized HTML
//! for display, [`excerpt`] into plain text for previews and [`from_html`]
//! turns editor HTML back into Markdown.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, TagEnd, html};
use regex::Regex;

static BLANK_RUNS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("blank-line pattern compiles"));

fn options() -> Options {
  Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render article Markdown to HTML that is safe to inject into a page.
///
/// Supports GitHub Flavored Markdown tables, strikethrough and task lists.
/// Raw HTML in the source is passed through the sanitizer, so scripts, event
/// handlers and `javascript:` links are stripped.
pub fn render(raw: &str) -> String {
  let mut unsafe_html = String::new();
  html::push_html(&mut unsafe_html, Parser::new_ext(raw, options()));

  let mut sanitizer = ammonia::Builder::default();
  sanitizer
    .add_tags(&["input"])
    .add_tag_attributes("input", &["type", "checked", "disabled"]);
  sanitizer.clean(&unsafe_html).to_string()
}

/// Plain text of `raw` with whitespace collapsed, cut to at most `max_chars`
/// characters. A cut excerpt ends in `…`.
pub fn excerpt(raw: &str, max_chars: usize) -> String {
  let mut text = String::new();
  for event in Parser::new_ext(raw, options()) {
    match event {
      Event::Text(t) | Event::Code(t) => text.push_str(&t),
      Event::SoftBreak
      | Event::HardBreak
      | Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::TableCell) => {
        text.push(' ')
      }
      _ => {}
    }
  }

  let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
  if collapsed.chars().count() <= max_chars {
    return collapsed;
  }
  let mut cut: String = collapsed.chars().take(max_chars.saturating_sub(1)).collect();
  cut.truncate(cut.trim_end().len());
  cut.push('…');
  cut
}

/// Convert editor HTML back to Markdown.
///
/// Headings, paragraphs, emphasis, links, lists, blockquotes and code
/// survive the trip. The input is sanitized first, so scripts and
/// event handlers never reach the Markdown. Runs of blank lines collapse to
/// one and the result is trimmed.
pub fn from_html(html: &str) -> String {
  if html.trim().is_empty() {
    return String::new();
  }
  let clean = ammonia::clean(html);
  let markdown = match htmd::convert(&clean) {
    Ok(markdown) => markdown,
    Err(err) => {
      tracing::warn!(%err, "html to markdown conversion failed, keeping text only");
      ammonia::Builder::empty().clean(&clean).to_string()
    }
  };
  BLANK_RUNS.replace_all(&markdown, "\n\n").trim().to_owned()
}
