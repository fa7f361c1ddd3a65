use colored::Colorize;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Inline style flags accumulated while walking the event stream.
#[derive(Default)]
struct Style {
    heading: Option<HeadingLevel>,
    bold: bool,
    italic: bool,
    code_block: bool,
}

/// Render a markdown summary as ANSI-styled terminal text: bold headings,
/// bullet and numbered lists, dimmed code blocks, links as "text (url)".
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(markdown, options);

    let mut out = String::new();
    let mut style = Style::default();
    // One counter per open list; None for bullets.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut item_depth: usize = 0;
    let mut link_dest: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                ensure_blank_line(&mut out);
                style.heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                style.heading = None;
                out.push('\n');
            }
            Event::Start(Tag::Paragraph) => {
                if item_depth == 0 {
                    ensure_blank_line(&mut out);
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if item_depth == 0 {
                    out.push('\n');
                }
            }
            Event::Start(Tag::List(start)) => lists.push(start),
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                item_depth += 1;
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{}{}. ", indent, n));
                        *n += 1;
                    }
                    _ => out.push_str(&format!("{}• ", indent)),
                }
            }
            Event::End(TagEnd::Item) => {
                item_depth = item_depth.saturating_sub(1);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                ensure_blank_line(&mut out);
                style.code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                style.code_block = false;
            }
            Event::Start(Tag::Strong) => style.bold = true,
            Event::End(TagEnd::Strong) => style.bold = false,
            Event::Start(Tag::Emphasis) => style.italic = true,
            Event::End(TagEnd::Emphasis) => style.italic = false,
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_dest = Some(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_dest.take() {
                    out.push_str(&format!(" ({})", url.underline()));
                }
            }
            Event::Text(text) => out.push_str(&styled(&text, &style)),
            Event::Code(code) => out.push_str(&code.yellow().to_string()),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_blank_line(&mut out);
                out.push_str(&format!("{}\n", "────────────────────".dimmed()));
            }
            _ => {}
        }
    }

    format!("{}\n", out.trim_end())
}

fn styled(text: &str, style: &Style) -> String {
    if style.code_block {
        let mut block = String::new();
        for line in text.lines() {
            block.push_str(&format!("    {}\n", line.dimmed()));
        }
        return block;
    }
    if let Some(level) = style.heading {
        return match level {
            HeadingLevel::H1 => text.bold().underline().to_string(),
            _ => text.bold().to_string(),
        };
    }
    match (style.bold, style.italic) {
        (true, true) => text.bold().italic().to_string(),
        (true, false) => text.bold().to_string(),
        (false, true) => text.italic().to_string(),
        (false, false) => text.to_string(),
    }
}

/// Separate block elements with exactly one blank line.
fn ensure_blank_line(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}
