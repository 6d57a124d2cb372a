//! Markup to question text
//!
//! Used when pages are fetched without a browser. The document is parsed with
//! `scraper` and the text of `<body>` is collected the way `textContent` sees
//! it, minus scripts, styles and other non-text subtrees. Block elements
//! become line breaks.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template"];

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "pre", "tr", "table",
    "section", "article", "header", "footer", "blockquote",
];

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid body selector"));

/// Text of an HTML document's body, one non-empty line per block
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            // Source newlines inside a text node are not line breaks
            Node::Text(text) => out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    if block {
        out.push('\n');
    }
}
