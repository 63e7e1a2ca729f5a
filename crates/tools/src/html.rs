//! HTML-to-text helpers shared by the scraping tools, built on `scraper`.

use scraper::{ElementRef, Html};

/// Elements whose text is never part of the readable page.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Inline elements run into their neighbours; everything else is a block
/// and gets separated from surrounding text.
const INLINE: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "em", "i", "kbd", "label", "mark", "q", "s",
    "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Readable page text: hidden elements dropped, entities decoded, whitespace
/// (including non-breaking spaces) collapsed.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    collect_text(document.root_element(), &mut text);
    collapse_whitespace(&text)
}

/// Decoded text of one element and its descendants, whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    collapse_whitespace(&text)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if HIDDEN.contains(&name) {
                continue;
            }
            let block = !INLINE.contains(&name);
            if block {
                out.push(' ');
            }
            collect_text(child, out);
            if block {
                out.push(' ');
            }
        }
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters, with `...` appended when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn page_text_drops_scripts_and_styles() {
        let html = r#"<html><head><title>Ignored</title><STYLE>p { color: red }</STYLE>
            <script type="text/javascript">alert("x")</script></head>
            <body><h1>Paris</h1><p>Capital   of&nbsp;France &amp; more</p>
            <noscript>enable js</noscript></body></html>"#;
        assert_eq!(page_text(html), "Paris Capital of France & more");
    }

    #[test]
    fn named_and_numeric_entities_are_decoded() {
        assert_eq!(
            page_text("<p>It&#8217;s a caf&eacute; &mdash; 5&nbsp;&lt;&nbsp;6&hellip;</p>"),
            "It\u{2019}s a caf\u{e9} \u{2014} 5 < 6\u{2026}"
        );
        assert_eq!(page_text("<p>&#x27;quoted&#39; &amp;lt;</p>"), "'quoted' &lt;");
    }

    #[test]
    fn unterminated_script_swallows_rest() {
        assert_eq!(page_text("<p>keep</p><script>var a = 1;"), "keep");
    }

    #[test]
    fn blocks_are_separated_but_inline_runs_are_not() {
        assert_eq!(page_text("<div>Rust</div><div>lang</div>"), "Rust lang");
        assert_eq!(page_text("<p>Ru<b>st</b>acean</p><p>crab</p>"), "Rustacean crab");
    }

    #[test]
    fn element_text_reads_one_subtree() {
        let document = Html::parse_fragment(r#"<div><a class="t">Paris - <b>Wikipedia</b></a><p>other</p></div>"#);
        let selector = Selector::parse("a.t").unwrap();
        let link = document.select(&selector).next().unwrap();
        assert_eq!(element_text(link), "Paris - Wikipedia");
    }

    #[test]
    fn truncation_is_char_based() {
        assert_eq!(truncate_with_ellipsis("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("exact", 5), "exact");
    }
}
