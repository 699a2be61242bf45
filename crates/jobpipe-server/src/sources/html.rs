//! HTML helpers shared by the adapters

use scraper::{Html, Selector};

/// Visible text of an HTML fragment with whitespace collapsed
pub fn html_to_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    collapse_whitespace(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first selector in `selectors` that matches something in `page`.
/// Every match of that selector is joined, as multi-part descriptions are common.
pub fn select_text(page: &str, selectors: &[String]) -> Option<String> {
    let doc = Html::parse_document(page);

    selectors
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|selector| {
            let parts: Vec<String> = doc
                .select(&selector)
                .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
                .filter(|text| !text.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n\n"))
        })
}
