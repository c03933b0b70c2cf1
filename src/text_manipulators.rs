use scraper::{ElementRef, Selector};

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Labelled rows keep their value in a `<b>` child; returns it trimmed,
/// or an empty string when the row has no bold element.
pub fn bold_text(node: ElementRef, bold_selector: &Selector) -> String {
    node.select(bold_selector)
        .next()
        .map(extract_text)
        .unwrap_or_default()
        .trim()
        .to_string()
}
