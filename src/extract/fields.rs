//! Small helpers shared by layout implementations

use super::{ExtractError, ExtractResult};
use scraper::{ElementRef, Selector};

/// Parses a CSS selector, mapping failures to `ExtractError::Selector`
pub(crate) fn selector(css: &str) -> ExtractResult<Selector> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Text of an element with runs of whitespace collapsed, `None` when blank
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of the first descendant matching `css`
pub(crate) fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    let sel = selector(css).ok()?;
    scope.select(&sel).next().and_then(element_text)
}

/// Non-blank attribute of the first descendant matching `css`
pub(crate) fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css).ok()?;
    scope
        .select(&sel)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collapses every run of whitespace into a single space and trims the ends
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a delimited field value into trimmed, non-empty items
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(collapse_whitespace)
        .filter(|item| !item.is_empty())
        .collect()
}
