//! HTML parser for extracting articles and outbound links
//!
//! This module handles parsing HTML content to extract:
//! - The article (title, publish date, body) from the page's "full story" region
//! - Same-site outbound links from anchors anywhere in the document

use crate::config::SelectorConfig;
use crate::storage::Article;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Compiled CSS selectors for every field the parser reads
#[derive(Debug, Clone)]
pub struct PageSelectors {
    story: Selector,
    title: Selector,
    content: Selector,
    date_published: Selector,
    link: Selector,
}

impl PageSelectors {
    /// Compiles the configured selectors, rejecting any that are not valid CSS
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            story: compile_selector("story", &config.story)?,
            title: compile_selector("title", &config.title)?,
            content: compile_selector("content", &config.content)?,
            date_published: compile_selector("date-published", &config.date_published)?,
            link: compile_selector("link", &config.link)?,
        })
    }
}

fn compile_selector(field: &str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", field, css, e)))
}

/// Decides which anchors count as same-site outbound links
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base_url: String,
    resolve_relative: bool,
}

impl LinkFilter {
    pub fn new(base_url: impl Into<String>, resolve_relative: bool) -> Self {
        Self {
            base_url: base_url.into(),
            resolve_relative,
        }
    }

    /// Returns the link to record for an href, or None if it is off-site
    ///
    /// An href already prefixed by the base URL is kept verbatim. Other hrefs are
    /// only considered when relative resolution is enabled.
    pub fn accept(&self, href: &str, page_url: Option<&Url>) -> Option<String> {
        if href.starts_with(&self.base_url) {
            return Some(href.to_string());
        }

        if !self.resolve_relative {
            return None;
        }

        let resolved = resolve_link(href, page_url?)?;
        resolved.starts_with(&self.base_url).then_some(resolved)
    }
}

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub article: Article,

    /// Same-site links in document order, duplicates included
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the article and outbound links
///
/// # Article Extraction Rules
///
/// All elements matching the story selector form the story region (a page may
/// use either layout). Within that region:
/// - the first title match is the title
/// - every content match, trimmed and non-empty, is a paragraph of the body
/// - the first publish-date match is the date
///
/// Missing fields are empty strings, not errors.
///
/// # Link Extraction Rules
///
/// Every anchor in the document is checked against the [`LinkFilter`].
/// Deduplication is left to the frontier.
///
/// # Example
///
/// ```no_run
/// use news_harvest::config::SelectorConfig;
/// use news_harvest::crawler::{parse_page, LinkFilter, PageSelectors};
///
/// let html = r#"<div class="fullstory"><h1>Headline</h1><p>Body</p></div>"#;
/// let selectors = PageSelectors::compile(&SelectorConfig::default()).unwrap();
/// let filter = LinkFilter::new("https://example.com", false);
/// let parsed = parse_page(html, "https://example.com/story", &selectors, &filter);
/// assert_eq!(parsed.article.title, "Headline");
/// ```
pub fn parse_page(
    html: &str,
    url: &str,
    selectors: &PageSelectors,
    filter: &LinkFilter,
) -> ParsedPage {
    let document = Html::parse_document(html);

    let article = extract_article(&document, url, selectors);
    let links = extract_links(&document, url, selectors, filter);

    ParsedPage { article, links }
}

fn extract_article(document: &Html, url: &str, selectors: &PageSelectors) -> Article {
    let regions: Vec<ElementRef> = document.select(&selectors.story).collect();

    let title = select_in_regions(&regions, &selectors.title)
        .into_iter()
        .next()
        .map(element_text)
        .unwrap_or_default();

    let date_published = select_in_regions(&regions, &selectors.date_published)
        .into_iter()
        .next()
        .map(element_text)
        .unwrap_or_default();

    let content = select_in_regions(&regions, &selectors.content)
        .into_iter()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Article {
        url: url.to_string(),
        title,
        date_published,
        content,
    }
}

/// Matches inside every region, each element once even when regions nest
fn select_in_regions<'a>(regions: &[ElementRef<'a>], selector: &Selector) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    regions
        .iter()
        .flat_map(|region| region.select(selector))
        .filter(|element| seen.insert((**element).id()))
        .collect()
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn extract_links(
    document: &Html,
    url: &str,
    selectors: &PageSelectors,
    filter: &LinkFilter,
) -> Vec<String> {
    let page_url = Url::parse(url).ok();

    document
        .select(&selectors.link)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| filter.accept(href, page_url.as_ref()))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
