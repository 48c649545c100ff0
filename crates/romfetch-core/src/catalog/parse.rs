//! Extract archive links and MD5 annotations from a catalog page.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::checksum::Md5Hex;
use crate::url_model::is_zip_link;

/// Archive links and checksums in document order.
///
/// Every `small.md5` annotation keeps its slot; one whose digest cannot be
/// parsed is `None` so later digests stay aligned with their rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub archives: Vec<String>,
    pub checksums: Vec<Option<Md5Hex>>,
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static CSS selector")
}

/// Parse catalog HTML. Relative `href`s are resolved against `page_url`.
pub fn parse_listing(html: &str, page_url: &Url) -> Listing {
    let doc = Html::parse_document(html);

    let archives = doc
        .select(&selector("a[href]"))
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| is_zip_link(href))
        .map(|href| {
            page_url
                .join(href)
                .map(String::from)
                .unwrap_or_else(|_| href.to_string())
        })
        .collect();

    let checksums = doc
        .select(&selector("small.md5"))
        .map(md5_from_annotation)
        .collect();

    Listing {
        archives,
        checksums,
    }
}

/// `md5: 0123...cdef` → digest. Non-ASCII is dropped; the digest is the first
/// whitespace-separated token after the first `:` (or of the whole text when
/// there is no `:`).
fn md5_from_annotation(el: ElementRef<'_>) -> Option<Md5Hex> {
    let text: String = el.text().flat_map(str::chars).filter(char::is_ascii).collect();
    let value = text.split_once(':').map(|(_, v)| v).unwrap_or(&text);
    let Some(token) = value.split_whitespace().next() else {
        tracing::warn!("empty md5 annotation");
        return None;
    };
    match token.parse() {
        Ok(md5) => Some(md5),
        Err(e) => {
            tracing::warn!("unusable md5 annotation: {}", e);
            None
        }
    }
}
