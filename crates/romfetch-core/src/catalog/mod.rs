//! Catalog lookup: find the newest archive and its MD5 for a device.
//!
//! The catalog is an HTML page at `<base>/?device=<name>` that lists builds
//! with a `.zip` link and a `<small class="md5">md5: ...</small>` annotation
//! each. Which entry is "newest" is decided only by [`select_latest`].

mod parse;

pub use parse::{parse_listing, Listing};

use thiserror::Error;
use url::Url;

use crate::checksum::Md5Hex;
use crate::control::InterruptFlag;
use crate::http::{self, CurlOptions};

/// Newest build for a device as published by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Absolute archive URL; its last path segment ends in `.zip`.
    pub url: String,
    pub checksum: Md5Hex,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog answered with something other than 200. Fatal for the whole run.
    #[error("failed to get ROM catalog from {url}: HTTP {status}")]
    RemoteUnavailable { url: String, status: u32 },
    /// The catalog could not be reached at all. Fatal for the whole run.
    #[error("failed to get ROM catalog from {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },
    /// The page has no archive link or no checksum. The device is skipped.
    #[error("ROM for device {device} seems not to be provided by the catalog")]
    DeviceNotListed { device: String },
    /// The request was aborted because the run was interrupted.
    #[error("catalog request interrupted")]
    Interrupted,
    #[error("invalid catalog URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl CatalogError {
    /// Whether the error should stop the run instead of skipping one device.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CatalogError::DeviceNotListed { .. })
    }
}

/// Source of catalog entries. The pipeline only sees this trait.
pub trait Catalog {
    fn latest(&self, device: &str) -> Result<CatalogEntry, CatalogError>;
}

/// Picks the newest build from a parsed listing.
///
/// The catalog lists newest builds first, so this is the first archive and the
/// first checksum in document order. Nothing on the server guarantees that
/// ordering; if the page layout changes, this is the function to revisit.
/// A first checksum that could not be parsed counts as missing; the second
/// build's digest is never paired with the first build's archive.
pub fn select_latest(device: &str, listing: Listing) -> Result<CatalogEntry, CatalogError> {
    let not_listed = || CatalogError::DeviceNotListed {
        device: device.to_string(),
    };
    let url = listing.archives.into_iter().next().ok_or_else(not_listed)?;
    let checksum = listing
        .checksums
        .into_iter()
        .next()
        .flatten()
        .ok_or_else(not_listed)?;
    Ok(CatalogEntry { url, checksum })
}

/// Catalog served over HTTP by the vendor's download site.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    base: Url,
    curl: CurlOptions,
    interrupt: InterruptFlag,
}

impl HttpCatalog {
    pub fn new(base_url: &str, curl: CurlOptions) -> Result<Self, CatalogError> {
        let base = Url::parse(base_url).map_err(|source| CatalogError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            base,
            curl,
            interrupt: InterruptFlag::default(),
        })
    }

    /// Abort the page request once `flag` is raised.
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = flag;
        self
    }

    /// Catalog page URL for `device`, e.g. `http://dwnld.aicp-rom.com/?device=bacon`.
    pub fn page_url(&self, device: &str) -> Url {
        let mut url = self.base.clone();
        url.set_fragment(None);
        url.query_pairs_mut().clear().append_pair("device", device);
        url
    }
}

impl Catalog for HttpCatalog {
    fn latest(&self, device: &str) -> Result<CatalogEntry, CatalogError> {
        let page = self.page_url(device);
        tracing::debug!(device, url = %page, "fetching catalog page");

        let (status, body) = match http::get_body(page.as_str(), &self.curl, &self.interrupt) {
            Ok(response) => response,
            Err(e) if e.is_aborted_by_callback() && self.interrupt.is_raised() => {
                return Err(CatalogError::Interrupted);
            }
            Err(source) => {
                return Err(CatalogError::Transport {
                    url: page.to_string(),
                    source,
                })
            }
        };
        if status != 200 {
            return Err(CatalogError::RemoteUnavailable {
                url: page.to_string(),
                status,
            });
        }

        let html = String::from_utf8_lossy(&body);
        let listing = parse_listing(&html, &page);
        tracing::debug!(
            device,
            archives = listing.archives.len(),
            checksums = listing.checksums.len(),
            "parsed catalog page"
        );
        select_latest(device, listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md5(s: &str) -> Md5Hex {
        s.parse().unwrap()
    }

    #[test]
    fn select_latest_takes_first_in_document_order() {
        let listing = Listing {
            archives: vec!["b.zip".into(), "a.zip".into()],
            checksums: vec![Some(md5(&"a".repeat(32))), Some(md5(&"b".repeat(32)))],
        };
        let entry = select_latest("bacon", listing).unwrap();
        assert_eq!(entry.url, "b.zip");
        assert_eq!(entry.checksum, md5(&"a".repeat(32)));
    }

    #[test]
    fn select_latest_without_archives_is_not_listed() {
        let listing = Listing {
            archives: vec![],
            checksums: vec![Some(md5(&"a".repeat(32)))],
        };
        let err = select_latest("bacon", listing).unwrap_err();
        assert!(matches!(err, CatalogError::DeviceNotListed { ref device } if device == "bacon"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn select_latest_without_checksums_is_not_listed() {
        let listing = Listing {
            archives: vec!["a.zip".into()],
            checksums: vec![],
        };
        assert!(matches!(
            select_latest("bacon", listing),
            Err(CatalogError::DeviceNotListed { .. })
        ));
    }

    #[test]
    fn unparsable_first_checksum_is_not_listed() {
        let listing = Listing {
            archives: vec!["b.zip".into(), "a.zip".into()],
            checksums: vec![None, Some(md5(&"b".repeat(32)))],
        };
        assert!(matches!(
            select_latest("bacon", listing),
            Err(CatalogError::DeviceNotListed { .. })
        ));
    }

    #[test]
    fn interrupted_lookup_is_not_a_skip() {
        assert!(CatalogError::Interrupted.is_fatal());
    }

    #[test]
    fn page_url_carries_device_query() {
        let c = HttpCatalog::new("http://dwnld.aicp-rom.com", CurlOptions::default()).unwrap();
        assert_eq!(
            c.page_url("bacon").as_str(),
            "http://dwnld.aicp-rom.com/?device=bacon"
        );
        let c = HttpCatalog::new("http://mirror.example.org/aicp/?device=old", CurlOptions::default())
            .unwrap();
        assert_eq!(
            c.page_url("one plus").as_str(),
            "http://mirror.example.org/aicp/?device=one+plus"
        );
    }

    #[test]
    fn remote_unavailable_is_fatal() {
        let err = CatalogError::RemoteUnavailable {
            url: "http://x/".into(),
            status: 503,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            HttpCatalog::new("not a url", CurlOptions::default()),
            Err(CatalogError::InvalidUrl { .. })
        ));
    }
}
