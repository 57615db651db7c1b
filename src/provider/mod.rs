//! Content provider contract, the HTTP seam it runs on, and the SkyNovels implementation.

mod api;
mod client;
mod error;

pub mod skynovels;

pub use client::{PoliteClient, PoliteClientBuilder};
pub use error::ProviderError;
pub use skynovels::SkyNovelsProvider;

use crate::model::{NovelDetail, SearchResult};

pub const SKYNOVELS_MAIN_URL: &str = "https://www.skynovels.net";
pub const SKYNOVELS_API_BASE: &str = "https://api.skynovels.net/api";

const NOVEL_PATH_PREFIX: &str = "/novelas/";

/// A fetched response: final URL after redirects, status code, and the body as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests on behalf of a provider. Every request carries a referer.
///
/// Non-success statuses are returned as pages, not errors; the caller decides
/// what a 404 means for it.
pub trait Fetch {
    fn get(&self, url: &str, referer: &str) -> Result<FetchedPage, ProviderError>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn get(&self, url: &str, referer: &str) -> Result<FetchedPage, ProviderError> {
        (**self).get(url, referer)
    }
}

/// Host-facing contract shared by every content source.
///
/// `load` and `load_html` return `Ok(None)` for "nothing here" (unrecognised URL,
/// unknown novel, no server-rendered chapter content) so the host can try another
/// path; `Err` is reserved for transport and decode failures.
pub trait NovelProvider {
    fn name(&self) -> &str;
    fn main_url(&self) -> &str;
    fn lang(&self) -> &str;
    fn has_main_page(&self) -> bool {
        false
    }

    fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError>;
    fn load(&self, url: &str) -> Result<Option<NovelDetail>, ProviderError>;
    fn load_html(&self, url: &str) -> Result<Option<String>, ProviderError>;
}

/// Endpoints and fallback lists for a provider. The fallback lists are tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub main_url: String,
    pub api_base: String,
    /// Query strings for `{api}/novel/{id}/chapters?<query>`.
    pub chapter_endpoints: Vec<String>,
    /// CSS selectors for the chapter content container.
    pub content_selectors: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            main_url: SKYNOVELS_MAIN_URL.to_string(),
            api_base: SKYNOVELS_API_BASE.to_string(),
            chapter_endpoints: vec!["page=1&limit=5000".to_string(), "page=1".to_string()],
            content_selectors: vec![
                ".skn-chp-chapter .skn-chp-chapter-content".to_string(),
                ".skn-chp-chapter-content".to_string(),
                "markdown".to_string(),
            ],
        }
    }
}

/// Extract the numeric novel id from a URL containing `/novelas/<id>/`.
/// The id must be followed by a slash; returns None otherwise or on overflow.
pub fn parse_id_from_url(url: &str) -> Option<u64> {
    let digits = url.match_indices(NOVEL_PATH_PREFIX).find_map(|(pos, prefix)| {
        let rest = &url[pos + prefix.len()..];
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 || rest.as_bytes().get(len) != Some(&b'/') {
            return None;
        }
        Some(&rest[..len])
    })?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_from_novel_url() {
        assert_eq!(
            parse_id_from_url("https://host/novelas/123/some-slug"),
            Some(123)
        );
        assert_eq!(
            parse_id_from_url("https://www.skynovels.net/novelas/45/slug/900/capitulo-1"),
            Some(45)
        );
    }

    #[test]
    fn parse_id_rejects_other_paths() {
        assert_eq!(parse_id_from_url("https://host/other"), None);
        assert_eq!(parse_id_from_url("https://host/novelas/abc/slug"), None);
        assert_eq!(parse_id_from_url("https://host/novelas/123"), None);
        assert_eq!(parse_id_from_url("https://host/novelas//slug"), None);
    }

    #[test]
    fn parse_id_uses_first_matching_segment() {
        assert_eq!(
            parse_id_from_url("https://host/novelas/x/novelas/9/slug"),
            Some(9)
        );
    }

    #[test]
    fn parse_id_overflow_is_none() {
        assert_eq!(
            parse_id_from_url("https://host/novelas/99999999999999999999999/slug"),
            None
        );
    }

    #[test]
    fn fetched_page_success_range() {
        let page = |status| FetchedPage {
            url: String::new(),
            status,
            body: String::new(),
        };
        assert!(page(200).is_success());
        assert!(page(204).is_success());
        assert!(!page(404).is_success());
        assert!(!page(500).is_success());
    }

    #[test]
    fn default_settings_order_primary_endpoint_first() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.chapter_endpoints[0], "page=1&limit=5000");
        assert_eq!(settings.content_selectors.len(), 3);
        assert_eq!(settings.content_selectors[2], "markdown");
    }
}
