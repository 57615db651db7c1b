//! SkyNovels (Spanish). Metadata and chapter lists come from the JSON API; chapter text is
//! scraped from the server-rendered reader page.

use crate::model::{ChapterRef, NovelDetail, NovelStatus, SearchResult};
use crate::provider::api::{
    decode_chapters, decode_novels, failure_signature_in, first_present, poster_url,
    rating_from_five, ChapterRecord, NovelRecord, CHAPTER_NAME_FIELDS, CHAPTER_SLUG_FIELDS,
};
use crate::provider::{
    parse_id_from_url, Fetch, FetchedPage, NovelProvider, ProviderError, ProviderSettings,
};
use reqwest::Url;
use scraper::{Html, Selector};

/// Why a chapters endpoint candidate was abandoned.
#[derive(Debug, thiserror::Error)]
enum EndpointMiss {
    #[error("request failed: {0}")]
    Request(ProviderError),
    #[error("body contains {0:?}")]
    FailureSignature(&'static str),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Decode(ProviderError),
    #[error("empty chapter list")]
    Empty,
}

/// Parse a CSS selector or return an error (avoids panics from Selector::parse).
fn parse_selector(sel: &str) -> Result<Selector, ProviderError> {
    Selector::parse(sel).map_err(|e| ProviderError::InvalidSelector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// Pick the chapter container from a reader page using `selectors` in order.
///
/// The first selector matching any element decides the outcome: its inner HTML,
/// re-parsed and re-serialized, or None when that content is blank. None as well
/// when nothing matches.
pub fn extract_chapter_html(
    html: &str,
    selectors: &[String],
) -> Result<Option<String>, ProviderError> {
    let selectors = selectors
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>, _>>()?;
    let doc = Html::parse_document(html);
    let Some(element) = selectors.iter().find_map(|sel| doc.select(sel).next()) else {
        return Ok(None);
    };
    let inner = element.inner_html();
    if inner.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(normalize_fragment(&inner)))
}

fn normalize_fragment(html: &str) -> String {
    Html::parse_fragment(html).root_element().inner_html()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flatten the API's HTML synopsis to plain text, one blank line between paragraphs.
/// Blank becomes None.
fn synopsis_text(content: &str) -> Option<String> {
    let fragment = Html::parse_fragment(content);
    let paragraphs: Vec<String> = match parse_selector("p") {
        Ok(p_sel) => fragment
            .select(&p_sel)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };
    let text = if paragraphs.is_empty() {
        collapse_whitespace(&fragment.root_element().text().collect::<String>())
    } else {
        paragraphs.join("\n\n")
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// SkyNovels provider over any [Fetch] implementation.
pub struct SkyNovelsProvider<F> {
    fetcher: F,
    settings: ProviderSettings,
}

impl<F: Fetch> SkyNovelsProvider<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_settings(fetcher, ProviderSettings::default())
    }

    pub fn with_settings(fetcher: F, settings: ProviderSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn get(&self, url: &str) -> Result<FetchedPage, ProviderError> {
        self.fetcher.get(url, &self.settings.main_url)
    }

    /// GET and require a success status.
    fn get_ok(&self, url: &str, context: &str) -> Result<String, ProviderError> {
        let page = self.get(url)?;
        if !page.is_success() {
            return Err(ProviderError::HttpStatus {
                status: page.status,
                url: url.to_string(),
                context: Some(context.to_string()),
            });
        }
        Ok(page.body)
    }

    fn search_url(&self, query: &str) -> Result<String, ProviderError> {
        let base = format!("{}/novels", self.settings.api_base);
        Url::parse_with_params(&base, &[("search", query)])
            .map(|u| u.to_string())
            .map_err(|e| ProviderError::InvalidUrl {
                input: base,
                reason: e.to_string(),
            })
    }

    fn novel_url(&self, id: u64, slug: &str) -> String {
        format!("{}/novelas/{}/{}", self.settings.main_url, id, slug)
    }

    /// Text search. Same envelope as [Self::fetch_novel], different query parameter.
    fn search_novels(&self, query: &str) -> Result<Vec<NovelRecord>, ProviderError> {
        let url = self.search_url(query)?;
        let body = self.get_ok(&url, "search")?;
        decode_novels(&url, &body)
    }

    /// Lookup by id. First record of the envelope, if any.
    fn fetch_novel(&self, id: u64) -> Result<Option<NovelRecord>, ProviderError> {
        let url = format!("{}/novels?id={}", self.settings.api_base, id);
        let body = self.get_ok(&url, &format!("novel {}", id))?;
        Ok(decode_novels(&url, &body)?.into_iter().next())
    }

    fn try_chapter_endpoint(&self, url: &str) -> Result<Vec<(usize, ChapterRecord)>, EndpointMiss> {
        let page = self.get(url).map_err(EndpointMiss::Request)?;
        if let Some(sig) = failure_signature_in(&page.body) {
            return Err(EndpointMiss::FailureSignature(sig.marker));
        }
        if !page.is_success() {
            return Err(EndpointMiss::Status(page.status));
        }
        let records = decode_chapters(url, &page.body).map_err(EndpointMiss::Decode)?;
        if records.is_empty() {
            return Err(EndpointMiss::Empty);
        }
        Ok(records)
    }

    /// Walk the chapter endpoint candidates and map the first non-empty list.
    /// Returns an empty list when every candidate misses.
    fn fetch_chapters(&self, novel_id: u64, novel_slug: Option<&str>) -> Vec<ChapterRef> {
        for query in &self.settings.chapter_endpoints {
            let url = format!(
                "{}/novel/{}/chapters?{}",
                self.settings.api_base, novel_id, query
            );
            match self.try_chapter_endpoint(&url) {
                Ok(records) => {
                    tracing::debug!(%url, count = records.len(), "chapter list fetched");
                    return records
                        .iter()
                        .map(|(position, record)| {
                            self.chapter_ref(novel_id, novel_slug.unwrap_or(""), *position, record)
                        })
                        .collect();
                }
                Err(miss) => {
                    tracing::debug!(%url, error = %miss, "chapter endpoint missed, trying next");
                }
            }
        }
        tracing::warn!(novel_id, "no chapter endpoint returned chapters");
        Vec::new()
    }

    fn chapter_ref(
        &self,
        novel_id: u64,
        novel_slug: &str,
        position: usize,
        record: &ChapterRecord,
    ) -> ChapterRef {
        let order = record.order.unwrap_or(position as u32 + 1);
        let name = first_present(record, CHAPTER_NAME_FIELDS)
            .map(String::from)
            .unwrap_or_else(|| format!("Capítulo {}", order));
        let slug = first_present(record, CHAPTER_SLUG_FIELDS)
            .map(String::from)
            .unwrap_or_else(|| format!("capitulo-{}", order));
        ChapterRef {
            name,
            url: format!(
                "{}/novelas/{}/{}/{}/{}",
                self.settings.main_url,
                novel_id,
                novel_slug,
                record.id.unwrap_or(0),
                slug
            ),
            date_of_release: record.updated_at.clone(),
            order,
        }
    }

    fn search_result(&self, record: NovelRecord) -> Option<SearchResult> {
        let name = record.title?;
        let slug = record.slug?;
        Some(SearchResult {
            url: self.novel_url(record.id, &slug),
            name,
            poster_url: poster_url(&self.settings.api_base, record.image.as_deref(), false),
            rating: rating_from_five(record.rating5),
            latest_chapter: record.chapters_count.map(|n| format!("Capítulos: {}", n)),
        })
    }
}

impl<F: Fetch> NovelProvider for SkyNovelsProvider<F> {
    fn name(&self) -> &str {
        "SkyNovels"
    }

    fn main_url(&self) -> &str {
        &self.settings.main_url
    }

    fn lang(&self) -> &str {
        "es"
    }

    fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let records = self.search_novels(query)?;
        let total = records.len();
        let results: Vec<SearchResult> = records
            .into_iter()
            .filter_map(|r| self.search_result(r))
            .collect();
        tracing::debug!(query, total, kept = results.len(), "search finished");
        Ok(results)
    }

    fn load(&self, url: &str) -> Result<Option<NovelDetail>, ProviderError> {
        let Some(id) = parse_id_from_url(url) else {
            tracing::debug!(url, "no novel id in URL");
            return Ok(None);
        };
        let Some(novel) = self.fetch_novel(id)? else {
            tracing::debug!(id, "novel not found");
            return Ok(None);
        };
        let chapters = self.fetch_chapters(id, novel.slug.as_deref());

        let name = novel
            .title
            .clone()
            .or_else(|| novel.slug.clone())
            .unwrap_or_else(|| format!("Novel {}", id));
        Ok(Some(NovelDetail {
            id: novel.id,
            url: self.novel_url(novel.id, novel.slug.as_deref().unwrap_or("")),
            name,
            slug: novel.slug,
            author: novel.writer,
            poster_url: poster_url(&self.settings.api_base, novel.image.as_deref(), false),
            synopsis: novel.content.as_deref().and_then(synopsis_text),
            status: NovelStatus::from_label(novel.status.as_deref()),
            status_label: novel.status,
            tags: novel
                .genres
                .unwrap_or_default()
                .into_iter()
                .filter_map(|g| g.genre_name)
                .collect(),
            rating: rating_from_five(novel.rating5),
            chapters,
        }))
    }

    /// Error pages are still searched for content; the status code alone never fails
    /// the call, so a 404 reader page reads as "no content" rather than an error.
    fn load_html(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let page = self.get(url)?;
        if !page.is_success() {
            tracing::debug!(url, status = page.status, "chapter page returned non-success status");
        }
        let html = extract_chapter_html(&page.body, &self.settings.content_selectors)?;
        if html.is_none() {
            tracing::debug!(url, "no server-rendered chapter content");
        }
        Ok(html)
    }
}
