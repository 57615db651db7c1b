//! Wire shapes of the SkyNovels API and the small amount of logic that interprets them:
//! lenient per-record decoding, field fallback chains, and known failure signatures.

use crate::provider::ProviderError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `{"novels": [...]}`. Records stay raw so each one can fail to decode on its own.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NovelsEnvelope {
    novels: Option<Vec<Value>>,
}

/// `{"chapters": [...]}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChaptersEnvelope {
    chapters: Option<Vec<Value>>,
}

/// One novel as returned by `/novels?search=` and `/novels?id=`.
///
/// Scalars are decoded leniently: the backend sometimes sends numbers as strings
/// (`"nvl_rating": "4.50"`), and a field of the wrong type reads as absent instead of
/// dropping the record. Only a missing or non-numeric `id` rejects it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NovelRecord {
    #[serde(deserialize_with = "required_u64")]
    pub id: u64,
    #[serde(rename = "nvl_title", default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(rename = "nvl_name", default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(rename = "nvl_writer", default, deserialize_with = "lenient_string")]
    pub writer: Option<String>,
    #[serde(rename = "nvl_content", default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
    #[serde(rename = "nvl_status", default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "nvl_rating", default, deserialize_with = "lenient_f64")]
    pub rating5: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_genres")]
    pub genres: Option<Vec<GenreRecord>>,
    #[serde(rename = "nvl_chapters", default, deserialize_with = "lenient_i64")]
    pub chapters_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GenreRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub genre_name: Option<String>,
}

/// One chapter entry from `/novel/{id}/chapters`. Every field is optional; the API
/// is inconsistent about which of the naming fields it fills in.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChapterRecord {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub order: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub chp_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

fn string_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn f64_from_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

fn u64_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn i64_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(string_from_value))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(f64_from_value))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(u64_from_value))
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_u64(d)?.and_then(|n| u32::try_from(n).ok()))
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(i64_from_value))
}

fn required_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(d)?;
    u64_from_value(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a numeric id, got {}", value)))
}

/// Genres that are not objects are dropped individually; a non-array reads as absent.
fn lenient_genres<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<GenreRecord>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|g| serde_json::from_value(g).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Reads one optional string field from a chapter record.
pub(crate) type FieldAccessor = fn(&ChapterRecord) -> Option<&str>;

fn title_field(c: &ChapterRecord) -> Option<&str> {
    c.title.as_deref()
}

fn chp_title_field(c: &ChapterRecord) -> Option<&str> {
    c.chp_title.as_deref()
}

fn name_field(c: &ChapterRecord) -> Option<&str> {
    c.name.as_deref()
}

fn slug_field(c: &ChapterRecord) -> Option<&str> {
    c.slug.as_deref()
}

/// Display name: title, chp_title, name, slug.
pub(crate) const CHAPTER_NAME_FIELDS: &[FieldAccessor] =
    &[title_field, chp_title_field, name_field, slug_field];

/// URL slug: slug, name.
pub(crate) const CHAPTER_SLUG_FIELDS: &[FieldAccessor] = &[slug_field, name_field];

/// First field in `chain` that is present on `record`.
pub(crate) fn first_present<'a>(record: &'a ChapterRecord, chain: &[FieldAccessor]) -> Option<&'a str> {
    chain.iter().find_map(|field| field(record))
}

/// A marker string whose presence in a response body means the endpoint failed,
/// whatever the status code says.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailureSignature {
    pub marker: &'static str,
    pub ignore_case: bool,
}

impl FailureSignature {
    pub fn matches(&self, body: &str) -> bool {
        if self.ignore_case {
            body.to_lowercase().contains(&self.marker.to_lowercase())
        } else {
            body.contains(self.marker)
        }
    }
}

/// Known bodies of a broken chapters endpoint: the backend's own error message
/// (`{"message":"El servidor no responde"}`) and Express's 404 page.
pub(crate) const CHAPTER_FAILURE_SIGNATURES: &[FailureSignature] = &[
    FailureSignature {
        marker: "El servidor no responde",
        ignore_case: true,
    },
    FailureSignature {
        marker: "Cannot GET",
        ignore_case: false,
    },
];

/// Returns the first failure signature found in `body`, if any.
pub(crate) fn failure_signature_in(body: &str) -> Option<&'static FailureSignature> {
    CHAPTER_FAILURE_SIGNATURES.iter().find(|sig| sig.matches(body))
}

/// Decode a novels envelope. A body that is not a JSON object of the expected shape is
/// an error; individual records that fail to decode are dropped.
pub(crate) fn decode_novels(url: &str, body: &str) -> Result<Vec<NovelRecord>, ProviderError> {
    let envelope: NovelsEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode {
            url: url.to_string(),
            source: e,
        })?;
    Ok(envelope
        .novels
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<NovelRecord>(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable novel record");
                None
            }
        })
        .collect())
}

/// Decode a chapters envelope, keeping each record's position in the raw array
/// (0-based) so ordering can fall back to it.
pub(crate) fn decode_chapters(
    url: &str,
    body: &str,
) -> Result<Vec<(usize, ChapterRecord)>, ProviderError> {
    let envelope: ChaptersEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode {
            url: url.to_string(),
            source: e,
        })?;
    Ok(envelope
        .chapters
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(
            |(position, raw)| match serde_json::from_value::<ChapterRecord>(raw) {
                Ok(record) => Some((position, record)),
                Err(e) => {
                    tracing::debug!(position, error = %e, "skipping undecodable chapter record");
                    None
                }
            },
        )
        .collect())
}

/// Rescale the API's 0-5 rating to the 0-1000 integer scale. Missing counts as 0.
pub(crate) fn rating_from_five(rating5: Option<f64>) -> i32 {
    (rating5.unwrap_or(0.0) * 200.0) as i32
}

/// `{api}/get-image/<image>/novels/<true|false>`; `is_chapter` selects the chapter-image variant.
pub(crate) fn poster_url(api_base: &str, image: Option<&str>, is_chapter: bool) -> Option<String> {
    let image = image.map(str::trim).filter(|s| !s.is_empty())?;
    Some(format!(
        "{}/get-image/{}/novels/{}",
        api_base, image, is_chapter
    ))
}
