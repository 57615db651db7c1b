//! skynovels: SkyNovels content provider (search, novel details, chapter HTML) and a small CLI host.

pub mod cli;
pub mod config;
pub mod formats;
pub mod model;
pub mod provider;

// Re-exports for CLI and consumers.
pub use formats::{FormatError, OutputFormat};
pub use model::{ChapterRef, NovelDetail, NovelStatus, SearchResult};
pub use provider::{
    parse_id_from_url, Fetch, FetchedPage, NovelProvider, PoliteClient, PoliteClientBuilder,
    ProviderError, ProviderSettings, SkyNovelsProvider,
};
