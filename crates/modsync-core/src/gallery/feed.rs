//! Decoding and version selection for NuGet v2 OData package feeds.

use serde::Deserialize;
use tracing::debug;

use crate::types::ModuleVersion;

use super::PublishedModule;

/// One package entry in a feed response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedEntry {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub is_prerelease: bool,
}

/// A page of feed results and the link to the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub entries: Vec<FeedEntry>,
    pub next: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    d: Body,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Body {
    Paged {
        results: Vec<FeedEntry>,
        #[serde(rename = "__next", default)]
        next: Option<String>,
    },
    Plain(Vec<FeedEntry>),
}

/// Parse a verbose OData JSON response (`{"d": {"results": [...]}}` or
/// `{"d": [...]}`).
pub fn parse_feed(json: &str) -> Result<FeedPage, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(json)?;
    Ok(match envelope.d {
        Body::Paged { results, next } => FeedPage {
            entries: results,
            next,
        },
        Body::Plain(entries) => FeedPage {
            entries,
            next: None,
        },
    })
}

/// Pick the exact requested version, or the latest stable version.
///
/// Package ids compare case-insensitively. Pre-releases are only returned
/// when requested exactly.
pub fn select_version(
    entries: &[FeedEntry],
    name: &str,
    required: Option<&ModuleVersion>,
) -> Option<PublishedModule> {
    let candidates = entries
        .iter()
        .filter(|entry| entry.id.eq_ignore_ascii_case(name))
        .filter_map(|entry| match ModuleVersion::parse(&entry.version) {
            Ok(version) => Some((entry, version)),
            Err(err) => {
                debug!(package = %entry.id, "Skipping unparsable version: {}", err);
                None
            }
        });

    let (entry, version) = match required {
        Some(required) => candidates
            .filter(|(_, version)| version == required)
            .max_by(|(_, a), (_, b)| a.cmp(b)),
        None => candidates
            .filter(|(entry, version)| !entry.is_prerelease && !version.is_prerelease())
            .max_by(|(_, a), (_, b)| a.cmp(b)),
    }?;

    Some(PublishedModule {
        name: entry.id.clone(),
        version,
    })
}
