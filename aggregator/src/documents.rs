//! Typed views over the upstream JSON documents.
//!
//! Only the fields the aggregation reads are modelled. Absent or null fields
//! read as empty, matching how a missing value is reported to clients.

use serde::Deserialize;
use std::collections::BTreeMap;

const WIKIPEDIA_RELATION: &str = "wikipedia";

/// `GET /ws/2/artist/{id}?inc=url-rels+release-groups`
#[derive(Debug, Deserialize)]
pub struct ArtistDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default, rename = "release-groups")]
    release_groups: Vec<ReleaseGroup>,
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(default, rename = "type")]
    relation_type: Option<String>,
    #[serde(default)]
    url: Option<RelationUrl>,
}

#[derive(Debug, Deserialize)]
struct RelationUrl {
    #[serde(default)]
    resource: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseGroup {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl ReleaseGroup {
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

impl ArtistDocument {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Page title of the artist's Wikipedia article: the last path segment of
    /// the last wikipedia relation, still percent-encoded as it appears in
    /// the link.
    pub fn wikipedia_title(&self) -> Option<&str> {
        self.relations
            .iter()
            .filter(|rel| rel.relation_type.as_deref() == Some(WIKIPEDIA_RELATION))
            .filter_map(|rel| rel.url.as_ref()?.resource.as_deref())
            .filter_map(|resource| resource.rsplit('/').next())
            .filter(|title| !title.is_empty())
            .last()
    }

    /// Album-like children in document order.
    pub fn release_groups(&self) -> &[ReleaseGroup] {
        &self.release_groups
    }
}

/// `GET /release-group/{id}` on the Cover Art Archive.
#[derive(Debug, Deserialize)]
struct CoverArtDocument {
    #[serde(default)]
    images: Vec<CoverArtImage>,
}

#[derive(Debug, Deserialize)]
struct CoverArtImage {
    #[serde(default)]
    image: Option<String>,
}

/// Link to the first listed image, empty if there is none.
pub fn cover_art_image(body: &str) -> Result<String, serde_json::Error> {
    let document: CoverArtDocument = serde_json::from_str(body)?;
    Ok(document
        .images
        .into_iter()
        .next()
        .and_then(|image| image.image)
        .unwrap_or_default())
}

/// `action=query&prop=extracts` on the Wikipedia API.
#[derive(Debug, Deserialize)]
struct SummaryDocument {
    #[serde(default)]
    query: Option<SummaryQuery>,
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    pages: BTreeMap<String, SummaryPage>,
}

#[derive(Debug, Deserialize)]
struct SummaryPage {
    #[serde(default)]
    extract: Option<String>,
}

/// HTML intro of the first returned page, empty if the page is missing.
pub fn wikipedia_extract(body: &str) -> Result<String, serde_json::Error> {
    let document: SummaryDocument = serde_json::from_str(body)?;
    Ok(document
        .query
        .into_iter()
        .flat_map(|query| query.pages.into_values())
        .find_map(|page| page.extract)
        .unwrap_or_default())
}
