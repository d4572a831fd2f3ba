use serde::{Deserialize, Serialize};

/// The aggregate answer for one artist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub name: String,
    #[serde(rename = "mbid")]
    pub id: String,
    pub description: String,
    /// In the order the release groups appear in the artist document.
    pub albums: Vec<AlbumRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub title: String,
    pub id: String,
    /// Empty when no cover art could be found.
    pub image: String,
}
