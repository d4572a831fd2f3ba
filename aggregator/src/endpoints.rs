use serde::Deserialize;
use std::borrow::Cow;
use url::Url;

/// Base URLs of the three upstream services.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Upstreams {
    pub musicbrainz: Url,
    pub cover_art_archive: Url,
    pub wikipedia: Url,
}

impl Default for Upstreams {
    fn default() -> Self {
        Upstreams {
            musicbrainz: Url::parse("https://musicbrainz.org").expect("valid static url"),
            cover_art_archive: Url::parse("https://coverartarchive.org")
                .expect("valid static url"),
            wikipedia: Url::parse("https://en.wikipedia.org").expect("valid static url"),
        }
    }
}

impl Upstreams {
    /// Upstream bases that cannot carry a path, e.g. `mailto:`.
    pub fn invalid_bases(&self) -> Vec<&Url> {
        [&self.musicbrainz, &self.cover_art_archive, &self.wikipedia]
            .into_iter()
            .filter(|url| url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https"))
            .collect()
    }

    /// Artist lookup including url relations and release groups.
    pub fn artist_url(&self, id: &str) -> Url {
        let mut url = with_segments(&self.musicbrainz, &["ws", "2", "artist", id]);
        url.query_pairs_mut()
            .append_pair("fmt", "json")
            .append_pair("inc", "url-rels release-groups");
        url
    }

    pub fn cover_art_url(&self, release_group_id: &str) -> Url {
        with_segments(&self.cover_art_archive, &["release-group", release_group_id])
    }

    /// Intro extract for a page title taken from a wikipedia link. The title
    /// may arrive percent-encoded or raw; either way it ends up as exactly one
    /// `titles` value.
    pub fn summary_url(&self, title: &str) -> Url {
        let title = urlencoding::decode(title).unwrap_or(Cow::Borrowed(title));

        let mut url = with_segments(&self.wikipedia, &["w", "api.php"]);
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("prop", "extracts")
            .append_pair("exintro", "true")
            .append_pair("redirects", "true")
            .append_pair("titles", &title);
        url
    }
}

fn with_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
