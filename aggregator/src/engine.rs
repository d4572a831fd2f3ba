use crate::documents::{self, ArtistDocument};
use crate::endpoints::Upstreams;
use crate::errors::{BuildError, LookupError};
use crate::metrics_defs::{
    BUILD_DURATION, BUILD_FAILED, BUILD_NOT_FOUND, BUILD_SUCCESS, LOOKUP_DEGRADED,
};
use crate::types::{AlbumRecord, ArtistRecord};
use shared::{counter, histogram};
use tokio::task::JoinSet;
use tokio::time::Instant;
use upstream::{ClientError, ResilientClient};
use url::Url;

/// Result of one spawned dependent lookup, tagged with what it was for.
enum Lookup {
    Summary(Result<String, LookupError>),
    Image {
        // Position of the album in the artist document.
        index: usize,
        result: Result<String, LookupError>,
    },
}

/// Builds [`ArtistRecord`]s in three stages:
///
/// 1. fetch and parse the artist document (any failure ends the build),
/// 2. spawn the summary lookup and one cover art lookup per release group,
/// 3. wait for all of them and assemble the record in document order.
///
/// Dependent lookups that fail leave their field empty. Dropping the future
/// returned by [`AggregationEngine::build`] aborts any lookups still running.
#[derive(Clone)]
pub struct AggregationEngine {
    client: ResilientClient,
    upstreams: Upstreams,
}

impl AggregationEngine {
    pub fn new(client: ResilientClient, upstreams: Upstreams) -> Self {
        AggregationEngine { client, upstreams }
    }

    pub async fn build(&self, id: &str) -> Result<ArtistRecord, BuildError> {
        let started = Instant::now();
        let result = self.build_record(id).await;

        match &result {
            Ok(_) => counter!(BUILD_SUCCESS).increment(1),
            Err(BuildError::NotFound(_)) => counter!(BUILD_NOT_FOUND).increment(1),
            Err(e) => {
                tracing::warn!(id, "artist build failed: {e}");
                counter!(BUILD_FAILED).increment(1);
            }
        }
        histogram!(BUILD_DURATION).record(started.elapsed().as_secs_f64());

        result
    }

    async fn build_record(&self, id: &str) -> Result<ArtistRecord, BuildError> {
        let document = self.fetch_artist(id).await?;

        let mut albums: Vec<AlbumRecord> = document
            .release_groups()
            .iter()
            .map(|release_group| AlbumRecord {
                title: release_group.title().to_owned(),
                id: release_group.id().to_owned(),
                image: String::new(),
            })
            .collect();

        let mut lookups = JoinSet::new();

        if let Some(title) = document.wikipedia_title() {
            let client = self.client.clone();
            let url = self.upstreams.summary_url(title);
            lookups.spawn(async move {
                Lookup::Summary(fetch_and_extract(&client, url, documents::wikipedia_extract).await)
            });
        }

        for (index, album) in albums.iter().enumerate() {
            let client = self.client.clone();
            let url = self.upstreams.cover_art_url(&album.id);
            lookups.spawn(async move {
                let result = fetch_and_extract(&client, url, documents::cover_art_image).await;
                Lookup::Image { index, result }
            });
        }

        tracing::debug!(id, lookups = lookups.len(), "waiting for dependent lookups");

        let mut description = String::new();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok(Lookup::Summary(Ok(summary))) => description = summary,
                Ok(Lookup::Summary(Err(e))) => degraded(id, "summary", &e),
                Ok(Lookup::Image { index, result }) => match result {
                    Ok(image) => {
                        if let Some(album) = albums.get_mut(index) {
                            album.image = image;
                        }
                    }
                    Err(e) => degraded(id, "image", &e),
                },
                Err(e) => {
                    tracing::error!(id, "lookup task panicked: {e}");
                    counter!(LOOKUP_DEGRADED, "lookup" => "unknown", "reason" => "panic")
                        .increment(1);
                }
            }
        }

        Ok(ArtistRecord {
            name: document.name().to_owned(),
            id: id.to_owned(),
            description,
            albums,
        })
    }

    async fn fetch_artist(&self, id: &str) -> Result<ArtistDocument, BuildError> {
        let url = self.upstreams.artist_url(id);
        let body = self
            .client
            .send_resilient(url.as_str())
            .await
            .map_err(|e| match e {
                ClientError::NotFound => BuildError::NotFound(id.to_owned()),
                other => BuildError::Upstream(other),
            })?;

        Ok(ArtistDocument::parse(&body)?)
    }
}

async fn fetch_and_extract(
    client: &ResilientClient,
    url: Url,
    extract: fn(&str) -> Result<String, serde_json::Error>,
) -> Result<String, LookupError> {
    let body = client.send_resilient(url.as_str()).await?;
    Ok(extract(&body)?)
}

fn degraded(id: &str, lookup: &'static str, error: &LookupError) {
    tracing::warn!(id, lookup, "dependent lookup degraded to empty value: {error}");
    counter!(LOOKUP_DEGRADED, "lookup" => lookup, "reason" => error.reason()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{
        BLEACH, NEVERMIND, artist_body, mount_artist, mount_cover, mount_summary, test_engine,
    };
    use std::time::Duration;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NIRVANA: &str = "5b11f4ce-a62d-471e-81fc-a69a8278c7da";

    #[tokio::test]
    async fn test_build_full_record() {
        let server = MockServer::start().await;
        mount_artist(
            &server,
            NIRVANA,
            artist_body("Nirvana", Some("Nirvana_(band)"), &[NEVERMIND, BLEACH]),
        )
        .await;
        mount_cover(&server, NEVERMIND.0, "http://img/nevermind.jpg").await;
        mount_cover(&server, BLEACH.0, "http://img/bleach.jpg").await;
        mount_summary(&server, "Nirvana_(band)", "<p>Nirvana was a band</p>").await;

        let record = test_engine(&server).build(NIRVANA).await.unwrap();

        assert_eq!(record.name, "Nirvana");
        assert_eq!(record.id, NIRVANA);
        assert_eq!(record.description, "<p>Nirvana was a band</p>");
        assert_eq!(
            record.albums,
            vec![
                AlbumRecord {
                    title: "Nevermind".into(),
                    id: NEVERMIND.0.into(),
                    image: "http://img/nevermind.jpg".into(),
                },
                AlbumRecord {
                    title: "Bleach".into(),
                    id: BLEACH.0.into(),
                    image: "http://img/bleach.jpg".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_album_order_ignores_completion_order() {
        let server = MockServer::start().await;
        mount_artist(&server, NIRVANA, artist_body("Nirvana", None, &[NEVERMIND, BLEACH])).await;

        // The first album finishes last.
        Mock::given(method("GET"))
            .and(path(format!("/release-group/{}", NEVERMIND.0)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"images": [{"image": "slow"}]}"#)
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        mount_cover(&server, BLEACH.0, "fast").await;

        let record = test_engine(&server).build(NIRVANA).await.unwrap();

        let albums: Vec<(&str, &str)> = record
            .albums
            .iter()
            .map(|album| (album.title.as_str(), album.image.as_str()))
            .collect();
        assert_eq!(albums, vec![("Nevermind", "slow"), ("Bleach", "fast")]);
    }

    #[tokio::test]
    async fn test_lookups_run_concurrently() {
        let server = MockServer::start().await;
        mount_artist(
            &server,
            NIRVANA,
            artist_body("Nirvana", Some("Nirvana_(band)"), &[NEVERMIND, BLEACH]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path_regex("^/(release-group/.*|w/api.php)$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let started = Instant::now();
        test_engine(&server).build(NIRVANA).await.unwrap();

        // Three sequential lookups would take at least 1.5s.
        assert!(started.elapsed() < Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn test_builds_for_different_artists_run_concurrently() {
        const FOO_FIGHTERS: &str = "67f66c07-6e61-4026-ade5-7e782fad3a5d";
        const THE_COLOUR_AND_THE_SHAPE: (&str, &str) =
            ("5e9ec3a5-1c6c-3e5f-8e8c-2b0b3a8b1c01", "The Colour and the Shape");
        let delay = Duration::from_millis(300);

        let server = MockServer::start().await;
        for (id, body) in [
            (NIRVANA, artist_body("Nirvana", None, &[NEVERMIND])),
            (
                FOO_FIGHTERS,
                artist_body("Foo Fighters", None, &[THE_COLOUR_AND_THE_SHAPE]),
            ),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("/ws/2/artist/{id}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(body)
                        .set_delay(delay),
                )
                .expect(1)
                .mount(&server)
                .await;
        }
        for (release_group_id, image) in [
            (NEVERMIND.0, "http://img/nevermind.jpg"),
            (THE_COLOUR_AND_THE_SHAPE.0, "http://img/colour.jpg"),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("/release-group/{release_group_id}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!(r#"{{"images": [{{"image": "{image}"}}]}}"#))
                        .set_delay(delay),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let engine = test_engine(&server);
        let started = Instant::now();
        let (nirvana, foo_fighters) =
            tokio::join!(engine.build(NIRVANA), engine.build(FOO_FIGHTERS));

        // Run one after the other, the two builds take at least 1.2s.
        assert!(started.elapsed() < Duration::from_millis(1000));

        let nirvana = nirvana.unwrap();
        assert_eq!(nirvana.name, "Nirvana");
        assert_eq!(nirvana.id, NIRVANA);
        assert_eq!(nirvana.albums.len(), 1);
        assert_eq!(nirvana.albums[0].title, "Nevermind");
        assert_eq!(nirvana.albums[0].image, "http://img/nevermind.jpg");

        let foo_fighters = foo_fighters.unwrap();
        assert_eq!(foo_fighters.name, "Foo Fighters");
        assert_eq!(foo_fighters.id, FOO_FIGHTERS);
        assert_eq!(foo_fighters.albums.len(), 1);
        assert_eq!(foo_fighters.albums[0].title, "The Colour and the Shape");
        assert_eq!(foo_fighters.albums[0].image, "http://img/colour.jpg");

        // Both pipelines wrote into the shared cache; each entry is intact.
        let cache = engine.client.cache();
        let cached_nirvana = cache
            .get(engine.upstreams.artist_url(NIRVANA).as_str())
            .await
            .unwrap();
        assert!(cached_nirvana.contains(r#""name":"Nirvana""#));
        let cached_cover = cache
            .get(engine.upstreams.cover_art_url(THE_COLOUR_AND_THE_SHAPE.0).as_str())
            .await
            .unwrap();
        assert!(cached_cover.contains("http://img/colour.jpg"));
    }

    #[tokio::test]
    async fn test_not_found_skips_dependent_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/ws/2/artist/{NIRVANA}")))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = test_engine(&server).build(NIRVANA).await;

        assert!(matches!(result, Err(BuildError::NotFound(id)) if id == NIRVANA));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.path().starts_with("/ws/2/artist/"));
    }

    #[tokio::test]
    async fn test_exhausted_primary_lookup_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/ws/2/artist/{NIRVANA}")))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = test_engine(&server).build(NIRVANA).await;

        assert!(matches!(
            result,
            Err(BuildError::Upstream(ClientError::RetryLimitExceeded { .. }))
        ));
        let requests = server.received_requests().await.unwrap();
        assert!(
            requests
                .iter()
                .all(|request| request.url.path().starts_with("/ws/2/artist/"))
        );
    }

    #[tokio::test]
    async fn test_malformed_artist_document_is_parse_error() {
        let server = MockServer::start().await;
        mount_artist(&server, NIRVANA, "<html>oops</html>".to_string()).await;

        let result = test_engine(&server).build(NIRVANA).await;

        assert!(matches!(result, Err(BuildError::Parse(_))));
    }

    #[tokio::test]
    async fn test_failed_image_lookup_degrades_one_album() {
        let server = MockServer::start().await;
        mount_artist(
            &server,
            NIRVANA,
            artist_body("Nirvana", Some("Nirvana_(band)"), &[NEVERMIND, BLEACH]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(format!("/release-group/{}", NEVERMIND.0)))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_cover(&server, BLEACH.0, "http://img/bleach.jpg").await;
        mount_summary(&server, "Nirvana_(band)", "<p>summary</p>").await;

        let record = test_engine(&server).build(NIRVANA).await.unwrap();

        assert_eq!(record.albums.len(), 2);
        assert_eq!(record.albums[0].title, "Nevermind");
        assert_eq!(record.albums[0].image, "");
        assert_eq!(record.albums[1].image, "http://img/bleach.jpg");
        assert_eq!(record.description, "<p>summary</p>");
    }

    #[tokio::test]
    async fn test_missing_cover_art_and_bad_summary_degrade() {
        let server = MockServer::start().await;
        mount_artist(
            &server,
            NIRVANA,
            artist_body("Nirvana", Some("Nirvana_(band)"), &[NEVERMIND]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(format!("/release-group/{}", NEVERMIND.0)))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let record = test_engine(&server).build(NIRVANA).await.unwrap();

        assert_eq!(record.description, "");
        assert_eq!(record.albums[0].image, "");
        assert_eq!(record.albums[0].title, "Nevermind");
    }

    #[tokio::test]
    async fn test_no_wikipedia_relation_skips_summary() {
        let server = MockServer::start().await;
        mount_artist(&server, NIRVANA, artist_body("Nirvana", None, &[NEVERMIND])).await;
        mount_cover(&server, NEVERMIND.0, "http://img/nevermind.jpg").await;

        let record = test_engine(&server).build(NIRVANA).await.unwrap();

        assert_eq!(record.description, "");
        let requests = server.received_requests().await.unwrap();
        assert!(
            requests
                .iter()
                .all(|request| request.url.path() != "/w/api.php")
        );
    }

    #[tokio::test]
    async fn test_artist_without_albums() {
        let server = MockServer::start().await;
        mount_artist(&server, NIRVANA, artist_body("Nirvana", None, &[])).await;

        let record = test_engine(&server).build(NIRVANA).await.unwrap();

        assert!(record.albums.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_builds_use_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/ws/2/artist/{NIRVANA}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(artist_body("Nirvana", None, &[NEVERMIND])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/release-group/{}", NEVERMIND.0)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"images": [{"image": "x"}]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let engine = test_engine(&server);
        let first = engine.build(NIRVANA).await.unwrap();
        let second = engine.build(NIRVANA).await.unwrap();

        assert_eq!(first, second);
    }
}
