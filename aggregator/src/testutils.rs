use crate::engine::AggregationEngine;
use crate::endpoints::Upstreams;
use serde_json::json;
use upstream::ResilientClient;
use upstream::config::{ClientConfig, RetryConfig};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `(release group id, title)`
pub type Album = (&'static str, &'static str);

pub const NEVERMIND: Album = ("1b022e01-4da6-387b-8658-8678046e4cef", "Nevermind");
pub const BLEACH: Album = ("f1afec0b-26dd-3db5-9aa1-c91229a74a24", "Bleach");

pub fn artist_body(name: &str, wikipedia_title: Option<&str>, albums: &[Album]) -> String {
    let mut relations = vec![json!({
        "type": "official homepage",
        "url": {"resource": "https://www.nirvana.com/"}
    })];
    if let Some(title) = wikipedia_title {
        relations.push(json!({
            "type": "wikipedia",
            "url": {"resource": format!("https://en.wikipedia.org/wiki/{title}")}
        }));
    }

    let release_groups: Vec<_> = albums
        .iter()
        .map(|(id, title)| json!({"id": id, "title": title, "primary-type": "Album"}))
        .collect();

    json!({
        "id": "5b11f4ce-a62d-471e-81fc-a69a8278c7da",
        "name": name,
        "relations": relations,
        "release-groups": release_groups,
    })
    .to_string()
}

pub async fn mount_artist(server: &MockServer, id: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/ws/2/artist/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_cover(server: &MockServer, release_group_id: &str, image: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/release-group/{release_group_id}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(json!({"images": [{"image": image, "front": true}]}).to_string()),
        )
        .mount(server)
        .await;
}

pub async fn mount_summary(server: &MockServer, title: &str, extract: &str) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("titles", title))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            json!({
                "batchcomplete": "",
                "query": {"pages": {"21231": {"pageid": 21231, "title": title, "extract": extract}}}
            })
            .to_string(),
        ))
        .mount(server)
        .await;
}

/// Short retry schedule so failure paths finish quickly.
fn test_client_config() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..Default::default()
    }
}

fn test_upstreams(server: &MockServer) -> Upstreams {
    let base = Url::parse(&server.uri()).unwrap();
    Upstreams {
        musicbrainz: base.clone(),
        cover_art_archive: base.clone(),
        wikipedia: base,
    }
}

pub fn test_engine(server: &MockServer) -> AggregationEngine {
    let client = ResilientClient::new(&test_client_config()).unwrap();
    AggregationEngine::new(client, test_upstreams(server))
}
