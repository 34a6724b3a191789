//! End-to-end tests of the reference cache against a mocked backend.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mockito::Server;
use tourisme_core::api::ApiClient;
use tourisme_core::cache::{CacheError, ReferenceDataCache};
use tourisme_core::models::{City, Zone};

fn cache_for(server: &Server) -> ReferenceDataCache {
    let client = ApiClient::new(&server.url(), StdDuration::from_secs(5))
        .unwrap()
        .with_initial_backoff(StdDuration::from_millis(1));
    ReferenceDataCache::new(Arc::new(client), Duration::minutes(5))
}

#[tokio::test]
async fn zones_then_repeated_cities_hit_backend_once_each() {
    let mut server = Server::new_async().await;
    let zones_mock = server
        .mock("GET", "/zones")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1, "nom": "Littoral"}]"#)
        .expect(1)
        .create_async()
        .await;
    let cities_mock = server
        .mock("GET", "/zones/1/villes")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 10, "nom": "Cotonou", "zoneId": 1}]"#)
        .expect(1)
        .create_async()
        .await;

    let cache = cache_for(&server);

    let zones = cache.zones().await.unwrap();
    assert_eq!(*zones, vec![Zone { id: 1, name: "Littoral".to_string() }]);

    let first = cache.cities_for_zone(1).await.unwrap();
    let second = cache.cities_for_zone(1).await.unwrap();

    let expected = vec![City { id: 10, name: "Cotonou".to_string(), zone_id: 1 }];
    assert_eq!(*first, expected);
    assert!(Arc::ptr_eq(&first, &second));

    zones_mock.assert_async().await;
    cities_mock.assert_async().await;
}

#[tokio::test]
async fn concurrent_preloads_share_requests() {
    let mut server = Server::new_async().await;
    let cities_mock = server
        .mock("GET", "/zones/2/villes")
        .with_status(200)
        .with_body(r#"{"data": [{"id": 20, "nom": "Abomey", "zoneId": 2}]}"#)
        .expect(1)
        .create_async()
        .await;
    let activities_mock = server
        .mock("GET", "/zones/2/activites")
        .with_status(200)
        .with_body(r#"[{"id": 200, "nom": "Palais royaux", "zoneId": 2, "villeId": 20}]"#)
        .expect(1)
        .create_async()
        .await;

    let cache = cache_for(&server);
    let (a, b, c) = tokio::join!(
        cache.preload_zone_data(2),
        cache.preload_zone_data(2),
        cache.cities_for_zone(2),
    );

    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
    assert!(Arc::ptr_eq(&a.cities, &b.cities));
    assert!(Arc::ptr_eq(&a.cities, &c));
    assert_eq!(a.activities[0].city_id, Some(20));
    assert!(cache.has_fresh_data_for_zone(2));

    cities_mock.assert_async().await;
    activities_mock.assert_async().await;
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/zones")
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let cache = cache_for(&server);
    let err = cache.zones().await.unwrap_err();
    assert!(matches!(err, CacheError::FetchFailed { resource: "zones", .. }));
    failing.assert_async().await;
    failing.remove_async().await;

    let healthy = server
        .mock("GET", "/zones")
        .with_status(200)
        .with_body(r#"[{"id": 1, "nom": "Littoral"}]"#)
        .expect(1)
        .create_async()
        .await;

    assert_eq!(cache.zones().await.unwrap().len(), 1);
    healthy.assert_async().await;
}

#[tokio::test]
async fn invalidate_zone_refetches_on_next_read() {
    let mut server = Server::new_async().await;
    let cities_mock = server
        .mock("GET", "/zones/1/villes")
        .with_status(200)
        .with_body(r#"[{"id": 10, "nom": "Cotonou", "zoneId": 1}]"#)
        .expect(2)
        .create_async()
        .await;

    let cache = cache_for(&server);
    cache.cities_for_zone(1).await.unwrap();
    cache.invalidate_zone(1);
    cache.cities_for_zone(1).await.unwrap();

    cities_mock.assert_async().await;
}
