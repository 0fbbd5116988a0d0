mod common;

use std::sync::atomic::Ordering;

use common::{http, place, spawn_app, FakePlaces, TestApp, GOOD_CODE};
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use serde_json::{json, Value};

async fn create_restaurant(app: &TestApp, cookie: &str, name: &str, lat: f64, lng: f64) -> Value {
    let response = http()
        .post(app.url("/api/restaurants"))
        .header(COOKIE, cookie)
        .json(&json!({ "name": name, "latitude": lat, "longitude": lng }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

async fn create_post(app: &TestApp, cookie: &str, restaurant_id: &str) -> Value {
    let response = http()
        .post(app.url("/api/posts"))
        .header(COOKIE, cookie)
        .json(&json!({
            "restaurantId": restaurant_id,
            "description": "Great gyoza",
            "images": ["https://img.example/1.jpg"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn writes_require_a_session() {
    let app = spawn_app(FakePlaces::default()).await;
    let client = http();

    let response = client
        .post(app.url("/api/posts"))
        .json(&json!({ "restaurantId": "r1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(app.url("/api/posts/anything/like"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(app.url("/api/posts"))
        .header(COOKIE, "dinespot_session=not-a-real-token")
        .json(&json!({ "restaurantId": "r1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn post_validation_reports_field_errors() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let response = http()
        .post(app.url("/api/posts"))
        .header(COOKIE, &cookie)
        .json(&json!({ "images": ["a", "b", "c", "d"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.unwrap();
    assert!(body["errors"]["restaurantId"].is_array());
    assert!(body["errors"]["images"].is_array());
}

async fn send_json(app: &TestApp, method: reqwest::Method, path: &str, cookie: &str, body: Value) -> (u16, Value) {
    let response = http()
        .request(method, app.url(path))
        .header(COOKIE, cookie)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn post_body_of_wrong_shape_is_keyed_by_field() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let cases = [
        (json!({ "restaurantId": "r1", "images": "a.jpg" }), "images"),
        (json!({ "restaurantId": 42 }), "restaurantId"),
        (json!({ "restaurantId": "r1", "images": null }), "images"),
        (json!("just text"), "_root"),
    ];
    for (body, field) in cases {
        let (status, errors) = send_json(&app, reqwest::Method::POST, "/api/posts", &cookie, body).await;
        assert_eq!(status, 422, "{}", field);
        assert!(errors["errors"][field][0].is_string(), "{}: {}", field, errors);
    }
}

#[tokio::test]
async fn restaurant_body_missing_coordinates_is_a_field_error() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let (status, body) = send_json(
        &app,
        reqwest::Method::POST,
        "/api/restaurants",
        &cookie,
        json!({ "name": "Ramen" }),
    )
    .await;
    assert_eq!(status, 422);
    assert!(body["errors"]["latitude"].is_array());

    let (status, body) = send_json(
        &app,
        reqwest::Method::POST,
        "/api/restaurants",
        &cookie,
        json!({ "name": "Ramen", "latitude": "north", "longitude": 139.0 }),
    )
    .await;
    assert_eq!(status, 422);
    assert!(body["errors"]["latitude"].is_array());
}

#[tokio::test]
async fn profile_body_of_wrong_shape_is_a_field_error() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let (status, body) = send_json(
        &app,
        reqwest::Method::PATCH,
        "/api/me",
        &cookie,
        json!({ "displayName": 5 }),
    )
    .await;
    assert_eq!(status, 422);
    assert!(body["errors"]["displayName"].is_array());

    let response = http()
        .patch(app.url("/api/me"))
        .header(COOKIE, &cookie)
        .header(CONTENT_TYPE, "application/json")
        .body("{\"displayName\":")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["errors"]["_root"].is_array());
}

#[tokio::test]
async fn post_for_unknown_restaurant_is_not_found() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let response = http()
        .post(app.url("/api/posts"))
        .header(COOKIE, &cookie)
        .json(&json!({ "restaurantId": "missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn restaurant_create_is_idempotent_by_coordinates() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");
    let client = http();

    let first = client
        .post(app.url("/api/restaurants"))
        .header(COOKIE, &cookie)
        .json(&json!({ "name": "Fuunji", "latitude": 35.6875, "longitude": 139.6982 }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);
    let first: Value = first.json().await.unwrap();

    let second = client
        .post(app.url("/api/restaurants"))
        .header(COOKIE, &cookie)
        .json(&json!({ "name": "Fuunji (dup)", "latitude": 35.6875, "longitude": 139.6982 }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 200);
    let second: Value = second.json().await.unwrap();
    assert_eq!(first["id"], second["id"]);

    let detail: Value = client
        .get(app.url(&format!("/api/restaurants/{}", first["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["name"], "Fuunji");
    assert_eq!(detail["postCount"], 0);
}

#[tokio::test]
async fn posts_list_newest_first_and_filter_by_restaurant() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let ramen = create_restaurant(&app, &cookie, "Ramen", 35.0, 139.0).await;
    let soba = create_restaurant(&app, &cookie, "Soba", 35.1, 139.1).await;
    let ramen_id = ramen["id"].as_str().unwrap();

    create_post(&app, &cookie, ramen_id).await;
    create_post(&app, &cookie, soba["id"].as_str().unwrap()).await;
    let newest = create_post(&app, &cookie, ramen_id).await;
    assert_eq!(newest["user"]["email"], "u1@example.com");
    assert_eq!(newest["restaurant"]["name"], "Ramen");
    assert_eq!(newest["likesCount"], 0);
    assert_eq!(newest["isLiked"], false);

    let all: Vec<Value> = http()
        .get(app.url("/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["id"], newest["id"]);

    let filtered: Vec<Value> = http()
        .get(app.url("/api/posts"))
        .query(&[("restaurantId", ramen_id)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|p| p["restaurantId"] == ramen_id));
}

#[tokio::test]
async fn liking_twice_restores_the_original_state() {
    let app = spawn_app(FakePlaces::default()).await;
    let author = app.sign_in("author");
    let fan = app.sign_in("fan");

    let restaurant = create_restaurant(&app, &author, "Ramen", 35.0, 139.0).await;
    let post = create_post(&app, &author, restaurant["id"].as_str().unwrap()).await;
    let like_url = app.url(&format!("/api/posts/{}/like", post["id"].as_str().unwrap()));
    let client = http();

    let liked: Value = client
        .post(&like_url)
        .header(COOKIE, &fan)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(liked, json!({ "liked": true, "likesCount": 1 }));

    let posts: Vec<Value> = client
        .get(app.url("/api/posts"))
        .header(COOKIE, &fan)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts[0]["isLiked"], true);

    let unliked: Value = client
        .post(&like_url)
        .header(COOKIE, &fan)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unliked, json!({ "liked": false, "likesCount": 0 }));

    let missing = client
        .post(app.url("/api/posts/missing/like"))
        .header(COOKIE, &fan)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn profile_update_validates_and_persists() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");
    let client = http();

    let bad = client
        .patch(app.url("/api/me"))
        .header(COOKIE, &cookie)
        .json(&json!({ "displayName": "", "avatarUrl": "not a url" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 422);
    let body: Value = bad.json().await.unwrap();
    assert!(body["errors"]["displayName"].is_array());
    assert!(body["errors"]["avatarUrl"].is_array());

    let ok: Value = client
        .patch(app.url("/api/me"))
        .header(COOKIE, &cookie)
        .json(&json!({ "displayName": "Aki T." }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ok["displayName"], "Aki T.");

    let me: Value = client
        .get(app.url("/api/me"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["displayName"], "Aki T.");
}

#[tokio::test]
async fn callback_signs_in_and_redirects_to_safe_target() {
    let app = spawn_app(FakePlaces::default()).await;

    let response = http()
        .get(app.url("/auth/callback"))
        .query(&[("code", GOOD_CODE), ("next", "/main?welcome=1")])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[LOCATION], "/main?welcome=1");

    let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("dinespot_session="));
    assert!(cookie.contains("HttpOnly"));

    let session_cookie = cookie.split(';').next().unwrap().to_string();
    let me: Value = http()
        .get(app.url("/api/me"))
        .header(COOKIE, session_cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], "aki@example.com");
    assert_eq!(me["displayName"], "Aki");
}

#[tokio::test]
async fn callback_rejects_offsite_next() {
    let app = spawn_app(FakePlaces::default()).await;

    for next in ["//evil.example", "https://evil.example/steal"] {
        let response = http()
            .get(app.url("/auth/callback"))
            .query(&[("code", GOOD_CODE), ("next", next)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()[LOCATION], "/main", "{}", next);
    }
}

#[tokio::test]
async fn callback_failure_returns_to_login() {
    let app = spawn_app(FakePlaces::default()).await;
    let client = http();

    for query in [vec![], vec![("code", "bad-code")]] {
        let response = client
            .get(app.url("/auth/callback"))
            .query(&query)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[LOCATION], "/login?error=callback_failed");
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    let login = client
        .get(app.url("/login?error=callback_failed"))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
    assert!(login.text().await.unwrap().contains("Sign-in failed"));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");
    let client = http();

    let response = client
        .post(app.url("/auth/logout"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()[LOCATION], "/login");
    assert!(response.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let me = client
        .get(app.url("/api/me"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 401);
}

#[tokio::test]
async fn pages_route_by_session() {
    let app = spawn_app(FakePlaces::default()).await;
    let client = http();

    let root = client.get(app.url("/")).send().await.unwrap();
    assert_eq!(root.headers()[LOCATION], "/login");
    let main = client.get(app.url("/main")).send().await.unwrap();
    assert_eq!(main.headers()[LOCATION], "/login");

    let cookie = app.sign_in("u1");
    let root = client
        .get(app.url("/"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(root.headers()[LOCATION], "/main");

    let main = client
        .get(app.url("/main"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(main.status(), 200);
    assert!(main.text().await.unwrap().contains("id=\"map\""));
}

#[tokio::test]
async fn resolve_prefers_nearby_restaurant() {
    let places = FakePlaces {
        nearby: vec![place("ChIJ-near", "Tsuta", 35.6896, 139.6918)],
        ..Default::default()
    };
    let app = spawn_app(places).await;
    let cookie = app.sign_in("u1");

    let resolved: Value = http()
        .get(app.url("/api/places/resolve"))
        .header(COOKIE, &cookie)
        .query(&[("lat", 35.6895), ("lng", 139.6917)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["source"], "nearby");
    assert_eq!(resolved["place"]["id"], "ChIJ-near");

    let bad = http()
        .get(app.url("/api/places/resolve"))
        .header(COOKIE, &cookie)
        .query(&[("lat", 95.0), ("lng", 0.0)])
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);
}

#[tokio::test]
async fn resolve_falls_back_to_coordinates() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let resolved: Value = http()
        .get(app.url("/api/places/resolve"))
        .header(COOKIE, &cookie)
        .query(&[("lat", 35.6895), ("lng", 139.6917)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["source"], "coordinates");
    assert_eq!(resolved["place"]["address"], "35.6895, 139.6917");
}

#[tokio::test]
async fn geocode_failure_is_an_empty_list() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let results: Vec<Value> = http()
        .get(app.url("/api/places/geocode"))
        .header(COOKIE, &cookie)
        .query(&[("q", "Shibuya, Tokyo")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn blank_search_skips_the_vendor() {
    let places = FakePlaces {
        text: vec![place("ChIJ-s1", "Afuri", 35.6467, 139.7101)],
        ..Default::default()
    };
    let calls = places.calls.clone();
    let app = spawn_app(places).await;
    let cookie = app.sign_in("u1");

    let results: Vec<Value> = http()
        .get(app.url("/api/places/search"))
        .header(COOKIE, &cookie)
        .query(&[("q", "   ")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let results: Vec<Value> = http()
        .get(app.url("/api/places/search"))
        .header(COOKIE, &cookie)
        .query(&[("q", "ramen")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Afuri");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn search_vendor_failure_is_bad_gateway() {
    let app = spawn_app(FakePlaces::failing()).await;
    let cookie = app.sign_in("u1");

    let response = http()
        .get(app.url("/api/places/search"))
        .header(COOKIE, &cookie)
        .query(&[("q", "ramen")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn search_bias_out_of_range_is_bad_request() {
    let places = FakePlaces::default();
    let calls = places.calls.clone();
    let app = spawn_app(places).await;
    let cookie = app.sign_in("u1");

    for (lat, lng) in [(95.0, 139.0), (35.0, 181.0)] {
        let response = http()
            .get(app.url("/api/places/search"))
            .header(COOKIE, &cookie)
            .query(&[("q", "ramen".to_string()), ("lat", lat.to_string()), ("lng", lng.to_string())])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

fn tokyo_viewport(zoom: f64) -> Value {
    json!({
        "center": { "lat": 35.6895, "lng": 139.6917 },
        "zoom": zoom,
        "width": 800.0,
        "height": 600.0
    })
}

#[tokio::test]
async fn map_layer_clusters_posts_and_focuses_search_results() {
    let places = FakePlaces {
        text: vec![place("ChIJ-s1", "Afuri", 35.6467, 139.7101)],
        ..Default::default()
    };
    let app = spawn_app(places).await;
    let cookie = app.sign_in("u1");

    let restaurant = create_restaurant(&app, &cookie, "Ramen", 35.6895, 139.6917).await;
    let rid = restaurant["id"].as_str().unwrap();
    create_post(&app, &cookie, rid).await;
    create_post(&app, &cookie, rid).await;

    let layer: Value = http()
        .get(app.url("/api/map/layer"))
        .header(COOKIE, &cookie)
        .query(&[("zoom", "10"), ("q", "ramen")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let restaurants = layer["restaurants"]["features"].as_array().unwrap();
    assert_eq!(restaurants.len(), 1);
    assert_eq!(restaurants[0]["properties"]["point_count"], 2);

    let results = layer["searchResults"]["features"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["properties"]["restaurantName"], "Afuri");

    assert_eq!(layer["focus"]["zoom"], 15.0);
    assert_eq!(layer["focus"]["center"]["lat"], 35.6467);

    let unclustered: Value = http()
        .get(app.url("/api/map/layer"))
        .header(COOKIE, &cookie)
        .query(&[("zoom", "16")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unclustered["restaurants"]["features"].as_array().unwrap().len(), 2);
    assert!(unclustered.get("focus").is_none());
}

#[tokio::test]
async fn map_click_selects_marker_or_resolves_point() {
    let places = FakePlaces {
        nearby: vec![place("ChIJ-near", "Tsuta", 35.6896, 139.6918)],
        ..Default::default()
    };
    let app = spawn_app(places).await;
    let cookie = app.sign_in("u1");
    let client = http();

    let empty: Value = client
        .post(app.url("/api/map/click"))
        .header(COOKIE, &cookie)
        .json(&json!({ "viewport": tokyo_viewport(15.0), "pixel": { "x": 400.0, "y": 300.0 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["outcome"]["kind"], "map");
    assert_eq!(empty["resolved"]["source"], "nearby");
    assert_eq!(empty["resolved"]["place"]["name"], "Tsuta");

    let restaurant = create_restaurant(&app, &cookie, "Ramen", 35.6895, 139.6917).await;
    create_post(&app, &cookie, restaurant["id"].as_str().unwrap()).await;

    let hit: Value = client
        .post(app.url("/api/map/click"))
        .header(COOKIE, &cookie)
        .json(&json!({ "viewport": tokyo_viewport(15.0), "pixel": { "x": 403.0, "y": 298.0 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hit["outcome"]["kind"], "select");
    assert_eq!(hit["outcome"]["restaurantId"], restaurant["id"]);
    assert_eq!(hit["outcome"]["searchResult"], false);
    assert!(hit.get("resolved").is_none());
}

#[tokio::test]
async fn map_click_holds_zoom_to_renderable_levels() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let clicked: Value = http()
        .post(app.url("/api/map/click"))
        .header(COOKIE, &cookie)
        .json(&json!({ "viewport": tokyo_viewport(2000.0), "pixel": { "x": 410.0, "y": 290.0 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(clicked["outcome"]["kind"], "map");
    let lat = clicked["outcome"]["coordinate"]["lat"].as_f64().unwrap();
    let lng = clicked["outcome"]["coordinate"]["lng"].as_f64().unwrap();
    assert!((lat - 35.6895).abs() < 0.001);
    assert!((lng - 139.6917).abs() < 0.001);
    assert_eq!(clicked["resolved"]["source"], "coordinates");
}

#[tokio::test]
async fn map_click_rejects_center_off_the_globe() {
    let app = spawn_app(FakePlaces::default()).await;
    let cookie = app.sign_in("u1");

    let response = http()
        .post(app.url("/api/map/click"))
        .header(COOKIE, &cookie)
        .json(&json!({
            "viewport": { "center": { "lat": 95.0, "lng": 139.0 }, "zoom": 12.0, "width": 800.0, "height": 600.0 },
            "pixel": { "x": 400.0, "y": 300.0 }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
