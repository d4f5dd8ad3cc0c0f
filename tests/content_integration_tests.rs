mod common;

use axum::http::StatusCode;
use common::{TestApp, get, json, read_json};
use gov_portal::{
    localization::LocaleTag,
    models::{ContentItem, ContentView, LocalizedContent},
    roles::RoleId,
};
use serde_json::{Value, json as body};
use uuid::Uuid;

async fn create(app: &TestApp, token: &str, kind: &str, payload: Value) -> Uuid {
    let response = app
        .send(json("POST", &format!("/admin/content/{kind}"), Some(token), payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = read_json(response).await;
    created["item_id"].as_str().unwrap().parse().unwrap()
}

fn trilingual() -> Value {
    body!({
        "published": true,
        "image_key": "/news/cover.jpg",
        "translations": [
            { "locale": "az", "title": "Xəbər", "content": "mətn" },
            { "locale": "en", "title": "News", "content": "text" },
            { "locale": "ru", "title": "Новость", "content": "текст" }
        ]
    })
}

async fn title_of(app: &TestApp, uri: &str) -> String {
    let response = app.send(get(uri, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view: ContentView = read_json(response).await;
    view.translation.unwrap().title
}

// --- Localization over HTTP ---

#[tokio::test]
async fn test_requested_locale_is_served() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;
    let id = create(&app, &admin, "news", trilingual()).await;

    assert_eq!(title_of(&app, &format!("/content/news/{id}?lang=en")).await, "News");
    assert_eq!(title_of(&app, &format!("/content/news/{id}?lang=ru")).await, "Новость");
}

#[tokio::test]
async fn test_missing_or_unknown_locale_falls_back_to_default() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;
    let id = create(&app, &admin, "news", trilingual()).await;

    assert_eq!(title_of(&app, &format!("/content/news/{id}")).await, "Xəbər");
    assert_eq!(title_of(&app, &format!("/content/news/{id}?lang=fr")).await, "Xəbər");
    assert_eq!(title_of(&app, &format!("/content/news/{id}?lang=")).await, "Xəbər");
}

#[tokio::test]
async fn test_falls_back_to_first_row_without_default() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;
    let id = create(
        &app,
        &admin,
        "document",
        body!({
            "published": true,
            "translations": [
                { "locale": "ru", "title": "Указ" },
                { "locale": "en", "title": "Decree" }
            ]
        }),
    )
    .await;

    assert_eq!(title_of(&app, &format!("/content/document/{id}?lang=az")).await, "Указ");
}

#[tokio::test]
async fn test_legacy_locale_rows_are_kept_and_resolvable() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;
    let id = create(
        &app,
        &admin,
        "news",
        body!({ "published": true, "translations": [{ "locale": "en", "title": "News" }] }),
    )
    .await;

    let pushed = app
        .repo
        .push_translation(LocalizedContent {
            id: Uuid::new_v4(),
            item_id: id,
            locale: LocaleTag::from("de"),
            title: "Nachricht".to_string(),
            description: String::new(),
            content: String::new(),
        })
        .await;
    assert!(pushed);

    assert_eq!(title_of(&app, &format!("/content/news/{id}?lang=de")).await, "Nachricht");

    let view: ContentView =
        read_json(app.send(get(&format!("/content/news/{id}"), None)).await).await;
    assert_eq!(
        view.available_locales,
        vec![LocaleTag::from("en"), LocaleTag::from("de")]
    );

    let all: Value = read_json(
        app.send(get(&format!("/content/news/{id}/translations"), None))
            .await,
    )
    .await;
    let translations = all["translations"].as_object().unwrap();
    assert_eq!(translations.len(), 3);
    assert!(translations["az"].is_null());
    assert_eq!(translations["en"]["title"], "News");
    assert!(translations["ru"].is_null());
    assert_eq!(all["available_locales"], body!(["en", "de"]));
}

#[tokio::test]
async fn test_list_renders_each_item_and_builds_media_urls() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;
    create(&app, &admin, "news", trilingual()).await;
    create(
        &app,
        &admin,
        "news",
        body!({ "published": true, "translations": [{ "locale": "az", "title": "Yalnız az" }] }),
    )
    .await;

    let response = app.send(get("/content/news?lang=en", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let items: Vec<ContentView> = read_json(response).await;
    assert_eq!(items.len(), 2);

    let titles: Vec<String> = items
        .iter()
        .map(|item| item.translation.as_ref().unwrap().title.clone())
        .collect();
    assert!(titles.contains(&"News".to_string()));
    assert!(titles.contains(&"Yalnız az".to_string()));

    let with_image = items.iter().find(|item| item.image_url.is_some()).unwrap();
    assert_eq!(
        with_image.image_url.as_deref(),
        Some("http://localhost:9000/media/news/cover.jpg")
    );
}

// --- Validation ---

#[tokio::test]
async fn test_create_rejects_invalid_translation_sets() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;

    let invalid = [
        body!({ "translations": [] }),
        body!({ "translations": [{ "locale": "de", "title": "Nein" }] }),
        body!({ "translations": [
            { "locale": "az", "title": "Bir" },
            { "locale": "az", "title": "İki" }
        ] }),
        body!({ "translations": [{ "locale": "en", "title": "   " }] }),
    ];

    for payload in invalid {
        let response = app
            .send(json("POST", "/admin/content/news", Some(&admin), payload))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let items: Vec<ContentView> = read_json(app.send(get("/content/news", Some(&admin))).await).await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_unknown_kind_is_a_bad_request() {
    let app = TestApp::new().await;
    let response = app.send(get("/content/blog", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// --- Visibility and lifecycle ---

#[tokio::test]
async fn test_publish_hide_and_delete_lifecycle() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;
    let id = create(
        &app,
        &admin,
        "slider",
        body!({ "translations": [{ "locale": "az", "title": "Slayd" }] }),
    )
    .await;
    let uri = format!("/content/slider/{id}");

    assert_eq!(app.send(get(&uri, None)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.send(get(&uri, Some(&admin))).await.status(), StatusCode::OK);

    let response = app
        .send(json("PUT", &format!("/admin/items/{id}/publish"), Some(&admin), body!(true)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let item: ContentItem = read_json(response).await;
    assert!(item.published);
    assert_eq!(app.send(get(&uri, None)).await.status(), StatusCode::OK);

    // Same id under another module is not found.
    assert_eq!(
        app.send(get(&format!("/content/news/{id}"), None)).await.status(),
        StatusCode::NOT_FOUND
    );

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/admin/items/{id}"))
        .header("Authorization", format!("Bearer {admin}"))
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(app.send(delete).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.send(get(&uri, None)).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_returns_overlapping_events_in_order() {
    let app = TestApp::new().await;
    let (_, admin) = app.token_for(RoleId::Admin).await;

    let event = |title: &str, start: &str, end: &str| {
        body!({
            "published": true,
            "starts_at": start,
            "ends_at": end,
            "translations": [{ "locale": "az", "title": title }]
        })
    };
    create(&app, &admin, "event", event("May", "2025-05-10T09:00:00Z", "2025-05-12T18:00:00Z")).await;
    create(&app, &admin, "event", event("April", "2025-04-01T09:00:00Z", "2025-04-30T18:00:00Z")).await;
    create(&app, &admin, "event", event("June", "2025-06-01T09:00:00Z", "2025-06-01T18:00:00Z")).await;

    let response = app
        .send(get("/events?from=2025-04-15T00:00:00Z&to=2025-05-31T00:00:00Z", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let events: Vec<ContentView> = read_json(response).await;

    let titles: Vec<&str> = events
        .iter()
        .map(|e| e.translation.as_ref().unwrap().title.as_str())
        .collect();
    assert_eq!(titles, vec!["April", "May"]);
}
