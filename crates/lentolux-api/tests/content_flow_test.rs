//! Content and publish flows against a real Postgres.

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::{create_user, setup_db_test_app, TestApp};
use lentolux_core::models::{PublishState, UserRole};
use serde_json::{json, Value};
use uuid::Uuid;

fn text_form(content_type: &str, title: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("content_type", content_type)
        .add_text("title", title)
        .add_text("description", "오늘의 기록")
        .add_part(
            "file",
            Part::bytes(b"quiet morning light".to_vec())
                .file_name("note.txt")
                .mime_type("text/plain"),
        )
}

async fn upload_text(app: &TestApp, token: &str, content_type: &str, title: &str) -> Value {
    let response = app
        .server
        .post("/content/upload")
        .authorization_bearer(token)
        .multipart(text_form(content_type, title))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

fn content_id(body: &Value) -> Uuid {
    body["id"].as_str().unwrap().parse().unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(64, 48, image::Rgba([240, 240, 240, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_user_uploads_daily_life_image() {
    if lentolux_processing::fonts::resolve_font_path(None).is_none() {
        eprintln!("skipping image upload test: no watermark font installed");
        return;
    }
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (user, token) = create_user(&app, "hana", UserRole::User).await;

    let form = MultipartForm::new()
        .add_text("content_type", "daily-life")
        .add_text("title", "Test")
        .add_part(
            "file",
            Part::bytes(png_bytes())
                .file_name("morning.png")
                .mime_type("image/png"),
        );
    let response = app
        .server
        .post("/content/upload")
        .authorization_bearer(&token)
        .multipart(form)
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["media_type"], "image");
    assert_eq!(body["content_type"], "daily-life");
    assert_eq!(body["title"], "Test");
    assert_eq!(body["is_uploaded"], false);
    assert_eq!(body["user_id"], user.id.to_string());
    let file_path = body["file_path"].as_str().unwrap();
    assert!(file_path.ends_with("_watermarked.png"));
    assert!(std::path::Path::new(file_path).exists());
    assert!(body["github_path"]
        .as_str()
        .unwrap()
        .starts_with("contents/감성적_일상_나눔/"));
}

#[tokio::test]
async fn test_regular_user_lists_only_own_content() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, alice) = create_user(&app, "alice", UserRole::User).await;
    let (_, bora) = create_user(&app, "bora", UserRole::User).await;
    let (_, admin) = create_user(&app, "admin", UserRole::Admin).await;

    let own = content_id(&upload_text(&app, &alice, "philosophy", "생각").await);
    let theirs = content_id(&upload_text(&app, &bora, "interview", "대화").await);

    let listed: Vec<Value> = app
        .server
        .get("/content/list")
        .authorization_bearer(&alice)
        .await
        .json();
    let ids: Vec<String> = listed.iter().map(|c| c["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(ids, vec![own.to_string()]);

    let all: Vec<Value> = app
        .server
        .get("/content/list")
        .authorization_bearer(&admin)
        .await
        .json();
    assert_eq!(all.len(), 2);

    let filtered: Vec<Value> = app
        .server
        .get("/content/list")
        .add_query_param("content_type", "interview")
        .authorization_bearer(&admin)
        .await
        .json();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["id"], theirs.to_string());

    app.server
        .get(&format!("/content/{}", theirs))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_returns_every_row_without_limit() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, token) = create_user(&app, "dana", UserRole::User).await;
    for i in 0..55 {
        upload_text(&app, &token, "artistic", &format!("작품 {}", i)).await;
    }

    let listed: Vec<Value> = app
        .server
        .get("/content/list")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(listed.len(), 55);

    let page: Vec<Value> = app
        .server
        .get("/content/list")
        .add_query_param("limit", 10)
        .add_query_param("offset", 50)
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(page.len(), 5);
}

#[tokio::test]
async fn test_delete_twice_then_not_found() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, owner) = create_user(&app, "minji", UserRole::User).await;
    let (_, other) = create_user(&app, "jisoo", UserRole::User).await;
    let body = upload_text(&app, &owner, "work-showcase", "작품").await;
    let id = content_id(&body);
    let local = body["file_path"].as_str().unwrap().to_string();

    app.server
        .delete(&format!("/content/{}", id))
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .delete(&format!("/content/{}", id))
        .authorization_bearer(&owner)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(!std::path::Path::new(&local).exists());

    app.server
        .delete(&format!("/content/{}", id))
        .authorization_bearer(&owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_already_uploaded_content_is_not_rescheduled() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, admin) = create_user(&app, "lux", UserRole::Admin).await;
    let id = content_id(&upload_text(&app, &admin, "daily-life", "편지").await);

    let before = app.contents().get(id).await.unwrap().unwrap();
    let statuses = json!({
        "instagram": { "status": "success", "attempts": 1, "updated_at": "2026-01-05T07:00:00Z" }
    });
    let recorded = app
        .contents()
        .record_publish_result(id, before.version, &statuses, true)
        .await
        .unwrap()
        .expect("version matched");
    assert!(recorded.is_uploaded);
    assert_eq!(recorded.publish_state, PublishState::Done);

    // a writer holding the old version loses
    let stale = app
        .contents()
        .record_publish_result(id, before.version, &json!({ "threads": {} }), false)
        .await
        .unwrap();
    assert!(stale.is_none());

    let response = app
        .server
        .post(&format!("/social/upload/{}", id))
        .authorization_bearer(&admin)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Content already uploaded");

    let after = app.contents().get(id).await.unwrap().unwrap();
    assert_eq!(after.publish_state, PublishState::Done);
    assert_eq!(after.version, recorded.version);
    assert_eq!(after.upload_status["instagram"]["status"], "success");
}

#[tokio::test]
async fn test_concurrent_claims_have_one_winner() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, admin) = create_user(&app, "eli", UserRole::Admin).await;
    let id = content_id(&upload_text(&app, &admin, "artistic", "운동").await);

    let (first, second) = tokio::join!(
        app.contents().claim_for_publish(id),
        app.contents().claim_for_publish(id)
    );
    let winners = [first.unwrap(), second.unwrap()]
        .into_iter()
        .filter(Option::is_some)
        .count();
    assert_eq!(winners, 1);

    let response = app
        .server
        .post(&format!("/social/upload/{}", id))
        .authorization_bearer(&admin)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "publish already in progress");
}

#[tokio::test]
async fn test_stale_claims_released_at_startup() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, admin) = create_user(&app, "yuna", UserRole::Admin).await;
    let queued = content_id(&upload_text(&app, &admin, "interview", "하나").await);
    let publishing = content_id(&upload_text(&app, &admin, "interview", "둘").await);
    let idle = content_id(&upload_text(&app, &admin, "interview", "셋").await);

    assert!(app.contents().claim_for_publish(queued).await.unwrap().is_some());
    assert!(app.contents().claim_for_publish(publishing).await.unwrap().is_some());
    assert!(app.contents().mark_publishing(publishing).await.unwrap());

    let released = app.contents().release_stale_claims().await.unwrap();
    assert_eq!(released, 2);

    for id in [queued, publishing, idle] {
        let content = app.contents().get(id).await.unwrap().unwrap();
        assert_eq!(content.publish_state, PublishState::Idle);
    }
    assert!(app.contents().claim_for_publish(queued).await.unwrap().is_some());
}

#[tokio::test]
async fn test_uploaded_row_requires_platform_status() {
    let Some(app) = setup_db_test_app().await else {
        return;
    };
    let (_, token) = create_user(&app, "sora", UserRole::User).await;
    let id = content_id(&upload_text(&app, &token, "philosophy", "문장").await);

    let result = sqlx::query("UPDATE contents SET is_uploaded = TRUE WHERE id = $1")
        .bind(id)
        .execute(app.pool())
        .await;

    let err = result.unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("contents_uploaded_has_status"));
}
