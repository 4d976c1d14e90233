//! services/api/tests/http_api.rs
//!
//! Drives the full router against the in-memory backend, over `oneshot` requests
//! and, for the editor, a real socket.

use api_lib::{
    adapters::InMemoryAdapter,
    config::Config,
    web::{router, state::AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use futures::{SinkExt, StreamExt};
use portfolio_core::ports::{AuthProvider, DocumentStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::{client::IntoClientRequest, Message as WsMessage};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    app_with(Arc::new(InMemoryAdapter::default()), &[])
}

fn app_with(memory: Arc<InMemoryAdapter>, vars: &[(&str, &str)]) -> Router {
    let config = Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap();
    router(Arc::new(AppState {
        store: memory.clone(),
        auth: memory,
        config: Arc::new(config),
    }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Signs up and returns the `session=...` pair to send back.
async fn sign_up(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({ "email": email, "password": "secret1", "display_name": "Alice Doe" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app();
    let response = app.clone().oneshot(get("/portfolio", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get("/auth/me", Some("session=not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_rejects_weak_passwords_and_duplicate_emails() {
    let app = app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({ "email": "weak@example.com", "password": "123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    sign_up(&app, "taken@example.com").await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/auth/signup",
            None,
            json!({ "email": "taken@example.com", "password": "secret1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn saved_portfolio_is_published_under_its_username() {
    let app = app();
    let cookie = sign_up(&app, "alice@example.com").await;

    let me = app
        .clone()
        .oneshot(get("/auth/me", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["email"], "alice@example.com");

    // First load falls back to the starter document.
    let loaded = app
        .clone()
        .oneshot(get("/portfolio", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(loaded.status(), StatusCode::OK);
    let loaded = body_json(loaded).await;
    assert_eq!(loaded["source"], "default");
    assert_eq!(loaded["document"]["username"], "alice-doe");

    let mut document = loaded["document"].clone();
    document["username"] = json!("alice");
    document["title"] = json!("Alice in Space");
    let saved = app
        .clone()
        .oneshot(json_request("PUT", "/portfolio", Some(&cookie), document))
        .await
        .unwrap();
    assert_eq!(saved.status(), StatusCode::OK);
    assert!(body_json(saved).await["updated_at"].is_string());

    let reloaded = body_json(
        app.clone()
            .oneshot(get("/portfolio", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(reloaded["source"], "stored");

    let page = app.clone().oneshot(get("/@alice", None)).await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let page = body_json(page).await;
    assert_eq!(page["title"], "Alice in Space");
    assert_eq!(page["blocks"][0]["layout"], "hero");

    let availability = body_json(
        app.oneshot(get("/usernames/alice", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(availability["available"], true);
}

#[tokio::test]
async fn unknown_handles_are_not_found() {
    let response = app().oneshot(get("/@ghost", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Portfolio Not Found");
}

#[tokio::test]
async fn presets_are_listed_without_signing_in() {
    let response = app().oneshot(get("/presets", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let presets = body_json(response).await;
    assert_eq!(presets.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn explicit_save_rejects_repeated_section_ids() {
    let app = app();
    let cookie = sign_up(&app, "dup@example.com").await;
    let document = json!({
        "title": "T",
        "description": "D",
        "username": "dup",
        "theme": { "primaryColor": "#6FC3DF", "backgroundColor": "#0A0A0A", "fontFamily": "Inter" },
        "sections": [
            { "id": "s1", "type": "hero", "title": "A", "content": "" },
            { "id": "s1", "type": "contact", "title": "B", "content": "" }
        ]
    });
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/portfolio", Some(&cookie), document))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&message[..], b"Section s1 already exists");

    let page = app.oneshot(get("/@dup", None)).await.unwrap();
    assert_eq!(page.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explicit_save_rejects_images_it_would_have_to_drop() {
    let app = app();
    let cookie = sign_up(&app, "img@example.com").await;
    for (kind, image) in [("about", "ftp://bad"), ("contact", "https://x.io/a.png")] {
        let document = json!({
            "title": "T",
            "description": "D",
            "username": "img",
            "theme": { "primaryColor": "#6FC3DF", "backgroundColor": "#0A0A0A", "fontFamily": "Inter" },
            "sections": [{ "id": "s1", "type": kind, "title": "A", "content": "", "image": image }]
        });
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/portfolio", Some(&cookie), document))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} section", kind);
    }

    let loaded = body_json(app.oneshot(get("/portfolio", Some(&cookie))).await.unwrap()).await;
    assert_eq!(loaded["source"], "default");
}

//=========================================================================================
// Editor WebSocket
//=========================================================================================

const WS_DEBOUNCE_MS: u64 = 300;

type EditorSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Serves the router on an ephemeral port and opens the editor socket for a new account.
async fn open_editor(memory: Arc<InMemoryAdapter>) -> (EditorSocket, Uuid) {
    let debounce = WS_DEBOUNCE_MS.to_string();
    let app = app_with(memory.clone(), &[("AUTOSAVE_DEBOUNCE_MS", &debounce)]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let session = memory
        .sign_up("ws@example.com", "secret1", Some("Web Socket"))
        .await
        .unwrap();
    let mut request = format!("ws://{}/editor/ws", addr)
        .into_client_request()
        .unwrap();
    request.headers_mut().insert(
        header::COOKIE,
        format!("session={}", session.token).parse().unwrap(),
    );
    let (socket, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    (socket, session.user.uid)
}

async fn next_frame(socket: &mut EditorSocket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("no frame within 5s")
            .unwrap()
            .unwrap();
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_frame(socket: &mut EditorSocket, message: Value) {
    socket
        .send(WsMessage::text(message.to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn editor_socket_autosaves_after_the_quiet_period() {
    let memory = Arc::new(InMemoryAdapter::default());
    let (mut socket, owner) = open_editor(memory.clone()).await;

    let loaded = next_frame(&mut socket).await;
    assert_eq!(loaded["type"], "session_loaded");
    assert_eq!(loaded["source"], "default");
    assert_eq!(loaded["document"]["username"], "web-socket");

    send_frame(&mut socket, json!({ "type": "set_title", "title": "Live" })).await;
    let updated = next_frame(&mut socket).await;
    assert_eq!(updated["type"], "document_updated");
    assert_eq!(updated["revision"], 1);

    let started = next_frame(&mut socket).await;
    assert_eq!(started["type"], "save_status");
    assert_eq!(started["saving"], true);
    let finished = next_frame(&mut socket).await;
    assert_eq!(finished["type"], "save_status");
    assert_eq!(finished["saving"], false);
    assert!(finished["saved_at"].is_string());

    let stored = memory.get_portfolio(owner).await.unwrap().unwrap();
    assert_eq!(stored.title, "Live");
}

#[tokio::test]
async fn closing_the_editor_socket_drops_the_pending_autosave() {
    let memory = Arc::new(InMemoryAdapter::default());
    let (mut socket, owner) = open_editor(memory.clone()).await;

    assert_eq!(next_frame(&mut socket).await["type"], "session_loaded");
    send_frame(&mut socket, json!({ "type": "set_title", "title": "Never saved" })).await;
    assert_eq!(next_frame(&mut socket).await["type"], "document_updated");

    socket.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(WS_DEBOUNCE_MS * 3)).await;
    assert!(memory.get_portfolio(owner).await.unwrap().is_none());
}
