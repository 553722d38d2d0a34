use crate::server::{ServerState, app, auth::TokenSettings, media::MediaStore};
use agora_common::{
    snowflake::{ProcessId, WorkerId},
    util::PositiveDuration,
};
use agora_db::client::DbClient;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use time::Duration;
use tower::ServiceExt;

const PASSWORD: &str = "secret123";
const BOUNDARY: &str = "agora-test-boundary";

struct TestApp {
    router: Router,
    media: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let db_client = DbClient::connect(
            "sqlite::memory:",
            1,
            WorkerId::new_unchecked(0),
            ProcessId::new_unchecked(0),
        )
        .await
        .unwrap();
        db_client.migrate().await.unwrap();

        let media = TempDir::new().unwrap();
        let state = ServerState {
            db_client: Arc::new(db_client),
            token_settings: TokenSettings {
                access_lifetime: PositiveDuration::new_unchecked(Duration::minutes(5)),
                refresh_lifetime: PositiveDuration::new_unchecked(Duration::days(1)),
            },
            media: Arc::new(MediaStore::new(media.path().to_owned())),
        };

        Self {
            router: app(state),
            media,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn upload(
        &self,
        uri: &str,
        token: &str,
        field: &str,
        filename: &str,
        content: &str,
    ) -> (StatusCode, Value) {
        let body = format!(
            "--{BOUNDARY}\r\n\
            Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
            Content-Type: application/octet-stream\r\n\
            \r\n\
            {content}\r\n\
            --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    async fn register(&self, email: &str) -> u64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/users/register",
                None,
                Some(json!({"email": email, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["id"].as_u64().unwrap()
    }

    async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/users/token",
                None,
                Some(json!({"email": email, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        (
            body["access"].as_str().unwrap().to_owned(),
            body["refresh"].as_str().unwrap().to_owned(),
        )
    }

    /// Registers and logs in a user, returning their id and access token.
    async fn user(&self, email: &str) -> (u64, String) {
        let id = self.register(email).await;
        let (access, _) = self.login(email).await;

        (id, access)
    }

    async fn create_post(&self, token: &str, body: Value) -> u64 {
        let (status, body) = self.post("/posts", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["id"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn registration_and_login() {
    let app = TestApp::new().await;
    let id = app.register("alice@Example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/users/register",
            None,
            Some(json!({"email": "alice@example.com", "password": PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = app
        .request(
            Method::POST,
            "/users/register",
            None,
            Some(json!({"email": "bob@example.com", "password": "abc"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/users/token",
            None,
            Some(json!({"email": "alice@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request(Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (access, _) = app.login("alice@example.com").await;
    let (status, body) = app.get("/users/me", &access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["followings"], json!([]));
    assert_eq!(body["followers"], json!([]));
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn refresh_and_logout() {
    let app = TestApp::new().await;
    app.register("alice@example.com").await;
    let (access, refresh) = app.login("alice@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/users/token/refresh",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let fresh_access = body["access"].as_str().unwrap().to_owned();
    assert_eq!(app.get("/users/me", &fresh_access).await.0, StatusCode::OK);

    assert_eq!(app.get("/users/me", &refresh).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/users/me", "garbage").await.0, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/users/token/refresh",
            None,
            Some(json!({"refresh": access})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/users/logout",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = app
        .request(
            Method::POST,
            "/users/token/refresh",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_detail_is_visible_to_author_and_followers() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;

    let post = app
        .create_post(&alice_token, json!({"content": "Lisbon!", "hashtag": "travel"}))
        .await;
    let detail = format!("/posts/{post}");

    assert_eq!(app.get(&detail, &alice_token).await.0, StatusCode::OK);
    let (status, body) = app.get(&detail, &bob_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, body) = app
        .post(&format!("/users/{alice}/follow"), &bob_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["followings"], json!([alice]));

    let (status, body) = app.get(&detail, &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], post);
    assert_eq!(body["author"], alice);
    assert_eq!(body["hashtag"], "travel");
    assert_eq!(body["likes"], json!([]));
    assert_eq!(body["comments"], json!([]));

    let (status, _) = app.get(&format!("{detail}?hashtag=TRAV"), &bob_token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("{detail}?hashtag=food"), &bob_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(&format!("/users/{alice}/unfollow"), &bob_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.get(&detail, &bob_token).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&detail, &alice_token).await.0, StatusCode::OK);

    let bob_post = app.create_post(&bob_token, json!({"content": "hi"})).await;
    let (status, _) = app.get(&format!("/posts/{bob_post}"), &alice_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/posts", &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], bob_post);
    assert_eq!(body[1]["id"], post);
}

#[tokio::test]
async fn liking_twice_conflicts() {
    let app = TestApp::new().await;
    let (_, alice_token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;
    let post = app.create_post(&alice_token, json!({"content": "x"})).await;

    let like = format!("/posts/{post}/like");
    let unlike = format!("/posts/{post}/unlike");

    let (status, body) = app.post(&like, &bob_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count_likes"], 1);

    let (status, _) = app.post(&like, &bob_token, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/posts", &bob_token).await;
    assert_eq!(body[0]["count_likes"], 1);

    let (status, body) = app.post(&unlike, &bob_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count_likes"], 0);

    let (status, body) = app.post(&unlike, &bob_token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count_likes"], 0);

    let (status, _) = app.post("/posts/1/like", &bob_token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_rules() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;

    let (status, body) = app
        .post(&format!("/users/{alice}/follow"), &alice_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User can't follow self");
    let (_, body) = app.get("/users/me", &alice_token).await;
    assert_eq!(body["followings"], json!([]));

    let (status, _) = app
        .post(&format!("/users/{bob}/unfollow"), &alice_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let follow_bob = format!("/users/{bob}/follow");
    assert_eq!(app.post(&follow_bob, &alice_token, json!({})).await.0, StatusCode::OK);
    assert_eq!(
        app.post(&follow_bob, &alice_token, json!({})).await.0,
        StatusCode::CONFLICT
    );

    let (_, body) = app.get("/users/me", &bob_token).await;
    assert_eq!(body["followers"], json!([alice]));
    assert_eq!(body["followings"], json!([]));

    let (status, _) = app.post("/users/1/follow", &alice_token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(&format!("/users/{bob}/unfollow"), &alice_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/users/{bob}"), &alice_token).await;
    assert_eq!(body["followers"], json!([]));
}

#[tokio::test]
async fn only_authors_change_posts_and_comments() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;
    let post = app
        .create_post(&alice_token, json!({"content": "x", "hashtag": "keep"}))
        .await;
    let detail = format!("/posts/{post}");

    let (status, body) = app
        .request(Method::DELETE, &detail, Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have permission to delete this post.");
    assert_eq!(app.get(&detail, &alice_token).await.0, StatusCode::OK);

    let (status, _) = app
        .request(Method::PATCH, &detail, Some(&bob_token), Some(json!({"content": "y"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::PATCH, &detail, Some(&alice_token), Some(json!({"content": "y"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "y");
    assert_eq!(body["hashtag"], "keep");

    app.post(&format!("/users/{alice}/follow"), &bob_token, json!({}))
        .await;
    let comments = format!("/posts/{post}/comments");
    let (status, body) = app
        .post(&comments, &alice_token, json!({"content": "mine"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment = format!("{comments}/{}", body["id"]);

    let (status, _) = app
        .request(Method::DELETE, &comment, Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .request(Method::PUT, &comment, Some(&bob_token), Some(json!({"content": "theirs"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&comments, &bob_token).await;
    assert_eq!(body[0]["content"], "mine");

    let (status, body) = app
        .request(Method::PUT, &comment, Some(&alice_token), Some(json!({"content": "edited"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "edited");

    let (status, _) = app
        .request(Method::DELETE, &comment, Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .request(Method::DELETE, &detail, Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&detail, &alice_token).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn strangers_cannot_change_comments_on_hidden_posts() {
    let app = TestApp::new().await;
    let (_, alice_token) = app.user("alice@example.com").await;
    let (_, carol_token) = app.user("carol@example.com").await;
    let post = app.create_post(&alice_token, json!({"content": "x"})).await;

    let comments = format!("/posts/{post}/comments");
    let (status, body) = app
        .post(&comments, &alice_token, json!({"content": "mine"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment = format!("{comments}/{}", body["id"]);

    assert_eq!(app.get(&comment, &carol_token).await.0, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::DELETE, &comment, Some(&carol_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "You do not have permission to delete this comment."
    );

    let (status, _) = app
        .request(
            Method::PUT,
            &comment,
            Some(&carol_token),
            Some(json!({"content": "theirs"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get(&comment, &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "mine");

    let (status, _) = app
        .request(Method::DELETE, &format!("{comments}/1"), Some(&carol_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_require_a_visible_post() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;
    let post = app.create_post(&alice_token, json!({"content": "x"})).await;
    let other_post = app.create_post(&alice_token, json!({"content": "y"})).await;
    let comments = format!("/posts/{post}/comments");

    assert_eq!(app.get(&comments, &bob_token).await.0, StatusCode::NOT_FOUND);
    let (status, _) = app.post(&comments, &bob_token, json!({"content": "hi"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post(&format!("/users/{alice}/follow"), &bob_token, json!({}))
        .await;

    let (status, body) = app
        .post(&comments, &bob_token, json!({"content": "  nice  "}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "nice");
    assert_eq!(body["post"], post);
    let comment_id = body["id"].as_u64().unwrap();

    let (status, _) = app.post(&comments, &bob_token, json!({"content": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&comments, &bob_token).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .get(&format!("{comments}/{comment_id}"), &bob_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], comment_id);

    let (status, _) = app
        .get(&format!("/posts/{other_post}/comments/{comment_id}"), &bob_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(&format!("/posts/{post}"), &bob_token).await;
    assert_eq!(body["comments"][0]["id"], comment_id);
}

#[tokio::test]
async fn user_listing_filters_and_profile_updates() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;

    let (status, body) = app
        .request(
            Method::PATCH,
            "/users/me",
            Some(&alice_token),
            Some(json!({"first_name": "Olena", "city": "Lviv"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Olena");
    assert_eq!(body["email"], "alice@example.com");

    app.request(
        Method::PATCH,
        "/users/me",
        Some(&bob_token),
        Some(json!({"first_name": "Bohdan"})),
    )
    .await;

    let (_, body) = app.get("/users?first_name=ole", &bob_token).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], alice);
    assert_eq!(body[0]["count_followers"], 0);

    app.post(&format!("/users/{alice}/follow"), &bob_token, json!({}))
        .await;
    let (_, body) = app.get("/users?city=LV", &bob_token).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["count_followers"], 1);

    let (_, body) = app.get("/users?first_name=", &bob_token).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app
        .request(
            Method::PUT,
            "/users/me",
            Some(&alice_token),
            Some(json!({"email": "olena@example.com", "country": "Ukraine"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "olena@example.com");
    assert_eq!(body["first_name"], "");
    assert_eq!(body["city"], Value::Null);
    assert_eq!(body["country"], "Ukraine");

    let (status, _) = app
        .request(
            Method::PATCH,
            "/users/me",
            Some(&bob_token),
            Some(json!({"email": "olena@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_an_account_cascades() {
    let app = TestApp::new().await;
    let (alice, alice_token) = app.user("alice@example.com").await;
    let (bob, bob_token) = app.user("bob@example.com").await;

    let alice_post = app.create_post(&alice_token, json!({"content": "x"})).await;
    let bob_post = app.create_post(&bob_token, json!({"content": "y"})).await;
    app.post(&format!("/users/{alice}/follow"), &bob_token, json!({}))
        .await;
    app.post(&format!("/users/{bob}/follow"), &alice_token, json!({}))
        .await;
    app.post(&format!("/posts/{bob_post}/like"), &alice_token, json!({}))
        .await;
    app.post(
        &format!("/posts/{alice_post}/comments"),
        &bob_token,
        json!({"content": "hello"}),
    )
    .await;

    let (status, _) = app
        .request(Method::DELETE, "/users/me", Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.get("/users/me", &alice_token).await.0, StatusCode::UNAUTHORIZED);

    let (_, body) = app.get("/posts", &bob_token).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], bob_post);
    assert_eq!(body[0]["count_likes"], 0);

    let (_, body) = app.get("/users/me", &bob_token).await;
    assert_eq!(body["followings"], json!([]));
    assert_eq!(body["followers"], json!([]));
    assert_eq!(
        app.get(&format!("/users/{alice}"), &bob_token).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn uploads_are_stored_under_slugged_names() {
    let app = TestApp::new().await;
    let (_, alice_token) = app.user("alice@example.com").await;
    let (_, bob_token) = app.user("bob@example.com").await;

    app.request(
        Method::PATCH,
        "/users/me",
        Some(&alice_token),
        Some(json!({"first_name": "Jane", "last_name": "Doe"})),
    )
    .await;
    let (status, body) = app
        .upload("/users/me/picture", &alice_token, "picture", "me.png", "not a png")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let picture = body["picture"].as_str().unwrap().to_owned();
    assert!(picture.starts_with("uploads/image/jane-doe-"), "{picture}");
    assert!(picture.ends_with(".png"), "{picture}");
    assert!(app.media.path().join(&picture).is_file());

    let (status, body) = app.get(&format!("/media/{picture}"), &alice_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "not a png");

    let post = app
        .create_post(&alice_token, json!({"hashtag": "Summer Trip"}))
        .await;
    let image = format!("/posts/{post}/image");
    let (status, _) = app
        .upload(&image, &bob_token, "image", "beach.jpg", "sand")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .upload(&image, &alice_token, "picture", "beach.jpg", "sand")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .upload(&image, &alice_token, "image", "beach.jpg", "sand")
        .await;
    assert_eq!(status, StatusCode::OK);
    let image = body["image"].as_str().unwrap();
    assert!(image.starts_with("uploads/post_images/summer-trip-"), "{image}");
    assert!(image.ends_with(".jpg"), "{image}");
}

#[tokio::test]
async fn unknown_routes_answer_with_json_errors() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert!(body["message"].as_str().unwrap().contains("/nope"));
}
