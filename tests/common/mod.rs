#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use yatube::app::auth::hash_password;
use yatube::config::AppConfig;
use yatube::domain::group::{Group, NewGroup};
use yatube::domain::post::{NewPost, Post};
use yatube::domain::user::NewUser;
use yatube::AppState;

// "0123456789abcdef0123456789abcdef", test-only
const TEST_SESSION_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const DEFAULT_PASSWORD: &str = "testpassword123";
const BOUNDARY: &str = "yatube-test-boundary";

/// One isolated app per test: fresh in-memory store, cache and media dir.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub set_cookie: Option<String>,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    /// Number of rendered post cards.
    pub fn post_count(&self) -> usize {
        self.text().matches("<article>").count()
    }

    /// `sessionid=<token>` from the Set-Cookie header, ready to send back.
    pub fn session_cookie(&self) -> Option<String> {
        let set_cookie = self.set_cookie.as_ref()?;
        let pair = set_cookie.split(';').next()?.trim();
        if pair.starts_with("sessionid=") && pair.len() > "sessionid=".len() {
            Some(pair.to_string())
        } else {
            None
        }
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    /// Value for the Cookie header.
    pub cookie: String,
}

/// A multipart post form.
#[derive(Default)]
pub struct PostFields<'a> {
    pub text: &'a str,
    pub group: Option<String>,
    pub image: Option<(&'a str, Vec<u8>)>,
    pub clear_image: bool,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(&[]).await
    }

    pub async fn with_settings(overrides: &[(&str, &str)]) -> Self {
        let media_root = std::env::temp_dir().join(format!("yatube-test-{}", Uuid::new_v4()));
        let mut vars: HashMap<String, String> = HashMap::from([
            ("STORAGE_BACKEND".to_string(), "memory".to_string()),
            ("CACHE_BACKEND".to_string(), "memory".to_string()),
            ("MEDIA_BACKEND".to_string(), "local".to_string()),
            (
                "MEDIA_ROOT".to_string(),
                media_root.to_string_lossy().into_owned(),
            ),
            ("SESSION_KEY".to_string(), TEST_SESSION_KEY.to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config =
            AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("invalid test config");
        let state = AppState::build(&config)
            .await
            .expect("failed to build app state");
        let router = yatube::http::router(state.clone());

        TestApp { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<(&str, Vec<u8>)>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let request = match body {
            Some((content_type, bytes)) => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(bytes))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string());
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            location,
            set_cookie,
            body_bytes,
        }
    }

    pub async fn get(&self, path: &str, user: Option<&TestUser>) -> TestResponse {
        self.request(Method::GET, path, None, user.map(|u| u.cookie.as_str()))
            .await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        user: Option<&TestUser>,
    ) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .finish();
        self.request(
            Method::POST,
            path,
            Some(("application/x-www-form-urlencoded", body.into_bytes())),
            user.map(|u| u.cookie.as_str()),
        )
        .await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        fields: PostFields<'_>,
        user: Option<&TestUser>,
    ) -> TestResponse {
        let mut body = Vec::new();
        let mut push_text = |name: &str, value: &str| {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        };
        push_text("text", fields.text);
        push_text("group", fields.group.as_deref().unwrap_or(""));
        if fields.clear_image {
            push_text("image-clear", "on");
        }
        if let Some((file_name, data)) = fields.image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        self.request(
            Method::POST,
            path,
            Some((content_type.as_str(), body)),
            user.map(|u| u.cookie.as_str()),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Inserts a user directly and issues a session for them. The account has
    /// no usable password; see `create_user_with_password`.
    pub async fn create_user(&self, username: &str) -> TestUser {
        self.insert_user(username, String::new()).await
    }

    pub async fn create_user_with_password(&self, username: &str, password: &str) -> TestUser {
        let hash = hash_password(password).expect("password hash failed");
        self.insert_user(username, hash).await
    }

    async fn insert_user(&self, username: &str, password_hash: String) -> TestUser {
        let user = self
            .state
            .repos
            .users
            .create(NewUser {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{}@example.com", username),
                password_hash,
            })
            .await
            .expect("insert test user failed")
            .expect("username already taken");

        let token = self
            .state
            .auth_service()
            .issue_session(user.id)
            .expect("failed to issue session");

        TestUser {
            id: user.id,
            username: user.username,
            cookie: format!("sessionid={}", token),
        }
    }

    pub async fn create_group(&self, slug: &str) -> Group {
        self.state
            .repos
            .groups
            .create(NewGroup {
                title: format!("Group {}", slug),
                slug: slug.to_string(),
                description: format!("All about {}", slug),
            })
            .await
            .expect("insert test group failed")
    }

    pub async fn create_post(&self, author: &TestUser, text: &str, group: Option<&Group>) -> Post {
        self.state
            .repos
            .posts
            .create(NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("insert test post failed")
    }

    pub async fn clear_cache(&self) {
        self.state.cache.clear().await.expect("cache clear failed");
    }
}

/// A tiny valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 30, 30]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("failed to encode png");
    buf.into_inner()
}
