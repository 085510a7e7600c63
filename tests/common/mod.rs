// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use althea::config::Config;
use althea::db::{FirestoreDb, MemoryDb};
use althea::routes::create_router;
use althea::services::generator::GeneratorError;
use althea::services::{FirebaseTokenVerifier, OfflineGenerator, TextGenerator};
use althea::AppState;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Key ID the static test verifier accepts.
#[allow(dead_code)]
pub const TEST_KID: &str = "althea-test-key";

const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_signing_key.pem");
const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_signing_key.pub.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("althea-test")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Claims shaped like a Firebase ID token.
#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    iss: String,
    aud: &'a str,
    iat: u64,
    auth_time: u64,
    exp: u64,
    email: &'a str,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Sign an ID token for `uid` that the test verifier accepts.
#[allow(dead_code)]
pub fn create_test_token(uid: &str, config: &Config) -> String {
    create_test_token_expiring(uid, config, now() + 3600)
}

/// Sign an ID token with an explicit `exp`.
#[allow(dead_code)]
pub fn create_test_token_expiring(uid: &str, config: &Config, exp: u64) -> String {
    let issued = now().min(exp.saturating_sub(60));
    let claims = TestClaims {
        sub: uid,
        iss: format!("https://securetoken.google.com/{}", config.firebase_project_id),
        aud: &config.firebase_project_id,
        iat: issued,
        auth_time: issued,
        exp,
        email: "patient@example.com",
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

/// Generator that answers every prompt with a fixed reply and records prompts.
#[allow(dead_code)]
pub struct ScriptedGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _max_new_tokens: u32) -> Result<String, GeneratorError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Create a test app with an in-memory store and no model.
/// Returns the router, the shared state and the store for inspection.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    create_test_app_with_generator(Arc::new(OfflineGenerator))
}

#[allow(dead_code)]
pub fn create_test_app_with_generator(
    generator: Arc<dyn TextGenerator>,
) -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    create_test_app_with_config(Config::test_default(), generator)
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
    generator: Arc<dyn TextGenerator>,
) -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    let store = Arc::new(MemoryDb::new());

    let public_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
    let token_verifier =
        Arc::new(FirebaseTokenVerifier::new_with_static_key(&config, TEST_KID, public_key).unwrap());

    let state = Arc::new(AppState {
        config,
        store: store.clone(),
        token_verifier,
        generator,
    });

    (create_router(state.clone()), state, store)
}

/// Send a request and decode the JSON response body.
#[allow(dead_code)]
pub async fn send_json(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Authenticated GET.
#[allow(dead_code)]
pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("token", token)
        .body(Body::empty())
        .unwrap()
}

/// Authenticated JSON POST.
#[allow(dead_code)]
pub fn post_json(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("token", token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub const MULTIPART_BOUNDARY: &str = "althea-test-boundary";

/// A multipart body with a single file part named `field`.
#[allow(dead_code)]
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST /analyze with the given profile header and multipart body.
#[allow(dead_code)]
pub fn analyze_request(token: &str, profile_id: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("token", token)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        );
    if let Some(pid) = profile_id {
        builder = builder.header("profile-id", pid);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Build a PDF with one text line per page.
#[allow(dead_code)]
pub fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    let mut doc = Document::with_version("1.4");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
