use async_trait::async_trait;
use axum::routing::{get, post};
use axum::{Json, Router};
use guildsite::client::{
    ApiClient, ApiRequest, Envelope, HttpTransport, RawResponse, ResolverConfig, RouteResolver,
    Transport,
};
use guildsite::error::{Classification, ClientError};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

/// Replays scripted responses in order and records every request it sees.
#[derive(Clone, Default)]
struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    fn new(responses: &[(u16, &str)]) -> Self {
        let t = ScriptedTransport::default();
        t.responses
            .lock()
            .unwrap()
            .extend(responses.iter().map(|(s, b)| (*s, b.to_string())));
        t
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, req: &ApiRequest) -> Result<RawResponse, ClientError> {
        self.seen.lock().unwrap().push(req.url.clone());
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((404, String::new()));
        Ok(RawResponse {
            url: format!("https://guild.example.com{}", req.url),
            status,
            body,
        })
    }
}

fn resolver(hostname: &str) -> RouteResolver {
    RouteResolver::new(ResolverConfig::new(hostname).mysql_site_host("guild.example.com"))
        .with_clock(|| 42)
}

#[tokio::test]
async fn generic_host_retries_auth_status_once_without_prefix() {
    let transport = ScriptedTransport::new(&[(404, ""), (404, "")]);
    let client = ApiClient::new(transport.clone(), resolver("guild.onrender.com"));

    let err = client.get("/api/auth/status").await.unwrap_err();

    assert_eq!(transport.seen(), vec!["/auth-status.php?t=42", "/auth/status?t=42"]);
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn generic_host_fallback_success_is_parsed() {
    let transport = ScriptedTransport::new(&[(404, ""), (200, r#"{"raids":[1,2]}"#)]);
    let client = ApiClient::new(transport.clone(), resolver("guild.onrender.com"));

    let env = client.get("/api/raids").await.unwrap();

    assert_eq!(transport.seen(), vec!["/api/raids?t=42", "/raids?t=42"]);
    assert_eq!(env, Envelope::Data(json!({"raids": [1, 2]})));
}

#[tokio::test]
async fn mysql_site_uses_php_routes_and_php_fallback() {
    let transport = ScriptedTransport::new(&[(404, ""), (200, r#"{"ok":true}"#)]);
    let client = ApiClient::new(transport.clone(), resolver("guild.example.com"));

    client.get("/api/auth/bnet/callback?code=abc").await.unwrap();

    assert_eq!(
        transport.seen(),
        vec!["/auth-callback.php?code=abc&t=42", "/auth-callback.php?code=abc&t=42"]
    );
}

#[tokio::test]
async fn development_never_retries() {
    let transport = ScriptedTransport::new(&[(404, r#"{"message":"no route"}"#)]);
    let client = ApiClient::new(transport.clone(), resolver("localhost"));

    let err = client.get("/api/auth/status").await.unwrap_err();

    assert_eq!(transport.seen(), vec!["/api/auth/status?t=42"]);
    match err {
        ClientError::Http { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no route");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn unauthorized_is_none_for_optional_get() {
    let transport = ScriptedTransport::new(&[(401, r#"{"error":"unauthenticated"}"#)]);
    let client = ApiClient::new(transport, resolver("localhost"));

    assert_eq!(client.get_optional("/api/auth/user").await.unwrap(), None);
}

#[tokio::test]
async fn html_error_page_on_auth_path_yields_safe_default() {
    let transport = ScriptedTransport::new(&[(
        500,
        "<!DOCTYPE html><html><body>Fatal error</body></html>",
    )]);
    let client = ApiClient::new(transport, resolver("guild.example.com"));

    let env = client.get("/api/auth/user").await.unwrap();

    match &env {
        Envelope::Fallback { classification, body } => {
            assert_eq!(*classification, Classification::HtmlErrorPage);
            assert_eq!(body["isAuthenticated"], false);
            assert_eq!(body["debug"]["htmlDetected"], true);
            assert_eq!(body["debug"]["status"], 500);
            assert_eq!(
                body["debug"]["url"],
                "https://guild.example.com/auth-user.php?t=42"
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn server_error_on_plain_path_carries_message() {
    let transport =
        ScriptedTransport::new(&[(500, r#"{"error":{"code":"db","message":"boom"}}"#)]);
    let client = ApiClient::new(transport, resolver("localhost"));

    let err = client.get("/api/roster").await.unwrap_err();
    assert_eq!(err.to_string(), "http 500: boom");
    assert_eq!(err.classification(), None);
}

#[tokio::test]
async fn empty_success_body_is_empty_envelope() {
    let transport = ScriptedTransport::new(&[(200, "")]);
    let client = ApiClient::new(transport, resolver("localhost"));

    assert_eq!(client.get("/api/auth/logout").await.unwrap(), Envelope::Empty);
}

async fn spawn_site(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    Url::parse(&format!("http://{}/", addr)).expect("valid base url")
}

#[tokio::test]
async fn http_transport_takes_the_fallback_route_on_a_live_server() {
    let app = Router::new()
        .route(
            "/auth/user",
            get(|| async {
                Json(json!({"isAuthenticated": true, "user": {"battletag": "Thrall#1234"}}))
            }),
        )
        .route(
            "/api/echo",
            post(|Json(body): Json<Value>| async move { Json(json!({ "echo": body })) }),
        );
    let base = spawn_site(app).await;
    let client = ApiClient::new(HttpTransport::new(base), resolver("guild.onrender.com"));

    // /auth-user.php is not served here, so the 404 sends the client to /auth/user.
    let env = client.get("/api/auth/user").await.unwrap();
    assert_eq!(env.value().unwrap()["user"]["battletag"], "Thrall#1234");

    let env = client
        .send(Method::POST, "/api/echo", Some(json!({"rank": 2})))
        .await
        .unwrap();
    assert_eq!(env.value().unwrap()["echo"]["rank"], 2);
}
