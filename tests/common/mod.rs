#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use billsmart_api::config::AppConfig;
use billsmart_api::server;

pub const CRON_SECRET: &str = "integration-cron-secret";

static SERVER: OnceLock<Option<TestServer>> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub config: AppConfig,
}

impl TestServer {
    /// Run the app on its own thread and runtime so it outlives any single
    /// `#[tokio::test]` runtime. `None` when no database is configured or reachable.
    fn spawn() -> Option<Self> {
        let _ = dotenvy::dotenv();
        if std::env::var("DATABASE_URL").map(|u| u.is_empty()).unwrap_or(true) {
            eprintln!("DATABASE_URL not set, skipping integration tests");
            return None;
        }

        let port = portpicker::pick_unused_port().expect("failed to pick free port");
        let mut config = AppConfig::from_env();
        config.api.port = port;
        config.database.run_migrations = true;
        config.security.cron_secret = Some(CRON_SECRET.to_string());
        config.notifications.sendgrid_api_key = None;

        let server_config = config.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build server runtime");
            runtime.block_on(async move {
                let state = match server::prepare(server_config).await {
                    Ok(state) => state,
                    Err(e) => {
                        eprintln!("failed to prepare server: {e:?}");
                        let _ = ready_tx.send(false);
                        return;
                    }
                };
                let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
                    .await
                    .expect("failed to bind test port");
                let _ = ready_tx.send(true);
                if let Err(e) = server::serve(listener, state).await {
                    eprintln!("server stopped: {e:?}");
                }
            });
        });

        match ready_rx.recv_timeout(Duration::from_secs(60)) {
            Ok(true) => Some(Self {
                port,
                base_url: format!("http://127.0.0.1:{}", port),
                config,
            }),
            _ => {
                eprintln!("database at DATABASE_URL unreachable, skipping integration tests");
                None
            }
        }
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// The shared server, or `None` when integration tests should be skipped
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    let Some(server) = SERVER.get_or_init(TestServer::spawn).as_ref() else {
        return Ok(None);
    };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(Some(server))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.test", prefix, uuid::Uuid::new_v4().simple())
}

/// Status plus parsed body (`Null` when the body is not JSON)
pub async fn send(
    client: &reqwest::Client,
    method: Method,
    url: String,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut req = client.request(method, url);
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    if let Some(body) = body {
        req = req.json(&body);
    }
    let res = req.send().await?;
    let status = res.status();
    let text = res.text().await?;
    Ok((status, serde_json::from_str(&text).unwrap_or(Value::Null)))
}

/// A registered, logged-in user
pub struct Session {
    pub server: &'static TestServer,
    pub client: reqwest::Client,
    pub token: String,
    pub email: String,
    pub password: String,
    pub user: Value,
}

impl Session {
    pub async fn register(server: &'static TestServer, name: &str) -> Result<Self> {
        let client = reqwest::Client::new();
        let email = unique_email(&name.to_lowercase().replace(' ', "-"));
        let password = "correct-horse-battery".to_string();

        let (status, body) = send(
            &client,
            Method::POST,
            server.url("/api/auth/register"),
            None,
            Some(json!({ "name": name, "email": email, "password": password })),
        )
        .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        let (status, body) = send(
            &client,
            Method::POST,
            server.url("/api/auth/login"),
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        let token = body["token"].as_str().context("login response has no token")?.to_string();

        Ok(Self {
            server,
            client,
            token,
            email,
            password,
            user: body["user"].clone(),
        })
    }

    pub fn user_id(&self) -> &str {
        self.user["id"].as_str().unwrap_or_default()
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        send(&self.client, method, self.server.url(path), Some(&self.token), body).await
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, None).await
    }

    /// Id of one of the categories seeded at registration
    pub async fn category_id(&self, name: &str) -> Result<String> {
        let (_, categories) = self.get("/api/categories").await?;
        categories
            .as_array()
            .and_then(|list| list.iter().find(|c| c["name"] == name))
            .and_then(|c| c["id"].as_str())
            .map(str::to_string)
            .with_context(|| format!("no {} category", name))
    }
}
