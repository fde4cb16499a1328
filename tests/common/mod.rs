#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use devhub_api::auth::{generate_jwt, Claims, UserType};
use devhub_api::reviews::MemoryReviewRepository;
use devhub_api::AppState;
use reqwest::StatusCode;

/// The API served in-process on a free port, backed by the in-memory review store.
///
/// Every test gets its own server: the accept loop lives on the test's runtime and dies with it.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub repo: MemoryReviewRepository,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let repo = MemoryReviewRepository::new();
        let app = devhub_api::app(AppState::new(Arc::new(repo.clone())));
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            repo,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn developer(&self, username: &str) -> i32 {
        self.repo.add_developer(username).await
    }

    /// Seed a client account and return its id with a bearer token.
    pub async fn client_user(&self, full_name: &str) -> Result<(i32, String)> {
        let id = self.repo.add_user(full_name).await;
        Ok((id, token_for(id, UserType::Client, false)?))
    }

    pub async fn admin_user(&self) -> Result<(i32, String)> {
        let id = self.repo.add_user("Site Admin").await;
        Ok((id, token_for(id, UserType::Client, true)?))
    }

    pub async fn add_review(&self, token: &str, developer_id: i32, rating: i64) -> Result<reqwest::Response> {
        let res = self
            .client
            .post(self.url("/api/reviews"))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "developer_id": developer_id,
                "rating": rating,
                "message": "Clear communication, solid delivery"
            }))
            .send()
            .await?;
        Ok(res)
    }
}

pub fn token_for(id: i32, user_type: UserType, is_admin: bool) -> Result<String> {
    let claims = Claims::new(id, format!("user{}@devhub.test", id), user_type, is_admin);
    Ok(generate_jwt(&claims)?)
}
