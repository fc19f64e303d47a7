#![allow(dead_code)]

use clarity_service::config::ClarityConfig;
use clarity_service::services::providers::mock::{Script, ScriptedTextProvider};
use clarity_service::services::providers::TextProvider;
use clarity_service::services::ClarityGenerator;
use clarity_service::startup::Application;
use service_core::config::Config;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

pub const ALLOWED_ORIGIN: &str = "https://clarity.example.com";
pub const SECOND_ORIGIN: &str = "http://localhost:5173";

pub fn test_config() -> ClarityConfig {
    let mut config = ClarityConfig::default();
    config.common = Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    };
    config.cors.allowed_origins = vec![ALLOWED_ORIGIN.to_string(), SECOND_ORIGIN.to_string()];
    config
}

pub fn scripted(script: Script) -> (ClarityGenerator, Arc<ScriptedTextProvider>) {
    let provider = Arc::new(ScriptedTextProvider::new(script));
    let generator = ClarityGenerator::new(Some(provider.clone() as Arc<dyn TextProvider>));
    (generator, provider)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(generator: ClarityGenerator) -> Self {
        let app = Application::build_with_generator(test_config(), generator)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to answer its health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self {
            address,
            port,
            client,
        }
    }

    pub async fn post_diagnosis(&self, body: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/diagnosis", self.address))
            .header("content-type", "application/json")
            .body(body.to_string())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .expect("Failed to send request")
    }
}
