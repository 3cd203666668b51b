//! Shared test doubles for the behaviour suites.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferrogate_core::{
    GatewayClient, GatewayConfig, HttpClient, HttpError, HttpRequest, HttpResponse,
};

type Scripted = Result<HttpResponse, HttpError>;

/// Transport that replays scripted results and records every request.
///
/// Once the script runs out, the fallback result is returned forever.
#[derive(Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    latency: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn always(result: Scripted) -> Self {
        Self {
            fallback: Some(result),
            ..Self::default()
        }
    }

    pub fn sequence(results: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    /// Delay every response by `latency` (tokio time, so it respects pausing).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    fn next_result(&self) -> Scripted {
        let scripted = self.script.lock().expect("script lock").pop_front();
        scripted
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(HttpError::protocol("script exhausted")))
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("requests lock").push(request);
        let result = self.next_result();
        let latency = self.latency;

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

pub fn ok(body: &str) -> Scripted {
    Ok(HttpResponse::ok_json(body))
}

pub fn status(code: u16, text: &str) -> Scripted {
    Ok(HttpResponse::with_status(code, text))
}

/// `capacity=10, refill_rate=2, max_attempts=3`, base delay 1s, no jitter.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::new("test-key");
    config.base_url = String::from("https://fmp.test/api");
    config.retry.jitter = false;
    config
}

pub fn client_with(
    config: GatewayConfig,
    transport: ScriptedHttpClient,
) -> (GatewayClient, Arc<ScriptedHttpClient>) {
    let transport = Arc::new(transport);
    let client = GatewayClient::builder(config)
        .http_client(transport.clone())
        .build()
        .expect("test config is valid");
    (client, transport)
}

pub const AAPL_QUOTE: &str = r#"[{"symbol":"AAPL","name":"Apple Inc.","price":189.84,"exchange":"NASDAQ"}]"#;
