//! Behaviour tests for the gateway client.
//!
//! These tests drive `GatewayClient` end to end over a scripted transport and
//! check the admission, retry and classification contract callers rely on.
//! Time is paused, so backoff sleeps and bucket refill are deterministic.

mod common;

use std::time::Duration;

use ferrogate_core::{
    CacheMode, CancellationToken, ConfigError, Endpoint, ErrorCategory, FailureClassifier,
    FailureReason, GatewayClient, GatewayConfig, GatewayError, HistoricalRange, HttpError,
    RequestOptions,
};
use tokio::time::Instant;

use common::{client_with, ok, status, test_config, ScriptedHttpClient, AAPL_QUOTE};

// =============================================================================
// Gateway: End-to-end scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_symbol_has_no_data_caller_gets_not_found_for_one_token_and_one_attempt() {
    // Given: capacity=10, refill=2, max_attempts=3 and a provider that knows nothing
    let (client, transport) = client_with(test_config(), ScriptedHttpClient::always(ok("[]")));
    assert_eq!(client.limiter_status().tokens, 10.0);

    // When: The caller asks for a quote on BADSYM
    let error = client.quote("BADSYM").await.expect_err("no data means not found");

    // Then: Not found, exactly one token spent, no retries
    assert!(matches!(
        &error,
        GatewayError::NotFound { endpoint: Endpoint::Quote, symbol } if symbol == "BADSYM"
    ));
    assert_eq!(error.category(), ErrorCategory::NotFound);
    assert_eq!(client.limiter_status().tokens, 9.0);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn when_quote_exists_gateway_returns_payload_and_sends_normalized_request() {
    // Given: A provider with a quote for AAPL
    let (client, transport) = client_with(test_config(), ScriptedHttpClient::always(ok(AAPL_QUOTE)));

    // When: The caller asks with a lower-case, padded symbol
    let quote = client.quote("  aapl ").await.expect("quote should succeed");

    // Then: The payload is unwrapped and the request is well formed
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(quote.price, 189.84);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://fmp.test/api/v3/quote/AAPL");
    assert_eq!(requests[0].query_value("apikey"), Some("test-key"));
    assert_eq!(requests[0].timeout, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn when_history_is_requested_range_is_forwarded_as_query_parameters() {
    // Given: A provider with two bars of history
    let body = r#"{"symbol":"AAPL","historical":[
        {"date":"2024-01-03","open":184.2,"high":185.9,"low":183.4,"close":184.3,"volume":58414500},
        {"date":"2024-01-02","open":187.2,"high":188.4,"low":183.9,"close":185.6,"volume":82488700}
    ]}"#;
    let (client, transport) = client_with(test_config(), ScriptedHttpClient::always(ok(body)));
    let range = HistoricalRange::parse(Some("2024-01-01"), Some("2024-01-31")).expect("valid");

    // When: The caller asks for January
    let series = client.historical("AAPL", range).await.expect("history should succeed");

    // Then: Bars arrive newest first and the bounds reach the provider
    assert_eq!(series.historical.len(), 2);
    assert_eq!(series.historical[0].date.to_string(), "2024-01-03");

    let request = &transport.requests()[0];
    assert_eq!(request.url, "https://fmp.test/api/v3/historical-price-full/AAPL");
    assert_eq!(request.query_value("from"), Some("2024-01-01"));
    assert_eq!(request.query_value("to"), Some("2024-01-31"));
}

#[tokio::test(start_paused = true)]
async fn when_history_is_empty_object_caller_gets_not_found() {
    let (client, transport) = client_with(test_config(), ScriptedHttpClient::always(ok("{}")));

    let error = client
        .historical("ZZZZ", HistoricalRange::all())
        .await
        .expect_err("empty history");

    assert_eq!(error.category(), ErrorCategory::NotFound);
    assert_eq!(error.endpoint(), Some(Endpoint::Historical));
    assert_eq!(transport.call_count(), 1);
}

// =============================================================================
// Gateway: Retry and classification
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_provider_keeps_failing_with_503_caller_gets_upstream_unavailable() {
    // Given: A provider that always answers 503
    let (client, transport) = client_with(
        test_config(),
        ScriptedHttpClient::always(status(503, "Service Unavailable")),
    );
    let started = Instant::now();

    // When: The caller asks for a quote
    let error = client.quote("AAPL").await.expect_err("should exhaust retries");

    // Then: Three attempts, two waits (1s + 2s), one token
    assert!(matches!(
        error,
        GatewayError::UpstreamUnavailable { attempts: 3, status: Some(503), .. }
    ));
    assert_eq!(error.code(), "gateway.upstream_unavailable");
    assert_eq!(transport.call_count(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(client.limiter_status().tokens, 9.0);
}

#[tokio::test(start_paused = true)]
async fn when_provider_rejects_with_404_caller_gets_request_rejected_without_waiting() {
    // Given: A provider that answers 404
    let (client, transport) = client_with(
        test_config(),
        ScriptedHttpClient::always(status(404, "Not Found")),
    );
    let started = Instant::now();

    // When: The caller asks for a profile
    let error = client.profile("AAPL").await.expect_err("404 is terminal");

    // Then: Rejected at once with the original status preserved
    match &error {
        GatewayError::RequestRejected {
            status,
            status_text,
            reason,
            attempts,
            ..
        } => {
            assert_eq!(*status, Some(404));
            assert_eq!(status_text.as_deref(), Some("Not Found"));
            assert_eq!(*reason, FailureReason::ClientError(404));
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.call_count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn when_transient_failures_clear_caller_gets_the_payload() {
    // Given: A network blip, then a 429, then success
    let (client, transport) = client_with(
        test_config(),
        ScriptedHttpClient::sequence(vec![
            Err(HttpError::network("connection reset")),
            status(429, "Too Many Requests"),
            ok(AAPL_QUOTE),
        ]),
    );

    // When: The caller asks for a quote
    let quote = client.quote("AAPL").await.expect("third attempt succeeds");

    // Then: The quote arrives after three attempts on one token
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(transport.call_count(), 3);
    assert_eq!(client.limiter_status().tokens, 9.0);
}

#[tokio::test(start_paused = true)]
async fn when_attempt_exceeds_timeout_it_is_retried_as_no_response() {
    // Given: A provider slower than the per-attempt budget
    let mut config = test_config();
    config.timeout = Duration::from_secs(1);
    config.retry.max_attempts = 2;
    let (client, transport) = client_with(
        config,
        ScriptedHttpClient::always(ok(AAPL_QUOTE)).with_latency(Duration::from_secs(30)),
    );

    // When: The caller asks for a quote
    let error = client.quote("AAPL").await.expect_err("every attempt times out");

    // Then: Both attempts timed out and no status was seen
    assert!(matches!(
        error,
        GatewayError::UpstreamUnavailable { attempts: 2, status: None, .. }
    ));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_body_is_not_json_caller_gets_malformed_payload_without_retry() {
    let (client, transport) = client_with(
        test_config(),
        ScriptedHttpClient::always(ok("<html>maintenance</html>")),
    );

    let error = client.quote("AAPL").await.expect_err("html is malformed");

    assert_eq!(error.category(), ErrorCategory::MalformedPayload);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn when_endpoint_has_strict_classifier_server_errors_are_not_retried() {
    // Given: Profile calls never retry; quote calls keep the default table
    let transport = std::sync::Arc::new(ScriptedHttpClient::always(status(503, "Service Unavailable")));
    let client = GatewayClient::builder(test_config())
        .http_client(transport.clone())
        .endpoint_classifier(Endpoint::Profile, FailureClassifier::predicate(|_| false))
        .build()
        .expect("valid config");

    // When: A profile is requested
    let error = client.profile("AAPL").await.expect_err("503");

    // Then: One attempt, rejected by the endpoint policy
    assert!(matches!(
        error,
        GatewayError::RequestRejected { reason: FailureReason::CustomPolicy, attempts: 1, .. }
    ));
    assert_eq!(transport.call_count(), 1);

    // And: A call-site classifier overrides the endpoint one
    let options = RequestOptions::default()
        .with_classifier(FailureClassifier::predicate(|failure| failure.status_code() == Some(503)));
    let error = client.profile_with("AAPL", &options).await.expect_err("503");
    assert_eq!(error.attempts(), 3);
    assert_eq!(transport.call_count(), 4);
}

// =============================================================================
// Gateway: Input validation and configuration
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_symbol_is_invalid_no_token_is_spent_and_nothing_is_sent() {
    let (client, transport) = client_with(test_config(), ScriptedHttpClient::always(ok(AAPL_QUOTE)));

    for raw in ["", "   ", "WAY-TOO-LONG-SYMBOL", "AA PL", "AAPL$"] {
        let error = client.quote(raw).await.expect_err("invalid symbol");
        assert_eq!(error.category(), ErrorCategory::InvalidInput, "input={raw:?}");
    }

    assert_eq!(transport.call_count(), 0);
    assert_eq!(client.limiter_status().tokens, 10.0);
}

#[test]
fn when_api_key_is_missing_construction_fails_before_any_call() {
    let transport = std::sync::Arc::new(ScriptedHttpClient::always(ok(AAPL_QUOTE)));

    let error = GatewayClient::builder(GatewayConfig::new("  "))
        .http_client(transport.clone())
        .build()
        .expect_err("missing key");

    assert!(matches!(error, ConfigError::MissingApiKey));
    assert_eq!(transport.call_count(), 0);
}

// =============================================================================
// Gateway: Admission, cache and cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_limiter_status_is_read_no_token_is_consumed() {
    let (client, _transport) = client_with(test_config(), ScriptedHttpClient::always(ok(AAPL_QUOTE)));

    for _ in 0..5 {
        let status = client.limiter_status();
        assert_eq!(status.tokens, 10.0);
        assert_eq!(status.capacity, 10);
    }
}

#[tokio::test(start_paused = true)]
async fn when_bucket_is_empty_calls_wait_for_refill() {
    // Given: A bucket of one token refilling at 2/s
    let mut config = test_config();
    config.rate_limit.capacity = 1;
    let (client, transport) = client_with(config, ScriptedHttpClient::always(ok(AAPL_QUOTE)));
    let started = Instant::now();

    // When: Two calls are made back to back
    client.quote("AAPL").await.expect("first call");
    client.quote("MSFT").await.expect("second call");

    // Then: The second waited for a refill
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_response_is_cached_repeat_calls_skip_admission_and_transport() {
    // Given: A one-minute cache
    let mut config = test_config();
    config.cache_ttl = Duration::from_secs(60);
    let (client, transport) = client_with(config, ScriptedHttpClient::always(ok(AAPL_QUOTE)));

    // When: The same quote is requested twice
    client.quote("AAPL").await.expect("first call");
    let cached = client.quote("aapl").await.expect("cached call");

    // Then: Only the first call reached the provider or spent a token
    assert_eq!(cached.symbol, "AAPL");
    assert_eq!(transport.call_count(), 1);
    assert_eq!(client.limiter_status().tokens, 9.0);

    // And: Refresh mode goes back upstream
    let options = RequestOptions::default().with_cache_mode(CacheMode::Refresh);
    client.quote_with("AAPL", &options).await.expect("refresh call");
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_not_found_answers_are_never_cached() {
    let mut config = test_config();
    config.cache_ttl = Duration::from_secs(60);
    let (client, transport) = client_with(config, ScriptedHttpClient::always(ok("[]")));

    client.quote("BADSYM").await.expect_err("not found");
    client.quote("BADSYM").await.expect_err("still not found");

    assert_eq!(transport.call_count(), 2);
    assert!(client.cache().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn when_call_is_cancelled_while_waiting_for_admission_no_token_is_consumed() {
    // Given: An empty bucket refilling at one token every 10 seconds
    let mut config = test_config();
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_rate = 0.1;
    let (client, transport) = client_with(config, ScriptedHttpClient::always(ok(AAPL_QUOTE)));
    client.quote("AAPL").await.expect("first call drains the bucket");

    // When: A second call is cancelled while it waits
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let options = RequestOptions::default().with_cancellation(cancel);
    let error = client.quote_with("MSFT", &options).await.expect_err("cancelled");

    // Then: Cancelled with zero attempts, and the next refill is still there
    assert!(matches!(error, GatewayError::Cancelled { attempts: 0, .. }));
    assert_eq!(transport.call_count(), 1);

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(client.limiter_status().tokens, 1.0);
}

#[tokio::test(start_paused = true)]
async fn when_call_is_cancelled_during_backoff_attempts_so_far_are_reported() {
    let (client, transport) = client_with(
        test_config(),
        ScriptedHttpClient::always(status(502, "Bad Gateway")),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        trigger.cancel();
    });

    let options = RequestOptions::default().with_cancellation(cancel);
    let error = client.quote_with("AAPL", &options).await.expect_err("cancelled");

    // Attempt 1 at t=0, attempt 2 at t=1s, cancelled during the 2s wait.
    assert!(matches!(error, GatewayError::Cancelled { attempts: 2, .. }));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn when_call_is_cancelled_during_an_attempt_the_spent_token_is_not_refunded() {
    // Given: A single-token bucket and a provider that takes 5s to answer
    let mut config = test_config();
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_rate = 0.1;
    let (client, transport) = client_with(
        config,
        ScriptedHttpClient::always(ok(AAPL_QUOTE)).with_latency(Duration::from_secs(5)),
    );

    // When: The caller cancels one second into the first attempt
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });
    let options = RequestOptions::default().with_cancellation(cancel);
    let error = client.quote_with("AAPL", &options).await.expect_err("cancelled");

    // Then: One attempt is reported, one request went out, the token stays spent
    assert!(matches!(error, GatewayError::Cancelled { attempts: 1, .. }));
    assert_eq!(error.code(), "gateway.cancelled");
    assert_eq!(transport.call_count(), 1);
    assert_eq!(client.limiter_status().tokens, 0.0);
}
