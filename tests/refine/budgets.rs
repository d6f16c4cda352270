use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use iris_refine::observability::ObserverEvent;
use iris_refine::{EnhanceOptions, Mode, RefineConfig, StopReason};

use crate::refine_harness::{
    CountingProvider, RecordingObserver, SlowProvider, TableScorer, controller_observed,
    controller_with, ctx,
};

const QUERY: &str = "How do I configure logging for a tokio service?";
const SLACK: Duration = Duration::from_millis(750);

fn slow(delay: Duration) -> Arc<SlowProvider> {
    Arc::new(SlowProvider {
        delay,
        candidate: "late answer".to_string(),
    })
}

fn ladder() -> Arc<TableScorer> {
    Arc::new(TableScorer::new(&[
        ("draft", 0.10),
        ("v-1", 0.30),
        ("v-2", 0.50),
        ("v-3", 0.70),
        ("v-4", 0.90),
        ("late answer", 0.99),
    ]))
}

#[tokio::test]
async fn step_budget_stops_after_max_steps() {
    let config = RefineConfig::default();
    let provider = Arc::new(CountingProvider::new("v"));
    let controller = controller_with(&config, ladder(), provider.clone());

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Fast).await;

    assert_eq!(result.stop_reason, StopReason::MaxStepsReached);
    assert_eq!(result.steps_taken, 2);
    assert_eq!(provider.calls(), 2);
    assert_eq!(result.final_response, "v-2");
}

#[tokio::test]
async fn tool_call_cap_bounds_provider_calls() {
    let mut config = RefineConfig::default();
    config.modes.normal.tool_call_cap = 1;
    let provider = Arc::new(CountingProvider::new("v"));
    let controller = controller_with(&config, ladder(), provider.clone());

    let result = controller
        .enhance("draft", QUERY, &ctx(QUERY), Mode::Normal)
        .await;

    assert_eq!(result.stop_reason, StopReason::MaxStepsReached);
    assert_eq!(result.provider_calls, 1);
    assert_eq!(result.steps_taken, 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn slow_provider_hits_latency_budget() {
    let mut config = RefineConfig::default();
    config.modes.fast.max_latency_ms = 50;
    let controller = controller_with(&config, ladder(), slow(Duration::from_secs(5)));

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Fast).await;

    assert_eq!(result.stop_reason, StopReason::Timeout);
    assert_eq!(result.steps_taken, 0);
    assert_eq!(result.final_response, "draft");
    assert!(
        result.elapsed < Duration::from_millis(50) + SLACK,
        "elapsed {:?}",
        result.elapsed
    );
}

#[tokio::test]
async fn caller_deadline_tighter_than_budget_wins() {
    let config = RefineConfig::default();
    let controller = controller_with(&config, ladder(), slow(Duration::from_secs(5)));
    let opts = EnhanceOptions::default().with_deadline(Instant::now() + Duration::from_millis(40));

    let result = controller
        .enhance_with("draft", QUERY, &ctx(QUERY), Mode::Deep, opts)
        .await;

    assert_eq!(result.stop_reason, StopReason::Timeout);
    assert!(result.elapsed < Duration::from_millis(40) + SLACK);
}

#[tokio::test]
async fn expired_deadline_skips_provider() {
    let config = RefineConfig::default();
    let provider = Arc::new(CountingProvider::new("v"));
    let controller = controller_with(&config, ladder(), provider.clone());
    let opts = EnhanceOptions::default().with_deadline(Instant::now());

    let result = controller
        .enhance_with("draft", QUERY, &ctx(QUERY), Mode::Normal, opts)
        .await;

    assert_eq!(result.stop_reason, StopReason::Timeout);
    assert_eq!(result.provider_calls, 0);
    assert_eq!(provider.calls(), 0);
    assert_eq!(result.final_response, "draft");
}

#[tokio::test]
async fn cancellation_interrupts_pending_call() {
    let config = RefineConfig::default();
    let controller = controller_with(&config, ladder(), slow(Duration::from_secs(10)));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let result = controller
        .enhance_with(
            "draft",
            QUERY,
            &ctx(QUERY),
            Mode::Deep,
            EnhanceOptions::default().with_cancel(token),
        )
        .await;

    assert_eq!(result.stop_reason, StopReason::Timeout);
    assert_eq!(result.final_response, "draft");
    assert!(result.elapsed < Duration::from_millis(30) + SLACK);
}

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() {
    let config = RefineConfig::default();
    let provider = Arc::new(CountingProvider::new("v"));
    let controller = controller_with(&config, ladder(), provider.clone());
    let token = CancellationToken::new();
    token.cancel();

    let result = controller
        .enhance_with(
            "draft",
            QUERY,
            &ctx(QUERY),
            Mode::Normal,
            EnhanceOptions::default().with_cancel(token),
        )
        .await;

    assert_eq!(result.stop_reason, StopReason::Timeout);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn provider_timeout_is_reported_to_observer() {
    let mut config = RefineConfig::default();
    config.modes.normal.max_latency_ms = 40;
    let observer = Arc::new(RecordingObserver::default());
    let controller =
        controller_observed(&config, ladder(), slow(Duration::from_secs(5)), observer.clone());

    let result = controller
        .enhance("draft", QUERY, &ctx(QUERY), Mode::Normal)
        .await;

    assert_eq!(result.stop_reason, StopReason::Timeout);
    assert!(observer.events().iter().any(|e| matches!(
        e,
        ObserverEvent::ProviderFailed { timed_out: true, message, .. } if message.contains("budget")
    )));
}
