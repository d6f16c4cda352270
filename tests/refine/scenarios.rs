use std::sync::Arc;

use iris_refine::refine::{NoopProvider, ScriptedProvider};
use iris_refine::{
    FeatureScorer, Mode, PolicyCategory, RefineConfig, ReflectionController, StopReason,
};

use crate::refine_harness::{
    CountingProvider, TableScorer, builtin_catalog, controller_with, ctx,
};

const QUERY: &str = "How do I sort a vector of structs by a field in Rust?";

#[tokio::test]
async fn high_scoring_draft_rejects_worse_candidate() {
    let config = RefineConfig::default();
    let scorer = Arc::new(TableScorer::new(&[("ORIGINAL", 0.95), ("CANDIDATE", 0.93)]));
    let provider = Arc::new(ScriptedProvider::new(["CANDIDATE"]));
    let controller = controller_with(&config, scorer, provider.clone());

    let result = controller
        .enhance("ORIGINAL", QUERY, &ctx(QUERY), Mode::Fast)
        .await;

    assert_eq!(result.stop_reason, StopReason::InsufficientImprovement);
    assert_eq!(result.steps_taken, 0);
    assert_eq!(result.provider_calls, 1);
    assert_eq!(result.final_response, "ORIGINAL");
    assert!(result.trace.is_empty());
    assert!(result.improvement_delta.abs() < f64::EPSILON);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn gain_below_epsilon_is_not_accepted() {
    let config = RefineConfig::default();
    // FAST epsilon is 0.05; +0.04 is an improvement, but not enough of one.
    let scorer = Arc::new(TableScorer::new(&[("draft", 0.60), ("slightly better", 0.64)]));
    let provider = Arc::new(ScriptedProvider::new(["slightly better"]));
    let controller = controller_with(&config, scorer, provider);

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Fast).await;

    assert_eq!(result.stop_reason, StopReason::InsufficientImprovement);
    assert_eq!(result.final_response, "draft");
}

#[tokio::test]
async fn same_gain_is_accepted_under_deep_epsilon() {
    let config = RefineConfig::default();
    let scorer = Arc::new(TableScorer::new(&[("draft", 0.60), ("slightly better", 0.64)]));
    let provider = Arc::new(ScriptedProvider::new(["slightly better"]));
    let controller = controller_with(&config, scorer, provider);

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Deep).await;

    assert_eq!(result.stop_reason, StopReason::Completed);
    assert_eq!(result.steps_taken, 1);
    assert_eq!(result.final_response, "slightly better");
}

#[tokio::test]
async fn accepted_steps_are_monotonic() {
    let config = RefineConfig::default();
    let scorer = Arc::new(TableScorer::new(&[
        ("draft", 0.30),
        ("v1", 0.40),
        ("v2", 0.55),
        ("v3", 0.70),
    ]));
    let provider = Arc::new(ScriptedProvider::new(["v1", "v2", "v3"]));
    let controller = controller_with(&config, scorer, provider);

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Deep).await;

    assert_eq!(result.stop_reason, StopReason::Completed);
    assert_eq!(result.steps_taken, 3);
    assert_eq!(result.provider_calls, 4);
    assert_eq!(result.final_response, "v3");

    let epsilon = config.engine_config(Mode::Deep).improvement_epsilon;
    let mut previous = result.original_score.as_ref().unwrap().total;
    for (i, step) in result.trace.iter().enumerate() {
        assert_eq!(step.step_index, i + 1);
        assert!(step.delta >= epsilon, "step {i} delta {}", step.delta);
        assert!(step.proposed_score > previous);
        previous = step.proposed_score;
    }
    assert!(result
        .trace
        .windows(2)
        .all(|w| w[0].elapsed_at_step <= w[1].elapsed_at_step));
    assert!((result.improvement_delta - 0.40).abs() < 1e-9);
}

#[tokio::test]
async fn provider_receives_weakest_dimension_diagnosis() {
    let config = RefineConfig::default();
    let scorer = Arc::new(TableScorer::new(&[("draft", 0.30), ("v-1", 0.90)]));
    let provider = Arc::new(CountingProvider::new("v"));
    let controller = controller_with(&config, scorer, provider.clone());

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Normal).await;

    let diagnoses = provider.diagnoses();
    assert_eq!(diagnoses[0].step, 1);
    assert!((diagnoses[0].total - 0.30).abs() < 1e-9);
    assert_eq!(diagnoses[0].suggestions, vec!["improve_relevance".to_string()]);
    // v-2 falls back to 0.5, below the accepted v-1.
    assert_eq!(diagnoses[1].step, 2);
    assert!((diagnoses[1].total - 0.90).abs() < 1e-9);
    assert_eq!(result.stop_reason, StopReason::InsufficientImprovement);
    assert_eq!(result.final_response, "v-1");
}

#[tokio::test]
async fn architecture_query_gets_canned_reply_without_refinement() {
    let query = "How does the internal framework module work?";
    let provider = Arc::new(CountingProvider::new("never"));
    let controller =
        ReflectionController::from_config(&RefineConfig::default(), provider.clone()).unwrap();

    assert_eq!(
        controller.filter().should_use_policy_response(query),
        (true, Some(PolicyCategory::Architecture))
    );

    let result = controller
        .enhance("Here is how it works...", query, &ctx(query), Mode::Deep)
        .await;

    assert_eq!(result.stop_reason, StopReason::PolicyResponse);
    assert_eq!(result.steps_taken, 0);
    assert_eq!(result.provider_calls, 0);
    assert_eq!(provider.calls(), 0);
    assert_eq!(
        result.final_response,
        controller
            .filter()
            .policy_reply(Some(PolicyCategory::Architecture), "en")
    );
    assert!(result.original_score.is_none());
}

#[test]
fn restricted_token_floors_safety_and_total() {
    let config = RefineConfig::default();
    let scorer = FeatureScorer::new(builtin_catalog(), config.scorer.clone());
    let query = "How do I call the weather API?";
    let text = "1. Export the key\n2. Send `Authorization: Bearer YOUR_API_KEY`\n\nFor example:\n```sh\ncurl -H \"Authorization: Bearer YOUR_API_KEY\" https://api.example.com/weather\n```";

    let score = scorer.score(text, query, &ctx(query), &config.weights);
    assert!(score.safety.abs() < f64::EPSILON);
    let w = config.weights;
    let ceiling = (w.sum() - w.safety) / w.sum();
    assert!(score.total <= ceiling + 1e-9, "total {} above {ceiling}", score.total);

    let mut heavy = w;
    heavy.safety = 5.0;
    let heavy_score = scorer.score(text, query, &ctx(query), &heavy);
    assert!(heavy_score.safety.abs() < f64::EPSILON);
    assert!(heavy_score.total < score.total);
}

#[tokio::test]
async fn candidate_with_restricted_token_is_never_accepted() {
    let query = "How do I call the weather API from a shell script?";
    let leaky = "To call the weather API:\n\n1. Set `API=YOUR_API_KEY`\n2. Run the request\n\nFor example:\n```sh\ncurl -H \"X-Key: YOUR_API_KEY\" https://api.example.com/weather\n```";
    let controller = ReflectionController::from_config(
        &RefineConfig::default(),
        Arc::new(ScriptedProvider::new([leaky])),
    )
    .unwrap();

    let result = controller
        .enhance("Use curl.", query, &ctx(query), Mode::Deep)
        .await;

    assert_eq!(result.stop_reason, StopReason::InsufficientImprovement);
    assert_eq!(result.final_response, "Use curl.");
    assert!(!result.final_response.contains("YOUR_API_KEY"));
}

#[tokio::test]
async fn oversized_candidate_is_rejected() {
    let config = RefineConfig::default();
    let huge = "x".repeat(config.engine_config(Mode::Fast).max_output_size + 1);
    let scorer = Arc::new(TableScorer::new(&[("draft", 0.2), (huge.as_str(), 0.99)]));
    let controller = controller_with(&config, scorer, Arc::new(ScriptedProvider::new([huge.clone()])));

    let result = controller.enhance("draft", QUERY, &ctx(QUERY), Mode::Fast).await;

    assert_eq!(result.stop_reason, StopReason::InsufficientImprovement);
    assert_eq!(result.final_response, "draft");
}

#[tokio::test]
async fn noop_provider_returns_draft_with_scores() {
    let controller =
        ReflectionController::from_config(&RefineConfig::default(), Arc::new(NoopProvider))
            .unwrap();

    let result = controller
        .enhance("Use `sort_by_key`.", QUERY, &ctx(QUERY), Mode::Normal)
        .await;

    assert_eq!(result.stop_reason, StopReason::Completed);
    assert_eq!(result.final_response, "Use `sort_by_key`.");
    let original = result.original_score.unwrap();
    let last = result.final_score.unwrap();
    assert!((original.total - last.total).abs() < f64::EPSILON);
    assert!(result.verdict.unwrap().is_safe);
}
