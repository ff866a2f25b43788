//! End-to-end research workflow runs against a scripted generation service

use std::sync::Arc;

use rig_research::grounding::SHORT_REFERENCE_PREFIX;
use rig_research::llm::{OutputSchema, ScriptedService};
use rig_research::{
    GroundingChunk, GroundingMetadata, GroundingSupport, ProviderError, ResearchAgent,
    ResearchConfig, ResearchRequest, Role, RunContext, WorkflowError,
};

const PARIS_URL: &str = "https://en.wikipedia.org/wiki/Paris";
const LYON_URL: &str = "https://en.wikipedia.org/wiki/Lyon";

fn short_ref(round: usize, position: usize) -> String {
    format!("{SHORT_REFERENCE_PREFIX}{round}-{position}")
}

fn queries_reply(queries: &[&str]) -> String {
    let items: Vec<serde_json::Value> = queries
        .iter()
        .map(|q| serde_json::json!({ "query": q, "rationale": "relevant" }))
        .collect();
    serde_json::json!({ "query": items }).to_string()
}

fn reflection_reply(sufficient: bool, follow_ups: &[&str]) -> String {
    serde_json::json!({
        "is_sufficient": sufficient,
        "knowledge_gap": if sufficient { "" } else { "needs more detail" },
        "follow_up_queries": follow_ups,
    })
    .to_string()
}

fn grounded(uri: &str, title: &str, text_len: usize) -> GroundingMetadata {
    GroundingMetadata::new(
        vec![GroundingChunk::new(uri, title)],
        vec![GroundingSupport::new(0, text_len, vec![0])],
    )
}

fn agent(service: Arc<ScriptedService>) -> ResearchAgent {
    ResearchAgent::new(ResearchConfig::default(), service).unwrap()
}

#[tokio::test]
async fn test_capital_of_france_end_to_end() {
    let search_text = "Paris is the capital of France.";
    let service = Arc::new(
        ScriptedService::new()
            .push_text(queries_reply(&["capital of France", "France seat of government"]))
            .push_grounded(search_text, grounded(PARIS_URL, "wikipedia.org", search_text.len()))
            .push_text("The French government sits in Paris.")
            .push_text(reflection_reply(true, &[]))
            .push_text(format!(
                "The capital of France is Paris [wikipedia]({}).",
                short_ref(0, 0)
            )),
    );

    let state = agent(service.clone())
        .invoke(
            &RunContext::new(),
            ResearchRequest::question("What is the capital of France?"),
        )
        .await
        .unwrap();

    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].role, Role::Assistant);
    assert_eq!(
        state.messages[0].content,
        format!("The capital of France is Paris [wikipedia]({PARIS_URL}).")
    );
    assert!(!state.messages[0].content.contains(SHORT_REFERENCE_PREFIX));
    assert_eq!(state.sources_gathered.len(), 1);
    assert_eq!(state.sources_gathered[0].value, PARIS_URL);
    assert_eq!(state.sources_gathered[0].link_id, "0");
    assert_eq!(state.research_loop_count, 1);
    assert_eq!(state.number_of_ran_queries, 2);
    assert_eq!(
        state.web_research_results,
        vec![
            format!("{search_text} [wikipedia]({})", short_ref(0, 0)),
            "The French government sits in Paris.".to_string(),
        ]
    );

    let requests = service.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(requests[0].options.schema, Some(OutputSchema::SearchQueryList));
    assert!(requests[1].options.search_tool);
    assert!(requests[2].options.search_tool);
    assert!(requests[2].prompt.contains("\"France seat of government\""));
    assert_eq!(requests[3].options.schema, Some(OutputSchema::Reflection));
    assert_eq!(requests[4].options.schema, None);
    assert_eq!(service.remaining(), 0);
}

#[tokio::test]
async fn test_same_source_from_two_queries_is_deduplicated() {
    let first = "Paris is the capital.";
    let second = "Paris hosts the government.";
    let service = Arc::new(
        ScriptedService::new()
            .push_text(queries_reply(&["capital of France", "French government seat"]))
            .push_grounded(first, grounded(PARIS_URL, "wikipedia.org", first.len()))
            .push_grounded(second, grounded(PARIS_URL, "wikipedia.org", second.len()))
            .push_text(reflection_reply(true, &[]))
            .push_text(format!(
                "Paris [w]({}) [w]({}).",
                short_ref(0, 0),
                short_ref(1, 0)
            )),
    );

    let state = agent(service)
        .invoke(
            &RunContext::new(),
            ResearchRequest::question("What is the capital of France?"),
        )
        .await
        .unwrap();

    assert_eq!(state.messages.len(), 1);
    assert_eq!(
        state.messages[0].content,
        format!("Paris [w]({PARIS_URL}) [w]({PARIS_URL}).")
    );
    assert_eq!(state.sources_gathered.len(), 1);
    assert_eq!(state.sources_gathered[0].value, PARIS_URL);
    assert_eq!(state.sources_gathered[0].short_url, short_ref(0, 0));
    assert_eq!(state.sources_gathered[0].link_id, "0");
}

#[tokio::test]
async fn test_loops_back_until_cap() {
    let first = "Paris is the capital.";
    let second = "Lyon is the third largest city.";
    let service = Arc::new(
        ScriptedService::new()
            .push_text(queries_reply(&["capital of France"]))
            .push_grounded(first, grounded(PARIS_URL, "wikipedia.org", first.len()))
            .push_text(reflection_reply(false, &["largest French cities"]))
            .push_grounded(second, grounded(LYON_URL, "wikipedia.org", second.len()))
            // still insufficient, but the loop cap of 2 forces the answer
            .push_text(reflection_reply(false, &["ignored"]))
            .push_text(format!(
                "Paris ({}) and Lyon ({}).",
                short_ref(0, 0),
                short_ref(1, 0)
            )),
    );

    let state = agent(service.clone())
        .invoke(&RunContext::new(), ResearchRequest::question("French cities"))
        .await
        .unwrap();

    assert_eq!(state.research_loop_count, 2);
    assert_eq!(state.messages[0].content, format!("Paris ({PARIS_URL}) and Lyon ({LYON_URL})."));

    let links: Vec<(&str, &str)> = state
        .sources_gathered
        .iter()
        .map(|s| (s.value.as_str(), s.link_id.as_str()))
        .collect();
    assert_eq!(links, vec![(PARIS_URL, "0"), (LYON_URL, "1")]);

    let requests = service.requests();
    assert_eq!(requests.len(), 6);
    assert!(requests[3].prompt.contains("\"largest French cities\""));
    // reflection sees both rounds
    assert!(requests[4].prompt.contains("---"));
    assert_eq!(state.search_queries.len(), 1);
    assert_eq!(state.search_queries[0].text, "largest French cities");
}

#[tokio::test]
async fn test_request_overrides_apply() {
    let service = Arc::new(
        ScriptedService::new()
            .push_text(queries_reply(&["q1"]))
            .push_text("no grounding")
            .push_text(reflection_reply(false, &["more"]))
            .push_text("answer"),
    );

    let state = agent(service.clone())
        .invoke(
            &RunContext::new(),
            ResearchRequest::question("topic")
                .with_reasoning_model("gemini-2.5-pro")
                .with_max_research_loops(1)
                .with_initial_queries(5),
        )
        .await
        .unwrap();

    assert_eq!(state.answer(), Some("answer"));
    assert!(state.sources_gathered.is_empty());

    let requests = service.requests();
    assert!(requests[0].prompt.contains("Don't produce more than 5 queries"));
    assert_eq!(requests[0].options.model, "gemini-2.0-flash");
    assert_eq!(requests[2].options.model, "gemini-2.5-pro");
    assert_eq!(requests[3].options.model, "gemini-2.5-pro");
}

#[tokio::test]
async fn test_iteration_cap_returns_partial_state() {
    let service = Arc::new(
        ScriptedService::new()
            .push_text(queries_reply(&["q1", "q2"]))
            .push_text("r1")
            .push_text("r2"),
    );

    let state = agent(service.clone())
        .invoke(
            &RunContext::new(),
            ResearchRequest::question("topic").with_max_iterations(2),
        )
        .await
        .unwrap();

    assert_eq!(state.web_research_results, vec!["r1", "r2"]);
    assert_eq!(state.research_loop_count, 0);
    assert_eq!(state.answer().map(|a| a.starts_with('{')), Some(true));
    assert_eq!(service.requests().len(), 3);
}

#[tokio::test]
async fn test_provider_failure_keeps_last_good_state() {
    let service = Arc::new(
        ScriptedService::new()
            .push_text(queries_reply(&["q1"]))
            .push_text("r1")
            .push_error(ProviderError::Server(503, "unavailable".to_string())),
    );

    let failure = agent(service)
        .invoke(&RunContext::new(), ResearchRequest::question("topic"))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        WorkflowError::Provider(ProviderError::Server(503, _))
    ));
    assert_eq!(failure.state.web_research_results, vec!["r1"]);
    assert_eq!(failure.state.research_loop_count, 0);
}

#[tokio::test]
async fn test_cancelled_run_fails_fast() {
    let service = Arc::new(ScriptedService::new().push_text(queries_reply(&["q1"])));

    let ctx = RunContext::new();
    ctx.cancel();
    let failure = agent(service.clone())
        .invoke(&ctx, ResearchRequest::question("topic"))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::Cancelled));
    assert_eq!(failure.state.messages.len(), 1);
    assert!(service.requests().is_empty());
}
