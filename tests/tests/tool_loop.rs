use application::agent_service::{AgentService, ToolOutcome, NO_TOOL_FOUND};
use application::toolbox::{default_registry, WEATHER_REPORT};
use domain::model::Completion;
use domain::tool::{Tool, ToolCall};
use domain::turn::Turn;
use presentation::cli::run_tool_loop;
use serde_json::json;
use tests::ScriptedModel;

#[test]
fn weather_dispatch_ignores_case_and_city() {
    let registry = default_registry();
    let lower = registry.lookup("get_weather").unwrap();
    let upper = registry.lookup("GET_WEATHER").unwrap();
    assert_eq!(lower.name(), upper.name());

    for city in ["Nairobi", "Reykjavik", ""] {
        let call = ToolCall::new("w", "GET_WEATHER", json!({ "city": city }));
        assert_eq!(registry.invoke(&call).unwrap(), WEATHER_REPORT);
    }
}

#[tokio::test]
async fn two_plus_two_goes_through_the_multiply_tool() {
    let model = ScriptedModel::with_completions(vec![
        Completion::calls(vec![ToolCall::new(
            "call_0",
            "multiply",
            json!({"a": 2, "b": 2}),
        )]),
        Completion::text("2 plus 2 is 4."),
    ]);
    let mut agent = AgentService::new(model.clone(), default_registry());

    let reply = agent.ask("What's 2 plus 2?").await.unwrap().unwrap();

    assert_eq!(reply.answer, "2 plus 2 is 4.");
    assert_eq!(
        reply.tool_events[0].outcome,
        ToolOutcome::Completed("4".to_string())
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].turns, vec![Turn::user("What's 2 plus 2?")]);
    let mut names: Vec<_> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["get_weather", "multiply"]);

    let final_turns = &requests[1].turns;
    assert_eq!(
        final_turns.last(),
        Some(&Turn::tool_result("call_0", "multiply", "4"))
    );
}

#[tokio::test]
async fn unknown_tool_is_recorded_and_loop_reaches_final_answer() {
    let model = ScriptedModel::with_completions(vec![
        Completion::calls(vec![ToolCall::new("call_7", "teleport", json!({}))]),
        Completion::text("I could not do that."),
    ]);
    let mut agent = AgentService::new(model.clone(), default_registry());

    let reply = agent.ask("Beam me up").await.unwrap().unwrap();

    assert_eq!(reply.answer, "I could not do that.");
    assert!(matches!(reply.tool_events[0].outcome, ToolOutcome::Failed(_)));
    assert_eq!(model.requests().len(), 2);
    assert!(agent
        .messages()
        .contains(&Turn::tool_result("call_7", "teleport", NO_TOOL_FOUND)));
}

#[tokio::test]
async fn mixed_calls_keep_results_attached_to_their_ids() {
    let model = ScriptedModel::with_completions(vec![
        Completion::calls(vec![
            ToolCall::new("first", "get_weather", json!({"city": "Rome"})),
            ToolCall::new("second", "nope", json!({})),
            ToolCall::new("third", "Multiply", json!({"a": 10, "b": 5})),
        ]),
        Completion::text("Done."),
    ]);
    let mut agent = AgentService::new(model, default_registry());
    agent.ask("several things").await.unwrap();

    let results: Vec<Turn> = agent
        .messages()
        .iter()
        .filter(|t| matches!(t, Turn::ToolResult { .. }))
        .cloned()
        .collect();
    assert_eq!(
        results,
        vec![
            Turn::tool_result("first", "get_weather", WEATHER_REPORT),
            Turn::tool_result("second", "nope", NO_TOOL_FOUND),
            Turn::tool_result("third", "Multiply", "15"),
        ]
    );
}

#[tokio::test]
async fn history_carries_across_questions() {
    let model = ScriptedModel::with_completions(vec![
        Completion::text("Hello Sam."),
        Completion::text("Your name is Sam."),
    ]);
    let mut agent = AgentService::new(model.clone(), default_registry());
    agent.ask("I am Sam").await.unwrap();
    agent.ask("Who am I?").await.unwrap();

    assert_eq!(
        model.requests()[1].turns,
        vec![
            Turn::user("I am Sam"),
            Turn::assistant("Hello Sam."),
            Turn::user("Who am I?"),
        ]
    );
}

#[tokio::test]
async fn repl_prints_tool_trace_and_answer() {
    colored::control::set_override(false);
    let model = ScriptedModel::with_completions(vec![
        Completion::calls(vec![ToolCall::new("c", "multiply", json!({"a": 2, "b": 2}))]),
        Completion::text("The answer is 4."),
    ]);
    let mut agent = AgentService::new(model.clone(), default_registry());
    let mut questions = vec![
        Some("What's 2 plus 2?".to_string()),
        Some("".to_string()),
        Some("and again?".to_string()),
        None,
    ]
    .into_iter();

    let mut out = Vec::new();
    run_tool_loop(&mut agent, || Ok(questions.next().flatten()), &mut out)
        .await
        .unwrap();
    let printed = String::from_utf8(out).unwrap();

    assert!(printed.contains("multiply {\"a\":2,\"b\":2} -> 4"));
    assert!(printed.contains("AI: The answer is 4."));
    // The third question finds the script empty; the error is shown, not fatal.
    assert!(printed.contains("Error: no scripted completion left"));
    assert_eq!(model.requests().len(), 3);
}

#[tokio::test]
async fn overflowing_multiply_is_recorded_as_failure() {
    let model = ScriptedModel::with_completions(vec![
        Completion::calls(vec![ToolCall::new(
            "big",
            "multiply",
            json!({"a": i64::MAX, "b": 1}),
        )]),
        Completion::text("That number is too large."),
    ]);
    let mut agent = AgentService::new(model.clone(), default_registry());

    let reply = agent.ask("What's a huge number plus 1?").await.unwrap().unwrap();

    assert_eq!(reply.answer, "That number is too large.");
    assert!(matches!(reply.tool_events[0].outcome, ToolOutcome::Failed(_)));
    assert_eq!(
        model.requests()[1].turns.last(),
        Some(&Turn::tool_result("big", "multiply", NO_TOOL_FOUND))
    );
}
