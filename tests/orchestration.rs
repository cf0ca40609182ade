mod common;

use serde_json::json;
use std::sync::Arc;

use common::*;
use tripmate::agent::ITERATION_LIMIT_REPLY;
use tripmate::tools::builtins::HotelSearch;
use tripmate::types::{Role, ToolCall};
use tripmate::{AgentError, LoopState};

#[tokio::test]
async fn weather_question_runs_one_tool_round_trip() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request("call_1", "getWeather", json!(r#"{"location":"Paris"}"#)),
        final_text("It's clear in Paris right now, 18°C with light wind."),
    ]));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model.clone(), lookups.clone(), 10);

    let exchange = agent.chat("What's the weather in Paris?").await.unwrap();

    assert_eq!(exchange.state, LoopState::ModelFinal);
    assert!(exchange.completed());
    assert!(exchange.reply.contains("18°C"));
    assert_eq!(exchange.round_trips, 2);
    assert_eq!(lookups.calls(), vec!["weather:Paris"]);

    let roles: Vec<Role> = exchange.conversation.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );

    let messages = exchange.conversation.messages();
    assert_eq!(messages[2].tool_call_request().map(|c| c.id.as_str()), Some("call_1"));
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));

    let tool_result = content_json(&messages[3]);
    assert_eq!(tool_result["condition"], "Clear");
    assert_eq!(tool_result["temperature"], "18°C");

    // 第二次调用模型时已经能看到工具结果
    let second = model.seen(1);
    assert_eq!(second.len(), 4);
    assert_eq!(second[3].role, Role::Tool);
}

#[tokio::test]
async fn hotel_failure_is_reported_to_the_model() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request(
            "call_h",
            "getHotels",
            json!({"location": "Atlantis", "fromDate": "2025-03-01", "toDate": "2025-03-04", "travellers": 2}),
        ),
        final_text("Sorry, I couldn't find Atlantis. Could you pick another destination?"),
    ]));
    let mut fake = FakeLookups::new();
    fake.hotels = Ok(HotelSearch {
        location: "Atlantis".to_string(),
        from_date: "2025-03-01".to_string(),
        to_date: "2025-03-04".to_string(),
        travellers: 2,
        hotels: Vec::new(),
        error: Some("Destination not found for location: Atlantis".to_string()),
    });
    let lookups = Arc::new(fake);
    let agent = agent_with(model.clone(), lookups, 10);

    let exchange = agent.chat("Find me a hotel in Atlantis").await.unwrap();

    let messages = exchange.conversation.messages();
    let tools = tool_messages(messages);
    assert_eq!(tools.len(), 1);
    assert_eq!(
        content_json(tools[0])["error"],
        "Destination not found for location: Atlantis"
    );

    // 循环继续回到模型，而不是中止
    assert_eq!(model.calls(), 2);
    assert_eq!(exchange.state, LoopState::ModelFinal);
}

#[tokio::test]
async fn lookup_errors_are_captured_as_failures() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request(
            "call_h",
            "getHotels",
            json!({"location": "Goa", "fromDate": "2025-03-01", "toDate": "2025-03-04", "travellers": 1}),
        ),
        final_text("The hotel service is down, sorry."),
    ]));
    let mut fake = FakeLookups::new();
    fake.hotels = Err("upstream timed out".to_string());
    let agent = agent_with(model, Arc::new(fake), 10);

    let exchange = agent.chat("Hotels in Goa").await.unwrap();

    let tools = tool_messages(exchange.conversation.messages());
    assert_eq!(content_json(tools[0])["error"], "upstream timed out");
    assert_eq!(exchange.state, LoopState::ModelFinal);
}

#[tokio::test]
async fn unknown_function_does_not_crash_the_exchange() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request("call_b", "bookFlight", json!({"flight": "AI101"})),
        final_text("I can't book flights, but I can search for them."),
    ]));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model, lookups.clone(), 10);

    let exchange = agent.chat("Book me a flight").await.unwrap();

    let tools = tool_messages(exchange.conversation.messages());
    assert_eq!(tools.len(), 1);
    assert_eq!(content_json(tools[0])["error"], "function not available");
    assert!(lookups.calls().is_empty());
    assert_eq!(exchange.state, LoopState::ModelFinal);
}

#[tokio::test]
async fn endless_tool_requests_hit_the_iteration_ceiling() {
    let model = Arc::new(ScriptedModel::repeating(tool_request(
        "call_w",
        "getWeather",
        json!({"location": "Paris"}),
    )));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model.clone(), lookups.clone(), 10);

    let exchange = agent.chat("Keep checking the weather").await.unwrap();

    assert_eq!(exchange.state, LoopState::Aborted);
    assert_eq!(exchange.reply, ITERATION_LIMIT_REPLY);
    assert_eq!(model.calls(), 10);
    assert_eq!(exchange.round_trips, 10);
    assert_eq!(lookups.calls().len(), 10);

    let messages = exchange.conversation.messages();
    assert_eq!(tool_messages(messages).len(), 10);
    assert_eq!(messages.last().map(|m| m.text()), Some(ITERATION_LIMIT_REPLY));
    assert!(!exchange.conversation.has_pending_call());
}

#[tokio::test]
async fn loop_always_terminates_within_the_ceiling() {
    for ceiling in 0..5 {
        let model = Arc::new(ScriptedModel::repeating(tool_request(
            "call_f",
            "getFlights",
            json!({"fromCity": "Delhi", "toCity": "Mumbai", "date": "2025-05-01"}),
        )));
        let agent = agent_with(model.clone(), Arc::new(FakeLookups::new()), ceiling);

        let exchange = agent.chat("flights please").await.unwrap();

        assert!(exchange.state.is_terminal());
        assert_eq!(exchange.state, LoopState::Aborted);
        assert_eq!(model.calls(), ceiling);
    }
}

#[tokio::test]
async fn only_the_first_of_several_tool_calls_is_dispatched() {
    let model = Arc::new(ScriptedModel::new(vec![
        multi_tool_request(vec![
            ToolCall::new("call_1", "getWeather", json!({"location": "Paris"})),
            ToolCall::new(
                "call_2",
                "getFlights",
                json!({"fromCity": "London", "toCity": "Paris", "date": "2025-05-01"}),
            ),
        ]),
        final_text("Paris is clear today."),
    ]));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model.clone(), lookups.clone(), 10);

    let exchange = agent.chat("Weather and flights for Paris").await.unwrap();

    let messages = exchange.conversation.messages();
    let tools = tool_messages(messages);
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(lookups.calls(), vec!["weather:Paris"]);

    let request = &messages[2];
    assert_eq!(request.tool_calls.as_ref().map(|c| c.len()), Some(1));
    assert_eq!(exchange.state, LoopState::ModelFinal);
}

#[tokio::test]
async fn unparseable_arguments_become_a_tool_failure() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request("call_p", "getWeather", json!("{location: Paris")),
        final_text("Let me try that again later."),
    ]));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model, lookups.clone(), 10);

    let exchange = agent.chat("weather?").await.unwrap();

    let tools = tool_messages(exchange.conversation.messages());
    let error = content_json(tools[0])["error"].as_str().unwrap_or_default().to_string();
    assert!(error.starts_with("could not parse arguments for getWeather"));
    assert!(lookups.calls().is_empty());
    assert_eq!(exchange.state, LoopState::ModelFinal);
}

#[tokio::test]
async fn schema_violations_name_the_parameter() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request("call_f", "getFlights", json!({"fromCity": "Delhi", "date": "2025-05-01"})),
        final_text("Where would you like to fly to?"),
    ]));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model, lookups.clone(), 10);

    let exchange = agent.chat("flight from Delhi").await.unwrap();

    let tools = tool_messages(exchange.conversation.messages());
    let error = content_json(tools[0])["error"].as_str().unwrap_or_default().to_string();
    assert!(error.contains("`toCity`"));
    assert!(lookups.calls().is_empty());
}

#[tokio::test]
async fn missing_call_id_is_generated() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_request("", "getWeather", json!({"location": "Paris"})),
        final_text("Clear skies."),
    ]));
    let agent = agent_with(model, Arc::new(FakeLookups::new()), 10);

    let exchange = agent.chat("weather?").await.unwrap();

    let messages = exchange.conversation.messages();
    let call_id = messages[2].tool_call_request().map(|c| c.id.clone()).unwrap_or_default();
    assert!(call_id.starts_with("call_"));
    assert_eq!(messages[3].tool_call_id.as_deref(), Some(call_id.as_str()));
}

#[tokio::test]
async fn reasoning_service_failure_is_fatal() {
    let model = Arc::new(ScriptedModel::failing());
    let agent = agent_with(model.clone(), Arc::new(FakeLookups::new()), 10);

    let err = agent.chat("hello").await.unwrap_err();

    assert!(matches!(err, AgentError::ReasoningService(_)));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn direct_answer_needs_no_tools() {
    let model = Arc::new(ScriptedModel::new(vec![final_text("Hello! Where would you like to go?")]));
    let lookups = Arc::new(FakeLookups::new());
    let agent = agent_with(model.clone(), lookups.clone(), 10);

    let reply = agent.ask("hi").await.unwrap();

    assert_eq!(reply, "Hello! Where would you like to go?");
    assert_eq!(model.calls(), 1);
    assert!(lookups.calls().is_empty());

    let first = model.seen(0);
    assert_eq!(first[0].role, Role::System);
    assert_eq!(first[0].text(), "You are a helpful travel assistant.");
    assert_eq!(first[1].text(), "hi");
}

#[tokio::test]
async fn dispatcher_maps_flight_results() {
    use tripmate::tools::builtins::FlightSearch;
    use tripmate::tools::{ToolExecutor, ToolOutcome};

    let args = json!({"fromCity": "Delhi", "toCity": "Atlantis", "date": "2025-05-01"});

    let mut fake = FakeLookups::new();
    fake.flights = FlightSearch::Error {
        error: "Could not resolve skyIds for given cities.".to_string(),
    };
    let executor = ToolExecutor::new(Arc::new(fake));
    assert_eq!(
        executor.execute("getFlights", &args).await,
        ToolOutcome::Failure("Could not resolve skyIds for given cities.".to_string())
    );

    let executor = ToolExecutor::new(Arc::new(FakeLookups::new()));
    assert_eq!(
        executor.execute("getFlights", &args).await,
        ToolOutcome::Success(json!({"message": "No flights found."}))
    );
}
