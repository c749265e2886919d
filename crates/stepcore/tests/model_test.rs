// crates/stepcore/tests/model_test.rs

use stepcore::{
    ActionError, ExecutionEvent, GatewayConfig, StepError, StepFailure, StepOutput, StepSpec,
    Value, WorkflowDef, WorkflowResult,
};
use chrono::Utc;
use uuid::Uuid;

#[test]
fn test_step_failure_names_step_and_cause() {
    let failure = StepFailure::new(
        "Chaincode install",
        ActionError::ExecutionFailed("peer exited with 1".to_string()),
    );

    assert_eq!(
        failure.to_string(),
        "step 'Chaincode install' failed: Execution failed: peer exited with 1"
    );
    let source = std::error::Error::source(&failure).map(|e| e.to_string());
    assert_eq!(source.as_deref(), Some("Execution failed: peer exited with 1"));
}

#[test]
fn test_result_exit_codes_and_conversion() {
    let success = WorkflowResult::Success(StepOutput::new().with_output("value", "ok"));
    let failure = WorkflowResult::Failure(StepFailure::new("query", ActionError::Timeout { millis: 50 }));

    assert_eq!(success.exit_code(), 0);
    assert_eq!(failure.exit_code(), 1);
    assert!(success.failure().is_none());
    assert_eq!(failure.failure().map(|f| f.step.as_str()), Some("query"));

    let converted: Result<StepOutput, StepFailure> = failure.into_result();
    assert_eq!(converted.unwrap_err().error, ActionError::Timeout { millis: 50 });
}

#[test]
fn test_definition_round_trips_through_json() {
    let mut workflow = WorkflowDef::new("credit scenario").with_description("trade then query");
    workflow.settings.gateway = Some(GatewayConfig::default());
    workflow.add_step(
        StepSpec::new("acceptTrade", "gateway.invoke")
            .with_config("args", vec!["2ks89j9"])
            .with_timeout(30_000),
    );
    workflow.add_step(StepSpec::new("getTradeStatus", "gateway.query").terminal());

    let json = serde_json::to_string(&workflow).unwrap();
    let loaded: WorkflowDef = serde_json::from_str(&json).unwrap();

    assert_eq!(loaded.id, workflow.id);
    assert_eq!(loaded.settings.gateway, Some(GatewayConfig::default()));
    let accept = loaded.find_step("acceptTrade").unwrap();
    assert_eq!(accept.timeout_ms, Some(30_000));
    assert_eq!(accept.config.get("args"), Some(&Value::Array(vec![Value::from("2ks89j9")])));
    assert!(loaded.find_step("getTradeStatus").unwrap().terminal);
}

#[test]
fn test_minimal_definition_gets_defaults() {
    let loaded: WorkflowDef = serde_json::from_str(
        r#"{"name": "query", "steps": [{"name": "list", "action_type": "gateway.query"}]}"#,
    )
    .unwrap();

    assert!(loaded.description.is_none());
    assert!(loaded.settings.gateway.is_none());
    assert!(!loaded.steps[0].terminal);
    assert!(loaded.steps[0].config.is_empty());
}

#[test]
fn test_events_serialize_with_type_tag() {
    let event = ExecutionEvent::StepFailed {
        execution_id: Uuid::new_v4(),
        index: 1,
        name: "Channel join".to_string(),
        error: "External system error: timeout".to_string(),
        timestamp: Utc::now(),
    };

    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "StepFailed");
    assert_eq!(json["name"], "Channel join");
}

#[test]
fn test_load_reads_definition_file() {
    let mut workflow = WorkflowDef::new("provision");
    workflow.add_step(StepSpec::new("Channel creation", "shell.exec").with_config("command", "peer"));
    let path = std::env::temp_dir().join(format!("steprun-def-{}.json", Uuid::new_v4()));
    std::fs::write(&path, workflow.to_json_pretty().unwrap()).unwrap();

    let loaded = WorkflowDef::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.id, workflow.id);
    assert_eq!(loaded.steps[0].name, "Channel creation");
}

#[test]
fn test_load_errors_distinguish_io_from_parse() {
    let missing = std::env::temp_dir().join(format!("steprun-missing-{}.json", Uuid::new_v4()));
    assert!(matches!(WorkflowDef::load(&missing), Err(StepError::Io(_))));

    assert!(matches!(
        WorkflowDef::from_json(r#"{"name": "no steps field"}"#),
        Err(StepError::Serialization(_))
    ));
}
