// crates/stepactions/tests/actions_test.rs

use stepactions::{
    DebugAction, DelayAction, GatewayAction, GatewayCall, GatewayRequest, JsonParseAction,
    ShellAction,
};
use stepcore::{
    Action, ActionError, CleanupHandler, EventBus, ExecutionId, GatewayConfig, Step,
    StepContext, StepSpec, Value, WorkflowDef,
};
use stepruntime::{ActionRegistry, RuntimeConfig, StepRuntime, WorkflowRunner};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// Helper function to create a test context
fn create_test_context(
    config: HashMap<String, Value>,
    inputs: HashMap<String, Value>,
) -> StepContext {
    let event_bus = Arc::new(EventBus::new(100));
    let execution_id = ExecutionId::new_v4();

    StepContext {
        execution_id,
        index: 0,
        step_name: "test".to_string(),
        inputs,
        config,
        events: event_bus.create_emitter(execution_id, 0, "test"),
    }
}

fn map(entries: &[(&str, Value)]) -> HashMap<String, Value> {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[tokio::test]
async fn test_debug_prefers_config_message() {
    let ctx = create_test_context(
        map(&[("message", Value::from("CHANNEL CREATION COMPLETE"))]),
        map(&[("message", Value::from("from input"))]),
    );

    let output = DebugAction.execute(ctx).await.unwrap();

    assert_eq!(output.get("message"), Some(&Value::from("CHANNEL CREATION COMPLETE")));
}

#[tokio::test]
async fn test_delay_passes_inputs_through() {
    let ctx = create_test_context(
        map(&[("delay_ms", Value::Number(5.0))]),
        map(&[("tx_id", Value::from("abc"))]),
    );

    let output = DelayAction.execute(ctx).await.unwrap();

    assert_eq!(output.get("tx_id"), Some(&Value::from("abc")));
    assert!(DelayAction.validate_config(&map(&[("delay_ms", Value::from("soon"))])).is_err());
}

#[tokio::test]
async fn test_json_parse_reads_previous_output() {
    let ctx = create_test_context(
        map(&[("from", Value::from("stdout"))]),
        map(&[("stdout", Value::from(r#"{"balance": 1000}"#))]),
    );

    let output = JsonParseAction.execute(ctx).await.unwrap();

    assert_eq!(
        output.get("parsed"),
        Some(&Value::Json(serde_json::json!({"balance": 1000})))
    );
}

#[tokio::test]
async fn test_json_parse_rejects_bad_json() {
    let ctx = create_test_context(HashMap::new(), map(&[("json", Value::from("{not json"))]));

    let result = JsonParseAction.execute(ctx).await;

    assert!(matches!(result, Err(ActionError::ExecutionFailed(msg)) if msg.contains("JSON parse error")));
}

#[tokio::test]
async fn test_shell_captures_stdout() {
    let ctx = create_test_context(
        map(&[
            ("command", Value::from("echo")),
            ("args", Value::from(vec!["peer", "channel", "join"])),
        ]),
        HashMap::new(),
    );

    let output = ShellAction.execute(ctx).await.unwrap();

    assert_eq!(output.get("stdout"), Some(&Value::from("peer channel join")));
    assert_eq!(output.get("exit_code"), Some(&Value::Number(0.0)));
}

#[tokio::test]
async fn test_shell_parses_json_stdout() {
    let ctx = create_test_context(
        map(&[
            ("command", Value::from("echo")),
            ("args", Value::from(vec![r#"{"status":"joined"}"#])),
        ]),
        HashMap::new(),
    );

    let output = ShellAction.execute(ctx).await.unwrap();

    assert_eq!(
        output.get("stdout"),
        Some(&Value::Json(serde_json::json!({"status": "joined"})))
    );
}

#[tokio::test]
async fn test_shell_nonzero_exit_fails() {
    let ctx = create_test_context(map(&[("command", Value::from("false"))]), HashMap::new());

    let result = ShellAction.execute(ctx).await;

    assert!(matches!(result, Err(ActionError::ExecutionFailed(msg)) if msg.contains("exited")));
}

#[tokio::test]
async fn test_shell_feeds_large_stdin_while_draining_stdout() {
    // Larger than a pipe buffer, so cat blocks unless stdout is drained.
    let payload = "a".repeat(256 * 1024);
    let ctx = create_test_context(
        map(&[("command", Value::from("cat"))]),
        map(&[("stdin", Value::from(payload.as_str()))]),
    );

    let output = tokio::time::timeout(Duration::from_secs(10), ShellAction.execute(ctx))
        .await
        .expect("cat should not stall")
        .unwrap();

    assert_eq!(output.get("stdout"), Some(&Value::from(payload)));
}

#[tokio::test]
async fn test_timed_out_shell_step_kills_its_program() {
    let marker = std::env::temp_dir().join(format!("steprun-marker-{}", ExecutionId::new_v4()));
    let script = format!("sleep 1; touch {}", marker.display());

    let cleaned = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&cleaned);
    let runner = WorkflowRunner::new(CleanupHandler::new(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    }));

    let steps = vec![Step::new("Chaincode install", ShellAction)
        .with_config("command", "sh")
        .with_config("args", vec!["-c", script.as_str()])
        .with_timeout(Duration::from_millis(100))];

    let result = runner.run(steps).await;

    assert_eq!(
        result.failure().map(|f| (f.step.as_str(), f.error.clone())),
        Some(("Chaincode install", ActionError::Timeout { millis: 100 }))
    );
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "timed-out command kept running");
}

#[test]
fn test_shell_requires_command() {
    assert!(ShellAction.validate_config(&HashMap::new()).is_err());
    assert!(ShellAction.validate_config(&map(&[("command", Value::from("  "))])).is_err());
    assert!(ShellAction.validate_config(&map(&[("command", Value::from("peer"))])).is_ok());
}

#[test]
fn test_gateway_request_uses_defaults() {
    let action = GatewayAction::new(GatewayCall::Query, GatewayConfig::default());
    let ctx = create_test_context(
        map(&[
            ("org", Value::from("appdevorg")),
            ("function", Value::from("ListBankAccounts")),
        ]),
        HashMap::new(),
    );

    let (url, request) = action.build_request(&ctx).unwrap();

    assert_eq!(url, "http://127.0.0.1:4000/query");
    assert_eq!(
        request,
        GatewayRequest {
            org: "appdevorg".to_string(),
            user: "admin".to_string(),
            channel: "fullchannel".to_string(),
            chaincode: "beatchain_alpha".to_string(),
            version: "v0".to_string(),
            function: "ListBankAccounts".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn test_gateway_request_honours_step_config() {
    let action = GatewayAction::new(GatewayCall::Invoke, GatewayConfig::default());
    let ctx = create_test_context(
        map(&[
            ("org", Value::from("exporterorg")),
            ("user", Value::from("Exporter")),
            ("function", Value::from("acceptTrade")),
            ("version", Value::from("v1")),
            ("gateway", Value::from("http://gateway:8080/")),
            ("args", Value::Array(vec![Value::from("2ks89j9"), Value::Number(1000.0)])),
        ]),
        HashMap::new(),
    );

    let (url, request) = action.build_request(&ctx).unwrap();

    assert_eq!(url, "http://gateway:8080/invoke");
    assert_eq!(request.user, "Exporter");
    assert_eq!(request.version, "v1");
    assert_eq!(request.args, vec!["2ks89j9".to_string(), "1000".to_string()]);
}

#[test]
fn test_gateway_config_validation() {
    let action = GatewayAction::new(GatewayCall::Invoke, GatewayConfig::default());

    assert!(matches!(
        action.validate_config(&map(&[("org", Value::from("appdevorg"))])),
        Err(ActionError::Configuration(msg)) if msg.contains("function")
    ));
    assert!(action.validate_config(&map(&[
        ("org", Value::from("appdevorg")),
        ("function", Value::from("init")),
        ("args", Value::from("not a list")),
    ])).is_err());
}

/// Serve one canned HTTP response and hand back the request body.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&received).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if received.len() >= header_end + 4 + length {
                    break;
                }
            }
        }

        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();

        let text = String::from_utf8_lossy(&received).to_string();
        text.split_once("\r\n\r\n").map(|(_, b)| b.to_string()).unwrap_or_default()
    });

    (url, handle)
}

#[tokio::test]
async fn test_gateway_query_returns_value() {
    let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"accounts": ["acct1"]}"#).await;
    let action = GatewayAction::new(GatewayCall::Query, GatewayConfig { url, ..GatewayConfig::default() });
    let ctx = create_test_context(
        map(&[
            ("org", Value::from("appdevorg")),
            ("function", Value::from("ListBankAccounts")),
        ]),
        HashMap::new(),
    );

    let output = action.execute(ctx).await.unwrap();

    assert_eq!(
        output.get("value"),
        Some(&Value::Object(map(&[("accounts", Value::Array(vec![Value::from("acct1")]))])))
    );
    let sent: GatewayRequest = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent.function, "ListBankAccounts");
    assert_eq!(sent.org, "appdevorg");
}

#[tokio::test]
async fn test_gateway_rejection_is_external_error() {
    let (url, _server) = serve_once("HTTP/1.1 500 Internal Server Error", r#""endorsement failure""#).await;
    let action = GatewayAction::new(GatewayCall::Invoke, GatewayConfig { url, ..GatewayConfig::default() });
    let ctx = create_test_context(
        map(&[
            ("org", Value::from("appdevorg")),
            ("function", Value::from("init")),
        ]),
        HashMap::new(),
    );

    let result = action.execute(ctx).await;

    assert!(matches!(result, Err(ActionError::External(msg)) if msg.contains("endorsement failure")));
}

#[tokio::test]
async fn test_register_all_and_run_shell_workflow() {
    let mut registry = ActionRegistry::new();
    stepactions::register_all(&mut registry, &GatewayConfig::default());
    assert_eq!(
        registry.list_action_types(),
        vec![
            "debug.log",
            "gateway.invoke",
            "gateway.query",
            "http.request",
            "shell.exec",
            "time.delay",
            "transform.json_parse",
        ]
    );

    let runtime = StepRuntime::with_registry(Arc::new(registry), RuntimeConfig::default());
    let mut workflow = WorkflowDef::new("provision");
    workflow.add_step(StepSpec::new("create channel", "shell.exec").with_config("command", "echo created"));
    workflow.add_step(StepSpec::new("join channel", "shell.exec").with_config("command", "false"));
    workflow.add_step(StepSpec::new("install chaincode", "shell.exec").with_config("command", "echo installed"));

    let result = runtime
        .execute(&workflow, CleanupHandler::noop(), HashMap::new())
        .await
        .unwrap();

    assert_eq!(result.failure().map(|f| f.step.as_str()), Some("join channel"));
    assert_eq!(result.exit_code(), 1);
}
