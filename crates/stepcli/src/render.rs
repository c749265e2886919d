// Console rendering of run events

use stepcore::{ActionEvent, ExecutionEvent, StepOutput};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio_util::sync::CancellationToken;

/// Print step progress until `listening` is cancelled, then drain what
/// is already queued and stop.
pub async fn print_events(mut events: Receiver<ExecutionEvent>, listening: CancellationToken) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Event listener fell behind, {} event(s) dropped", missed);
                }
                Err(RecvError::Closed) => break,
            },
            _ = listening.cancelled() => {
                while let Ok(event) = events.try_recv() {
                    print_event(&event);
                }
                break;
            }
        }
    }
}

fn print_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::WorkflowStarted { workflow, total_steps, .. } => {
            println!("▶️  {} ({} steps)", workflow, total_steps);
        }
        ExecutionEvent::StepStarted { index, name, action_type, .. } => {
            println!("  ⚡ [{}] {} ({})", index + 1, name, action_type);
        }
        ExecutionEvent::StepCompleted { name, duration_ms, .. } => {
            banner(&format!("{} COMPLETE", name.to_uppercase()));
            println!("  ✅ {}ms", duration_ms);
        }
        ExecutionEvent::StepFailed { name, error, .. } => {
            banner(&format!("{} FAILED: {}", name.to_uppercase(), error));
        }
        ExecutionEvent::StepEvent { event, .. } => match event {
            ActionEvent::Info { message } => println!("     ℹ️  {}", message),
            ActionEvent::Warning { message } => println!("     ⚠️  {}", message),
            ActionEvent::Progress { percent, message: Some(msg) } => {
                println!("     📊 {}% - {}", percent, msg);
            }
            ActionEvent::Progress { percent, message: None } => println!("     📊 {}%", percent),
            ActionEvent::Data { .. } => {}
        },
        ExecutionEvent::CleanupCompleted { .. } | ExecutionEvent::WorkflowCompleted { .. } => {}
    }
}

/// Framed one-line heading
pub fn banner(title: &str) {
    let rule = "-".repeat(title.chars().count() + 2);
    println!();
    println!("{}", rule);
    println!("{}", title);
    println!("{}", rule);
    println!();
}

pub fn print_outputs(output: &StepOutput) {
    if output.outputs.is_empty() {
        return;
    }

    let mut keys: Vec<&String> = output.outputs.keys().collect();
    keys.sort();

    println!("📤 Outputs:");
    for key in keys {
        println!("   {}: {}", key, output.outputs[key]);
    }
}
