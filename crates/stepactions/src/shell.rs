use async_trait::async_trait;
use stepcore::{Action, ActionError, StepContext, StepOutput, Value};
use stepruntime::{ActionFactory, ActionMetadata, ConfigField};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Runs an external program, e.g. a network admin CLI creating a channel
/// or installing chaincode
pub struct ShellAction;

impl ShellAction {
    /// Program and argument list from config.
    ///
    /// With no `args`, `command` is split on whitespace.
    fn command_line(ctx: &StepContext) -> Result<(String, Vec<String>), ActionError> {
        let command = ctx.require_config_str("command")?;

        match ctx.config.get("args") {
            Some(args) => {
                let args = args.as_list()
                    .ok_or_else(|| ActionError::invalid_type("args", "array", "other"))?
                    .iter()
                    .map(Value::to_arg_string)
                    .collect();
                Ok((command.to_string(), args))
            }
            None => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts.next()
                    .ok_or_else(|| ActionError::Configuration("Empty command".to_string()))?;
                Ok((program, parts.collect()))
            }
        }
    }
}

#[async_trait]
impl Action for ShellAction {
    fn action_type(&self) -> &str {
        "shell.exec"
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        let (program, args) = Self::command_line(&ctx)?;

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        // A timed-out or interrupted step must not leave the program running.
        cmd.kill_on_drop(true);

        if let Some(Value::Object(env)) = ctx.config.get("env") {
            for (key, value) in env {
                cmd.env(key, value.to_arg_string());
            }
        }

        if let Some(cwd) = ctx.config.get("cwd").and_then(|v| v.as_str()) {
            cmd.current_dir(cwd);
        }

        // Input data to pass via stdin
        let input_data = ctx.lookup("stdin")
            .and_then(|v| match v {
                Value::String(s) => Some(s.as_bytes().to_vec()),
                Value::Bytes(b) => Some(b.clone()),
                Value::Null => None,
                other => serde_json::to_vec(&other.to_plain_json()).ok(),
            })
            .unwrap_or_default();

        cmd.stdin(if input_data.is_empty() { Stdio::null() } else { Stdio::piped() })
           .stdout(Stdio::piped())
           .stderr(Stdio::piped());

        ctx.events.info(format!("Running: {} {}", program, args.join(" ")));

        let mut child = cmd.spawn()
            .map_err(|e| ActionError::ExecutionFailed(format!("Failed to spawn {}: {}", program, e)))?;

        let stdin = child.stdin.take();
        let mut stdout_data = Vec::new();
        let mut stderr_data = Vec::new();
        let mut stdout = child.stdout.take()
            .ok_or_else(|| ActionError::ExecutionFailed("stdout not captured".to_string()))?;
        let mut stderr = child.stderr.take()
            .ok_or_else(|| ActionError::ExecutionFailed("stderr not captured".to_string()))?;

        let feed = async move {
            match stdin {
                // Dropping the handle at the end closes the pipe.
                Some(mut stdin) => stdin.write_all(&input_data).await,
                None => Ok(()),
            }
        };

        // Feed stdin while draining both pipes so neither side can fill up.
        let (fed, out, err) = tokio::join!(
            feed,
            stdout.read_to_end(&mut stdout_data),
            stderr.read_to_end(&mut stderr_data),
        );
        fed.map_err(|e| ActionError::ExecutionFailed(format!("Failed to write stdin: {}", e)))?;
        out.map_err(|e| ActionError::ExecutionFailed(format!("Failed to read stdout: {}", e)))?;
        err.map_err(|e| ActionError::ExecutionFailed(format!("Failed to read stderr: {}", e)))?;

        let status = child.wait().await
            .map_err(|e| ActionError::ExecutionFailed(format!("Failed to wait for process: {}", e)))?;

        let stdout_str = String::from_utf8_lossy(&stdout_data).trim_end().to_string();
        let stderr_str = String::from_utf8_lossy(&stderr_data).trim_end().to_string();

        if !stderr_str.is_empty() {
            ctx.events.warn(format!("stderr: {}", stderr_str));
        }

        if !status.success() {
            return Err(ActionError::ExecutionFailed(
                format!("{} exited with {}. stderr: {}", program, status, stderr_str)
            ));
        }

        let output_value = match serde_json::from_str::<serde_json::Value>(&stdout_str) {
            Ok(json) => Value::Json(json),
            Err(_) => Value::String(stdout_str),
        };

        Ok(StepOutput::new()
            .with_output("stdout", output_value)
            .with_output("stderr", stderr_str)
            .with_output("exit_code", status.code().unwrap_or(0) as f64))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ActionError> {
        match config.get("command").and_then(|v| v.as_str()) {
            Some(command) if !command.trim().is_empty() => Ok(()),
            _ => Err(ActionError::Configuration("'command' must be a non-empty string".to_string())),
        }
    }
}

pub struct ShellActionFactory;

impl ActionFactory for ShellActionFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(ShellAction))
    }

    fn action_type(&self) -> &str {
        "shell.exec"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Run an external program; a non-zero exit fails the step".to_string(),
            category: "process".to_string(),
            config: vec![
                ConfigField::required("command", "Program to run (split on whitespace when 'args' is absent)"),
                ConfigField::optional("args", "Ordered argument list"),
                ConfigField::optional("env", "Object of environment variables"),
                ConfigField::optional("cwd", "Working directory"),
                ConfigField::optional("stdin", "Data written to the program's stdin"),
            ],
            outputs: vec![
                ConfigField::optional("stdout", "Standard output, parsed as JSON when possible"),
                ConfigField::optional("stderr", "Standard error"),
                ConfigField::optional("exit_code", "Exit status"),
            ],
        }
    }
}
