use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepcore::{Action, ActionError, GatewayConfig, StepContext, StepOutput, Value};
use stepruntime::{ActionFactory, ActionMetadata, ConfigField};
use std::collections::HashMap;

/// Which ledger call a gateway step makes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayCall {
    /// Submit a transaction; the ledger may change
    Invoke,
    /// Evaluate against a single peer; the ledger is not changed
    Query,
}

impl GatewayCall {
    pub fn action_type(&self) -> &'static str {
        match self {
            GatewayCall::Invoke => "gateway.invoke",
            GatewayCall::Query => "gateway.query",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            GatewayCall::Invoke => "invoke",
            GatewayCall::Query => "query",
        }
    }

    /// Output key holding the gateway's answer
    pub fn output_key(&self) -> &'static str {
        match self {
            GatewayCall::Invoke => "response",
            GatewayCall::Query => "value",
        }
    }
}

/// Body sent to the gateway for one chaincode call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub org: String,
    pub user: String,
    pub channel: String,
    pub chaincode: String,
    pub version: String,
    pub function: String,
    pub args: Vec<String>,
}

/// Chaincode invoke or query through an HTTP gateway fronting the ledger SDK
pub struct GatewayAction {
    call: GatewayCall,
    defaults: GatewayConfig,
    client: reqwest::Client,
}

impl GatewayAction {
    pub fn new(call: GatewayCall, defaults: GatewayConfig) -> Self {
        Self {
            call,
            defaults,
            client: reqwest::Client::new(),
        }
    }

    /// Endpoint and request body for a step, with step config taking
    /// precedence over the gateway defaults.
    pub fn build_request(&self, ctx: &StepContext) -> Result<(String, GatewayRequest), ActionError> {
        let setting = |key: &str, default: &str| -> String {
            ctx.config.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };

        let args = match ctx.lookup("args") {
            Some(value) => value.as_list()
                .ok_or_else(|| ActionError::invalid_type("args", "array", "other"))?
                .iter()
                .map(Value::to_arg_string)
                .collect(),
            None => Vec::new(),
        };

        let request = GatewayRequest {
            org: ctx.require_config_str("org")?.to_string(),
            user: setting("user", "admin"),
            channel: setting("channel", self.defaults.channel.as_str()),
            chaincode: setting("chaincode", self.defaults.chaincode_id.as_str()),
            version: setting("version", self.defaults.chaincode_version.as_str()),
            function: ctx.require_config_str("function")?.to_string(),
            args,
        };

        let base = setting("gateway", self.defaults.url.as_str());
        let url = format!("{}/{}", base.trim_end_matches('/'), self.call.path());

        Ok((url, request))
    }
}

#[async_trait]
impl Action for GatewayAction {
    fn action_type(&self) -> &str {
        self.call.action_type()
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        let (url, request) = self.build_request(&ctx)?;

        ctx.events.info(format!(
            "{} {}({}) as {}@{}",
            self.call.path(),
            request.function,
            request.args.join(", "),
            request.user,
            request.org
        ));

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ActionError::External(format!("Gateway request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::External(format!("Failed to read gateway response: {}", e)))?;

        if !status.is_success() {
            return Err(ActionError::External(format!(
                "{} of '{}' rejected ({}): {}",
                self.call.path(),
                request.function,
                status,
                body
            )));
        }

        tracing::debug!("Gateway {} {} -> {}", self.call.path(), request.function, status);

        let value = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => Value::from_plain_json(json),
            Err(_) => Value::String(body),
        };

        Ok(StepOutput::new()
            .with_output(self.call.output_key(), value)
            .with_output("function", request.function))
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ActionError> {
        for key in ["org", "function"] {
            match config.get(key) {
                Some(v) if v.as_str().is_some() => {}
                Some(_) => return Err(ActionError::invalid_type(key, "string", "other")),
                None => return Err(ActionError::Configuration(format!("Missing config: {}", key))),
            }
        }
        if let Some(args) = config.get("args") {
            if args.as_list().is_none() {
                return Err(ActionError::invalid_type("args", "array", "other"));
            }
        }
        Ok(())
    }
}

/// Creates gateway actions of one call kind, sharing default settings
pub struct GatewayFactory {
    call: GatewayCall,
    defaults: GatewayConfig,
}

impl GatewayFactory {
    pub fn new(call: GatewayCall, defaults: GatewayConfig) -> Self {
        Self { call, defaults }
    }
}

impl ActionFactory for GatewayFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(GatewayAction::new(self.call, self.defaults.clone())))
    }

    fn action_type(&self) -> &str {
        self.call.action_type()
    }

    fn metadata(&self) -> ActionMetadata {
        let description = match self.call {
            GatewayCall::Invoke => "Submit a chaincode transaction through the gateway",
            GatewayCall::Query => "Query chaincode state through the gateway",
        };
        ActionMetadata {
            description: description.to_string(),
            category: "ledger".to_string(),
            config: vec![
                ConfigField::required("org", "Organization of the calling user"),
                ConfigField::required("function", "Chaincode function name"),
                ConfigField::optional("args", "Ordered argument list (also read from input)"),
                ConfigField::optional("user", "Calling user (default 'admin')"),
                ConfigField::optional("channel", "Channel name"),
                ConfigField::optional("chaincode", "Chaincode id"),
                ConfigField::optional("version", "Chaincode version"),
                ConfigField::optional("gateway", "Gateway base URL"),
            ],
            outputs: vec![ConfigField::optional(
                self.call.output_key(),
                "Gateway answer, parsed as JSON when possible",
            )],
        }
    }
}
