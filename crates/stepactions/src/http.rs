use async_trait::async_trait;
use stepcore::{Action, ActionError, StepContext, StepOutput, Value};
use stepruntime::{ActionFactory, ActionMetadata, ConfigField};
use std::collections::HashMap;

/// HTTP request action
pub struct HttpRequestAction {
    client: reqwest::Client,
}

impl HttpRequestAction {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for HttpRequestAction {
    fn action_type(&self) -> &str {
        "http.request"
    }
    
    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        let url = ctx.lookup("url")
            .ok_or_else(|| ActionError::MissingInput("url".to_string()))?
            .as_str()
            .ok_or_else(|| ActionError::invalid_type("url", "string", "other"))?;
        let method_value = ctx.get_config_or("method", Value::String("GET".to_string()));
        let method = method_value.as_str().unwrap_or("GET");
        
        ctx.events.info(format!("{} {}", method, url));
        
        let request = match method.to_uppercase().as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            _ => return Err(ActionError::Configuration(format!("Unsupported method: {}", method))),
        };
        
        let request = match ctx.lookup("body") {
            Some(Value::String(text)) => request.body(text.clone()),
            Some(body) if !body.is_null() => request.json(&body.to_plain_json()),
            _ => request,
        };
        
        let request = if let Some(Value::Object(headers)) = ctx.config.get("headers") {
            let mut req = request;
            for (key, value) in headers {
                if let Some(val_str) = value.as_str() {
                    req = req.header(key, val_str);
                }
            }
            req
        } else {
            request
        };
        
        let response = request
            .send()
            .await
            .map_err(|e| ActionError::External(format!("HTTP request failed: {}", e)))?;
        
        let status = response.status();
        let headers_map: HashMap<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_str().unwrap_or("").to_string())))
            .collect();
        
        let body_text = response
            .text()
            .await
            .map_err(|e| ActionError::External(format!("Failed to read response: {}", e)))?;
        
        ctx.events.info(format!("Response status: {}", status));
        
        let fail_on_status = ctx.config.get("fail_on_status")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if fail_on_status && !status.is_success() {
            return Err(ActionError::External(format!("{} {} returned {}: {}", method, url, status, body_text)));
        }
        
        Ok(StepOutput::new()
            .with_output("status", status.as_u16() as f64)
            .with_output("body", body_text)
            .with_output("headers", Value::Object(headers_map)))
    }
}

pub struct HttpRequestActionFactory;

impl ActionFactory for HttpRequestActionFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(HttpRequestAction::new()))
    }
    
    fn action_type(&self) -> &str {
        "http.request"
    }
    
    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Make HTTP requests".to_string(),
            category: "http".to_string(),
            config: vec![
                ConfigField::required("url", "Target URL (config or input)"),
                ConfigField::optional("method", "GET, POST, PUT or DELETE (default GET)"),
                ConfigField::optional("body", "Request body; strings are sent raw, other values as JSON"),
                ConfigField::optional("headers", "Object of header values"),
                ConfigField::optional("fail_on_status", "Treat a non-2xx status as a step failure"),
            ],
            outputs: vec![
                ConfigField::optional("status", "HTTP status code"),
                ConfigField::optional("body", "Response body text"),
                ConfigField::optional("headers", "Response headers"),
            ],
        }
    }
}
