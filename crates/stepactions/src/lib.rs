//! Standard action library
//! 
//! Built-in actions for provisioning and transaction workflows

mod debug;
mod gateway;
mod http;
mod shell;
mod time;
mod transform;

pub use debug::DebugAction;
pub use gateway::{GatewayAction, GatewayCall, GatewayFactory, GatewayRequest};
pub use http::HttpRequestAction;
pub use shell::ShellAction;
pub use transform::JsonParseAction;
pub use time::DelayAction;
use stepcore::GatewayConfig;
use stepruntime::ActionRegistry;

use std::sync::Arc;

/// Register all standard actions with a registry
///
/// `gateway` is the fallback for ledger steps that do not carry their own
/// gateway settings.
pub fn register_all(registry: &mut ActionRegistry, gateway: &GatewayConfig) {
    registry.register(Arc::new(debug::DebugActionFactory));
    registry.register(Arc::new(http::HttpRequestActionFactory));
    registry.register(Arc::new(shell::ShellActionFactory));
    registry.register(Arc::new(transform::JsonParseActionFactory));
    registry.register(Arc::new(time::DelayActionFactory));
    registry.register(Arc::new(GatewayFactory::new(GatewayCall::Invoke, gateway.clone())));
    registry.register(Arc::new(GatewayFactory::new(GatewayCall::Query, gateway.clone())));
}
