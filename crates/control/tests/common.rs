use std::sync::Arc;

use calc_control::{McpDispatcher, ToolRegistry};
use calc_engine::CalculatorEngine;
use calc_models::{CalculatorConfig, ParserConfig, ServerConfig};

pub fn registry() -> Arc<ToolRegistry> {
    let engine = CalculatorEngine::new(CalculatorConfig::default(), &ParserConfig::default())
        .expect("default parser config compiles");
    Arc::new(ToolRegistry::new(Arc::new(engine)))
}

#[allow(dead_code)]
pub fn dispatcher() -> McpDispatcher {
    McpDispatcher::new(registry(), &ServerConfig::default())
}
