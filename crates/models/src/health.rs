use serde::{Deserialize, Serialize};

pub const HEALTHY: &str = "healthy";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthServices {
    pub calculator_engine: bool,
    pub mcp_protocol: bool,
    pub sse_transport: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub server: String,
    pub version: String,
    pub timestamp: f64,
    pub services: HealthServices,
}

impl HealthReport {
    pub fn healthy(server: &str, version: &str) -> Self {
        Self {
            status: HEALTHY.to_string(),
            server: server.to_string(),
            version: version.to_string(),
            timestamp: crate::unix_timestamp(),
            services: HealthServices {
                calculator_engine: true,
                mcp_protocol: true,
                sse_transport: true,
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}
