use crate::CalcError;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Environment variables understood by the server and the config key each
/// one overrides.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("CALC_WORKER_THREADS", "server.worker_threads"),
    ("CALC_REQUEST_TIMEOUT_SECS", "server.request_timeout_secs"),
    ("CALC_MAX_CONCURRENT_REQUESTS", "server.max_concurrent_requests"),
    ("CALC_PRECISION", "calculator.precision"),
    ("CALC_MAX_VALUE", "calculator.max_value"),
    ("CALC_SSE_HEARTBEAT_SECS", "sse.heartbeat_interval_secs"),
    ("CALC_SSE_QUEUE_CAPACITY", "sse.queue_capacity"),
];

/// Environment variables for string-valued keys. These are taken verbatim,
/// so `CALC_SERVER_VERSION=1.0` stays `"1.0"` instead of becoming a float.
pub const STRING_ENV_KEYS: &[(&str, &str)] = &[
    ("CALC_SERVER_NAME", "server.name"),
    ("CALC_SERVER_VERSION", "server.version"),
    ("HOST", "server.bind"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "CALC_CONFIG";

pub const MAX_PRECISION: u32 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub server: ServerConfig,
    pub calculator: CalculatorConfig,
    pub sse: SseConfig,
    pub logging: LoggingConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub bind: String,
    pub port: u16,
    /// Tokio worker threads; 0 keeps the runtime default (one per core).
    pub worker_threads: usize,
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub max_request_body_kb: usize,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CalculatorConfig {
    /// Decimal places kept in float results.
    pub precision: u32,
    /// Largest absolute value accepted as input or produced as output.
    #[serde(deserialize_with = "lenient_f64")]
    pub max_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SseConfig {
    pub heartbeat_interval_secs: u64,
    /// Undelivered responses buffered per client before posts are refused.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ParserConfig {
    /// Whole-word number words and their digit replacement, applied in order.
    pub word_to_number: Vec<(String, String)>,
    /// Operation phrases and their operator, applied in order; longer phrases
    /// must come before their prefixes ("divided by" before "divide").
    pub operation_words: Vec<(String, String)>,
    pub normalization: NormalizationConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct NormalizationConfig {
    pub prefixes: Vec<String>,
    /// Regex character class of characters deleted before conversion.
    pub remove_chars: String,
    pub normalize_whitespace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SecurityConfig {
    /// Case-insensitive regexes; a match rejects the expression outright.
    pub dangerous_patterns: Vec<String>,
    pub max_length: usize,
    pub max_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "calculator-server".to_string(),
            version: "1.0".to_string(),
            bind: "0.0.0.0".to_string(),
            port: 8080,
            worker_threads: 0,
            request_timeout_secs: 120,
            max_concurrent_requests: 1000,
            max_request_body_kb: 1024,
            shutdown_grace_secs: 10,
        }
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            precision: 10,
            max_value: 1e15,
        }
    }
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            queue_capacity: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: "text".to_string(),
        }
    }
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            word_to_number: pairs(&[
                ("zero", "0"),
                ("one", "1"),
                ("two", "2"),
                ("three", "3"),
                ("four", "4"),
                ("five", "5"),
                ("six", "6"),
                ("seven", "7"),
                ("eight", "8"),
                ("nine", "9"),
                ("ten", "10"),
                ("eleven", "11"),
                ("twelve", "12"),
                ("thirteen", "13"),
                ("fourteen", "14"),
                ("fifteen", "15"),
                ("sixteen", "16"),
                ("seventeen", "17"),
                ("eighteen", "18"),
                ("nineteen", "19"),
                ("twenty", "20"),
                ("thirty", "30"),
                ("forty", "40"),
                ("fifty", "50"),
                ("sixty", "60"),
                ("seventy", "70"),
                ("eighty", "80"),
                ("ninety", "90"),
                ("hundred", "100"),
                ("thousand", "1000"),
                ("million", "1000000"),
            ]),
            operation_words: pairs(&[
                ("raised to the power of", "**"),
                ("to the power of", "**"),
                ("multiplied by", "*"),
                ("divided by", "/"),
                ("plus", "+"),
                ("add", "+"),
                ("minus", "-"),
                ("subtract", "-"),
                ("times", "*"),
                ("multiply", "*"),
                ("divide", "/"),
                ("over", "/"),
                ("modulo", "%"),
                ("mod", "%"),
            ]),
            normalization: NormalizationConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            prefixes: [
                "what is",
                "what's",
                "how much is",
                "calculate",
                "compute",
                "evaluate",
                "solve",
                "find",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            remove_chars: "[?!]".to_string(),
            normalize_whitespace: true,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            dangerous_patterns: [
                r"__",
                r"\bimport\b",
                r"\bexec\b",
                r"\beval\b",
                r"\bopen\b",
                r"\bglobals\b",
                r"\blocals\b",
                r"\blambda\b",
                r"\bgetattr\b",
                r"\bcompile\b",
                r"\b(os|sys|subprocess)\.",
                r";",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_length: 1000,
            max_depth: 64,
        }
    }
}

/// Accepts a float either as a number or as a numeric string, so that
/// `CALC_MAX_VALUE=1e15` works regardless of how the environment value was
/// typed by the provider.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(f) => Ok(f),
        Raw::Int(i) => Ok(i as f64),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

fn env_provider() -> Env {
    Env::raw().filter_map(|key| {
        let upper = key.as_str().to_ascii_uppercase();
        ENV_KEYS
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, path)| (*path).into())
    })
}

fn merge_string_env(mut figment: Figment) -> Figment {
    for (name, value) in std::env::vars_os() {
        let (Some(name), Some(value)) = (name.to_str(), value.to_str()) else {
            continue;
        };
        let upper = name.to_ascii_uppercase();
        if let Some((_, path)) = STRING_ENV_KEYS.iter().find(|(key, _)| *key == upper) {
            figment = figment.merge(Serialized::default(path, value));
        }
    }
    figment
}

impl Config {
    /// Layered sources: built-in defaults, then the TOML file (if any), then
    /// environment variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        merge_string_env(figment.merge(env_provider()))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, CalcError> {
        let config: Config = Self::figment(path)
            .extract()
            .map_err(|e| CalcError::ConfigError {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        let fail = |reason: String| Err(CalcError::ConfigError { reason });

        if !self.calculator.max_value.is_finite() || self.calculator.max_value <= 0.0 {
            return fail(format!(
                "calculator.max_value must be a positive finite number, got {}",
                self.calculator.max_value
            ));
        }
        if self.calculator.precision > MAX_PRECISION {
            return fail(format!(
                "calculator.precision must be at most {MAX_PRECISION}, got {}",
                self.calculator.precision
            ));
        }
        if self.sse.heartbeat_interval_secs == 0 {
            return fail("sse.heartbeat_interval_secs must be greater than 0".to_string());
        }
        if self.sse.queue_capacity == 0 {
            return fail("sse.queue_capacity must be greater than 0".to_string());
        }
        if self.server.max_concurrent_requests == 0 {
            return fail("server.max_concurrent_requests must be greater than 0".to_string());
        }
        if self.logging.normalized_level().is_none() {
            return fail(format!("unknown log level: {}", self.logging.level));
        }
        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "text" | "json") {
            return fail(format!(
                "logging.format must be \"text\" or \"json\", got {}",
                self.logging.format
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

impl LoggingConfig {
    /// Level name in `tracing` terms. `WARNING` and `CRITICAL` are accepted
    /// as aliases for `warn` and `error`.
    pub fn normalized_level(&self) -> Option<&'static str> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" => Some("info"),
            "warn" | "warning" => Some("warn"),
            "error" | "critical" | "fatal" => Some("error"),
            _ => None,
        }
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.name, "calculator-server");
        assert_eq!(config.calculator.precision, 10);
        assert_eq!(config.calculator.max_value, 1e15);
    }

    #[test]
    fn environment_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "9090");
            jail.set_env("CALC_SERVER_NAME", "calc-test");
            jail.set_env("CALC_MAX_VALUE", "1e6");
            jail.set_env("CALC_PRECISION", "4");
            jail.set_env("LOG_LEVEL", "WARNING");

            let config = Config::load(None).expect("config");
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.server.name, "calc-test");
            assert_eq!(config.calculator.max_value, 1e6);
            assert_eq!(config.calculator.precision, 4);
            assert_eq!(config.logging.normalized_level(), Some("warn"));
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_layered_under_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "calc.toml",
                r#"
                [server]
                port = 7000
                name = "from-file"

                [sse]
                heartbeat_interval_secs = 5
                "#,
            )?;
            jail.set_env("CALC_SERVER_NAME", "from-env");

            let config = Config::load(Some(Path::new("calc.toml"))).expect("config");
            assert_eq!(config.server.port, 7000);
            assert_eq!(config.server.name, "from-env");
            assert_eq!(config.sse.heartbeat_interval_secs, 5);
            assert_eq!(config.sse.queue_capacity, 64);
            Ok(())
        });
    }

    #[test]
    fn numeric_looking_strings_stay_strings() {
        Jail::expect_with(|jail| {
            jail.set_env("CALC_SERVER_VERSION", "1.0");
            jail.set_env("CALC_SERVER_NAME", "42");
            jail.set_env("HOST", "127.0.0.1");
            jail.set_env("LOG_FORMAT", "json");

            let config = Config::load(None).expect("config");
            assert_eq!(config.server.version, "1.0");
            assert_eq!(config.server.name, "42");
            assert_eq!(config.server.bind, "127.0.0.1");
            assert!(config.logging.is_json());
            Ok(())
        });
    }

    #[test]
    fn string_environment_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file("calc.toml", "[server]\nversion = \"0.9\"\n")?;
            jail.set_env("CALC_SERVER_VERSION", "2");

            let config = Config::load(Some(Path::new("calc.toml"))).expect("config");
            assert_eq!(config.server.version, "2");
            Ok(())
        });
    }

    #[test]
    fn unrelated_environment_is_ignored() {
        Jail::expect_with(|jail| {
            jail.set_env("FLASK_ENV", "production");
            jail.set_env("PYTHONUNBUFFERED", "1");
            jail.set_env("SERVER_PORT", "1");
            assert!(Config::load(None).is_ok());
            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();
        config.calculator.max_value = 0.0;
        assert!(matches!(
            config.validate(),
            Err(CalcError::ConfigError { .. })
        ));

        let mut config = Config::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sse.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calculator.precision = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_keys_in_file_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[server]\nworkers = 4\n")?;
            assert!(Config::load(Some(Path::new("bad.toml"))).is_err());
            Ok(())
        });
    }
}
