use calc_models::Config;
use figment::Jail;

fn dockerfile() -> String {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/Dockerfile");
    std::fs::read_to_string(path).expect("Dockerfile")
}

/// `KEY=value` pairs from the Dockerfile's `ENV` instructions.
fn dockerfile_env(text: &str) -> Vec<(String, String)> {
    let joined = text.replace("\\\n", " ");
    joined
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ENV "))
        .flat_map(|rest| rest.split_whitespace())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[test]
fn image_environment_loads() {
    let text = dockerfile();
    let env = dockerfile_env(&text);
    assert!(env.iter().any(|(key, _)| key == "CALC_SERVER_VERSION"));

    Jail::expect_with(|jail| {
        for (key, value) in &env {
            jail.set_env(key, value);
        }
        let config = Config::load(None).expect("config from image environment");
        assert_eq!(config.server.version, "1.0");
        assert_eq!(config.server.name, "calculator-server");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.calculator.max_value, 1e15);
        assert!(config.logging.is_json());
        Ok(())
    });
}

#[test]
fn builder_uses_a_current_toolchain() {
    let text = dockerfile();
    let builder = text
        .lines()
        .find(|line| line.starts_with("FROM rust:"))
        .expect("rust builder stage");
    assert!(
        builder.starts_with("FROM rust:1-") || builder.starts_with("FROM rust:latest"),
        "builder image must track the current stable toolchain: {builder}"
    );
}
