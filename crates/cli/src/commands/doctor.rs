//! Doctor command - validate configuration and show status

use anyhow::Result;
use paa_pipeline_adapters::state::SqliteContentStore;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::config::{AdapterMode, AppConfig, ClientConfig};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    generator: CheckResult,
    server: CheckResult,
    directory: CheckResult,
    clients: Vec<ClientCheck>,
    overall: String,
}

#[derive(Debug, Serialize)]
struct ClientCheck {
    id: String,
    result: CheckResult,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        database: CheckResult::error("Not checked"),
        generator: CheckResult::error("Not checked"),
        server: CheckResult::error("Not checked"),
        directory: CheckResult::error("Not checked"),
        clients: vec![],
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok(format!(
                "Configuration loaded, {} client(s), adapters: {:?}",
                c.clients.len(),
                c.general.adapters
            ));
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.database = check_database(&config.general.state_db_path).await;
        report.generator = check_generator(config);
        report.server = check_env("API token", &config.server.token_env);
        report.directory = check_directory(config);
        report.clients = config
            .clients
            .iter()
            .map(|client| ClientCheck {
                id: client.profile.id.clone(),
                result: check_client(config.general.adapters, client),
            })
            .collect();
        if config.clients.is_empty() {
            report.clients.push(ClientCheck {
                id: "-".to_string(),
                result: CheckResult::warn("No clients configured"),
            });
        }
    }

    let mut checks = vec![&report.config, &report.database, &report.generator];
    checks.extend(report.clients.iter().map(|c| &c.result));

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_database(path: &Path) -> CheckResult {
    match SqliteContentStore::new(path).await {
        Ok(_) => CheckResult::ok(format!("State database: {}", path.display())),
        Err(e) => CheckResult::error(format!(
            "Failed to open state database {}: {}",
            path.display(),
            e
        )),
    }
}

fn env_is_set(env_var: &str) -> bool {
    std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty())
}

fn check_env(what: &str, env_var: &str) -> CheckResult {
    if env_var.trim().is_empty() {
        return CheckResult::error(format!("No env var configured for {}", what));
    }
    if env_is_set(env_var) {
        CheckResult::ok(format!("{}: {} (set)", what, env_var))
    } else {
        CheckResult::warn(format!("{}: {} (not set)", what, env_var))
    }
}

fn check_generator(config: &AppConfig) -> CheckResult {
    if config.general.adapters == AdapterMode::Stub {
        return CheckResult::ok("Generator: stub (offline)");
    }

    let env_var = &config.generator.api_key_env;
    if env_var.trim().is_empty() {
        return CheckResult::error("No API key env var configured for the content generator");
    }
    if env_is_set(env_var) {
        CheckResult::ok(format!(
            "Generator: {}, API key: {} (set)",
            config.generator.base_url, env_var
        ))
    } else {
        // Live mode cannot start without it
        CheckResult::error(format!(
            "Generator: {}, API key: {} (not set)",
            config.generator.base_url, env_var
        ))
    }
}

fn check_directory(config: &AppConfig) -> CheckResult {
    let Some(directory) = &config.directory else {
        return CheckResult::ok("Directory accounts disabled");
    };
    if directory.accounts.is_empty() {
        return CheckResult::warn("Directory configured without accounts");
    }
    let platforms: Vec<&str> = directory.accounts.keys().map(|p| p.as_str()).collect();
    check_env("Directory GetLate key", &directory.api_key_env)
        .with_details(serde_json::json!({ "platforms": platforms }))
}

/// Which services a client can use and which are missing credentials
fn check_client(mode: AdapterMode, client: &ClientConfig) -> CheckResult {
    let profile = &client.profile;
    let mut problems = Vec::new();
    if profile.paa_questions.is_empty() {
        problems.push("no PAA questions".to_string());
    }
    if profile.locations.is_empty() {
        problems.push("no service locations".to_string());
    }

    let mut services = serde_json::Map::new();
    let mut record = |name: &str, env_vars: Option<Vec<&str>>| {
        let status = match env_vars {
            None => "not configured".to_string(),
            Some(_) if mode == AdapterMode::Stub => "stub".to_string(),
            Some(vars) => match vars.iter().find(|v| !env_is_set(v)) {
                Some(missing) => {
                    problems.push(format!("{} needs {}", name, missing));
                    format!("missing {}", missing)
                }
                None => "ok".to_string(),
            },
        };
        services.insert(name.to_string(), serde_json::Value::String(status));
    };

    record(
        "wordpress",
        client
            .wordpress
            .as_ref()
            .map(|c| vec![c.app_password_env.as_str()]),
    );
    record(
        "getlate",
        client.getlate.as_ref().map(|c| vec![c.api_key_env.as_str()]),
    );
    record(
        "podbean",
        client
            .podbean
            .as_ref()
            .map(|c| vec![c.client_secret_env.as_str()]),
    );
    record(
        "video",
        client.video.as_ref().map(|c| {
            let mut vars = vec![c.api_key_env.as_str()];
            if let Some(yt) = &c.youtube {
                vars.push(yt.client_secret_env.as_str());
                vars.push(yt.refresh_token_env.as_str());
            }
            vars
        }),
    );
    record(
        "photos",
        client
            .photos
            .as_ref()
            .map(|c| vec![c.access_token_env.as_str()]),
    );

    let details = serde_json::Value::Object(services);
    if problems.is_empty() {
        CheckResult::ok(format!("{} ({})", profile.name, profile.city)).with_details(details)
    } else {
        CheckResult::warn(format!("{}: {}", profile.name, problems.join("; ")))
            .with_details(details)
    }
}

fn print_report(report: &DoctorReport) {
    println!("paa-pipeline Doctor Report");
    println!("==========================");
    println!();

    print_check("Config", &report.config);
    print_check("Database", &report.database);
    print_check("Generator", &report.generator);
    print_check("HTTP API", &report.server);
    print_check("Directory", &report.directory);
    for client in &report.clients {
        print_check(&format!("Client {}", client.id), &client.result);
    }

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: paa-pipeline pipeline --all-due");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
