//! `ragdesk doctor`: diagnose configuration and connectivity.

use ragdesk_config::AppConfig;
use ragdesk_core::provider::Provider;
use std::path::Path;
use std::time::Duration;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("RagDesk Doctor");
    println!("==============\n");

    let mut issues = 0;
    let config_path = super::config_path(explicit);

    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ⚠️  No config file at {}; using defaults. Run `ragdesk init`", config_path.display());
    }

    let config = match AppConfig::load_with_env(&config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    println!("     Model:     {} (temperature {})", config.generation.model, config.generation.temperature);
    println!("     Embedding: {}", config.embedding.model);
    println!("     Retrieval: top {} passages", config.retrieval.top_k);

    match config.index.backend.as_str() {
        "sqlite" => println!("  ✅ Index: sqlite at {}", config.index.sqlite_path().display()),
        _ => {
            println!("  ⚠️  Index: in-memory; uploaded documents are lost on restart");
            issues += 1;
        }
    }

    if config.has_api_key() || !config.requires_api_key() {
        if config.has_api_key() {
            println!("  ✅ API key configured");
        } else {
            println!("  ✅ Local provider {}; no API key needed", config.default_provider);
        }

        let router = ragdesk_providers::build_from_config(&config);
        if let Some(provider) = router.default() {
            match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, provider.health_check()).await {
                Ok(Ok(true)) => println!("  ✅ Provider {} reachable", provider.name()),
                Ok(Ok(false)) | Ok(Err(_)) | Err(_) => {
                    println!("  ❌ Provider {} not reachable", provider.name());
                    issues += 1;
                }
            }
        }
    } else {
        println!("  ⚠️  No API key configured. Set OPENAI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
