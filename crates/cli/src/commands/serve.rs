//! `ragdesk serve`: start the HTTP server.

use std::path::Path;

pub async fn run(explicit: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(explicit)?;
    super::require_api_key(&config, &super::config_path(explicit))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("RagDesk Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.generation.model);
    println!("   Index:     {}", config.index.backend);

    ragdesk_gateway::start(config).await?;

    Ok(())
}
