//! `ragdesk ask`: run one chat turn from the terminal.

use ragdesk_core::message::HistoryInput;
use ragdesk_gateway::Services;
use ragdesk_pipeline::TurnInput;
use std::path::{Path, PathBuf};

pub struct AskArgs {
    pub message: String,
    /// Documents to ingest before asking
    pub files: Vec<PathBuf>,
    /// JSON file holding the conversation so far
    pub history: Option<PathBuf>,
    pub show_sources: bool,
}

pub async fn run(explicit: Option<&Path>, args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    super::require_api_key(&config, &super::config_path(explicit))?;

    let services = Services::from_config(&config).await?;

    for path in &args.files {
        let report = super::ingest::ingest_path(&services, path).await?;
        eprintln!("  Ingested {} ({} chunks)", path.display(), report.num_chunks);
    }

    let mut input = TurnInput::new(args.message);
    if let Some(path) = &args.history {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
        let history: HistoryInput = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid history in {}: {e}", path.display()))?;
        input = input.with_history(history);
    }

    eprint!("  Thinking...");
    let result = services.pipeline.run(input).await;
    eprint!("\r              \r");
    let result = result?;

    println!("{}", result.answer);

    if args.show_sources {
        println!();
        println!("  Standalone question: {}", result.standalone_question);
        if result.passages.is_empty() {
            println!("  No passages retrieved.");
        }
        for (i, passage) in result.passages.iter().enumerate() {
            println!(
                "  [{}] {} #{} (score {:.3})",
                i + 1,
                passage.metadata.file_name,
                passage.metadata.chunk_index,
                passage.score
            );
        }
    }

    Ok(())
}
