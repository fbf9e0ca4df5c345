//! `ragdesk ingest`: index local documents.

use ragdesk_core::index::VectorIndex;
use ragdesk_core::ingest::{DocumentIngestor, IngestReport, UploadedFile};
use ragdesk_gateway::Services;
use std::path::{Path, PathBuf};
use tracing::warn;

pub async fn run(explicit: Option<&Path>, files: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    super::require_api_key(&config, &super::config_path(explicit))?;

    if config.index.backend == "memory" {
        warn!("Index backend is \"memory\"; ingested chunks are discarded on exit");
        println!("⚠️  The in-memory index does not persist. Set [index] backend = \"sqlite\" to keep documents.\n");
    }

    let services = Services::from_config(&config).await?;

    let mut failures = 0;
    for path in &files {
        match ingest_path(&services, path).await {
            Ok(report) => println!("  ✅ {}: {} chunks", path.display(), report.num_chunks),
            Err(e) => {
                println!("  ❌ {}: {e}", path.display());
                failures += 1;
            }
        }
    }

    println!("\n  Index now holds {} chunks.", services.index.count().await?);

    if failures > 0 {
        return Err(format!("{failures} file(s) failed to ingest").into());
    }
    Ok(())
}

/// Read a file from disk and hand it to the ingestor.
pub async fn ingest_path(
    services: &Services,
    path: &Path,
) -> Result<IngestReport, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let report = services
        .ingestor
        .ingest(UploadedFile {
            file_name,
            mime_type: None,
            bytes,
        })
        .await?;
    Ok(report)
}
