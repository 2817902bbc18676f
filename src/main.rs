use std::error::Error;

use graph_builder::BuildConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from a .env file when present.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = BuildConfig::from_env()?;
    info!(root = %config.root_path.display(), "starting graph build");

    let build = lsp_resolver::build_full(&config).await?;
    info!(
        nodes = build.nodes.len(),
        relationships = build.relationships.len(),
        warnings = build.warnings.len(),
        "graph build finished"
    );

    match std::env::var("REPOGRAPH_OUT") {
        Ok(out_dir) => {
            let out = std::path::Path::new(&out_dir);
            std::fs::create_dir_all(out)?;
            let mut nodes = std::io::BufWriter::new(std::fs::File::create(out.join("nodes.jsonl"))?);
            graph_builder::export::write_nodes_jsonl(&mut nodes, &build.nodes)?;
            let mut rels =
                std::io::BufWriter::new(std::fs::File::create(out.join("relationships.jsonl"))?);
            graph_builder::export::write_relationships_jsonl(&mut rels, &build.relationships)?;
            let summary = serde_json::json!({
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "summary": build.summary(),
                "warnings": build.warnings,
            });
            std::fs::write(out.join("summary.json"), serde_json::to_vec_pretty(&summary)?)?;
            info!(out_dir = %out.display(), "artifacts saved");
        }
        Err(_) => {
            let envelope = serde_json::json!({
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "graph": build,
            });
            println!("{}", serde_json::to_string(&envelope)?);
        }
    }

    Ok(())
}
