//! Structural validation of a graph description.

use std::path::PathBuf;

use clap::Args;

use super::common::load_settings;

#[derive(Args)]
pub struct ValidateArgs {
    /// Settings or graph description JSON
    pub file: PathBuf,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.file)?;
    let issues = settings.audio_graph.issues();
    if issues.is_empty() {
        println!(
            "{}: ok ({} nodes, {} edges)",
            args.file.display(),
            settings.audio_graph.nodes.len(),
            settings.audio_graph.edges.len()
        );
        return Ok(());
    }

    for issue in &issues {
        println!("{}: {}", args.file.display(), issue);
    }
    // The builder still runs on flawed graphs; report, don't refuse
    tracing::warn!(count = issues.len(), "graph has issues");
    anyhow::bail!("{} issue(s) found", issues.len())
}
