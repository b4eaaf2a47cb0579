//! Classify a settings change the way a running session would.

use std::path::PathBuf;

use clap::Args;
use patchrome_session::SettingsChange;

use super::common::load_settings;

#[derive(Args)]
pub struct DiffArgs {
    /// Settings currently applied
    pub old: PathBuf,

    /// Settings about to be applied
    pub new: PathBuf,
}

pub fn run(args: DiffArgs) -> anyhow::Result<()> {
    let old = load_settings(&args.old)?;
    let new = load_settings(&args.new)?;

    match SettingsChange::between(&old, &new) {
        SettingsChange::Unchanged => println!("unchanged"),
        SettingsChange::Rebuild => println!("rebuild"),
        SettingsChange::Params(changes) => {
            println!("update ({} node(s))", changes.len());
            for change in changes {
                let params: Vec<String> = change
                    .params
                    .iter()
                    .map(|(k, v)| format!("{k}={}", serde_json::to_string(v).unwrap_or_default()))
                    .collect();
                println!("  {}: {}", change.node_id, params.join(" "));
            }
        }
    }
    Ok(())
}
