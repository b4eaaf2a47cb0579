//! Block processor listing.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use patchrome_graph::processor_descriptors;

#[derive(Args)]
pub struct ProcessorsArgs {
    /// Show parameters for a single processor
    #[arg(value_name = "NAME")]
    name: Option<String>,

    /// Print descriptors as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ProcessorsArgs) -> anyhow::Result<()> {
    let descriptors: Vec<_> = processor_descriptors()
        .filter(|d| args.name.as_deref().is_none_or(|n| d.name == n))
        .collect();
    if descriptors.is_empty() {
        anyhow::bail!(
            "Unknown processor: {}",
            args.name.as_deref().unwrap_or_default()
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    for descriptor in descriptors {
        println!("{}", descriptor.name);
        println!(
            "  {:12}  {:>10}  {:>10}  {:>10}  {}",
            "Name", "Default", "Min", "Max", "Rate"
        );
        for param in descriptor.params {
            println!(
                "  {:12}  {:>10}  {:>10}  {:>10}  {}",
                param.name,
                format!("{}{}", param.default, param.unit.suffix()),
                param.min,
                param.max,
                param.automation_rate.as_str()
            );
        }
        println!();
    }
    Ok(())
}
