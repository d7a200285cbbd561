//! Check command: capability report for merge methods and tools
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use splitfetch_core::{Probe, Settings, SystemProbe, ToolKind, enumerate_methods, probe_dependencies};

pub fn check(json: bool) -> Result<()> {
    let settings = Settings::from_env()
        .context("Could not determine the configuration directory; set SPLITFETCH_HOME")?;
    let probe = SystemProbe::new(&settings);

    let methods = enumerate_methods(&probe);
    let dependencies = probe_dependencies(&probe);

    if json {
        let deps: Vec<_> = dependencies
            .iter()
            .map(|(dep, availability)| {
                serde_json::json!({
                    "name": dep.name(),
                    "available": availability.available,
                    "status": availability.status,
                })
            })
            .collect();
        let report = serde_json::json!({
            "tools_dir": settings.tools_dir(),
            "methods": methods,
            "dependencies": deps,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let label_width = 38;

    println!();
    println!("{}", "Merge methods".dark_grey());
    println!();
    for m in &methods {
        let mark = if m.available {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {mark} {}. {:<22}{}",
            m.strategy.id(),
            m.strategy.label(),
            m.status.as_str().dark_grey()
        );
    }

    println!();
    println!("{}", "Dependencies".dark_grey());
    println!();
    for (dep, availability) in &dependencies {
        let mark = if availability.available {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {mark} {:<width$}{}",
            dep.name(),
            availability.status,
            width = label_width
        );
    }

    println!();
    println!("{:<14}{}", "Tools dir:", settings.tools_dir().display());
    for kind in [ToolKind::ApkEditor, ToolKind::Signer] {
        let location = probe
            .locate_tool(kind)
            .map_or_else(|| "not installed".to_string(), |p| p.display().to_string());
        println!("{:<14}{location}", format!("{}:", kind.file_name()));
    }
    println!();
    Ok(())
}
