//! Fetch command: download a package and assemble its splits

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use splitfetch_core::{
    Chooser, Decline, MergeStrategy, Pipeline, Reporter, Settings, build_client,
};
use splitfetch_schema::StoreReply;

use crate::ui::{ConsoleReporter, StdinChooser};

/// Options of one `fetch` invocation.
#[derive(Debug)]
pub struct FetchArgs<'a> {
    pub package: &'a str,
    pub reply: &'a Path,
    pub method: Option<MergeStrategy>,
    pub name: Option<String>,
    pub output_dir: &'a Path,
    pub no_interactive: bool,
}

fn read_reply(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read store reply from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read store reply {}", path.display()))
}

pub async fn fetch(args: FetchArgs<'_>) -> Result<()> {
    let settings = Settings::from_env()
        .context("Could not determine the configuration directory; set SPLITFETCH_HOME")?;

    let text = read_reply(args.reply)?;
    let mut descriptor = StoreReply::from_json(&text)
        .and_then(|reply| reply.into_descriptor(args.package))
        .context("Store reply has no usable download links")?;
    if let Some(name) = args.name {
        descriptor = descriptor.with_display_name(name);
    }

    let reporter = Arc::new(ConsoleReporter::new());
    let client = build_client(settings.read_timeout).context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new(&settings, client, args.output_dir, reporter.clone());

    // Reading the reply from stdin leaves nothing to prompt on
    let chooser: &dyn Chooser = if args.no_interactive || args.reply.as_os_str() == "-" {
        &Decline
    } else {
        &StdinChooser
    };

    // The pipeline reports the artifact and any degraded outcome itself
    match pipeline.run(&descriptor, args.method, chooser).await {
        Ok(_) => Ok(()),
        Err(e) => {
            reporter.error(&format!("Could not fetch {}", args.package));
            if e.is_setup_problem() {
                reporter.info("Run `splitfetch check` to see which tools are missing");
            }
            Err(e).with_context(|| format!("Failed to fetch {}", args.package))
        }
    }
}
