use anyhow::{Context, Result};
use splitfetch_core::Settings;

/// Print the configuration directory, and the tools directory beneath it.
pub fn config_dir(tools: bool) -> Result<()> {
    let settings = Settings::from_env()
        .context("Could not determine the configuration directory; set SPLITFETCH_HOME")?;
    if tools {
        println!("{}", settings.tools_dir().display());
    } else {
        println!("{}", settings.home.display());
    }
    Ok(())
}
