use std::path::PathBuf;

use drivemirror::config::SyncConfig;
use drivemirror::runtime::{self, SyncRuntime};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Run,
    Login,
    Logout,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    mode: CliMode,
    config_path: Option<PathBuf>,
}

fn parse_cli_options<I>(args: I) -> anyhow::Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    let mut config_path = None;
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--login" => mode = CliMode::Login,
            "--logout" => mode = CliMode::Logout,
            "--help" | "-h" => mode = CliMode::Help,
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(PathBuf::from(value));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(CliOptions { mode, config_path })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let options = parse_cli_options(std::env::args())?;
    match options.mode {
        CliMode::Login => {
            runtime::login().await?;
            return Ok(());
        }
        CliMode::Logout => {
            runtime::logout()?;
            return Ok(());
        }
        CliMode::Help => {
            println!("Usage: drivemirror [--config <path>] [--login] [--logout]");
            println!("  --config <path>  Read configuration from <path> instead of config.json");
            println!("  --login          Run the interactive authorization flow and exit");
            println!("  --logout         Remove the saved OAuth token and exit");
            return Ok(());
        }
        CliMode::Run => {}
    }
    let config = SyncConfig::load(options.config_path.as_deref())?;
    let runtime = SyncRuntime::bootstrap(config).await?;
    runtime.run().await
}
