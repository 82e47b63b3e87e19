use eyre::Context;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_playlists::config::Config;
use youtube_playlists::console::StdConsole;
use youtube_playlists::{connect, menu};

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cwd = std::env::current_dir().context("determine working directory")?;
    let config = match Config::load_from(&cwd) {
        Ok(config) => config,
        Err(e) if e.is_missing() => {
            println!("{e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("load configuration"),
    };

    let client = connect(&config).await?;
    menu::run(&client, &mut StdConsole, &config.guided_plan()).await
}
