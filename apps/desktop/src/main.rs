use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{ClientSettings, Coordinator, SubmitOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Settings file; `client.toml` in the working directory is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    /// Text to convert once the page has loaded.
    #[arg(long)]
    text: Option<String>,
    /// Where to write the converted audio.
    #[arg(long, requires = "text")]
    save_audio: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = ClientSettings::load(args.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }

    let coordinator = Coordinator::from_settings(&settings)?;
    if let Some(tasks) = coordinator.mount() {
        tasks.settled().await;
    }
    println!("{}\n", coordinator.view());

    if let Some(text) = args.text {
        coordinator.set_input(text);
        match coordinator.submit().await {
            SubmitOutcome::Converted { url } => {
                if let Some(path) = &args.save_audio {
                    let blob = coordinator
                        .audio_store()
                        .resolve(&url)
                        .ok_or_else(|| anyhow!("audio {url} was released before saving"))?;
                    tokio::fs::write(path, &*blob.bytes)
                        .await
                        .with_context(|| format!("failed to write audio to '{}'", path.display()))?;
                    println!(
                        "Saved {} bytes of {} to {}",
                        blob.bytes.len(),
                        blob.mime,
                        path.display()
                    );
                }
            }
            SubmitOutcome::Skipped(reason) => println!("Nothing to convert ({reason:?})."),
            SubmitOutcome::Discarded | SubmitOutcome::Failed => {}
        }
        println!("{}", coordinator.view());
    }

    coordinator.unmount();
    Ok(())
}
