use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{load_settings, LocalFile, TranscriptionClient, UploadStatus};
use shared::domain::ModelSize;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

use commands::Command;
use console::ConsoleNotifier;

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the WhisperWave transcription service")]
struct Args {
    /// Settings file; defaults to ./whisperwave.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    model_size: Option<ModelSize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("loading settings")?;
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    if let Some(size) = args.model_size {
        settings.default_model_size = size;
    }
    info!(api = %settings.api_base_url, model_size = %settings.default_model_size, "starting");

    let client = Arc::new(
        TranscriptionClient::connect(&settings, Arc::new(ConsoleNotifier))
            .context("building API client")?,
    );
    let mut events = client.subscribe_events();
    client.registry.refresh().await;
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(err) = execute(&client, command, &mut lines).await {
                            println!("error: {err:#}");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = console::event_line(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    if client.uploads.status().await == UploadStatus::Uploading {
        client.uploads.cancel_upload().await;
    }
    Ok(())
}

async fn execute(
    client: &Arc<TranscriptionClient>,
    command: Command,
    lines: &mut InputLines,
) -> Result<()> {
    match command {
        Command::Files => {
            let selected = client.selection.selected_filename().await;
            let records = client.registry.records().await;
            if records.is_empty() {
                println!("no files uploaded");
            }
            for record in &records {
                let is_selected = selected.as_deref() == Some(record.filename.as_str());
                println!("{}", console::file_line(record, is_selected));
            }
        }
        Command::Refresh => {
            client.registry.refresh().await;
        }
        Command::Pick(path) => {
            let file = LocalFile::from_path(path)?;
            let name = file.name().to_string();
            if client.uploads.select_local_file(file).await {
                println!("picked {name}");
            } else {
                println!("an upload is in progress; cancel it first");
            }
        }
        Command::Model(size) => {
            client.uploads.set_model_size(size).await;
            println!("model size set to {size}");
        }
        Command::Upload => {
            let client = Arc::clone(client);
            tokio::spawn(async move {
                let outcome = client.uploads.submit_upload().await;
                if let Some(line) = console::outcome_line(&outcome) {
                    println!("{line}");
                }
            });
        }
        Command::Confirm(confirmed) => {
            let client = Arc::clone(client);
            tokio::spawn(async move {
                let outcome = client.uploads.resolve_conflict(confirmed).await;
                if let Some(line) = console::outcome_line(&outcome) {
                    println!("{line}");
                }
            });
        }
        Command::Cancel => {
            if !client.uploads.cancel_upload().await {
                println!("no upload in progress");
            }
        }
        Command::Select(filename) => {
            if !client.registry.contains(&filename).await {
                println!("unknown file '{filename}'; try `refresh`");
                return Ok(());
            }
            client.selection.select(&filename).await;
        }
        Command::Delete(filename) => {
            println!("Delete '{filename}'? [y/N]");
            let answer = lines.next_line().await.context("reading confirmation")?;
            let confirmed = matches!(
                answer.as_deref().map(str::trim),
                Some("y" | "Y" | "yes" | "YES")
            );
            if confirmed {
                client.registry.delete(&filename).await;
            } else {
                println!("delete skipped");
            }
        }
        Command::Show => {
            println!("{}", console::transcript_text(&client.transcripts.view().await));
        }
        Command::Export(path) => {
            client
                .transcripts
                .export(&path)
                .await
                .with_context(|| format!("exporting to {}", path.display()))?;
            println!("saved transcript to {}", path.display());
        }
        Command::Download { filename, dest_dir } => {
            let saved = client.registry.download(&filename, &dest_dir).await?;
            println!("saved {}", saved.display());
        }
        Command::Status => {
            let uploads = &client.uploads;
            println!("upload: {}", console::status_label(uploads.status().await));
            println!(
                "picked file: {}",
                uploads
                    .pending_file_name()
                    .await
                    .unwrap_or_else(|| "-".to_string())
            );
            if let Some(conflict) = uploads.conflicting_filename().await {
                println!("awaiting overwrite answer for {conflict}");
            }
            println!("model size: {}", uploads.model_size().await);
            println!(
                "selected: {}",
                client
                    .selection
                    .selected_filename()
                    .await
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
    Ok(())
}
