//! Import command implementation

use super::Options;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use lumina_core::BookRecord;
use std::path::{Path, PathBuf};

/// Import EPUB files into the library
pub async fn import(opts: &Options, files: &[PathBuf], json: bool) -> Result<()> {
    let workspace = super::open(opts).await?;
    let app = &workspace.app;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    if json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut imported: Vec<BookRecord> = Vec::new();
    let mut last_error = None;

    for path in files {
        let name = file_name(path)?;
        pb.set_message(name.clone());

        let result = match tokio::fs::read(path).await {
            Ok(bytes) => app.import_file(&name, bytes).await.map_err(anyhow::Error::from),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };

        match result {
            Ok(record) => {
                tracing::info!(book_id = %record.id, "Imported {}", name);
                imported.push(record);
            }
            Err(e) => {
                if files.len() > 1 {
                    pb.suspend(|| eprintln!("{}: {}", name, describe(&e)));
                }
                last_error = Some(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&imported)?);
    } else {
        for record in &imported {
            println!("{}  {} by {}", record.id, record.title, record.author);
        }
    }

    let failed = files.len() - imported.len();
    match last_error {
        Some(e) if files.len() == 1 => Err(e),
        Some(_) => bail!("{} of {} files could not be imported", failed, files.len()),
        None => Ok(()),
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Not a file: {}", path.display()))
}

fn describe(error: &anyhow::Error) -> String {
    match error.downcast_ref::<lumina_core::LuminaError>() {
        Some(err) => err.user_message(),
        None => format!("{:#}", error),
    }
}
