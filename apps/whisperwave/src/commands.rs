use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use shared::domain::ModelSize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Files,
    Refresh,
    Pick(PathBuf),
    Model(ModelSize),
    Upload,
    Confirm(bool),
    Cancel,
    Select(String),
    Delete(String),
    Show,
    Export(PathBuf),
    Download { filename: String, dest_dir: PathBuf },
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  files                   list uploaded files (* marks the selection)
  refresh                 reload the file list from the server
  pick <path>             choose a local file to upload
  model <size>            tiny | base | small | medium | large
  upload                  upload the picked file
  yes | no                answer an overwrite prompt
  cancel                  cancel the upload in flight
  select <name>           view a transcript (again to deselect)
  delete <name>           delete an uploaded file
  show                    print the transcript view
  export <path>           save the displayed transcript
  download <name> <dir>   save uploaded media into a directory
  status                  show upload state
  help                    this text
  quit                    exit";

pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "files" | "ls" => Command::Files,
        "refresh" => Command::Refresh,
        "pick" => Command::Pick(PathBuf::from(required(rest, "pick <path>")?)),
        "model" => {
            let size = required(rest, "model <size>")?;
            Command::Model(size.parse::<ModelSize>()?)
        }
        "upload" => Command::Upload,
        "yes" | "y" => Command::Confirm(true),
        "no" | "n" => Command::Confirm(false),
        "cancel" => Command::Cancel,
        "select" => Command::Select(required(rest, "select <name>")?.to_string()),
        "delete" | "rm" => Command::Delete(required(rest, "delete <name>")?.to_string()),
        "show" => Command::Show,
        "export" => Command::Export(PathBuf::from(required(rest, "export <path>")?)),
        "download" => {
            let usage = "download <name> <dir>";
            let (filename, dest_dir) = required(rest, usage)?
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: {usage}"))?;
            Command::Download {
                filename: filename.trim().to_string(),
                dest_dir: PathBuf::from(dest_dir),
            }
        }
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command `{other}`; type `help`"),
    };
    Ok(Some(command))
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(rest)
}
