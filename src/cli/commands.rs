//! CLI command implementations
//!
//! Every command loads the configuration, opens the image and runs a status
//! check before touching stored data, so a command run after a power loss
//! sees the repaired image.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::blob::Blob;
use crate::config::{EngineKind, FlashConfig};
use crate::io::{Callbacks, FileFlash};
use crate::log::Log;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// An opened engine context over the configured image
enum Engine {
    Blob(Blob),
    Log(Log),
}

impl Engine {
    fn open(config_path: &Path) -> CliResult<(FlashConfig, Self)> {
        let config = FlashConfig::load(config_path)?;
        let flash = FileFlash::open_or_create(config.image_path(), config.total_pages, config.page_len)
            .map_err(|e| {
                CliError::io_error(format!(
                    "failed to open image {}: {}",
                    config.image_path().display(),
                    e
                ))
            })?;
        let callbacks = Callbacks::new(flash).with_write_verify(config.write_verify);
        let engine = match config.engine {
            EngineKind::Blob => Engine::Blob(Blob::init(config.settings(), callbacks)?),
            EngineKind::Log => Engine::Log(Log::init(config.settings(), callbacks)?),
        };
        Ok((config, engine))
    }

    fn name(&self) -> &'static str {
        match self {
            Engine::Blob(_) => "blob",
            Engine::Log(_) => "log",
        }
    }

    fn into_blob(self, command: &str) -> CliResult<Blob> {
        match self {
            Engine::Blob(blob) => Ok(blob),
            Engine::Log(_) => Err(CliError::wrong_engine(command, "blob")),
        }
    }

    fn into_log(self, command: &str) -> CliResult<Log> {
        match self {
            Engine::Log(log) => Ok(log),
            Engine::Blob(_) => Err(CliError::wrong_engine(command, "log")),
        }
    }
}

/// Parse arguments and run the command. Failures are also reported as an
/// error response on stdout.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Format { config } => format(&config),
        Command::Status { config } => status(&config),
        Command::Info { config } => info(&config),
        Command::BlobWrite {
            config,
            input,
            chunk,
        } => blob_write(&config, &input, chunk as usize),
        Command::BlobRead {
            config,
            output,
            offset,
            len,
        } => blob_read(&config, &output, offset, len),
        Command::LogAppend { config, data } => log_append(&config, &data),
        Command::LogDump { config } => log_dump(&config),
    }
}

/// Format the image. Whatever it held is lost.
pub fn format(config_path: &Path) -> CliResult<()> {
    let (_, engine) = Engine::open(config_path)?;
    let name = engine.name();
    match engine {
        Engine::Blob(mut blob) => blob.format()?,
        Engine::Log(mut log) => log.format()?,
    }
    write_response(json!({"formatted": true, "engine": name}))
}

/// Run a status check and report health, contents and counters.
pub fn status(config_path: &Path) -> CliResult<()> {
    let (_, engine) = Engine::open(config_path)?;
    let data = match engine {
        Engine::Blob(mut blob) => {
            let health = blob.get_storage_status()?;
            json!({
                "engine": "blob",
                "health": health,
                "info": blob.get_info()?,
                "metrics": blob.metrics(),
            })
        }
        Engine::Log(mut log) => {
            let health = log.get_storage_status()?;
            json!({
                "engine": "log",
                "health": health,
                "info": log.get_info()?,
                "metrics": log.metrics(),
            })
        }
    };
    write_response(data)
}

/// Report what the image holds.
pub fn info(config_path: &Path) -> CliResult<()> {
    let (_, engine) = Engine::open(config_path)?;
    let data = match engine {
        Engine::Blob(mut blob) => {
            blob.get_storage_status()?;
            serde_json::to_value(blob.get_info()?)?
        }
        Engine::Log(mut log) => {
            log.get_storage_status()?;
            serde_json::to_value(log.get_info()?)?
        }
    };
    write_response(data)
}

/// Replace the blob with the contents of `input`, `chunk` bytes per append.
pub fn blob_write(config_path: &Path, input: &Path, chunk: usize) -> CliResult<()> {
    let payload = fs::read(input)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", input.display(), e)))?;

    let (_, engine) = Engine::open(config_path)?;
    let mut blob = engine.into_blob("blob-write")?;
    blob.get_storage_status()?;

    blob.start_write()?;
    for piece in payload.chunks(chunk) {
        blob.append_data(piece)?;
    }
    blob.end_write()?;

    write_response(json!({
        "written": payload.len(),
        "info": blob.get_info()?,
    }))
}

/// Copy `len` bytes of the blob starting at `offset` into `output`.
pub fn blob_read(
    config_path: &Path,
    output: &Path,
    offset: u32,
    len: Option<usize>,
) -> CliResult<()> {
    let (_, engine) = Engine::open(config_path)?;
    let mut blob = engine.into_blob("blob-read")?;
    blob.get_storage_status()?;

    let info = blob.get_info()?;
    let len = len.unwrap_or_else(|| info.size.saturating_sub(offset) as usize);
    let mut contents = vec![0u8; len];
    blob.read_blob(offset, len, &mut contents)?;
    fs::write(output, &contents)
        .map_err(|e| CliError::io_error(format!("failed to write {}: {}", output.display(), e)))?;

    write_response(json!({
        "read": len,
        "offset": offset,
        "sequence_number": info.sequence_number,
    }))
}

/// Append one record.
pub fn log_append(config_path: &Path, data: &str) -> CliResult<()> {
    let (_, engine) = Engine::open(config_path)?;
    let mut log = engine.into_log("log-append")?;
    log.get_storage_status()?;

    let sequence_number = log.append(data.as_bytes())?;
    write_response(json!({
        "sequence_number": sequence_number,
        "info": log.get_info()?,
    }))
}

/// Print every record, oldest first.
pub fn log_dump(config_path: &Path) -> CliResult<()> {
    let (config, engine) = Engine::open(config_path)?;
    let mut log = engine.into_log("log-dump")?;
    log.get_storage_status()?;

    let info = log.get_info()?;
    let first_sequence = info.next_sequence.wrapping_sub(info.count);
    let mut buf = vec![0u8; config.page_len];
    let mut records = Vec::with_capacity(info.count as usize);
    for position in 0..info.count {
        let len = log.read(position, &mut buf)?;
        records.push(record_json(
            position,
            first_sequence.wrapping_add(position),
            &buf[..len],
        ));
    }

    write_response(json!({
        "info": info,
        "records": records,
    }))
}

fn record_json(position: u32, sequence_number: u32, bytes: &[u8]) -> Value {
    json!({
        "position": position,
        "sequence_number": sequence_number,
        "data": String::from_utf8_lossy(bytes),
    })
}
