//! rustlog-store: offline inspection CLI for RustLog store files
//!
//! Commands:
//! - append <file> <payload>
//! - read <file> <offset>
//! - dump <file>
//! - stat <file>
//!
//! All output is JSON for script-friendly parsing. Logs go to stderr.
//! Never point this at a file a running broker has open: the store assumes it
//! is the only writer.

use rustlog_store::{FrameScanner, Store, StoreConfig};
use serde_json::json;
use std::fs::{File, OpenOptions};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = &args[1];

    let result = match command.as_str() {
        "append" => {
            if args.len() < 4 {
                eprintln!("Usage: rustlog-store append <file> <payload>");
                std::process::exit(1);
            }
            append(&args[2], &args[3])
        }
        "read" => {
            if args.len() < 4 {
                eprintln!("Usage: rustlog-store read <file> <offset>");
                std::process::exit(1);
            }
            let offset: u64 = args[3]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid offset: {}", args[3]))?;
            read(&args[2], offset)
        }
        "dump" => {
            if args.len() < 3 {
                eprintln!("Usage: rustlog-store dump <file>");
                std::process::exit(1);
            }
            dump(&args[2])
        }
        "stat" => {
            if args.len() < 3 {
                eprintln!("Usage: rustlog-store stat <file>");
                std::process::exit(1);
            }
            stat(&args[2])
        }
        _ => {
            print_usage();
            return Ok(());
        }
    };

    if let Err(e) = result {
        let output = json!({
            "status": "error",
            "message": e.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rustlog_store=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_usage() {
    println!("rustlog-store: inspect and edit RustLog store files offline");
    println!();
    println!("Usage:");
    println!("  rustlog-store append <file> <payload>");
    println!("  rustlog-store read <file> <offset>");
    println!("  rustlog-store dump <file>");
    println!("  rustlog-store stat <file>");
    println!();
    println!("Environment:");
    println!("  RUSTLOG_STORE_BUFFER_BYTES    write buffer size in bytes");
    println!("  RUSTLOG_STORE_SYNC_ON_CLOSE   fsync on close (true/false)");
    println!("  RUST_LOG                      log filter (default rustlog_store=info)");
    println!();
    println!("Examples:");
    println!("  rustlog-store append orders.store 'hello world'");
    println!("  rustlog-store read orders.store 19");
    println!("  rustlog-store dump orders.store");
}

fn append(path: &str, payload: &str) -> anyhow::Result<()> {
    let store = Store::open_path_with_config(path, StoreConfig::from_env())?;
    let (width, offset) = store.append(payload.as_bytes())?;
    store.close()?;

    tracing::info!(path, offset, width, "appended record");

    let output = json!({
        "status": "success",
        "offset": offset,
        "width": width,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read(path: &str, offset: u64) -> anyhow::Result<()> {
    // Existing files only: reading must not create an empty store
    let file = OpenOptions::new().read(true).append(true).open(path)?;
    let store = Store::open_with_config(file, StoreConfig::from_env())?;
    let payload = store.read(offset)?;
    store.close()?;

    let output = json!({
        "offset": offset,
        "length": payload.len(),
        "payload": String::from_utf8_lossy(&payload),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn dump(path: &str) -> anyhow::Result<()> {
    let file = File::open(path)?;

    let mut frames = Vec::new();
    for frame in FrameScanner::new(&file) {
        let frame = frame?;
        frames.push(json!({
            "offset": frame.offset,
            "length": frame.payload.len(),
            "payload": String::from_utf8_lossy(&frame.payload),
        }));
    }

    println!("{}", serde_json::to_string_pretty(&frames)?);
    Ok(())
}

fn stat(path: &str) -> anyhow::Result<()> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut scanner = FrameScanner::new(&file);
    let mut frames = 0u64;
    let mut corruption = None;
    for frame in scanner.by_ref() {
        match frame {
            Ok(_) => frames += 1,
            Err(e) => corruption = Some(e.to_string()),
        }
    }
    let valid_bytes = scanner.valid_len();

    if let Some(reason) = &corruption {
        tracing::warn!(path, valid_bytes, "store has a torn tail: {}", reason);
    }

    let output = json!({
        "size": size,
        "frames": frames,
        "valid_bytes": valid_bytes,
        "torn_bytes": size.saturating_sub(valid_bytes),
        "corruption": corruption,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
