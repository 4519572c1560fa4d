use std::collections::VecDeque;
use std::io::Write;

use gracker_kyc::infra::{verify_chain, AuditStore, ChainVerification, SqliteAuditStore};
use gracker_kyc::infra::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};

fn print_help() {
    eprintln!(
        "\
gracker-kyc-admin

USAGE:
  gracker-kyc-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  verify-ledger                   Check integrity of the persisted ledger
  export-ledger                   Export ledger blocks to JSON/NDJSON
  recent                          Print the most recent audit records

COMMON OPTIONS:
  --database-url <sqlite_url>     (defaults to env DATABASE_URL)

export-ledger OPTIONS:
  --output <path>                 (optional) Output file path (default: stdout)
  --format <json|ndjson>          (default: json)

recent OPTIONS:
  --limit <n>                     (default: 50, max: 500)
"
    );
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    let url = database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))?;
    if !url.starts_with("sqlite:") {
        anyhow::bail!("admin commands need a sqlite: database url, got {url:?}");
    }
    Ok(url)
}

fn next_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

async fn open_store(database_url: Option<String>) -> anyhow::Result<SqliteAuditStore> {
    let database_url = require_database_url(database_url)?;
    let store = SqliteAuditStore::connect(&database_url, 1, true).await?;
    store.initialize().await?;
    Ok(store)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "migrate" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let store = open_store(database_url).await?;
            store.close().await;
            println!("ok: migrations applied");
            Ok(())
        }
        "verify-ledger" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let store = open_store(database_url).await?;
            let blocks = store.load_blocks().await?;
            store.close().await;

            if blocks.is_empty() {
                println!("ok: no ledger blocks persisted");
                return Ok(());
            }

            let violation = verify_chain(&blocks).err();
            let report = ChainVerification {
                valid: violation.is_none(),
                length: blocks.len(),
                head_hash: blocks.last().map(|b| b.hash.clone()),
                violation,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);

            if let Some(v) = report.violation {
                anyhow::bail!("ledger integrity violation at block {}: {}", v.index, v.reason);
            }
            Ok(())
        }
        "export-ledger" => {
            let mut database_url: Option<String> = None;
            let mut output: Option<String> = None;
            let mut format = ExportFormat::Json;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "--output" => output = Some(next_value(&mut args, &arg)?),
                    "--format" => {
                        format = match next_value(&mut args, &arg)?.as_str() {
                            "json" => ExportFormat::Json,
                            "ndjson" => ExportFormat::Ndjson,
                            other => anyhow::bail!("unsupported --format: {other}"),
                        };
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let store = open_store(database_url).await?;
            let blocks = store.load_blocks().await?;
            store.close().await;

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };

            match format {
                ExportFormat::Json => {
                    serde_json::to_writer_pretty(&mut writer, &blocks)?;
                    writeln!(writer)?;
                }
                ExportFormat::Ndjson => {
                    for block in &blocks {
                        serde_json::to_writer(&mut writer, block)?;
                        writeln!(writer)?;
                    }
                }
            }
            writer.flush()?;

            if let Some(path) = output {
                eprintln!("ok: exported {} blocks to {path}", blocks.len());
            }
            Ok(())
        }
        "recent" => {
            let mut database_url: Option<String> = None;
            let mut limit: u32 = DEFAULT_RECENT_LIMIT;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "--limit" => limit = next_value(&mut args, &arg)?.parse()?,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let store = open_store(database_url).await?;
            let records = store.recent(limit.min(MAX_RECENT_LIMIT)).await?;
            store.close().await;

            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
