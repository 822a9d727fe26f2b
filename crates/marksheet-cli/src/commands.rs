use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use marksheet_ledger::FileLedger;
use marksheet_server::MarksheetServer;
use marksheet_store::{Marksheet, QueryResult, Record};
use serde::Serialize;

use crate::cli::*;
use crate::config::Config;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    let session = Session::open(&config, cli.data.as_deref(), cli.format)?;
    match cli.command {
        Command::Seed => session.seed(),
        Command::Add(args) => session.add(args),
        Command::Get(args) => session.get(&args.key),
        Command::Find(args) => session.find(&args.identifier),
        Command::All => session.all(),
        Command::Update(args) => session.update(&args.identifier, &args.mark),
        Command::Serve(args) => session.serve(config, args),
        Command::Compact => session.compact(),
    }
}

/// A service opened over the ledger file for one command.
pub struct Session {
    ledger: Arc<FileLedger>,
    service: Arc<Marksheet>,
    format: OutputFormat,
}

impl Session {
    pub fn open(config: &Config, data: Option<&Path>, format: OutputFormat) -> anyhow::Result<Self> {
        let path = config.ledger_path(data);
        let ledger = Arc::new(
            FileLedger::open_with(&path, config.ledger.sync)
                .with_context(|| format!("opening ledger {}", path.display()))?,
        );
        let service = Arc::new(Marksheet::new(ledger.clone(), &config.store)?);
        tracing::debug!(path = %path.display(), ?service, "session opened");
        Ok(Self {
            ledger,
            service,
            format,
        })
    }

    #[cfg(test)]
    pub fn service(&self) -> &Marksheet {
        &self.service
    }

    fn seed(&self) -> anyhow::Result<()> {
        let keys = self.service.seed()?;
        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({ "seeded": keys })),
            OutputFormat::Text => {
                println!("{} Seeded {} records", "✓".green().bold(), keys.len());
                println!("  Keys: {} .. {}", first(&keys).yellow(), last(&keys).yellow());
                Ok(())
            }
        }
    }

    fn add(&self, args: AddArgs) -> anyhow::Result<()> {
        let mut record = Record::new(args.name, args.year, args.board, args.mark);
        record.rollno = args.rollno;
        self.service.create(&args.key, &record)?;
        match self.format {
            OutputFormat::Json => print_json(&QueryResult::new(args.key, record)),
            OutputFormat::Text => {
                println!("{} Stored {}", "✓".green().bold(), args.key.yellow());
                Ok(())
            }
        }
    }

    fn get(&self, key: &str) -> anyhow::Result<()> {
        let record = self.service.get(key)?;
        self.print_one(&QueryResult::new(key, record))
    }

    fn find(&self, identifier: &str) -> anyhow::Result<()> {
        let found = self.service.find(identifier)?;
        self.print_one(&found)
    }

    fn all(&self) -> anyhow::Result<()> {
        let all = self.service.get_all()?;
        match self.format {
            OutputFormat::Json => print_json(&all),
            OutputFormat::Text if all.is_empty() => {
                println!("No records.");
                Ok(())
            }
            OutputFormat::Text => {
                for row in &all {
                    print_row(row);
                }
                println!("{} records", all.len().to_string().bold());
                Ok(())
            }
        }
    }

    fn update(&self, identifier: &str, mark: &str) -> anyhow::Result<()> {
        let updated = self.service.update(identifier, mark)?;
        match self.format {
            OutputFormat::Json => print_json(&updated),
            OutputFormat::Text => {
                println!(
                    "{} {} mark set to {}",
                    "✓".green().bold(),
                    updated.key.yellow(),
                    updated.record.mark.bold()
                );
                Ok(())
            }
        }
    }

    fn serve(&self, config: Config, args: ServeArgs) -> anyhow::Result<()> {
        let mut server_config = config.server;
        if let Some(bind) = args.bind {
            server_config.bind_addr = bind;
        }
        server_config.seed_on_start |= args.seed;

        let server = MarksheetServer::new(server_config, self.service.clone());
        let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
        runtime.block_on(server.serve())?;
        Ok(())
    }

    fn compact(&self) -> anyhow::Result<()> {
        let reclaimed = self.ledger.compact()?;
        let size = self.ledger.log_size()?;
        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "reclaimed_bytes": reclaimed,
                "log_bytes": size,
                "entries": self.ledger.len(),
            })),
            OutputFormat::Text => {
                println!(
                    "{} Compacted {}: {} bytes reclaimed, {} entries",
                    "✓".green().bold(),
                    self.ledger.path().display().to_string().bold(),
                    reclaimed,
                    self.ledger.len()
                );
                Ok(())
            }
        }
    }

    fn print_one(&self, row: &QueryResult) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => print_json(row),
            OutputFormat::Text => {
                print_row(row);
                Ok(())
            }
        }
    }
}

fn print_row(row: &QueryResult) {
    let r = &row.record;
    println!(
        "{:<12} {:<10} {:<6} {:<6} mark {:<5} roll {}",
        row.key.yellow(),
        r.name.bold(),
        r.year,
        r.board.cyan(),
        r.mark.green(),
        r.rollno.as_deref().unwrap_or("-").dimmed()
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn first(keys: &[String]) -> &str {
    keys.first().map(String::as_str).unwrap_or("-")
}

fn last(keys: &[String]) -> &str {
    keys.last().map(String::as_str).unwrap_or("-")
}
