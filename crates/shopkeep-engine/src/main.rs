//! # shopkeep
//!
//! Maintenance commands against a Shopkeep database. Results go to stdout
//! as JSON; logs go to stderr.
//!
//! ```text
//! shopkeep migrate                  apply pending migrations
//! shopkeep summary                  today's dashboard
//! shopkeep audit <product-id>       replay one product's ledger
//! shopkeep audit --all              replay every product's ledger
//! ```
//!
//! `--db <PATH>` overrides `SHOPKEEP_DB_PATH`.

use std::env;
use std::process::ExitCode;

use serde::Serialize;
use tracing::info;

use shopkeep_engine::telemetry::init_tracing;
use shopkeep_engine::{Engine, EngineConfig};

#[derive(Debug)]
enum Command {
    Migrate,
    Summary,
    Audit(String),
    AuditAll,
}

fn print_help() {
    println!("Shopkeep stock ledger and register tools");
    println!();
    println!("Usage: shopkeep [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  migrate               Apply pending database migrations");
    println!("  summary               Print today's dashboard summary");
    println!("  audit <PRODUCT_ID>    Replay a product's movements and compare stock");
    println!("  audit --all           Audit every product");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>       Database file path (default: $SHOPKEEP_DB_PATH or data dir)");
    println!("  -h, --help            Show this help message");
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config = EngineConfig::from_env();
    let mut positional: Vec<String> = Vec::new();
    let mut all = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--all" => all = true,
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        Some("migrate") => Command::Migrate,
        Some("summary") => Command::Summary,
        Some("audit") if all => Command::AuditAll,
        Some("audit") => match positional.get(1) {
            Some(id) => Command::Audit(id.clone()),
            None => {
                eprintln!("audit needs a product id or --all");
                return Ok(ExitCode::from(2));
            }
        },
        _ => {
            print_help();
            return Ok(ExitCode::from(2));
        }
    };

    let engine = Engine::connect(config).await?;

    let code = match command {
        Command::Migrate => {
            engine.database().run_migrations().await?;
            let (embedded, applied) = engine.database().migration_status().await?;
            info!(embedded, applied, "Migration status");
            print_json(&serde_json::json!({ "embedded": embedded, "applied": applied }))?;
            ExitCode::SUCCESS
        }
        Command::Summary => {
            print_json(&engine.dashboard_summary().await?)?;
            ExitCode::SUCCESS
        }
        Command::Audit(product_id) => {
            let audit = engine.audit_product(&product_id).await?;
            print_json(&audit)?;
            if audit.consistent {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::AuditAll => {
            let mut audits = Vec::new();
            for product in engine.list_products().await? {
                audits.push(engine.audit_product(&product.id).await?);
            }
            let broken = audits.iter().filter(|a| !a.consistent).count();
            info!(products = audits.len(), broken, "Audit finished");
            print_json(&audits)?;
            if broken == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    };

    engine.database().close().await;
    Ok(code)
}
