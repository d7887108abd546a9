//! CLI smoke probe.
//!
//! # Responsibility
//! - Verify `unitscope_core` wiring against a real database file.
//! - Keep output deterministic apart from the generated probe id.
//!
//! Usage: `unitscope <absolute-db-path> [absolute-log-dir]`

use serde::{Deserialize, Serialize};
use std::process::ExitCode;
use unitscope_core::{
    default_log_level, init_logging, Entity, EntityId, ScopedService,
    SqliteContextFactory, StoreConfig,
};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct ProbeRecord {
    id: EntityId,
    note: String,
}

impl Entity for ProbeRecord {
    const KIND: &'static str = "cli_probe";

    fn id(&self) -> EntityId {
        self.id
    }
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        eprintln!("usage: unitscope <absolute-db-path> [absolute-log-dir]");
        return ExitCode::from(2);
    };

    if let Some(log_dir) = args.next() {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run_probe(&db_path) {
        Ok((id, total)) => {
            println!("unitscope_core version={}", unitscope_core::core_version());
            println!("probe id={id}");
            println!("probe rows={total}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={}", err);
            eprintln!("probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_probe(db_path: &str) -> Result<(EntityId, u64), Box<dyn std::error::Error>> {
    let config = StoreConfig::new(db_path)?;
    let service = ScopedService::new(SqliteContextFactory::<ProbeRecord>::new(config));

    let record = ProbeRecord {
        id: Uuid::new_v4(),
        note: "cli smoke probe".to_string(),
    };
    let id = service.run_with_handle(None, |ctx| ctx.insert(&record))?;
    let total = service.run_with_handle(None, |ctx| ctx.count())?;
    Ok((id, total))
}
