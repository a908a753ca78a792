//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the catalogue named by `CARDHOLDER_DB_PATH` and run the
//!   first-launch bootstrap.
//! - Print a metadata summary of the stored sets.

use cardholder_core::{
    init_logging, open_db, CatalogResult, CatalogService, CoreConfig, ItemSet, ListKind,
    NoMockImages, SqliteCatalogRepository,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("cardholder logging disabled: {err}");
        }
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cardholder error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CoreConfig) -> CatalogResult<()> {
    let conn = open_db(&config.db_path)?;
    let repo = SqliteCatalogRepository::try_new(&conn)?;
    let service = CatalogService::new(repo);

    let first_launch = service.bootstrap_first_launch(&mut rand::thread_rng(), &NoMockImages)?;
    info!("event=cli_start module=cli status=ok first_launch={first_launch}");

    println!("cardholder_core version={}", cardholder_core::core_version());
    println!("db_path={}", config.db_path.display());
    println!("first_launch={first_launch}");
    println!(
        "sets={} items={}",
        service.count_item_sets()?,
        service.count_items()?
    );
    for set in service.fetch_all_sets()? {
        print_set(&set);
    }
    Ok(())
}

fn print_set(set: &ItemSet) {
    let counts = ListKind::ALL
        .iter()
        .map(|kind| format!("{}={}", kind.as_str(), set.list(*kind).len()))
        .collect::<Vec<_>>()
        .join(" ");
    println!("set id={} primary={} {counts}", set.id, set.is_primary);
}
