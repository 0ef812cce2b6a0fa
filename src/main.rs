// Only compile the UI module when the TUI feature is enabled
#[cfg(feature = "tui")]
use vehicle_registry::ui;

use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use vehicle_registry::{
    archive, db, dossier, format as fmt, resolver, search,
    search::SearchOutcome,
    store,
};

fn db_path() -> PathBuf {
    env::var("REGISTRY_DB")
        .unwrap_or_else(|_| "registry.db".to_string())
        .into()
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(),
        Some("search") => {
            let query = args[2..].join(" ");
            run_search(&query)
        }
        Some("vehicle") => run_vehicle(parse_id(&args, 2)?),
        Some("owner") => run_owner(parse_id(&args, 2)?),
        Some("dossiers") => run_dossiers(&args[2..]),
        Some("archive") => run_archive(args.get(2).map(Path::new)),
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_usage();
            std::process::exit(2);
        }
        None => run_ui_mode(),
    }
}

fn print_usage() {
    eprintln!("Usage: vehicle-registry [COMMAND]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  init                   create tables and seed sample data");
    eprintln!("  search <query>         search vehicles and owners");
    eprintln!("  vehicle <id>           vehicle details and ownership history");
    eprintln!("  owner <id>             owner details and vehicle list");
    eprintln!("  dossiers [query] [page] list or search dossier records");
    eprintln!("  archive [csv-path]     rebuild the denormalized archive");
    eprintln!("  (no command)           interactive UI");
}

fn parse_id(args: &[String], index: usize) -> Result<i64> {
    let Some(raw) = args.get(index) else {
        bail!("missing id argument");
    };
    Ok(raw.parse()?)
}

fn run_init() -> Result<()> {
    let path = db_path();
    let conn = db::open_database(&path)?;
    db::setup_database(&conn)?;
    println!("✓ Database initialized at {}", path.display());

    if db::seed_sample_data(&conn)? {
        println!("✓ Sample data inserted");
    } else {
        println!("✓ Tables already contain data, seed skipped");
    }

    Ok(())
}

fn open_existing() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        bail!(
            "database not found at {} (run: vehicle-registry init)",
            path.display()
        );
    }
    db::open_database(&path)
}

fn run_search(query: &str) -> Result<()> {
    let conn = open_existing()?;

    match search::search(&conn, query)? {
        SearchOutcome::Single(hit) => {
            println!("Exact plate match:");
            print_vehicle(&conn, hit.id)?;
        }
        SearchOutcome::Matches(hits) if hits.is_empty() => {
            println!("No results for {:?}", query.trim());
        }
        SearchOutcome::Matches(hits) => {
            for hit in hits {
                println!("[{}] {} (id {})", hit.kind.as_str(), hit.label, hit.id);
            }
        }
    }

    Ok(())
}

fn print_vehicle(conn: &Connection, id: i64) -> Result<()> {
    let Some(vehicle) = store::get_vehicle(conn, id)? else {
        println!("No vehicle with id {id}");
        return Ok(());
    };

    let current = resolver::current_ownership_as_of(conn, id, Utc::now().date_naive())?;
    for (label, value) in fmt::vehicle_details(&vehicle, current.as_ref()) {
        println!("{label}: {value}");
    }

    let history = resolver::history_of(conn, id)?;
    if !history.is_empty() {
        println!();
        println!("Ownership history:");
        for record in &history {
            println!("  {}", fmt::history_line(record));
        }
    }

    Ok(())
}

fn run_vehicle(id: i64) -> Result<()> {
    let conn = open_existing()?;
    print_vehicle(&conn, id)
}

fn run_owner(id: i64) -> Result<()> {
    let conn = open_existing()?;

    let Some(owner) = store::get_owner(&conn, id)? else {
        println!("No owner with id {id}");
        return Ok(());
    };

    for (label, value) in fmt::owner_details(&owner) {
        println!("{label}: {value}");
    }

    let tenures = resolver::vehicles_of(&conn, id)?;
    if !tenures.is_empty() {
        println!();
        println!("Vehicles:");
        for tenure in &tenures {
            println!("  {}", fmt::tenure_line(tenure));
        }
    }

    Ok(())
}

fn run_dossiers(args: &[String]) -> Result<()> {
    let conn = open_existing()?;

    // `dossiers 2` pages the listing; `dossiers dupont 2` pages a search.
    let (query, page) = match args {
        [] => (None, 1),
        [single] => match single.parse::<usize>() {
            Ok(page) => (None, page),
            Err(_) => (Some(single.as_str()), 1),
        },
        [query, page, ..] => (Some(query.as_str()), page.parse().unwrap_or(1)),
    };

    let request = dossier::PageRequest::new(page);
    let result = match query {
        Some(q) => dossier::search_dossiers(&conn, q, request)?,
        None => dossier::list_dossiers(&conn, request)?,
    };

    for item in &result.items {
        let reference = item.reference.as_deref().unwrap_or("-");
        println!(
            "{} | {} | {} | {} | ref {}",
            item.number, item.date, item.person, item.subject, reference
        );
    }
    println!();
    println!(
        "Page {}/{} ({} dossiers)",
        result.page,
        result.total_pages(),
        result.total
    );

    Ok(())
}

fn run_archive(csv_path: Option<&Path>) -> Result<()> {
    let mut conn = open_existing()?;

    let rows = archive::rebuild_archive(&mut conn)?;
    println!("✓ Archived {rows} history rows into main_archive");

    if let Some(path) = csv_path {
        let written = archive::export_archive_csv(&conn, path)?;
        println!("✓ Exported {written} rows to {}", path.display());
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    let conn = open_existing()?;
    let mut app = ui::App::new(conn);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("Interactive UI not available in this build.");
    eprintln!("Rebuild with: cargo build --features tui");
    eprintln!("Or use the CLI commands (see: vehicle-registry help).");
    std::process::exit(1);
}
