use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use commontable_server::db::{repositories::CycleRepository, Database};
use commontable_types::Cycle;

/// CommonTable Cycle Administration Utility
///
/// Manages dinner cycles directly against the database: creating and
/// activating cycles, inspecting participation, and cleaning up old ones.
#[derive(Parser, Debug)]
#[command(name = "commontable-admin")]
#[command(about = "Manage CommonTable dinner cycles", long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value = "./commontable.db", env = "DATABASE_PATH")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new cycle and make it the active one
    Create {
        /// Cycle title shown to users
        #[arg(long)]
        title: String,
        /// The conversation prompt users answer
        #[arg(long)]
        prompt: String,
        /// Event time, RFC3339 (e.g. 2026-09-10T18:30:00Z)
        #[arg(long)]
        event_date: String,
        /// Opt-in deadline, RFC3339. Defaults to 48 hours before the event.
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Create a short test cycle with the event two hours out
    CreateTest,
    /// List all cycles, newest first
    List,
    /// Show participation counts for a cycle
    Stats {
        /// Cycle ID
        id: Uuid,
    },
    /// Activate a cycle (deactivates all others) or deactivate it
    SetActive {
        /// Cycle ID
        id: Uuid,
        /// Pass false to deactivate instead
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Delete a cycle and all its participation data
    Delete {
        /// Cycle ID
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Connect to the database and check the cycles table exists
fn connect_database(path: &str) -> Result<Database> {
    if !std::path::Path::new(path).exists() {
        anyhow::bail!("Database file not found: {}", path);
    }

    let db = Database::new(path).context("Failed to open database connection")?;

    let conn = db
        .pool
        .get()
        .context("Failed to get database connection from pool")?;
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='cycles'",
            [],
            |row| row.get::<_, i32>(0).map(|count| count > 0),
        )
        .context("Failed to check for cycles table")?;

    if !table_exists {
        anyhow::bail!("Database schema is invalid - cycles table not found");
    }

    Ok(db)
}

fn parse_timestamp(raw: &str, what: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("Invalid {} (expected RFC3339): {}", what, raw))
}

fn print_cycle(cycle: &Cycle) {
    let marker = if cycle.is_active { "* " } else { "  " };
    println!(
        "{}{}  {}  event {}  deadline {}",
        marker,
        cycle.id,
        cycle.title,
        cycle.event_date.to_rfc3339(),
        cycle.opt_in_deadline.to_rfc3339(),
    );
}

fn run(args: Args) -> Result<()> {
    let db = connect_database(&args.database)?;
    let repo = CycleRepository::new(db.pool.clone());

    match args.command {
        Command::Create {
            title,
            prompt,
            event_date,
            deadline,
        } => {
            let event_date = parse_timestamp(&event_date, "event date")?;
            let opt_in_deadline = match deadline {
                Some(raw) => parse_timestamp(&raw, "deadline")?,
                None => event_date - Duration::hours(48),
            };

            let cycle = Cycle {
                id: Uuid::new_v4(),
                title,
                prompt,
                event_date,
                opt_in_deadline,
                is_active: true,
                created_at: Utc::now(),
            };
            repo.create_active(&cycle)
                .context("Failed to create cycle")?;

            println!("Created and activated cycle:");
            print_cycle(&cycle);
        }
        Command::CreateTest => {
            let now = Utc::now();
            let cycle = Cycle {
                id: Uuid::new_v4(),
                title: "Test Cycle".to_string(),
                prompt:
                    "If you could have dinner with any historical figure, who would it be and why?"
                        .to_string(),
                event_date: now + Duration::hours(2),
                opt_in_deadline: now + Duration::hours(1),
                is_active: true,
                created_at: now,
            };
            repo.create_active(&cycle)
                .context("Failed to create test cycle")?;

            println!("Created test cycle (event in 2 hours):");
            print_cycle(&cycle);
        }
        Command::List => {
            let cycles = repo.list_all().context("Failed to list cycles")?;
            if cycles.is_empty() {
                println!("No cycles in the database.");
            } else {
                println!("Cycles (* = active):");
                for cycle in &cycles {
                    print_cycle(cycle);
                }
            }
        }
        Command::Stats { id } => {
            let cycle = repo
                .get_by_id(&id)
                .context("Failed to query cycle")?
                .with_context(|| format!("Cycle not found: {}", id))?;
            let stats = repo.stats(&id).context("Failed to query stats")?;

            println!("{} ({})", cycle.title, cycle.id);
            println!("  opt-ins:   {}", stats.opt_in_count);
            println!("  responses: {}", stats.response_count);
            println!("  groups:    {}", stats.group_count);
        }
        Command::SetActive { id, active } => {
            repo.get_by_id(&id)
                .context("Failed to query cycle")?
                .with_context(|| format!("Cycle not found: {}", id))?;
            repo.set_active(&id, active)
                .context("Failed to toggle cycle")?;
            println!(
                "Cycle {} is now {}.",
                id,
                if active { "active" } else { "inactive" }
            );
        }
        Command::Delete { id, yes } => {
            let cycle = repo
                .get_by_id(&id)
                .context("Failed to query cycle")?
                .with_context(|| format!("Cycle not found: {}", id))?;

            if !yes {
                println!(
                    "This will delete cycle \"{}\" and all its opt-ins, responses and groups.",
                    cycle.title
                );
                println!("Do you want to continue? (y/N): ");

                let mut input = String::new();
                std::io::stdin()
                    .read_line(&mut input)
                    .context("Failed to read user input")?;
                let input = input.trim().to_lowercase();
                if input != "y" && input != "yes" {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            repo.delete(&id).context("Failed to delete cycle")?;
            println!("Deleted cycle {}.", id);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    run(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_accepts_rfc3339() {
        let parsed = parse_timestamp("2026-09-10T18:30:00Z", "event date")
            .expect("RFC3339 should parse");
        assert_eq!(parsed.to_rfc3339(), "2026-09-10T18:30:00+00:00");

        assert!(parse_timestamp("next thursday", "event date").is_err());
    }

    #[test]
    fn test_missing_database_is_an_error() {
        match connect_database("/nonexistent/commontable.db") {
            Ok(_) => panic!("Missing database file should be an error"),
            Err(err) => assert!(err.to_string().contains("not found")),
        }
    }

    #[test]
    fn test_cli_parses_create_command() {
        let args = Args::parse_from([
            "commontable-admin",
            "--database",
            "test.db",
            "create",
            "--title",
            "Thursday Dinner",
            "--prompt",
            "Best meal you ever had?",
            "--event-date",
            "2026-09-10T18:30:00Z",
        ]);
        assert_eq!(args.database, "test.db");
        match args.command {
            Command::Create { title, deadline, .. } => {
                assert_eq!(title, "Thursday Dinner");
                assert!(deadline.is_none());
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }
}
