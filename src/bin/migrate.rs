use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use postboard_server::Settings;
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::{PgPool, Postgres};
use tracing::info;
use tracing_subscriber::EnvFilter;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Database administration for postboard-server
#[derive(Parser, Debug)]
#[clap(name = "migrate")]
struct Cli {
    /// Overrides `database.url` from the settings
    #[clap(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Where `new` writes migration files
    #[clap(long, default_value = "migrations")]
    migrations_dir: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database
    Create,
    /// Drop the database
    Drop,
    /// Apply all pending migrations
    Up,
    /// Revert every applied migration
    Down,
    /// Write an empty timestamped up/down migration pair
    New { name: String },
}

/// Creates `<dir>/<YYYYmmddHHMMSS>_<name>.{up,down}.sql`. Existing files are
/// never overwritten.
fn create_migration(dir: &Path, name: &str, now: DateTime<Utc>) -> anyhow::Result<[PathBuf; 2]> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("migration name must be non-empty and use only letters, digits and '_'");
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let stem = format!("{}_{}", now.format("%Y%m%d%H%M%S"), name);
    let paths = [
        dir.join(format!("{}.up.sql", stem)),
        dir.join(format!("{}.down.sql", stem)),
    ];
    for path in &paths {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
    }

    Ok(paths)
}

fn database_url(flag: Option<String>) -> anyhow::Result<String> {
    match flag {
        Some(url) => Ok(url),
        None => Ok(Settings::new().context("failed to load settings")?.database.url),
    }
}

async fn connect(flag: Option<String>) -> anyhow::Result<PgPool> {
    let url = database_url(flag)?;
    PgPool::connect(&url).await.context("failed to connect")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::New { name } => {
            for path in create_migration(&cli.migrations_dir, &name, Utc::now())? {
                info!("Created {}", path.display());
            }
        }
        Command::Create => {
            let url = database_url(cli.database_url)?;
            if Postgres::database_exists(&url).await? {
                info!("Database already exists");
            } else {
                Postgres::create_database(&url)
                    .await
                    .context("failed to create database")?;
                info!("Database created");
            }
        }
        Command::Drop => {
            let url = database_url(cli.database_url)?;
            Postgres::drop_database(&url)
                .await
                .context("failed to drop database")?;
            info!("Database dropped");
        }
        Command::Up => {
            let pool = connect(cli.database_url).await?;
            MIGRATOR.run(&pool).await.context("failed to apply migrations")?;
            info!("Migrations applied");
            pool.close().await;
        }
        Command::Down => {
            let pool = connect(cli.database_url).await?;
            MIGRATOR.undo(&pool, 0).await.context("failed to revert migrations")?;
            info!("Migrations reverted");
            pool.close().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "postboard-migrate-{}-{}",
            label,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_new_migration_pair() {
        let dir = scratch_dir("pair");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let [up, down] = create_migration(&dir, "add_likes", now).unwrap();
        assert_eq!(up, dir.join("20240309140507_add_likes.up.sql"));
        assert_eq!(down, dir.join("20240309140507_add_likes.down.sql"));
        assert_eq!(fs::read_to_string(&up).unwrap(), "");
        assert_eq!(fs::read_to_string(&down).unwrap(), "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_new_migration_never_overwrites() {
        let dir = scratch_dir("overwrite");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let [up, _] = create_migration(&dir, "add_likes", now).unwrap();
        fs::write(&up, "CREATE TABLE likes ();").unwrap();

        assert!(create_migration(&dir, "add_likes", now).is_err());
        assert_eq!(fs::read_to_string(&up).unwrap(), "CREATE TABLE likes ();");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_new_migration_rejects_bad_names() {
        let dir = scratch_dir("names");
        let now = Utc::now();

        assert!(create_migration(&dir, "", now).is_err());
        assert!(create_migration(&dir, "../escape", now).is_err());
        assert!(create_migration(&dir, "add likes", now).is_err());
        assert!(!dir.exists());
    }
}
