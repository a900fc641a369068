//! Schema migration command handlers

use sea_orm_migration::MigratorTrait;

use crate::config::Config;
use crate::db::Store;
use crate::db::migrator::Migrator;

async fn connect(config: &Config) -> anyhow::Result<Store> {
    Store::connect_only(&config.general.database_path).await
}

pub async fn cmd_migrate_up(config: &Config) -> anyhow::Result<()> {
    let store = connect(config).await?;
    Migrator::up(&store.conn, None).await?;
    println!("✓ All migrations applied");
    Ok(())
}

pub async fn cmd_migrate_down(config: &Config, steps: u32) -> anyhow::Result<()> {
    let store = connect(config).await?;
    Migrator::down(&store.conn, Some(steps)).await?;
    println!("✓ Rolled back {steps} migration(s)");
    Ok(())
}

pub async fn cmd_migrate_status(config: &Config) -> anyhow::Result<()> {
    let store = connect(config).await?;

    let applied = Migrator::get_applied_migrations(&store.conn).await?;
    let pending = Migrator::get_pending_migrations(&store.conn).await?;

    println!("Migrations ({} applied, {} pending)", applied.len(), pending.len());
    println!("{:-<60}", "");
    for migration in &applied {
        println!("  ✓ {}", migration.name());
    }
    for migration in &pending {
        println!("  • {}", migration.name());
    }

    Ok(())
}

pub async fn cmd_migrate_fresh(config: &Config) -> anyhow::Result<()> {
    println!(
        "This drops every table in {} and re-applies all migrations.",
        config.general.database_path
    );
    println!("Enter 'y' to confirm, anything else to cancel:");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if !input.trim().eq_ignore_ascii_case("y") {
        println!("Cancelled.");
        return Ok(());
    }

    let store = connect(config).await?;
    Migrator::fresh(&store.conn).await?;
    println!("✓ Database recreated");
    Ok(())
}
