use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use civic_backup::cli::{handle_backup_command, BackupCommands};
use civic_backup::config::{paths::CivicPaths, settings::Settings};

#[derive(Parser)]
#[command(
    name = "civic-backup",
    version,
    about = "Backup and restore for municipal records",
    long_about = "civic-backup snapshots the records database and uploaded files \
                  into zip archives, restores them, and prunes expired automated \
                  backups."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Backup(BackupCommands),

    /// Initialize the data directory and write default settings
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = CivicPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing civic-backup at: {}", paths.base_dir().display());
            settings.save(&paths)?;

            let layout = settings.layout(&paths);
            for dir in [
                &layout.backup_dir,
                &layout.folder_zip_dir,
                &layout.profile_dir,
                &layout.scratch_dir,
            ] {
                std::fs::create_dir_all(dir)?;
            }
            println!("Initialization complete!");
            println!();
            println!("Settings written to {}", paths.settings_file().display());
            println!("Run 'civic-backup create' to take a first backup.");
        }
        Some(Commands::Config) => {
            let layout = settings.layout(&paths);
            println!("civic-backup Configuration");
            println!("==========================");
            println!("Base directory:       {}", paths.base_dir().display());
            println!("Settings file:        {}", paths.settings_file().display());
            println!("Backup directory:     {}", layout.backup_dir.display());
            println!("Folder zip directory: {}", layout.folder_zip_dir.display());
            println!("Profile directory:    {}", layout.profile_dir.display());
            println!("Scratch directory:    {}", layout.scratch_dir.display());
            println!("Database file:        {}", layout.database_file.display());
            println!();
            println!("Settings:");
            println!("  Keep automated backups: {} days", settings.retention.keep_days);
            println!("  Folders table:          {}", settings.folders_table);
            println!("  Append policy:          {:?}", settings.restore.append_policy);
            match &settings.dump_command {
                Some(argv) => println!("  SQL dump command:       {}", argv.join(" ")),
                None => println!("  SQL dump command:       (none)"),
            }
        }
        None => {
            println!("civic-backup - Backup and restore for municipal records");
            println!();
            println!("Run 'civic-backup --help' for usage information.");
        }
    }

    Ok(())
}
