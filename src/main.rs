use absensi::{
    AbsenceForm, AbsenceRecord, AbsenceType, Config, ExportError, FilterState, SubmitError, compute_view,
    locale, open_absence_store, storage, write_export,
};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "absensi")]
#[command(about = "Absensi CLI - Record, review and export student absence reports")]
#[command(version)]
struct Cli {
    /// Path to the store directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    store_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new absence report
    Submit {
        #[arg(long)]
        student: String,

        #[arg(long = "class")]
        class_name: String,

        /// sakit, izin or tanpa-keterangan
        #[arg(long = "type", default_value = "sakit")]
        absence_type: AbsenceType,

        #[arg(long)]
        reason: String,

        /// Day of the absence, YYYY-MM-DD or RFC 3339 (default: now)
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,

        /// Photo proof as a data:image/... URI
        #[arg(long)]
        proof_data_uri: Option<String>,

        /// Commit immediately instead of waiting the configured delay
        #[arg(long)]
        no_delay: bool,
    },

    /// List reports, newest first
    List {
        #[arg(long = "class", default_value = "")]
        class_name: String,

        #[arg(long, value_parser = FilterState::parse_month)]
        month: Option<String>,

        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a report by id
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export the filtered view to an xlsx file
    Export {
        #[arg(long = "class", default_value = "")]
        class_name: String,

        #[arg(long, value_parser = FilterState::parse_month)]
        month: Option<String>,

        /// Output directory (default: export_dir from config)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    // Logs go to stderr so `list --json` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&storage::store_dir(&cli.store_path))?;

    if let Commands::Config = cli.command {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let mut store = open_absence_store(&cli.store_path, &config)?;

    match cli.command {
        Commands::Submit {
            student,
            class_name,
            absence_type,
            reason,
            date,
            proof_data_uri,
            no_delay,
        } => {
            let form = AbsenceForm {
                student_name: student,
                class_name,
                absence_type,
                reason,
                proof_image: proof_data_uri,
                date,
            };
            let delay = if no_delay { Duration::ZERO } else { config.submit_delay() };

            match absensi::submit(&mut store, &form, &config.roster(), delay) {
                Ok(record) => {
                    println!("{} Data telah tersimpan.", "Berhasil!".green().bold());
                    println!("  id: {}", record.id);
                }
                Err(SubmitError::Invalid(errors)) => {
                    for (field, message) in errors.iter() {
                        eprintln!("{} {}: {}", "error:".red().bold(), field.as_str(), message);
                    }
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::List {
            class_name,
            month,
            json,
        } => {
            let filters = FilterState::new(class_name, month.unwrap_or_default());
            let view = compute_view(store.records(), &filters);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else if view.is_empty() {
                println!("{}", "Tidak ada data".dimmed());
            } else {
                print_table(&view);
            }
        }
        Commands::Delete { id, yes } => {
            let Some(record) = store.get(&id) else {
                println!("No record with id {}", id);
                return Ok(());
            };
            println!("{} ({}) - {}", record.student_name, record.class_name, record.absence_type);

            if !yes && !confirm("Apakah Anda yakin ingin menghapus data ini?")? {
                println!("Cancelled");
                return Ok(());
            }

            let removed = store.remove(&id)?;
            println!("Deleted {} record(s)", removed);
        }
        Commands::Export {
            class_name,
            month,
            out_dir,
        } => {
            let filters = FilterState::new(class_name, month.unwrap_or_default());
            let view = compute_view(store.records(), &filters);
            let dir = out_dir.unwrap_or_else(|| config.export_dir.clone());

            match write_export(&dir, &view, &filters) {
                Ok(path) => println!("{} {}", "Exported".green().bold(), path.display()),
                Err(ExportError::NoData) => println!("{}", "No data to export".yellow()),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Config => {}
    }

    Ok(())
}

fn print_table(view: &[&AbsenceRecord]) {
    println!(
        "{:<38} {:<13} {:<28} {:<6} {:<17} {}",
        "ID".bold(),
        "Tanggal".bold(),
        "Siswa".bold(),
        "Kelas".bold(),
        "Jenis".bold(),
        "Alasan".bold()
    );
    for record in view {
        let kind = match record.absence_type {
            AbsenceType::Sick => record.absence_type.label().yellow(),
            AbsenceType::Permission => record.absence_type.label().cyan(),
            AbsenceType::Unexcused => record.absence_type.label().red(),
        };
        let proof = if record.proof_image.is_some() { " [bukti]" } else { "" };
        println!(
            "{:<38} {:<13} {:<28} {:<6} {:<17} {}{}",
            record.id,
            locale::short_date(record.date.with_timezone(&Local).date_naive()),
            record.student_name,
            record.class_name,
            kind,
            record.reason,
            proof.dimmed()
        );
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "ya" | "yes"))
}

/// Parse `YYYY-MM-DD` as local midnight, or a full RFC 3339 timestamp
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Ok(date.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {} (expected YYYY-MM-DD or RFC 3339)", s))?;
    day.and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("Date does not exist in local time: {}", s))
}
