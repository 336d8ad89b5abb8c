use anyhow::{bail, Context, Result};
use cash_drawer::{
    init_logging, load_count_sheet, AppConfig, CashDrawerService, CountEdit, CountRecord,
    CountSubmission, CountType, DenominationCount, DrawerSettings, Money, RecordFilter,
    SqliteRepository, TargetProfile,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "cash-drawer", version, about = "Cash drawer counts and reconciliation")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, env = "CASH_DRAWER_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database schema
    Init,
    #[command(subcommand)]
    Drawer(DrawerCommand),
    #[command(subcommand)]
    Count(CountCommand),
    /// Reconcile one closing count against its opening baseline
    Reconcile { record_id: String },
    /// Latest opening and closing of a drawer
    Summary { drawer_id: String },
    /// Preview totals and cash-out without saving
    Totals {
        #[arg(long)]
        drawer: String,
        #[arg(long = "type")]
        count_type: CountType,
        #[command(flatten)]
        counts: CountsArgs,
    },
}

#[derive(Subcommand)]
enum DrawerCommand {
    /// Register or update a drawer
    Add {
        id: String,
        #[arg(long)]
        name: String,
        /// Target till, repeatable: --target quarters=40
        #[arg(long = "target")]
        target: Vec<String>,
        #[arg(long)]
        show_details: bool,
        #[arg(long)]
        inactive: bool,
    },
    List,
    Show { id: String },
}

#[derive(Subcommand)]
enum CountCommand {
    Submit {
        #[arg(long)]
        drawer: String,
        #[arg(long = "type")]
        count_type: CountType,
        #[command(flatten)]
        counts: CountsArgs,
        /// Cash collected outside the drawer (closing only)
        #[arg(long)]
        sms_cash: Option<Money>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Replace a count's denominations and side-channel cash
    Edit {
        id: String,
        #[command(flatten)]
        counts: CountsArgs,
        #[arg(long, conflicts_with = "clear_sms_cash")]
        sms_cash: Option<Money>,
        #[arg(long)]
        clear_sms_cash: bool,
    },
    List {
        #[arg(long)]
        drawer: Option<String>,
        #[arg(long = "type")]
        count_type: Option<CountType>,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    Delete { id: String },
}

#[derive(Args)]
struct CountsArgs {
    /// Denomination count, repeatable: --count ones=50
    #[arg(long = "count")]
    count: Vec<String>,
    /// CSV count sheet with header `denomination,count`
    #[arg(long)]
    sheet: Option<PathBuf>,
}

impl CountsArgs {
    /// Sheet first, then individual `--count` entries on top.
    fn resolve(&self) -> Result<DenominationCount> {
        let counts = match &self.sheet {
            Some(path) => load_count_sheet(path)
                .with_context(|| format!("Failed to load count sheet {}", path.display()))?,
            None => DenominationCount::ZERO,
        };
        Ok(counts.with_pairs(&self.count)?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::load_or_default(cli.config.as_deref())?;
    init_logging(&cfg.logging);

    let db_path = cli.db.clone().unwrap_or_else(|| cfg.database.path.clone());
    let repo = open_repository(&db_path)?;
    let service = CashDrawerService::new(repo);

    match cli.command {
        Command::Init => {
            info!(path = %db_path.display(), "database ready");
            println!("✓ Database initialized at {}", db_path.display());
        }
        Command::Drawer(cmd) => run_drawer(&service, cmd)?,
        Command::Count(cmd) => run_count(&service, &cfg, cmd)?,
        Command::Reconcile { record_id } => {
            let report = service.reconcile(&record_id)?;
            println!("{}", report.summary());
            print_json(&report)?;
        }
        Command::Summary { drawer_id } => {
            let summary = service.drawer_summary(&drawer_id)?;
            match &summary.latest_closing_report {
                Some(report) => println!("{}", report.summary()),
                None => println!("No closing count for drawer {drawer_id}"),
            }
            print_json(&summary)?;
        }
        Command::Totals { drawer, count_type, counts } => {
            let totals = service.preview_totals(&drawer, count_type, &counts.resolve()?)?;
            println!("Total cash:        {}", totals.total_cash);
            println!("Cash out:          {}", totals.cash_out);
            println!("Total for deposit: {}", totals.total_for_deposit);
        }
    }

    Ok(())
}

fn open_repository(path: &Path) -> Result<SqliteRepository> {
    SqliteRepository::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

fn run_drawer(service: &CashDrawerService<SqliteRepository>, cmd: DrawerCommand) -> Result<()> {
    match cmd {
        DrawerCommand::Add { id, name, target, show_details, inactive } => {
            let target = TargetProfile::new(DenominationCount::from_pairs(&target)?);
            let mut settings = DrawerSettings::new(&id, &name, target).with_details(show_details);
            if inactive {
                settings.deactivate();
            }
            let saved = service.register_drawer(settings)?;
            println!("✓ Drawer {} saved (target {})", saved.id, saved.target.total()?);
        }
        DrawerCommand::List => {
            for drawer in service.drawers()? {
                let state = if drawer.active { "active" } else { "inactive" };
                println!("{:<16} {:<24} {:<8} target {}", drawer.id, drawer.name, state, drawer.target.counts());
            }
        }
        DrawerCommand::Show { id } => print_json(&service.drawer(&id)?)?,
    }
    Ok(())
}

fn run_count(
    service: &CashDrawerService<SqliteRepository>,
    cfg: &AppConfig,
    cmd: CountCommand,
) -> Result<()> {
    match cmd {
        CountCommand::Submit { drawer, count_type, counts, sms_cash, user } => {
            let mut submission = CountSubmission::new(&drawer, count_type, counts.resolve()?)
                .by(user.as_deref().unwrap_or(&cfg.operator.default_user));
            submission.sms_cash = sms_cash;

            let record = service.submit_count(submission)?;
            print_record(&record);
        }
        CountCommand::Edit { id, counts, sms_cash, clear_sms_cash } => {
            let current = service.get_count(&id)?;
            let denominations = if counts.count.is_empty() && counts.sheet.is_none() {
                current.denominations
            } else {
                counts.resolve()?
            };
            let sms_cash = match (sms_cash, clear_sms_cash) {
                (_, true) => None,
                (Some(amount), false) => Some(amount),
                (None, false) => current.sms_cash,
            };

            let record = service.edit_count(&id, CountEdit { denominations, sms_cash })?;
            print_record(&record);
        }
        CountCommand::List { drawer, count_type, from, to } => {
            let filter = RecordFilter {
                drawer_id: drawer,
                count_type,
                from: from.map(start_of_day).transpose()?,
                to: to.map(end_of_day).transpose()?,
            };
            for record in service.list_counts(&filter)? {
                let sms = record.sms_cash.map_or_else(|| "-".to_string(), |m| m.to_string());
                println!(
                    "{}  {}  {:<10} {:<8} total {:>10}  deposit {:>10}  sms {:>8}",
                    record.id,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.drawer_id,
                    record.count_type,
                    record.total_cash.to_string(),
                    record.total_for_deposit.to_string(),
                    sms,
                );
            }
        }
        CountCommand::Delete { id } => {
            service.delete_count(&id)?;
            println!("✓ Deleted {id}");
        }
    }
    Ok(())
}

fn start_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    match date.and_hms_opt(0, 0, 0) {
        Some(dt) => Ok(dt.and_utc()),
        None => bail!("invalid date {date}"),
    }
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    match date.and_hms_micro_opt(23, 59, 59, 999_999) {
        Some(dt) => Ok(dt.and_utc()),
        None => bail!("invalid date {date}"),
    }
}

fn print_record(record: &CountRecord) {
    println!("✓ {} count {} for drawer {}", record.count_type, record.id, record.drawer_id);
    println!("  Counted:           {}", record.denominations);
    println!("  Total cash:        {}", record.total_cash);
    println!("  Cash out:          {}", record.cash_out);
    println!("  Total for deposit: {}", record.total_for_deposit);
    if let Some(sms) = record.sms_cash {
        println!("  SMS cash:          {sms}");
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
