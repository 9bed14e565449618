//! Presence Engine - attendance reports and agent health from a presence backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use presence_engine as app;

use app::client::ApiClient;
use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::export::{export_employee_detail_to_excel, export_monthly_summary_to_excel, generate_export_filename};
use app::models::{DailyPresenceRecord, Direction, EmployeeMonthlyDetail, MonthlyPresenceRecord, YearMonth};
use app::refresh::{DashboardSnapshot, LatestView, NavRequest, RefreshDriver, ReportSettings, ViewUpdate};

/// Attendance reports and agent health from a presence backend.
#[derive(Parser)]
#[command(name = "presence", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long, global = true)]
    dev: bool,

    /// Explicit config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Presence records for one day
    Daily {
        /// Day to report (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Monthly summary of all employees
    Monthly {
        /// Month to report (YYYY-MM), current month by default
        #[arg(long)]
        month: Option<YearMonth>,
        /// Write the summary to an Excel file
        #[arg(long)]
        export: Option<Option<PathBuf>>,
    },
    /// Day-by-day detail of one employee
    Employee {
        id: i32,
        #[arg(long)]
        month: Option<YearMonth>,
        /// Write the detail to an Excel file
        #[arg(long)]
        export: Option<Option<PathBuf>>,
    },
    /// Health of the reporting agents
    Agents {
        /// Restrict to one site
        #[arg(long)]
        site: Option<String>,
    },
    /// Live dashboard refreshed on the configured interval
    Watch {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    let loaded = AppConfig::try_load(&config_path);
    let logging = match &loaded {
        ConfigLoadResult::Loaded(config) => config.logging.clone(),
        _ => LoggingConfig::default(),
    };
    let _guard = init_logging(&logging);

    tracing::info!("Presence Engine starting...");
    tracing::info!("Config path: {:?}", config_path);

    let config = match loaded {
        ConfigLoadResult::Loaded(config) => {
            tracing::info!("Config loaded successfully");
            config
        }
        ConfigLoadResult::Missing => {
            tracing::warn!("Config missing, using defaults");
            AppConfig::default()
        }
        ConfigLoadResult::Invalid(e) => bail!("Invalid config {}: {e}", config_path.display()),
    };

    let settings = ReportSettings::from_config(&config)?;
    let tz = settings.timezone;
    let client = ApiClient::new(&config.api, tz)?;
    let driver = RefreshDriver::new(client, settings);
    let today = Utc::now().with_timezone(&tz).date_naive();

    match cli.command {
        Command::Daily { date } => {
            let date = date.unwrap_or(today);
            let records = driver.load_daily(date, Utc::now()).await?;
            print_daily(date, &records, &tz);
        }
        Command::Monthly { month, export } => {
            let month = month.unwrap_or_else(|| YearMonth::of(today));
            let summary = driver.load_monthly(month, Utc::now()).await?;
            print_monthly(month, &summary);
            if let Some(path) = export {
                let path = path.unwrap_or_else(|| PathBuf::from(generate_export_filename("monthly_summary")));
                export_monthly_summary_to_excel(&summary, month, &path)
                    .with_context(|| format!("exporting to {}", path.display()))?;
                report_export(&path);
            }
        }
        Command::Employee { id, month, export } => {
            let month = month.unwrap_or_else(|| YearMonth::of(today));
            let detail = driver.load_employee_detail(id, month, Utc::now()).await?;
            print_employee(&detail, &tz);
            if let Some(path) = export {
                let path = path.unwrap_or_else(|| PathBuf::from(generate_export_filename(&format!("employee_{id}"))));
                export_employee_detail_to_excel(&detail, &tz, &path)
                    .with_context(|| format!("exporting to {}", path.display()))?;
                report_export(&path);
            }
        }
        Command::Agents { site } => {
            let report = driver.load_agents(site.as_deref(), Utc::now()).await;
            println!("Overall: {} ({})", report.overall.state, report.overall.descriptor());
            for health in &report.agents {
                let site = health.site_id.as_deref().unwrap_or("-");
                println!("  {site:<20} {:<9} {}", health.state.to_string(), health.descriptor());
            }
        }
        Command::Watch { date } => watch(driver, date.unwrap_or(today)).await?,
    }

    Ok(())
}

/// Set up stderr logging plus an optional daily rolling file.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if config.directory.trim().is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(config.directory.trim(), "presence.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// Run the live dashboard until stdin closes, `q` is entered or Ctrl+C.
async fn watch(driver: RefreshDriver<ApiClient>, start: NaiveDate) -> anyhow::Result<()> {
    let tz = driver.settings().timezone;
    let driver = Arc::new(driver);
    let (nav_tx, nav_rx) = mpsc::channel(16);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();

    let runner = tokio::spawn(Arc::clone(&driver).run(start, nav_rx, update_tx));

    println!("Keys: n/p next/previous day, N/P next/previous month, r refresh, q quit");

    let mut dashboard: LatestView<DashboardSnapshot> = LatestView::default();
    let mut monthly: LatestView<(YearMonth, app::Result<Vec<MonthlyPresenceRecord>>)> = LatestView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let request = match line?.as_deref().map(str::trim) {
                    None | Some("q") => break,
                    Some("n") => NavRequest::Day(Direction::Next),
                    Some("p") => NavRequest::Day(Direction::Previous),
                    Some("N") => NavRequest::Month(Direction::Next),
                    Some("P") => NavRequest::Month(Direction::Previous),
                    Some("r") | Some("") => NavRequest::Refresh,
                    Some(other) => {
                        println!("Unknown key '{other}'");
                        continue;
                    }
                };
                if nav_tx.send(request).await.is_err() {
                    break;
                }
            }
            update = update_rx.recv() => match update {
                None => break,
                Some(ViewUpdate::Dashboard(ticket, snapshot)) => {
                    if dashboard.apply(ticket, snapshot) {
                        if let Some(snapshot) = dashboard.get() {
                            print_dashboard(snapshot, &tz);
                        }
                    }
                }
                Some(ViewUpdate::Monthly(ticket, month, summary)) => {
                    if monthly.apply(ticket, (month, summary)) {
                        match monthly.get() {
                            Some((month, Ok(summary))) => print_monthly(*month, summary),
                            Some((month, Err(e))) => println!("Monthly {month}: {e}"),
                            None => {}
                        }
                    }
                }
            },
        }
    }

    drop(nav_tx);
    runner.await?;
    tracing::info!("Watch stopped");
    Ok(())
}

fn local_time(value: Option<chrono::DateTime<Utc>>, tz: &Tz) -> String {
    value.map_or_else(|| "--:--".to_string(), |dt| dt.with_timezone(tz).format("%H:%M").to_string())
}

fn report_export(path: &Path) {
    tracing::info!("Exported report to {}", path.display());
    println!("Exported to {}", path.display());
}

fn print_daily(date: NaiveDate, records: &[DailyPresenceRecord], tz: &Tz) {
    println!("Presence on {date}");
    if records.is_empty() {
        println!("  No presence recorded");
        return;
    }
    for r in records {
        println!(
            "  {:<6} {:<24} {} - {}  {:>6.2} h",
            r.employee_id,
            r.employee_name,
            local_time(r.first_seen, tz),
            local_time(r.last_seen, tz),
            r.hours_present
        );
    }
}

fn print_monthly(month: YearMonth, summary: &[MonthlyPresenceRecord]) {
    println!("Monthly summary {month}");
    if summary.is_empty() {
        println!("  No presence recorded");
        return;
    }
    for r in summary {
        println!(
            "  {:<6} {:<24} {:>7.2} h  {:>3} days  {:>5.2} h/day",
            r.employee_id, r.employee_name, r.total_hours, r.days_present, r.avg_hours_per_day
        );
    }
}

fn print_employee(detail: &EmployeeMonthlyDetail, tz: &Tz) {
    println!(
        "{} ({}) {}-{:02}: {:.2} h over {} days",
        detail.employee_name, detail.employee_id, detail.year, detail.month, detail.total_hours, detail.days_present
    );
    for day in &detail.daily_records {
        println!(
            "  {} {:<9} {} - {}  {:>5.2} h  {}",
            day.date,
            app::calendar::weekday_name(day.day_of_week),
            local_time(day.first_seen, tz),
            local_time(day.last_seen, tz),
            day.hours,
            day.status
        );
    }
}

fn print_dashboard(snapshot: &DashboardSnapshot, tz: &Tz) {
    println!();
    println!(
        "=== {} (updated {}) ===",
        snapshot.date,
        snapshot.generated_at.with_timezone(tz).format("%H:%M:%S")
    );
    println!("Agent: {} ({})", snapshot.agent.state, snapshot.agent.descriptor());

    match &snapshot.current {
        Ok(statuses) => {
            let present = statuses.iter().filter(|s| s.is_present).count();
            println!("Present now: {present}/{}", statuses.len());
            for s in statuses.iter().filter(|s| s.is_present) {
                println!("  {:<24} {}", s.employee_name, s.current_area.as_deref().unwrap_or("-"));
            }
        }
        Err(e) => println!("Current status unavailable: {e}"),
    }

    match &snapshot.daily {
        Ok(records) => print_daily(snapshot.date, records, tz),
        Err(e) => println!("Daily presence unavailable: {e}"),
    }

    match &snapshot.downtimes {
        Ok(downtimes) if downtimes.is_empty() => {}
        Ok(downtimes) => {
            println!("Agent downtimes:");
            for d in downtimes {
                println!(
                    "  {} - {} ({} min)",
                    local_time(Some(d.start), tz),
                    local_time(Some(d.end), tz),
                    d.duration().num_minutes()
                );
            }
        }
        Err(e) => println!("Downtimes unavailable: {e}"),
    }
}
