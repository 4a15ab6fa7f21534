use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aggregate;
mod api;
mod config;
mod error;
mod export;
mod forms;
mod import;
mod models;
mod reference;
mod reload;
mod report;
mod table;

use aggregate::Period;
use api::{ApiClient, Roster};
use config::Settings;
use models::{reference_midnight, ClassSession, StarRecord};
use reload::ViewState;
use table::{
    NoFilter, SortDirection, StarColumn, StarFilter, SupervisorColumn, SupervisorFilter,
    TableState,
};

#[derive(Parser)]
#[command(name = "star-dashboard")]
#[command(about = "Star rating dashboard for digital masters", long_about = None)]
struct Cli {
    /// Base URL of the dashboard REST service
    #[arg(long, global = true, env = "STAR_DASHBOARD_API")]
    api: Option<String>,
    /// TOML configuration file
    #[arg(long, global = true, env = "STAR_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,
    /// Rows per page
    #[arg(long, global = true, env = "STAR_DASHBOARD_PAGE_SIZE")]
    page_size: Option<usize>,
    /// Directory CSV reports are written to
    #[arg(long, global = true, env = "STAR_DASHBOARD_EXPORT_DIR")]
    export_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show headline statistics and the supervisor ranking
    Dashboard {
        #[arg(long, value_enum, default_value_t = Period::All)]
        period: Period,
        #[arg(long, value_enum)]
        sort: Option<SupervisorColumn>,
        #[arg(long, requires = "sort")]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Manage supervisors
    Supervisors {
        #[command(subcommand)]
        command: SupervisorCommand,
    },
    /// Manage star ratings
    Stars {
        #[command(subcommand)]
        command: StarCommand,
    },
    /// Manage class sessions
    Classes {
        #[command(subcommand)]
        command: ClassCommand,
    },
    /// Survey settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Print the branch, region and rating type tables
    Reference,
}

#[derive(Subcommand)]
enum SupervisorCommand {
    /// List supervisors with their star totals
    List {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        region: Option<String>,
        /// Branch name substring
        #[arg(long)]
        branch: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        min_stars: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        max_stars: Option<i64>,
        #[arg(long, value_enum)]
        sort: Option<SupervisorColumn>,
        #[arg(long, requires = "sort")]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Also write the filtered rows to <export-dir>/<NAME>.csv
        #[arg(long, value_name = "NAME")]
        export: Option<String>,
    },
    /// Add a supervisor
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        branch: String,
    },
    /// Replace a supervisor's name and branch
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        branch: String,
    },
    /// Delete a supervisor
    Delete { id: String },
}

#[derive(Subcommand)]
enum StarCommand {
    /// List valid rating records
    List {
        #[arg(long)]
        supervisor: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum)]
        sort: Option<StarColumn>,
        #[arg(long, requires = "sort")]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Give the same score to one or more supervisors
    Rate {
        #[arg(long = "supervisor", required = true)]
        supervisors: Vec<String>,
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Per-supervisor remark as ID=TEXT
        #[arg(long = "remark", value_parser = parse_remark)]
        remarks: Vec<(String, String)>,
    },
    /// Submit every row of a CSV file as one batch
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Mark a rating record invalid
    Delete { id: String },
}

#[derive(Subcommand)]
enum ClassCommand {
    List,
    Add {
        /// MM/DD/YYYY
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        start: String,
        /// HH:MM
        #[arg(long)]
        end: String,
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        marks: Option<String>,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        survey_url: String,
        #[arg(long)]
        survey_start_day: String,
    },
}

fn direction(desc: bool) -> SortDirection {
    if desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

fn parse_remark(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(id, text)| (id.trim().to_string(), text.to_string()))
        .ok_or_else(|| format!("expected ID=TEXT, got `{raw}`"))
}

/// Loads supervisors and stars into `state` and returns what it holds.
async fn load_roster(client: &ApiClient, state: &ViewState<Roster>) -> anyhow::Result<Roster> {
    state
        .reload(client.load_roster())
        .await
        .context("failed to load supervisors and stars")?;
    Ok(state.current().await.unwrap_or_default())
}

async fn load_stars(
    client: &ApiClient,
    state: &ViewState<Vec<StarRecord>>,
) -> anyhow::Result<Vec<StarRecord>> {
    state
        .reload(client.list_stars())
        .await
        .context("failed to load rating records")?;
    Ok(state.current().await.unwrap_or_default())
}

async fn load_classes(
    client: &ApiClient,
    state: &ViewState<Vec<ClassSession>>,
) -> anyhow::Result<Vec<ClassSession>> {
    state
        .reload(client.list_classes())
        .await
        .context("failed to load classes")?;
    Ok(state.current().await.unwrap_or_default())
}

fn print_supervisors(roster: &Roster, settings: &Settings) {
    let summaries =
        aggregate::rank_supervisors(&roster.supervisors, &roster.stars, &Utc::now());
    let table = TableState::new(SupervisorFilter::default(), settings.page_size);
    print!("{}", report::render_supervisors(&table.view(&summaries)));
}

fn print_stars(stars: &[StarRecord], settings: &Settings) {
    let rows = aggregate::star_rows(stars);
    let table = TableState::new(NoFilter, settings.page_size);
    print!("{}", report::render_stars(&table.view(&rows)));
}

async fn run_supervisors(
    client: &ApiClient,
    settings: &Settings,
    command: SupervisorCommand,
) -> anyhow::Result<()> {
    let roster_state = ViewState::<Roster>::default();

    match command {
        SupervisorCommand::List {
            id,
            name,
            region,
            branch,
            min_stars,
            max_stars,
            sort,
            desc,
            page,
            export,
        } => {
            let roster = load_roster(client, &roster_state).await?;
            let summaries =
                aggregate::rank_supervisors(&roster.supervisors, &roster.stars, &Utc::now());

            let mut table = TableState::new(SupervisorFilter::default(), settings.page_size);
            table.set_filter(SupervisorFilter {
                id,
                name,
                region,
                branch,
                min_stars,
                max_stars,
            });
            if let Some(column) = sort {
                table.set_sort(column, direction(desc));
            }
            table.set_page(page);

            let view = table.view(&summaries);
            print!("{}", report::render_supervisors(&view));

            if let Some(name) = export {
                let path = export::export_report(&settings.export_dir, &name, &view.rows)
                    .context("failed to write CSV report")?;
                println!("Report written to {}.", path.display());
            }
        }
        SupervisorCommand::Add { id, name, branch } => {
            let supervisor = forms::supervisor(&id, &name, &branch)?;
            client
                .create_supervisor(&supervisor)
                .await
                .context("failed to add supervisor")?;
            println!("Supervisor {} added.", supervisor.id);
            let roster = load_roster(client, &roster_state).await?;
            print_supervisors(&roster, settings);
        }
        SupervisorCommand::Edit { id, name, branch } => {
            let supervisor = forms::supervisor(&id, &name, &branch)?;
            client
                .update_supervisor(&supervisor.id, &supervisor)
                .await
                .context("failed to update supervisor")?;
            println!("Supervisor {} updated.", supervisor.id);
            let roster = load_roster(client, &roster_state).await?;
            print_supervisors(&roster, settings);
        }
        SupervisorCommand::Delete { id } => {
            client
                .delete_supervisor(&id)
                .await
                .context("failed to delete supervisor")?;
            println!("Supervisor {id} deleted.");
            let roster = load_roster(client, &roster_state).await?;
            print_supervisors(&roster, settings);
        }
    }

    Ok(())
}

async fn run_stars(
    client: &ApiClient,
    settings: &Settings,
    command: StarCommand,
) -> anyhow::Result<()> {
    let star_state = ViewState::<Vec<StarRecord>>::default();

    match command {
        StarCommand::List {
            supervisor,
            kind,
            from,
            to,
            sort,
            desc,
            page,
        } => {
            let stars = load_stars(client, &star_state).await?;
            let rows = aggregate::star_rows(&stars);

            let mut table = TableState::new(StarFilter::default(), settings.page_size);
            table.set_filter(StarFilter {
                supervisor_id: supervisor,
                kind,
                start: from.map(reference_midnight),
                // Inclusive through the end of the given day.
                end: to.map(|day| {
                    reference_midnight(day) + Duration::days(1) - Duration::milliseconds(1)
                }),
            });
            if let Some(column) = sort {
                table.set_sort(column, direction(desc));
            }
            table.set_page(page);

            print!("{}", report::render_stars(&table.view(&rows)));
        }
        StarCommand::Rate {
            supervisors,
            score,
            kind,
            date,
            remarks,
        } => {
            let remarks: HashMap<String, String> = remarks.into_iter().collect();
            let batch =
                forms::rating_batch(&supervisors, score, &kind, date, &remarks, Utc::now())?;
            client
                .create_stars(&batch)
                .await
                .context("failed to submit ratings")?;
            println!("Submitted {} ratings.", batch.len());
            let stars = load_stars(client, &star_state).await?;
            print_stars(&stars, settings);
        }
        StarCommand::Import { csv } => {
            let batch = import::read_star_csv(&csv, Utc::now())
                .with_context(|| format!("failed to parse {}", csv.display()))?;
            client
                .create_stars(&batch)
                .await
                .context("failed to submit imported ratings")?;
            println!("Imported {} ratings from {}.", batch.len(), csv.display());
            let stars = load_stars(client, &star_state).await?;
            print_stars(&stars, settings);
        }
        StarCommand::Delete { id } => {
            client
                .soft_delete_star(&id)
                .await
                .context("failed to mark rating invalid")?;
            println!("Rating {id} marked invalid.");
            let stars = load_stars(client, &star_state).await?;
            print_stars(&stars, settings);
        }
    }

    Ok(())
}

async fn run_classes(client: &ApiClient, command: ClassCommand) -> anyhow::Result<()> {
    let class_state = ViewState::<Vec<ClassSession>>::default();

    match command {
        ClassCommand::List => {}
        ClassCommand::Add {
            date,
            start,
            end,
            name,
            kind,
            marks,
        } => {
            let form = forms::class(&date, &start, &end, &name, &kind, marks.as_deref())?;
            client
                .create_class(&form)
                .await
                .context("failed to add class")?;
            println!("Class {} added.", form.name);
        }
        ClassCommand::Delete { id } => {
            client
                .delete_class(&id)
                .await
                .context("failed to delete class")?;
            println!("Class {id} deleted.");
        }
    }

    let classes = load_classes(client, &class_state).await?;
    print!("{}", report::render_classes(&classes));
    Ok(())
}

async fn run_settings(client: &ApiClient, command: SettingsCommand) -> anyhow::Result<()> {
    if let SettingsCommand::Set {
        survey_url,
        survey_start_day,
    } = command
    {
        let update = forms::survey_settings(&survey_url, &survey_start_day)?;
        client
            .update_settings(&update)
            .await
            .context("failed to update settings")?;
        println!("Settings updated.");
    }

    let current = client
        .get_settings()
        .await
        .context("failed to load settings")?;
    print!("{}", report::render_settings(&current));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "star_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = config::resolve(config::Overrides {
        config_file: cli.config,
        api_base_url: cli.api,
        page_size: cli.page_size,
        export_dir: cli.export_dir,
    })?;
    tracing::debug!(api = %settings.api_base_url, page_size = settings.page_size, "settings resolved");

    if let Commands::Reference = cli.command {
        print!("{}", report::render_reference());
        return Ok(());
    }

    let client = ApiClient::new(&settings.api_base_url)?;

    match cli.command {
        Commands::Dashboard {
            period,
            sort,
            desc,
            page,
        } => {
            let roster_state = ViewState::<Roster>::default();
            let roster = load_roster(&client, &roster_state).await?;
            let dashboard = aggregate::build_dashboard(
                &roster.supervisors,
                &roster.stars,
                period,
                &Utc::now(),
            );

            let mut table = TableState::new(NoFilter, settings.page_size);
            if let Some(column) = sort {
                table.set_sort(column, direction(desc));
            }
            table.set_page(page);

            let view = table.view(&dashboard.ranking);
            print!("{}", report::render_dashboard(&dashboard, period, &view));
        }
        Commands::Supervisors { command } => run_supervisors(&client, &settings, command).await?,
        Commands::Stars { command } => run_stars(&client, &settings, command).await?,
        Commands::Classes { command } => run_classes(&client, command).await?,
        Commands::Settings { command } => run_settings(&client, command).await?,
        Commands::Reference => {}
    }

    Ok(())
}
