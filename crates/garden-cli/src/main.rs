mod server;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use garden_core::{CivilDate, Contact, GardenEngine, ImportanceTier, LayoutMode, TriageSession};
use garden_store::Garden;
use rmcp::{ServiceExt, transport::stdio};

/// Forecast horizon when none is given.
pub const DEFAULT_HORIZON_DAYS: i64 = 30;

#[derive(Parser)]
#[command(name = "garden", about = "Relationship garden CLI and MCP server")]
struct Cli {
    /// Evaluate as of this date (YYYY-MM-DD) instead of today
    #[arg(long, global = true)]
    today: Option<CivilDate>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Add or update a contact
    Add {
        /// Stable contact id
        id: String,
        /// Display name
        name: String,
        /// Date of the last interaction (YYYY-MM-DD)
        #[arg(long)]
        last: Option<CivilDate>,
        /// Desired days between interactions
        #[arg(long)]
        target: Option<i64>,
        /// Importance tier
        #[arg(long, default_value = "medium", value_parser = ["high", "medium", "low"])]
        importance: String,
        /// Opaque photo reference
        #[arg(long)]
        photo: Option<String>,
    },

    /// Show every contact's health and the garden score
    List,

    /// Print the positioned garden as JSON
    Layout {
        /// frequency | tier
        #[arg(long, default_value = "frequency")]
        mode: LayoutMode,
        /// Maximum nodes to place
        #[arg(long)]
        max_nodes: Option<usize>,
    },

    /// Forecast healthy relationships over a horizon, as JSON
    Forecast {
        /// Days to look ahead
        #[arg(long, default_value_t = DEFAULT_HORIZON_DAYS)]
        horizon: i64,
        /// Override the velocity estimated from interaction history
        #[arg(long)]
        velocity: Option<usize>,
    },

    /// Show the triage queue
    Triage {
        /// Maximum cards in the queue
        #[arg(long)]
        max: Option<usize>,
    },

    /// Record an interaction with a neglected contact now
    Water {
        /// Contact id
        id: String,
    },

    /// Skip a neglected contact for this session
    Snooze {
        /// Contact id
        id: String,
    },
}

/// Opens the garden under `GARDEN_DATA_DIR`, else `~/.relationship-garden`.
fn open_garden() -> Result<Garden> {
    Garden::open(None).context("failed to open garden")
}

fn open_engine(garden: &Garden) -> Result<GardenEngine> {
    GardenEngine::new(garden.config().clone()).context("invalid engine config")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let today = cli.today.unwrap_or_else(CivilDate::today);

    match &cli.command {
        Commands::Serve => cmd_serve(cli.today).await,
        Commands::Add {
            id,
            name,
            last,
            target,
            importance,
            photo,
        } => {
            let mut contact = Contact::new(id, name)
                .with_importance(ImportanceTier::from_str_lossy(importance));
            contact.last_interaction_date = *last;
            contact.target_frequency_days = *target;
            contact.photo_ref = photo.clone();
            cmd_add(&contact, today)
        }
        Commands::List => cmd_list(today),
        Commands::Layout { mode, max_nodes } => cmd_layout(today, *mode, *max_nodes),
        Commands::Forecast { horizon, velocity } => cmd_forecast(today, *horizon, *velocity),
        Commands::Triage { max } => cmd_triage(today, *max),
        Commands::Water { id } => cmd_water(today, id).await,
        Commands::Snooze { id } => cmd_snooze(today, id),
    }
}

async fn cmd_serve(today: Option<CivilDate>) -> Result<()> {
    let garden = open_garden()?;
    match garden.data_dir() {
        Some(dir) => tracing::info!("starting MCP server for garden at {}", dir.display()),
        None => tracing::info!("starting MCP server for in-memory garden"),
    }

    let server = server::GardenServer::new(garden, today).map_err(|e| anyhow::anyhow!("{e}"))?;
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

fn cmd_add(contact: &Contact, today: CivilDate) -> Result<()> {
    let garden = open_garden()?;
    garden
        .store()
        .add_contact(contact)
        .with_context(|| format!("failed to save contact {}", contact.id))?;

    let snapshot = open_engine(&garden)?.classify(contact, today);
    println!(
        "added {} ({}): {}, {} days on a {}-day cadence",
        contact.id, contact.name, snapshot.state, snapshot.days_since_contact, snapshot.target_days
    );
    Ok(())
}

fn cmd_list(today: CivilDate) -> Result<()> {
    let garden = open_garden()?;
    let contacts = garden.store().list_contacts().context("failed to load contacts")?;
    let mut engine = open_engine(&garden)?;

    for contact in &contacts {
        let s = engine.classify(contact, today);
        println!(
            "{:<20} {:<24} {:<9} {:>4}/{:<4} {}",
            contact.id,
            contact.name,
            s.state.as_str(),
            s.days_since_contact,
            s.target_days,
            contact.importance_tier
        );
    }

    let tally = engine.tally(&contacts, today);
    println!("contacts:   {}", tally.total());
    println!("healthy:    {}", tally.healthy());
    match engine.score(&contacts, today) {
        Some(score) => println!("score:      {score}%"),
        None => println!("score:      -"),
    }
    Ok(())
}

fn cmd_layout(today: CivilDate, mode: LayoutMode, max_nodes: Option<usize>) -> Result<()> {
    let garden = open_garden()?;
    let contacts = garden.store().list_contacts().context("failed to load contacts")?;
    let nodes = open_engine(&garden)?.layout(&contacts, today, mode, max_nodes);
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    Ok(())
}

fn cmd_forecast(today: CivilDate, horizon: i64, velocity: Option<usize>) -> Result<()> {
    let garden = open_garden()?;
    let contacts = garden.store().list_contacts().context("failed to load contacts")?;
    let velocity = match velocity {
        Some(v) => v,
        None => garden
            .store()
            .estimate_historical_velocity(horizon, today)
            .context("failed to estimate velocity")?,
    };
    let result = open_engine(&garden)?.forecast(&contacts, today, horizon, velocity)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_queue(session: &TriageSession) {
    if session.is_complete() {
        println!("(garden is tended, nothing to triage)");
        return;
    }
    for (i, card) in session.active().enumerate() {
        println!(
            "{}. {} ({}): {}, {} days (target {}), {}",
            i + 1,
            card.name,
            card.contact_id,
            card.snapshot.state,
            card.snapshot.days_since_contact,
            card.snapshot.target_days,
            card.importance_tier
        );
    }
}

fn cmd_triage(today: CivilDate, max: Option<usize>) -> Result<()> {
    let garden = open_garden()?;
    let contacts = garden.store().list_contacts().context("failed to load contacts")?;
    let session = open_engine(&garden)?.build_queue(&contacts, today, max);
    print_queue(&session);
    Ok(())
}

/// A one-shot session wide enough to hold every neglected contact, so any of
/// them can be acted on from the command line.
fn full_session(garden: &Garden, today: CivilDate, id: &str) -> Result<TriageSession> {
    let contacts = garden.store().list_contacts().context("failed to load contacts")?;
    if !contacts.iter().any(|c| c.id == id) {
        bail!("unknown contact: {id}");
    }
    let session = open_engine(garden)?.build_queue(&contacts, today, Some(contacts.len()));
    if session.card(id).is_none() {
        bail!("{id} is not thirsty or fading; nothing to triage");
    }
    Ok(session)
}

async fn cmd_water(today: CivilDate, id: &str) -> Result<()> {
    let garden = open_garden()?;
    let mut session = full_session(&garden, today, id)?;
    let snapshot = session
        .water(id, &garden.store().recorder(today))
        .await
        .with_context(|| format!("failed to water {id}"))?;
    tracing::debug!("session {} watered {id}", session.id());
    println!("watered {id}: now {} ({} days)", snapshot.state, snapshot.days_since_contact);
    Ok(())
}

fn cmd_snooze(today: CivilDate, id: &str) -> Result<()> {
    let garden = open_garden()?;
    let mut session = full_session(&garden, today, id)?;
    session.snooze(id)?;
    println!("snoozed {id} for this session (nothing recorded)");
    Ok(())
}
