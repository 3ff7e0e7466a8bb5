use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use configuration::LogFormat;
use database::bson::{self, Bson, Document};
use database::{Context, SpellRepository};
use std::path::PathBuf;
use web_server::Store;

/// The main entry point for the spell API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = configuration::load_config_from(&cli.config)?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _log_guard = configuration::init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Serve(args) => {
            if let Some(port) = args.port {
                config.server.port = port;
            }
            web_server::run(config).await
        }
        Commands::Spell(command) => {
            let store = Store::open(&config.database)
                .await
                .context("Failed to connect to the document store")?;
            let ctx = match config.database.operation_timeout() {
                Some(timeout) => Context::background().with_timeout(timeout),
                None => Context::background(),
            };

            let outcome = handle_spell_command(command, &store.spells, &ctx).await;
            store.close().await;
            outcome
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Look up, add and remove spells in the spell API's document store.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured log line format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    #[command(flatten)]
    Spell(SpellCommand),
}

/// Commands that work on the spell collection directly.
#[derive(Subcommand)]
enum SpellCommand {
    /// Print every spell matching a JSON filter.
    Get(GetArgs),
    /// Store one spell given as a JSON object.
    Add(AddArgs),
    /// Delete the first spell matching a JSON filter.
    Delete(DeleteArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Port to listen on instead of the configured one.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Parser)]
struct GetArgs {
    /// The filter, e.g. '{"name": "Fireball"}'.
    #[arg(long, default_value = "{}")]
    filter: String,

    #[arg(long, value_enum, default_value_t = Output::Json)]
    output: Output,
}

#[derive(Parser)]
struct AddArgs {
    /// The spell, e.g. '{"name": "Fireball", "level": 3}'.
    #[arg(long)]
    spell: String,
}

#[derive(Parser)]
struct DeleteArgs {
    /// The filter, e.g. '{"name": "Fireball"}'.
    #[arg(long)]
    filter: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Table,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_spell_command(
    command: SpellCommand,
    spells: &SpellRepository,
    ctx: &Context,
) -> anyhow::Result<()> {
    match command {
        SpellCommand::Get(args) => {
            let filter = parse_document(&args.filter)?;
            let found = spells.get_spell(ctx, filter).await?;
            match args.output {
                Output::Json => {
                    let json: Vec<_> = found
                        .into_iter()
                        .map(|spell| Bson::Document(spell).into_relaxed_extjson())
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                Output::Table => println!("{}", render_table(&found)),
            }
        }
        SpellCommand::Add(args) => {
            let spell = parse_document(&args.spell)?;
            spells.add_spell(ctx, &bson::to_vec(&spell)?).await?;
            tracing::info!("Spell added.");
        }
        SpellCommand::Delete(args) => {
            let filter = parse_document(&args.filter)?;
            spells.delete_spell(ctx, filter).await?;
            tracing::info!("Delete finished.");
        }
    }
    Ok(())
}

/// Parses a JSON object given on the command line into a BSON document.
fn parse_document(json: &str) -> anyhow::Result<Document> {
    let value: serde_json::Value =
        serde_json::from_str(json).with_context(|| format!("'{json}' is not valid JSON"))?;
    if !value.is_object() {
        anyhow::bail!("'{json}' must be a JSON object");
    }
    Ok(bson::to_document(&value)?)
}

/// One row per spell, one column per field seen in any of them.
fn render_table(spells: &[Document]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for spell in spells {
        for key in spell.keys() {
            if key != "_id" && !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new();
    table.set_header(columns.clone());
    for spell in spells {
        table.add_row(columns.iter().map(|column| match spell.get(column) {
            Some(Bson::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        }));
    }
    table
}
