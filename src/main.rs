//! cogagency CLI: drive and inspect a cognitive agency.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use cognitive_agency::agency::Agency;
use cognitive_agency::config::AgencyConfig;
use cognitive_agency::scenario;

#[derive(Parser)]
#[command(name = "cogagency", version, about = "Cognitive agency: atoms, agents, rules and plans")]
struct Cli {
    /// Agency configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler-optimization walk-through and print the result.
    Scenario {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AgencyConfig::load(path)?,
        None => AgencyConfig::default(),
    };

    match cli.command {
        Commands::Scenario { json } => {
            let agency = Agency::init(config)?;
            let report = scenario::run(&agency)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                println!("Cognitive scenario: scheduler optimization");
                println!(
                    "  Agents: {}  Atoms: {}/{}  Rules: {}  Links: {}",
                    report.agency.agents,
                    report.agency.atoms,
                    report.agency.max_atoms,
                    report.agency.rules,
                    report.links
                );
                println!("  Related to cpu_load: {}", report.related.join(", "));
                println!("  Derived atoms: {}", report.derived);
                println!(
                    "  Plan: {} actions, total cost {:.1}",
                    report.plan_actions, report.plan_cost
                );
                println!("  Learned confidence: {:.2}", report.learned_confidence);
                for agent in &report.agents {
                    let s = &agent.stats;
                    println!(
                        "  {} [{}]: reasoning={} actions={} sent={} processed={} knowledge={}",
                        agent.name,
                        s.state,
                        s.reasoning_cycles,
                        s.actions_executed,
                        s.messages_sent,
                        s.messages_processed,
                        s.knowledge
                    );
                }
            }

            agency.shutdown();
        }

        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
