//! AgentFlow CLI — run workflows, templates and planned requests.
//!
//! Wires the agentflow-core engine with the built-in skills, the templates
//! found on disk and (when configured) a language model for planning.

use agentflow_cli::commands;
use clap::{Parser, Subcommand};

/// AgentFlow CLI — skill-based workflow orchestration
#[derive(Parser)]
#[command(name = "agentflow", version, about = "AgentFlow CLI — skill-based workflow orchestration")]
pub struct Cli {
    /// Directory of template definitions (*.yaml, *.yml, *.json)
    #[arg(long, env = "AGENTFLOW_TEMPLATES_DIR", default_value = "templates", global = true)]
    templates_dir: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a custom workflow file
    Run {
        /// Path to the workflow YAML/JSON file
        file: String,
    },

    /// Validate a workflow file without executing it
    Validate {
        /// Path to the workflow YAML/JSON file
        file: String,
    },

    /// Execute a request: a matching template, or a model-planned workflow
    Request {
        /// Template id or free-form request type
        request_type: String,
        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Inspect the template catalog
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Inspect registered skills
    Skill {
        #[command(subcommand)]
        action: SkillAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List loaded templates
    List,
    /// Show a template's parameters and step count
    Info {
        /// Template id
        id: String,
    },
}

#[derive(Subcommand)]
enum SkillAction {
    /// List registered skills and their input schemas
    List,
}

#[tokio::main]
async fn main() {
    // .env.local wins over .env; variables already set win over both.
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentflow_core=warn,agentflow_cli=info".into()),
        )
        .init();

    let result = match commands::init_runtime(&cli.templates_dir) {
        Ok(orchestrator) => match cli.command {
            Commands::Run { file } => commands::workflow::run(&orchestrator, &file, cli.json).await,
            Commands::Validate { file } => {
                commands::workflow::validate(&orchestrator, &file, cli.json).await
            }
            Commands::Request {
                request_type,
                params,
            } => commands::request::run(&orchestrator, &request_type, &params, cli.json).await,
            Commands::Template { action } => match action {
                TemplateAction::List => commands::template::list(&orchestrator, cli.json).await,
                TemplateAction::Info { id } => {
                    commands::template::info(&orchestrator, &id, cli.json).await
                }
            },
            Commands::Skill { action } => match action {
                SkillAction::List => commands::skill::list(&orchestrator, cli.json).await,
            },
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
