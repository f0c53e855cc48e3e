use clap::{Parser, Subcommand};
use finproj::cmd::project::ProjectCommand;
use finproj::cmd::rules::RulesCommand;
use finproj::cmd::run::RunCommand;
use finproj::cmd::schema::SchemaCommand;
use finproj::cmd::trace::TraceCommand;
use finproj::cmd::validate::ValidateCommand;

/// Deterministic multi-year tax, super and cashflow projections
#[derive(Parser, Debug)]
#[command(name = "finproj", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project a scenario over a multi-year horizon
    Project(ProjectCommand),
    /// Execute a single calculation against a scenario
    Run(RunCommand),
    /// List rule set versions and their coverage windows
    Rules(RulesCommand),
    /// Check a scenario for input problems
    Validate(ValidateCommand),
    /// Run a projection and inspect its calculation trace
    Trace(TraceCommand),
    /// Print the scenario JSON schema and trace CSV format
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Project(cmd) => cmd.exec(),
        Command::Run(cmd) => cmd.exec(),
        Command::Rules(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
        Command::Trace(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
