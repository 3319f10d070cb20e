use clap::Parser;
use consult_flow::{Orchestrator, Report, Role};
use medical_report_service::{ServiceConfig, build_oracle, init_tracing};
use std::path::PathBuf;
use tracing::info;

/// Run one agent over a medical report file and print its output
#[derive(Parser, Debug)]
#[command(name = "consult", version)]
struct Args {
    /// Plain-text medical report
    #[arg(short, long)]
    report: PathBuf,

    /// Cardiologist, Psychologist, Pulmonologist or MultidisciplinaryTeam
    #[arg(long, default_value = "Cardiologist")]
    role: String,

    /// Print the composed prompt without calling the model
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::from_env()?;
    init_tracing(&config.log_format);

    // Reject unknown roles before reading files or touching the model
    let role: Role = args.role.parse()?;

    let text = std::fs::read_to_string(&args.report)?;
    let report = Report::new(text);
    info!(role = %role, report = %args.report.display(), "Starting consultation");

    let orchestrator = Orchestrator::new(build_oracle(&config)?);

    if args.dry_run {
        let agent = orchestrator.agent_for(role, Some(&report))?;
        println!("{}", agent.create_prompt());
        return Ok(());
    }

    let consultation = orchestrator.consult(role, Some(&report)).await?;
    println!("{}\n", consultation.heading());
    println!("{}", consultation.output);

    Ok(())
}
