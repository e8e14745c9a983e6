//! ranq - run queries against the telemetry data lake.

use std::sync::Arc;

use ran_query::cli::{parse_format, Cli, Command, RunArgs};
use ran_query::config::Config;
use ran_query::error::Result;
use ran_query::logging;
use ran_query::output;
use ran_query::query::{AsyncQueryExecutor, PollPolicy};
use ran_query::schema::SchemaSetup;
use ran_query::service::{
    AthenaClient, QueryHandle, QueryService, QuerySubmission, ScriptedQueryService,
};
use ran_query::statement::classify_statement;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    let level = logging::default_level(cli.verbose);
    match &cli.log_file {
        Some(path) => {
            if let Err(e) = logging::init_file_logging(path, level) {
                eprintln!("Warning: {e}");
            }
        }
        None => logging::init_stderr_logging(level),
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    // Precedence: CLI flags, then config file, then environment.
    cli.apply_overrides(&mut config);
    config.apply_env_defaults();

    let service = build_service(&cli, &config)?;
    let executor = AsyncQueryExecutor::new(service);
    let policy = config.query.poll_policy();
    policy.validate()?;

    match cli.command {
        Command::Run(args) => run_statement(&executor, &config, &policy, &args).await,
        Command::Setup => {
            let database = config.query.require_database()?;
            let output_location = config.query.require_output_location()?;
            let setup = SchemaSetup::new(&executor, database, output_location, policy);
            let report = setup.run(&config.tables).await?;

            println!(
                "Database '{}': {} of {} tables created",
                report.database,
                report.created.len(),
                config.tables.len()
            );
            for failure in &report.failures {
                println!("  {:?} {}: {}", failure.step, failure.table, failure.message);
            }
            Ok(())
        }
        Command::Status { handle } => {
            let handle = QueryHandle::new(handle);
            let status = executor.status(&handle).await?;
            match status.reason {
                Some(reason) => println!("{}: {} ({})", handle, status.state, reason),
                None => println!("{}: {}", handle, status.state),
            }
            Ok(())
        }
        Command::Fetch { handle, format } => {
            let format = parse_format(&format)?;
            let handle = QueryHandle::new(handle);
            executor.wait_for(&handle, &policy).await?;
            let result = executor.fetch_all(&handle).await?;
            print!("{}", output::render(&result, format)?);
            Ok(())
        }
        Command::Cancel { handle } => {
            executor.cancel(&QueryHandle::new(handle)).await?;
            println!("Cancellation requested");
            Ok(())
        }
    }
}

async fn run_statement(
    executor: &AsyncQueryExecutor,
    config: &Config,
    policy: &PollPolicy,
    args: &RunArgs,
) -> Result<()> {
    let statement = args.statement_text()?;
    let format = args.output_format()?;
    let output_location = config.query.require_output_location()?;

    let submission = if args.no_database {
        QuerySubmission::without_dataset(statement, output_location)
    } else {
        QuerySubmission::new(statement, config.query.require_database()?, output_location)
    };

    let fetch = args
        .fetch_override()
        .unwrap_or_else(|| classify_statement(&submission.statement).returns_rows());

    if fetch {
        let result = executor.execute_submission(&submission, policy).await?;
        print!("{}", output::render(&result, format)?);
    } else {
        let completion = executor.run_to_completion(&submission, policy).await?;
        println!("Query {} succeeded", completion.handle);
    }
    Ok(())
}

fn build_service(cli: &Cli, config: &Config) -> Result<Arc<dyn QueryService>> {
    if cli.mock {
        info!("Using scripted query service");
        return Ok(Arc::new(ScriptedQueryService::succeeding(
            vec!["cell_id", "alarm_name", "alarm_severity"],
            vec![
                vec![Some("C-101".into()), Some("LINK_DOWN".into()), Some("major".into())],
                vec![Some("C-205".into()), Some("HIGH_TEMP".into()), Some("minor".into())],
            ],
        )));
    }

    let athena = config.athena_config()?;
    info!("Query service endpoint: {}", athena.endpoint);
    Ok(Arc::new(AthenaClient::new(athena)?))
}
