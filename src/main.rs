use clap::Parser;
use env_logger::Env;
use sdlt_risk::cli::{Args, Command, MatrixMode};
use sdlt_risk::config::{self, Settings};
use sdlt_risk::dataset::{self, Dataset};
use sdlt_risk::questionnaire::Questionnaire;
use sdlt_risk::reporter;
use sdlt_risk::submission::Submission;
use sdlt_risk::ui::BatchProgress;
use sdlt_risk::{AuditContext, RiskScoreEngine, SdltError};
use std::path::Path;

type MainResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn build_engine(
    dataset_path: &Path,
    mode: MatrixMode,
    settings: Settings,
    ctx: &AuditContext,
) -> MainResult<RiskScoreEngine> {
    let dataset = Dataset::load(dataset_path)?;
    let catalog = dataset.catalog();
    let matrix = match mode {
        MatrixMode::Strict => {
            let (matrix, rejected) = dataset.build_matrix(&catalog, ctx);
            if !rejected.is_empty() {
                log::warn!(
                    "{} weight rows rejected; run `validate` for details",
                    rejected.len()
                );
            }
            matrix
        }
        MatrixMode::Stored => dataset.build_matrix_unchecked(&catalog),
    };
    Ok(RiskScoreEngine::new(catalog, matrix, settings))
}

fn validate(
    dataset_path: &Path,
    questionnaire_path: Option<&Path>,
    settings: &Settings,
    ctx: &AuditContext,
) -> MainResult<bool> {
    let dataset = Dataset::load(dataset_path)?;
    let catalog = dataset.catalog();
    let (matrix, rejected) = dataset.build_matrix(&catalog, ctx);

    println!(
        "    Weight rows accepted: {} of {}",
        matrix.len(),
        dataset.weights.len()
    );
    for rejection in &rejected {
        println!("    ✗ row {}: {}", rejection.index, rejection.errors);
    }

    let mut ok = rejected.is_empty();
    if let Some(path) = questionnaire_path {
        let contents =
            std::fs::read_to_string(path).map_err(|e| SdltError::io(e, path.to_path_buf()))?;
        let questionnaire: Questionnaire =
            serde_json::from_str(&contents).map_err(|e| SdltError::json(e, path.to_path_buf()))?;
        let errors = questionnaire.validate(None, &settings.expiry);
        if errors.is_empty() {
            println!("    Questionnaire '{}' is valid", questionnaire.name);
        } else {
            ok = false;
            for error in errors.iter() {
                println!("    ✗ {}: {}", error.field, error.message);
            }
        }
    }
    Ok(ok)
}

fn main() -> MainResult<()> {
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet flags
    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    log::debug!("sdlt-risk starting with args: {:?}", args);

    let ctx = AuditContext::resolve(args.actor.as_deref());
    let mut settings = config::load_config(&args.config)?;
    if let Some(threads) = args.threads {
        settings.threads = threads;
    }

    match args.command {
        Command::InitConfig { path } => {
            config::save_config(&config::create_default_config(), &path)?;
            println!("Settings file created at: {}", path.display());
        }

        Command::Validate {
            dataset,
            questionnaire,
        } => {
            if !validate(&dataset, questionnaire.as_deref(), &settings, &ctx)? {
                std::process::exit(1);
            }
        }

        Command::Score {
            dataset,
            submission,
            matrix,
            output,
        } => {
            let engine = build_engine(&dataset, matrix, settings, &ctx)?;
            let submission = Submission::load(&submission)?;
            let score = engine
                .score_submission(&submission, &ctx)
                .map_err(|e| SdltError::scoring(submission.id.clone(), e))?;

            print!("{}", reporter::render_submission(&score));
            if let Some(path) = output {
                reporter::export_json(&score, &path)?;
            }
        }

        Command::Batch {
            dataset,
            dir,
            matrix,
            output,
        } => {
            let engine = build_engine(&dataset, matrix, settings, &ctx)?;
            let paths = dataset::discover_submissions(&dir)?;
            let (submissions, unreadable) = dataset::load_submissions(&paths);
            for (path, e) in &unreadable {
                eprintln!("Skipping {}: {}", path.display(), e);
            }

            let progress = BatchProgress::new(submissions.len() as u64, args.quiet)?;
            let entries = engine.score_batch(&submissions, &ctx, |entry| progress.record(entry))?;
            progress.finish();

            print!("{}", reporter::render_batch(&entries));
            if let Some(path) = output {
                reporter::export_json(&entries, &path)?;
            }
        }
    }

    Ok(())
}
