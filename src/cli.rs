use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sdlt-risk",
    about = "SDLT risk score engine - validate weight matrices and score questionnaire submissions",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (TOML)
    #[arg(short, long, global = true, default_value = "sdlt.toml")]
    pub config: PathBuf,

    /// Number of parallel scoring threads (0 = auto-detect, overrides settings)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Name recorded as the acting user (defaults to the OS user)
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Enable verbose logging of all operations
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide progress bars and use quiet output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write the default settings file
    InitConfig {
        /// Where to write the settings
        #[arg(short, long, default_value = "sdlt.toml")]
        path: PathBuf,
    },
    /// Run write-time validation over a dataset and optional questionnaire
    Validate {
        /// Dataset file (risks, components, controls, weights)
        #[arg(short, long)]
        dataset: PathBuf,
        /// Questionnaire definition (JSON)
        #[arg(long)]
        questionnaire: Option<PathBuf>,
    },
    /// Score a single submission
    Score {
        #[arg(short, long)]
        dataset: PathBuf,
        /// Submission file (JSON)
        #[arg(short, long)]
        submission: PathBuf,
        #[arg(long, default_value = "strict")]
        matrix: MatrixMode,
        /// Write the score report to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score every submission file under a directory
    Batch {
        #[arg(short, long)]
        dataset: PathBuf,
        /// Directory searched recursively for *.json submissions
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value = "strict")]
        matrix: MatrixMode,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// How weight rows from the dataset enter the matrix.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum MatrixMode {
    /// Rows go through write-time validation; rejected rows are dropped
    Strict,
    /// Rows are taken as stored; duplicate triples fail scoring when hit
    Stored,
}

impl std::fmt::Display for MatrixMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixMode::Strict => write!(f, "strict"),
            MatrixMode::Stored => write!(f, "stored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_command() {
        let args = Args::try_parse_from([
            "sdlt-risk",
            "score",
            "-d",
            "data.json",
            "-s",
            "sub.json",
            "--matrix",
            "stored",
            "--actor",
            "reviewer",
        ])
        .unwrap();
        assert_eq!(args.actor.as_deref(), Some("reviewer"));
        match args.command {
            Command::Score { matrix, output, .. } => {
                assert_eq!(matrix, MatrixMode::Stored);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "sdlt-risk", "batch", "-d", "data.json", "--dir", "subs", "-t", "4", "-q",
        ])
        .unwrap();
        assert_eq!(args.threads, Some(4));
        assert!(args.quiet);
        assert_eq!(args.config, PathBuf::from("sdlt.toml"));
    }
}
