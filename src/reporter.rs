use crate::errors::{SdltError, SdltResult};
use crate::matrix::short_fingerprint;
use crate::scoring::{BatchEntry, BatchOutcome, ScopeScore, SubmissionScore};
use console::style;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Write any report as pretty JSON.
pub fn export_json<T: Serialize>(report: &T, path: &Path) -> SdltResult<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SdltError::json(e, None::<std::path::PathBuf>))?;
    std::fs::write(path, json).map_err(|e| SdltError::io(e, path.to_path_buf()))?;
    log::info!("Report written to {:?}", path);
    Ok(())
}

fn styled_rating(rating: Option<&str>) -> String {
    match rating {
        Some(name @ "Extreme") | Some(name @ "High") => style(name).red().bold().to_string(),
        Some(name @ "Medium") => style(name).yellow().to_string(),
        Some(name) => style(name).green().to_string(),
        None => style("-").dim().to_string(),
    }
}

fn render_scope(out: &mut String, scope: &ScopeScore) {
    let _ = writeln!(
        out,
        "    {} {:<10} {:<24} {:>12.2}  {}",
        style("├─").dim(),
        scope.scope.kind.to_string(),
        scope.scope.id,
        scope.score,
        styled_rating(scope.rating.as_deref())
    );
    if let Some(pair) = &scope.dominant {
        let _ = writeln!(
            out,
            "    {}   dominant: {} / {} / {} (weight {}, L{} I{}) = {:.2}",
            style("│").dim(),
            pair.component,
            pair.control,
            pair.risk,
            pair.weight,
            pair.likelihood,
            pair.impact,
            pair.value
        );
    }
}

/// Terminal summary for one scored submission.
pub fn render_submission(score: &SubmissionScore) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "    {} {} ({})",
        style("▶").cyan(),
        style(&score.submission).white().bold(),
        score.questionnaire_name
    );

    if !score.risk_relevant {
        let _ = writeln!(out, "    {} not a risk questionnaire", style("└─").dim());
        return out;
    }

    if let Some(calculation) = score.calculation {
        let _ = writeln!(out, "    {} formula: {}", style("├─").dim(), calculation);
    }
    for scope in &score.scopes {
        render_scope(&mut out, scope);
    }
    if let Some(expiry) = score.expires_at {
        let _ = writeln!(out, "    {} expires: {}", style("├─").dim(), expiry.format("%Y-%m-%d"));
    }
    let approval = if score.requires_approval {
        style("approval required").yellow().to_string()
    } else {
        style("approval not required").green().to_string()
    };
    let _ = writeln!(
        out,
        "    {} {} · matrix {}",
        style("└─").dim(),
        approval,
        short_fingerprint(&score.matrix_fingerprint)
    );
    out
}

/// Terminal summary for a batch run.
pub fn render_batch(entries: &[BatchEntry]) -> String {
    let mut out = String::new();
    let mut failed = 0;
    for entry in entries {
        match &entry.outcome {
            BatchOutcome::Scored { score } => out.push_str(&render_submission(score)),
            BatchOutcome::Failed { error } => {
                failed += 1;
                let _ = writeln!(
                    out,
                    "    {} {}: {}",
                    style("✗").red(),
                    style(&entry.submission).white().bold(),
                    error
                );
            }
        }
    }
    let _ = writeln!(
        out,
        "\n    Scored {} of {} submissions ({} failed)",
        entries.len() - failed,
        entries.len(),
        failed
    );
    out
}
