use std::path::Path;

use almanac_core::{evaluate, AnomalyLabel};

use crate::cli::EvaluateArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &EvaluateArgs) -> Result<CommandResult, CliError> {
    let truth = read_labels(&args.truth)?;
    let predicted = read_labels(&args.predicted)?;
    let metrics = evaluate(&truth, &predicted)?;
    Ok(CommandResult::ok(serde_json::to_value(metrics)?))
}

fn read_labels(path: &Path) -> Result<Vec<AnomalyLabel>, CliError> {
    let payload = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write");
        path
    }

    #[test]
    fn scores_label_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = EvaluateArgs {
            truth: write(dir.path(), "truth.json", r#"["anomalous", "normal", "anomalous", "normal"]"#),
            predicted: write(dir.path(), "predicted.json", r#"["anomalous", "anomalous", "normal", "normal"]"#),
        };
        let result = run(&args).expect("evaluate");
        assert_eq!(result.data["precision"], 0.5);
        assert_eq!(result.data["recall"], 0.5);
        assert_eq!(result.data["true_positives"], 1);
    }

    #[test]
    fn length_mismatch_is_a_pipeline_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = EvaluateArgs {
            truth: write(dir.path(), "truth.json", r#"["normal"]"#),
            predicted: write(dir.path(), "predicted.json", r#"["normal", "normal"]"#),
        };
        let err = run(&args).err().expect("must fail");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn unknown_label_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = EvaluateArgs {
            truth: write(dir.path(), "truth.json", r#"["weird"]"#),
            predicted: write(dir.path(), "predicted.json", r#"["normal"]"#),
        };
        assert!(matches!(run(&args), Err(CliError::Serialization(_))));
    }
}
