//! One command-line inspection: load, inspect, print, write checks

use std::io::Write;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use jiff::Timestamp;
use wsinspector_core::{InspectConfig, Inspection, Inspector, load_model};

use crate::output::{ChecksFile, write_checks};

/// Resolved command-line inputs
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub workspace: String,
    pub model_config: String,
    pub dataset: String,
    pub config: Option<PathBuf>,
    /// Appended to the configured sample list
    pub samples: Vec<String>,
}

/// Read the YAML config at `path`, or the defaults when there is none
pub fn load_config(path: Option<&Path>) -> Result<InspectConfig> {
    let Some(path) = path else {
        return Ok(InspectConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let config: InspectConfig = serde_saphyr::from_str(&content)
        .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded inspection config");
    Ok(config)
}

/// Load the config and model and validate them. Touches nothing on disk.
pub fn prepare(opts: &RunOptions) -> Result<Inspector> {
    let mut config = load_config(opts.config.as_deref())?;
    for sample in &opts.samples {
        if !config.samples.contains(sample) {
            config.samples.push(sample.clone());
        }
    }

    let model = load_model(
        &opts.input,
        &opts.workspace,
        &opts.model_config,
        &opts.dataset,
    )?;
    Ok(Inspector::new(model, config)?)
}

/// Run the inspection described by `opts`, writing the text report to `out`
pub fn run<W: Write>(opts: &RunOptions, out: &mut W) -> Result<Inspection> {
    let mut inspector = prepare(opts)?;
    execute(opts, &mut inspector, out)
}

/// Run a prepared inspection, print its report and write the checks files
pub fn execute<W: Write>(
    opts: &RunOptions,
    inspector: &mut Inspector,
    out: &mut W,
) -> Result<Inspection> {
    let inspection = inspector.run()?;

    out.write_all(inspection.report.as_bytes())?;
    out.flush()?;

    let checks = ChecksFile {
        generated_at: Timestamp::now(),
        input: opts.input.display().to_string(),
        workspace: opts.workspace.clone(),
        model_config: opts.model_config.clone(),
        dataset: opts.dataset.clone(),
        matrices: inspection.matrices.clone(),
        skipped_samples: inspection.skipped_samples.clone(),
    };
    write_checks(&opts.out_dir, &checks, inspector.config())
        .wrap_err("failed to write checks output")?;

    if !inspection.skipped_samples.is_empty() {
        tracing::warn!(
            "{} requested sample(s) had no computed entries: {}",
            inspection.skipped_samples.len(),
            inspection.skipped_samples.join(", ")
        );
    }
    Ok(inspection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CHECKS_FILE;
    use tempfile::tempdir;
    use wsinspector_core::{CategoryBuilder, ModelBuilder, SampleBuilder};

    fn write_model(dir: &Path) -> PathBuf {
        let document = ModelBuilder::new("combined")
            .poi("SigXsecOverSM", 1.0)
            .lumi(1.0, 0.1)
            .category(
                CategoryBuilder::new("Region_SR_Y2015", 1)
                    .stat_uncertainty(vec![0.05])
                    .data(vec![160.0])
                    .sample(
                        SampleBuilder::new("Zprime", vec![50.0])
                            .norm_factor("SigXsecOverSM")
                            .lumi()
                            .overall_sys("alpha_x", 0.9, 1.1),
                    )
                    .sample(
                        SampleBuilder::new("ttbar", vec![100.0])
                            .lumi()
                            .overall_sys("alpha_x", 0.9, 1.1)
                            .stat_error(),
                    ),
            )
            .build_document();
        let path = dir.join("ws.json");
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();
        path
    }

    fn options(dir: &Path, input: PathBuf) -> RunOptions {
        RunOptions {
            input,
            out_dir: dir.join("results"),
            workspace: "combined".to_string(),
            model_config: "ModelConfig".to_string(),
            dataset: "obsData".to_string(),
            config: None,
            samples: vec!["ttbar".to_string(), "diboson".to_string()],
        }
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = tempdir().unwrap();
        let input = write_model(dir.path());
        let opts = options(dir.path(), input);

        let mut sink = Vec::new();
        let inspection = run(&opts, &mut sink).unwrap();
        let report = String::from_utf8(sink).unwrap();

        assert!(report.contains("' ttbar '"));
        assert!(report.contains("alpha_x"));
        assert_eq!(inspection.skipped_samples, vec!["diboson"]);

        let checks_path = opts.out_dir.join("Checks").join(CHECKS_FILE);
        let checks: ChecksFile =
            serde_json::from_str(&std::fs::read_to_string(checks_path).unwrap()).unwrap();
        assert_eq!(checks.workspace, "combined");
        assert_eq!(checks.matrices.categories, vec!["Region_SR_Y2015"]);
        assert_eq!(checks.skipped_samples, vec!["diboson"]);
    }

    #[test]
    fn test_config_file_is_merged_with_samples() {
        let dir = tempdir().unwrap();
        let input = write_model(dir.path());
        let config_path = dir.path().join("inspect.yaml");
        std::fs::write(
            &config_path,
            "samples: [Zprime]\nshow_impacts: true\nepsilon: 1.0e-4\n",
        )
        .unwrap();

        let mut opts = options(dir.path(), input);
        opts.config = Some(config_path);
        let mut sink = Vec::new();
        run(&opts, &mut sink).unwrap();
        let report = String::from_utf8(sink).unwrap();

        assert!(report.contains("' Zprime '"));
        assert!(report.contains("' ttbar '"));
    }

    #[test]
    fn test_demo_model_and_config() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let dir = tempdir().unwrap();
        let mut opts = options(dir.path(), demos.join("example.yaml"));
        opts.config = Some(demos.join("inspect.yaml"));
        opts.samples.clear();

        let mut sink = Vec::new();
        let inspection = run(&opts, &mut sink).unwrap();
        let report = String::from_utf8(sink).unwrap();

        assert!(inspection.skipped_samples.is_empty());
        assert!(report.contains("' background1 '"));
        assert!(report.contains("shape1"));
        assert_eq!(inspection.matrices.categories, vec!["channel1", "channel2"]);
    }

    #[test]
    fn test_missing_workspace_fails() {
        let dir = tempdir().unwrap();
        let input = write_model(dir.path());
        let mut opts = options(dir.path(), input);
        opts.workspace = "other".to_string();

        let mut sink = Vec::new();
        assert!(run(&opts, &mut sink).is_err());
        assert!(!opts.out_dir.exists());
    }

    #[test]
    fn test_bad_input_path_leaves_no_output_directory() {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), dir.path().join("absent.json"));

        assert!(prepare(&opts).is_err());
        assert!(!opts.out_dir.exists());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.yaml"))).is_err());
        assert_eq!(load_config(None).unwrap(), InspectConfig::default());
    }
}
