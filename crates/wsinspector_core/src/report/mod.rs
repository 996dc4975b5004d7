//! Plain-text reports
//!
//! Every report is returned as a `String` so the caller decides where it goes.
//! Layout is fixed-width: one label column followed by one column per region.

pub mod format;

use crate::classify::{Classification, ParamKind};
use crate::config::ReportConfig;
use crate::error::LookupError;
use crate::model::Model;
use crate::scan::{ImpactRow, SensitivityTable, ShiftRow};

use format::{cell_text, display_name, label_column, region_label, separator, value_column};

const BANNER: &str =
    "=========================================================================";
const RULE: &str = "-------------------------------------------------------------------";

pub struct ReportFormatter<'a> {
    config: &'a ReportConfig,
    epsilon: f64,
}

impl<'a> ReportFormatter<'a> {
    #[must_use]
    pub fn new(config: &'a ReportConfig, epsilon: f64) -> Self {
        Self { config, epsilon }
    }

    fn header_row(&self, label: &str, regions: &[String]) -> String {
        let mut line = label_column(label, self.config.parameter_width);
        for region in regions {
            line.push_str(&label_column(
                &region_label(self.config, region),
                self.config.region_width,
            ));
        }
        line
    }

    /// Sensitivity table of one sample: parameters down, regions across
    pub fn sample_report(&self, table: &SensitivityTable, sample: &str) -> Result<String, LookupError> {
        let grid = table.sample(sample)?;
        let header = self.header_row(" sys , region ", table.categories());
        let rule = separator(header.len());
        let mut lines = vec![
            BANNER.to_string(),
            format!("  Printing sys for sample:     ' {sample} ' "),
            BANNER.to_string(),
            header,
            rule,
        ];

        for (row, parameter) in table.parameters().iter().enumerate() {
            let mut line = label_column(
                &display_name(self.config, parameter),
                self.config.parameter_width,
            );
            for col in 0..table.categories().len() {
                let cell = grid.get(row, col).and_then(Option::as_ref);
                line.push_str(&value_column(
                    &cell_text(cell, self.epsilon),
                    self.config.region_width,
                ));
            }
            lines.push(line);
        }
        lines.push(String::new());
        Ok(lines.join("\n"))
    }

    /// Observables, samples per region, nuisance parameters, other parameters and POIs
    #[must_use]
    pub fn inventory(&self, model: &Model, classification: &Classification) -> String {
        let mut lines = vec![
            RULE.to_string(),
            "  List of model observables : ".to_string(),
            RULE.to_string(),
        ];
        let mut total_bins = 0;
        for category in model.categories() {
            match &category.observable {
                Some(obs) => {
                    total_bins += obs.bins;
                    lines.push(format!(
                        "{:>60} HAS: {:>6} bins",
                        obs.name.replace("obs_x_", ""),
                        obs.bins
                    ));
                }
                None => lines.push(format!("{:>60} HAS: no observable", category.name)),
            }
        }
        lines.push(format!(
            "Total number of categories: {}  total number of bins is: {total_bins}",
            model.categories().len()
        ));
        lines.push(String::new());

        lines.extend([
            RULE.to_string(),
            " Samples in each region : ".to_string(),
            RULE.to_string(),
        ]);
        for category in model.categories() {
            lines.push(format!("REGION: {} has components: ", category.name));
            let names: Vec<&str> = category
                .components
                .iter()
                .map(|c| c.name.as_str())
                .collect();
            lines.push(format!(" {}", names.join(" , ")));
        }
        lines.push(String::new());

        lines.extend([
            RULE.to_string(),
            "List of nuisance parameters : ".to_string(),
            RULE.to_string(),
        ]);
        let mut gammas = 0;
        let mut shown = 0;
        for &id in model.nuisance_parameters() {
            if classification.kind(id) == ParamKind::StatError {
                gammas += 1;
                continue;
            }
            let param = model.parameters.get(id);
            shown += 1;
            lines.push(format!(
                "{:>45} : {}   Err:{}  Constant: {}  Kind: {}",
                param.name,
                param.value,
                param.error,
                param.constant,
                classification.kind(id).label()
            ));
        }
        lines.push("------------------------------------".to_string());
        lines.push(format!("Total number of gammas: {gammas}"));
        lines.push(format!("Total number of NP: {shown}"));
        lines.push(String::new());

        lines.extend([
            RULE.to_string(),
            "  List of other parameters : ".to_string(),
            RULE.to_string(),
        ]);
        let mut floating = Vec::new();
        for (id, param) in model.parameters.iter() {
            if model.nuisance.contains(&id) || model.is_poi(id) {
                continue;
            }
            lines.push(format!(
                "{:>45} : {}   Err:{}  Constant: {}",
                param.name, param.value, param.error, param.constant
            ));
            if !param.constant {
                floating.push(format!("\"{}\"", param.name));
            }
        }
        if !floating.is_empty() {
            lines.push(format!(" floating: {}", floating.join(", ")));
        }
        lines.push(String::new());

        lines.extend([
            RULE.to_string(),
            "  List of parameters of interest : ".to_string(),
            RULE.to_string(),
        ]);
        for &id in model.parameters_of_interest() {
            let param = model.parameters.get(id);
            lines.push(format!(
                "{:>15} : {}   Err:{}  Constant: {}",
                param.name, param.value, param.error, param.constant
            ));
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// One row of per-region yields; missing entries print as `--`
    #[must_use]
    pub fn yields(&self, label: &str, regions: &[String], values: &[Option<f64>]) -> String {
        let header: String = regions
            .iter()
            .map(|r| format!("  {:>9}  |", truncate(&region_label(self.config, r), 9)))
            .collect();
        let row: String = values
            .iter()
            .map(|v| match v {
                Some(v) => format!("  {v:9.1}  |"),
                None => "         --  |".to_string(),
            })
            .collect();
        format!(" --> Yields for {label}\n{header}\n{row}\n")
    }

    /// Symmetric one-sigma impacts of every nuisance parameter on one region
    #[must_use]
    pub fn impacts(&self, category: &str, rows: &[ImpactRow]) -> String {
        let mut lines = vec![
            String::new(),
            format!("Details on channel {category} : "),
            "----------------------------------------------------------".to_string(),
            format!(
                " {:3} | {:<32} | {:>18} | {:>18} | {:>18} | {:>18} | {:>18} | {:>18} |",
                "",
                "Nuisance Parameter",
                "Signal events",
                "% Change (+1sig)",
                "% Change (-1sig)",
                "Background events",
                "% Change (+1sig)",
                "% Change (-1sig)"
            ),
        ];
        for (i, row) in rows.iter().enumerate() {
            lines.push(format!(
                " {i:3} | {:<32} | {:18.2} | {:18.2} | {:18.2} | {:18.2} | {:18.2} | {:18.2} |",
                row.parameter,
                row.nominal_signal,
                row.signal_up,
                row.signal_down,
                row.nominal_background,
                row.background_up,
                row.background_down
            ));
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// Percent shift per region when each systematic is pulled to +1
    #[must_use]
    pub fn systematics(&self, label: &str, regions: &[String], rows: &[ShiftRow]) -> String {
        let mut lines = vec![
            format!(" --> Sys effects for {label}"),
            self.header_row("", regions),
        ];
        for row in rows {
            let mut line = format!(" {:<40} | ", display_name(self.config, &row.parameter));
            for shift in &row.shifts {
                match shift {
                    Some(v) if *v != 0.0 => line.push_str(&format!(" {v:8.1} |")),
                    _ => line.push_str("     --   |"),
                }
            }
            lines.push(line);
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{BACKGROUND, SensitivityCell, Shift};

    fn table() -> SensitivityTable {
        let mut table = SensitivityTable::new(
            vec!["Region_SR".into(), "CR".into()],
            vec!["alpha_jes".into(), "mu_ttbar".into()],
        );
        table.record(
            BACKGROUND,
            0,
            0,
            SensitivityCell {
                up: Shift::Percent(10.0),
                down: Shift::Percent(-10.0),
            },
        );
        table.record(
            BACKGROUND,
            1,
            1,
            SensitivityCell {
                up: Shift::Percent(0.0),
                down: Shift::Percent(0.0),
            },
        );
        table
    }

    #[test]
    fn test_sample_report_layout() {
        let config = ReportConfig::default();
        let formatter = ReportFormatter::new(&config, 1e-5);
        let text = formatter.sample_report(&table(), BACKGROUND).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[1].contains("' background '"));
        assert!(lines[3].starts_with("  sys , region "));
        assert!(lines[3].contains(" SR "));
        assert!(lines[4].chars().all(|c| c == '-'));
        assert!(lines[5].starts_with(" jes "));
        assert!(lines[5].contains("10.0 / -10.0 |"));
        assert!(lines[6].contains("-- / -- |"));
        assert_eq!(lines[3].len(), lines[5].len());
    }

    #[test]
    fn test_missing_sample_report_is_lookup_error() {
        let config = ReportConfig::default();
        let formatter = ReportFormatter::new(&config, 1e-5);
        assert_eq!(
            formatter.sample_report(&table(), "nonexistent"),
            Err(LookupError::SampleNotFound("nonexistent".to_string()))
        );
    }

    #[test]
    fn test_yields_row_marks_missing() {
        let config = ReportConfig::default();
        let formatter = ReportFormatter::new(&config, 1e-5);
        let text = formatter.yields(
            "ttbar",
            &["SR".to_string(), "CR".to_string()],
            &[Some(123.45), None],
        );
        assert!(text.contains("      123.5  |"));
        assert!(text.contains("         --  |"));
    }
}
