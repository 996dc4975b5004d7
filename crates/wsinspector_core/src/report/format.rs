//! Fixed-width cell and label formatting

use crate::config::ReportConfig;
use crate::scan::{SensitivityCell, Shift};

/// Parameter label after the configured substring replacements
#[must_use]
pub fn display_name(config: &ReportConfig, parameter: &str) -> String {
    config
        .name_replacements
        .iter()
        .fold(parameter.to_string(), |name, r| name.replace(&r.from, &r.to))
}

/// Region label with the configured tokens removed
#[must_use]
pub fn region_label(config: &ReportConfig, region: &str) -> String {
    config
        .region_strip_tokens
        .iter()
        .fold(region.to_string(), |name, token| name.replace(token, ""))
}

/// `"up / down"` text of one cell
#[must_use]
pub fn cell_text(cell: Option<&SensitivityCell>, epsilon: f64) -> String {
    let Some(cell) = cell else {
        return "-- / --".to_string();
    };
    let shown = |shift: Shift| match shift {
        Shift::Percent(p) if !shift.is_negligible(epsilon) => Some(format!("{p:.1}")),
        _ => None,
    };
    match (shown(cell.up), shown(cell.down)) {
        (None, None) => "-- / --".to_string(),
        (Some(up), None) => format!("{up} / --"),
        (None, Some(down)) => format!("-- / {down}"),
        (Some(up), Some(down)) => format!("{up} / {down}"),
    }
}

/// Left-aligned label column: `" <label padded> |"`
#[must_use]
pub fn label_column(label: &str, width: usize) -> String {
    format!(" {label:<width$} |")
}

/// Right-aligned value column the same width as a label column of `width`
#[must_use]
pub fn value_column(text: &str, width: usize) -> String {
    let padded = width + 1;
    format!("{text:>padded$} |")
}

/// Dashed separator spanning a row
#[must_use]
pub fn separator(len: usize) -> String {
    "-".repeat(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(up: Shift, down: Shift) -> SensitivityCell {
        SensitivityCell { up, down }
    }

    #[test]
    fn test_cell_text_variants() {
        let eps = 1e-5;
        assert_eq!(
            cell_text(Some(&cell(Shift::Percent(10.04), Shift::Percent(-9.96))), eps),
            "10.0 / -10.0"
        );
        assert_eq!(
            cell_text(Some(&cell(Shift::Percent(0.0), Shift::Percent(0.0))), eps),
            "-- / --"
        );
        assert_eq!(
            cell_text(Some(&cell(Shift::Percent(2.5), Shift::NoEffect)), eps),
            "2.5 / --"
        );
        assert_eq!(
            cell_text(Some(&cell(Shift::Percent(1e-7), Shift::Percent(-3.0))), eps),
            "-- / -3.0"
        );
        assert_eq!(cell_text(None, eps), "-- / --");
    }

    #[test]
    fn test_display_name_and_region_label() {
        let config = ReportConfig::default();
        assert_eq!(display_name(&config, "alpha_JetIntercalibration"), "JetInter");
        assert_eq!(region_label(&config, "Region_SR_Y2015"), "SR");
    }

    #[test]
    fn test_columns_line_up() {
        assert_eq!(label_column("SR", 18).len(), value_column("1.0 / 2.0", 18).len());
    }
}
