//! Shared test models

use crate::config::{CategoryBuilder, ModelBuilder, SampleBuilder};
use crate::model::Model;

pub const POI: &str = "SigXsecOverSM";

/// One single-bin region with a 50-event signal and a 100-event background.
///
/// - `alpha_x` moves both by 10% per unit
/// - `mu_ttbar` is a normalization factor on the background
/// - `Lumi` (nominal 1.0, 10% error) scales both
/// - the background carries a 5% MC statistical uncertainty
pub fn scenario_builder() -> ModelBuilder {
    ModelBuilder::new("combined")
        .poi(POI, 1.0)
        .lumi(1.0, 0.1)
        .nuisance("alpha_x", 0.0)
        .nuisance("mu_ttbar", 1.0)
        .category(
            CategoryBuilder::new("SR", 1)
                .stat_uncertainty(vec![0.05])
                .sample(
                    SampleBuilder::new("Zprime", vec![50.0])
                        .norm_factor(POI)
                        .lumi()
                        .overall_sys("alpha_x", 0.9, 1.1),
                )
                .sample(
                    SampleBuilder::new("ttbar", vec![100.0])
                        .lumi()
                        .overall_sys("alpha_x", 0.9, 1.1)
                        .norm_factor("mu_ttbar")
                        .stat_error(),
                )
                .data(vec![160.0]),
        )
}

pub fn scenario_model() -> Model {
    scenario_builder().build_model().unwrap()
}

/// The scenario model plus a control region whose only sample has zero yield
pub fn degenerate_model() -> Model {
    scenario_builder()
        .category(
            CategoryBuilder::new("CR", 1)
                .sample(SampleBuilder::new("fakes", vec![0.0]).overall_sys("alpha_x", 0.9, 1.1)),
        )
        .build_model()
        .unwrap()
}

/// Two-channel model with a Z' signal, two backgrounds, six systematics
/// and a shape uncertainty on the first background.
pub fn two_channel_model() -> Model {
    ModelBuilder::new("combined")
        .poi(POI, 1.0)
        .lumi(1.0, 0.1)
        .category(
            CategoryBuilder::new("channel1", 2)
                .stat_uncertainty(vec![0.05, 0.05])
                .sample(
                    SampleBuilder::new("Zprime", vec![20.0, 10.0])
                        .norm_factor(POI)
                        .lumi()
                        .overall_sys("alpha_syst1", 0.95, 1.05),
                )
                .sample(
                    SampleBuilder::new("background1", vec![100.0, 0.0])
                        .lumi()
                        .stat_error()
                        .overall_sys("alpha_syst2", 0.95, 1.05)
                        .histo_sys("alpha_shape1", vec![95.0, 0.0], vec![110.0, 0.0]),
                )
                .sample(
                    SampleBuilder::new("background2", vec![0.0, 100.0])
                        .lumi()
                        .stat_error()
                        .overall_sys("alpha_syst3", 0.95, 1.05),
                )
                .data(vec![122.0, 112.0]),
        )
        .category(
            CategoryBuilder::new("channel2", 2)
                .stat_uncertainty(vec![0.1, 0.1])
                .sample(
                    SampleBuilder::new("Zprime", vec![20.0, 10.0])
                        .norm_factor(POI)
                        .lumi()
                        .overall_sys("alpha_syst4", 0.95, 1.05),
                )
                .sample(
                    SampleBuilder::new("background1", vec![100.0, 0.0])
                        .lumi()
                        .stat_error()
                        .overall_sys("alpha_syst5", 0.95, 1.05),
                )
                .sample(
                    SampleBuilder::new("background2", vec![0.0, 100.0])
                        .lumi()
                        .stat_error()
                        .overall_sys("alpha_syst6", 0.95, 1.05),
                )
                .data(vec![122.0, 112.0]),
        )
        .build_model()
        .unwrap()
}
