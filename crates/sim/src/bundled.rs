//! Scenarios compiled into the crate.

/// `(name, RON source)` for every bundled scenario.
pub const BUNDLED_SCENARIOS: &[(&str, &str)] = &[
    ("lumberjack", include_str!("../data/scenarios/lumberjack.ron")),
    ("ranch", include_str!("../data/scenarios/ranch.ron")),
    ("cotton_field", include_str!("../data/scenarios/cotton_field.ron")),
    ("mine", include_str!("../data/scenarios/mine.ron")),
    ("workshop", include_str!("../data/scenarios/workshop.ron")),
    ("graveyard", include_str!("../data/scenarios/graveyard.ron")),
    ("smithy", include_str!("../data/scenarios/smithy.ron")),
    ("infirmary", include_str!("../data/scenarios/infirmary.ron")),
];

pub fn bundled_scenario(name: &str) -> Option<&'static str> {
    BUNDLED_SCENARIOS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, source)| *source)
}
