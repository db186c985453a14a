//! Profiles compiled into the crate.

/// `(name, RON source)` for every stock profile.
pub const BUNDLED_PROFILES: &[(&str, &str)] = &[
    ("lumberjack", include_str!("../data/profiles/lumberjack.ron")),
    ("chop_and_drop", include_str!("../data/profiles/chop_and_drop.ron")),
    ("tamer", include_str!("../data/profiles/tamer.ron")),
    ("cotton_picker", include_str!("../data/profiles/cotton_picker.ron")),
    ("ore_smelter", include_str!("../data/profiles/ore_smelter.ron")),
    ("carpenter", include_str!("../data/profiles/carpenter.ron")),
    ("corpse_looter", include_str!("../data/profiles/corpse_looter.ron")),
    ("blacksmith", include_str!("../data/profiles/blacksmith.ron")),
    ("smelter", include_str!("../data/profiles/smelter.ron")),
    ("auto_bandage", include_str!("../data/profiles/auto_bandage.ron")),
];

/// RON source of the stock profile called `name`.
pub fn bundled_profile(name: &str) -> Option<&'static str> {
    BUNDLED_PROFILES
        .iter()
        .find(|(bundled, _)| *bundled == name)
        .map(|(_, source)| *source)
}
