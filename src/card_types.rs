//! City-card codes keyed by university acronym, as required by the MPK
//! validity-check endpoint.

const CITY_CARD_TYPES: &[(&str, u32)] = &[
    ("wszib", 20),
    ("agh", 21),
    ("uj", 22),
    ("pk", 23),
    ("ue", 24),
    ("ur", 25),
    ("pwst", 26),
    ("am", 27),
    ("wse", 28),
    ("aik", 29),
    ("up", 30),
    ("wsh", 31),
    ("ka", 32),
    ("wsei", 33),
    ("ifj", 34),
    ("if", 35),
    ("ikifp", 36),
];

/// Looks up the numeric city-card code for a university acronym.
/// Acronyms are matched case-insensitively.
pub fn city_card_code(acronym: &str) -> Option<u32> {
    let acronym = acronym.to_lowercase();
    CITY_CARD_TYPES
        .iter()
        .find(|(name, _)| *name == acronym)
        .map(|(_, code)| *code)
}

/// Known acronyms, uppercased and sorted, for CLI help text.
pub fn available_acronyms() -> Vec<String> {
    let mut acronyms: Vec<String> = CITY_CARD_TYPES
        .iter()
        .map(|(name, _)| name.to_uppercase())
        .collect();
    acronyms.sort();
    acronyms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_acronyms_resolve_case_insensitively() {
        assert_eq!(city_card_code("uj"), Some(22));
        assert_eq!(city_card_code("UJ"), Some(22));
        assert_eq!(city_card_code("Agh"), Some(21));
    }

    #[test]
    fn unknown_acronym_resolves_to_none() {
        assert_eq!(city_card_code("unknown"), None);
    }

    #[test]
    fn acronym_listing_is_sorted() {
        let acronyms = available_acronyms();
        assert_eq!(acronyms.len(), 17);
        let mut sorted = acronyms.clone();
        sorted.sort();
        assert_eq!(acronyms, sorted);
    }
}
