//! Rule-based operational category for an event.
//!
//! Rules are an ordered table of `(predicate, label)` pairs evaluated top to
//! bottom; the first predicate that matches decides the label. Owner text
//! is noisy and categories overlap (a charter company can also look like an
//! "aviation llc"), so the order of [`RULES`] is part of the contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational category assigned to every event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Commercial,
    Private,
    Government,
    Cargo,
    Unknown,
}

impl Label {
    pub const ALL: [Label; 5] = [
        Label::Commercial,
        Label::Private,
        Label::Government,
        Label::Cargo,
        Label::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Commercial => "commercial",
            Label::Private => "private",
            Label::Government => "government",
            Label::Cargo => "cargo",
            Label::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commercial" => Ok(Label::Commercial),
            "private" => Ok(Label::Private),
            "government" => Ok(Label::Government),
            "cargo" => Ok(Label::Cargo),
            "unknown" => Ok(Label::Unknown),
            other => Err(anyhow::anyhow!("Invalid classification label: '{}'", other)),
        }
    }
}

/// The subset of an event record the rules look at
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationInput<'a> {
    pub airline_name: Option<&'a str>,
    pub owner: Option<&'a str>,
    pub callsign: Option<&'a str>,
    pub type_code: Option<&'a str>,
    pub registration: Option<&'a str>,
}

/// Normalized view of [`ClassificationInput`]: text fields lowercased, codes
/// uppercased, everything trimmed. Absent fields become empty strings.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub airline: String,
    pub owner: String,
    pub callsign: String,
    pub type_code: String,
    pub registration: String,
}

impl Signals {
    pub fn from_input(input: &ClassificationInput<'_>) -> Self {
        fn lower(value: Option<&str>) -> String {
            value.unwrap_or_default().trim().to_lowercase()
        }
        fn upper(value: Option<&str>) -> String {
            value.unwrap_or_default().trim().to_uppercase()
        }

        Self {
            airline: lower(input.airline_name),
            owner: lower(input.owner),
            callsign: upper(input.callsign),
            type_code: upper(input.type_code),
            registration: upper(input.registration),
        }
    }
}

/// One entry of the rule chain
pub struct Rule {
    pub name: &'static str,
    pub label: Label,
    pub matches: fn(&Signals) -> bool,
}

/// Owner terms that identify a government or military operator (substring match)
const GOVERNMENT_OWNER_TERMS: &[&str] = &[
    "air force",
    "navy",
    "army",
    "marines",
    "government",
    "homeland",
    "state dept",
    "department of",
    "police",
    "sheriff",
    "coast guard",
    "national guard",
    "royal air force",
    "us marshal",
    "customs",
    "border patrol",
    "military",
    "defense",
    "armed forces",
    "ministry of defence",
];

/// Short agency acronyms, matched as whole words so "raf" does not hit "aircraft"
const GOVERNMENT_OWNER_ACRONYMS: &[&str] = &["usaf", "raf", "dhs", "fbi"];

const MILITARY_CALLSIGN_PREFIXES: &[&str] = &[
    "RCH", "SAM", "MC", "AF", "NAVY", "ARMY", "AE", "EVAC", "BOXER", "REACH", "SPAR", "VENUS",
    "EXEC", "PAT", "CNV", "SHAMU", "CONVOY", "TEAL",
];

/// Airline-name terms that mark a courier or freight carrier
const CARGO_AIRLINE_TERMS: &[&str] = &[
    "fedex",
    "united parcel",
    "dhl",
    "amazon air",
    "amazon prime",
    "atlas air",
    "kalitta",
    "polar air",
    "southern air",
    "cargo",
    "freight",
    "air cargo",
    "express freight",
];

const CARGO_AIRLINE_ACRONYMS: &[&str] = &["ups"];

const AIRLINE_OWNER_TERMS: &[&str] = &["airlines", "airways", "air lines", "airline"];

/// Owner terms that disqualify the airline-owner rule
const NON_SCHEDULED_OWNER_TERMS: &[&str] = &["cargo", "freight", "charter"];

const CARGO_OWNER_TERMS: &[&str] = &["cargo", "freight", "logistics", "express"];

/// Common freighters and freighter conversions
const FREIGHTER_TYPE_CODES: &[&str] = &[
    "B763", "B762", "B752", "B744", "B748", "MD11", "A306", "A30B", "DC10", "DC86", "DC87",
];

/// Fractional and charter operators, bucketed with private aviation
const CHARTER_OWNER_TERMS: &[&str] = &[
    "flexjet",
    "netjets",
    "wheels up",
    "xojet",
    "sentient",
    "vistajet",
    "luxaviation",
    "privé",
    "air charter",
    "charter",
    "executive",
    "flight options",
    "bombardier fractional",
];

/// Personal and corporate holding suffixes. Leading spaces keep "inc" from
/// matching inside a word.
const HOLDING_OWNER_TERMS: &[&str] = &[
    " llc",
    " inc",
    " trust",
    " corp",
    "holdings",
    "management",
    "investments",
    "aviation llc",
];

const BUSINESS_JET_TYPE_CODES: &[&str] = &[
    // Embraer Phenom/Praetor/Legacy
    "E50P", "E55P", "E545", "E550", "E35L", "E35X", "E135", "E145",
    // Cessna Citation family
    "C25A", "C25B", "C25C", "C500", "C501", "C510", "C525", "C550", "C551", "C560", "C56X",
    "C650", "C680", "C700", "C750",
    // Gulfstream
    "GLF2", "GLF3", "GLF4", "GLF5", "GLF6", "G150", "G200", "G280", "GLEX", "G650",
    // Bombardier/Canadair
    "CL30", "CL35", "CL60", "CL64", "CL65", "GALX", "GL5T", "GL7T",
    // Dassault Falcon
    "F900", "FA10", "FA20", "FA50", "FA7X", "FA8X", "FA2T", "FA5X",
    // Learjet
    "LJ23", "LJ24", "LJ25", "LJ31", "LJ35", "LJ40", "LJ45", "LJ55", "LJ60", "LJ70", "LJ75",
    "LJ85",
    // Hawker/Beechjet and King Air
    "H25A", "H25B", "H25C", "BE40", "BE20", "BE30", "BE9L", "BE9T",
    // Pilatus
    "PC12", "PC24",
    // Other
    "HDJT", "HA4T", "ASTR", "C68A", "PRM1", "EA50",
];

/// Small single/twin pistons and trainers
const LIGHT_AIRCRAFT_TYPE_CODES: &[&str] = &[
    "C172", "C182", "C206", "PA28", "PA32", "PA46", "SR20", "SR22", "BE36", "BE58", "C310",
    "C340", "C414", "C421",
];

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}

fn contains_word(haystack: &str, words: &[&str]) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| words.contains(&token))
}

fn has_government_owner(s: &Signals) -> bool {
    contains_any(&s.owner, GOVERNMENT_OWNER_TERMS) || contains_word(&s.owner, GOVERNMENT_OWNER_ACRONYMS)
}

fn has_military_callsign(s: &Signals) -> bool {
    !s.callsign.is_empty()
        && MILITARY_CALLSIGN_PREFIXES
            .iter()
            .any(|prefix| s.callsign.starts_with(prefix))
}

fn has_cargo_airline(s: &Signals) -> bool {
    !s.airline.is_empty()
        && (contains_any(&s.airline, CARGO_AIRLINE_TERMS)
            || contains_word(&s.airline, CARGO_AIRLINE_ACRONYMS))
}

fn has_airline(s: &Signals) -> bool {
    !s.airline.is_empty()
}

fn has_airline_owner(s: &Signals) -> bool {
    contains_any(&s.owner, AIRLINE_OWNER_TERMS) && !contains_any(&s.owner, NON_SCHEDULED_OWNER_TERMS)
}

fn has_cargo_owner(s: &Signals) -> bool {
    contains_any(&s.owner, CARGO_OWNER_TERMS)
}

fn has_freighter_type(s: &Signals) -> bool {
    s.airline.is_empty() && FREIGHTER_TYPE_CODES.contains(&s.type_code.as_str())
}

fn has_charter_owner(s: &Signals) -> bool {
    contains_any(&s.owner, CHARTER_OWNER_TERMS)
}

fn has_holding_owner_with_type(s: &Signals) -> bool {
    if s.type_code.is_empty() {
        return false;
    }
    HOLDING_OWNER_TERMS.iter().any(|term| {
        s.owner.ends_with(term) || s.owner.contains(&format!("{term} "))
    })
}

fn has_business_jet_type(s: &Signals) -> bool {
    BUSINESS_JET_TYPE_CODES.contains(&s.type_code.as_str())
}

fn has_light_aircraft_type(s: &Signals) -> bool {
    LIGHT_AIRCRAFT_TYPE_CODES.contains(&s.type_code.as_str())
}

/// The rule chain, in precedence order. Do not reorder.
pub const RULES: &[Rule] = &[
    Rule { name: "government_owner", label: Label::Government, matches: has_government_owner },
    Rule { name: "military_callsign", label: Label::Government, matches: has_military_callsign },
    Rule { name: "cargo_airline", label: Label::Cargo, matches: has_cargo_airline },
    Rule { name: "airline", label: Label::Commercial, matches: has_airline },
    Rule { name: "airline_owner", label: Label::Commercial, matches: has_airline_owner },
    Rule { name: "cargo_owner", label: Label::Cargo, matches: has_cargo_owner },
    Rule { name: "freighter_type", label: Label::Cargo, matches: has_freighter_type },
    Rule { name: "charter_owner", label: Label::Private, matches: has_charter_owner },
    Rule { name: "holding_owner", label: Label::Private, matches: has_holding_owner_with_type },
    Rule { name: "business_jet_type", label: Label::Private, matches: has_business_jet_type },
    Rule { name: "light_aircraft_type", label: Label::Private, matches: has_light_aircraft_type },
];

/// Find the first rule that matches, if any
pub fn matching_rule(input: &ClassificationInput<'_>) -> Option<&'static Rule> {
    let signals = Signals::from_input(input);
    RULES.iter().find(|rule| (rule.matches)(&signals))
}

/// Classify a partial event record. Total: absent fields simply fail to
/// match and the chain falls through to [`Label::Unknown`].
pub fn classify(input: &ClassificationInput<'_>) -> Label {
    matching_rule(input)
        .map(|rule| rule.label)
        .unwrap_or(Label::Unknown)
}

/// Recompute the label for a record that already carries one. A settled
/// label is never downgraded to `unknown`: enrichment seen only mid-window
/// is not persisted, so the stored fields alone can under-describe the row.
pub fn reclassify(stored: Option<Label>, input: &ClassificationInput<'_>) -> Label {
    match (stored, classify(input)) {
        (Some(settled), Label::Unknown) if settled != Label::Unknown => settled,
        (_, label) => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(owner: &str) -> ClassificationInput<'_> {
        ClassificationInput {
            owner: Some(owner),
            ..Default::default()
        }
    }

    fn rule_name(input: &ClassificationInput<'_>) -> Option<&'static str> {
        matching_rule(input).map(|rule| rule.name)
    }

    #[test]
    fn test_label_round_trips_through_text() {
        for label in Label::ALL {
            assert_eq!(label.as_str().parse::<Label>().unwrap(), label);
        }
        assert!("military".parse::<Label>().is_err());
        assert!("".parse::<Label>().is_err());
    }

    #[test]
    fn test_empty_input_is_unknown() {
        assert_eq!(classify(&ClassificationInput::default()), Label::Unknown);
    }

    #[test]
    fn test_government_owner_beats_airline_name() {
        let input = ClassificationInput {
            airline_name: Some("Delta Air Lines"),
            owner: Some("United States Air Force"),
            ..Default::default()
        };
        assert_eq!(classify(&input), Label::Government);
        assert_eq!(rule_name(&input), Some("government_owner"));
    }

    #[test]
    fn test_military_callsign_beats_airline_name() {
        let input = ClassificationInput {
            airline_name: Some("Some Airline"),
            callsign: Some("rch871"),
            ..Default::default()
        };
        assert_eq!(classify(&input), Label::Government);
        assert_eq!(rule_name(&input), Some("military_callsign"));
    }

    #[test]
    fn test_government_acronyms_match_whole_words_only() {
        assert_eq!(classify(&owner("RAF Northolt")), Label::Government);
        assert_eq!(classify(&owner("U.S. DHS")), Label::Government);
        // "raf" inside "aircraft" is not an agency
        assert_eq!(classify(&owner("Smith Aircraft Sales")), Label::Unknown);
    }

    #[test]
    fn test_cargo_airline_name_resolves_to_cargo() {
        let input = ClassificationInput {
            airline_name: Some("FedEx"),
            ..Default::default()
        };
        assert_eq!(classify(&input), Label::Cargo);
        assert_eq!(rule_name(&input), Some("cargo_airline"));

        let ups = ClassificationInput {
            airline_name: Some("UPS Airlines"),
            ..Default::default()
        };
        assert_eq!(classify(&ups), Label::Cargo);
    }

    #[test]
    fn test_airline_name_short_circuits_later_rules() {
        // Owner says charter and the type is a bizjet, but an airline name wins
        let input = ClassificationInput {
            airline_name: Some("Delta Air Lines"),
            owner: Some("NetJets Aviation"),
            type_code: Some("C56X"),
            ..Default::default()
        };
        assert_eq!(classify(&input), Label::Commercial);
        assert_eq!(rule_name(&input), Some("airline"));
    }

    #[test]
    fn test_freighter_type_ignored_when_airline_present() {
        let input = ClassificationInput {
            airline_name: Some("Delta Air Lines"),
            type_code: Some("B763"),
            ..Default::default()
        };
        assert_eq!(classify(&input), Label::Commercial);

        let without_airline = ClassificationInput {
            type_code: Some("b763"),
            ..Default::default()
        };
        assert_eq!(classify(&without_airline), Label::Cargo);
        assert_eq!(rule_name(&without_airline), Some("freighter_type"));
    }

    #[test]
    fn test_airline_owner_is_commercial_unless_cargo_or_charter() {
        assert_eq!(classify(&owner("American Airlines Inc")), Label::Commercial);
        assert_eq!(
            rule_name(&owner("American Airlines Inc")),
            Some("airline_owner")
        );
        // Falls past the airline-owner rule into the cargo-owner rule
        assert_eq!(classify(&owner("Western Global Airlines Cargo")), Label::Cargo);
        // Falls past into the charter rule
        assert_eq!(classify(&owner("Global Airways Charter")), Label::Private);
    }

    #[test]
    fn test_cargo_owner_precedes_charter_owner() {
        let input = owner("Executive Express Logistics");
        assert_eq!(classify(&input), Label::Cargo);
        assert_eq!(rule_name(&input), Some("cargo_owner"));
    }

    #[test]
    fn test_charter_owner_is_private() {
        let input = owner("NetJets Aviation");
        assert_eq!(classify(&input), Label::Private);
        assert_eq!(rule_name(&input), Some("charter_owner"));
    }

    #[test]
    fn test_holding_owner_requires_type_code() {
        assert_eq!(classify(&owner("Acme LLC")), Label::Unknown);

        let with_type = ClassificationInput {
            owner: Some("Acme LLC"),
            type_code: Some("B738"),
            ..Default::default()
        };
        assert_eq!(classify(&with_type), Label::Private);
        assert_eq!(rule_name(&with_type), Some("holding_owner"));

        let mid_string = ClassificationInput {
            owner: Some("Blue Sky Holdings Of Delaware"),
            type_code: Some("B738"),
            ..Default::default()
        };
        assert_eq!(classify(&mid_string), Label::Private);
    }

    #[test]
    fn test_suffix_terms_do_not_match_inside_words() {
        let input = ClassificationInput {
            owner: Some("Bob Incorporated Flights"),
            type_code: Some("B738"),
            ..Default::default()
        };
        assert_eq!(classify(&input), Label::Unknown);
    }

    #[test]
    fn test_type_code_rules() {
        let bizjet = ClassificationInput {
            type_code: Some("GLF5"),
            ..Default::default()
        };
        assert_eq!(classify(&bizjet), Label::Private);
        assert_eq!(rule_name(&bizjet), Some("business_jet_type"));

        let piston = ClassificationInput {
            type_code: Some(" c172 "),
            ..Default::default()
        };
        assert_eq!(classify(&piston), Label::Private);
        assert_eq!(rule_name(&piston), Some("light_aircraft_type"));

        let airliner = ClassificationInput {
            type_code: Some("A320"),
            ..Default::default()
        };
        assert_eq!(classify(&airliner), Label::Unknown);
    }

    #[test]
    fn test_rule_order_is_locked() {
        let names: Vec<&str> = RULES.iter().map(|rule| rule.name).collect();
        assert_eq!(
            names,
            vec![
                "government_owner",
                "military_callsign",
                "cargo_airline",
                "airline",
                "airline_owner",
                "cargo_owner",
                "freighter_type",
                "charter_owner",
                "holding_owner",
                "business_jet_type",
                "light_aircraft_type",
            ]
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        let input = ClassificationInput {
            owner: Some("Wheels Up Partners LLC"),
            type_code: Some("C56X"),
            callsign: Some("UPX1"),
            registration: Some("N123WU"),
            ..Default::default()
        };
        let first = classify(&input);
        for _ in 0..10 {
            assert_eq!(classify(&input), first);
        }
        assert_eq!(first, Label::Private);
    }

    #[test]
    fn test_reclassify_never_downgrades_settled_label() {
        let empty = ClassificationInput::default();
        assert_eq!(reclassify(Some(Label::Cargo), &empty), Label::Cargo);
        assert_eq!(reclassify(Some(Label::Unknown), &empty), Label::Unknown);
        assert_eq!(reclassify(None, &empty), Label::Unknown);
    }

    #[test]
    fn test_reclassify_moves_between_settled_labels() {
        let input = owner("NetJets Aviation");
        assert_eq!(reclassify(Some(Label::Commercial), &input), Label::Private);
        assert_eq!(reclassify(Some(Label::Unknown), &input), Label::Private);
    }
}
