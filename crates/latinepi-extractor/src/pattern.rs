//! Phase 0: literal pattern matching
//!
//! An ordered rule table per slot. Rules are evaluated in table order and
//! the first rule that yields a value fills its slot; later rules for the
//! same slot are skipped. Tables are hand-ordered from most to least
//! specific (feminine nomina before masculine, known names before
//! positional guesses).

use latinepi_core::numeral::age_from_numeral;
use latinepi_core::text::{display_name, mask_dedication_formula, normalize};
use latinepi_core::{Entity, EntityMap, Phase};
use regex::{Captures, Regex};

use crate::lexicon::{expand_praenomen, is_non_name, kin_form, kin_lemma, KIN_FORMS};
use crate::EntityExtractor;

/// Slot and confidence of the "nothing recognized" sentinel
pub const FALLBACK_SLOT: &str = "text";
pub const FALLBACK_CONFIDENCE: f32 = 0.50;
const FALLBACK_EXCERPT_CHARS: usize = 50;

// ============================================================================
// Name tables (normalized spelling)
// ============================================================================

const COMMON_PRAENOMINA: &[&str] = &[
    "GAIUS", "CAIUS", "MARCUS", "LUCIUS", "PUBLIUS", "QUINTUS", "TITUS",
];

const RARE_PRAENOMINA: &[&str] = &[
    "AULUS", "DECIMUS", "GNAEUS", "SEXTUS", "TIBERIUS", "SERUIUS", "SPURIUS", "APPIUS", "MANIUS",
];

const NOMINA: &[&str] = &[
    "IULIUS", "CLAUDIUS", "FLAUIUS", "AURELIUS", "ANTONIUS", "CORNELIUS", "UALERIUS", "AEMILIUS",
    "FABIUS", "CAECILIUS", "DOMITIUS", "POMPEIUS", "SULPICIUS", "LICINIUS", "MARCIUS",
    "TURPILIUS", "UIBIUS", "OCTAUIUS", "ULPIUS", "AELIUS", "SEMPRONIUS", "IUNIUS", "TERENTIUS",
    "SEPTIMIUS", "HELUIUS", "CASSIUS", "POMPONIUS",
];

const COGNOMINA: &[&str] = &[
    "CAESAR", "FELIX", "MAXIMUS", "SEUERUS", "RUFUS", "PRISCUS", "SABINUS", "SABINA", "PAULUS",
    "PAULLUS", "SECUNDUS", "SECUNDA", "TERTIUS", "TERTULLA", "PRIMUS", "PRIMA", "FAUSTUS",
    "FAUSTA", "UICTOR", "CELER", "FIRMUS", "UITALIS", "FORTUNATUS", "FORTUNATA", "IANUARIUS",
    "HILARUS", "CRISPUS", "PROCULUS", "MARCELLUS", "LONGINUS", "UALENS", "RESTITUTUS",
];

const MILITARY_RANKS: &[(&str, &str)] = &[
    ("CENTURIO", "centurion"),
    ("BENEFICIARIUS", "beneficiarius"),
    ("AQUILIFER", "eagle-bearer"),
    ("SIGNIFER", "standard-bearer"),
    ("PRAEFECTUS", "prefect"),
    ("TRIBUNUS", "tribune"),
    ("DECURIO", "decurion"),
    ("OPTIO", "optio"),
    ("UETERANUS", "veteran"),
    ("UET", "veteran"),
    ("EQUES", "cavalryman"),
    ("MILITIS", "soldier"),
    ("MILES", "soldier"),
    ("MIL", "soldier"),
];

const LEGION_EPITHETS: &[&str] = &[
    "AUGUSTA", "GEMINA", "PRIMIGENIA", "TRAIANA", "UALERIA", "UICTRIX", "ADIUTRIX", "ITALICA",
    "PARTHICA", "APOLLINARIS", "CLAUDIA", "FLAUIA", "FRETENSIS", "FULMINATA", "MACEDONICA",
    "MINERUIA", "SCYTHICA", "FERRATA", "GALLICA", "HISPANA", "CYRENAICA", "ULPIA",
];

const KNOWN_CITIES: &[(&str, &str)] = &[
    ("ROMA", "Rome"),
    ("ROMAE", "Rome"),
    ("OSTIA", "Ostia"),
    ("OSTIAE", "Ostia"),
    ("POMPEIS", "Pompeii"),
    ("POMPEII", "Pompeii"),
    ("CARTHAGO", "Carthage"),
    ("CARTHAGINE", "Carthage"),
    ("LUGDUNUM", "Lugdunum"),
    ("LUGDUNI", "Lugdunum"),
    ("AQUILEIA", "Aquileia"),
    ("AQUILEIAE", "Aquileia"),
    ("MEDIOLANUM", "Mediolanum"),
    ("MEDIOLANI", "Mediolanum"),
    ("NARBONE", "Narbo"),
    ("TARRACONE", "Tarraco"),
    ("EMERITA", "Emerita"),
    ("ALEXANDRIA", "Alexandria"),
];

const FULL_TRIBES: &[&str] = &[
    "PALATINA", "COLLINA", "ESQUILINA", "SUBURANA", "QUIRINA", "GALERIA", "SERGIA", "POLLIA",
    "PAPIRIA", "UOLTINIA", "TROMENTINA", "STELLATINA", "OUFENTINA", "CLUSTUMINA", "ARNENSIS",
    "ANIENSIS", "UELINA",
];

/// Abbreviated tribes; longer abbreviations first
const TRIBE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("QUIR", "Quirina"),
    ("SERG", "Sergia"),
    ("AEM", "Aemilia"),
    ("ANI", "Aniensis"),
    ("ARN", "Arnensis"),
    ("CAM", "Camilia"),
    ("CLA", "Claudia"),
    ("CLU", "Clustumina"),
    ("COL", "Collina"),
    ("COR", "Cornelia"),
    ("ESQ", "Esquilina"),
    ("FAB", "Fabia"),
    ("FAL", "Falerna"),
    ("GAL", "Galeria"),
    ("HOR", "Horatia"),
    ("LEM", "Lemonia"),
    ("MAE", "Maecia"),
    ("MEN", "Menenia"),
    ("OUF", "Oufentina"),
    ("PAL", "Palatina"),
    ("PAP", "Papiria"),
    ("POL", "Pollia"),
    ("POM", "Pomptina"),
    ("PUB", "Publilia"),
    ("PUP", "Pupinia"),
    ("QUI", "Quirina"),
    ("ROM", "Romilia"),
    ("SAB", "Sabatina"),
    ("SCA", "Scaptia"),
    ("SER", "Sergia"),
    ("STE", "Stellatina"),
    ("SUB", "Suburana"),
    ("TER", "Teretina"),
    ("TRO", "Tromentina"),
    ("UEL", "Velina"),
    ("UOL", "Voltinia"),
    ("UOT", "Voturia"),
];

const NOMINATIVE_KIN: &str =
    "PATER|MATER|FILIUS|FILIA|FRATER|SOROR|CONIUX|CONIUNX|HERES|MARITUS|UXOR|LIBERTUS|LIBERTA";

const ANY_DEDICATION_VERB: &str =
    "FECIT|FECERUNT|POSUIT|POSUERUNT|CURAUIT|CURAUERUNT|FACIENDUM\\s+CURAUIT";

const PRAENOMEN_ABBREVIATION_ALT: &str = "CN|SEX|TI|SER|SP|AP|MAM|C|M|L|P|Q|T|A|D";

fn alternation(words: &[&str]) -> String {
    words.join("|")
}

fn keys(table: &[(&'static str, &'static str)]) -> Vec<&'static str> {
    table.iter().map(|(k, _)| *k).collect()
}

// ============================================================================
// Rule table
// ============================================================================

/// Which view of the input a rule runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Normalized text
    Normalized,
    /// Normalized text with a leading dedication formula blanked out
    Masked,
}

/// How a rule turns a match into a slot value
#[derive(Debug, Clone)]
pub enum RuleValue {
    Fixed(&'static str),
    /// Display form of the listed capture groups, joined by spaces
    Name(&'static [usize]),
    /// Capture group looked up in a `(form, value)` table
    Lookup(usize, &'static [(&'static str, &'static str)]),
    /// Praenomen abbreviation in the capture group, expanded
    Praenomen(usize),
    /// Roman numeral age in the capture group
    Age(usize),
    /// Dative kinship word in the capture group, as an English value
    Kin(usize),
    /// `LEG <numeral> [epithet]`
    Legion,
}

impl RuleValue {
    fn render(&self, caps: &Captures<'_>, exclude_non_names: bool) -> Option<String> {
        match self {
            Self::Fixed(value) => Some((*value).to_string()),
            Self::Name(groups) => {
                let words: Vec<&str> = groups
                    .iter()
                    .filter_map(|g| caps.get(*g).map(|m| m.as_str()))
                    .collect();
                if words.is_empty() || (exclude_non_names && words.iter().any(|w| is_non_name(w)))
                {
                    return None;
                }
                Some(
                    words
                        .iter()
                        .map(|w| display_name(w))
                        .collect::<Vec<_>>()
                        .join(" "),
                )
            }
            Self::Lookup(group, table) => {
                let word = caps.get(*group)?.as_str();
                table
                    .iter()
                    .find(|(form, _)| *form == word)
                    .map(|(_, value)| (*value).to_string())
            }
            Self::Praenomen(group) => expand_praenomen(caps.get(*group)?.as_str()).map(String::from),
            Self::Age(group) => age_from_numeral(caps.get(*group)?.as_str()).map(|a| a.to_string()),
            Self::Kin(group) => kin_form(caps.get(*group)?.as_str())
                .and_then(|k| kin_lemma(k.lemma))
                .map(|(value, _)| value.to_string()),
            Self::Legion => {
                let numeral = caps.get(1)?.as_str().replace('U', "V");
                let epithet = caps.get(2).and_then(|m| legion_epithet(m.as_str()));
                Some(match epithet {
                    Some(epithet) => format!("Legio {numeral} {epithet}"),
                    None => format!("Legio {numeral}"),
                })
            }
        }
    }
}

/// Full epithet for a written (possibly abbreviated) legion epithet
fn legion_epithet(word: &str) -> Option<String> {
    if word.len() < 3 {
        return None;
    }
    LEGION_EPITHETS
        .iter()
        .find(|full| full.starts_with(word))
        .map(|full| display_name(full))
}

/// One entry of the ordered rule table
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub slot: &'static str,
    pub regex: Regex,
    pub value: RuleValue,
    pub confidence: f32,
    pub view: View,
    /// Reject captures containing formula or kinship words
    pub exclude_non_names: bool,
}

impl PatternRule {
    /// Value produced by the first acceptable match, if any
    pub fn apply(&self, normalized: &str, masked: &str) -> Option<String> {
        let haystack = match self.view {
            View::Normalized => normalized,
            View::Masked => masked,
        };
        self.regex
            .captures_iter(haystack)
            .find_map(|caps| self.value.render(&caps, self.exclude_non_names))
    }
}

// ============================================================================
// Pattern extractor
// ============================================================================

/// Rule-table extractor for known names, formulae, ages, ranks and places
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    rules: Vec<PatternRule>,
}

impl PatternExtractor {
    /// Create an extractor with the built-in rule table
    pub fn new() -> Self {
        let mut extractor = Self { rules: Vec::new() };
        extractor.initialize_rules();
        extractor
    }

    /// The ordered rule table
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    fn initialize_rules(&mut self) {
        use RuleValue::*;
        use View::*;

        let all_praenomina = format!(
            "{}|{}|{}",
            alternation(COMMON_PRAENOMINA),
            alternation(RARE_PRAENOMINA),
            PRAENOMEN_ABBREVIATION_ALT
        );

        // Status formulae
        self.add_rule("status", r"^D\s*M\s*S\b|^DIS\s+MANIBUS\s+SACRUM\b", Fixed("dis manibus sacrum"), 0.95, Normalized);
        self.add_rule("status", r"^D\s*M\b|\bDIS\s+MANIBUS\b", Fixed("dis manibus"), 0.95, Normalized);
        self.add_rule("status", r"\bH\s*S\s*E\b|\bHIC\s+SIT(?:US|A)\s+EST\b", Fixed("hic situs est"), 0.93, Normalized);
        self.add_rule("status", r"\bI\s*O\s*M\b|\bIOUI\s+OPTIMO\s+MAXIMO\b", Fixed("iovi optimo maximo"), 0.92, Normalized);
        self.add_rule("status", r"\bS\s*T\s*T\s*L\b|\bSIT\s+TIBI\s+TERRA\s+LEUIS\b", Fixed("sit tibi terra levis"), 0.90, Normalized);

        // Praenomen
        self.add_rule("praenomen", &format!(r"\b({})\b", alternation(COMMON_PRAENOMINA)), Name(&[1]), 0.95, Masked);
        self.add_rule("praenomen", &format!(r"\b({})\b", alternation(RARE_PRAENOMINA)), Name(&[1]), 0.92, Masked);
        self.add_rule(
            "praenomen",
            &format!(r"\b({PRAENOMEN_ABBREVIATION_ALT})\.?\s+[A-Z]+I(?:US|A)\b"),
            Praenomen(1),
            0.85,
            Masked,
        );

        // Nomen: feminine forms before the masculine ones they share a stem with
        let feminine: Vec<String> = NOMINA
            .iter()
            .map(|n| format!("{}A", n.trim_end_matches("US")))
            .collect();
        let feminine: Vec<&str> = feminine.iter().map(String::as_str).collect();
        self.add_rule("nomen", &format!(r"\b({})\b", alternation(&feminine)), Name(&[1]), 0.88, Masked);
        self.add_rule("nomen", &format!(r"\b({})\b", alternation(NOMINA)), Name(&[1]), 0.88, Masked);
        self.add_excluding_rule(
            "nomen",
            &format!(r"\b(?:{all_praenomina})\.?\s+([A-Z]+IUS)\b"),
            Name(&[1]),
            0.75,
        );

        // Cognomen
        self.add_rule("cognomen", &format!(r"\b({})\b", alternation(COGNOMINA)), Name(&[1]), 0.90, Masked);
        self.add_excluding_rule(
            "cognomen",
            &format!(r"\b(?:{all_praenomina})\.?\s+[A-Z]+IUS\s+([A-Z]{{3,}})\b"),
            Name(&[1]),
            0.75,
        );

        // Age in years
        self.add_rule("age_years", r"\bUIXIT\s+(?:ANNIS|ANNOS|ANN|AN|A)\.?\s+([IUXLCDM]+)\b", Age(1), 0.90, Normalized);
        self.add_rule("age_years", r"\bANNORUM\s+([IUXLCDM]+)\b", Age(1), 0.85, Normalized);
        self.add_rule("age_years", r"\b(?:ANNIS|ANNOS)\s+([IUXLCDM]+)\b", Age(1), 0.85, Normalized);

        // Military
        self.add_rule(
            "military_rank",
            &format!(r"\b({})\b", alternation(&keys(MILITARY_RANKS))),
            Lookup(1, MILITARY_RANKS),
            0.85,
            Normalized,
        );
        self.add_rule("legion", r"\bLEG(?:IO|IONIS)?\.?\s+([IUXLC]+)\b(?:\s+([A-Z]+))?", Legion, 0.88, Normalized);

        // Kinship of the deceased (dative)
        let datives: Vec<&str> = KIN_FORMS
            .iter()
            .filter(|k| k.case == latinepi_core::GrammaticalCase::Dative)
            .map(|k| k.form)
            .collect();
        self.add_rule("relationship", &format!(r"\b({})\b", alternation(&datives)), Kin(1), 0.85, Normalized);

        // Dedicator: two names, optional kin word, dedication verb
        self.add_excluding_rule(
            "dedicator",
            &format!(r"\b([A-Z]+)\s+([A-Z]+)(?:\s+(?:{NOMINATIVE_KIN}))?\s+(?:{ANY_DEDICATION_VERB})\b"),
            Name(&[1, 2]),
            0.75,
        );

        // Origin
        self.add_excluding_rule("city", r"\bDOMO\s+([A-Z]+)\b", Name(&[1]), 0.80);
        self.add_rule(
            "city",
            &format!(r"\b({})\b", alternation(&keys(KNOWN_CITIES))),
            Lookup(1, KNOWN_CITIES),
            0.85,
            Normalized,
        );

        // Voting tribe
        self.add_rule("tribe", &format!(r"\b({})\b", alternation(FULL_TRIBES)), Name(&[1]), 0.92, Masked);
        self.add_rule(
            "tribe",
            &format!(r"\bF\.?\s+({})\b", alternation(&keys(TRIBE_ABBREVIATIONS))),
            Lookup(1, TRIBE_ABBREVIATIONS),
            0.90,
            Masked,
        );
    }

    /// Add a rule; a pattern that fails to compile is skipped
    fn add_rule(
        &mut self,
        slot: &'static str,
        pattern: &str,
        value: RuleValue,
        confidence: f32,
        view: View,
    ) {
        self.push_rule(slot, pattern, value, confidence, view, false);
    }

    /// Add a positional rule whose captures must not be formula or kin words
    fn add_excluding_rule(&mut self, slot: &'static str, pattern: &str, value: RuleValue, confidence: f32) {
        self.push_rule(slot, pattern, value, confidence, View::Masked, true);
    }

    fn push_rule(
        &mut self,
        slot: &'static str,
        pattern: &str,
        value: RuleValue,
        confidence: f32,
        view: View,
        exclude_non_names: bool,
    ) {
        match Regex::new(pattern) {
            Ok(regex) => self.rules.push(PatternRule {
                slot,
                regex,
                value,
                confidence,
                view,
                exclude_non_names,
            }),
            Err(e) => tracing::warn!("Skipping {} rule: {}", slot, e),
        }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for PatternExtractor {
    fn phase(&self) -> Phase {
        Phase::PatternMatching
    }

    fn extract(&self, text: &str) -> EntityMap {
        let normalized = normalize(text);
        let masked = mask_dedication_formula(&normalized);
        let mut entities = EntityMap::new();

        for rule in &self.rules {
            if entities.contains_key(rule.slot) {
                continue;
            }
            if let Some(value) = rule.apply(&normalized, &masked) {
                entities.insert(
                    rule.slot.to_string(),
                    Entity::new(value, rule.confidence, Phase::PatternMatching),
                );
            }
        }

        if entities.is_empty() {
            let excerpt: String = text.chars().take(FALLBACK_EXCERPT_CHARS).collect();
            entities.insert(
                FALLBACK_SLOT.to_string(),
                Entity::new(excerpt, FALLBACK_CONFIDENCE, Phase::PatternMatching),
            );
        }

        tracing::debug!("Pattern matching found {} entities", entities.len());
        entities
    }
}

// ============================================================================
// Tests
// ============================================================================
