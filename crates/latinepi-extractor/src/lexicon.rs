//! Closed word lists shared by the extraction phases
//!
//! All forms are in the normalized spelling (uppercase, `U` for `V`).

use latinepi_core::GrammaticalCase;

/// Singular and plural dedication verbs, most common first
pub const DEDICATION_VERBS: &[&str] = &[
    "FECIT",
    "FECERUNT",
    "POSUIT",
    "POSUERUNT",
    "CURAUIT",
    "CURAUERUNT",
];

pub const PLURAL_DEDICATION_VERBS: &[&str] = &["FECERUNT", "POSUERUNT", "CURAUERUNT"];

pub fn is_dedication_verb(word: &str) -> bool {
    DEDICATION_VERBS.contains(&word)
}

/// First dedication verb present as a whole word
pub fn find_dedication_verb(normalized: &str) -> Option<&'static str> {
    DEDICATION_VERBS
        .iter()
        .copied()
        .find(|verb| normalized.split_whitespace().any(|w| w == *verb))
}

/// Praenomen abbreviations and their expansion
pub const PRAENOMEN_ABBREVIATIONS: &[(&str, &str)] = &[
    ("C", "Gaius"),
    ("M", "Marcus"),
    ("L", "Lucius"),
    ("P", "Publius"),
    ("Q", "Quintus"),
    ("T", "Titus"),
    ("A", "Aulus"),
    ("D", "Decimus"),
    ("CN", "Gnaeus"),
    ("SEX", "Sextus"),
    ("TI", "Tiberius"),
    ("SER", "Servius"),
    ("SP", "Spurius"),
    ("AP", "Appius"),
    ("MAM", "Mamercus"),
];

pub fn expand_praenomen(abbreviation: &str) -> Option<&'static str> {
    let key = abbreviation.trim_end_matches('.');
    PRAENOMEN_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == key)
        .map(|(_, full)| *full)
}

// ============================================================================
// Kinship
// ============================================================================

/// One inflected kinship form
#[derive(Debug, Clone, Copy)]
pub struct KinForm {
    pub form: &'static str,
    pub lemma: &'static str,
    pub case: GrammaticalCase,
    pub feminine: bool,
}

const fn kin(
    form: &'static str,
    lemma: &'static str,
    case: GrammaticalCase,
    feminine: bool,
) -> KinForm {
    KinForm {
        form,
        lemma,
        case,
        feminine,
    }
}

use GrammaticalCase::{Dative, Genitive, Nominative};

pub const KIN_FORMS: &[KinForm] = &[
    kin("PATER", "pater", Nominative, false),
    kin("PATRIS", "pater", Genitive, false),
    kin("PATRI", "pater", Dative, false),
    kin("MATER", "mater", Nominative, true),
    kin("MATRIS", "mater", Genitive, true),
    kin("MATRI", "mater", Dative, true),
    kin("FILIUS", "filius", Nominative, false),
    kin("FILII", "filius", Genitive, false),
    kin("FILIO", "filius", Dative, false),
    kin("FILIA", "filia", Nominative, true),
    kin("FILIAE", "filia", Dative, true),
    kin("FRATER", "frater", Nominative, false),
    kin("FRATRI", "frater", Dative, false),
    kin("SOROR", "soror", Nominative, true),
    kin("SORORI", "soror", Dative, true),
    kin("CONIUX", "coniunx", Nominative, true),
    kin("CONIUNX", "coniunx", Nominative, true),
    kin("CONIUGI", "coniunx", Dative, true),
    kin("UXOR", "uxor", Nominative, true),
    kin("UXORI", "uxor", Dative, true),
    kin("MARITUS", "maritus", Nominative, false),
    kin("MARITO", "maritus", Dative, false),
    kin("NEPOS", "nepos", Nominative, false),
    kin("NEPOTI", "nepos", Dative, false),
    kin("NEPTIS", "neptis", Nominative, true),
    kin("NEPTI", "neptis", Dative, true),
    kin("AUUS", "avus", Nominative, false),
    kin("AUO", "avus", Dative, false),
    kin("AUIA", "avia", Nominative, true),
    kin("AUIAE", "avia", Dative, true),
    kin("HERES", "heres", Nominative, false),
    kin("HEREDI", "heres", Dative, false),
    kin("LIBERTUS", "libertus", Nominative, false),
    kin("LIBERTO", "libertus", Dative, false),
    kin("LIBERTA", "liberta", Nominative, true),
    kin("LIBERTAE", "liberta", Dative, true),
    kin("PATRONUS", "patronus", Nominative, false),
    kin("PATRONO", "patronus", Dative, false),
    kin("ALUMNUS", "alumnus", Nominative, false),
    kin("ALUMNO", "alumnus", Dative, false),
];

pub fn kin_form(word: &str) -> Option<&'static KinForm> {
    KIN_FORMS.iter().find(|k| k.form == word)
}

/// English value and confidence for a kinship lemma
pub const KIN_LEMMAS: &[(&str, &str, f32)] = &[
    ("pater", "father", 0.92),
    ("mater", "mother", 0.92),
    ("filius", "son", 0.92),
    ("filia", "daughter", 0.92),
    ("coniunx", "spouse", 0.90),
    ("uxor", "wife", 0.90),
    ("maritus", "husband", 0.90),
    ("frater", "brother", 0.88),
    ("soror", "sister", 0.88),
    ("avus", "grandfather", 0.88),
    ("avia", "grandmother", 0.88),
    ("nepos", "grandson", 0.88),
    ("neptis", "granddaughter", 0.88),
    ("heres", "heir", 0.90),
    ("libertus", "freedman", 0.85),
    ("liberta", "freedwoman", 0.85),
    ("patronus", "patron", 0.85),
    ("alumnus", "foster child", 0.85),
];

pub fn kin_lemma(lemma: &str) -> Option<(&'static str, f32)> {
    KIN_LEMMAS
        .iter()
        .find(|(l, _, _)| *l == lemma)
        .map(|(_, value, confidence)| (*value, *confidence))
}

/// English value for a nominative kinship word (`PATER` -> `father`)
pub fn kin_nominative_value(word: &str) -> Option<&'static str> {
    kin_form(word)
        .filter(|k| k.case == Nominative)
        .and_then(|k| kin_lemma(k.lemma))
        .map(|(value, _)| value)
}

// ============================================================================
// Formula vocabulary
// ============================================================================

/// Words that are never part of a personal name
pub const FORMULA_WORDS: &[&str] = &[
    "D", "M", "S", "H", "E", "F", "DIS", "MANIBUS", "SACRUM", "HIC", "SITUS", "SITA", "EST",
    "SIT", "TIBI", "TERRA", "LEUIS", "UIXIT", "ANNIS", "ANNOS", "ANNORUM", "ANN", "AN",
    "MENSIBUS", "MENSES", "DIEBUS", "DIES", "ET", "BENE", "MERENTI", "MERITO", "FECIT",
    "FECERUNT", "POSUIT", "POSUERUNT", "CURAUIT", "CURAUERUNT", "FACIENDUM", "LEG", "LEGIO",
    "LEGIONIS", "MIL", "MILES", "MILITIS", "CENTURIO", "UETERANUS", "DOMO", "SUO", "SUAE",
    "SUIS", "PIISSIMAE", "PIISSIMO", "CARISSIMAE", "CARISSIMO", "DULCISSIMAE", "DULCISSIMO",
    "INCOMPARABILI", "UOTUM", "SOLUIT", "LIBENS", "IOUI", "OPTIMO", "MAXIMO",
];

pub fn is_formula_word(word: &str) -> bool {
    FORMULA_WORDS.contains(&word)
}

/// Formula words plus every kinship form
pub fn is_non_name(word: &str) -> bool {
    is_formula_word(word) || kin_form(word).is_some()
}
