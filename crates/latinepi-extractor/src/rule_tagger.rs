//! Built-in rule tagger
//!
//! A lexicon and word-ending tagger for funerary Latin. Closed-class words
//! (kinship terms, dedication verbs, formula vocabulary, epithets) come
//! from the lexicon; every other word is taken as a proper noun whose case
//! is guessed from its ending. Relations are attached with a few positional
//! rules around the dedication verb.

use std::ops::Range;

use latinepi_core::numeral::roman_to_int;
use latinepi_core::text::{display_name, normalize};
use latinepi_core::GrammaticalCase;

use crate::lexicon::{expand_praenomen, is_dedication_verb, is_formula_word, is_non_name, kin_form};
use crate::tagger::{DepRelation, Gender, Morphology, Number, PartOfSpeech, Tagger, Token};

/// Words after which a bare numeral reads as a count
const MEASURE_WORDS: &[&str] = &[
    "UIXIT", "ANNIS", "ANNOS", "ANNORUM", "ANN", "AN", "MENSIBUS", "MENSES", "DIEBUS", "DIES",
    "HORIS", "LEG", "LEGIO", "LEGIONIS", "COH",
];

const EPITHET_STEMS: &[&str] = &[
    "PIISSIM",
    "CARISSIM",
    "DULCISSIM",
    "PIENTISSIM",
    "SANCTISSIM",
    "OPTIM",
    "INCOMPARABIL",
    "MERENTI",
];

const OTHER_VERBS: &[(&str, &str)] = &[("UIXIT", "vivo"), ("EST", "sum"), ("SIT", "sum")];

/// Ending, guessed case and gender; longest endings first
const ENDINGS: &[(&str, GrammaticalCase, Option<Gender>)] = &[
    ("AE", GrammaticalCase::Genitive, Some(Gender::Feminine)),
    ("IS", GrammaticalCase::Genitive, None),
    ("US", GrammaticalCase::Nominative, Some(Gender::Masculine)),
    ("AM", GrammaticalCase::Accusative, Some(Gender::Feminine)),
    ("UM", GrammaticalCase::Accusative, None),
    ("EM", GrammaticalCase::Accusative, None),
    ("ER", GrammaticalCase::Nominative, None),
    ("OR", GrammaticalCase::Nominative, None),
    ("AR", GrammaticalCase::Nominative, None),
    ("X", GrammaticalCase::Nominative, None),
    ("I", GrammaticalCase::Genitive, Some(Gender::Masculine)),
    ("A", GrammaticalCase::Nominative, Some(Gender::Feminine)),
    ("O", GrammaticalCase::Dative, Some(Gender::Masculine)),
    ("E", GrammaticalCase::Ablative, None),
];

fn guess_morphology(word: &str) -> Morphology {
    ENDINGS
        .iter()
        .find(|(ending, _, _)| word.len() > ending.len() && word.ends_with(ending))
        .map(|(_, case, gender)| Morphology {
            case: Some(*case),
            gender: *gender,
            number: Some(Number::Singular),
        })
        .unwrap_or_default()
}

/// Nominative display form of an inflected name (`UIBIAE` -> `Vibia`)
fn name_lemma(word: &str) -> String {
    let nominative = if let Some(stem) = word.strip_suffix("AE").or_else(|| word.strip_suffix("AM")) {
        format!("{stem}A")
    } else if word.len() < 3 || word.ends_with("IS") {
        word.to_string()
    } else if let Some(stem) = word.strip_suffix('I').or_else(|| word.strip_suffix('O')) {
        format!("{stem}US")
    } else {
        word.to_string()
    };
    display_name(&nominative)
}

fn verb_lemma(word: &str) -> Option<(&'static str, Number)> {
    let lemma = match word {
        "FECIT" => ("facio", Number::Singular),
        "FECERUNT" => ("facio", Number::Plural),
        "POSUIT" => ("pono", Number::Singular),
        "POSUERUNT" => ("pono", Number::Plural),
        "CURAUIT" => ("curo", Number::Singular),
        "CURAUERUNT" => ("curo", Number::Plural),
        _ => {
            return OTHER_VERBS
                .iter()
                .find(|(form, _)| *form == word)
                .map(|(_, lemma)| (*lemma, Number::Singular))
        }
    };
    Some(lemma)
}

fn numeral_value(word: &str, after_measure: bool) -> Option<u32> {
    if word.chars().all(|c| c.is_ascii_digit()) {
        return word.parse().ok();
    }
    // Away from a measure word only short I/U/X numerals are trusted
    let plain = word.len() >= 2 && word.chars().all(|c| matches!(c, 'I' | 'U' | 'X'));
    if after_measure || plain {
        roman_to_int(word)
    } else {
        None
    }
}

fn looks_like_name(word: &str) -> bool {
    word.len() >= 3 && !is_non_name(word) && word.chars().all(|c| c.is_ascii_alphabetic())
}

/// Number of leading tokens forming `D M [S]` or `DIS MANIBUS [SACRUM]`
fn leading_formula_len(words: &[String]) -> usize {
    let starts = |a: &str, b: &str| {
        words.first().map(String::as_str) == Some(a) && words.get(1).map(String::as_str) == Some(b)
    };
    let third = |c: &str| words.get(2).map(String::as_str) == Some(c);

    if starts("D", "M") {
        if third("S") {
            3
        } else {
            2
        }
    } else if starts("DIS", "MANIBUS") {
        if third("SACRUM") {
            3
        } else {
            2
        }
    } else {
        0
    }
}

// ============================================================================
// Rule tagger
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RuleTagger;

impl RuleTagger {
    pub fn new() -> Self {
        Self
    }

    /// Split an inscription into normalized words, dropping punctuation
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        normalize(text)
            .split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
            })
            .filter(|w| !w.is_empty())
            .collect()
    }

    fn tag_word(&self, words: &[String], i: usize) -> (String, PartOfSpeech, Morphology) {
        let word = words[i].as_str();
        let prev = i.checked_sub(1).map(|p| words[p].as_str());
        let next = words.get(i + 1).map(String::as_str);

        if word == "ET" {
            return ("et".to_string(), PartOfSpeech::Cconj, Morphology::default());
        }
        if let Some((lemma, number)) = verb_lemma(word) {
            let morph = Morphology {
                number: Some(number),
                ..Morphology::default()
            };
            return (lemma.to_string(), PartOfSpeech::Verb, morph);
        }
        if let Some(kin) = kin_form(word) {
            let morph = Morphology {
                case: Some(kin.case),
                gender: Some(if kin.feminine {
                    Gender::Feminine
                } else {
                    Gender::Masculine
                }),
                number: Some(Number::Singular),
            };
            return (kin.lemma.to_string(), PartOfSpeech::Noun, morph);
        }
        if EPITHET_STEMS.iter().any(|stem| word.starts_with(stem)) {
            return (word.to_lowercase(), PartOfSpeech::Adj, guess_morphology(word));
        }
        let after_measure = prev.is_some_and(|p| MEASURE_WORDS.contains(&p));
        if let Some(value) = numeral_value(word, after_measure) {
            return (value.to_string(), PartOfSpeech::Num, Morphology::default());
        }
        if let Some(full) = expand_praenomen(word) {
            if next.is_some_and(looks_like_name) {
                let morph = next.map(guess_morphology).unwrap_or_default();
                return (full.to_string(), PartOfSpeech::ProperNoun, morph);
            }
        }
        if is_formula_word(word) || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            return (word.to_lowercase(), PartOfSpeech::X, Morphology::default());
        }

        (name_lemma(word), PartOfSpeech::ProperNoun, guess_morphology(word))
    }

    fn tag_words(&self, words: &[String]) -> Vec<Token> {
        let formula = leading_formula_len(words);
        (0..words.len())
            .map(|i| {
                let (lemma, pos, morph) = if i < formula {
                    (words[i].to_lowercase(), PartOfSpeech::X, Morphology::default())
                } else {
                    self.tag_word(words, i)
                };
                Token {
                    index: i,
                    text: words[i].clone(),
                    lemma,
                    pos,
                    morph,
                    relation: None,
                    head: None,
                }
            })
            .collect()
    }
}

/// A run of adjacent proper nouns read as one name
struct NameGroup {
    span: Range<usize>,
    case: Option<GrammaticalCase>,
}

fn name_groups(tokens: &[Token]) -> Vec<NameGroup> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].pos != PartOfSpeech::ProperNoun {
            i += 1;
            continue;
        }
        let start = i;
        while i < tokens.len() && tokens[i].pos == PartOfSpeech::ProperNoun {
            i += 1;
        }
        let case = tokens[start..i].iter().rev().find_map(Token::case);
        groups.push(NameGroup {
            span: start..i,
            case,
        });
    }
    groups
}

/// Attach shallow dependency relations in place
fn attach(tokens: &mut [Token]) {
    use DepRelation::*;
    use GrammaticalCase::*;

    let root = tokens
        .iter()
        .position(|t| t.pos == PartOfSpeech::Verb && is_dedication_verb(&t.text))
        .or_else(|| tokens.iter().position(|t| t.pos == PartOfSpeech::Verb));
    if let Some(r) = root {
        tokens[r].relation = Some(Root);
    }
    let before_root = |i: usize| root.map_or(true, |r| i < r);

    let groups = name_groups(tokens);
    let mut subject: Option<usize> = None;

    for group in &groups {
        let head = group.span.start;
        for i in group.span.start + 1..group.span.end {
            tokens[i].relation = Some(Flat);
            tokens[i].head = Some(head);
        }

        let after_et = head > 0 && tokens[head - 1].pos == PartOfSpeech::Cconj;
        let (relation, governor) = match (group.case, subject) {
            (Some(Nominative), Some(first)) if after_et => {
                tokens[head - 1].relation = Some(Cc);
                tokens[head - 1].head = Some(head);
                (Conj, Some(first))
            }
            (Some(Nominative), None) if before_root(head) => {
                subject = Some(head);
                (Nsubj, root)
            }
            (Some(Genitive), _) => {
                let owner = tokens[group.span.end..]
                    .iter()
                    .find(|t| t.pos == PartOfSpeech::Noun && t.has_case(Dative))
                    .map(|t| t.index);
                (Nmod, owner.or(root))
            }
            (Some(Dative), _) => (Iobj, root),
            (Some(Ablative), _) => (Obl, root),
            (Some(Accusative), _) => (Obj, root),
            _ => (Dep, root),
        };
        tokens[head].relation = Some(relation);
        tokens[head].head = governor;
    }

    for i in 0..tokens.len() {
        if tokens[i].relation.is_some() {
            continue;
        }
        let (relation, governor) = match tokens[i].pos {
            PartOfSpeech::Noun => {
                let case = tokens[i].case();
                match groups.iter().find(|g| g.span.end == i) {
                    Some(group) if group.case == case => (Appos, Some(group.span.start)),
                    _ => match case {
                        Some(Nominative) if subject.is_none() && before_root(i) => {
                            subject = Some(i);
                            (Nsubj, root)
                        }
                        Some(Dative) => (Iobj, root),
                        Some(Genitive) => (Nmod, root),
                        _ => (Dep, root),
                    },
                }
            }
            PartOfSpeech::Adj => {
                let modified = tokens[..i]
                    .iter()
                    .rev()
                    .find(|t| t.pos.is_nominal())
                    .map(|t| t.index);
                (Amod, modified.or(root))
            }
            PartOfSpeech::Num => (Nummod, i.checked_sub(1).or(root)),
            _ => (Dep, root),
        };
        tokens[i].relation = Some(relation);
        tokens[i].head = governor;
    }
}

impl Tagger for RuleTagger {
    fn name(&self) -> &str {
        "rule"
    }

    fn tag(&self, text: &str) -> latinepi_core::Result<Vec<Token>> {
        let words = self.tokenize(text);
        let mut tokens = self.tag_words(&words);
        attach(&mut tokens);
        tracing::trace!("Rule tagger produced {} tokens", tokens.len());
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(text: &str) -> Vec<Token> {
        RuleTagger::new().tag(text).unwrap()
    }

    fn find<'a>(tokens: &'a [Token], text: &str) -> &'a Token {
        tokens.iter().find(|t| t.text == text).unwrap()
    }

    #[test]
    fn test_tokenize() {
        let words = RuleTagger::new().tokenize("D(is) M(anibus) / Vibiae, Sabinae.");
        assert_eq!(words, vec!["DIS", "MANIBUS", "UIBIAE", "SABINAE"]);
        assert!(RuleTagger::new().tokenize("   ").is_empty());
    }

    #[test]
    fn test_tags_funerary_inscription() {
        let tokens = tag("D M VIBIAE SABINAE FILIAE PIISSIMAE VIBIUS PAULUS PATER FECIT");

        assert_eq!(tokens[0].pos, PartOfSpeech::X);
        assert_eq!(tokens[1].pos, PartOfSpeech::X);

        let vibiae = find(&tokens, "UIBIAE");
        assert_eq!(vibiae.pos, PartOfSpeech::ProperNoun);
        assert_eq!(vibiae.lemma, "Vibia");
        assert!(vibiae.has_case(GrammaticalCase::Genitive));
        assert_eq!(vibiae.relation, Some(DepRelation::Nmod));
        assert_eq!(vibiae.head, Some(4));

        let filiae = find(&tokens, "FILIAE");
        assert_eq!(filiae.lemma, "filia");
        assert!(filiae.has_case(GrammaticalCase::Dative));
        assert_eq!(filiae.relation, Some(DepRelation::Iobj));

        assert_eq!(find(&tokens, "PIISSIMAE").relation, Some(DepRelation::Amod));
        assert_eq!(find(&tokens, "UIBIUS").relation, Some(DepRelation::Nsubj));
        assert_eq!(find(&tokens, "PAULUS").relation, Some(DepRelation::Flat));
        assert_eq!(find(&tokens, "PATER").relation, Some(DepRelation::Appos));

        let fecit = find(&tokens, "FECIT");
        assert_eq!(fecit.pos, PartOfSpeech::Verb);
        assert_eq!(fecit.relation, Some(DepRelation::Root));
        assert_eq!(fecit.head, None);
    }

    #[test]
    fn test_coordinated_subjects() {
        let tokens = tag("VIBIUS PAULUS PATER ET VIBIA TERTULLA MATER FECERUNT");

        assert_eq!(tokens[0].relation, Some(DepRelation::Nsubj));
        assert_eq!(tokens[3].relation, Some(DepRelation::Cc));
        assert_eq!(tokens[4].relation, Some(DepRelation::Conj));
        assert_eq!(tokens[4].head, Some(0));
        assert_eq!(tokens[6].relation, Some(DepRelation::Appos));
        assert_eq!(tokens[6].head, Some(4));
        assert_eq!(tokens[7].morph.number, Some(Number::Plural));
    }

    #[test]
    fn test_numerals() {
        let tokens = tag("VIXIT ANNIS XXV");
        let age = find(&tokens, "XXU");
        assert_eq!(age.pos, PartOfSpeech::Num);
        assert_eq!(age.lemma, "25");
        assert_eq!(age.relation, Some(DepRelation::Nummod));
        assert_eq!(age.head, Some(1));

        let tokens = tag("VIXIT ANNIS V");
        assert_eq!(find(&tokens, "U").lemma, "5");
    }

    #[test]
    fn test_praenomen_abbreviation() {
        let tokens = tag("M ANTONIUS FELIX POSUIT");
        assert_eq!(tokens[0].pos, PartOfSpeech::ProperNoun);
        assert_eq!(tokens[0].lemma, "Marcus");
        assert_eq!(tokens[0].relation, Some(DepRelation::Nsubj));
        assert_eq!(tokens[1].relation, Some(DepRelation::Flat));
        assert_eq!(tokens[2].relation, Some(DepRelation::Flat));
    }

    #[test]
    fn test_name_lemmas() {
        assert_eq!(name_lemma("IULII"), "Iulius");
        assert_eq!(name_lemma("IULIO"), "Iulius");
        assert_eq!(name_lemma("SABINAE"), "Sabina");
        assert_eq!(name_lemma("UITALIS"), "Vitalis");
        assert_eq!(name_lemma("FELIX"), "Felix");
    }

    #[test]
    fn test_every_token_is_attached() {
        let tokens = tag("DIS MANIBUS SACRUM C IULIO FELICI ET AURELIAE MAXIMAE H S E");
        for token in &tokens {
            assert!(token.relation.is_some(), "{} has no relation", token.text);
            if let Some(head) = token.head {
                assert!(head < tokens.len());
                assert_ne!(head, token.index);
            }
        }
    }
}
