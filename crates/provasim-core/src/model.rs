//! Core data model types for provasim.
//!
//! These are the fundamental types the entire provasim system uses to
//! represent exam configurations, questions, and answer sheets.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NullificationReason;

/// A subject area of the exam, as keyed in the reference data files.
///
/// The two language variants (`Lc0`/`Lc1`) share the same printed
/// position range and differ only in which foreign language the
/// test-taker chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    /// Languages, English variant.
    #[serde(rename = "LC0")]
    Lc0,
    /// Languages, Spanish variant.
    #[serde(rename = "LC1")]
    Lc1,
    /// Human sciences.
    #[serde(rename = "CH")]
    Ch,
    /// Natural sciences.
    #[serde(rename = "CN")]
    Cn,
    /// Mathematics.
    #[serde(rename = "MT")]
    Mt,
}

impl Subject {
    /// Short code used in data files and model artifact names.
    pub fn code(self) -> &'static str {
        match self {
            Subject::Lc0 => "LC0",
            Subject::Lc1 => "LC1",
            Subject::Ch => "CH",
            Subject::Cn => "CN",
            Subject::Mt => "MT",
        }
    }

    /// Human-readable subject name.
    pub fn display_name(self) -> &'static str {
        match self {
            Subject::Lc0 => "Languages (English)",
            Subject::Lc1 => "Languages (Spanish)",
            Subject::Ch => "Human Sciences",
            Subject::Cn => "Natural Sciences",
            Subject::Mt => "Mathematics",
        }
    }

    /// The fixed canonical position range this subject occupies.
    pub fn canonical_range(self) -> RangeInclusive<u16> {
        match self {
            Subject::Lc0 | Subject::Lc1 => 1..=45,
            Subject::Ch => 46..=90,
            Subject::Cn => 91..=135,
            Subject::Mt => 136..=180,
        }
    }

    /// The scoring-model subject this exam subject maps to, plus the
    /// language the model expects for the shared languages range.
    pub fn model_subject(self) -> (ModelSubject, Option<Language>) {
        match self {
            Subject::Lc0 => (ModelSubject::Lc, Some(Language::English)),
            Subject::Lc1 => (ModelSubject::Lc, Some(Language::Spanish)),
            Subject::Ch => (ModelSubject::Ch, None),
            Subject::Cn => (ModelSubject::Cn, None),
            Subject::Mt => (ModelSubject::Mt, None),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Subject grouping used by the ability-model artifacts, where both
/// language variants share one `LC` model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelSubject {
    #[serde(rename = "LC")]
    Lc,
    #[serde(rename = "CH")]
    Ch,
    #[serde(rename = "CN")]
    Cn,
    #[serde(rename = "MT")]
    Mt,
}

impl ModelSubject {
    pub fn code(self) -> &'static str {
        match self {
            ModelSubject::Lc => "LC",
            ModelSubject::Ch => "CH",
            ModelSubject::Cn => "CN",
            ModelSubject::Mt => "MT",
        }
    }
}

impl fmt::Display for ModelSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Foreign-language choice for the shared languages range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    /// Single-digit code used in model artifact names.
    pub fn model_code(self) -> &'static str {
        match self {
            Language::English => "0",
            Language::Spanish => "1",
        }
    }

    /// The exam subject carrying this language's questions.
    pub fn subject(self) -> Subject {
        match self {
            Language::English => Subject::Lc0,
            Language::Spanish => Subject::Lc1,
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" | "en" | "0" => Ok(Language::English),
            "spanish" | "es" | "1" => Ok(Language::Spanish),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// A printed booklet color variant.
///
/// Color names are kept in the reference data's original form; `Azul`
/// is the canonical ordering the answer key is published against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamColor {
    #[serde(rename = "AZUL")]
    Azul,
    #[serde(rename = "AMARELA")]
    Amarela,
    #[serde(rename = "BRANCA")]
    Branca,
    #[serde(rename = "ROSA")]
    Rosa,
    #[serde(rename = "VERDE")]
    Verde,
    #[serde(rename = "CINZA")]
    Cinza,
}

impl ExamColor {
    pub fn code(self) -> &'static str {
        match self {
            ExamColor::Azul => "AZUL",
            ExamColor::Amarela => "AMARELA",
            ExamColor::Branca => "BRANCA",
            ExamColor::Rosa => "ROSA",
            ExamColor::Verde => "VERDE",
            ExamColor::Cinza => "CINZA",
        }
    }
}

impl fmt::Display for ExamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ExamColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azul" => Ok(ExamColor::Azul),
            "amarela" => Ok(ExamColor::Amarela),
            "branca" => Ok(ExamColor::Branca),
            "rosa" => Ok(ExamColor::Rosa),
            "verde" => Ok(ExamColor::Verde),
            "cinza" => Ok(ExamColor::Cinza),
            other => Err(format!("'{other}' is not a known booklet color")),
        }
    }
}

/// Which slice of the exam an attempt covers.
///
/// Single-subject kinds run one 45-question range; the two composite
/// day kinds combine ranges the way the real exam schedules them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    Lc0,
    Lc1,
    Ch,
    Cn,
    Mt,
    Day1,
    Day2,
}

impl ExamKind {
    /// The variant-position range this kind iterates.
    pub fn positions(self) -> RangeInclusive<u16> {
        match self {
            ExamKind::Lc0 | ExamKind::Lc1 => 1..=45,
            ExamKind::Ch => 46..=90,
            ExamKind::Cn => 91..=135,
            ExamKind::Mt => 136..=180,
            ExamKind::Day1 => 1..=90,
            ExamKind::Day2 => 91..=180,
        }
    }

    /// Subjects active for this kind before any language adjustment.
    pub fn default_subjects(self) -> &'static [Subject] {
        match self {
            ExamKind::Lc0 => &[Subject::Lc0],
            ExamKind::Lc1 => &[Subject::Lc1],
            ExamKind::Ch => &[Subject::Ch],
            ExamKind::Cn => &[Subject::Cn],
            ExamKind::Mt => &[Subject::Mt],
            ExamKind::Day1 => &[Subject::Lc0, Subject::Ch],
            ExamKind::Day2 => &[Subject::Cn, Subject::Mt],
        }
    }

    /// True for the composite day kinds, which cover more than one
    /// scoring subject.
    pub fn is_composite(self) -> bool {
        matches!(self, ExamKind::Day1 | ExamKind::Day2)
    }

    pub fn code(self) -> &'static str {
        match self {
            ExamKind::Lc0 => "LC0",
            ExamKind::Lc1 => "LC1",
            ExamKind::Ch => "CH",
            ExamKind::Cn => "CN",
            ExamKind::Mt => "MT",
            ExamKind::Day1 => "day1",
            ExamKind::Day2 => "day2",
        }
    }

    /// Parse a kind code, falling back to the canonical default for
    /// unsupported codes instead of failing.
    ///
    /// Configurations naming an unknown kind are generated as a
    /// languages-English exam; this mirrors how the range table has
    /// always treated unknown selectors.
    pub fn parse_lenient(s: &str) -> ExamKind {
        match s.parse() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::warn!("unsupported exam kind '{s}', falling back to LC0");
                ExamKind::Lc0
            }
        }
    }
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ExamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lc0" => Ok(ExamKind::Lc0),
            "lc1" => Ok(ExamKind::Lc1),
            "ch" => Ok(ExamKind::Ch),
            "cn" => Ok(ExamKind::Cn),
            "mt" => Ok(ExamKind::Mt),
            "day1" | "dia1" => Ok(ExamKind::Day1),
            "day2" | "dia2" => Ok(ExamKind::Day2),
            other => Err(format!("unknown exam kind: {other}")),
        }
    }
}

/// One multiple-choice option letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
    E,
}

impl OptionLetter {
    /// Letter at `index % 5`, used by the deterministic answer fallback.
    pub fn from_index(index: usize) -> OptionLetter {
        match index % 5 {
            0 => OptionLetter::A,
            1 => OptionLetter::B,
            2 => OptionLetter::C,
            3 => OptionLetter::D,
            _ => OptionLetter::E,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionLetter::A => "A",
            OptionLetter::B => "B",
            OptionLetter::C => "C",
            OptionLetter::D => "D",
            OptionLetter::E => "E",
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OptionLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(OptionLetter::A),
            "B" => Ok(OptionLetter::B),
            "C" => Ok(OptionLetter::C),
            "D" => Ok(OptionLetter::D),
            "E" => Ok(OptionLetter::E),
            other => Err(format!("'{other}' is not an option letter")),
        }
    }
}

/// The configuration of one exam attempt. Immutable for its duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    /// Exam edition year.
    pub year: u16,
    /// Day or single-subject selector.
    pub kind: ExamKind,
    /// Printed booklet color the test-taker sat.
    pub color: ExamColor,
    /// Foreign-language choice; only meaningful for the languages range.
    #[serde(default)]
    pub language: Option<Language>,
}

impl ExamConfig {
    /// The language subject active for the 1–45 range of this attempt.
    pub fn language_subject(&self) -> Subject {
        match self.kind {
            ExamKind::Lc1 => Subject::Lc1,
            ExamKind::Lc0 => Subject::Lc0,
            _ => self
                .language
                .map(Language::subject)
                .unwrap_or(Subject::Lc0),
        }
    }
}

/// One generated question of an attempt.
///
/// Created by the generator when the attempt starts; read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Position as printed in the chosen color variant.
    pub position: u16,
    /// Position in the canonical (answer key) ordering, when a mapping
    /// exists.
    pub canonical_position: Option<u16>,
    /// Subject this position belongs to.
    pub subject: Subject,
    /// Whether the item is excluded from canonical scoring.
    pub nullified: bool,
    /// Why the item was nullified, when it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullified_reason: Option<NullificationReason>,
    /// Booklet color the attempt used.
    pub color: ExamColor,
}

impl Question {
    /// Canonical position when mapped, otherwise the variant position.
    ///
    /// Matches the answer-key addressing used throughout: unmapped
    /// questions fall back to their printed position.
    pub fn canonical_or_position(&self) -> u16 {
        self.canonical_position.unwrap_or(self.position)
    }
}

/// Sparse answer sheet: variant position to chosen option. Absent
/// entries are blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(BTreeMap<u16, OptionLetter>);

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, position: u16) -> Option<OptionLetter> {
        self.0.get(&position).copied()
    }

    pub fn set(&mut self, position: u16, letter: OptionLetter) {
        self.0.insert(position, letter);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, OptionLetter)> + '_ {
        self.0.iter().map(|(&p, &l)| (p, l))
    }
}

impl FromIterator<(u16, OptionLetter)> for AnswerSheet {
    fn from_iter<T: IntoIterator<Item = (u16, OptionLetter)>>(iter: T) -> Self {
        AnswerSheet(iter.into_iter().collect())
    }
}
