//! Typed reference tables loaded once per attempt.
//!
//! Both tables are dynamically shaped in the data files (arbitrary
//! year and subject keys), so every lookup returns an `Option`/`Result`
//! and "key absent" is a first-class branch at each nesting level.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::MappingError;
use crate::model::{ExamColor, OptionLetter, Subject};

/// Per-canonical-position map of where the item landed in each printed
/// color variant.
pub type VariantPositions = HashMap<ExamColor, u16>;

/// Position table: `year → subject → canonical position → variant
/// positions`.
///
/// Canonical positions are kept in a `BTreeMap` so scans are in
/// ascending canonical order, matching the published key layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionTable {
    years: HashMap<u16, HashMap<Subject, BTreeMap<u16, VariantPositions>>>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.years.keys().copied()
    }

    pub fn subjects(&self, year: u16) -> Option<impl Iterator<Item = Subject> + '_> {
        self.years.get(&year).map(|s| s.keys().copied())
    }

    /// The canonical-position map for one (year, subject), if present.
    pub fn subject_map(
        &self,
        year: u16,
        subject: Subject,
    ) -> Option<&BTreeMap<u16, VariantPositions>> {
        self.years.get(&year)?.get(&subject)
    }

    /// Find the canonical position whose entry for `color` equals the
    /// given variant position.
    pub fn variant_to_canonical(
        &self,
        year: u16,
        subject: Subject,
        color: ExamColor,
        position: u16,
    ) -> Result<u16, MappingError> {
        let year_map = self
            .years
            .get(&year)
            .ok_or(MappingError::UnknownYear { year })?;
        let subject_map = year_map
            .get(&subject)
            .ok_or(MappingError::UnknownSubject { year, subject })?;

        for (&canonical, variants) in subject_map {
            if variants.get(&color) == Some(&position) {
                return Ok(canonical);
            }
        }

        Err(MappingError::NoMatch {
            position,
            subject,
            color,
            year,
        })
    }

    /// Where a canonical position landed in the given color variant.
    pub fn canonical_to_variant(
        &self,
        year: u16,
        subject: Subject,
        color: ExamColor,
        canonical: u16,
    ) -> Option<u16> {
        self.subject_map(year, subject)?
            .get(&canonical)?
            .get(&color)
            .copied()
    }

    /// Insert one mapping entry. Test and fixture helper.
    pub fn insert(
        &mut self,
        year: u16,
        subject: Subject,
        canonical: u16,
        color: ExamColor,
        variant_position: u16,
    ) {
        self.years
            .entry(year)
            .or_default()
            .entry(subject)
            .or_default()
            .entry(canonical)
            .or_default()
            .insert(color, variant_position);
    }
}

/// Authoritative metadata for one canonical item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    /// Correct option letter. `None` covers both absent and empty
    /// fields in the source data.
    #[serde(default, deserialize_with = "de_blank_letter")]
    pub answer: Option<OptionLetter>,
    /// IRT difficulty parameter (`b`).
    #[serde(default)]
    pub difficulty: Option<f64>,
    /// IRT discrimination parameter (`a`).
    #[serde(default)]
    pub discrimination: Option<f64>,
    /// IRT guessing parameter (`c`) as a percentage, as published.
    #[serde(default, alias = "casual hit")]
    pub casual_hit: Option<f64>,
    /// Skill classification tag.
    #[serde(default, alias = "hability")]
    pub skill: Option<u8>,
}

/// Accept `"A"`, `""`, `null`, or a missing field for the answer slot.
/// Empty strings appear in real published keys.
fn de_blank_letter<'de, D>(deserializer: D) -> Result<Option<OptionLetter>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<OptionLetter>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Answer-key table: `year → subject → canonical position → entry`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKeyTable {
    years: HashMap<u16, HashMap<Subject, BTreeMap<u16, AnswerKeyEntry>>>,
}

impl AnswerKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.years.keys().copied()
    }

    /// The entry map for one (year, subject), if present.
    pub fn subject_map(
        &self,
        year: u16,
        subject: Subject,
    ) -> Option<&BTreeMap<u16, AnswerKeyEntry>> {
        self.years.get(&year)?.get(&subject)
    }

    /// The authoritative entry at a canonical position, if present.
    pub fn entry(&self, year: u16, subject: Subject, canonical: u16) -> Option<&AnswerKeyEntry> {
        self.subject_map(year, subject)?.get(&canonical)
    }

    /// Insert one entry. Test and fixture helper.
    pub fn insert(&mut self, year: u16, subject: Subject, canonical: u16, entry: AnswerKeyEntry) {
        self.years
            .entry(year)
            .or_default()
            .entry(subject)
            .or_default()
            .insert(canonical, entry);
    }
}

/// The two reference tables an attempt runs against.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub positions: PositionTable,
    pub answer_keys: AnswerKeyTable,
}

impl ReferenceData {
    pub fn new(positions: PositionTable, answer_keys: AnswerKeyTable) -> Self {
        Self {
            positions,
            answer_keys,
        }
    }

    /// Empty dataset for degraded mode: every generated question will
    /// be nullified, statistics still compute.
    pub fn empty() -> Self {
        Self::default()
    }
}
