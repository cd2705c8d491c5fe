//! Reference-data validation.
//!
//! Checks are advisory: the pipeline tolerates sparse data by
//! nullifying questions, so findings here are warnings for data
//! maintainers, not errors.

use serde::{Deserialize, Serialize};

use crate::tables::ReferenceData;

/// One advisory finding about the reference tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Where the finding is, e.g. `2023/MT/137`.
    pub context: String,
    pub message: String,
}

/// Validate the loaded tables: range membership, mapping round-trips,
/// answer-key coverage, and empty answer fields.
pub fn validate_reference(data: &ReferenceData) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut years: Vec<u16> = data.positions.years().collect();
    years.sort_unstable();

    for year in years {
        let Some(subjects) = data.positions.subjects(year) else {
            continue;
        };
        let mut subjects: Vec<_> = subjects.collect();
        subjects.sort_unstable();

        for subject in subjects {
            let Some(map) = data.positions.subject_map(year, subject) else {
                continue;
            };
            let range = subject.canonical_range();

            for (&canonical, variants) in map {
                let context = format!("{year}/{subject}/{canonical}");

                if !range.contains(&canonical) {
                    warnings.push(ValidationWarning {
                        context: context.clone(),
                        message: format!(
                            "canonical position outside the {subject} range {}..={}",
                            range.start(),
                            range.end()
                        ),
                    });
                }

                // A variant position listed under two canonical keys
                // breaks the round-trip: the scan finds the other one.
                for (&color, &variant) in variants {
                    match data
                        .positions
                        .variant_to_canonical(year, subject, color, variant)
                    {
                        Ok(found) if found == canonical => {}
                        Ok(found) => warnings.push(ValidationWarning {
                            context: context.clone(),
                            message: format!(
                                "{color} position {variant} also maps to canonical {found}"
                            ),
                        }),
                        Err(err) => warnings.push(ValidationWarning {
                            context: context.clone(),
                            message: format!("round-trip failed for {color}: {err}"),
                        }),
                    }
                }

                match data.answer_keys.entry(year, subject, canonical) {
                    None => warnings.push(ValidationWarning {
                        context,
                        message: "no answer-key entry; questions here will nullify".into(),
                    }),
                    Some(entry) if entry.answer.is_none() => warnings.push(ValidationWarning {
                        context,
                        message: "answer field empty; positional fallback will apply".into(),
                    }),
                    Some(_) => {}
                }
            }
        }
    }

    warnings
}
