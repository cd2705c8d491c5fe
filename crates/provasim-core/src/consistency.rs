//! Consistency check between observed outcomes and the 3-parameter
//! logistic model's predicted success probabilities.
//!
//! Runs after scoring (it needs the reported score to place the
//! test-taker on the latent scale). Nullified questions and questions
//! missing any IRT parameter are out of analytical scope, not errors.

use serde::{Deserialize, Serialize};

use crate::mapper::PositionMapper;
use crate::model::{AnswerSheet, OptionLetter, Question, Subject};
use crate::tables::ReferenceData;

/// A hit below this predicted probability is unexpected.
const UNEXPECTED_CORRECT_BELOW: f64 = 0.3;

/// A miss above this predicted probability is unexpected.
const UNEXPECTED_INCORRECT_ABOVE: f64 = 0.7;

/// How one observed outcome compares to its predicted probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyVerdict {
    /// Correct despite a predicted probability under 0.3.
    UnexpectedCorrect,
    /// Incorrect despite a predicted probability over 0.7.
    UnexpectedIncorrect,
    /// Within expectation.
    Expected,
}

/// One question's observed outcome against its 3PL prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyFinding {
    /// Position in the color variant.
    pub position: u16,
    pub canonical_position: u16,
    pub subject: Subject,
    /// Predicted probability of a correct response at the estimated
    /// ability.
    pub probability: f64,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<OptionLetter>,
    pub verdict: ConsistencyVerdict,
    /// How surprising the outcome is: the predicted probability for a
    /// miss, its complement for a hit.
    pub divergence: f64,
}

/// Convert a reported score to the latent-ability scale.
pub fn theta_from_score(score: f64) -> f64 {
    (score - 500.0) / 100.0
}

/// 3PL probability of a correct response at ability `theta` for an
/// item with discrimination `a`, difficulty `b`, and guessing floor
/// `c` (a fraction, not a percentage).
pub fn success_probability(theta: f64, a: f64, b: f64, c: f64) -> f64 {
    c + (1.0 - c) / (1.0 + (-a * (theta - b)).exp())
}

/// Analyze every valid question with complete IRT parameters, sorted
/// most surprising first and optionally truncated to `top`.
///
/// `score` must come from a successful [`crate::scorer::ScoreReport`].
pub fn analyze(
    data: &ReferenceData,
    year: u16,
    questions: &[Question],
    answers: &AnswerSheet,
    score: f64,
    top: Option<usize>,
) -> Vec<ConsistencyFinding> {
    let mapper = PositionMapper::new(data);
    let theta = theta_from_score(score);

    let mut findings: Vec<ConsistencyFinding> = questions
        .iter()
        .filter(|q| !q.nullified)
        .filter_map(|question| {
            let canonical = question.canonical_position?;
            let entry = data.answer_keys.entry(year, question.subject, canonical)?;
            let (a, b, c_percent) =
                (entry.discrimination?, entry.difficulty?, entry.casual_hit?);

            let probability = success_probability(theta, a, b, c_percent / 100.0);
            let response = answers.answer(question.position);
            let is_correct = mapper.check_answer(question, year, response).is_correct;

            let verdict = if is_correct && probability < UNEXPECTED_CORRECT_BELOW {
                ConsistencyVerdict::UnexpectedCorrect
            } else if !is_correct && probability > UNEXPECTED_INCORRECT_ABOVE {
                ConsistencyVerdict::UnexpectedIncorrect
            } else {
                ConsistencyVerdict::Expected
            };
            let divergence = if is_correct {
                1.0 - probability
            } else {
                probability
            };

            Some(ConsistencyFinding {
                position: question.position,
                canonical_position: canonical,
                subject: question.subject,
                probability,
                is_correct,
                response,
                verdict,
                divergence,
            })
        })
        .collect();

    findings.sort_by(|a, b| {
        b.divergence
            .partial_cmp(&a.divergence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if let Some(top) = top {
        findings.truncate(top);
    }
    findings
}
