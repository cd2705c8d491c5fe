//! Correctness aggregation and diagnostic response-pattern encodings.
//!
//! One pass classifies every question as correct-valid, incorrect-valid,
//! blank-valid, nullified-answered (credited), or nullified-blank
//! (counted against the aggregate). Pattern strings re-encode the same
//! outcomes in four orderings for downstream diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mapper::PositionMapper;
use crate::model::{AnswerSheet, OptionLetter, Question, Subject};
use crate::tables::ReferenceData;

/// Questions per temporal chunk in the pacing breakdown.
const CHUNK_SIZE: usize = 15;

/// Aggregate correctness counts for a question set.
///
/// `correct` includes credited nullified-answered items; `wrong` and
/// `blank` count valid items only. The asymmetry for nullified items
/// (credited when answered, counted against the aggregate when blank)
/// is deliberate, replicated behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: u32,
    pub correct: u32,
    pub wrong: u32,
    pub blank: u32,
    pub nullified_answered: u32,
    pub nullified_blank: u32,
    /// Non-nullified questions.
    pub valid: u32,
    /// Valid questions the user actually answered.
    pub valid_answered: u32,
    /// Percentage of `correct` over all questions.
    pub accuracy: f64,
    /// Percentage of valid correct answers over answered valid
    /// questions.
    pub valid_accuracy: f64,
}

impl Statistics {
    fn record(&mut self, question: &Question, response: Option<OptionLetter>, is_correct: bool) {
        self.total += 1;
        if question.nullified {
            if response.is_some() {
                self.nullified_answered += 1;
                self.correct += 1;
            } else {
                self.nullified_blank += 1;
            }
        } else {
            self.valid += 1;
            match response {
                None => self.blank += 1,
                Some(_) => {
                    self.valid_answered += 1;
                    if is_correct {
                        self.correct += 1;
                    } else {
                        self.wrong += 1;
                    }
                }
            }
        }
    }

    fn finish(&mut self) {
        self.accuracy = if self.total > 0 {
            f64::from(self.correct) / f64::from(self.total) * 100.0
        } else {
            0.0
        };
        self.valid_accuracy = if self.valid_answered > 0 {
            f64::from(self.correct - self.nullified_answered) / f64::from(self.valid_answered)
                * 100.0
        } else {
            0.0
        };
    }
}

/// Indexes of nullified items within each pattern ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifiedPositions {
    pub exam_order: Vec<usize>,
    pub canonical_order: Vec<usize>,
    pub difficulty_order: Vec<usize>,
    pub discrimination_order: Vec<usize>,
}

/// Correctness encoded as character sequences in four orderings.
///
/// Exam order marks nullified items `A`; canonical order includes them
/// as `0`; the difficulty and discrimination orderings sort the valid
/// subset and append one trailing `0` per nullified item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePatterns {
    pub exam_order: String,
    pub canonical_order: String,
    pub difficulty_order: String,
    pub discrimination_order: String,
    pub by_subject: BTreeMap<Subject, String>,
    pub nullified_positions: NullifiedPositions,
}

/// Streak and alternation summary of an exam-order pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub max_correct_streak: u32,
    pub max_incorrect_streak: u32,
    pub alternations: u32,
    pub final_correct_streak: u32,
    pub final_incorrect_streak: u32,
}

/// Counts over one fixed-size slice of the exam-order pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalChunk {
    /// First question of the chunk, 1-based.
    pub start: usize,
    /// Last question of the chunk, 1-based inclusive.
    pub end: usize,
    pub correct: u32,
    pub incorrect: u32,
    pub nullified: u32,
    pub total: u32,
    /// Total excluding nullified items.
    pub valid_total: u32,
}

/// How often each option letter was chosen on valid questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionFrequency {
    pub counts: BTreeMap<OptionLetter, u32>,
    /// Valid (non-nullified) question count the tally runs over.
    pub total_valid: u32,
}

/// Per-question record shared by the pattern builders.
struct Outcome {
    canonical: u16,
    nullified: bool,
    is_correct: bool,
    difficulty: Option<f64>,
    discrimination: Option<f64>,
    subject: Subject,
}

/// Computes statistics and diagnostic patterns over a generated
/// question list and the user's answer sheet.
#[derive(Debug, Clone, Copy)]
pub struct ResultsAnalyzer<'a> {
    data: &'a ReferenceData,
    mapper: PositionMapper<'a>,
}

impl<'a> ResultsAnalyzer<'a> {
    pub fn new(data: &'a ReferenceData) -> Self {
        Self {
            data,
            mapper: PositionMapper::new(data),
        }
    }

    /// Aggregate statistics over the whole question list.
    pub fn calculate(&self, year: u16, questions: &[Question], answers: &AnswerSheet) -> Statistics {
        let mut stats = Statistics::default();
        for question in questions {
            let response = answers.answer(question.position);
            let check = self.mapper.check_answer(question, year, response);
            stats.record(question, response, check.is_correct);
        }
        stats.finish();
        stats
    }

    /// The same classification grouped by subject.
    pub fn by_subject(
        &self,
        year: u16,
        questions: &[Question],
        answers: &AnswerSheet,
    ) -> BTreeMap<Subject, Statistics> {
        let mut map: BTreeMap<Subject, Statistics> = BTreeMap::new();
        for question in questions {
            let response = answers.answer(question.position);
            let check = self.mapper.check_answer(question, year, response);
            map.entry(question.subject)
                .or_default()
                .record(question, response, check.is_correct);
        }
        for stats in map.values_mut() {
            stats.finish();
        }
        map
    }

    /// Build the four pattern encodings plus per-subject patterns.
    pub fn patterns(
        &self,
        year: u16,
        questions: &[Question],
        answers: &AnswerSheet,
    ) -> ResponsePatterns {
        let outcomes: Vec<Outcome> = questions
            .iter()
            .map(|q| self.outcome(year, q, answers))
            .collect();
        let nullified_count = outcomes.iter().filter(|o| o.nullified).count();

        let exam_order: String = outcomes
            .iter()
            .map(|o| {
                if o.nullified {
                    'A'
                } else if o.is_correct {
                    '1'
                } else {
                    '0'
                }
            })
            .collect();

        // Canonical order keeps every question; nullified items encode
        // as misses.
        let mut canonical_sorted: Vec<&Outcome> = outcomes.iter().collect();
        canonical_sorted.sort_by_key(|o| o.canonical);
        let canonical_order: String = canonical_sorted
            .iter()
            .map(|o| if o.is_correct { '1' } else { '0' })
            .collect();

        let difficulty_order =
            Self::sorted_valid_pattern(&outcomes, nullified_count, |o| o.difficulty);
        let discrimination_order =
            Self::sorted_valid_pattern(&outcomes, nullified_count, |o| o.discrimination);

        let mut by_subject: BTreeMap<Subject, String> = BTreeMap::new();
        for subject in outcomes.iter().map(|o| o.subject) {
            by_subject.entry(subject).or_default();
        }
        for (subject, pattern) in by_subject.iter_mut() {
            let mut subset: Vec<&Outcome> =
                outcomes.iter().filter(|o| o.subject == *subject).collect();
            subset.sort_by_key(|o| o.canonical);
            *pattern = subset
                .iter()
                .map(|o| if o.is_correct { '1' } else { '0' })
                .collect();
        }

        let valid_count = outcomes.len() - nullified_count;
        let nullified_positions = NullifiedPositions {
            exam_order: outcomes
                .iter()
                .enumerate()
                .filter(|(_, o)| o.nullified)
                .map(|(i, _)| i)
                .collect(),
            canonical_order: canonical_sorted
                .iter()
                .enumerate()
                .filter(|(_, o)| o.nullified)
                .map(|(i, _)| i)
                .collect(),
            difficulty_order: (valid_count..outcomes.len()).collect(),
            discrimination_order: (valid_count..outcomes.len()).collect(),
        };

        ResponsePatterns {
            exam_order,
            canonical_order,
            difficulty_order,
            discrimination_order,
            by_subject,
            nullified_positions,
        }
    }

    /// Valid subset sorted ascending by an IRT parameter (absent
    /// parameter sorts last, ties by canonical position), with one
    /// trailing `0` per nullified item.
    fn sorted_valid_pattern(
        outcomes: &[Outcome],
        nullified_count: usize,
        param: impl Fn(&Outcome) -> Option<f64>,
    ) -> String {
        let mut valid: Vec<&Outcome> = outcomes.iter().filter(|o| !o.nullified).collect();
        valid.sort_by(|a, b| match (param(a), param(b)) {
            (Some(x), Some(y)) => x
                .partial_cmp(&y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.canonical.cmp(&b.canonical)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.canonical.cmp(&b.canonical),
        });

        let mut pattern: String = valid
            .iter()
            .map(|o| if o.is_correct { '1' } else { '0' })
            .collect();
        pattern.extend(std::iter::repeat('0').take(nullified_count));
        pattern
    }

    fn outcome(&self, year: u16, question: &Question, answers: &AnswerSheet) -> Outcome {
        // Pattern encodings never credit nullified items; correctness
        // here is strictly answer-key equality.
        let is_correct = if question.nullified {
            false
        } else {
            let response = answers.answer(question.position);
            self.mapper.check_answer(question, year, response).is_correct
        };

        let entry = question.canonical_position.and_then(|canonical| {
            self.data.answer_keys.entry(year, question.subject, canonical)
        });

        Outcome {
            canonical: question.canonical_or_position(),
            nullified: question.nullified,
            is_correct,
            difficulty: entry.and_then(|e| e.difficulty),
            discrimination: entry.and_then(|e| e.discrimination),
            subject: question.subject,
        }
    }
}

/// Streaks and alternations over an exam-order pattern, skipping
/// nullified markers.
pub fn analyze_sequences(pattern: &str) -> SequenceSummary {
    let mut summary = SequenceSummary::default();
    let mut correct_streak = 0u32;
    let mut incorrect_streak = 0u32;
    let mut last: Option<char> = None;

    for c in pattern.chars() {
        match c {
            '1' => {
                correct_streak += 1;
                summary.max_incorrect_streak = summary.max_incorrect_streak.max(incorrect_streak);
                incorrect_streak = 0;
                if last == Some('0') {
                    summary.alternations += 1;
                }
                last = Some('1');
            }
            '0' => {
                incorrect_streak += 1;
                summary.max_correct_streak = summary.max_correct_streak.max(correct_streak);
                correct_streak = 0;
                if last == Some('1') {
                    summary.alternations += 1;
                }
                last = Some('0');
            }
            _ => {}
        }
    }

    summary.max_correct_streak = summary.max_correct_streak.max(correct_streak);
    summary.max_incorrect_streak = summary.max_incorrect_streak.max(incorrect_streak);
    summary.final_correct_streak = correct_streak;
    summary.final_incorrect_streak = incorrect_streak;
    summary
}

/// Slice the exam-order pattern into fixed 15-question chunks.
pub fn temporal_chunks(pattern: &str) -> Vec<TemporalChunk> {
    let chars: Vec<char> = pattern.chars().collect();
    chars
        .chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let correct = chunk.iter().filter(|&&c| c == '1').count() as u32;
            let incorrect = chunk.iter().filter(|&&c| c == '0').count() as u32;
            let nullified = chunk.iter().filter(|&&c| c == 'A').count() as u32;
            TemporalChunk {
                start: i * CHUNK_SIZE + 1,
                end: i * CHUNK_SIZE + chunk.len(),
                correct,
                incorrect,
                nullified,
                total: correct + incorrect + nullified,
                valid_total: correct + incorrect,
            }
        })
        .collect()
}

/// Tally chosen options over valid questions.
pub fn option_frequency(questions: &[Question], answers: &AnswerSheet) -> OptionFrequency {
    let mut frequency = OptionFrequency::default();
    for question in questions {
        if question.nullified {
            continue;
        }
        frequency.total_valid += 1;
        if let Some(letter) = answers.answer(question.position) {
            *frequency.counts.entry(letter).or_insert(0) += 1;
        }
    }
    frequency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamColor;
    use crate::tables::AnswerKeyEntry;

    /// Five MT questions on AZUL: canonical 136..=139 valid (answer A,
    /// difficulties descending so difficulty order reverses canonical
    /// order), canonical 140 unmapped in the answer key.
    fn fixture() -> ReferenceData {
        let mut data = ReferenceData::empty();
        for (i, canonical) in (136u16..=139).enumerate() {
            data.positions
                .insert(2023, Subject::Mt, canonical, ExamColor::Azul, canonical);
            data.answer_keys.insert(
                2023,
                Subject::Mt,
                canonical,
                AnswerKeyEntry {
                    answer: Some(OptionLetter::A),
                    difficulty: Some(3.0 - i as f64),
                    discrimination: Some(1.0 + i as f64),
                    ..Default::default()
                },
            );
        }
        data.positions
            .insert(2023, Subject::Mt, 140, ExamColor::Azul, 140);
        data
    }

    fn questions(data: &ReferenceData) -> Vec<Question> {
        let mapper = PositionMapper::new(data);
        (136u16..=140)
            .map(|p| mapper.create_question(p, Subject::Mt, ExamColor::Azul, 2023))
            .collect()
    }

    #[test]
    fn classification_covers_all_five_buckets() {
        let data = fixture();
        let questions = questions(&data);
        // 136 correct, 137 wrong, 138 blank, 139 blank, 140 nullified
        // and answered.
        let answers: AnswerSheet = [
            (136, OptionLetter::A),
            (137, OptionLetter::B),
            (140, OptionLetter::E),
        ]
        .into_iter()
        .collect();

        let stats = ResultsAnalyzer::new(&data).calculate(2023, &questions, &answers);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.valid, 4);
        assert_eq!(stats.correct, 2); // one real hit plus the credited nullified
        assert_eq!(stats.wrong, 1);
        assert_eq!(stats.blank, 2);
        assert_eq!(stats.nullified_answered, 1);
        assert_eq!(stats.nullified_blank, 0);
        assert_eq!(stats.valid_answered, 2);
        assert!((stats.accuracy - 40.0).abs() < 1e-9);
        assert!((stats.valid_accuracy - 50.0).abs() < 1e-9);
    }

    #[test]
    fn blank_nullified_counts_against_the_aggregate() {
        let data = fixture();
        let questions = questions(&data);
        let answers = AnswerSheet::new();

        let stats = ResultsAnalyzer::new(&data).calculate(2023, &questions, &answers);
        assert_eq!(stats.nullified_blank, 1);
        assert_eq!(stats.correct, 0);
        assert!((stats.accuracy - 0.0).abs() < 1e-9);
    }

    #[test]
    fn exam_order_marks_nullified_with_a() {
        let data = fixture();
        let questions = questions(&data);
        let answers: AnswerSheet = [(136, OptionLetter::A)].into_iter().collect();

        let patterns = ResultsAnalyzer::new(&data).patterns(2023, &questions, &answers);
        assert_eq!(patterns.exam_order, "1000A");
        assert_eq!(patterns.nullified_positions.exam_order, vec![4]);
    }

    #[test]
    fn canonical_order_includes_nullified_as_miss() {
        let data = fixture();
        let questions = questions(&data);
        // The nullified item answered: credited in statistics, still a
        // miss in every pattern encoding.
        let answers: AnswerSheet = [(136, OptionLetter::A), (140, OptionLetter::C)]
            .into_iter()
            .collect();

        let patterns = ResultsAnalyzer::new(&data).patterns(2023, &questions, &answers);
        assert_eq!(patterns.canonical_order, "10000");
        assert_eq!(patterns.nullified_positions.canonical_order, vec![4]);
    }

    #[test]
    fn difficulty_order_sorts_valid_and_appends_nullified_zeros() {
        let data = fixture();
        let questions = questions(&data);
        // Difficulties descend with canonical, so the easiest valid
        // question is canonical 139. Hit it and the pattern leads with
        // a 1.
        let answers: AnswerSheet = [(139, OptionLetter::A)].into_iter().collect();

        let patterns = ResultsAnalyzer::new(&data).patterns(2023, &questions, &answers);
        assert_eq!(patterns.difficulty_order, "10000");
        assert_eq!(patterns.difficulty_order.len(), 5);
        assert_eq!(patterns.nullified_positions.difficulty_order, vec![4]);

        // Discrimination ascends with canonical, so the same hit lands
        // last among the valid subset.
        assert_eq!(patterns.discrimination_order, "00010");
    }

    #[test]
    fn pattern_lengths_are_valid_plus_nullified() {
        let data = fixture();
        let questions = questions(&data);
        let answers = AnswerSheet::new();
        let patterns = ResultsAnalyzer::new(&data).patterns(2023, &questions, &answers);

        assert_eq!(patterns.difficulty_order.len(), 5);
        assert_eq!(patterns.discrimination_order.len(), 5);
        assert!(patterns.difficulty_order.ends_with('0'));
    }

    #[test]
    fn by_subject_groups_statistics() {
        let mut data = fixture();
        data.positions
            .insert(2023, Subject::Cn, 91, ExamColor::Azul, 91);
        data.answer_keys.insert(
            2023,
            Subject::Cn,
            91,
            AnswerKeyEntry {
                answer: Some(OptionLetter::D),
                ..Default::default()
            },
        );

        let mapper = PositionMapper::new(&data);
        let mut questions = questions(&data);
        questions.push(mapper.create_question(91, Subject::Cn, ExamColor::Azul, 2023));
        let answers: AnswerSheet = [(91, OptionLetter::D)].into_iter().collect();

        let by_subject = ResultsAnalyzer::new(&data).by_subject(2023, &questions, &answers);
        assert_eq!(by_subject[&Subject::Mt].total, 5);
        assert_eq!(by_subject[&Subject::Cn].total, 1);
        assert_eq!(by_subject[&Subject::Cn].correct, 1);
    }

    #[test]
    fn sequence_analysis_skips_nullified_markers() {
        let summary = analyze_sequences("111A00101");
        assert_eq!(summary.max_correct_streak, 3);
        assert_eq!(summary.max_incorrect_streak, 2);
        assert_eq!(summary.alternations, 4);
        assert_eq!(summary.final_correct_streak, 1);
    }

    #[test]
    fn temporal_chunks_are_fifteen_questions() {
        let pattern = "1".repeat(15) + &"0".repeat(10) + "AAAAA";
        let chunks = temporal_chunks(&pattern);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start, 1);
        assert_eq!(chunks[0].end, 15);
        assert_eq!(chunks[0].correct, 15);
        assert_eq!(chunks[1].incorrect, 10);
        assert_eq!(chunks[1].nullified, 5);
        assert_eq!(chunks[1].valid_total, 10);
    }

    #[test]
    fn option_frequency_ignores_nullified() {
        let data = fixture();
        let questions = questions(&data);
        let answers: AnswerSheet = [
            (136, OptionLetter::A),
            (137, OptionLetter::A),
            (140, OptionLetter::B), // nullified, not tallied
        ]
        .into_iter()
        .collect();

        let freq = option_frequency(&questions, &answers);
        assert_eq!(freq.total_valid, 4);
        assert_eq!(freq.counts.get(&OptionLetter::A), Some(&2));
        assert_eq!(freq.counts.get(&OptionLetter::B), None);
    }
}
