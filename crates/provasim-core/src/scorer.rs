//! Ability (IRT) score estimation through per-subject predictive
//! models.
//!
//! Model resolution walks an explicit candidate-year list (the
//! requested year, then up to `fallback_depth` preceding years) and
//! caches the winner under the originally requested key. The cache is
//! single-flight per key: concurrent requests for the same key share
//! one resolution.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};

use crate::error::{ModelLoadError, ScoreError};
use crate::mapper::PositionMapper;
use crate::model::{AnswerSheet, ExamConfig, ExamKind, Language, ModelSubject, Question, Subject};
use crate::tables::ReferenceData;
use crate::traits::{AbilityModel, ModelKey, ModelLoader};

/// Fixed input length every ability model expects.
pub const PATTERN_LEN: usize = 45;

/// Oldest exam edition with published models; the fallback chain never
/// walks past it.
pub const MIN_MODEL_YEAR: u16 = 2016;

const DEFAULT_FALLBACK_DEPTH: u16 = 3;

/// Outcome of scoring one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub year: u16,
    /// Scoring subject, absent when the configuration has none (a
    /// composite day attempt).
    pub subject: Option<ModelSubject>,
    pub language: Option<Language>,
    pub outcome: ScoreOutcome,
}

impl ScoreReport {
    /// The numeric score, when scoring succeeded.
    pub fn score(&self) -> Option<f64> {
        match &self.outcome {
            ScoreOutcome::Scored { score, .. } => Some(*score),
            ScoreOutcome::Failed { .. } => None,
        }
    }
}

/// Either a score or the structured reason there is none. Failures are
/// values, never panics, so statistics can still be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored {
        /// Score rounded to one decimal place.
        score: f64,
        /// The 45-character binary pattern the model consumed.
        pattern: String,
        /// Identifier of the model that produced the score.
        model_id: String,
    },
    Failed {
        error: ScoreError,
    },
}

/// Resolves ability models and converts response patterns into scores.
pub struct AbilityScorer {
    loader: Arc<dyn ModelLoader>,
    cache: Mutex<HashMap<ModelKey, Arc<OnceCell<Arc<dyn AbilityModel>>>>>,
    fallback_depth: u16,
}

impl AbilityScorer {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            cache: Mutex::new(HashMap::new()),
            fallback_depth: DEFAULT_FALLBACK_DEPTH,
        }
    }

    /// Override how many preceding years the fallback chain may try.
    pub fn with_fallback_depth(mut self, depth: u16) -> Self {
        self.fallback_depth = depth;
        self
    }

    /// Resolve the model for a key, walking the year fallback chain on
    /// a miss. The resolved model is cached under the requested key,
    /// so repeat calls are O(1) even when the model belongs to an
    /// earlier year. Failed resolutions are not cached and will retry.
    pub async fn resolve_model(
        &self,
        key: &ModelKey,
    ) -> Result<Arc<dyn AbilityModel>, ScoreError> {
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(*key).or_default())
        };

        let model = cell
            .get_or_try_init(|| self.resolve_uncached(key))
            .await?;
        Ok(Arc::clone(model))
    }

    async fn resolve_uncached(&self, key: &ModelKey) -> Result<Arc<dyn AbilityModel>, ScoreError> {
        let mut saw_corruption = false;

        for year in self.candidate_years(key.year) {
            let candidate = key.with_year(year);
            match self.load_and_probe(&candidate).await {
                Ok(model) => {
                    if year != key.year {
                        tracing::info!(
                            "using {year} model for {key} (requested year unavailable)"
                        );
                    }
                    return Ok(model);
                }
                Err(err) => {
                    saw_corruption |= err.is_corruption();
                    tracing::warn!("model {candidate} unavailable: {err}");
                }
            }
        }

        Err(if saw_corruption {
            ScoreError::ModelInvalid {
                subject: key.subject,
                year: key.year,
            }
        } else {
            ScoreError::ModelNotFound {
                subject: key.subject,
                year: key.year,
            }
        })
    }

    /// The ordered year candidates: the requested year first, then up
    /// to `fallback_depth` preceding years, never older than
    /// [`MIN_MODEL_YEAR`].
    fn candidate_years(&self, year: u16) -> Vec<u16> {
        let mut years = vec![year];
        for offset in 1..=self.fallback_depth {
            let candidate = year.saturating_sub(offset);
            if candidate >= MIN_MODEL_YEAR {
                years.push(candidate);
            }
        }
        years
    }

    /// Load one candidate and run the self-test probe; a non-finite
    /// probe score disqualifies the model exactly like a missing one.
    async fn load_and_probe(
        &self,
        key: &ModelKey,
    ) -> Result<Arc<dyn AbilityModel>, ModelLoadError> {
        let model = self.loader.load(key).await?;

        let mut probe = [0u8; PATTERN_LEN];
        probe[0] = 1;
        let value = model.predict(&probe);
        if !value.is_finite() {
            return Err(ModelLoadError::FailedProbe {
                id: model.identifier().to_string(),
            });
        }

        tracing::debug!("model {key} passed probe (score {value})");
        Ok(model)
    }

    /// Normalize a raw pattern to exactly [`PATTERN_LEN`] entries:
    /// excess truncates from the end, shortfall right-pads with zeros.
    pub fn normalize_pattern(raw: &[u8]) -> Vec<u8> {
        let mut pattern = raw.to_vec();
        pattern.truncate(PATTERN_LEN);
        pattern.resize(PATTERN_LEN, 0);
        pattern
    }

    /// Run a model over a raw pattern, rounding to one decimal place.
    pub fn score(model: &dyn AbilityModel, raw: &[u8]) -> f64 {
        let pattern = Self::normalize_pattern(raw);
        let score = model.predict(&pattern);
        (score * 10.0).round() / 10.0
    }

    /// Build the subject-scoped, difficulty-ascending binary pattern:
    /// valid questions sorted by answer-key difficulty (absent
    /// difficulty sorts last, ties by canonical position), scored 1 for
    /// a correct response and 0 otherwise, then one trailing zero per
    /// nullified question of the subject.
    pub fn difficulty_ordered_pattern(
        data: &ReferenceData,
        year: u16,
        questions: &[Question],
        answers: &AnswerSheet,
        subject: Subject,
    ) -> Vec<u8> {
        let mapper = PositionMapper::new(data);

        let subject_questions: Vec<&Question> =
            questions.iter().filter(|q| q.subject == subject).collect();
        let nullified = subject_questions.iter().filter(|q| q.nullified).count();
        let mut valid: Vec<&Question> = subject_questions
            .iter()
            .copied()
            .filter(|q| !q.nullified)
            .collect();

        let difficulty = |q: &Question| -> Option<f64> {
            let canonical = q.canonical_position?;
            data.answer_keys
                .entry(year, q.subject, canonical)?
                .difficulty
        };

        valid.sort_by(|a, b| match (difficulty(a), difficulty(b)) {
            (Some(x), Some(y)) => x
                .partial_cmp(&y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.canonical_or_position().cmp(&b.canonical_or_position())),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.canonical_or_position().cmp(&b.canonical_or_position()),
        });

        let mut pattern: Vec<u8> = valid
            .iter()
            .map(|q| {
                let response = answers.answer(q.position);
                match (response, mapper.correct_answer(q, year)) {
                    (Some(given), Some(correct)) if given == correct => 1,
                    _ => 0,
                }
            })
            .collect();
        pattern.extend(std::iter::repeat(0).take(nullified));
        pattern
    }

    /// Score one attempt end to end: determine the target subject,
    /// resolve the model, prepare the pattern, and package the result.
    pub async fn calculate_score(
        &self,
        data: &ReferenceData,
        config: &ExamConfig,
        questions: &[Question],
        answers: &AnswerSheet,
    ) -> ScoreReport {
        let subject = match config.kind {
            ExamKind::Lc0 => Subject::Lc0,
            ExamKind::Lc1 => Subject::Lc1,
            ExamKind::Ch => Subject::Ch,
            ExamKind::Cn => Subject::Cn,
            ExamKind::Mt => Subject::Mt,
            kind @ (ExamKind::Day1 | ExamKind::Day2) => {
                return ScoreReport {
                    year: config.year,
                    subject: None,
                    language: config.language,
                    outcome: ScoreOutcome::Failed {
                        error: ScoreError::CompositeKind { kind },
                    },
                };
            }
        };
        let (model_subject, language) = subject.model_subject();

        let fail = |error: ScoreError| ScoreReport {
            year: config.year,
            subject: Some(model_subject),
            language,
            outcome: ScoreOutcome::Failed { error },
        };

        if !questions.iter().any(|q| q.subject == subject) {
            return fail(ScoreError::NoQuestions {
                subject: model_subject,
            });
        }

        let key = ModelKey::new(config.year, model_subject, language);
        let model = match self.resolve_model(&key).await {
            Ok(model) => model,
            Err(error) => return fail(error),
        };

        let raw = Self::difficulty_ordered_pattern(data, config.year, questions, answers, subject);
        let score = Self::score(model.as_ref(), &raw);
        let pattern: String = Self::normalize_pattern(&raw)
            .iter()
            .map(|&bit| if bit == 1 { '1' } else { '0' })
            .collect();

        tracing::info!("scored {key} at {score} with model {}", model.identifier());

        ScoreReport {
            year: config.year,
            subject: Some(model_subject),
            language,
            outcome: ScoreOutcome::Scored {
                score,
                pattern,
                model_id: model.identifier().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamColor, OptionLetter};
    use crate::tables::AnswerKeyEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Model whose score is 300 plus 10 per correct answer.
    #[derive(Debug)]
    struct CountingModel {
        id: String,
    }

    impl AbilityModel for CountingModel {
        fn identifier(&self) -> &str {
            &self.id
        }

        fn predict(&self, pattern: &[u8]) -> f64 {
            300.0 + 10.0 * pattern.iter().filter(|&&b| b == 1).count() as f64
        }
    }

    /// Model that always fails the probe.
    #[derive(Debug)]
    struct BrokenModel;

    impl AbilityModel for BrokenModel {
        fn identifier(&self) -> &str {
            "broken"
        }

        fn predict(&self, _: &[u8]) -> f64 {
            f64::NAN
        }
    }

    struct MockLoader {
        available: Vec<ModelKey>,
        broken: Vec<ModelKey>,
        calls: AtomicU32,
        delay: Option<Duration>,
    }

    impl MockLoader {
        fn new(available: Vec<ModelKey>) -> Self {
            Self {
                available,
                broken: Vec::new(),
                calls: AtomicU32::new(0),
                delay: None,
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl ModelLoader for MockLoader {
        async fn load(&self, key: &ModelKey) -> Result<Arc<dyn AbilityModel>, ModelLoadError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.broken.contains(key) {
                return Ok(Arc::new(BrokenModel));
            }
            if self.available.contains(key) {
                return Ok(Arc::new(CountingModel {
                    id: key.to_string(),
                }));
            }
            Err(ModelLoadError::NotFound {
                path: key.to_string(),
            })
        }
    }

    fn mt_key(year: u16) -> ModelKey {
        ModelKey::new(year, ModelSubject::Mt, None)
    }

    #[test]
    fn score_is_invariant_to_padding_and_truncation() {
        let model = CountingModel { id: "m".into() };
        let short = vec![1, 1, 1];
        let mut padded = short.clone();
        padded.resize(PATTERN_LEN, 0);
        let mut long = padded.clone();
        long.extend([1, 1, 1]); // excess beyond 45 is truncated

        assert_eq!(AbilityScorer::score(&model, &short), 330.0);
        assert_eq!(
            AbilityScorer::score(&model, &short),
            AbilityScorer::score(&model, &padded)
        );
        assert_eq!(
            AbilityScorer::score(&model, &padded),
            AbilityScorer::score(&model, &long)
        );
    }

    #[test]
    fn score_rounds_to_one_decimal() {
        #[derive(Debug)]
        struct Fixed;
        impl AbilityModel for Fixed {
            fn identifier(&self) -> &str {
                "fixed"
            }
            fn predict(&self, _: &[u8]) -> f64 {
                512.34
            }
        }
        assert_eq!(AbilityScorer::score(&Fixed, &[]), 512.3);
    }

    #[tokio::test]
    async fn fallback_resolves_earlier_year_and_caches_under_requested_key() {
        let loader = Arc::new(MockLoader::new(vec![mt_key(2021)]));
        let scorer = AbilityScorer::new(Arc::clone(&loader) as Arc<dyn ModelLoader>);

        let model = scorer.resolve_model(&mt_key(2023)).await.unwrap();
        assert_eq!(model.identifier(), "2021-MT");
        // 2023 and 2022 missed before 2021 resolved.
        assert_eq!(loader.call_count(), 3);

        // Second resolution for the same key is a pure cache hit.
        let again = scorer.resolve_model(&mt_key(2023)).await.unwrap();
        assert_eq!(again.identifier(), "2021-MT");
        assert_eq!(loader.call_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_fallbacks_name_subject_and_year() {
        let loader = Arc::new(MockLoader::new(vec![]));
        let scorer = AbilityScorer::new(loader as Arc<dyn ModelLoader>);

        let err = scorer.resolve_model(&mt_key(2023)).await.unwrap_err();
        assert_eq!(
            err,
            ScoreError::ModelNotFound {
                subject: ModelSubject::Mt,
                year: 2023,
            }
        );
    }

    #[tokio::test]
    async fn probe_failure_classifies_as_invalid_and_falls_back() {
        // 2023 fails its probe, 2022 works: the chain continues.
        let mut loader = MockLoader::new(vec![mt_key(2022)]);
        loader.broken = vec![mt_key(2023)];
        let scorer = AbilityScorer::new(Arc::new(loader) as Arc<dyn ModelLoader>);
        let model = scorer.resolve_model(&mt_key(2023)).await.unwrap();
        assert_eq!(model.identifier(), "2022-MT");

        // Only probe failures in the chain: surfaced as corruption.
        let mut loader = MockLoader::new(vec![]);
        loader.broken = vec![mt_key(2023)];
        let scorer = AbilityScorer::new(Arc::new(loader) as Arc<dyn ModelLoader>);
        let err = scorer.resolve_model(&mt_key(2023)).await.unwrap_err();
        assert_eq!(
            err,
            ScoreError::ModelInvalid {
                subject: ModelSubject::Mt,
                year: 2023,
            }
        );
    }

    #[tokio::test]
    async fn fallback_never_walks_past_min_model_year() {
        let loader = Arc::new(MockLoader::new(vec![]));
        let scorer =
            AbilityScorer::new(Arc::clone(&loader) as Arc<dyn ModelLoader>).with_fallback_depth(3);

        scorer.resolve_model(&mt_key(2017)).await.unwrap_err();
        // Candidates are 2017 and 2016 only.
        assert_eq!(loader.call_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_resolutions_share_one_load() {
        let mut loader = MockLoader::new(vec![mt_key(2023)]);
        loader.delay = Some(Duration::from_millis(50));
        let loader = Arc::new(loader);
        let scorer = Arc::new(AbilityScorer::new(
            Arc::clone(&loader) as Arc<dyn ModelLoader>
        ));

        let a = tokio::spawn({
            let scorer = Arc::clone(&scorer);
            async move { scorer.resolve_model(&mt_key(2023)).await }
        });
        let b = tokio::spawn({
            let scorer = Arc::clone(&scorer);
            async move { scorer.resolve_model(&mt_key(2023)).await }
        });

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a.identifier(), b.identifier());
        assert_eq!(loader.call_count(), 1);
    }

    /// 45 MT questions with ascending difficulty, 2 nullified (no
    /// answer key), correct on the 10 easiest valid items.
    fn mt_dataset() -> (ReferenceData, Vec<Question>, AnswerSheet) {
        let mut data = ReferenceData::empty();
        for canonical in 136u16..=180 {
            data.positions
                .insert(2023, Subject::Mt, canonical, ExamColor::Azul, canonical);
            // The last two canonical positions never reach the answer
            // key: nullified.
            if canonical <= 178 {
                data.answer_keys.insert(
                    2023,
                    Subject::Mt,
                    canonical,
                    AnswerKeyEntry {
                        answer: Some(OptionLetter::A),
                        difficulty: Some(f64::from(canonical) - 136.0),
                        ..Default::default()
                    },
                );
            }
        }

        let mapper = PositionMapper::new(&data);
        let questions: Vec<Question> = (136u16..=180)
            .map(|p| mapper.create_question(p, Subject::Mt, ExamColor::Azul, 2023))
            .collect();

        // Difficulty ascends with canonical position, so the 10
        // easiest valid items are canonical 136..=145.
        let answers: AnswerSheet = (136u16..=145).map(|p| (p, OptionLetter::A)).collect();

        (data, questions, answers)
    }

    #[test]
    fn difficulty_pattern_matches_documented_example() {
        let (data, questions, answers) = mt_dataset();
        let pattern = AbilityScorer::difficulty_ordered_pattern(
            &data,
            2023,
            &questions,
            &answers,
            Subject::Mt,
        );

        // Ten hits on the easiest items, 33 valid misses, then the two
        // nullified items as trailing zeros.
        let mut expected = vec![1u8; 10];
        expected.extend(vec![0u8; 35]);
        assert_eq!(pattern.len(), 45);
        assert_eq!(pattern, expected);
        assert_eq!(&pattern[43..], &[0, 0]);
    }

    #[tokio::test]
    async fn calculate_score_end_to_end() {
        let (data, questions, answers) = mt_dataset();
        let loader = Arc::new(MockLoader::new(vec![mt_key(2023)]));
        let scorer = AbilityScorer::new(loader as Arc<dyn ModelLoader>);

        let config = ExamConfig {
            year: 2023,
            kind: ExamKind::Mt,
            color: ExamColor::Azul,
            language: None,
        };

        let report = scorer
            .calculate_score(&data, &config, &questions, &answers)
            .await;
        assert_eq!(report.subject, Some(ModelSubject::Mt));
        match report.outcome {
            ScoreOutcome::Scored {
                score,
                ref pattern,
                ref model_id,
            } => {
                assert_eq!(score, 400.0); // 300 + 10 hits
                assert_eq!(pattern.len(), 45);
                assert_eq!(model_id, "2023-MT");
            }
            ref other => panic!("expected a score, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn composite_day_is_not_scored() {
        let loader = Arc::new(MockLoader::new(vec![]));
        let scorer = AbilityScorer::new(loader as Arc<dyn ModelLoader>);
        let config = ExamConfig {
            year: 2023,
            kind: ExamKind::Day1,
            color: ExamColor::Azul,
            language: None,
        };

        let report = scorer
            .calculate_score(&ReferenceData::empty(), &config, &[], &AnswerSheet::new())
            .await;
        assert_eq!(report.subject, None);
        assert_eq!(
            report.outcome,
            ScoreOutcome::Failed {
                error: ScoreError::CompositeKind {
                    kind: ExamKind::Day1
                }
            }
        );
    }

    #[tokio::test]
    async fn missing_subject_questions_fail_before_model_resolution() {
        let loader = Arc::new(MockLoader::new(vec![]));
        let scorer = AbilityScorer::new(Arc::clone(&loader) as Arc<dyn ModelLoader>);
        let config = ExamConfig {
            year: 2023,
            kind: ExamKind::Mt,
            color: ExamColor::Azul,
            language: None,
        };

        let report = scorer
            .calculate_score(&ReferenceData::empty(), &config, &[], &AnswerSheet::new())
            .await;
        assert_eq!(
            report.outcome,
            ScoreOutcome::Failed {
                error: ScoreError::NoQuestions {
                    subject: ModelSubject::Mt
                }
            }
        );
        assert_eq!(loader.call_count(), 0);
    }
}
