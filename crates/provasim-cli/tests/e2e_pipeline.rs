//! End-to-end pipeline tests over real files: reference data and a
//! model artifact on disk, the full attempt run (generate → statistics
//! → score → consistency), and the report round-trip.

use std::path::Path;
use std::sync::Arc;

use provasim_core::engine::{AttemptEngine, EngineConfig};
use provasim_core::model::{
    AnswerSheet, ExamColor, ExamConfig, ExamKind, OptionLetter, Subject,
};
use provasim_core::report::AttemptReport;
use provasim_core::skills::SkillCatalog;
use provasim_core::tables::{AnswerKeyEntry, AnswerKeyTable, PositionTable};
use provasim_data::FsReferenceSource;
use provasim_models::{FsModelLoader, ModelArtifact, Tree};

/// Write a full 2023 MT dataset: identity AZUL mappings, a shuffled
/// VERDE column, answer keys for all but the last two canonical
/// positions (those two nullify).
fn write_reference(data_dir: &Path) {
    let mut positions = PositionTable::new();
    let mut answer_keys = AnswerKeyTable::new();

    for canonical in Subject::Mt.canonical_range() {
        positions.insert(2023, Subject::Mt, canonical, ExamColor::Azul, canonical);
        let verde = 136 + (canonical - 136 + 11) % 45;
        positions.insert(2023, Subject::Mt, canonical, ExamColor::Verde, verde);

        if canonical <= 178 {
            answer_keys.insert(
                2023,
                Subject::Mt,
                canonical,
                AnswerKeyEntry {
                    answer: Some(OptionLetter::from_index(canonical as usize)),
                    difficulty: Some(f64::from(canonical) - 158.0),
                    discrimination: Some(1.4),
                    casual_hit: Some(18.0),
                    skill: Some(((canonical - 136) % 5 + 1) as u8),
                },
            );
        }
    }

    std::fs::create_dir_all(data_dir).unwrap();
    std::fs::write(
        data_dir.join("positions.json"),
        serde_json::to_string(&positions).unwrap(),
    )
    .unwrap();
    std::fs::write(
        data_dir.join("meta.json"),
        serde_json::to_string(&answer_keys).unwrap(),
    )
    .unwrap();
}

/// A model worth 430 plus 4 points per hit on the first ten pattern
/// entries.
fn write_model(models_dir: &Path) {
    let trees: Vec<Tree> = (0..10)
        .map(|feature| Tree {
            split_feature: vec![feature],
            threshold: vec![0.5],
            left_child: vec![-1],
            right_child: vec![-2],
            leaf_value: vec![0.0, 4.0],
        })
        .collect();
    let artifact = ModelArtifact {
        version: 1,
        year: Some(2023),
        subject: Some("MT".into()),
        base_score: 430.0,
        trees,
    };

    std::fs::create_dir_all(models_dir).unwrap();
    std::fs::write(
        models_dir.join("ability-model-2023-MT.json"),
        serde_json::to_string(&artifact).unwrap(),
    )
    .unwrap();
}

fn engine(data_dir: &Path, models_dir: &Path) -> AttemptEngine {
    AttemptEngine::new(
        Arc::new(FsReferenceSource::new(data_dir)),
        Arc::new(FsModelLoader::new(models_dir)),
        SkillCatalog::default_descriptions(),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn e2e_scored_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let models_dir = dir.path().join("models");
    write_reference(&data_dir);
    write_model(&models_dir);

    // Answer the 20 easiest valid questions correctly (difficulty
    // ascends with canonical position under the identity mapping).
    let answers: AnswerSheet = (136u16..156)
        .map(|p| (p, OptionLetter::from_index(p as usize)))
        .collect();

    let exam = ExamConfig {
        year: 2023,
        kind: ExamKind::Mt,
        color: ExamColor::Azul,
        language: None,
    };

    let report = engine(&data_dir, &models_dir).run(&exam, &answers).await.unwrap();

    assert_eq!(report.questions.len(), 45);
    assert_eq!(report.statistics.valid, 43);
    assert_eq!(report.statistics.correct, 20);

    // The ten easiest hits land on the model's ten features.
    assert_eq!(report.score.score(), Some(470.0));
    match &report.score.outcome {
        provasim_core::scorer::ScoreOutcome::Scored { pattern, model_id, .. } => {
            assert_eq!(pattern.len(), 45);
            assert!(pattern.starts_with("11111111111111111111"));
            assert_eq!(model_id, "ability-model-2023-MT");
        }
        other => panic!("expected a score, got {other:?}"),
    }

    assert!(!report.consistency.is_empty());
    assert_eq!(report.skills[&Subject::Mt].len(), 5);

    // Round-trip the report through disk.
    let path = dir.path().join("attempt.json");
    report.save_json(&path).unwrap();
    let loaded = AttemptReport::load_json(&path).unwrap();
    assert_eq!(loaded.score.score(), Some(470.0));
    assert_eq!(loaded.questions.len(), 45);
}

#[tokio::test]
async fn e2e_color_variant_changes_mapping_not_score_shape() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let models_dir = dir.path().join("models");
    write_reference(&data_dir);
    write_model(&models_dir);

    let exam = ExamConfig {
        year: 2023,
        kind: ExamKind::Mt,
        color: ExamColor::Verde,
        language: None,
    };

    let report = engine(&data_dir, &models_dir)
        .run(&exam, &AnswerSheet::new())
        .await
        .unwrap();

    // Every VERDE position maps (the column is a permutation), so the
    // same two canonical positions nullify.
    assert_eq!(report.questions.len(), 45);
    assert_eq!(report.statistics.valid, 43);
    let nullified: Vec<u16> = report
        .questions
        .iter()
        .filter(|q| q.nullified)
        .map(|q| q.canonical_or_position())
        .collect();
    assert_eq!(nullified, vec![179, 180]);

    // Blank sheet still scores (all zeros pattern).
    assert_eq!(report.score.score(), Some(430.0));
}

#[tokio::test]
async fn e2e_fallback_year_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let models_dir = dir.path().join("models");
    write_reference(&data_dir);
    write_model(&models_dir); // only the 2023 artifact exists

    // 2023 reference data under a 2024 request: every question
    // nullifies (no 2024 tables), but the scorer still resolves the
    // 2023 model through the fallback chain.
    let exam = ExamConfig {
        year: 2024,
        kind: ExamKind::Mt,
        color: ExamColor::Azul,
        language: None,
    };

    let report = engine(&data_dir, &models_dir)
        .run(&exam, &AnswerSheet::new())
        .await
        .unwrap();

    assert_eq!(report.statistics.valid, 0);
    assert_eq!(report.score.score(), Some(430.0));
    match &report.score.outcome {
        provasim_core::scorer::ScoreOutcome::Scored { model_id, .. } => {
            assert_eq!(model_id, "ability-model-2023-MT");
        }
        other => panic!("expected a score, got {other:?}"),
    }
}
