//! End-to-end tests for the record → train → evaluate pipeline.
//
//   cargo test --test pipeline
//

use std::path::Path;

use anyhow::Result;
use rumbo::constants::{CLIP_SAMPLES, SAMPLE_RATE};
use rumbo::dataset::Label;
use rumbo::{audio, evaluator, trainer, TrainConfig};
use strum::IntoEnumIterator;

/// One second of a pure tone; each label gets its own frequency so the
/// classes are separable in principle.
fn tone(freq: f32, phase: f32) -> Vec<f32> {
    (0..CLIP_SAMPLES)
        .map(|i| {
            (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32 + phase).sin() * 0.4
        })
        .collect()
}

fn label_freq(label: Label) -> f32 {
    220.0 * (label.index() + 1) as f32
}

/// Write `count` clips per label under `root/<label>/`, phase-offset by
/// `phase_step` so different trees hold disjoint clips.
fn write_tree(root: &Path, count: usize, phase_step: f32) -> Result<()> {
    for label in Label::iter() {
        let dir = root.join(label.as_str());
        std::fs::create_dir_all(&dir)?;
        for i in 0..count {
            let clip = tone(label_freq(label), phase_step * (i + 1) as f32);
            audio::write_clip(&dir.join(format!("{label}_{i}.wav")), &clip)?;
        }
    }
    Ok(())
}

#[test]
fn train_export_and_evaluate_end_to_end() -> Result<()> {
    let workdir = tempfile::tempdir()?;
    let dataset = workdir.path().join("dataset");
    let test_tree = workdir.path().join("test_dataset");
    let model_path = workdir.path().join("modelo_comandos.kwm");

    write_tree(&dataset, 8, 0.0)?;
    write_tree(&test_tree, 2, 0.5)?;

    let mut cfg = TrainConfig::new(dataset, model_path.clone());
    cfg.epochs = 1;
    let report = trainer::train(&cfg)?;

    // 40 pooled clips: 32 train (augmented ×4), 4 validation, 4 test
    assert_eq!(report.train_examples, 32 * 4);
    assert_eq!(report.val_examples, 4);
    assert_eq!(report.test_examples, 4);
    assert!((0.0..=1.0).contains(&report.test_accuracy));

    let metadata = std::fs::metadata(&model_path)?;
    assert!(metadata.len() > 0, "artifact must not be empty");

    // one prediction line per file, against the disjoint tree
    let predictions = evaluator::evaluate_dir(&model_path, &test_tree)?;
    assert_eq!(predictions.len(), Label::iter().count() * 2);
    for p in &predictions {
        assert!(Label::iter().any(|l| l.as_str() == p.true_label));
        assert!((p.predicted as usize) < Label::iter().count());
        assert!(p.file.ends_with(".wav"));
    }
    Ok(())
}

#[test]
fn reloading_the_artifact_gives_identical_predictions() -> Result<()> {
    let workdir = tempfile::tempdir()?;
    let dataset = workdir.path().join("dataset");
    let test_tree = workdir.path().join("probe");
    let model_path = workdir.path().join("m.kwm");

    write_tree(&dataset, 6, 0.0)?;
    write_tree(&test_tree, 1, 0.25)?;

    let mut cfg = TrainConfig::new(dataset, model_path.clone());
    cfg.epochs = 1;
    trainer::train(&cfg)?;

    // two independent artifact loads share the same preprocessing path and
    // must agree clip for clip
    let first = evaluator::evaluate_dir(&model_path, &test_tree)?;
    let second = evaluator::evaluate_dir(&model_path, &test_tree)?;
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.file, b.file);
        assert_eq!(a.predicted, b.predicted);
    }
    Ok(())
}

#[test]
fn training_aborts_when_a_label_directory_is_missing() -> Result<()> {
    let workdir = tempfile::tempdir()?;
    let dataset = workdir.path().join("dataset");
    write_tree(&dataset, 2, 0.0)?;
    std::fs::remove_dir_all(dataset.join("ruido"))?;

    let cfg = TrainConfig::new(dataset, workdir.path().join("m.kwm"));
    assert!(trainer::train(&cfg).is_err());
    Ok(())
}
