use super::preprocess::preprocess;
use super::{FeatureVector, TrainingStore};
use crate::error::PipelineError;
use crate::volume::{RawVolume, VolumeMask};

fn mask_2x2() -> VolumeMask {
    VolumeMask {
        shape: vec![2, 2],
        data: vec![true, false, true, true],
    }
}

fn volume_2x2(data: [f32; 4]) -> RawVolume {
    RawVolume {
        shape: vec![2, 2],
        data: data.to_vec(),
    }
}

#[test]
fn test_feature_length_equals_mask_popcount() {
    let mask = mask_2x2();
    let features = preprocess(&volume_2x2([1.0, 99.0, 2.0, 3.0]), &mask).unwrap();
    assert_eq!(features.len(), mask.active_count());
    assert_eq!(features.len(), 3);
}

#[test]
fn test_preprocess_deterministic() {
    let mask = mask_2x2();
    let volume = volume_2x2([0.5, -1.0, 2.5, 4.0]);
    let a = preprocess(&volume, &mask).unwrap();
    let b = preprocess(&volume, &mask).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_standardization_zero_mean_unit_std() {
    let mask = mask_2x2();
    let features = preprocess(&volume_2x2([1.0, 42.0, 2.0, 3.0]), &mask).unwrap();

    let n = features.len() as f32;
    let mean: f32 = features.values.iter().sum::<f32>() / n;
    let var: f32 = features.values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    assert!(mean.abs() < 1e-5);
    assert!((var - 1.0).abs() < 1e-4);
    // Masked-out position (value 42.0) never contributes.
    assert!(features.values.iter().all(|v| v.abs() < 5.0));
}

#[test]
fn test_zero_variance_volume_yields_zero_features() {
    let mask = mask_2x2();
    let features = preprocess(&volume_2x2([7.0, 1.0, 7.0, 7.0]), &mask).unwrap();
    assert_eq!(features.values, vec![0.0, 0.0, 0.0]);
    assert!(features.values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_shape_mismatch_rejected() {
    let mask = mask_2x2();
    let volume = RawVolume {
        shape: vec![4],
        data: vec![1.0, 2.0, 3.0, 4.0],
    };
    match preprocess(&volume, &mask) {
        Err(PipelineError::ShapeMismatch { expected, actual }) => {
            assert_eq!(expected, vec![2, 2]);
            assert_eq!(actual, vec![4]);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_store_accepts_only_next_index() {
    let mask = mask_2x2();
    let mut store = TrainingStore::new(mask.fingerprint(), mask.active_count());
    let features = preprocess(&volume_2x2([1.0, 0.0, 2.0, 3.0]), &mask).unwrap();

    store.append(0, features.clone()).unwrap();
    // Same index twice would mean a double-processed unit.
    assert!(matches!(
        store.append(0, features.clone()),
        Err(PipelineError::OutOfOrderAppend {
            expected: 1,
            actual: 0
        })
    ));
    assert!(matches!(
        store.append(2, features),
        Err(PipelineError::OutOfOrderAppend {
            expected: 1,
            actual: 2
        })
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_store_rejects_foreign_mask() {
    let mask = mask_2x2();
    let mut store = TrainingStore::new(mask.fingerprint(), mask.active_count());
    let foreign = FeatureVector {
        mask_hash: !mask.fingerprint(),
        values: vec![0.0; 3],
    };
    assert!(matches!(
        store.append(0, foreign),
        Err(PipelineError::MaskMismatch { .. })
    ));
}

#[test]
fn test_window_extraction() {
    let mask = mask_2x2();
    let mut store = TrainingStore::new(mask.fingerprint(), mask.active_count());
    for i in 0..5 {
        let features = preprocess(&volume_2x2([i as f32, 0.0, 1.0, 2.0]), &mask).unwrap();
        store.append(i, features).unwrap();
    }

    let window = store.window(1, 4).unwrap();
    assert_eq!(window.nrows(), 3);
    assert_eq!(window.ncols(), 3);
    assert_eq!(window.row(0), store.feature(1).unwrap().view());

    assert!(store.window(3, 6).is_err());
}
