use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use ratings_predictor::error::PredictorError;
use ratings_predictor::features::{
    FEATURE_LEN, FeatureVector, PositionRatings, SIDE_LEN, SideVector, normalize_rating,
};
use ratings_predictor::matching::ResolverSession;
use ratings_predictor::records::{MatchRecord, PlayerDatabase, RawMatch, RawPlayer};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn approx(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}

#[test]
fn resolved_match_builds_thirty_six_values() {
    let raws: Vec<RawPlayer> = serde_json::from_str(&read_fixture("players.json")).unwrap();
    let db = PlayerDatabase::from_raw(&raws, &HashMap::new()).unwrap();
    let matches: Vec<RawMatch> = serde_json::from_str(&read_fixture("matches.json")).unwrap();
    let raw = matches.iter().find(|m| m.match_number == 1).unwrap();
    let record = MatchRecord::from_raw(raw, &HashMap::new()).unwrap();

    let mut session = ResolverSession::default();
    let home = session
        .resolve(&record.home_lineup, &record.home_team, &record.season, &db)
        .unwrap();
    let away = session
        .resolve(&record.away_lineup, &record.away_team, &record.season, &db)
        .unwrap();

    let raw_features = FeatureVector::build(&home, &away).unwrap();
    assert_eq!(raw_features.values().len(), FEATURE_LEN);
    // Arsenal: keeper, four defenders padded to six.
    assert_eq!(raw_features.home()[0], 83.0);
    assert_eq!(&raw_features.home()[1..7], &[80.0, 82.0, 75.0, 80.0, 0.0, 0.0]);
    // Leicester attack slots sit at the end of the away half.
    assert_eq!(&raw_features.away()[14..18], &[84.0, 78.0, 83.0, 0.0]);

    let normalized = raw_features.normalized();
    assert!(approx(
        &normalized.home()[1..7],
        &[0.6, 0.64, 0.5, 0.6, 0.0, 0.0]
    ));
    assert!(normalized.values().iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn normalization_clips_padding_to_zero() {
    assert_eq!(normalize_rating(50.0), 0.0);
    assert_eq!(normalize_rating(100.0), 1.0);
    assert_eq!(normalize_rating(0.0), 0.0);
    assert_eq!(normalize_rating(30.0), 0.0);
}

#[test]
fn position_counts_are_enforced() {
    let two_keepers = PositionRatings {
        goalkeeper: vec![80.0, 70.0],
        defenders: vec![75.0; 4],
        midfielders: vec![75.0; 3],
        forwards: vec![75.0; 2],
    };
    assert_eq!(
        SideVector::from_ratings(&two_keepers).unwrap_err(),
        PredictorError::GoalkeeperCount { found: 2 }
    );

    let crowded_attack = PositionRatings {
        goalkeeper: vec![80.0],
        defenders: vec![75.0; 3],
        midfielders: vec![75.0; 2],
        forwards: vec![75.0; 5],
    };
    assert_eq!(
        SideVector::from_ratings(&crowded_attack).unwrap_err(),
        PredictorError::CategoryOverflow {
            category: "attack",
            capacity: 4,
            found: 5
        }
    );
}

#[test]
fn one_match_sheet_builds_from_position_lists() {
    let home = PositionRatings {
        goalkeeper: vec![90.0],
        defenders: vec![85.0, 84.0, 83.0, 82.0],
        midfielders: vec![88.0, 87.0, 86.0],
        forwards: vec![92.0, 91.0, 90.0],
    };
    let away = PositionRatings {
        goalkeeper: vec![70.0],
        defenders: vec![65.0; 5],
        midfielders: vec![66.0; 4],
        forwards: vec![68.0],
    };
    let fv = FeatureVector::from_position_ratings(&home, &away).unwrap();
    assert_eq!(fv.values().len(), 2 * SIDE_LEN);
    assert_eq!(fv.home()[14..18], [92.0, 91.0, 90.0, 0.0]);
    assert_eq!(fv.away()[7..14], [66.0, 66.0, 66.0, 66.0, 0.0, 0.0, 0.0]);
}

#[test]
fn feature_vectors_reject_wrong_width_when_deserialized() {
    let bad: Result<FeatureVector, _> = serde_json::from_str("[1.0, 2.0]");
    assert!(bad.is_err());
    let good: FeatureVector = serde_json::from_str(&format!("{:?}", vec![0.5; 36])).unwrap();
    assert_eq!(good.values().len(), 36);
}
