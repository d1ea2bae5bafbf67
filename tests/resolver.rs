use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use ratings_predictor::error::{ErrorKind, PredictorError};
use ratings_predictor::matching::{
    ConfidencePolicy, NameCache, ResolverConfig, ResolverSession, resolve,
};
use ratings_predictor::records::{
    LineupEntry, MatchRecord, PlayerDatabase, RawMatch, RawNumber, RawPlayer,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn database() -> PlayerDatabase {
    let raws: Vec<RawPlayer> =
        serde_json::from_str(&read_fixture("players.json")).expect("players should parse");
    PlayerDatabase::from_raw(&raws, &HashMap::new()).expect("players should be valid")
}

fn opening_match() -> MatchRecord {
    let raws: Vec<RawMatch> =
        serde_json::from_str(&read_fixture("matches.json")).expect("matches should parse");
    let raw = raws
        .iter()
        .find(|m| m.match_number == 1)
        .expect("match 1 in fixture");
    MatchRecord::from_raw(raw, &HashMap::new()).expect("match 1 should be valid")
}

fn entry(name: &str, raw_name: &str, number: i64, nationality: &str) -> LineupEntry {
    LineupEntry::new(name, raw_name, &RawNumber::Int(number), nationality).expect("valid entry")
}

#[test]
fn resolves_eleven_distinct_players() {
    let db = database();
    let record = opening_match();
    assert_eq!(record.season, "2017-2018");

    let mut session = ResolverSession::default();
    let home = session
        .resolve(&record.home_lineup, &record.home_team, &record.season, &db)
        .expect("home lineup should resolve");

    let ids: HashSet<u32> = home.ids().into_iter().collect();
    assert_eq!(ids.len(), 11);
    assert_eq!(home.players()[0].name, "petr-cech");
    assert_eq!(home.players()[10].name, "alex-oxlade-chamberlain");
    assert!(home.players().iter().all(|p| p.team == "arsenal"));
    assert!((home.min_score() - 1.0).abs() < 1e-9);
    assert_eq!(session.cache().len(), 11);
}

#[test]
fn cached_raw_names_return_the_same_player() {
    let db = database();
    let record = opening_match();

    let (first, cache) = resolve(
        &record.away_lineup,
        &record.away_team,
        &record.season,
        &db,
        &NameCache::new(),
        ResolverConfig::default(),
    )
    .expect("first pass");
    assert_eq!(cache.get("J. Vardy").copied(), Some(first.ids()[10]));

    // Same raw names under a different (wrong) team context still hit the cache.
    let (second, merged) = resolve(
        &record.away_lineup,
        "arsenal",
        &record.season,
        &db,
        &cache,
        ResolverConfig::default(),
    )
    .expect("second pass");
    assert_eq!(first.ids(), second.ids());
    assert!(second.scores().iter().all(|s| *s == 1.0));
    assert_eq!(merged, cache);
}

#[test]
fn two_entries_for_one_player_collide() {
    let db = database();
    let mut lineup = opening_match().home_lineup;
    lineup[9] = entry("petr-cech", "Petr Čech", 33, "Czech Republic");

    let mut session = ResolverSession::default();
    let err = session
        .resolve(&lineup, "arsenal", "2017-2018", &db)
        .expect_err("duplicate player must fail");
    match &err {
        PredictorError::PlayerCollision { resolved, colliding } => {
            assert_eq!(*resolved, 10);
            assert!(colliding.contains(&"P. Cech".to_string()));
            assert!(colliding.contains(&"Petr Čech".to_string()));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::DataInconsistency);
    assert!(session.cache().is_empty(), "failed resolution must not touch the cache");
}

#[test]
fn wrong_lineup_size_is_rejected() {
    let db = database();
    let mut lineup = opening_match().home_lineup;
    lineup.pop();
    let mut session = ResolverSession::default();
    assert_eq!(
        session.resolve(&lineup, "arsenal", "2017-2018", &db).unwrap_err(),
        PredictorError::LineupSize { found: 10 }
    );
}

#[test]
fn low_confidence_follows_policy() {
    let db = database();
    let mut lineup = opening_match().home_lineup;
    // Nobody by that name; best guess is a squad player sharing only club and nationality.
    lineup[3] = entry("unknown-trialist", "Trialist", 40, "England");

    let warn = ResolverSession::default()
        .resolve(&lineup, "arsenal", "2017-2018", &db)
        .expect("warn policy still resolves");
    assert!((warn.min_score() - 0.4).abs() < 1e-9);
    assert_eq!(warn.players()[3].name, "calum-chambers");

    let config = ResolverConfig {
        confidence_policy: ConfidencePolicy::Reject,
        ..ResolverConfig::default()
    };
    let err = ResolverSession::new(config)
        .resolve(&lineup, "arsenal", "2017-2018", &db)
        .expect_err("reject policy refuses the lineup");
    assert_eq!(err.kind(), ErrorKind::LowConfidence);
}

#[test]
fn club_field_holding_a_nationality_gets_half_team_credit() {
    let db = database();
    let decoy = db
        .iter()
        .find(|p| p.name == "tomas-cech")
        .expect("decoy keeper in fixture");
    assert_eq!(decoy.season, "2017-2018");
    assert!(db.is_nationality(&decoy.team));
    assert_eq!(
        ratings_predictor::matching::team_score("arsenal", &decoy.team, &db),
        0.5
    );
}

#[test]
fn repeated_raw_name_is_rejected_before_scoring() {
    let db = database();
    let mut lineup = opening_match().home_lineup;
    let first = lineup[0].raw_name.clone();
    lineup[9] = entry("someone-else", &first, 99, "England");

    let err = ResolverSession::default()
        .resolve(&lineup, "arsenal", "2017-2018", &db)
        .expect_err("repeated raw name must fail");
    assert_eq!(err, PredictorError::DuplicateLineupName { raw_name: first });
    assert_eq!(err.kind(), ErrorKind::DataInconsistency);
}

#[test]
fn merge_lets_later_entries_win() {
    let mut session = ResolverSession::default();
    session.merge(NameCache::from([("P. Cech".to_string(), 1), ("H. Bellerin".to_string(), 2)]));
    session.merge(NameCache::from([("P. Cech".to_string(), 23)]));
    assert_eq!(session.cache().get("P. Cech").copied(), Some(23));
    assert_eq!(session.cache().get("H. Bellerin").copied(), Some(2));
    assert_eq!(session.cache().len(), 2);
}

#[test]
fn empty_database_is_an_invalid_record() {
    let lineup = opening_match().home_lineup;
    let err = ResolverSession::default()
        .resolve(&lineup, "arsenal", "2017-2018", &PlayerDatabase::default())
        .expect_err("nothing to resolve against");
    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
}

#[test]
fn season_filter_keeps_ids_and_rejects_unknown_seasons() {
    let db = database();
    let season = db.for_season("2017-2018").expect("fixture season");
    assert_eq!(
        season.len(),
        db.iter().filter(|p| p.season == "2017-2018").count()
    );
    assert!(season.iter().all(|p| db.get(p.id) == Some(p)));

    let record = opening_match();
    let home = ResolverSession::default()
        .resolve(&record.home_lineup, &record.home_team, &record.season, &season)
        .expect("filtered database still resolves the lineup");
    assert_eq!(home.ids().len(), 11);

    let err = db.for_season("1999-2000").expect_err("no players that season");
    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
}
