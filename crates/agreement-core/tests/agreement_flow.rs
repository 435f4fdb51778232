//! End-to-end flow over the SQLite store: aggregate, merge, review, export,
//! and measure.

use _agreement_core::consensus::ConsensusPolicy;
use _agreement_core::errors::AgreementError;
use _agreement_core::models::{
    Annotation, Code, MergeStatus, Relationship, Token, BRENNAN_KAPPA_NAME, FLEISS_KAPPA_NAME,
};
use _agreement_core::service;
use _agreement_core::store::{AnnotationStore, Database, VocabularyCache};

fn tokens() -> Vec<Token> {
    ["App", "crashes", "on", "login"]
        .iter()
        .enumerate()
        .map(|(i, word)| Token::new(i, *word))
        .collect()
}

fn annotation(name: &str, with_extra_code: bool) -> Annotation {
    let mut annotation = Annotation::new(name, "reviews");
    annotation.tokens = tokens();
    annotation.codes = vec![
        Code::new(0, vec![0], "app", "Software"),
        Code::new(1, vec![3], "login", "Function").with_memberships(vec![0]),
    ];
    if with_extra_code {
        annotation.codes.push(Code::new(2, vec![1], "crash", "Task"));
    }
    annotation.tore_relationships = vec![Relationship::new(0, 1, "uses", vec![0])];
    annotation
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn seeded_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("agreement.db")).unwrap();
    db.init_schema().unwrap();
    db.set_categories(&names(&["Software", "Function", "Task"]))
        .unwrap();
    db.set_relationship_names(&names(&["uses"])).unwrap();
    db.store_annotation(&annotation("anno-a", false)).unwrap();
    db.store_annotation(&annotation("anno-b", true)).unwrap();
    (dir, db)
}

#[test]
fn aggregate_remaps_second_annotation() {
    let (_dir, db) = seeded_database();
    let aggregated = service::aggregate(
        &db,
        &names(&["anno-a", "anno-b"]),
        false,
        ConsensusPolicy::LeavePending,
    )
    .unwrap();

    assert_eq!(aggregated.code_alternatives.len(), 5);
    assert_eq!(aggregated.tore_relationships.len(), 2);
    assert_eq!(aggregated.tokens.len(), 4);

    let second_login = &aggregated.code_alternatives[3];
    assert_eq!(second_login.annotation_name, "anno-b");
    assert_eq!(second_login.code.index, 3);
    assert_eq!(second_login.code.relationship_memberships, vec![1]);
    assert_eq!(aggregated.tore_relationships[1].index, 1);
    assert_eq!(aggregated.tore_relationships[1].owner, Some(3));
    assert!(aggregated
        .code_alternatives
        .iter()
        .all(|alt| alt.merge_status == MergeStatus::Pending));
}

#[test]
fn full_review_cycle_exports_accepted_codes() {
    let (_dir, db) = seeded_database();
    let vocabulary = VocabularyCache::new(db.clone(), 60.0);

    let mut agreement = service::create_agreement(
        &db,
        &vocabulary,
        "agr-1",
        &names(&["anno-a", "anno-b"]),
        true,
        ConsensusPolicy::LeavePending,
    )
    .unwrap();

    let statuses: Vec<MergeStatus> = agreement
        .code_alternatives
        .iter()
        .map(|alt| alt.merge_status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            MergeStatus::Accepted,
            MergeStatus::Accepted,
            MergeStatus::Declined,
            MergeStatus::Declined,
            MergeStatus::Pending,
        ]
    );
    assert!(agreement.statistic(FLEISS_KAPPA_NAME).is_some());
    assert!(agreement.statistic(BRENNAN_KAPPA_NAME).is_some());

    // Not reviewed yet.
    assert!(matches!(
        service::export_annotation(&db, "agr-1", "gold"),
        Err(AgreementError::NotCompleted(_))
    ));

    agreement.code_alternatives[4].merge_status = MergeStatus::Declined;
    agreement.is_completed = true;
    db.store_agreement(&agreement).unwrap();

    let exported = service::export_annotation(&db, "agr-1", "gold").unwrap();
    assert_eq!(exported.dataset, "reviews");
    assert_eq!(exported.codes.len(), 2);
    assert_eq!(exported.codes[1].index, 1);
    assert_eq!(exported.codes[1].relationship_memberships, vec![0]);
    assert_eq!(exported.tore_relationships.len(), 1);
    assert_eq!(exported.tore_relationships[0].owner, Some(1));
    assert_eq!(exported.tokens[0].num_name_codes, 1);
    assert_eq!(exported.tokens[1].num_name_codes, 0);

    assert_eq!(db.get_annotation("gold").unwrap(), exported);
}

#[test]
fn kappas_of_stored_agreement_stay_in_range() {
    let (_dir, db) = seeded_database();
    service::create_agreement(
        &db,
        &db,
        "agr-2",
        &names(&["anno-a", "anno-b"]),
        false,
        ConsensusPolicy::LeavePending,
    )
    .unwrap();

    let pair = service::compute_kappas(&db, &db, "agr-2").unwrap();
    assert!((0.0..=1.0).contains(&pair.fleiss_kappa));
    assert!((0.0..=1.0).contains(&pair.brennan_kappa));

    let stored = db.get_agreement("agr-2").unwrap();
    let fleiss = stored.statistic(FLEISS_KAPPA_NAME).unwrap();
    assert_eq!(fleiss.initial_kappa, pair.fleiss_kappa);
}

#[test]
fn decline_policy_leaves_nothing_pending() {
    let (_dir, db) = seeded_database();
    let aggregated = service::aggregate(
        &db,
        &names(&["anno-a", "anno-b"]),
        true,
        ConsensusPolicy::DeclineUnresolved,
    )
    .unwrap();
    assert!(aggregated
        .code_alternatives
        .iter()
        .all(|alt| alt.merge_status != MergeStatus::Pending));
    assert_eq!(
        aggregated.code_alternatives[4].merge_status,
        MergeStatus::Declined
    );
}

#[test]
fn repeated_annotation_name_counts_as_one_rater() {
    let (_dir, db) = seeded_database();
    let aggregated = service::aggregate(
        &db,
        &names(&["anno-a", "anno-a"]),
        true,
        ConsensusPolicy::LeavePending,
    )
    .unwrap();

    // Both copies propose identical codes, so each span is unanimous for
    // the single distinct annotator.
    let statuses: Vec<MergeStatus> = aggregated
        .code_alternatives
        .iter()
        .map(|alt| alt.merge_status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            MergeStatus::Accepted,
            MergeStatus::Accepted,
            MergeStatus::Declined,
            MergeStatus::Declined,
        ]
    );
}

#[test]
fn unknown_names_are_reported() {
    let (_dir, db) = seeded_database();
    assert!(matches!(
        service::aggregate(
            &db,
            &names(&["anno-a", "ghost"]),
            false,
            ConsensusPolicy::LeavePending
        ),
        Err(AgreementError::NotFound(_))
    ));
    assert!(matches!(
        service::compute_kappas(&db, &db, "ghost"),
        Err(AgreementError::NotFound(_))
    ));
    assert!(matches!(
        service::aggregate(&db, &[], false, ConsensusPolicy::LeavePending),
        Err(AgreementError::InvalidInput(_))
    ));
}
