//! Composite-image behavior: per-job passes never move the visible
//! status, the end-of-run fold does, and each composite image notifies
//! at most once per run.

mod common;

use common::builders::JobFolderBuilder;
use common::harness::{TestHarness, GROUP_P00};

/// Seeds one composite image with a render responsible and a prior
/// attempt row, returning its id.
fn seed_composite(harness: &TestHarness, prior_status: &str) -> i64 {
    let imagem_id = harness.seed_image("30.TW2_PK Fachada", GROUP_P00);
    harness.seed_role(imagem_id, 4, 42);
    harness.seed_attempt(imagem_id, GROUP_P00, prior_status, None);
    imagem_id
}

#[test]
fn completed_fleet_changes_status_once_and_notifies_once() {
    let harness = TestHarness::new();
    let imagem_id = seed_composite(&harness, "Em andamento");

    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("yes")
        .build(&harness);
    JobFolderBuilder::new("p00_job_b")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("yes")
        .build(&harness);

    let summary = harness.run();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.composites_aggregated, 1);
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Em aprovação")
    );
    // Two sub-jobs changed, one notification.
    assert_eq!(harness.notification_count(), 1);
    assert_eq!(
        harness.chat.broadcasts.borrow()[0],
        "O render da imagem: 30.TW2_PK Fachada foi concluído com sucesso, favor aprovar!"
    );
}

#[test]
fn one_failed_subjob_dominates_the_fleet() {
    let harness = TestHarness::new();
    let imagem_id = seed_composite(&harness, "Em andamento");

    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("yes")
        .build(&harness);
    JobFolderBuilder::new("p00_job_b")
        .name("30.TW2_PK Fachada")
        .active("yes")
        .complete("no")
        .build(&harness);
    JobFolderBuilder::new("p00_job_c")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("no")
        .with_error_log()
        .build(&harness);

    harness.run();

    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Erro")
    );
    assert_eq!(harness.notification_count(), 1);
    assert_eq!(
        harness.chat.broadcasts.borrow()[0],
        "O render da imagem: 30.TW2_PK Fachada deu erro, favor verificar!"
    );
}

#[test]
fn subjob_passes_do_not_touch_the_visible_status() {
    let harness = TestHarness::new();
    let imagem_id = seed_composite(&harness, "Em andamento");

    // A completed sub-job alongside a running one: the fleet is not
    // done, so the visible status must stay as it was.
    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("yes")
        .build(&harness);
    JobFolderBuilder::new("p00_job_b")
        .name("30.TW2_PK Fachada")
        .active("yes")
        .complete("no")
        .build(&harness);

    let summary = harness.run();

    assert_eq!(summary.composites_aggregated, 0);
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Em andamento")
    );
    assert_eq!(harness.notification_count(), 0);
    // Composite sub-jobs never create post-production links.
    assert_eq!(harness.pos_producao_count(), 0);
}

#[test]
fn composite_subjobs_refresh_auxiliary_columns() {
    let harness = TestHarness::new();
    let imagem_id = seed_composite(&harness, "Em andamento");

    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("yes")
        .complete("no")
        .preview("frame_0001.jpg")
        .build(&harness);

    harness.run();

    let (computer, preview): (Option<String>, Option<String>) = harness
        .db
        .with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT computer, previa_jpg FROM render_alta WHERE imagem_id = ?1",
                rusqlite::params![imagem_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?)
        })
        .unwrap();
    assert_eq!(computer.as_deref(), Some("RENDER-07"));
    assert_eq!(preview.as_deref(), Some("frame_0001.jpg"));
}

#[test]
fn terminal_composite_is_never_reopened() {
    let harness = TestHarness::new();
    let imagem_id = seed_composite(&harness, "Aprovado");

    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .with_error_log()
        .build(&harness);

    let summary = harness.run();

    assert_eq!(summary.composites_aggregated, 0);
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Aprovado")
    );
    assert_eq!(harness.notification_count(), 0);
}

#[test]
fn unchanged_aggregate_stays_silent() {
    let harness = TestHarness::new();
    let imagem_id = seed_composite(&harness, "Erro");

    // Still failing; no complete flag, so the error-recovery override
    // does not fire and the aggregate matches the stored status.
    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("no")
        .with_error_log()
        .build(&harness);

    let summary = harness.run();

    assert_eq!(summary.composites_aggregated, 0);
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Erro")
    );
    assert_eq!(harness.notification_count(), 0);
}

#[test]
fn first_sighting_writes_the_candidate_without_aggregating() {
    let harness = TestHarness::new();
    let imagem_id = harness.seed_image("30.TW2_PK Fachada", GROUP_P00);
    harness.seed_role(imagem_id, 4, 42);

    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("yes")
        .complete("no")
        .build(&harness);

    let summary = harness.run();

    // With no prior row the candidate lands directly; the aggregate
    // agrees with it, so the fold has nothing to change.
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Em andamento")
    );
    assert_eq!(summary.composites_aggregated, 0);
}

#[test]
fn first_run_error_dominates_after_a_completed_subjob() {
    let harness = TestHarness::new();
    let imagem_id = harness.seed_image("30.TW2_PK Fachada", GROUP_P00);
    harness.seed_role(imagem_id, 4, 42);

    // No prior row, and the completed sub-job is walked first. The row
    // it writes must not hide the later failure from the fold.
    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("yes")
        .build(&harness);
    JobFolderBuilder::new("p00_job_b")
        .name("30.TW2_PK Fachada")
        .active("yes")
        .complete("no")
        .build(&harness);
    JobFolderBuilder::new("p00_job_c")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("no")
        .with_error_log()
        .build(&harness);

    let summary = harness.run();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.composites_aggregated, 1);
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Erro")
    );
    assert_eq!(harness.notification_count(), 1);
}

#[test]
fn aggregation_without_known_responsible_updates_silently() {
    let harness = TestHarness::new();
    let imagem_id = harness.seed_image("30.TW2_PK Fachada", GROUP_P00);
    harness.seed_attempt(imagem_id, GROUP_P00, "Em andamento", None);

    JobFolderBuilder::new("p00_job_a")
        .name("30.TW2_PK Fachada")
        .active("no")
        .complete("yes")
        .build(&harness);

    let summary = harness.run();

    assert_eq!(summary.composites_aggregated, 1);
    assert_eq!(
        harness.attempt_status(imagem_id, GROUP_P00).as_deref(),
        Some("Em aprovação")
    );
    assert_eq!(harness.notification_count(), 0);
}
