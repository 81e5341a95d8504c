//! Integration tests for the job state-change handler

mod common;

use common::{job_event, record, TestPipeline, OUTPUT_BUCKET};
use doctrans_common::FileStatus;
use doctrans_pipeline::handlers::handle_job_state_change;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn pipeline_with_job(status: FileStatus) -> TestPipeline {
    let pipeline = TestPipeline::new();
    pipeline
        .store
        .insert(record("F1", "report.pdf", status, Some("J1")));
    pipeline
}

#[tokio::test]
async fn test_completed_job_links_and_notifies() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    let body = response.body_json();
    let data = &body["data"];
    assert_eq!(data["action"], "completed");
    assert_eq!(data["fileId"], "F1");
    assert_eq!(data["outputKey"], "output/123-TranslateText-J1/fr.report.docx");
    assert_eq!(data["notified"], true);

    let signed = pipeline.objects.signed_gets();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].0.bucket, OUTPUT_BUCKET);
    assert_eq!(signed[0].0.key, "output/123-TranslateText-J1/fr.report.docx");
    assert_eq!(signed[0].1, Duration::from_secs(3600));

    assert_eq!(pipeline.store.record("F1").unwrap().status, FileStatus::Completed);

    let sent = pipeline.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Translation Completed - F1");
    assert!(sent[0].html_body.contains("report.pdf"));
    assert!(sent[0]
        .html_body
        .contains("https://translated.s3.test/output/123-TranslateText-J1/fr.report.docx"));
    assert!(sent[0].html_body.contains("1 hour"));
}

#[tokio::test]
async fn test_failed_job_records_failure_without_link() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "FAILED")).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(response.body_json()["data"]["action"], "failed");
    assert_eq!(pipeline.store.record("F1").unwrap().status, FileStatus::Failed);
    assert!(pipeline.objects.signed_gets().is_empty());

    let sent = pipeline.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Translation Failed - report.pdf");
    assert!(sent[0].html_body.contains("J1"));
    assert!(sent[0].html_body.contains("FAILED"));
    assert!(!sent[0].html_body.contains("https://"));
}

#[tokio::test]
async fn test_partial_and_stopped_jobs_count_as_failures() {
    for status in ["COMPLETED_WITH_ERROR", "STOPPED"] {
        let pipeline = pipeline_with_job(FileStatus::InProgress);

        let response = handle_job_state_change(&pipeline.ctx, job_event("J1", status)).await;

        assert_eq!(response.status_code, 200, "{}", status);
        assert_eq!(
            pipeline.store.record("F1").unwrap().status,
            FileStatus::Failed,
            "{}",
            status
        );
        assert_eq!(pipeline.notifier.sent().len(), 1);
    }
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let pipeline = TestPipeline::new();

    let response = handle_job_state_change(&pipeline.ctx, job_event("J404", "COMPLETED")).await;

    assert_eq!(response.status_code, 404);
    assert_eq!(response.body_json()["error"]["code"], "RECORD_NOT_FOUND");
    assert!(pipeline.store.writes().is_empty());
    assert!(pipeline.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_duplicate_event_settles_once() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);

    let first = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;
    let second = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(first.status_code, 200);
    assert_eq!(second.status_code, 200);
    assert_eq!(second.body_json()["data"]["action"], "duplicate");

    assert_eq!(pipeline.store.statuses_written("F1"), vec![FileStatus::Completed]);
    assert_eq!(pipeline.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_settled_record_is_not_reopened() {
    let pipeline = pipeline_with_job(FileStatus::Completed);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "FAILED")).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body_json()["data"]["action"], "ignored");
    assert_eq!(pipeline.store.record("F1").unwrap().status, FileStatus::Completed);
    assert!(pipeline.store.writes().is_empty());
    assert!(pipeline.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_non_terminal_status_is_ignored() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);

    for status in ["SUBMITTED", "IN_PROGRESS", "STOP_REQUESTED", "SOMETHING_NEW"] {
        let response = handle_job_state_change(&pipeline.ctx, job_event("J1", status)).await;
        assert_eq!(response.status_code, 200, "{}", status);
        assert_eq!(response.body_json()["data"]["action"], "ignored", "{}", status);
    }

    assert!(pipeline.store.writes().is_empty());
    assert!(pipeline.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_store_write_failure_still_notifies() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);
    pipeline.store.fail_writes.store(true, Ordering::SeqCst);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(pipeline.store.record("F1").unwrap().status, FileStatus::InProgress);
    assert_eq!(pipeline.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_email_failure_is_reported_not_raised() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);
    pipeline.notifier.fail.store(true, Ordering::SeqCst);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    assert_eq!(response.body_json()["data"]["notified"], false);
    assert_eq!(pipeline.store.record("F1").unwrap().status, FileStatus::Completed);
}

#[tokio::test]
async fn test_signing_failure_marks_failed() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);
    pipeline.objects.fail_presign.store(true, Ordering::SeqCst);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body_json()["error"]["code"], "OBJECT_STORE_ERROR");
    assert_eq!(pipeline.store.statuses_written("F1"), vec![FileStatus::Failed]);
    assert!(pipeline.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_store_lookup_failure_is_an_error() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);
    pipeline.store.fail_reads.store(true, Ordering::SeqCst);

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body_json()["error"]["code"], "STORE_ERROR");
    assert!(pipeline.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_ambiguous_job_id_is_an_error() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);
    pipeline
        .store
        .insert(record("F2", "other.docx", FileStatus::InProgress, Some("J1")));

    let response = handle_job_state_change(&pipeline.ctx, job_event("J1", "COMPLETED")).await;

    assert_eq!(response.status_code, 500);
    assert!(pipeline.store.writes().is_empty());
    assert!(pipeline.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_events_are_rejected() {
    let pipeline = pipeline_with_job(FileStatus::InProgress);

    for payload in [
        json!({ "account": "123", "detail": { "jobStatus": "COMPLETED" } }),
        json!({ "account": "123", "detail": { "jobId": "", "jobStatus": "COMPLETED" } }),
        json!({ "detail": { "jobId": "J1", "jobStatus": "COMPLETED" } }),
        json!({ "JobName": "J1", "Status": "COMPLETED" }),
    ] {
        let response = handle_job_state_change(&pipeline.ctx, payload.clone()).await;
        assert_eq!(response.status_code, 400, "{}", payload);
    }

    assert!(pipeline.store.writes().is_empty());
}

#[tokio::test]
async fn test_docx_output_keeps_its_name() {
    let pipeline = TestPipeline::new();
    pipeline
        .store
        .insert(record("F3", "plan.docx", FileStatus::InProgress, Some("J7")));

    let response = handle_job_state_change(&pipeline.ctx, job_event("J7", "COMPLETED")).await;

    assert_eq!(
        response.body_json()["data"]["outputKey"],
        "output/123-TranslateText-J7/fr.plan.docx"
    );
}
