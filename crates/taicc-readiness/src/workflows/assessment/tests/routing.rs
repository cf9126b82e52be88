use super::common::*;
use axum::http::{header, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::assessment::payment::PaymentStatus;
use crate::workflows::assessment::service::AssessmentService;

const LOGIN_FORM: &str =
    "name=Asha+Rao&company=Sunrise+Clinics&email=asha%40sunrise.example&phone=98765&segment=Healthcare&tier=Tier+3";

fn answers_form(rating: &str, count: usize) -> String {
    (0..count)
        .map(|index| format!("q{index}={rating}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[tokio::test]
async fn first_visit_issues_a_session_and_renders_login() {
    let router = router(harness().service);

    let response = router
        .oneshot(
            axum::http::Request::get("/")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert_eq!(cookie.len(), 36);
    let body = read_text(response).await;
    assert!(body.contains("Select Your Domain"));
    assert!(body.contains("Healthcare"));
}

#[tokio::test]
async fn browser_flow_reaches_results_and_serves_the_pdf() {
    let harness = harness();
    let router = router(harness.service.clone());

    let response = router
        .clone()
        .oneshot(post_form("/login", None, LOGIN_FORM))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let session = session_cookie(&response);

    let response = router.clone().oneshot(get("/", &session)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_text(response).await;
    assert!(body.contains("Healthcare readiness question 10?"));
    assert!(body.contains("name=\"q9\""));

    let response = router
        .clone()
        .oneshot(post_form(
            "/questions/answer",
            Some(&session),
            "index=2&rating=Very",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let progress = read_json(response).await;
    assert_eq!(progress["answered"], 10);
    assert_eq!(progress["total"], 10);
    assert_eq!(progress["progress"], 100);

    let response = router
        .clone()
        .oneshot(post_form(
            "/questions",
            Some(&session),
            &answers_form("Moderately", 10),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = router.clone().oneshot(get("/", &session)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_text(response).await;
    assert!(body.contains("3.00"));
    assert!(body.contains("<strong>Established</strong>"));
    assert!(body.contains("Executive Summary"));

    let response = router
        .clone()
        .oneshot(get("/report.pdf", &session))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"TAICC_AI_Readiness_Report.pdf\""
    );
    assert!(read_body(response).await.starts_with(b"%PDF"));

    assert_eq!(harness.sheet.rows().len(), 1);
}

#[tokio::test]
async fn login_with_unknown_tier_is_rejected_on_the_login_page() {
    let router = router(harness().service);

    let response = router
        .oneshot(post_form(
            "/login",
            None,
            "name=A&company=B&email=c&phone=d&segment=Healthcare&tier=Tier+9",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_text(response).await;
    assert!(body.contains("has no tier"));
    assert!(body.contains("Select Your Tier"));
}

#[tokio::test]
async fn report_is_not_found_before_results() {
    let router = router(harness().service);
    let response = router
        .clone()
        .oneshot(post_form("/login", None, LOGIN_FORM))
        .await
        .unwrap();
    let session = session_cookie(&response);

    let response = router.oneshot(get("/report.pdf", &session)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_rating_returns_json_error() {
    let router = router(harness().service);
    let response = router
        .clone()
        .oneshot(post_form("/login", None, LOGIN_FORM))
        .await
        .unwrap();
    let session = session_cookie(&response);

    let response = router
        .oneshot(post_form(
            "/questions/answer",
            Some(&session),
            "index=0&rating=Somewhat",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json(response).await;
    assert!(payload["error"].as_str().unwrap().contains("Somewhat"));
}

#[tokio::test]
async fn narrative_outage_renders_bad_gateway() {
    let service = Arc::new(AssessmentService::new(
        catalog(),
        Arc::new(FailingNarrator),
        Arc::new(RecordingSpreadsheet::default()),
        Arc::new(ManualClock::starting_at(started_at())),
    ));
    let router = router(service);
    let response = router
        .clone()
        .oneshot(post_form(
            "/login",
            None,
            "name=A&company=B&email=c&phone=d&segment=BFSI&tier=Tier+3",
        ))
        .await
        .unwrap();
    let session = session_cookie(&response);
    router
        .clone()
        .oneshot(post_form("/questions", Some(&session), &answers_form("Fully", 2)))
        .await
        .unwrap();

    let response = router.oneshot(get("/", &session)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(read_text(response).await.contains("Report generation failed"));
}

#[tokio::test]
async fn confirming_an_unpaid_order_requires_payment() {
    let payments = Arc::new(ScriptedPayments::new([PaymentStatus::Created]));
    let router = router(paid_harness(payments.clone()).service);
    let response = router
        .clone()
        .oneshot(post_form("/login", None, LOGIN_FORM))
        .await
        .unwrap();
    let session = session_cookie(&response);

    let response = router
        .clone()
        .oneshot(get("/", &session))
        .await
        .unwrap();
    assert!(read_text(response).await.contains("order_1"));

    let response = router
        .oneshot(post_form("/payment/confirm", Some(&session), ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert!(read_text(response).await.contains("complete the payment"));
    assert_eq!(payments.orders().len(), 1);
}

#[tokio::test]
async fn catalog_endpoint_lists_segments_and_tiers() {
    let router = router(harness().service);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/catalog")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["segments"][0]["name"], "Healthcare");
    assert_eq!(payload["segments"][1]["name"], "BFSI");
    assert_eq!(payload["tiers"][0]["name"], "Tier 3");
}

#[tokio::test]
async fn unknown_session_cookie_starts_a_fresh_session() {
    let router = router(harness().service);

    let response = router
        .oneshot(get("/", "6f1c2a7e-0000-4000-8000-000000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(session_cookie(&response), "6f1c2a7e-0000-4000-8000-000000000000");
}
