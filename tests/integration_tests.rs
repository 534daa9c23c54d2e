use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;

use medidirect::config::AppConfig;
use medidirect::db;
use medidirect::db::directory::{import_directory, DirectoryFile};
use medidirect::models::BookingEventKind;
use medidirect::services::messaging::MessagingProvider;
use medidirect::state::AppState;

// ── Mock Providers ──

struct MockMessaging {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl MessagingProvider for MockMessaging {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

// ── Helpers ──

const DIRECTORY: &str = r#"{"centres":[
    {"id":3,"name":"Lekki Diagnostics","locality":{"state":"Lagos","lga":"Lekki"},
     "averageRating":4.8,"status":"VERIFIED",
     "services":[{"id":31,"serviceName":"Lipid Profile","serviceType":"Blood Test","price":"20000"}]},
    {"id":1,"name":"Clina Lancet","locality":{"state":"Lagos","lga":"Ikeja"},
     "averageRating":4.5,"status":"VERIFIED",
     "services":[{"id":11,"serviceName":"Full Blood Count","serviceType":"Blood Test",
                  "price":"15000","timeDuration":"30 mins"},
                 {"id":12,"serviceName":"MRI Scan","serviceType":"Imaging","price":"90000",
                  "isAvailable":false}]},
    {"id":2,"name":"Yaba Imaging","locality":{"state":"Lagos","lga":"Yaba"},
     "averageRating":3.9,"status":"VERIFIED",
     "services":[{"id":21,"serviceName":"Chest X-Ray","serviceType":"X-Ray","price":"12000"}]},
    {"id":4,"name":"Garki Labs","locality":{"state":"Abuja","lga":"Garki"},
     "averageRating":4.9,"status":"SUSPENDED",
     "services":[{"id":41,"serviceName":"Malaria Test","serviceType":"Blood Test","price":"5000"}]},
    {"id":5,"name":"Weekday Clinic","locality":{"state":"Lagos","lga":"Surulere"},
     "averageRating":4.1,"status":"VERIFIED",
     "operatingHours":{"days":[{"day":"mon","open":"08:00","close":"17:00"}]},
     "services":[{"id":51,"serviceName":"Urinalysis","serviceType":"Urine Test","price":"4000"}]}
]}"#;

fn test_config() -> AppConfig {
    AppConfig {
        twilio_account_sid: "AC_test".to_string(),
        twilio_auth_token: "secret".to_string(),
        twilio_phone_number: "+15551234567".to_string(),
        ..AppConfig::default()
    }
}

fn test_state_with_config(config: AppConfig) -> (Arc<AppState>, Arc<Mutex<Vec<(String, String)>>>) {
    let mut conn = db::init_db(":memory:").unwrap();
    let directory: DirectoryFile = serde_json::from_str(DIRECTORY).unwrap();
    import_directory(&mut conn, &directory).unwrap();

    let sent = Arc::new(Mutex::new(vec![]));
    let messaging = MockMessaging {
        sent: Arc::clone(&sent),
    };
    let state = Arc::new(AppState::new(conn, config, Box::new(messaging)).unwrap());
    (state, sent)
}

fn test_state() -> (Arc<AppState>, Arc<Mutex<Vec<(String, String)>>>) {
    test_state_with_config(test_config())
}

fn test_app(state: Arc<AppState>) -> Router {
    medidirect::app(state)
}

fn days_ahead(state: &AppState, days: i64) -> String {
    (state.config.local_now().date() + chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

fn next_weekday(state: &AppState, weekday: Weekday) -> String {
    let mut date: NaiveDate = state.config.local_now().date() + chrono::Duration::days(1);
    while date.weekday() != weekday {
        date += chrono::Duration::days(1);
    }
    date.format("%Y-%m-%d").to_string()
}

fn booking_payload(date: &str) -> Value {
    json!({
        "centreId": 1,
        "serviceId": 11,
        "date": date,
        "time": "10:00",
        "guestFirstName": "Ada",
        "guestLastName": "Obi",
        "guestPhone": "0801 234 5678",
        "guestEmail": "ada@example.com",
        "guestLGA": "Ikeja",
        "serviceName": "Full Blood Count",
        "servicePrice": "15000",
        "agreedToTerms": true
    })
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create_booking(state: &Arc<AppState>, date: &str) -> Value {
    let (status, body) = send(
        test_app(Arc::clone(state)),
        "POST",
        "/bookings",
        Some(booking_payload(date)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn wait_for_sms(sent: &Arc<Mutex<Vec<(String, String)>>>, count: usize) {
    for _ in 0..100 {
        if sent.lock().unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} sms, got {}", sent.lock().unwrap().len());
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();
    let (status, body) = send(test_app(state), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ── Centre Search ──

#[tokio::test]
async fn test_search_blood_tests_in_lagos() {
    let (state, _) = test_state();
    let (status, body) = send(
        test_app(state),
        "GET",
        "/centres?serviceType=blood&state=Lagos&minRating=4",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let ids: Vec<i64> = body["data"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    // Suspended centre 4 never appears, results ordered by id.
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_search_aliases_and_pagination() {
    let (state, _) = test_state();

    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "GET",
        "/centres?testType=BLOOD&location=lagos&lga=lek",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"][0]["id"], 3);

    let (status, body) = send(test_app(Arc::clone(&state)), "GET", "/centres?page=2&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 5]);
    assert_eq!(body["data"]["pagination"]["page"], 2);
    assert_eq!(body["data"]["pagination"]["pageSize"], 2);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);

    let (status, body) = send(test_app(state), "GET", "/centres?page=9&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_rejects_bad_paging() {
    let (state, _) = test_state();
    for uri in ["/centres?page=0", "/centres?limit=0", "/centres?page=abc", "/centres?limit=101", "/centres?minRating=7"] {
        let (status, body) = send(test_app(Arc::clone(&state)), "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["status"], "fail");
        assert_eq!(body["kind"], "invalid_argument");
    }
}

#[tokio::test]
async fn test_get_centre() {
    let (state, _) = test_state();
    let (status, body) = send(test_app(Arc::clone(&state)), "GET", "/centres/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Clina Lancet");
    assert_eq!(body["data"]["services"][0]["price"], "15000");

    let (status, body) = send(test_app(state), "GET", "/centres/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

// ── Booking Creation ──

#[tokio::test]
async fn test_create_booking_and_fetch_by_reference() {
    let (state, sent) = test_state();
    let mut rx = state.events_tx.subscribe();

    let booking = create_booking(&state, &days_ahead(&state, 10)).await;
    assert_eq!(booking["status"], "PENDING");
    assert_eq!(booking["time"], "10:00");
    assert_eq!(booking["guestLGA"], "Ikeja");
    let reference = booking["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("BK"));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, BookingEventKind::BookingCreated);
    assert_eq!(event.reference, reference);

    wait_for_sms(&sent, 1).await;
    let (to, body) = sent.lock().unwrap()[0].clone();
    assert_eq!(to, "0801 234 5678");
    assert!(body.contains(&reference));

    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "GET",
        &format!("/bookings/{reference}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], booking["id"]);

    let (status, body) = send(
        test_app(state),
        "GET",
        "/bookings?guestEmail=ADA@example.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_identical_submissions_create_two_bookings() {
    let (state, _) = test_state();
    let date = days_ahead(&state, 5);
    let first = create_booking(&state, &date).await;
    let second = create_booking(&state, &date).await;
    assert_ne!(first["id"], second["id"]);
    assert_ne!(first["reference"], second["reference"]);
}

#[tokio::test]
async fn test_exclusive_slots_when_enabled() {
    let config = AppConfig {
        single_booking_per_slot: true,
        ..test_config()
    };
    let (state, _) = test_state_with_config(config);
    let date = days_ahead(&state, 5);
    create_booking(&state, &date).await;

    let (status, body) = send(
        test_app(state),
        "POST",
        "/bookings",
        Some(booking_payload(&date)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "scheduling_conflict");
}

#[tokio::test]
async fn test_create_booking_validation_lists_fields() {
    let (state, sent) = test_state();
    let (status, body) = send(
        test_app(state),
        "POST",
        "/bookings",
        Some(json!({"centreId": 1, "servicePrice": "-5", "guestEmail": "nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    for field in ["date", "time", "guestFirstName", "guestPhone", "guestEmail", "servicePrice"] {
        assert!(fields.contains(&field), "missing {field} in {fields:?}");
    }
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_booking_malformed_json() {
    let (state, _) = test_state();
    let req = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = test_app(state).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_booking_on_closed_day() {
    let (state, _) = test_state();
    let mut payload = booking_payload(&next_weekday(&state, Weekday::Tue));
    payload["centreId"] = json!(5);
    payload["serviceId"] = json!(51);

    let (status, body) = send(test_app(Arc::clone(&state)), "POST", "/bookings", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "scheduling_conflict");

    payload["date"] = json!(next_weekday(&state, Weekday::Mon));
    let (status, _) = send(test_app(state), "POST", "/bookings", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_booking_unknown_or_suspended_centre() {
    let (state, _) = test_state();
    let date = days_ahead(&state, 3);

    let mut payload = booking_payload(&date);
    payload["centreId"] = json!(999);
    let (status, _) = send(test_app(Arc::clone(&state)), "POST", "/bookings", Some(payload)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut payload = booking_payload(&date);
    payload["centreId"] = json!(4);
    payload["serviceId"] = json!(41);
    let (status, body) = send(test_app(state), "POST", "/bookings", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "centreId");
}

// ── Transitions ──

#[tokio::test]
async fn test_confirm_then_cancel_with_full_refund() {
    let (state, sent) = test_state();
    let booking = create_booking(&state, &days_ahead(&state, 20)).await;
    let id = booking["id"].as_str().unwrap();

    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "POST",
        &format!("/bookings/{id}/status"),
        Some(json!({"status": "confirmed", "expectedVersion": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["booking"]["status"], "CONFIRMED");
    assert_eq!(body["data"]["booking"]["version"], 2);

    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "GET",
        &format!("/bookings/{id}/refund-quote"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["percentage"], 100);

    let mut rx = state.events_tx.subscribe();
    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "POST",
        &format!("/bookings/{id}/cancel"),
        Some(json!({
            "agreedToTerms": true,
            "cancellationReason": "Other",
            "customReason": "Travelling that week"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["booking"]["status"], "CANCELLED");
    assert_eq!(body["data"]["booking"]["cancellationReason"], "Travelling that week");
    assert_eq!(body["data"]["refund"]["percentage"], 100);
    assert_eq!(body["data"]["refund"]["amount"], "15000");

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, BookingEventKind::BookingCancelled);
    wait_for_sms(&sent, 3).await;

    // Terminal: cannot be confirmed again.
    let (status, body) = send(
        test_app(state),
        "POST",
        &format!("/bookings/{id}/status"),
        Some(json!({"status": "CONFIRMED"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_state_transition");
}

#[tokio::test]
async fn test_cancel_without_terms_leaves_booking_unchanged() {
    let (state, _) = test_state();
    let booking = create_booking(&state, &days_ahead(&state, 4)).await;
    let id = booking["id"].as_str().unwrap();

    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "POST",
        &format!("/bookings/{id}/cancel"),
        Some(json!({"cancellationReason": "Schedule clash"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "agreedToTerms");

    let (_, body) = send(test_app(state), "GET", &format!("/bookings/{id}"), None).await;
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["version"], 1);
}

#[tokio::test]
async fn test_reschedule_keeps_status() {
    let (state, _) = test_state();
    let booking = create_booking(&state, &days_ahead(&state, 4)).await;
    let reference = booking["reference"].as_str().unwrap();
    let new_date = days_ahead(&state, 6);

    let (status, body) = send(
        test_app(state),
        "POST",
        &format!("/bookings/{reference}/reschedule"),
        Some(json!({"date": new_date, "time": "14:30", "rescheduleReason": "Work trip"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["booking"]["status"], "PENDING");
    assert_eq!(body["data"]["booking"]["date"], new_date.as_str());
    assert_eq!(body["data"]["booking"]["time"], "14:30");
    assert_eq!(body["data"]["booking"]["rescheduleCount"], 1);
}

#[tokio::test]
async fn test_stale_version_is_conflict() {
    let (state, _) = test_state();
    let booking = create_booking(&state, &days_ahead(&state, 4)).await;
    let id = booking["id"].as_str().unwrap();
    let uri = format!("/bookings/{id}/status");

    let (status, _) = send(
        test_app(Arc::clone(&state)),
        "POST",
        &uri,
        Some(json!({"status": "CONFIRMED", "expectedVersion": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        test_app(state),
        "POST",
        &uri,
        Some(json!({"status": "COMPLETED", "expectedVersion": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn test_no_show_before_appointment_rejected() {
    let (state, _) = test_state();
    let booking = create_booking(&state, &days_ahead(&state, 4)).await;
    let id = booking["id"].as_str().unwrap();
    let uri = format!("/bookings/{id}/status");

    send(test_app(Arc::clone(&state)), "POST", &uri, Some(json!({"status": "CONFIRMED"}))).await;
    let (status, body) = send(test_app(state), "POST", &uri, Some(json!({"status": "no-show"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_unknown_booking_and_status() {
    let (state, _) = test_state();
    let (status, _) = send(
        test_app(Arc::clone(&state)),
        "POST",
        "/bookings/BK999999/status",
        Some(json!({"status": "CONFIRMED"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let booking = create_booking(&state, &days_ahead(&state, 4)).await;
    let id = booking["id"].as_str().unwrap();
    let (status, body) = send(
        test_app(Arc::clone(&state)),
        "POST",
        &format!("/bookings/{id}/status"),
        Some(json!({"status": "ARCHIVED"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");

    let (status, _) = send(test_app(state), "GET", "/bookings", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Calendar & Events ──

#[tokio::test]
async fn test_calendar_export() {
    let (state, _) = test_state();
    let booking = create_booking(&state, &days_ahead(&state, 4)).await;
    let id = booking["id"].as_str().unwrap();

    let res = test_app(Arc::clone(&state))
        .oneshot(
            Request::builder()
                .uri(format!("/calendar/{id}.ics"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("SUMMARY:Full Blood Count at Clina Lancet"));
    assert!(ics.contains("STATUS:TENTATIVE"));

    let (status, _) = send(test_app(state), "GET", "/calendar/missing.ics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_stream_opens() {
    let (state, _) = test_state();
    let res = test_app(state)
        .oneshot(
            Request::builder()
                .uri("/events/bookings?centreId=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "text/event-stream");
}

// ── Store Availability ──

#[tokio::test]
async fn test_poisoned_store_is_unavailable() {
    let (state, _) = test_state();
    let db = Arc::clone(&state.db);
    let _ = std::thread::spawn(move || {
        let _guard = db.lock().unwrap();
        panic!("poison the store lock");
    })
    .join();

    let (status, body) = send(test_app(state), "GET", "/centres", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "unavailable");
}
