use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use serde_json::{json, Value};
use signal_payment_engine::{events::EventProducers, PaymentFlowApi, PaymentGatewayDatabase, SqliteDatabase};

use super::helpers::{seed_user, test_config, test_db, StubSource};
use crate::{
    config::PagSeguroConfig,
    integrations::pagseguro::PagSeguroApi,
    routes::{health, CreatePaymentRoute, IncomingPaymentRoute, PaymentHistoryRoute, PlansRoute},
};

fn paid_transaction_xml(reference: &str) -> String {
    format!(
        "<transaction><status>3</status><reference>{reference}</reference><code>TX-CODE-1</code>\
         <grossAmount>29.90</grossAmount></transaction>"
    )
}

async fn post_webhook(db: SqliteDatabase, source: StubSource, body: Value) -> (StatusCode, Value) {
    let api = PaymentFlowApi::new(db, EventProducers::default());
    let app = App::new()
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(source))
        .app_data(web::Data::new(test_config()))
        .service(IncomingPaymentRoute::<SqliteDatabase, StubSource>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/payments/webhook").set_json(&body).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body: Value = test::read_body_json(res).await;
    (status, body)
}

#[actix_web::test]
async fn generic_approved_payment_is_recorded_and_acknowledged() {
    let (db, _guard) = test_db().await;
    seed_user(&db, "alice").await;
    let body = json!({"payment_id": "GEN-1", "user_id": "alice", "status": "approved", "amount": 29.90});
    let (status, ack) = post_webhook(db.clone(), StubSource::returning(""), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"received": true}));
    let history = db.payment_history("alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].gateway_payment_id.as_deref(), Some("GEN-1"));
    let user = db.fetch_user("alice").await.unwrap().unwrap();
    assert!(user.subscription_ends_at.is_some());
}

#[actix_web::test]
async fn pagseguro_notification_is_resolved_through_the_transaction_source() {
    let (db, _guard) = test_db().await;
    seed_user(&db, "bob").await;
    let source = StubSource::returning(&paid_transaction_xml("bob"));
    let (status, ack) = post_webhook(db.clone(), source, json!({"notificationCode": "NOTIF-77"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"received": true}));
    let history = db.payment_history("bob").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].gateway, "pagseguro");
    assert_eq!(history[0].gateway_payment_id.as_deref(), Some("TX-CODE-1"));
}

#[actix_web::test]
async fn duplicate_and_unknown_user_notifications_are_still_acknowledged() {
    let (db, _guard) = test_db().await;
    seed_user(&db, "carol").await;
    let body = json!({"payment_id": "GEN-2", "user_id": "carol", "status": "completed", "amount": 79.90});
    post_webhook(db.clone(), StubSource::returning(""), body.clone()).await;
    let (status, ack) = post_webhook(db.clone(), StubSource::returning(""), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"received": true}));
    assert_eq!(db.payment_history("carol").await.unwrap().len(), 1);

    let orphan = json!({"payment_id": "GEN-3", "user_id": "nobody", "status": "approved", "amount": 10.0});
    let (status, ack) = post_webhook(db.clone(), StubSource::returning(""), orphan).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"received": true}));
}

#[actix_web::test]
async fn unparseable_webhook_body_is_a_bad_request() {
    let (db, _guard) = test_db().await;
    let api = PaymentFlowApi::new(db, EventProducers::default());
    let app = App::new()
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(StubSource::returning("")))
        .app_data(web::Data::new(test_config()))
        .service(IncomingPaymentRoute::<SqliteDatabase, StubSource>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("this is not json")
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn history_requires_the_user_header() {
    let (db, _guard) = test_db().await;
    seed_user(&db, "dave").await;
    let api = PaymentFlowApi::new(db, EventProducers::default());
    let app = App::new()
        .app_data(web::Data::new(api))
        .service(PaymentHistoryRoute::<SqliteDatabase>::new());
    let service = test::init_service(app).await;

    let req = TestRequest::get().uri("/payments/history").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/payments/history").insert_header(("X-User-Id", "dave")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["payments"], json!([]));
}

#[actix_web::test]
async fn plan_table_is_public() {
    let app = App::new().service(PlansRoute::new());
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/payments/plans").to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["code"], "monthly");
    assert_eq!(plans[2]["days"], 365);
}

#[actix_web::test]
async fn create_payment_rejects_anonymous_and_unsupported_gateways() {
    let (db, _guard) = test_db().await;
    seed_user(&db, "frank").await;
    let api = PaymentFlowApi::new(db, EventProducers::default());
    let gateway = PagSeguroApi::new(PagSeguroConfig::default()).unwrap();
    let app = App::new()
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(gateway))
        .app_data(web::Data::new(test_config()))
        .service(CreatePaymentRoute::<SqliteDatabase>::new());
    let service = test::init_service(app).await;

    let req = TestRequest::post().uri("/payments/create").set_json(json!({"plan": "monthly"})).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/payments/create")
        .insert_header(("X-User-Id", "frank"))
        .set_json(json!({"plan": "monthly", "gateway": "stripe"}))
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn health_check() {
    let app = App::new().service(health);
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}
