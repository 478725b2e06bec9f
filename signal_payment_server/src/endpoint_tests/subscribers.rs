use actix_web::{
    dev::ServiceResponse,
    http::StatusCode,
    test::{self, TestRequest},
    web,
    App,
};
use serde_json::{json, Value};
use signal_payment_engine::{events::EventProducers, PaymentFlowApi, SqliteDatabase, SubscriberApi};

use super::helpers::{seed_user, test_config, test_db, TEST_ADMIN_KEY};
use crate::routes::{
    DeleteSubscriberRoute,
    ExtendSubscriptionRoute,
    GetSubscriberRoute,
    ListSubscribersRoute,
    RegisterSubscriberRoute,
    UpdateSubscriberRoute,
};

macro_rules! subscriber_app {
    ($db:expr) => {{
        let app = App::new()
            .app_data(web::Data::new(SubscriberApi::new($db.clone())))
            .app_data(web::Data::new(PaymentFlowApi::new($db.clone(), EventProducers::default())))
            .app_data(web::Data::new(test_config()))
            .service(ListSubscribersRoute::<SqliteDatabase>::new())
            .service(RegisterSubscriberRoute::<SqliteDatabase>::new())
            .service(GetSubscriberRoute::<SqliteDatabase>::new())
            .service(UpdateSubscriberRoute::<SqliteDatabase>::new())
            .service(DeleteSubscriberRoute::<SqliteDatabase>::new())
            .service(ExtendSubscriptionRoute::<SqliteDatabase>::new());
        test::init_service(app).await
    }};
}

fn admin(req: TestRequest) -> TestRequest {
    req.insert_header(("X-Admin-Key", TEST_ADMIN_KEY))
}

async fn json_body(res: ServiceResponse) -> Value {
    test::read_body_json(res).await
}

#[actix_web::test]
async fn subscriber_routes_require_the_admin_key() {
    let (db, _guard) = test_db().await;
    let service = subscriber_app!(db);
    let req = TestRequest::get().uri("/webhooks").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/webhooks").insert_header(("X-Admin-Key", "wrong-key")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn full_subscriber_lifecycle() {
    let (db, _guard) = test_db().await;
    let service = subscriber_app!(db);

    // Create
    let body = json!({"name": "billing-sync", "url": "https://example.com/hook", "secret": "whsec_1",
        "events": ["payment.completed"]});
    let req = admin(TestRequest::post().uri("/webhooks")).set_json(&body).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = json_body(res).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["is_active"], json!(true));
    assert_eq!(created["total_calls"], json!(0));

    // List and fetch
    let req = admin(TestRequest::get().uri("/webhooks")).to_request();
    let listed = json_body(test::call_service(&service, req).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let req = admin(TestRequest::get().uri(&format!("/webhooks/{id}"))).to_request();
    let fetched = json_body(test::call_service(&service, req).await).await;
    assert_eq!(fetched["name"], "billing-sync");

    // Patch
    let patch = json!({"is_active": false, "events": ["signal.created"]});
    let req = admin(TestRequest::put().uri(&format!("/webhooks/{id}"))).set_json(&patch).to_request();
    let updated = json_body(test::call_service(&service, req).await).await;
    assert_eq!(updated["is_active"], json!(false));
    assert_eq!(updated["events"], json!(["signal.created"]));
    assert_eq!(updated["name"], "billing-sync");

    // Delete, then the record is gone
    let req = admin(TestRequest::delete().uri(&format!("/webhooks/{id}"))).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let req = admin(TestRequest::get().uri(&format!("/webhooks/{id}"))).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn subscriber_validation_rejects_bad_input() {
    let (db, _guard) = test_db().await;
    let service = subscriber_app!(db);

    let body = json!({"name": "  ", "url": "https://example.com/hook"});
    let req = admin(TestRequest::post().uri("/webhooks")).set_json(&body).to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);

    let body = json!({"name": "bad-url", "url": "not a url"});
    let req = admin(TestRequest::post().uri("/webhooks")).set_json(&body).to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);

    let body = json!({"name": "bad-scheme", "url": "ftp://example.com/hook"});
    let req = admin(TestRequest::post().uri("/webhooks")).set_json(&body).to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);

    let patch = json!({"url": "nope"});
    let req = admin(TestRequest::put().uri("/webhooks/1")).set_json(&patch).to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_can_extend_a_subscription() {
    let (db, _guard) = test_db().await;
    seed_user(&db, "erin").await;
    let service = subscriber_app!(db);

    let req = admin(TestRequest::post().uri("/admin/users/erin/subscription"))
        .set_json(json!({"days": 14}))
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let user = json_body(res).await;
    assert!(user["subscription_ends_at"].is_string());

    let req = admin(TestRequest::post().uri("/admin/users/ghost/subscription"))
        .set_json(json!({"days": 14}))
        .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NOT_FOUND);

    let req = admin(TestRequest::post().uri("/admin/users/erin/subscription"))
        .set_json(json!({"days": 0}))
        .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), StatusCode::BAD_REQUEST);
}
