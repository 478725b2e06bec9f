use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use signal_payment_engine::{
    dispatch::{DispatchConfig, WebhookDispatcher},
    events::{EventHandlers, EventHooks},
    PaymentFlowApi,
    SqliteDatabase,
    SubscriberApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::pagseguro::PagSeguroApi,
    routes::{
        health,
        CreatePaymentRoute,
        DeleteSubscriberRoute,
        ExtendSubscriptionRoute,
        GetSubscriberRoute,
        IncomingPaymentRoute,
        ListSubscribersRoute,
        PaymentHistoryRoute,
        PlansRoute,
        RegisterSubscriberRoute,
        TestSubscriberRoute,
        UpdateSubscriberRoute,
    },
};

pub const PAYMENT_EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the payment-completed hook to the webhook dispatcher, so that every successful reconciliation fans out a
/// `payment.completed` event to the registered subscribers.
pub fn create_payment_event_handlers(dispatcher: WebhookDispatcher<SqliteDatabase>) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_payment_completed(move |ev| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move {
            let payment_id = ev.payment.id;
            let data = match serde_json::to_value(&ev) {
                Ok(data) => data,
                Err(e) => {
                    error!("📬️ Could not serialize the completed payment #{payment_id} for dispatch. {e}");
                    return;
                },
            };
            match dispatcher.dispatch_event("payment.completed", data).await {
                Ok(reports) => {
                    debug!("📬️ Payment #{payment_id} fanned out to {} subscriber(s)", reports.len());
                },
                Err(e) => error!("📬️ Could not dispatch webhooks for payment #{payment_id}. {e}"),
            }
        })
    });
    EventHandlers::new(PAYMENT_EVENT_BUFFER_SIZE, hooks)
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let dispatch_config =
        DispatchConfig { timeout: config.webhook_timeout, user_agent: config.webhook_user_agent.clone() };
    let dispatcher = WebhookDispatcher::new(db.clone(), dispatch_config)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_payment_event_handlers(dispatcher.clone());
    let producers = handlers.producers();
    tokio::spawn(async move {
        handlers.start_handlers().await;
    });
    let pagseguro = PagSeguroApi::new(config.pagseguro.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let payments_api = PaymentFlowApi::new(db.clone(), producers.clone());
        let subscribers_api = SubscriberApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sps::access_log"))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(subscribers_api))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(pagseguro.clone()))
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(IncomingPaymentRoute::<SqliteDatabase, PagSeguroApi>::new())
            .service(CreatePaymentRoute::<SqliteDatabase>::new())
            .service(PaymentHistoryRoute::<SqliteDatabase>::new())
            .service(PlansRoute::new())
            .service(ListSubscribersRoute::<SqliteDatabase>::new())
            .service(RegisterSubscriberRoute::<SqliteDatabase>::new())
            .service(GetSubscriberRoute::<SqliteDatabase>::new())
            .service(UpdateSubscriberRoute::<SqliteDatabase>::new())
            .service(DeleteSubscriberRoute::<SqliteDatabase>::new())
            .service(TestSubscriberRoute::<SqliteDatabase>::new())
            .service(ExtendSubscriptionRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
