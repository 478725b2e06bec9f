//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage backend and the gateway transaction source so that endpoint tests can swap
//! in stubs. Actix cannot register generic handlers directly, so each route gets a tiny `HttpServiceFactory` shim
//! via the `route!` macro.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde_json::{json, Value};
use signal_payment_engine::{
    db_types::{NewSubscriber, SubscriberPatch},
    dispatch::WebhookDispatcher,
    normalizers::{normalize, NormalizeOutcome, TransactionSource},
    plans::{plan_or_default, PLANS},
    traits::{PaymentGatewayDatabase, SubscriberStore},
    PaymentFlowApi,
    SubscriberApi,
};

use crate::{
    config::ServerConfig,
    data_objects::{
        CreatePaymentRequest,
        CreatePaymentResponse,
        DeliveryAttemptResult,
        ExtendSubscriptionRequest,
        JsonResponse,
        WebhookAck,
    },
    errors::ServerError,
    helpers::{require_admin, require_user},
    integrations::pagseguro::PagSeguroApi,
};

// Actix cannot handle generics in handlers registered with the attribute macros, so generic routes are registered
// manually through this shim.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------   Inbound notifications  -------------------------------------------
route!(incoming_payment => Post "/payments/webhook" impl PaymentGatewayDatabase, TransactionSource);
/// Route handler for inbound gateway notifications.
///
/// Every parseable notification is acknowledged with `{"received": true}`, whatever happens downstream; gateways
/// retry on anything else, and a broken notification will be just as broken on the fifth attempt. Only an
/// unparseable body earns a 400.
pub async fn incoming_payment<BPaymentGatewayDatabase, TTransactionSource>(
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<BPaymentGatewayDatabase>>,
    source: web::Data<TTransactionSource>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError>
where
    BPaymentGatewayDatabase: PaymentGatewayDatabase,
    TTransactionSource: TransactionSource,
{
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        debug!("💻️ Discarding notification with unparseable body. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    match normalize(&body, source.get_ref()).await {
        NormalizeOutcome::Matched(event) => {
            if let Err(e) = api.reconcile_approved_payment(&event, &config.currency).await {
                error!("💻️ Could not reconcile payment [{}]. {e}", event.gateway_payment_id);
            }
        },
        NormalizeOutcome::NotApplicable => {
            trace!("💻️ Notification did not describe an approved payment. Acknowledging.");
        },
        NormalizeOutcome::Invalid(reason) => {
            warn!("💻️ Discarding invalid gateway notification: {reason}");
        },
    }
    Ok(HttpResponse::Ok().json(WebhookAck::received()))
}

//----------------------------------------------   Payments  --------------------------------------------------
route!(create_payment => Post "/payments/create" impl PaymentGatewayDatabase);
/// Creates a pending payment for a plan and returns the gateway checkout URL.
pub async fn create_payment<BPaymentGatewayDatabase: PaymentGatewayDatabase>(
    req: HttpRequest,
    body: web::Json<CreatePaymentRequest>,
    api: web::Data<PaymentFlowApi<BPaymentGatewayDatabase>>,
    gateway: web::Data<PagSeguroApi>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let user_id = require_user(&req)?;
    let params = body.into_inner();
    if params.gateway != "pagseguro" {
        return Err(ServerError::InvalidRequestBody(format!("Gateway {} is not supported.", params.gateway)));
    }
    let user = api
        .fetch_user(&user_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} does not exist.")))?;
    let plan = plan_or_default(&params.plan);
    let payment = api.create_payment_for_plan(&user.id, plan, &config.currency, &params.gateway).await?;
    let checkout_url = gateway.create_checkout(&user.id, &user.name, &user.email, plan).await.map_err(|e| {
        warn!("💻️ Could not create a checkout for payment #{}. {e}", payment.id);
        ServerError::UpstreamGatewayError(e.to_string())
    })?;
    api.set_gateway_order_id(payment.id, &format!("INTERNAL-{}", payment.id)).await?;
    debug!("💻️ Payment #{} created for user [{}] on plan [{}]", payment.id, user.id, plan.code);
    Ok(HttpResponse::Ok().json(CreatePaymentResponse {
        payment_id: payment.id,
        plan: plan.code.to_string(),
        amount: plan.amount,
        checkout_url,
    }))
}

route!(payment_history => Get "/payments/history" impl PaymentGatewayDatabase);
pub async fn payment_history<BPaymentGatewayDatabase: PaymentGatewayDatabase>(
    req: HttpRequest,
    api: web::Data<PaymentFlowApi<BPaymentGatewayDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = require_user(&req)?;
    debug!("💻️ GET payment history for [{user_id}]");
    let payments = api.payment_history(&user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "payments": payments })))
}

route!(plans => Get "/payments/plans");
pub async fn plans() -> Result<HttpResponse, ServerError> {
    let plans = PLANS
        .iter()
        .map(|p| json!({"code": p.code, "name": p.name, "days": p.days, "amount": p.amount}))
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(json!({ "plans": plans })))
}

//----------------------------------------   Webhook subscribers  ---------------------------------------------
route!(list_subscribers => Get "/webhooks" impl SubscriberStore);
pub async fn list_subscribers<SSubscriberStore: SubscriberStore>(
    req: HttpRequest,
    api: web::Data<SubscriberApi<SSubscriberStore>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let subscribers = api.subscribers().await?;
    Ok(HttpResponse::Ok().json(subscribers))
}

route!(register_subscriber => Post "/webhooks" impl SubscriberStore);
pub async fn register_subscriber<SSubscriberStore: SubscriberStore>(
    req: HttpRequest,
    body: web::Json<NewSubscriber>,
    api: web::Data<SubscriberApi<SSubscriberStore>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let subscriber = body.into_inner();
    if subscriber.name.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("A subscriber name is required.".to_string()));
    }
    validate_endpoint_url(&subscriber.url)?;
    let subscriber = api.register(subscriber).await?;
    Ok(HttpResponse::Created().json(subscriber))
}

route!(get_subscriber => Get "/webhooks/{id}" impl SubscriberStore);
pub async fn get_subscriber<SSubscriberStore: SubscriberStore>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<SubscriberApi<SSubscriberStore>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let id = path.into_inner();
    let subscriber = api
        .subscriber(id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Webhook subscriber #{id} does not exist.")))?;
    Ok(HttpResponse::Ok().json(subscriber))
}

route!(update_subscriber => Put "/webhooks/{id}" impl SubscriberStore);
pub async fn update_subscriber<SSubscriberStore: SubscriberStore>(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<SubscriberPatch>,
    api: web::Data<SubscriberApi<SSubscriberStore>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let id = path.into_inner();
    let patch = body.into_inner();
    if let Some(url) = &patch.url {
        validate_endpoint_url(url)?;
    }
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(ServerError::InvalidRequestBody("A subscriber name cannot be empty.".to_string()));
        }
    }
    let subscriber = api
        .update(id, patch)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Webhook subscriber #{id} does not exist.")))?;
    Ok(HttpResponse::Ok().json(subscriber))
}

route!(delete_subscriber => Delete "/webhooks/{id}" impl SubscriberStore);
pub async fn delete_subscriber<SSubscriberStore: SubscriberStore>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<SubscriberApi<SSubscriberStore>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let id = path.into_inner();
    if !api.remove(id).await? {
        return Err(ServerError::NoRecordFound(format!("Webhook subscriber #{id} does not exist.")));
    }
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Webhook subscriber #{id} deleted."))))
}

route!(test_subscriber => Post "/webhooks/{id}/test" impl SubscriberStore);
/// Pushes a synthetic `signal.created` event through the real dispatcher at a single endpoint, so a newly
/// registered subscriber can be verified end to end, signature included.
pub async fn test_subscriber<SSubscriberStore: SubscriberStore>(
    req: HttpRequest,
    path: web::Path<i64>,
    api: web::Data<SubscriberApi<SSubscriberStore>>,
    dispatcher: web::Data<WebhookDispatcher<SSubscriberStore>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let id = path.into_inner();
    let subscriber = api
        .subscriber(id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Webhook subscriber #{id} does not exist.")))?;
    let data = json!({
        "test": true,
        "message": format!("Test delivery for subscriber [{}]", subscriber.name),
    });
    let report = dispatcher.deliver_to(&subscriber, "signal.created", data).await?;
    let delivered = !report.outcome.is_failure();
    let detail = match report.outcome {
        signal_payment_engine::dispatch::DeliveryOutcome::Delivered(status) => format!("HTTP {status}"),
        signal_payment_engine::dispatch::DeliveryOutcome::Failed(reason) => reason,
    };
    Ok(HttpResponse::Ok().json(DeliveryAttemptResult { subscriber_id: id, delivered, detail }))
}

//----------------------------------------------   Admin  -----------------------------------------------------
route!(extend_subscription => Post "/admin/users/{id}/subscription" impl PaymentGatewayDatabase);
pub async fn extend_subscription<BPaymentGatewayDatabase: PaymentGatewayDatabase>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ExtendSubscriptionRequest>,
    api: web::Data<PaymentFlowApi<BPaymentGatewayDatabase>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &config.admin_api_key)?;
    let user_id = path.into_inner();
    let days = body.into_inner().days;
    if days <= 0 {
        return Err(ServerError::InvalidRequestBody("The extension must be a positive number of days.".to_string()));
    }
    let user = api
        .extend_subscription(&user_id, days)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("User {user_id} does not exist.")))?;
    Ok(HttpResponse::Ok().json(user))
}

fn validate_endpoint_url(url: &str) -> Result<(), ServerError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ServerError::InvalidRequestBody(format!("{url} is not a valid URL. {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServerError::InvalidRequestBody("Webhook URLs must use http or https.".to_string()));
    }
    Ok(())
}
