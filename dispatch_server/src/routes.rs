//! Request handler definitions
//!
//! Every handler is a thin shell around one engine call: pull the actor and payload out of the request, call the
//! engine, and serialize the result. Engine errors are converted into HTTP responses by
//! [`ServerError`](crate::errors::ServerError).
//!
//! Handlers must never block the worker thread. Anything that waits (the database, the geo index) is awaited:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use dispatch_engine::{
    db_types::Coordinates,
    order_objects::{NewOrderRequest, OrderQueryFilter},
    traits::{DeliveryDatabase, GeoIndex, OrderManagement},
    OrderFlowApi,
    OrderFlowError,
};
use log::*;

use crate::{
    auth::RequestActor,
    data_objects::{
        AssignRiderRequest,
        AvailabilityRequest,
        CancelRequest,
        LocationUpdate,
        PageParams,
        RateOrderRequest,
        RejectionResult,
        RiderOrdersParams,
        StatusUpdateRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
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

type Api<B, G> = web::Data<OrderFlowApi<B, G>>;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl DeliveryDatabase, GeoIndex);
/// A student places an order. Responds with the priced order and its line items.
pub async fn create_order<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    body: web::Json<NewOrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    debug!("💻️ New order request from {}", actor.actor());
    let details = api.create_order(actor.actor(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(details))
}

route!(my_orders => Get "/orders" impl DeliveryDatabase, GeoIndex);
/// The caller's own orders, newest first. Admins see every order.
pub async fn my_orders<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let query = OrderQueryFilter::default().with_page_number(params.page, params.limit).map_err(OrderFlowError::from)?;
    let orders = api.search_orders(actor.actor(), query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(available_orders => Get "/orders/available" impl DeliveryDatabase, GeoIndex);
pub async fn available_orders<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let orders = api.dispatcher().available_orders(rider_id, params.page, params.limit).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl DeliveryDatabase, GeoIndex);
pub async fn order_by_id<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let details = api.get_order(actor.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

route!(order_timeline => Get "/orders/{id}/timeline" impl DeliveryDatabase, GeoIndex);
pub async fn order_timeline<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let events = api.order_timeline(actor.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

route!(update_status => Post "/orders/{id}/status" impl DeliveryDatabase, GeoIndex);
/// Moves an order along its lifecycle. Who may set which status is decided by the engine.
pub async fn update_status<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let order_id = path.into_inner();
    let StatusUpdateRequest { status, reason } = body.into_inner();
    info!("💻️ {} requests order #{order_id} -> {status}", actor.actor());
    let order = api.transition(actor.actor(), order_id, status, reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl DeliveryDatabase, GeoIndex);
pub async fn cancel_order<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
    body: Option<web::Json<CancelRequest>>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let reason = body.map(|b| b.into_inner()).unwrap_or_default().reason;
    let order = api.cancel_order(actor.actor(), path.into_inner(), reason).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(claim_order => Post "/orders/{id}/claim" impl DeliveryDatabase, GeoIndex);
pub async fn claim_order<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let order = api.dispatcher().claim_order(rider_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(reject_order => Post "/orders/{id}/reject" impl DeliveryDatabase, GeoIndex);
/// The assigned rider hands an order back. The order is offered to one other rider before the admins are alerted.
pub async fn reject_order<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let order_id = path.into_inner();
    let reassigned_to = api.dispatcher().handle_rejection(rider_id, order_id).await?;
    let order = api
        .db()
        .fetch_order(order_id)
        .await?
        .ok_or_else(|| ServerError::BackendError(format!("Order #{order_id} disappeared after it was handed back")))?;
    Ok(HttpResponse::Ok().json(RejectionResult { order, reassigned_to }))
}

route!(assign_rider => Post "/orders/{id}/assign" impl DeliveryDatabase, GeoIndex);
pub async fn assign_rider<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
    body: web::Json<AssignRiderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let order = api.dispatcher().admin_assign_rider(actor.actor(), path.into_inner(), body.rider_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(rate_order => Post "/orders/{id}/rate" impl DeliveryDatabase, GeoIndex);
pub async fn rate_order<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    path: web::Path<i64>,
    body: web::Json<RateOrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let RateOrderRequest { rating, comment } = body.into_inner();
    let review = api.rate_order(actor.actor(), path.into_inner(), rating, comment).await?;
    Ok(HttpResponse::Created().json(review))
}

//----------------------------------------------   Riders  ----------------------------------------------------
route!(update_location => Post "/riders/me/location" impl DeliveryDatabase, GeoIndex);
pub async fn update_location<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    body: web::Json<LocationUpdate>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let rider = api.dispatcher().update_location(rider_id, Coordinates::new(body.lat, body.lng)).await?;
    Ok(HttpResponse::Ok().json(rider))
}

route!(update_availability => Post "/riders/me/availability" impl DeliveryDatabase, GeoIndex);
pub async fn update_availability<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    body: web::Json<AvailabilityRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let rider = api.dispatcher().set_availability(rider_id, body.available).await?;
    Ok(HttpResponse::Ok().json(rider))
}

route!(toggle_availability => Post "/riders/me/availability/toggle" impl DeliveryDatabase, GeoIndex);
pub async fn toggle_availability<B, G>(actor: RequestActor, api: Api<B, G>) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let rider = api.dispatcher().toggle_availability(rider_id).await?;
    Ok(HttpResponse::Ok().json(rider))
}

route!(rider_orders => Get "/riders/me/orders" impl DeliveryDatabase, GeoIndex);
pub async fn rider_orders<B, G>(
    actor: RequestActor,
    api: Api<B, G>,
    params: web::Query<RiderOrdersParams>,
) -> Result<HttpResponse, ServerError>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    let rider_id = actor.rider_id()?;
    let orders = api.dispatcher().rider_orders(rider_id, params.status).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Registers every route. `/orders/available` goes before `/orders/{id}` so that it is not read as an order id.
pub fn configure<B, G>(cfg: &mut web::ServiceConfig)
where
    B: DeliveryDatabase + 'static,
    G: GeoIndex + 'static,
{
    cfg.service(health)
        .service(CreateOrderRoute::<B, G>::new())
        .service(MyOrdersRoute::<B, G>::new())
        .service(AvailableOrdersRoute::<B, G>::new())
        .service(OrderByIdRoute::<B, G>::new())
        .service(OrderTimelineRoute::<B, G>::new())
        .service(UpdateStatusRoute::<B, G>::new())
        .service(CancelOrderRoute::<B, G>::new())
        .service(ClaimOrderRoute::<B, G>::new())
        .service(RejectOrderRoute::<B, G>::new())
        .service(AssignRiderRoute::<B, G>::new())
        .service(RateOrderRoute::<B, G>::new())
        .service(UpdateLocationRoute::<B, G>::new())
        .service(UpdateAvailabilityRoute::<B, G>::new())
        .service(ToggleAvailabilityRoute::<B, G>::new())
        .service(RiderOrdersRoute::<B, G>::new());
}
