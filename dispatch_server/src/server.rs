use std::time::Duration;

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use dispatch_engine::{InMemoryGeoIndex, OrderFlowApi, SqliteDatabase};
use log::*;

use crate::{config::ServerConfig, errors::ServerError, notifications, routes};

pub type DispatchApi = OrderFlowApi<SqliteDatabase, InMemoryGeoIndex>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = notifications::create_inbox_event_handlers(db.clone(), config.event_buffer_size);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = OrderFlowApi::new(db.clone(), InMemoryGeoIndex::new(), producers, config.platform.clone());
    let indexed = api.dispatcher().rebuild_geo_index().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("📍️ {indexed} available riders loaded into the geo index");
    let srv = create_server_instance(config, web::Data::new(api), web::Data::new(db))?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    api: web::Data<DispatchApi>,
    db: web::Data<SqliteDatabase>,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dispatch::access_log"))
            .app_data(api.clone())
            .app_data(db.clone())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .service(notifications::my_notifications)
            .configure(routes::configure::<SqliteDatabase, InMemoryGeoIndex>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed bodies, query strings and paths are reported in the same JSON shape as engine errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|e: JsonPayloadError, _req: &HttpRequest| ServerError::InvalidRequestBody(e.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|e: QueryPayloadError, _req: &HttpRequest| ServerError::InvalidRequestBody(e.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|e: PathError, _req: &HttpRequest| ServerError::InvalidRequestPath(e.to_string()).into())
}
