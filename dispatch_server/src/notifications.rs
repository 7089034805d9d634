//! The notification inbox.
//!
//! The engine publishes a [`NotificationEvent`] whenever a student, vendor, rider or the admin channel needs to be
//! told about something. The server stores every one of them in the `notifications` table, where the
//! `/notifications` route picks them up for the caller.
use actix_web::{get, web, HttpResponse};
use dispatch_engine::{
    events::{EventHandlers, EventHooks, NotificationEvent},
    order_objects::Actor,
    SqliteDatabase,
};
use log::*;

use crate::{auth::RequestActor, errors::ServerError};

/// Creates the event handlers that write notifications to the database.
pub fn create_inbox_event_handlers(db: SqliteDatabase, buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_notification(move |ev: NotificationEvent| {
        let db = db.clone();
        Box::pin(async move {
            let recipient = ev.notification.recipient;
            match db.save_notification(&ev).await {
                Ok(record) => {
                    debug!("📬️ Notification #{} '{}' stored for {recipient}", record.id, record.title)
                },
                Err(e) => error!("📬️ Could not store notification '{}' for {recipient}. {e}", ev.notification.title),
            }
        })
    });
    EventHandlers::new(buffer_size, hooks)
}

/// The recipient key under which `actor`'s notifications are stored. Admins share one channel.
pub fn inbox_key(actor: &Actor) -> (&'static str, Option<i64>) {
    match *actor {
        Actor::Student(id) => ("student", Some(id)),
        Actor::Vendor(id) => ("vendor", Some(id)),
        Actor::Rider(id) => ("rider", Some(id)),
        Actor::Admin(_) => ("admin", None),
    }
}

#[get("/notifications")]
pub async fn my_notifications(
    actor: RequestActor,
    db: web::Data<SqliteDatabase>,
) -> Result<HttpResponse, ServerError> {
    let (kind, id) = inbox_key(actor.actor());
    let notifications = db.fetch_notifications(kind, id).await?;
    trace!("📬️ {} has {} notifications", actor.actor(), notifications.len());
    Ok(HttpResponse::Ok().json(notifications))
}
