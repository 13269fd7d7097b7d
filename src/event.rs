// src/event.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::info;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{AuthAdmin, AuthSeller};
use crate::db::{collect_all, newest_first};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Event, EventStatus};
use crate::product::{check_pricing, listing_shop};
use crate::validation::require_fields;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "start_Date")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "Finish_Date")]
    pub finish_date: DateTime<Utc>,
    pub tags: Option<String>,
    pub original_price: Option<f64>,
    pub discount_price: f64,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub shop_id: String,
}

fn refreshed(mut events: Vec<Event>) -> Vec<Event> {
    let now = Utc::now();
    for event in &mut events {
        event.refresh_status(now);
    }
    events
}

/// POST /event/create-event
pub async fn create_event(
    data: web::Data<AppState>,
    seller: AuthSeller,
    body: web::Json<CreateEventRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    require_fields(&[&body.name, &body.description, &body.category])?;
    check_pricing(body.discount_price, body.stock)?;
    if body.finish_date < body.start_date {
        return Err(ApiError::bad_request(
            "Event end date can not be before its start date",
        ));
    }
    let shop = listing_shop(&data, &seller, &body.shop_id).await?;

    let event = Event {
        id: new_id(),
        name: body.name,
        description: body.description,
        category: body.category,
        start_date: body.start_date,
        finish_date: body.finish_date,
        status: EventStatus::Running,
        tags: body.tags,
        original_price: body.original_price,
        discount_price: body.discount_price,
        stock: body.stock,
        images: body.images,
        shop_id: shop.id.clone(),
        shop,
        sold_out: 0,
        created_at: Utc::now(),
    };
    data.mongodb.events().insert_one(&event).await?;
    info!("event {} created by shop {}", event.id, event.shop_id);

    Ok(HttpResponse::Created().json(json!({ "success": true, "event": event })))
}

/// GET /event/get-all-events
pub async fn get_all_events(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.events().find(doc! {}).await?;
    let events = refreshed(collect_all(cursor).await?);
    Ok(HttpResponse::Created().json(json!({ "success": true, "events": events })))
}

/// GET /event/get-all-events/{shop_id}
pub async fn get_shop_events(
    data: web::Data<AppState>,
    shop_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let cursor = data
        .mongodb
        .events()
        .find(doc! { "shopId": shop_id.as_str() })
        .await?;
    let events = refreshed(collect_all(cursor).await?);
    Ok(HttpResponse::Created().json(json!({ "success": true, "events": events })))
}

/// DELETE /event/delete-shop-event/{id}
pub async fn delete_shop_event(
    data: web::Data<AppState>,
    seller: AuthSeller,
    event_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let events = data.mongodb.events();
    let event = events
        .find_one(doc! { "_id": event_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::not_found("Event is not found with this id"))?;

    if event.shop_id != seller.0.id {
        return Err(ApiError::Forbidden("This event belongs to another shop".into()));
    }

    events.delete_one(doc! { "_id": &event.id }).await?;
    info!("event {} deleted by shop {}", event.id, seller.0.id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Event Deleted successfully!",
    })))
}

/// GET /event/admin-all-events
pub async fn admin_all_events(
    data: web::Data<AppState>,
    _admin: AuthAdmin,
) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.events().find(doc! {}).await?;
    let mut events = refreshed(collect_all(cursor).await?);
    newest_first(&mut events, |e| e.created_at);
    Ok(HttpResponse::Created().json(json!({ "success": true, "events": events })))
}
