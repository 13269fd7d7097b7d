// src/order.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{error, info, warn};
use mongodb::bson::{doc, Document};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::auth::{AuthAdmin, AuthSeller, AuthUser};
use crate::db::{collect_all, newest_first, timestamp};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    allocate_total, is_fulfilment_status, new_id, order_status, seller_payout,
    split_cart_by_shop, transition, CartItem, Order, PaymentInfo, StatusEffect,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub cart: Vec<CartItem>,
    pub shipping_address: Value,
    pub user: Value,
    pub total_price: f64,
    #[serde(default)]
    pub payment_info: PaymentInfo,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Turns one checkout into an order per shop. Each order carries the share of
/// the paid total that matches its subtotal.
fn build_orders(body: CreateOrderRequest, buyer_id: &str) -> ApiResult<Vec<Order>> {
    if body.cart.is_empty() {
        return Err(ApiError::bad_request("Your cart is empty"));
    }
    if body.cart.iter().any(|item| item.qty <= 0) {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }
    if !body.total_price.is_finite() || body.total_price < 0.0 {
        return Err(ApiError::bad_request("Please enter a valid total price"));
    }

    let mut user = body.user;
    match user.as_object_mut() {
        Some(snapshot) => {
            snapshot.insert("_id".into(), Value::String(buyer_id.to_owned()));
        }
        None => user = json!({ "_id": buyer_id }),
    }

    let shops = split_cart_by_shop(body.cart);
    let subtotals: Vec<f64> = shops
        .values()
        .map(|items| items.iter().map(CartItem::line_total).sum())
        .collect();
    let totals = allocate_total(body.total_price, &subtotals);

    let now = Utc::now();
    Ok(shops
        .into_values()
        .zip(totals)
        .map(|(cart, total_price)| Order {
            id: new_id(),
            cart,
            shipping_address: body.shipping_address.clone(),
            user: user.clone(),
            total_price,
            status: order_status::PROCESSING.to_owned(),
            payment_info: body.payment_info.clone(),
            paid_at: now,
            delivered_at: None,
            created_at: now,
        })
        .collect())
}

fn placed_by(order: &Order, user_id: &str) -> bool {
    order.user.get("_id").and_then(Value::as_str) == Some(user_id)
}

async fn find_order(data: &AppState, order_id: &str) -> ApiResult<Order> {
    data.mongodb
        .orders()
        .find_one(doc! { "_id": order_id })
        .await?
        .ok_or_else(|| ApiError::bad_request("Order not found with this id"))
}

fn ensure_fulfilled_by(order: &Order, seller: &AuthSeller) -> ApiResult<()> {
    if order.shop_id() != Some(seller.0.id.as_str()) {
        return Err(ApiError::Forbidden("This order belongs to another shop".into()));
    }
    Ok(())
}

/// Filter and update taking one cart line off the shelf; never below zero.
fn take_stock(item: &CartItem) -> (Document, Document) {
    let taken = -item.qty;
    (
        doc! { "_id": &item.id, "stock": { "$gte": item.qty } },
        doc! { "$inc": { "stock": taken, "sold_out": item.qty } },
    )
}

/// Filter and update putting one cart line back on the shelf.
fn return_stock(item: &CartItem) -> (Document, Document) {
    let returned = -item.qty;
    (
        doc! { "_id": &item.id },
        doc! { "$inc": { "stock": item.qty, "sold_out": returned } },
    )
}

fn delivery_fields() -> Document {
    doc! { "deliveredAt": timestamp(), "paymentInfo.status": "Succeeded" }
}

/// Takes every line out of stock, or none of them.
async fn ship_items(data: &AppState, cart: &[CartItem]) -> ApiResult<()> {
    let products = data.mongodb.products();
    let mut shipped: Vec<&CartItem> = Vec::with_capacity(cart.len());

    for item in cart {
        let (filter, update) = take_stock(item);
        match products.update_one(filter, update).await {
            Ok(result) if result.matched_count == 1 => shipped.push(item),
            Ok(_) => {
                restock(data, shipped).await;
                return Err(ApiError::bad_request(format!(
                    "Not enough stock left for {}",
                    item.name
                )));
            }
            Err(e) => {
                restock(data, shipped).await;
                return Err(e.into());
            }
        }
    }
    Ok(())
}

/// Puts order lines back on the shelf. Failures are logged; the caller has
/// already committed to the status change.
async fn restock<'a>(data: &AppState, items: impl IntoIterator<Item = &'a CartItem>) {
    let products = data.mongodb.products();
    for item in items {
        let (filter, update) = return_stock(item);
        match products.update_one(filter, update).await {
            Ok(result) if result.matched_count == 0 => {
                warn!("product {} vanished before it could be restocked", item.id)
            }
            Ok(_) => {}
            Err(e) => error!("failed to restock product {}: {}", item.id, e),
        }
    }
}

/// Writes `to` only while the order still has the status it was read with,
/// so each transition (and its stock or payout move) happens once.
async fn flip_status(data: &AppState, order: &Order, to: &str, mut set: Document) -> ApiResult<()> {
    set.insert("status", to);
    let result = data
        .mongodb
        .orders()
        .update_one(
            doc! { "_id": &order.id, "status": &order.status },
            doc! { "$set": set },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(ApiError::bad_request(
            "Order status was changed meanwhile, please reload",
        ));
    }
    Ok(())
}

/// Credits the shop for an order already flipped to delivered. When the
/// credit fails the delivery is undone, so the seller can retry it.
async fn pay_seller(data: &AppState, order: &Order, shop_id: &str) -> ApiResult<f64> {
    let payout = seller_payout(order.total_price);
    let credited = data
        .mongodb
        .shops()
        .update_one(
            doc! { "_id": shop_id },
            doc! { "$inc": { "availableBalance": payout } },
        )
        .await;
    if let Ok(result) = &credited {
        if result.matched_count == 1 {
            return Ok(payout);
        }
    }

    let undone = data
        .mongodb
        .orders()
        .update_one(
            doc! { "_id": &order.id, "status": order_status::DELIVERED },
            doc! {
                "$set": {
                    "status": &order.status,
                    "paymentInfo.status": order.payment_info.status.clone(),
                },
                "$unset": { "deliveredAt": "" },
            },
        )
        .await;
    match undone {
        Ok(result) if result.matched_count == 1 => {
            warn!("payout for order {} failed, delivery undone", order.id)
        }
        Ok(_) => error!(
            "order {} is delivered but shop {} was not paid {:.2}",
            order.id, shop_id, payout
        ),
        Err(e) => error!(
            "order {} is delivered but shop {} was not paid {:.2}: {}",
            order.id, shop_id, payout, e
        ),
    }

    match credited {
        Err(e) => Err(e.into()),
        Ok(_) => Err(ApiError::bad_request("Shop doesn't exists")),
    }
}

/// POST /order/create-order
pub async fn create_order(
    data: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<CreateOrderRequest>,
) -> ApiResult<HttpResponse> {
    let orders = build_orders(body.into_inner(), &auth.0.id)?;
    data.mongodb.orders().insert_many(&orders).await?;
    info!("user {} placed {} order(s)", auth.0.id, orders.len());

    Ok(HttpResponse::Created().json(json!({ "success": true, "orders": orders })))
}

/// GET /order/get-all-orders/{user_id}
pub async fn get_user_orders(
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let cursor = data
        .mongodb
        .orders()
        .find(doc! { "user._id": user_id.as_str() })
        .await?;
    let mut orders = collect_all(cursor).await?;
    newest_first(&mut orders, |o| o.created_at);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

/// GET /order/get-seller-all-orders/{shop_id}
pub async fn get_seller_orders(
    data: web::Data<AppState>,
    shop_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let cursor = data
        .mongodb
        .orders()
        .find(doc! { "cart.shopId": shop_id.as_str() })
        .await?;
    let mut orders = collect_all(cursor).await?;
    newest_first(&mut orders, |o| o.created_at);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "orders": orders })))
}

/// PUT /order/update-order-status/{id}
pub async fn update_order_status(
    data: web::Data<AppState>,
    seller: AuthSeller,
    order_id: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let StatusRequest { status } = body.into_inner();
    if !is_fulfilment_status(&status) {
        return Err(ApiError::bad_request(format!(
            "{status} is not a delivery status"
        )));
    }
    let mut order = find_order(&data, &order_id).await?;
    ensure_fulfilled_by(&order, &seller)?;

    match transition(&order.status, &status)? {
        StatusEffect::TakeStock => {
            ship_items(&data, &order.cart).await?;
            if let Err(e) = flip_status(&data, &order, &status, Document::new()).await {
                restock(&data, &order.cart).await;
                return Err(e);
            }
        }
        StatusEffect::PaySeller => {
            flip_status(&data, &order, &status, delivery_fields()).await?;
            let payout = pay_seller(&data, &order, &seller.0.id).await?;
            info!("shop {} credited {:.2} for order {}", seller.0.id, payout, order.id);
            order.delivered_at = Some(Utc::now());
            order.payment_info.status = Some("Succeeded".into());
        }
        _ => flip_status(&data, &order, &status, Document::new()).await?,
    }
    info!("order {} moved from {} to {}", order.id, order.status, status);
    order.status = status;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

/// PUT /order/order-refund/{id}
/// Buyers may only ask for a refund of a delivered order.
pub async fn order_refund(
    data: web::Data<AppState>,
    auth: AuthUser,
    order_id: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let StatusRequest { status } = body.into_inner();
    if status != order_status::PROCESSING_REFUND {
        return Err(ApiError::bad_request(format!(
            "Refund requests must have status {}",
            order_status::PROCESSING_REFUND
        )));
    }
    let mut order = find_order(&data, &order_id).await?;
    if !placed_by(&order, &auth.0.id) {
        return Err(ApiError::Forbidden("This order belongs to another user".into()));
    }

    transition(&order.status, &status)?;
    flip_status(&data, &order, &status, Document::new()).await?;
    info!("user {} requested refund for order {}", auth.0.id, order.id);
    order.status = status;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "order": order,
        "message": "Order Refund Request successfully!",
    })))
}

/// PUT /order/order-refund-success/{id}
pub async fn order_refund_success(
    data: web::Data<AppState>,
    seller: AuthSeller,
    order_id: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let StatusRequest { status } = body.into_inner();
    if status != order_status::REFUND_SUCCESS {
        return Err(ApiError::bad_request(format!(
            "Refunds are settled with status {}",
            order_status::REFUND_SUCCESS
        )));
    }
    let order = find_order(&data, &order_id).await?;
    ensure_fulfilled_by(&order, &seller)?;

    let effect = transition(&order.status, &status)?;
    flip_status(&data, &order, &status, Document::new()).await?;
    if effect == StatusEffect::ReturnStock {
        restock(&data, &order.cart).await;
        info!("order {} refunded, stock returned", order.id);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Order Refund successfull!",
    })))
}

/// GET /order/admin-all-orders
pub async fn admin_all_orders(
    data: web::Data<AppState>,
    _admin: AuthAdmin,
) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.orders().find(doc! {}).await?;
    let mut orders = collect_all(cursor).await?;
    newest_first(&mut orders, |o| o.created_at);
    Ok(HttpResponse::Created().json(json!({ "success": true, "orders": orders })))
}
