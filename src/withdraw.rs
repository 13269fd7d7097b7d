// src/withdraw.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{error, info, warn};
use mongodb::bson::{doc, to_bson, Document};
use mongodb::options::ReturnDocument;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{AuthAdmin, AuthSeller};
use crate::db::{collect_all, newest_first, timestamp};
use crate::error::{ApiError, ApiResult};
use crate::mailer::{withdraw_requested_email, withdraw_settled_email};
use crate::models::{new_id, validate_amount, Transaction, Withdraw, WithdrawStatus};
use crate::shop_management::find_shop;

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleWithdrawRequest {
    pub seller_id: Option<String>,
}

fn payout_record(withdraw: &Withdraw) -> Transaction {
    Transaction {
        id: new_id(),
        amount: withdraw.amount,
        status: "succeed".into(),
        updated_at: Utc::now(),
    }
}

/// Filter and update holding `amount` from a shop; matches nothing when the
/// balance is short, so two requests can not both spend it.
fn debit(shop_id: &str, amount: f64) -> (Document, Document) {
    (
        doc! { "_id": shop_id, "availableBalance": { "$gte": amount } },
        doc! { "$inc": { "availableBalance": -amount } },
    )
}

/// POST /withdraw/create-withdraw-request
/// Debits the seller first; the request is only stored once the money is held.
pub async fn create_withdraw_request(
    data: web::Data<AppState>,
    seller: AuthSeller,
    body: web::Json<WithdrawRequest>,
) -> ApiResult<HttpResponse> {
    let amount = body.amount;
    let shop = find_shop(&data, &seller.0.id).await?;
    validate_amount(amount, shop.available_balance)?;

    let shops = data.mongodb.shops();
    let (filter, update) = debit(&shop.id, amount);
    let debited = shops
        .find_one_and_update(filter, update)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::bad_request("You can't withdraw this amount!"))?;

    let withdraw = Withdraw {
        id: new_id(),
        seller: debited.without_password(),
        amount,
        status: WithdrawStatus::Processing,
        created_at: Utc::now(),
        updated_at: None,
    };
    if let Err(e) = data.mongodb.withdraws().insert_one(&withdraw).await {
        if let Err(refund) = shops
            .update_one(
                doc! { "_id": &shop.id },
                doc! { "$inc": { "availableBalance": amount } },
            )
            .await
        {
            error!("failed to return {} to shop {}: {}", amount, shop.id, refund);
        }
        return Err(e.into());
    }
    info!("shop {} requested withdrawal of {}", shop.id, amount);

    if let Err(e) = data
        .mailer
        .send(
            &withdraw.seller.email,
            "Withdraw Request",
            &withdraw_requested_email(&withdraw.seller.name, amount),
        )
        .await
    {
        warn!("withdraw {} stored but seller was not emailed: {}", withdraw.id, e);
    }

    Ok(HttpResponse::Created().json(json!({ "success": true, "withdraw": withdraw })))
}

/// GET /withdraw/get-all-withdraw-request
pub async fn get_all_withdraw_requests(
    data: web::Data<AppState>,
    _admin: AuthAdmin,
) -> ApiResult<HttpResponse> {
    let cursor = data.mongodb.withdraws().find(doc! {}).await?;
    let mut withdraws = collect_all(cursor).await?;
    newest_first(&mut withdraws, |w| w.created_at);
    Ok(HttpResponse::Created().json(json!({ "success": true, "withdraws": withdraws })))
}

/// PUT /withdraw/update-withdraw-request/{id}
/// Settles a pending request and records the payout on the seller.
pub async fn update_withdraw_request(
    data: web::Data<AppState>,
    admin: AuthAdmin,
    withdraw_id: web::Path<String>,
    body: web::Json<SettleWithdrawRequest>,
) -> ApiResult<HttpResponse> {
    let withdraws = data.mongodb.withdraws();
    let mut withdraw = withdraws
        .find_one(doc! { "_id": withdraw_id.as_str() })
        .await?
        .ok_or_else(|| ApiError::not_found("Withdraw request not found with this id"))?;

    if let Some(seller_id) = &body.seller_id {
        if *seller_id != withdraw.seller.id {
            return Err(ApiError::bad_request(
                "Seller does not match this withdraw request",
            ));
        }
    }

    let settled = withdraws
        .update_one(
            doc! {
                "_id": &withdraw.id,
                "status": to_bson(&WithdrawStatus::Processing)?,
            },
            doc! { "$set": {
                "status": to_bson(&WithdrawStatus::Succeed)?,
                "updatedAt": timestamp(),
            } },
        )
        .await?;
    if settled.matched_count == 0 {
        return Err(ApiError::bad_request("Withdraw request is already settled"));
    }
    withdraw.status = WithdrawStatus::Succeed;
    withdraw.updated_at = Some(Utc::now());

    let transaction = payout_record(&withdraw);
    let seller = data
        .mongodb
        .shops()
        .find_one_and_update(
            doc! { "_id": &withdraw.seller.id },
            doc! { "$push": { "transections": to_bson(&transaction)? } },
        )
        .await?;
    info!(
        "admin {} settled withdraw {} of {}",
        admin.0.id, withdraw.id, withdraw.amount
    );

    match seller {
        Some(seller) => {
            if let Err(e) = data
                .mailer
                .send(
                    &seller.email,
                    "Payment confirmation",
                    &withdraw_settled_email(&seller.name, withdraw.amount),
                )
                .await
            {
                warn!("withdraw {} settled but seller was not emailed: {}", withdraw.id, e);
            }
        }
        None => warn!(
            "withdraw {} settled for missing shop {}",
            withdraw.id, withdraw.seller.id
        ),
    }

    Ok(HttpResponse::Created().json(json!({ "success": true, "withdraw": withdraw })))
}
