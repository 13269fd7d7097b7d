// src/conversation.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::{AuthSeller, AuthUser, Principals};
use crate::db::{collect_all, timestamp};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, sort_by_activity, Conversation};
use crate::validation::require_fields;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub group_title: String,
    pub user_id: String,
    pub seller_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageRequest {
    pub last_message: String,
    pub last_message_id: String,
}

/// Loads a conversation the caller takes part in.
pub(crate) async fn member_conversation(
    data: &AppState,
    principals: &Principals,
    conversation_id: &str,
) -> ApiResult<Conversation> {
    let conversation = data
        .mongodb
        .conversations()
        .find_one(doc! { "_id": conversation_id })
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found with this id"))?;
    if !conversation.members.iter().any(|m| principals.holds(m)) {
        return Err(ApiError::Forbidden(
            "You are not a member of this conversation".into(),
        ));
    }
    Ok(conversation)
}

async fn conversations_of(data: &AppState, member: &str) -> ApiResult<Vec<Conversation>> {
    let cursor = data
        .mongodb
        .conversations()
        .find(doc! { "members": { "$in": [member] } })
        .await?;
    let mut conversations = collect_all(cursor).await?;
    sort_by_activity(&mut conversations);
    Ok(conversations)
}

/// POST /conversation/create-new-conversation
/// One thread per group title; asking again returns the existing thread.
pub async fn create_conversation(
    data: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<CreateConversationRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    require_fields(&[&body.group_title, &body.seller_id])?;
    if body.user_id != auth.0.id {
        return Err(ApiError::Forbidden(
            "You can only start conversations for yourself".into(),
        ));
    }

    let conversations = data.mongodb.conversations();
    if let Some(existing) = conversations
        .find_one(doc! { "groupTitle": &body.group_title })
        .await?
    {
        return Ok(HttpResponse::Created().json(json!({
            "success": true,
            "conversation": existing,
        })));
    }

    let now = Utc::now();
    let conversation = Conversation {
        id: new_id(),
        group_title: body.group_title,
        members: vec![body.user_id, body.seller_id],
        last_message: None,
        last_message_id: None,
        created_at: now,
        updated_at: now,
    };
    conversations.insert_one(&conversation).await?;
    info!("conversation {} opened", conversation.id);

    Ok(HttpResponse::Created().json(json!({ "success": true, "conversation": conversation })))
}

/// GET /conversation/get-all-conversation-seller/{id}
pub async fn get_seller_conversations(
    data: web::Data<AppState>,
    seller: AuthSeller,
    seller_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    if *seller_id != seller.0.id {
        return Err(ApiError::Forbidden("Conversations belong to another shop".into()));
    }
    let conversations = conversations_of(&data, &seller_id).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "conversations": conversations })))
}

/// GET /conversation/get-all-conversation-user/{id}
pub async fn get_user_conversations(
    data: web::Data<AppState>,
    auth: AuthUser,
    user_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    if *user_id != auth.0.id {
        return Err(ApiError::Forbidden("Conversations belong to another user".into()));
    }
    let conversations = conversations_of(&data, &user_id).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "conversations": conversations })))
}

/// PUT /conversation/update-last-message/{id}
pub async fn update_last_message(
    data: web::Data<AppState>,
    principals: Principals,
    conversation_id: web::Path<String>,
    body: web::Json<LastMessageRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let mut conversation = member_conversation(&data, &principals, &conversation_id).await?;

    data.mongodb
        .conversations()
        .update_one(
            doc! { "_id": &conversation.id },
            doc! { "$set": {
                "lastMessage": &body.last_message,
                "lastMessageId": &body.last_message_id,
                "updatedAt": timestamp(),
            } },
        )
        .await?;

    conversation.last_message = Some(body.last_message);
    conversation.last_message_id = Some(body.last_message_id);
    conversation.updated_at = Utc::now();
    Ok(HttpResponse::Created().json(json!({ "success": true, "conversation": conversation })))
}
