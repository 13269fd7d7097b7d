// src/message.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::debug;
use mongodb::bson::doc;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::Principals;
use crate::conversation::member_conversation;
use crate::db::collect_all;
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Message};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub conversation_id: String,
    pub sender: String,
    pub text: Option<String>,
    pub images: Option<String>,
}

fn build_message(body: CreateMessageRequest) -> ApiResult<Message> {
    let text = body.text.filter(|t| !t.trim().is_empty());
    let images = body.images.filter(|i| !i.trim().is_empty());
    if text.is_none() && images.is_none() {
        return Err(ApiError::bad_request("Message can not be empty"));
    }
    Ok(Message {
        id: new_id(),
        conversation_id: body.conversation_id,
        sender: body.sender,
        text,
        images,
        created_at: Utc::now(),
    })
}

fn oldest_first(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.created_at);
}

/// POST /message/create-new-message
pub async fn create_message(
    data: web::Data<AppState>,
    principals: Principals,
    body: web::Json<CreateMessageRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    if !principals.holds(&body.sender) {
        return Err(ApiError::Forbidden("You can only send messages as yourself".into()));
    }
    member_conversation(&data, &principals, &body.conversation_id).await?;

    let message = build_message(body)?;
    data.mongodb.messages().insert_one(&message).await?;
    debug!("message {} stored in {}", message.id, message.conversation_id);

    Ok(HttpResponse::Created().json(json!({ "success": true, "message": message })))
}

/// GET /message/get-all-messages/{id}
pub async fn get_messages(
    data: web::Data<AppState>,
    principals: Principals,
    conversation_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    member_conversation(&data, &principals, &conversation_id).await?;

    let cursor = data
        .mongodb
        .messages()
        .find(doc! { "conversationId": conversation_id.as_str() })
        .await?;
    let mut messages = collect_all(cursor).await?;
    oldest_first(&mut messages);
    Ok(HttpResponse::Created().json(json!({ "success": true, "messages": messages })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(text: Option<&str>, images: Option<&str>) -> CreateMessageRequest {
        CreateMessageRequest {
            conversation_id: "c1".into(),
            sender: "u1".into(),
            text: text.map(Into::into),
            images: images.map(Into::into),
        }
    }

    #[test]
    fn message_needs_text_or_image() {
        assert!(build_message(request(None, None)).is_err());
        assert!(build_message(request(Some("   "), None)).is_err());

        let msg = build_message(request(Some("hi"), Some(""))).unwrap();
        assert_eq!(msg.text.as_deref(), Some("hi"));
        assert!(msg.images.is_none());

        let msg = build_message(request(None, Some("https://cdn/img.png"))).unwrap();
        assert!(msg.text.is_none());
    }

    #[test]
    fn history_reads_oldest_first() {
        let mut first = build_message(request(Some("one"), None)).unwrap();
        let second = build_message(request(Some("two"), None)).unwrap();
        first.created_at = second.created_at - Duration::seconds(5);
        let mut history = vec![second, first];
        oldest_first(&mut history);
        assert_eq!(history[0].text.as_deref(), Some("one"));
    }
}
