// src/main.rs

mod app_state;
mod auth;
mod chat_server;
mod config;
mod conversation;
mod coupon;
mod db;
mod error;
mod event;
mod mailer;
mod message;
mod models;
mod order;
mod payment;
mod presence;
mod product;
mod shop_management;
mod stripe;
mod user_management;
mod validation;
mod web_socket_server;
mod withdraw;

use std::io;
use std::sync::Arc;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use crate::app_state::AppState;
use crate::auth::Authentication;
use crate::chat_server::ChatServer;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::{json_config, path_config};
use crate::mailer::Mailer;
use crate::stripe::StripeClient;
use crate::web_socket_server::ws_index;

/// Every REST controller, mounted under `/api/v2`.
fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .route("/create-user", web::post().to(user_management::create_user))
            .route("/activation", web::post().to(user_management::activate_user))
            .route("/login-user", web::post().to(user_management::login_user))
            .route("/getuser", web::get().to(user_management::get_user))
            .route("/logout", web::get().to(user_management::logout_user))
            .route("/update-user-info", web::put().to(user_management::update_user_info))
            .route("/update-avatar", web::put().to(user_management::update_avatar))
            .route(
                "/update-user-addresses",
                web::put().to(user_management::update_user_addresses),
            )
            .route(
                "/delete-user-address/{id}",
                web::delete().to(user_management::delete_user_address),
            )
            .route(
                "/update-user-password",
                web::put().to(user_management::update_user_password),
            )
            .route("/user-info/{id}", web::get().to(user_management::get_user_info))
            .route("/admin-all-users", web::get().to(user_management::admin_all_users))
            .route("/delete-user/{id}", web::delete().to(user_management::delete_user)),
    )
    .service(
        web::scope("/shop")
            .route("/create-shop", web::post().to(shop_management::create_shop))
            .route("/activation", web::post().to(shop_management::activate_shop))
            .route("/login-shop", web::post().to(shop_management::login_shop))
            .route("/getSeller", web::get().to(shop_management::get_seller))
            .route("/logout", web::get().to(shop_management::logout_seller))
            .route("/get-shop-info/{id}", web::get().to(shop_management::get_shop_info))
            .route("/update-shop-avatar", web::put().to(shop_management::update_shop_avatar))
            .route("/update-seller-info", web::put().to(shop_management::update_seller_info))
            .route(
                "/update-payment-methods",
                web::put().to(shop_management::update_payment_methods),
            )
            .route(
                "/delete-withdraw-method",
                web::delete().to(shop_management::delete_withdraw_method),
            )
            .route("/admin-all-sellers", web::get().to(shop_management::admin_all_sellers))
            .route("/delete-seller/{id}", web::delete().to(shop_management::delete_seller)),
    )
    .service(
        web::scope("/product")
            .route("/create-product", web::post().to(product::create_product))
            .route(
                "/get-all-products-shop/{id}",
                web::get().to(product::get_shop_products),
            )
            .route(
                "/delete-shop-product/{id}",
                web::delete().to(product::delete_shop_product),
            )
            .route("/get-all-products", web::get().to(product::get_all_products))
            .route("/create-new-review", web::put().to(product::create_new_review))
            .route("/admin-all-products", web::get().to(product::admin_all_products)),
    )
    .service(
        web::scope("/event")
            .route("/create-event", web::post().to(event::create_event))
            .route("/get-all-events", web::get().to(event::get_all_events))
            .route("/get-all-events/{id}", web::get().to(event::get_shop_events))
            .route("/delete-shop-event/{id}", web::delete().to(event::delete_shop_event))
            .route("/admin-all-events", web::get().to(event::admin_all_events)),
    )
    .service(
        web::scope("/coupon")
            .route("/create-coupon-code", web::post().to(coupon::create_coupon_code))
            .route("/get-coupon/{id}", web::get().to(coupon::get_shop_coupons))
            .route("/delete-coupon/{id}", web::delete().to(coupon::delete_coupon_code))
            .route("/get-coupon-value/{name}", web::get().to(coupon::get_coupon_value))
            .route("/apply-coupon", web::post().to(coupon::apply_coupon)),
    )
    .service(
        web::scope("/order")
            .route("/create-order", web::post().to(order::create_order))
            .route("/get-all-orders/{id}", web::get().to(order::get_user_orders))
            .route(
                "/get-seller-all-orders/{id}",
                web::get().to(order::get_seller_orders),
            )
            .route("/update-order-status/{id}", web::put().to(order::update_order_status))
            .route("/order-refund/{id}", web::put().to(order::order_refund))
            .route(
                "/order-refund-success/{id}",
                web::put().to(order::order_refund_success),
            )
            .route("/admin-all-orders", web::get().to(order::admin_all_orders)),
    )
    .service(
        web::scope("/conversation")
            .route(
                "/create-new-conversation",
                web::post().to(conversation::create_conversation),
            )
            .route(
                "/get-all-conversation-seller/{id}",
                web::get().to(conversation::get_seller_conversations),
            )
            .route(
                "/get-all-conversation-user/{id}",
                web::get().to(conversation::get_user_conversations),
            )
            .route(
                "/update-last-message/{id}",
                web::put().to(conversation::update_last_message),
            ),
    )
    .service(
        web::scope("/message")
            .route("/create-new-message", web::post().to(message::create_message))
            .route("/get-all-messages/{id}", web::get().to(message::get_messages)),
    )
    .service(
        web::scope("/payment")
            .route("/process", web::post().to(payment::process_payment))
            .route("/stripeapikey", web::get().to(payment::stripe_api_key)),
    )
    .service(
        web::scope("/withdraw")
            .route(
                "/create-withdraw-request",
                web::post().to(withdraw::create_withdraw_request),
            )
            .route(
                "/get-all-withdraw-request",
                web::get().to(withdraw::get_all_withdraw_requests),
            )
            .route(
                "/update-withdraw-request/{id}",
                web::put().to(withdraw::update_withdraw_request),
            ),
    );
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config =
        Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mongodb = Arc::new(
        MongoDB::init(&config.mongo_uri, &config.database_name)
            .await
            .map_err(io::Error::other)?,
    );
    let mailer = Mailer::new(config.smtp.as_ref()).map_err(io::Error::other)?;
    let stripe = StripeClient::new(&config.stripe_secret_key, &config.stripe_currency);
    let chat_server = ChatServer::new().start();

    let bind_address = config.bind_address.clone();
    info!("Server running at http://{}", bind_address);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    let state = web::Data::new(AppState {
        chat_server,
        mongodb,
        config: config.clone(),
        mailer,
        stripe,
    });

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(json_config())
            .app_data(path_config())
            .service(web::scope("/api/v2").configure(api_routes))
            .service(web::resource("/ws").route(web::get().to(ws_index)))
    })
    .bind(bind_address)?
    .run()
    .await
}
