//! Route definitions for the Garment ERP API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
///
/// Everything except health and login sits behind the bearer-token
/// middleware. Role checks happen per handler.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/employees", employee_routes())
        .nest("/attendance", attendance_routes())
        .nest("/machines", machine_routes())
        .nest("/materials", material_routes())
        .nest("/customers", customer_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/measurements", measurement_routes())
        .nest("/notifications", notification_routes())
        .nest("/settings", setting_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Public
        .route("/health", get(handlers::health_check))
        .route("/auth/login", post(handlers::login))
        .merge(protected)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me))
        .route("/password", put(handlers::change_password))
}

/// User administration (ADMIN)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}

fn employee_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/:id",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
}

fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_attendance).post(handlers::create_attendance),
        )
        .route("/check-in", post(handlers::check_in))
        .route("/check-out", post(handlers::check_out))
        .route("/summary", get(handlers::attendance_summary))
        .route(
            "/:id",
            get(handlers::get_attendance)
                .put(handlers::update_attendance)
                .delete(handlers::delete_attendance),
        )
}

fn machine_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_machines).post(handlers::create_machine))
        .route("/maintenance-due", get(handlers::maintenance_due))
        .route(
            "/:id",
            get(handlers::get_machine)
                .put(handlers::update_machine)
                .delete(handlers::delete_machine),
        )
}

fn material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route("/low-stock", get(handlers::low_stock_materials))
        .route("/export", get(handlers::export_materials))
        .route(
            "/:id",
            get(handlers::get_material)
                .put(handlers::update_material)
                .delete(handlers::delete_material),
        )
        .route(
            "/:id/transactions",
            get(handlers::list_material_transactions)
                .post(handlers::record_material_transaction),
        )
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/summary/stats", get(handlers::purchase_order_stats))
        .route(
            "/:id",
            get(handlers::get_purchase_order)
                .put(handlers::update_purchase_order)
                .delete(handlers::delete_purchase_order),
        )
        .route("/:id/submit", post(handlers::submit_purchase_order))
        .route("/:id/approve", post(handlers::approve_purchase_order))
        .route("/:id/receive", post(handlers::receive_purchase_order))
        .route("/:id/cancel", post(handlers::cancel_purchase_order))
}

fn measurement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_measurements).post(handlers::create_measurement),
        )
        .route(
            "/:id",
            get(handlers::get_measurement)
                .put(handlers::update_measurement)
                .delete(handlers::delete_measurement),
        )
}

/// Inbox of the current user, plus broadcast
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_notifications).post(handlers::broadcast_notification),
        )
        .route("/unread-count", get(handlers::get_unread_count))
        .route("/read-all", put(handlers::mark_all_notifications_read))
        .route("/:id/read", put(handlers::mark_notification_read))
        .route("/:id", delete(handlers::delete_notification))
}

fn setting_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_settings).put(handlers::put_settings))
        .route(
            "/:key",
            get(handlers::get_setting)
                .put(handlers::put_setting)
                .delete(handlers::delete_setting),
        )
}
