//! HTTP facade over the order pipeline.
//!
//! Identity is asserted by the upstream gateway through `X-User-Id`. Cart,
//! address and checkout routes take the uid in the path and only serve it to
//! that same caller. Uids starting with `guest_` are guests whose cart and
//! addresses live in this process only, until they check out or go idle.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::{Actor, Checkout, CheckoutQuote, OrderLifecycle, SellerOnboarding, Session};
use crate::domain::aggregates::{
    Address, AddressBook, ApplicationForm, ApplicationStatus, Cart, CartError, CartLine, DeliveryMethod, Order, PaymentMethod, Product,
    SellerApplication, SellerOrderView,
};
use crate::domain::value_objects::{LineKey, Money};
use crate::services::{CarrierTracking, EventPublisher, LocationCode, LocationLookup, OrderStore, ProfileStore, SellerApplicationStore, TrackingEvent};
use crate::{CommerceError, Settings};

pub const USER_HEADER: &str = "x-user-id";
const GUEST_PREFIX: &str = "guest_";
/// Guest state untouched for this long is dropped on the next guest write.
const GUEST_IDLE: Duration = Duration::from_secs(2 * 60 * 60);
const MAX_GUESTS: usize = 10_000;

#[derive(Clone, Debug)]
struct GuestState { cart: Cart, addresses: AddressBook, touched: Instant }

fn evict_idle(guests: &mut HashMap<String, GuestState>, now: Instant) {
    guests.retain(|_, g| now.saturating_duration_since(g.touched) < GUEST_IDLE);
    while guests.len() >= MAX_GUESTS {
        let Some(oldest) = guests.iter().min_by_key(|(_, g)| g.touched).map(|(uid, _)| uid.clone()) else { break };
        guests.remove(&oldest);
    }
}

#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    profiles: Arc<dyn ProfileStore>,
    orders: Arc<dyn OrderStore>,
    locations: Arc<dyn LocationLookup>,
    publisher: Arc<dyn EventPublisher>,
    lifecycle: Arc<OrderLifecycle>,
    onboarding: Arc<SellerOnboarding>,
    guests: Arc<Mutex<HashMap<String, GuestState>>>,
}

/// The storage and collaborator adapters the service runs on.
pub struct Backends {
    pub profiles: Arc<dyn ProfileStore>,
    pub orders: Arc<dyn OrderStore>,
    pub applications: Arc<dyn SellerApplicationStore>,
    pub locations: Arc<dyn LocationLookup>,
    pub carrier: Arc<dyn CarrierTracking>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl AppState {
    pub fn new(settings: Settings, backends: Backends) -> Self {
        let Backends { profiles, orders, applications, locations, carrier, publisher } = backends;
        let lifecycle = OrderLifecycle::new(orders.clone(), carrier, publisher.clone(), settings.courier.clone());
        let onboarding = SellerOnboarding::new(applications, profiles.clone(), publisher.clone());
        Self {
            settings: Arc::new(settings), profiles, orders, locations, publisher,
            lifecycle: Arc::new(lifecycle), onboarding: Arc::new(onboarding), guests: Arc::default(),
        }
    }

    async fn open_session(&self, uid: &str) -> Result<Session, ApiError> {
        if uid.starts_with(GUEST_PREFIX) {
            let (cart, addresses) = self.guests.lock().await.get(uid).map(|g| (g.cart.clone(), g.addresses.clone()))
                .unwrap_or_else(|| (Cart::new(&self.settings.currency), AddressBook::default()));
            return Ok(Session::resume_guest(uid.to_string(), cart, addresses, self.profiles.clone()));
        }
        Ok(Session::login(uid, self.profiles.clone(), &self.settings.currency).await?)
    }

    /// Keeps guest state after a write for the next request; member state already lives in the
    /// profile store. A guest with an empty cart and no addresses is forgotten.
    async fn close_session(&self, session: Session) {
        if !session.is_guest() { return; }
        let uid = session.uid().to_string();
        let (cart, addresses) = session.into_parts();
        let mut guests = self.guests.lock().await;
        if cart.is_empty() && addresses.addresses().is_empty() {
            guests.remove(&uid);
            return;
        }
        let now = Instant::now();
        evict_idle(&mut guests, now);
        guests.insert(uid, GuestState { cart, addresses, touched: now });
    }

    async fn forget_guest(&self, uid: &str) { self.guests.lock().await.remove(uid); }

    /// Cart, address and checkout routes act only for the caller named in `X-User-Id`.
    async fn authorize_owner(&self, headers: &HeaderMap, uid: &str) -> Result<(), ApiError> {
        let actor = self.actor(headers).await?;
        if actor.uid != uid {
            return Err(CommerceError::Forbidden(format!("{} cannot act for {uid}", actor.uid)).into());
        }
        Ok(())
    }

    async fn actor(&self, headers: &HeaderMap) -> Result<Actor, ApiError> {
        let uid = headers.get(USER_HEADER).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
            .ok_or_else(|| CommerceError::Forbidden("missing X-User-Id".into()))?;
        if uid.starts_with(GUEST_PREFIX) { return Ok(Actor::guest(uid)); }
        let profile = self.profiles.get_profile(uid).await?.ok_or_else(|| CommerceError::not_found("profile", uid))?;
        Ok(Actor::new(uid, profile.role))
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub struct ApiError(CommerceError);

impl From<CommerceError> for ApiError {
    fn from(e: CommerceError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CommerceError::Validation(_) | CommerceError::MissingAddress | CommerceError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            CommerceError::NotFound { .. } => StatusCode::NOT_FOUND,
            CommerceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            CommerceError::Forbidden(_) => StatusCode::FORBIDDEN,
            CommerceError::Remote(_) => StatusCode::BAD_GATEWAY,
        };
        let message = match &self.0 {
            CommerceError::Remote(detail) => {
                tracing::error!(error = %detail, "Remote call failed");
                "Request failed, please try again".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Router
// =============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "tataknorte-orders"})) }))
        .route("/api/v1/locations/provinces", get(list_provinces))
        .route("/api/v1/locations/provinces/:code/cities", get(list_cities))
        .route("/api/v1/locations/cities/:code/barangays", get(list_barangays))
        .route("/api/v1/cart/:uid", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:uid/items", post(add_to_cart))
        .route("/api/v1/cart/:uid/items/:product_id", patch(update_quantity).delete(remove_item))
        .route("/api/v1/profiles/:uid/addresses", get(list_addresses).post(add_address))
        .route("/api/v1/checkout/:uid/quote", get(checkout_quote))
        .route("/api/v1/checkout/:uid", post(checkout))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/history", get(order_history))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/ship", post(ship_order))
        .route("/api/v1/orders/:id/deliver", post(deliver_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/tracking", get(order_tracking))
        .route("/api/v1/seller/orders", get(seller_queue))
        .route("/api/v1/seller-applications", get(list_applications).post(submit_application))
        .route("/api/v1/seller-applications/:id/approve", post(approve_application))
        .route("/api/v1/seller-applications/:id/reject", post(reject_application))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

// =============================================================================
// Locations
// =============================================================================

async fn list_provinces(State(s): State<AppState>) -> ApiResult<Json<Vec<LocationCode>>> {
    Ok(Json(s.locations.list_provinces().await?))
}

async fn list_cities(State(s): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<Vec<LocationCode>>> {
    Ok(Json(s.locations.list_cities(&code).await?))
}

async fn list_barangays(State(s): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<Vec<LocationCode>>> {
    Ok(Json(s.locations.list_barangays(&code).await?))
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView { pub lines: Vec<CartLine>, pub item_count: u32, pub total: Money }

impl CartView {
    fn of(session: &Session) -> ApiResult<Self> {
        let cart = session.cart().cart();
        let total = cart.total().map_err(CommerceError::from)?;
        Ok(Self { lines: cart.lines().to_vec(), item_count: cart.item_count(), total })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest { pub product: Product, pub variation_id: Option<String>, #[serde(default)] pub quantity: u32 }

#[derive(Debug, Deserialize)]
pub struct VariationParam { pub variation: Option<String> }

#[derive(Debug, Deserialize)]
pub struct QuantityChange { pub delta: i32 }

async fn get_cart(State(s): State<AppState>, Path(uid): Path<String>, headers: HeaderMap) -> ApiResult<Json<CartView>> {
    s.authorize_owner(&headers, &uid).await?;
    let session = s.open_session(&uid).await?;
    Ok(Json(CartView::of(&session)?))
}

async fn add_to_cart(
    State(s): State<AppState>, Path(uid): Path<String>, headers: HeaderMap, Json(r): Json<AddToCartRequest>,
) -> ApiResult<Json<CartView>> {
    s.authorize_owner(&headers, &uid).await?;
    let variation = match r.variation_id {
        Some(id) => Some(r.product.variation(&id).cloned()
            .ok_or_else(|| CommerceError::from(CartError::UnknownVariation { product_id: r.product.id.clone(), variation_id: id.clone() }))?),
        None => None,
    };
    let mut session = s.open_session(&uid).await?;
    session.cart_mut().add(r.product, variation, r.quantity).await?;
    let view = CartView::of(&session);
    s.close_session(session).await;
    Ok(Json(view?))
}

async fn update_quantity(
    State(s): State<AppState>, Path((uid, product_id)): Path<(String, String)>, Query(v): Query<VariationParam>, headers: HeaderMap,
    Json(r): Json<QuantityChange>,
) -> ApiResult<Json<CartView>> {
    s.authorize_owner(&headers, &uid).await?;
    let mut session = s.open_session(&uid).await?;
    session.cart_mut().update_quantity(&LineKey::new(product_id, v.variation), r.delta).await;
    let view = CartView::of(&session);
    s.close_session(session).await;
    Ok(Json(view?))
}

async fn remove_item(
    State(s): State<AppState>, Path((uid, product_id)): Path<(String, String)>, Query(v): Query<VariationParam>, headers: HeaderMap,
) -> ApiResult<Json<CartView>> {
    s.authorize_owner(&headers, &uid).await?;
    let mut session = s.open_session(&uid).await?;
    session.cart_mut().remove(&LineKey::new(product_id, v.variation)).await;
    let view = CartView::of(&session);
    s.close_session(session).await;
    Ok(Json(view?))
}

async fn clear_cart(State(s): State<AppState>, Path(uid): Path<String>, headers: HeaderMap) -> ApiResult<StatusCode> {
    s.authorize_owner(&headers, &uid).await?;
    let mut session = s.open_session(&uid).await?;
    session.cart_mut().clear().await;
    s.close_session(session).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Addresses & checkout
// =============================================================================

async fn list_addresses(State(s): State<AppState>, Path(uid): Path<String>, headers: HeaderMap) -> ApiResult<Json<Vec<Address>>> {
    s.authorize_owner(&headers, &uid).await?;
    let session = s.open_session(&uid).await?;
    Ok(Json(session.addresses().addresses().to_vec()))
}

async fn add_address(
    State(s): State<AppState>, Path(uid): Path<String>, headers: HeaderMap, Json(address): Json<Address>,
) -> ApiResult<(StatusCode, Json<Address>)> {
    s.authorize_owner(&headers, &uid).await?;
    let mut session = s.open_session(&uid).await?;
    let saved = session.save_address(address).await;
    s.close_session(session).await;
    Ok((StatusCode::CREATED, Json(saved?)))
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams { #[serde(default)] pub delivery: DeliveryMethod }

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Saved address to ship to; the default address is used when omitted.
    pub address_id: Option<String>,
}

async fn checkout_quote(
    State(s): State<AppState>, Path(uid): Path<String>, Query(q): Query<QuoteParams>, headers: HeaderMap,
) -> ApiResult<Json<CheckoutQuote>> {
    s.authorize_owner(&headers, &uid).await?;
    let session = s.open_session(&uid).await?;
    let mut checkout = Checkout::open(session.addresses(), &s.settings);
    checkout.delivery_method = q.delivery;
    Ok(Json(checkout.quote(session.cart().cart())?))
}

async fn checkout(
    State(s): State<AppState>, Path(uid): Path<String>, headers: HeaderMap, Json(r): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    s.authorize_owner(&headers, &uid).await?;
    let mut session = s.open_session(&uid).await?;
    let book = session.addresses().clone();
    let mut checkout = Checkout::open(&book, &s.settings);
    checkout.delivery_method = r.delivery_method;
    checkout.payment_method = r.payment_method;
    if let Some(address_id) = r.address_id.as_deref() {
        let index = book.addresses().iter().position(|a| a.id.as_deref() == Some(address_id))
            .ok_or_else(|| CommerceError::not_found("address", address_id))?;
        let flow = checkout.addresses_mut();
        flow.request_change().map_err(CommerceError::from)?;
        flow.choose(&book, index).map_err(CommerceError::from)?;
    }
    let placed = checkout.submit(&mut session, s.orders.as_ref(), s.publisher.as_ref()).await;
    match &placed {
        Ok(_) if session.is_guest() => s.forget_guest(session.uid()).await,
        _ => s.close_session(session).await,
    }
    Ok((StatusCode::CREATED, Json(placed?)))
}

// =============================================================================
// Orders
// =============================================================================

async fn list_orders(State(s): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Vec<Order>>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.list_for(&actor).await?))
}

async fn order_history(State(s): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Vec<Order>>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.history(&actor).await?))
}

async fn get_order(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.get(&actor, &id).await?))
}

async fn ship_order(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.mark_shipped(&actor, &id).await?))
}

async fn deliver_order(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.mark_delivered(&actor, &id).await?))
}

async fn cancel_order(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.cancel(&actor, &id).await?))
}

async fn order_tracking(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Option<Vec<TrackingEvent>>>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.tracking(&actor, &id).await?))
}

async fn seller_queue(State(s): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Vec<SellerOrderView>>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.lifecycle.seller_queue(&actor).await?))
}

// =============================================================================
// Seller applications
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusParam { #[serde(default)] pub status: ApplicationStatus }

#[derive(Debug, Serialize)]
pub struct Decision { pub updated: bool }

async fn submit_application(State(s): State<AppState>, headers: HeaderMap, Json(form): Json<ApplicationForm>) -> ApiResult<(StatusCode, Json<SellerApplication>)> {
    let actor = s.actor(&headers).await?;
    Ok((StatusCode::CREATED, Json(s.onboarding.submit(&actor, form).await?)))
}

async fn list_applications(State(s): State<AppState>, headers: HeaderMap, Query(p): Query<StatusParam>) -> ApiResult<Json<Vec<SellerApplication>>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(s.onboarding.list(&actor, p.status).await?))
}

async fn approve_application(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Decision>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(Decision { updated: s.onboarding.approve(&actor, &id).await? }))
}

async fn reject_application(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Decision>> {
    let actor = s.actor(&headers).await?;
    Ok(Json(Decision { updated: s.onboarding.reject(&actor, &id).await? }))
}
