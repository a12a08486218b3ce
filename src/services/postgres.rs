//! Postgres document store.
//!
//! Profiles, orders and seller applications are stored as JSONB documents in
//! the same camelCase shape the storefront reads, with a few columns lifted
//! out for filtering. Every write is a single statement; order status writes
//! only apply while the stored status is the one the caller loaded.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use super::{OrderStore, ProfileStore, SellerApplicationStore};
use crate::domain::aggregates::{
    ApplicationStatus, CartLine, NewOrder, Order, OrderStatus, Profile, ProfilePatch, Role, SellerApplication,
};
use crate::{CommerceError, Result};

#[derive(Clone, Debug)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| CommerceError::Remote(e.to_string()))?;
        tracing::info!("Postgres document store ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self { Self { pool } }

    pub async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query("INSERT INTO profiles (uid, doc, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (uid) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()")
            .bind(&profile.uid).bind(Json(profile)).execute(&self.pool).await?;
        Ok(())
    }
}

fn require_row(affected: u64, kind: &'static str, id: &str) -> Result<()> {
    if affected == 0 { Err(CommerceError::not_found(kind, id)) } else { Ok(()) }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, (Json<Profile>,)>("SELECT doc FROM profiles WHERE uid = $1")
            .bind(uid).fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(profile),)| profile))
    }

    async fn save_bag(&self, uid: &str, lines: &[CartLine]) -> Result<()> {
        let done = sqlx::query("UPDATE profiles SET doc = jsonb_set(doc, '{bag}', $2), updated_at = NOW() WHERE uid = $1")
            .bind(uid).bind(Json(lines)).execute(&self.pool).await?;
        require_row(done.rows_affected(), "profile", uid)
    }

    async fn save_profile_fields(&self, uid: &str, patch: ProfilePatch) -> Result<()> {
        let done = sqlx::query("UPDATE profiles SET doc = doc || $2, updated_at = NOW() WHERE uid = $1")
            .bind(uid).bind(Json(&patch)).execute(&self.pool).await?;
        require_row(done.rows_affected(), "profile", uid)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, new: NewOrder) -> Result<Order> {
        let order = Order::place(new)?;
        sqlx::query("INSERT INTO orders (id, customer_id, seller_ids, created_at, doc) VALUES ($1, $2, $3, $4, $5)")
            .bind(order.id()).bind(order.customer_id()).bind(order.seller_ids()).bind(order.created_at()).bind(Json(&order))
            .execute(&self.pool).await?;
        Ok(order)
    }

    async fn list_orders(&self, role: Role, uid: &str) -> Result<Vec<Order>> {
        let query = match role {
            Role::Customer => sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE customer_id = $1 ORDER BY created_at DESC").bind(uid),
            Role::Seller => sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE $1 = ANY(seller_ids) ORDER BY created_at DESC").bind(uid),
            Role::Admin => sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders ORDER BY created_at DESC"),
        };
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE id = $1")
            .bind(order_id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn set_order_status(&self, order_id: &str, from: OrderStatus, to: OrderStatus) -> Result<()> {
        let done = sqlx::query("UPDATE orders SET doc = jsonb_set(doc, '{status}', to_jsonb($3::text)) WHERE id = $1 AND doc->>'status' = $2")
            .bind(order_id).bind(from.as_str()).bind(to.as_str()).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return self.stale_status(order_id, to).await; }
        Ok(())
    }

    async fn set_tracking(&self, order_id: &str, number: &str, courier: &str) -> Result<()> {
        let done = sqlx::query(
            "UPDATE orders SET doc = doc || jsonb_build_object('trackingNumber', $2::text, 'courier', $3::text, 'status', $5::text) \
             WHERE id = $1 AND doc->>'status' = $4",
        )
        .bind(order_id).bind(number).bind(courier).bind(OrderStatus::Processing.as_str()).bind(OrderStatus::Shipped.as_str())
        .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return self.stale_status(order_id, OrderStatus::Shipped).await; }
        Ok(())
    }
}

impl PgStore {
    /// Explains a conditional order write that matched no row.
    async fn stale_status(&self, order_id: &str, to: OrderStatus) -> Result<()> {
        match self.get_order(order_id).await? {
            Some(order) => Err(CommerceError::InvalidTransition { from: order.status(), to }),
            None => Err(CommerceError::not_found("order", order_id)),
        }
    }

    async fn decide(&self, id: &str, outcome: ApplicationStatus) -> Result<bool> {
        let done = sqlx::query("UPDATE seller_applications SET status = $2, doc = jsonb_set(doc, '{status}', to_jsonb($2::text)) WHERE id = $1 AND status = 'pending'")
            .bind(id).bind(outcome.as_str()).execute(&self.pool).await?;
        Ok(done.rows_affected() == 1)
    }
}

#[async_trait]
impl SellerApplicationStore for PgStore {
    async fn submit(&self, application: &SellerApplication) -> Result<()> {
        sqlx::query("INSERT INTO seller_applications (id, user_id, status, created_at, doc) VALUES ($1, $2, $3, $4, $5)")
            .bind(application.id()).bind(&application.user_id).bind(application.status.as_str()).bind(application.created_at).bind(Json(application))
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn list_by_status(&self, status: ApplicationStatus) -> Result<Vec<SellerApplication>> {
        let rows = sqlx::query_as::<_, (Json<SellerApplication>,)>("SELECT doc FROM seller_applications WHERE status = $1 ORDER BY created_at DESC")
            .bind(status.as_str()).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(Json(app),)| app).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<SellerApplication>> {
        let row = sqlx::query_as::<_, (Json<SellerApplication>,)>("SELECT doc FROM seller_applications WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(app),)| app))
    }

    async fn approve(&self, application: &SellerApplication) -> Result<bool> {
        self.decide(application.id(), ApplicationStatus::Approved).await
    }

    async fn reject(&self, id: &str) -> Result<bool> {
        self.decide(id, ApplicationStatus::Rejected).await
    }
}
