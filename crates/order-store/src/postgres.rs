use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, Page, PageRequest, SortDirection, UserId};
use domain::{
    Address, Money, Order, OrderFilter, OrderItem, OrderParts, OrderRepository, OrderStatus,
    OrderStatusLog, PaymentStatus, StoreError,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use crate::error::{PostgresError, Result};

const ORDER_COLUMNS: &str = "id, version, user_id, customer_email, customer_name, total_amount, status, \
     payment_status, shipping_address, billing_address, payment_method, shipping_method, \
     tracking_number, created_at, updated_at";

/// PostgreSQL-backed order repository.
///
/// An order, its new items and its new status log entries are written in a
/// single transaction. Updates only apply when the row still carries the
/// version the order was read at.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    async fn save_order(&self, order: Order) -> Result<Order> {
        let mut parts = order.into_parts();
        let mut tx = self.pool.begin().await?;

        let order_id = match parts.id {
            None => {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO orders (version, user_id, customer_email, customer_name,
                        total_amount, status, payment_status, shipping_address, billing_address,
                        payment_method, shipping_method, tracking_number, created_at, updated_at)
                    VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    RETURNING id
                    "#,
                )
                .bind(parts.user_id.as_i64())
                .bind(&parts.customer_email)
                .bind(&parts.customer_name)
                .bind(parts.total_amount.amount())
                .bind(parts.status.as_str())
                .bind(parts.payment_status.as_str())
                .bind(Json(&parts.shipping_address))
                .bind(Json(&parts.billing_address))
                .bind(&parts.payment_method)
                .bind(&parts.shipping_method)
                .bind(&parts.tracking_number)
                .bind(parts.created_at)
                .bind(parts.updated_at)
                .fetch_one(&mut *tx)
                .await?;
                OrderId::new(id)
            }
            Some(id) => {
                // Snapshot fields are immutable; only lifecycle columns change.
                let result = sqlx::query(
                    r#"
                    UPDATE orders
                    SET status = $3, payment_status = $4, tracking_number = $5, updated_at = $6,
                        version = version + 1
                    WHERE id = $1 AND version = $2
                    "#,
                )
                .bind(id.as_i64())
                .bind(parts.version)
                .bind(parts.status.as_str())
                .bind(parts.payment_status.as_str())
                .bind(&parts.tracking_number)
                .bind(parts.updated_at)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    let actual: Option<i64> =
                        sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                            .bind(id.as_i64())
                            .fetch_optional(&mut *tx)
                            .await?;
                    return Err(match actual {
                        Some(actual) => PostgresError::ConcurrencyConflict {
                            order_id: id,
                            expected: parts.version,
                            actual,
                        },
                        None => PostgresError::NotFound(id),
                    });
                }
                id
            }
        };

        for item in parts.items.iter_mut().filter(|item| item.id.is_none()) {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                PostgresError::Decode(format!("quantity {} out of range", item.quantity))
            })?;

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_items (order_id, product_variant_id, product_name, variant_size,
                    product_image_url, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(order_id.as_i64())
            .bind(item.variant_id.as_i64())
            .bind(&item.product_name)
            .bind(&item.variant_size)
            .bind(&item.product_image_url)
            .bind(quantity)
            .bind(item.unit_price.amount())
            .fetch_one(&mut *tx)
            .await?;
            item.id = Some(id);
        }

        for log in parts.status_logs.iter_mut().filter(|log| log.id.is_none()) {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_status_logs (order_id, previous_status, new_status, changed_at,
                    changed_by, notes)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(order_id.as_i64())
            .bind(log.previous_status.map(|s| s.as_str()))
            .bind(log.new_status.as_str())
            .bind(log.changed_at)
            .bind(&log.changed_by)
            .bind(&log.notes)
            .fetch_one(&mut *tx)
            .await?;
            log.id = Some(id);
        }

        tx.commit().await?;

        tracing::debug!(%order_id, "order saved");
        parts.id = Some(order_id);
        parts.version += 1;
        Ok(Order::from(parts))
    }

    async fn fetch_order(
        &self,
        sql: &str,
        id: OrderId,
        user_id: Option<UserId>,
    ) -> Result<Option<Order>> {
        let mut query = sqlx::query(sql).bind(id.as_i64());
        if let Some(user_id) = user_id {
            query = query.bind(user_id.as_i64());
        }

        match query.fetch_optional(&self.pool).await? {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn fetch_page(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders WHERE 1=1");
        push_filter(&mut count, &filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let direction = match page.direction() {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let offset = i64::try_from(page.offset())
            .map_err(|_| PostgresError::Decode(format!("offset {} out of range", page.offset())))?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"));
        push_filter(&mut query, &filter);
        query.push(format!(" ORDER BY created_at {direction}, id {direction} LIMIT "));
        query.push_bind(i64::from(page.size()));
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows = query.build().fetch_all(&self.pool).await?;
        let orders = self.hydrate(rows).await?;

        Ok(Page::new(orders, page, u64::try_from(total).unwrap_or_default()))
    }

    /// Maps order rows and loads their items and status logs in two queries.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let mut orders: Vec<OrderParts> = rows.iter().map(row_to_parts).collect::<Result<_>>()?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = orders
            .iter()
            .filter_map(|o| o.id.map(|id| id.as_i64()))
            .collect();

        let item_rows = sqlx::query(
            r#"
            SELECT id, order_id, product_variant_id, product_name, variant_size, product_image_url,
                quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let log_rows = sqlx::query(
            r#"
            SELECT id, order_id, previous_status, new_status, changed_at, changed_by, notes
            FROM order_status_logs
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: i64 = row.try_get("order_id")?;
            items.entry(order_id).or_default().push(row_to_item(row)?);
        }

        let mut logs: HashMap<i64, Vec<OrderStatusLog>> = HashMap::new();
        for row in &log_rows {
            let order_id: i64 = row.try_get("order_id")?;
            logs.entry(order_id).or_default().push(row_to_log(row)?);
        }

        for order in &mut orders {
            if let Some(id) = order.id.map(|id| id.as_i64()) {
                order.items = items.remove(&id).unwrap_or_default();
                order.status_logs = logs.remove(&id).unwrap_or_default();
            }
        }

        Ok(orders.into_iter().map(Order::from).collect())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.as_i64());
    }
}

fn parse_status(value: &str) -> Result<OrderStatus> {
    value
        .parse()
        .map_err(|_| PostgresError::Decode(format!("unknown order status '{value}'")))
}

fn row_to_parts(row: &PgRow) -> Result<OrderParts> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    let shipping: Json<Address> = row.try_get("shipping_address")?;
    let billing: Json<Address> = row.try_get("billing_address")?;

    Ok(OrderParts {
        id: Some(OrderId::new(row.try_get("id")?)),
        version: row.try_get("version")?,
        user_id: UserId::new(row.try_get("user_id")?),
        customer_email: row.try_get("customer_email")?,
        customer_name: row.try_get("customer_name")?,
        total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
        status: parse_status(&status)?,
        payment_status: payment_status.parse::<PaymentStatus>().map_err(|_| {
            PostgresError::Decode(format!("unknown payment status '{payment_status}'"))
        })?,
        shipping_address: shipping.0,
        billing_address: billing.0,
        payment_method: row.try_get("payment_method")?,
        shipping_method: row.try_get("shipping_method")?,
        tracking_number: row.try_get("tracking_number")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        items: Vec::new(),
        status_logs: Vec::new(),
    })
}

fn row_to_item(row: &PgRow) -> Result<OrderItem> {
    let quantity: i32 = row.try_get("quantity")?;

    Ok(OrderItem {
        id: Some(row.try_get("id")?),
        variant_id: row.try_get::<i64, _>("product_variant_id")?.into(),
        product_name: row.try_get("product_name")?,
        variant_size: row.try_get("variant_size")?,
        product_image_url: row.try_get("product_image_url")?,
        quantity: u32::try_from(quantity)
            .map_err(|_| PostgresError::Decode(format!("negative quantity {quantity}")))?,
        unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
    })
}

fn row_to_log(row: &PgRow) -> Result<OrderStatusLog> {
    let previous: Option<String> = row.try_get("previous_status")?;
    let new_status: String = row.try_get("new_status")?;

    Ok(OrderStatusLog {
        id: Some(row.try_get("id")?),
        previous_status: previous.as_deref().map(parse_status).transpose()?,
        new_status: parse_status(&new_status)?,
        changed_at: row.try_get("changed_at")?,
        changed_by: row.try_get("changed_by")?,
        notes: row.try_get("notes")?,
    })
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn save(&self, order: Order) -> std::result::Result<Order, StoreError> {
        Ok(self.save_order(order).await?)
    }

    async fn find_by_id(&self, id: OrderId) -> std::result::Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        Ok(self.fetch_order(&sql, id, None).await?)
    }

    async fn find_by_id_and_user_id(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> std::result::Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2");
        Ok(self.fetch_order(&sql, id, Some(user_id)).await?)
    }

    async fn find_all(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> std::result::Result<Page<Order>, StoreError> {
        Ok(self.fetch_page(filter, page).await?)
    }
}
