use std::collections::HashMap;

use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::{
    domain::{NewOrder, NotificationOutcome, OrderStatus},
    models::{
        CategoryEntity, CreateCategoryEntity, CreateOrderEntity, CreateOrderItemEntity,
        CreateProductEntity, CreateProductMediaEntity, OrderEntity, OrderItemEntity,
        OrderWithItems, ProductCategoryEntity, ProductDetails, ProductEntity, ProductMediaEntity,
        SaveSettingsEntity, SettingsEntity, UpdateProductEntity,
    },
    platform::db::{DbConnection, DbPool},
    repositories::{
        CatalogRepository, MediaRepository, OrderRepository, RepositoryError, SettingsRepository,
    },
    schema::{
        categories, order_items, orders, product_categories, product_media, products, settings,
    },
};

/// Postgres backend built on a diesel-async bb8 pool.
#[derive(Clone)]
pub struct PgRepository {
    db_pool: DbPool,
}

impl PgRepository {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    async fn connection(&self) -> Result<DbConnection<'_>, RepositoryError> {
        self.db_pool
            .get()
            .await
            .map_err(|e| RepositoryError::Pool(e.to_string()))
    }
}

fn group_items(
    orders: Vec<OrderEntity>,
    items: Vec<OrderItemEntity>,
) -> Vec<OrderWithItems> {
    let mut group: HashMap<Uuid, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|order| {
            let items = group.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect()
}

fn group_categories(
    products: Vec<ProductEntity>,
    links: Vec<ProductCategoryEntity>,
) -> Vec<ProductDetails> {
    let mut group: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links {
        group.entry(link.product_id).or_default().push(link.category_id);
    }

    products
        .into_iter()
        .map(|product| {
            let category_ids = group.remove(&product.id).unwrap_or_default();
            ProductDetails {
                product,
                category_ids,
            }
        })
        .collect()
}

/// Category links of `product_ids`, in category `sort_order`.
async fn load_category_links(
    conn: &mut AsyncPgConnection,
    product_ids: Vec<Uuid>,
) -> Result<Vec<ProductCategoryEntity>, diesel::result::Error> {
    product_categories::table
        .inner_join(categories::table)
        .filter(product_categories::product_id.eq_any(product_ids))
        .order_by((categories::sort_order.asc(), categories::created_at.asc()))
        .select(ProductCategoryEntity::as_select())
        .get_results(conn)
        .await
}

async fn replace_category_links(
    conn: &mut AsyncPgConnection,
    product_id: Uuid,
    mut category_ids: Vec<Uuid>,
) -> Result<(), diesel::result::Error> {
    category_ids.sort();
    category_ids.dedup();

    diesel::delete(product_categories::table.filter(product_categories::product_id.eq(product_id)))
        .execute(conn)
        .await?;

    if !category_ids.is_empty() {
        let links: Vec<ProductCategoryEntity> = category_ids
            .into_iter()
            .map(|category_id| ProductCategoryEntity {
                product_id,
                category_id,
            })
            .collect();
        diesel::insert_into(product_categories::table)
            .values(links)
            .execute(conn)
            .await?;
    }

    Ok(())
}

async fn product_details(
    conn: &mut AsyncPgConnection,
    product: ProductEntity,
) -> Result<ProductDetails, diesel::result::Error> {
    let links = load_category_links(conn, vec![product.id]).await?;
    Ok(ProductDetails {
        category_ids: links.into_iter().map(|link| link.category_id).collect(),
        product,
    })
}

#[async_trait]
impl OrderRepository for PgRepository {
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, RepositoryError> {
        let conn = &mut self.connection().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let header: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        order_type: order.order_type.to_string(),
                        customer_name: order.customer_name,
                        phone: order.phone,
                        telegram: order.telegram,
                        city: order.city,
                        delivery_method: order.delivery_method.to_string(),
                        comment: order.comment,
                        status: OrderStatus::New.to_string(),
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let new_items: Vec<CreateOrderItemEntity> = order
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(position, item)| CreateOrderItemEntity {
                        order_id: header.id,
                        position: position as i32,
                        product_code: item.product_code,
                        color: item.color,
                        qty: item.qty,
                        price_snapshot: item.price_snapshot,
                    })
                    .collect();

                let items: Vec<OrderItemEntity> = diesel::insert_into(order_items::table)
                    .values(new_items)
                    .returning(OrderItemEntity::as_returning())
                    .get_results(conn)
                    .await?;

                Ok::<OrderWithItems, RepositoryError>(OrderWithItems {
                    order: header,
                    items,
                })
            })
        })
        .await
    }

    async fn record_notification(
        &self,
        order_id: Uuid,
        outcome: &NotificationOutcome,
    ) -> Result<(), RepositoryError> {
        let conn = &mut self.connection().await?;

        let updated = diesel::update(
            orders::table
                .find(order_id)
                .filter(orders::notification_status.is_null()),
        )
        .set((
            orders::notification_status.eq(Some(outcome.status().to_string())),
            orders::notification_error.eq(outcome.error().map(str::to_string)),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;

        match updated {
            0 => Err(RepositoryError::NotFound),
            _ => Ok(()),
        }
    }

    async fn list_orders(&self) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let conn = &mut self.connection().await?;

        let orders: Vec<OrderEntity> = orders::table
            .order_by(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let items: Vec<OrderItemEntity> = order_items::table
            .filter(order_items::order_id.eq_any(order_ids))
            .order_by((order_items::order_id, order_items::position))
            .select(OrderItemEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(group_items(orders, items))
    }

    async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, RepositoryError> {
        let conn = &mut self.connection().await?;

        let order: OrderEntity = orders::table
            .find(order_id)
            .select(OrderEntity::as_select())
            .get_result(conn)
            .await?;

        let items: Vec<OrderItemEntity> = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .order_by(order_items::position)
            .select(OrderItemEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<OrderEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let updated: Option<OrderEntity> = diesel::update(
            orders::table
                .find(order_id)
                .filter(orders::status.eq(expected.to_string())),
        )
        .set((
            orders::status.eq(next.to_string()),
            orders::updated_at.eq(diesel::dsl::now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await
        .optional()?;

        match updated {
            Some(order) => Ok(order),
            None => {
                // Distinguish a missing order from a concurrent status change.
                let exists: i64 = orders::table
                    .find(order_id)
                    .count()
                    .get_result(conn)
                    .await?;
                if exists == 0 {
                    Err(RepositoryError::NotFound)
                } else {
                    Err(RepositoryError::Conflict(format!(
                        "Order {order_id} is no longer in status '{expected}'"
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl CatalogRepository for PgRepository {
    async fn list_products(&self) -> Result<Vec<ProductDetails>, RepositoryError> {
        let conn = &mut self.connection().await?;

        let products: Vec<ProductEntity> = products::table
            .order_by((products::sort_order.asc(), products::created_at.desc()))
            .select(ProductEntity::as_select())
            .get_results(conn)
            .await?;

        let product_ids: Vec<Uuid> = products.iter().map(|product| product.id).collect();
        let links = load_category_links(conn, product_ids).await?;

        Ok(group_categories(products, links))
    }

    async fn get_product(&self, product_id: Uuid) -> Result<ProductDetails, RepositoryError> {
        let conn = &mut self.connection().await?;

        let product = products::table
            .find(product_id)
            .select(ProductEntity::as_select())
            .get_result(conn)
            .await?;

        Ok(product_details(conn, product).await?)
    }

    async fn create_product(
        &self,
        product: CreateProductEntity,
        category_ids: Vec<Uuid>,
    ) -> Result<ProductDetails, RepositoryError> {
        let conn = &mut self.connection().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let product = diesel::insert_into(products::table)
                    .values(product)
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await?;

                replace_category_links(conn, product.id, category_ids).await?;

                Ok::<ProductDetails, RepositoryError>(product_details(conn, product).await?)
            })
        })
        .await
    }

    async fn update_product(
        &self,
        product_id: Uuid,
        changes: UpdateProductEntity,
        category_ids: Option<Vec<Uuid>>,
    ) -> Result<ProductDetails, RepositoryError> {
        let conn = &mut self.connection().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let product = diesel::update(products::table.find(product_id))
                    .set((&changes, products::updated_at.eq(diesel::dsl::now)))
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await?;

                if let Some(category_ids) = category_ids {
                    replace_category_links(conn, product_id, category_ids).await?;
                }

                Ok::<ProductDetails, RepositoryError>(product_details(conn, product).await?)
            })
        })
        .await
    }

    async fn delete_product(&self, product_id: Uuid) -> Result<ProductEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let product = diesel::delete(products::table.find(product_id))
            .returning(ProductEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(product)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryEntity>, RepositoryError> {
        let conn = &mut self.connection().await?;

        let categories = categories::table
            .filter(categories::is_active.eq(true))
            .order_by((categories::sort_order.asc(), categories::created_at.asc()))
            .select(CategoryEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(categories)
    }

    async fn create_category(
        &self,
        category: CreateCategoryEntity,
    ) -> Result<CategoryEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let category = diesel::insert_into(categories::table)
            .values(category)
            .returning(CategoryEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(category)
    }
}

#[async_trait]
impl MediaRepository for PgRepository {
    async fn list_media(&self, product_id: Uuid) -> Result<Vec<ProductMediaEntity>, RepositoryError> {
        let conn = &mut self.connection().await?;

        let media = product_media::table
            .filter(product_media::product_id.eq(product_id))
            .order_by(product_media::position.asc())
            .select(ProductMediaEntity::as_select())
            .get_results(conn)
            .await?;

        Ok(media)
    }

    async fn get_media(&self, media_id: Uuid) -> Result<ProductMediaEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let media = product_media::table
            .find(media_id)
            .select(ProductMediaEntity::as_select())
            .get_result(conn)
            .await?;

        Ok(media)
    }

    async fn create_media(
        &self,
        media: CreateProductMediaEntity,
    ) -> Result<ProductMediaEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                // Lock the product row so concurrent uploads get distinct positions.
                products::table
                    .find(media.product_id)
                    .select(products::id)
                    .for_update()
                    .get_result::<Uuid>(conn)
                    .await?;

                let max_position: Option<i32> = product_media::table
                    .filter(product_media::product_id.eq(media.product_id))
                    .select(diesel::dsl::max(product_media::position))
                    .get_result(conn)
                    .await?;

                let record = diesel::insert_into(product_media::table)
                    .values(CreateProductMediaEntity {
                        position: max_position.map_or(0, |max| max + 1),
                        ..media
                    })
                    .returning(ProductMediaEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok::<ProductMediaEntity, RepositoryError>(record)
            })
        })
        .await
    }

    async fn delete_media(&self, media_id: Uuid) -> Result<ProductMediaEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let media = diesel::delete(product_media::table.find(media_id))
            .returning(ProductMediaEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(media)
    }

    async fn set_primary(
        &self,
        media_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductMediaEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                // Serializes concurrent set-primary calls for the same product.
                products::table
                    .find(product_id)
                    .select(products::id)
                    .for_update()
                    .get_result::<Uuid>(conn)
                    .await?;

                let belongs: i64 = product_media::table
                    .find(media_id)
                    .filter(product_media::product_id.eq(product_id))
                    .count()
                    .get_result(conn)
                    .await?;
                if belongs == 0 {
                    return Err(RepositoryError::NotFound);
                }

                diesel::update(
                    product_media::table
                        .filter(product_media::product_id.eq(product_id))
                        .filter(product_media::is_primary.eq(true)),
                )
                .set(product_media::is_primary.eq(false))
                .execute(conn)
                .await?;

                let media = diesel::update(product_media::table.find(media_id))
                    .set(product_media::is_primary.eq(true))
                    .returning(ProductMediaEntity::as_returning())
                    .get_result(conn)
                    .await?;

                Ok::<ProductMediaEntity, RepositoryError>(media)
            })
        })
        .await
    }
}

#[async_trait]
impl SettingsRepository for PgRepository {
    async fn get_settings(&self) -> Result<SettingsEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let stored: Option<SettingsEntity> = settings::table
            .find(SettingsEntity::SINGLETON_ID)
            .select(SettingsEntity::as_select())
            .get_result(conn)
            .await
            .optional()?;

        Ok(stored.unwrap_or_default())
    }

    async fn save_settings(
        &self,
        new_settings: SaveSettingsEntity,
    ) -> Result<SettingsEntity, RepositoryError> {
        let conn = &mut self.connection().await?;

        let saved = diesel::insert_into(settings::table)
            .values((settings::id.eq(SettingsEntity::SINGLETON_ID), &new_settings))
            .on_conflict(settings::id)
            .do_update()
            .set((&new_settings, settings::updated_at.eq(diesel::dsl::now)))
            .returning(SettingsEntity::as_returning())
            .get_result(conn)
            .await?;

        Ok(saved)
    }
}
