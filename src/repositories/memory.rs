//! In-memory repository.
//!
//! All tables live behind one lock, which makes every operation atomic the
//! same way a transaction does in Postgres. Nothing survives a restart.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::{NewOrder, NotificationOutcome, OrderStatus},
    models::{
        CategoryEntity, CreateCategoryEntity, CreateProductEntity, CreateProductMediaEntity,
        OrderEntity, OrderItemEntity, OrderWithItems, ProductCategoryEntity, ProductDetails,
        ProductEntity, ProductMediaEntity, SaveSettingsEntity, SettingsEntity, UpdateProductEntity,
    },
    repositories::{
        CatalogRepository, MediaRepository, OrderRepository, RepositoryError, SettingsRepository,
    },
};

#[derive(Default)]
struct Tables {
    orders: Vec<OrderEntity>,
    order_items: Vec<OrderItemEntity>,
    products: Vec<ProductEntity>,
    product_media: Vec<ProductMediaEntity>,
    categories: Vec<CategoryEntity>,
    product_categories: Vec<ProductCategoryEntity>,
    settings: Option<SettingsEntity>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing timestamps keep "newest first" well defined even
    /// when two inserts land within the same clock tick.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn product_details(&self, product: &ProductEntity) -> ProductDetails {
        let mut categories: Vec<&CategoryEntity> = self
            .categories
            .iter()
            .filter(|category| {
                self.product_categories
                    .iter()
                    .any(|link| link.product_id == product.id && link.category_id == category.id)
            })
            .collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        ProductDetails {
            product: product.clone(),
            category_ids: categories.into_iter().map(|category| category.id).collect(),
        }
    }

    fn check_categories(&self, category_ids: &[Uuid]) -> Result<(), RepositoryError> {
        let known = category_ids
            .iter()
            .all(|id| self.categories.iter().any(|category| category.id == *id));
        if known {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn replace_categories(&mut self, product_id: Uuid, mut category_ids: Vec<Uuid>) {
        category_ids.sort();
        category_ids.dedup();

        self.product_categories
            .retain(|link| link.product_id != product_id);
        self.product_categories
            .extend(category_ids.into_iter().map(|category_id| ProductCategoryEntity {
                product_id,
                category_id,
            }));
    }

    fn order_with_items(&self, order: &OrderEntity) -> OrderWithItems {
        let mut items: Vec<OrderItemEntity> = self
            .order_items
            .iter()
            .filter(|item| item.order_id == order.id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.position);
        OrderWithItems {
            order: order.clone(),
            items,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for MemoryRepository {
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = tables.next_timestamp();

        let header = OrderEntity {
            id: Uuid::new_v4(),
            order_type: order.order_type.to_string(),
            customer_name: order.customer_name,
            phone: order.phone,
            telegram: order.telegram,
            city: order.city,
            delivery_method: order.delivery_method.to_string(),
            comment: order.comment,
            status: OrderStatus::New.to_string(),
            notification_status: None,
            notification_error: None,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItemEntity> = order
            .items
            .into_iter()
            .enumerate()
            .map(|(position, item)| OrderItemEntity {
                id: Uuid::new_v4(),
                order_id: header.id,
                position: position as i32,
                product_code: item.product_code,
                color: item.color,
                qty: item.qty,
                price_snapshot: item.price_snapshot,
            })
            .collect();

        tables.orders.push(header.clone());
        tables.order_items.extend(items.iter().cloned());

        Ok(OrderWithItems {
            order: header,
            items,
        })
    }

    async fn record_notification(
        &self,
        order_id: Uuid,
        outcome: &NotificationOutcome,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = tables.next_timestamp();

        let order = tables
            .orders
            .iter_mut()
            .find(|order| order.id == order_id && order.notification_status.is_none())
            .ok_or(RepositoryError::NotFound)?;

        order.notification_status = Some(outcome.status().to_string());
        order.notification_error = outcome.error().map(str::to_string);
        order.updated_at = now;
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let tables = self.tables.read().await;

        let mut orders: Vec<&OrderEntity> = tables.orders.iter().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(orders
            .into_iter()
            .map(|order| tables.order_with_items(order))
            .collect())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, RepositoryError> {
        let tables = self.tables.read().await;

        tables
            .orders
            .iter()
            .find(|order| order.id == order_id)
            .map(|order| tables.order_with_items(order))
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<OrderEntity, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = tables.next_timestamp();

        let order = tables
            .orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or(RepositoryError::NotFound)?;

        if order.status != expected.as_ref() {
            return Err(RepositoryError::Conflict(format!(
                "Order {order_id} is no longer in status '{expected}'"
            )));
        }

        order.status = next.to_string();
        order.updated_at = now;
        Ok(order.clone())
    }
}

#[async_trait]
impl CatalogRepository for MemoryRepository {
    async fn list_products(&self) -> Result<Vec<ProductDetails>, RepositoryError> {
        let tables = self.tables.read().await;

        let mut products: Vec<&ProductEntity> = tables.products.iter().collect();
        products.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(products
            .into_iter()
            .map(|product| tables.product_details(product))
            .collect())
    }

    async fn get_product(&self, product_id: Uuid) -> Result<ProductDetails, RepositoryError> {
        let tables = self.tables.read().await;

        tables
            .products
            .iter()
            .find(|product| product.id == product_id)
            .map(|product| tables.product_details(product))
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_product(
        &self,
        product: CreateProductEntity,
        category_ids: Vec<Uuid>,
    ) -> Result<ProductDetails, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables
            .products
            .iter()
            .any(|p| p.code == product.code || p.slug == product.slug)
        {
            return Err(RepositoryError::Conflict(format!(
                "Product with code '{}' or slug '{}' already exists",
                product.code, product.slug
            )));
        }
        tables.check_categories(&category_ids)?;

        let now = tables.next_timestamp();
        let product = ProductEntity {
            id: Uuid::new_v4(),
            code: product.code,
            slug: product.slug,
            name_uk: product.name_uk,
            name_ru: product.name_ru,
            description_uk: product.description_uk,
            description_ru: product.description_ru,
            material_uk: product.material_uk,
            material_ru: product.material_ru,
            size_text: product.size_text,
            colors_json: product.colors_json,
            price_retail: product.price_retail,
            price_drop: product.price_drop,
            stock_status: product.stock_status,
            is_new: product.is_new,
            is_hit: product.is_hit,
            is_sale: product.is_sale,
            is_active: product.is_active,
            sort_order: product.sort_order,
            created_at: now,
            updated_at: now,
        };
        tables.products.push(product.clone());
        tables.replace_categories(product.id, category_ids);

        Ok(tables.product_details(&product))
    }

    async fn update_product(
        &self,
        product_id: Uuid,
        changes: UpdateProductEntity,
        category_ids: Option<Vec<Uuid>>,
    ) -> Result<ProductDetails, RepositoryError> {
        let mut tables = self.tables.write().await;

        if let Some(slug) = &changes.slug {
            if tables
                .products
                .iter()
                .any(|p| p.id != product_id && &p.slug == slug)
            {
                return Err(RepositoryError::Conflict(format!(
                    "Product with slug '{slug}' already exists"
                )));
            }
        }
        if let Some(category_ids) = &category_ids {
            tables.check_categories(category_ids)?;
        }

        let now = tables.next_timestamp();
        let product = tables
            .products
            .iter_mut()
            .find(|product| product.id == product_id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(slug) = changes.slug {
            product.slug = slug;
        }
        if let Some(name_uk) = changes.name_uk {
            product.name_uk = name_uk;
        }
        if let Some(name_ru) = changes.name_ru {
            product.name_ru = Some(name_ru);
        }
        if let Some(description_uk) = changes.description_uk {
            product.description_uk = description_uk;
        }
        if let Some(description_ru) = changes.description_ru {
            product.description_ru = Some(description_ru);
        }
        if let Some(material_uk) = changes.material_uk {
            product.material_uk = material_uk;
        }
        if let Some(material_ru) = changes.material_ru {
            product.material_ru = Some(material_ru);
        }
        if let Some(size_text) = changes.size_text {
            product.size_text = size_text;
        }
        if let Some(colors_json) = changes.colors_json {
            product.colors_json = colors_json;
        }
        if let Some(price_retail) = changes.price_retail {
            product.price_retail = price_retail;
        }
        if let Some(price_drop) = changes.price_drop {
            product.price_drop = price_drop;
        }
        if let Some(stock_status) = changes.stock_status {
            product.stock_status = stock_status;
        }
        if let Some(is_new) = changes.is_new {
            product.is_new = is_new;
        }
        if let Some(is_hit) = changes.is_hit {
            product.is_hit = is_hit;
        }
        if let Some(is_sale) = changes.is_sale {
            product.is_sale = is_sale;
        }
        if let Some(is_active) = changes.is_active {
            product.is_active = is_active;
        }
        if let Some(sort_order) = changes.sort_order {
            product.sort_order = sort_order;
        }
        product.updated_at = now;
        let product = product.clone();

        if let Some(category_ids) = category_ids {
            tables.replace_categories(product_id, category_ids);
        }

        Ok(tables.product_details(&product))
    }

    async fn delete_product(&self, product_id: Uuid) -> Result<ProductEntity, RepositoryError> {
        let mut tables = self.tables.write().await;

        let idx = tables
            .products
            .iter()
            .position(|product| product.id == product_id)
            .ok_or(RepositoryError::NotFound)?;

        tables.product_media.retain(|media| media.product_id != product_id);
        tables
            .product_categories
            .retain(|link| link.product_id != product_id);
        Ok(tables.products.remove(idx))
    }

    async fn list_categories(&self) -> Result<Vec<CategoryEntity>, RepositoryError> {
        let tables = self.tables.read().await;

        let mut categories: Vec<CategoryEntity> = tables
            .categories
            .iter()
            .filter(|category| category.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(categories)
    }

    async fn create_category(
        &self,
        category: CreateCategoryEntity,
    ) -> Result<CategoryEntity, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables.categories.iter().any(|c| c.slug == category.slug) {
            return Err(RepositoryError::Conflict(format!(
                "Category with slug '{}' already exists",
                category.slug
            )));
        }

        let category = CategoryEntity {
            id: Uuid::new_v4(),
            slug: category.slug,
            name_uk: category.name_uk,
            name_ru: category.name_ru,
            is_active: category.is_active,
            sort_order: category.sort_order,
            created_at: tables.next_timestamp(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }
}

#[async_trait]
impl MediaRepository for MemoryRepository {
    async fn list_media(&self, product_id: Uuid) -> Result<Vec<ProductMediaEntity>, RepositoryError> {
        let tables = self.tables.read().await;

        let mut media: Vec<ProductMediaEntity> = tables
            .product_media
            .iter()
            .filter(|media| media.product_id == product_id)
            .cloned()
            .collect();
        media.sort_by_key(|media| media.position);
        Ok(media)
    }

    async fn get_media(&self, media_id: Uuid) -> Result<ProductMediaEntity, RepositoryError> {
        let tables = self.tables.read().await;

        tables
            .product_media
            .iter()
            .find(|media| media.id == media_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_media(
        &self,
        media: CreateProductMediaEntity,
    ) -> Result<ProductMediaEntity, RepositoryError> {
        let mut tables = self.tables.write().await;

        if !tables.products.iter().any(|p| p.id == media.product_id) {
            return Err(RepositoryError::NotFound);
        }

        let position = tables
            .product_media
            .iter()
            .filter(|m| m.product_id == media.product_id)
            .map(|m| m.position)
            .max()
            .map_or(0, |max| max + 1);

        let record = ProductMediaEntity {
            id: Uuid::new_v4(),
            product_id: media.product_id,
            media_type: media.media_type,
            url: media.url,
            storage_path: media.storage_path,
            position,
            is_primary: media.is_primary,
            created_at: tables.next_timestamp(),
        };
        tables.product_media.push(record.clone());
        Ok(record)
    }

    async fn delete_media(&self, media_id: Uuid) -> Result<ProductMediaEntity, RepositoryError> {
        let mut tables = self.tables.write().await;

        let idx = tables
            .product_media
            .iter()
            .position(|media| media.id == media_id)
            .ok_or(RepositoryError::NotFound)?;

        Ok(tables.product_media.remove(idx))
    }

    async fn set_primary(
        &self,
        media_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductMediaEntity, RepositoryError> {
        let mut tables = self.tables.write().await;

        if !tables
            .product_media
            .iter()
            .any(|media| media.id == media_id && media.product_id == product_id)
        {
            return Err(RepositoryError::NotFound);
        }

        let mut primary = None;
        for media in tables
            .product_media
            .iter_mut()
            .filter(|media| media.product_id == product_id)
        {
            media.is_primary = media.id == media_id;
            if media.is_primary {
                primary = Some(media.clone());
            }
        }

        primary.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl SettingsRepository for MemoryRepository {
    async fn get_settings(&self) -> Result<SettingsEntity, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.settings.clone().unwrap_or_default())
    }

    async fn save_settings(
        &self,
        settings: SaveSettingsEntity,
    ) -> Result<SettingsEntity, RepositoryError> {
        let mut tables = self.tables.write().await;

        let saved = SettingsEntity {
            id: SettingsEntity::SINGLETON_ID,
            brand_name: settings.brand_name,
            phone: settings.phone,
            instagram_url: settings.instagram_url,
            facebook_url: settings.facebook_url,
            telegram_url: settings.telegram_url,
            default_locale: settings.default_locale,
            updated_at: tables.next_timestamp(),
        };
        tables.settings = Some(saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryMethod, NewOrderItem, OrderType};

    fn new_order(items: usize) -> NewOrder {
        NewOrder {
            order_type: OrderType::Wholesale,
            customer_name: "Iryna".into(),
            phone: "+380671234567".into(),
            telegram: Some("@iryna".into()),
            city: Some("Lviv".into()),
            delivery_method: DeliveryMethod::Ukr,
            comment: None,
            items: (0..items)
                .map(|i| NewOrderItem {
                    product_code: format!("BAG-{i:03}"),
                    color: "beige".into(),
                    qty: 2,
                    price_snapshot: 500.0,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn orders_are_listed_newest_first_with_items_in_submission_order() {
        let repo = MemoryRepository::new();
        let first = repo.create_order(new_order(1)).await.unwrap();
        let second = repo.create_order(new_order(3)).await.unwrap();

        let listed = repo.list_orders().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order.id, second.order.id);
        assert_eq!(listed[1].order.id, first.order.id);
        assert_eq!(
            listed[0]
                .items
                .iter()
                .map(|i| i.product_code.as_str())
                .collect::<Vec<_>>(),
            vec!["BAG-000", "BAG-001", "BAG-002"]
        );
    }

    #[tokio::test]
    async fn notification_outcome_is_written_once() {
        let repo = MemoryRepository::new();
        let order = repo.create_order(new_order(1)).await.unwrap();

        repo.record_notification(order.order.id, &NotificationOutcome::failed("HTTP 502"))
            .await
            .unwrap();
        let second = repo
            .record_notification(order.order.id, &NotificationOutcome::Success)
            .await;
        assert!(matches!(second, Err(RepositoryError::NotFound)));

        let stored = repo.get_order(order.order.id).await.unwrap();
        assert_eq!(
            stored.order.notification_outcome(),
            Some(NotificationOutcome::failed("HTTP 502"))
        );
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let repo = MemoryRepository::new();
        let order = repo.create_order(new_order(1)).await.unwrap();

        let updated = repo
            .update_status(order.order.id, OrderStatus::New, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(updated.status, "confirmed");

        let stale = repo
            .update_status(order.order.id, OrderStatus::New, OrderStatus::Canceled)
            .await;
        assert!(matches!(stale, Err(RepositoryError::Conflict(_))));
    }

    fn new_product(code: &str) -> CreateProductEntity {
        CreateProductEntity {
            code: code.into(),
            slug: code.to_lowercase(),
            name_uk: "Сумка".into(),
            name_ru: None,
            description_uk: String::new(),
            description_ru: None,
            material_uk: String::new(),
            material_ru: None,
            size_text: String::new(),
            colors_json: serde_json::json!([]),
            price_retail: 1500.0,
            price_drop: 1200.0,
            stock_status: "in_stock".into(),
            is_new: false,
            is_hit: false,
            is_sale: false,
            is_active: true,
            sort_order: 0,
        }
    }

    fn new_category(slug: &str, sort_order: i32) -> CreateCategoryEntity {
        CreateCategoryEntity {
            slug: slug.into(),
            name_uk: slug.into(),
            name_ru: None,
            is_active: true,
            sort_order,
        }
    }

    #[tokio::test]
    async fn saving_categories_replaces_the_previous_links() {
        let repo = MemoryRepository::new();
        let totes = repo.create_category(new_category("totes", 2)).await.unwrap();
        let leather = repo.create_category(new_category("leather", 1)).await.unwrap();
        let sale = repo.create_category(new_category("sale", 3)).await.unwrap();

        let created = repo
            .create_product(new_product("BAG-001"), vec![totes.id, leather.id, totes.id])
            .await
            .unwrap();
        assert_eq!(created.category_ids, vec![leather.id, totes.id]);

        let updated = repo
            .update_product(
                created.product.id,
                UpdateProductEntity::default(),
                Some(vec![sale.id]),
            )
            .await
            .unwrap();
        assert_eq!(updated.category_ids, vec![sale.id]);

        let untouched = repo
            .update_product(
                created.product.id,
                UpdateProductEntity {
                    is_hit: Some(true),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(untouched.product.is_hit);
        assert_eq!(untouched.category_ids, vec![sale.id]);
    }

    #[tokio::test]
    async fn unknown_category_stores_nothing() {
        let repo = MemoryRepository::new();

        let result = repo
            .create_product(new_product("BAG-001"), vec![Uuid::new_v4()])
            .await;

        assert!(matches!(result, Err(RepositoryError::NotFound)));
        assert!(repo.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inactive_categories_are_not_listed() {
        let repo = MemoryRepository::new();
        repo.create_category(new_category("second", 2)).await.unwrap();
        repo.create_category(new_category("first", 1)).await.unwrap();
        repo.create_category(CreateCategoryEntity {
            is_active: false,
            ..new_category("hidden", 0)
        })
        .await
        .unwrap();

        let slugs: Vec<String> = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|category| category.slug)
            .collect();
        assert_eq!(slugs, vec!["first", "second"]);
    }
}
