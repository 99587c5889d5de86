use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    entities::{menu_category, menu_item, menu_subcategory, order_item, promotion},
    errors::ServiceError,
    services::{icontains, pricing, today},
};

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_discount(discount: &Decimal) -> Result<(), ValidationError> {
    if discount.is_sign_negative() || *discount > Decimal::ONE {
        let mut err = ValidationError::new("discount_percent");
        err.message = Some("Discount must be a fraction between 0 and 1".into());
        return Err(err);
    }
    Ok(())
}

/// Lower-case, dash-separated form of a category name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
    /// Derived from the name when omitted
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateSubcategoryRequest {
    pub category_id: i32,
    #[validate(length(min = 1, max = 100, message = "Subcategory name is required"))]
    pub name: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    pub subcategory_id: i32,
    #[validate(length(min = 1, max = 100, message = "Item name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub subcategory_id: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreatePromotionRequest {
    pub item_id: i32,
    #[validate(length(min = 1, max = 100, message = "Promotion title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fraction in `[0, 1]`
    #[validate(custom = "validate_discount")]
    pub discount_percent: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MenuItemSearch {
    /// Matches name or description
    pub q: Option<String>,
    pub category_id: Option<i32>,
    pub available: Option<bool>,
}

/// A menu item with today's price.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuItemView {
    #[serde(flatten)]
    pub item: menu_item::Model,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub current_price: Decimal,
    pub promotion: Option<promotion::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuSection {
    /// Upper-cased subcategory name
    pub name: String,
    pub items: Vec<MenuItemView>,
}

fn view(item: menu_item::Model, promotions: &[promotion::Model], day: NaiveDate) -> MenuItemView {
    let (current_price, applied) = pricing::resolve_unit_price(item.price, promotions, day);
    let promotion = applied.and_then(|id| promotions.iter().find(|p| p.id == id).cloned());
    MenuItemView {
        item,
        current_price,
        promotion,
    }
}

#[derive(Clone)]
pub struct MenuService {
    db: Arc<DatabaseConnection>,
}

impl MenuService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn promotions_by_item(
        &self,
        item_ids: Vec<i32>,
    ) -> Result<HashMap<i32, Vec<promotion::Model>>, ServiceError> {
        let mut grouped: HashMap<i32, Vec<promotion::Model>> = HashMap::new();
        if item_ids.is_empty() {
            return Ok(grouped);
        }
        for promo in promotion::Entity::find()
            .filter(promotion::Column::ItemId.is_in(item_ids))
            .all(&*self.db)
            .await?
        {
            grouped.entry(promo.item_id).or_default().push(promo);
        }
        Ok(grouped)
    }

    async fn views(&self, items: Vec<menu_item::Model>) -> Result<Vec<MenuItemView>, ServiceError> {
        let promotions = self
            .promotions_by_item(items.iter().map(|i| i.id).collect())
            .await?;
        let day = today();
        Ok(items
            .into_iter()
            .map(|item| {
                let promos = promotions.get(&item.id).map(Vec::as_slice).unwrap_or(&[]);
                view(item, promos, day)
            })
            .collect())
    }

    pub async fn list_categories(&self) -> Result<Vec<menu_category::Model>, ServiceError> {
        Ok(menu_category::Entity::find()
            .order_by_asc(menu_category::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Available items of a category grouped by subcategory, omitting empty groups.
    #[instrument(skip(self))]
    pub async fn sections(&self, slug: &str) -> Result<Vec<MenuSection>, ServiceError> {
        let slug = slug.trim().to_lowercase();
        let category = menu_category::Entity::find()
            .filter(menu_category::Column::Slug.eq(slug.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu category '{}' not found", slug)))?;

        let subcategories = menu_subcategory::Entity::find()
            .filter(menu_subcategory::Column::CategoryId.eq(category.id))
            .order_by_asc(menu_subcategory::Column::Id)
            .all(&*self.db)
            .await?;
        if subcategories.is_empty() {
            return Ok(Vec::new());
        }

        let items = menu_item::Entity::find()
            .filter(
                menu_item::Column::SubcategoryId
                    .is_in(subcategories.iter().map(|s| s.id).collect::<Vec<_>>()),
            )
            .filter(menu_item::Column::IsAvailable.eq(true))
            .order_by_asc(menu_item::Column::Id)
            .all(&*self.db)
            .await?;

        let mut by_subcategory: HashMap<i32, Vec<MenuItemView>> = HashMap::new();
        for item_view in self.views(items).await? {
            by_subcategory
                .entry(item_view.item.subcategory_id)
                .or_default()
                .push(item_view);
        }

        Ok(subcategories
            .into_iter()
            .filter_map(|sub| {
                by_subcategory.remove(&sub.id).map(|items| MenuSection {
                    name: sub.name.to_uppercase(),
                    items,
                })
            })
            .collect())
    }

    pub async fn get_item(&self, id: i32) -> Result<MenuItemView, ServiceError> {
        let item = menu_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))?;
        let mut views = self.views(vec![item]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Menu item view missing".into()))
    }

    /// Admin listing with search over name or description.
    pub async fn search_items(
        &self,
        params: &MenuItemSearch,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<MenuItemView>, u64), ServiceError> {
        let mut query = menu_item::Entity::find();
        if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(menu_item::Column::Name, q))
                    .add(icontains(menu_item::Column::Description, q)),
            );
        }
        if let Some(category_id) = params.category_id {
            let sub_ids: Vec<i32> = menu_subcategory::Entity::find()
                .filter(menu_subcategory::Column::CategoryId.eq(category_id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect();
            query = query.filter(menu_item::Column::SubcategoryId.is_in(sub_ids));
        }
        if let Some(available) = params.available {
            query = query.filter(menu_item::Column::IsAvailable.eq(available));
        }

        let paginator = query
            .order_by_asc(menu_item::Column::Name)
            .order_by_asc(menu_item::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((self.views(items).await?, total))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<menu_category::Model, ServiceError> {
        request.validate()?;
        let name = request.name.trim().to_string();
        let slug = slugify(request.slug.as_deref().unwrap_or(&name));
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "Category slug must contain letters or digits".into(),
            ));
        }

        let clash = menu_category::Entity::find()
            .filter(
                Condition::any()
                    .add(menu_category::Column::Name.eq(name.as_str()))
                    .add(menu_category::Column::Slug.eq(slug.as_str())),
            )
            .one(&*self.db)
            .await?;
        if clash.is_some() {
            warn!(%slug, "Duplicate menu category");
            return Err(ServiceError::Conflict(format!(
                "A category named '{}' already exists",
                name
            )));
        }

        let category = menu_category::ActiveModel {
            name: Set(name),
            slug: Set(slug),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create menu category");
            ServiceError::DatabaseError(e)
        })?;
        info!(category_id = category.id, slug = %category.slug, "Menu category created");
        Ok(category)
    }

    pub async fn create_subcategory(
        &self,
        request: CreateSubcategoryRequest,
    ) -> Result<menu_subcategory::Model, ServiceError> {
        request.validate()?;
        menu_category::Entity::find_by_id(request.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Menu category {} not found", request.category_id))
            })?;

        let subcategory = menu_subcategory::ActiveModel {
            category_id: Set(request.category_id),
            name: Set(request.name.trim().to_string()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;
        info!(subcategory_id = subcategory.id, "Menu subcategory created");
        Ok(subcategory)
    }

    async fn ensure_subcategory(&self, id: i32) -> Result<(), ServiceError> {
        menu_subcategory::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Menu subcategory {} not found", id)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateMenuItemRequest,
    ) -> Result<menu_item::Model, ServiceError> {
        request.validate()?;
        self.ensure_subcategory(request.subcategory_id).await?;

        let item = menu_item::ActiveModel {
            subcategory_id: Set(request.subcategory_id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.trim().to_string()),
            price: Set(pricing::round_money(request.price)),
            image_url: Set(request.image_url),
            is_available: Set(request.is_available),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create menu item");
            ServiceError::DatabaseError(e)
        })?;
        info!(item_id = item.id, price = %item.price, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        id: i32,
        request: UpdateMenuItemRequest,
    ) -> Result<menu_item::Model, ServiceError> {
        request.validate()?;
        let current = menu_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))?;

        let mut active: menu_item::ActiveModel = current.into();
        if let Some(subcategory_id) = request.subcategory_id {
            self.ensure_subcategory(subcategory_id).await?;
            active.subcategory_id = Set(subcategory_id);
        }
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(price) = request.price {
            active.price = Set(pricing::round_money(price));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url).filter(|u| !u.trim().is_empty()));
        }
        if let Some(is_available) = request.is_available {
            active.is_available = Set(is_available);
        }

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(item_id = id, error = %e, "Failed to update menu item");
            ServiceError::DatabaseError(e)
        })?;
        info!(item_id = id, "Menu item updated");
        Ok(updated)
    }

    /// Flips `is_available`
    pub async fn toggle_availability(&self, id: i32) -> Result<menu_item::Model, ServiceError> {
        let current = menu_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))?;
        let available = !current.is_available;
        let mut active: menu_item::ActiveModel = current.into();
        active.is_available = Set(available);
        let updated = active.update(&*self.db).await?;
        info!(item_id = id, available, "Menu item availability toggled");
        Ok(updated)
    }

    /// Deletes an item that no order line references.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i32) -> Result<(), ServiceError> {
        menu_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))?;

        let referenced = order_item::Entity::find()
            .filter(order_item::Column::ItemId.eq(id))
            .count(&*self.db)
            .await?;
        if referenced > 0 {
            warn!(item_id = id, referenced, "Refusing to delete ordered menu item");
            return Err(ServiceError::Conflict(format!(
                "Menu item {} appears on {} order line(s); mark it unavailable instead",
                id, referenced
            )));
        }

        menu_item::Entity::delete_by_id(id).exec(&*self.db).await?;
        info!(item_id = id, "Menu item deleted");
        Ok(())
    }

    pub async fn list_promotions(&self) -> Result<Vec<promotion::Model>, ServiceError> {
        Ok(promotion::Entity::find()
            .order_by_desc(promotion::Column::StartDate)
            .order_by_asc(promotion::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Promotions covering `day`
    pub async fn active_promotions(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<promotion::Model>, ServiceError> {
        Ok(promotion::Entity::find()
            .filter(promotion::Column::StartDate.lte(day))
            .filter(promotion::Column::EndDate.gte(day))
            .order_by_desc(promotion::Column::DiscountPercent)
            .order_by_asc(promotion::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request), fields(item_id = request.item_id))]
    pub async fn create_promotion(
        &self,
        request: CreatePromotionRequest,
    ) -> Result<promotion::Model, ServiceError> {
        request.validate()?;
        if request.end_date < request.start_date {
            return Err(ServiceError::ValidationError(
                "Promotion end date cannot be before its start date".into(),
            ));
        }
        menu_item::Entity::find_by_id(request.item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Menu item {} not found", request.item_id))
            })?;

        let promo = promotion::ActiveModel {
            item_id: Set(request.item_id),
            title: Set(request.title.trim().to_string()),
            description: Set(request.description.trim().to_string()),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            discount_percent: Set(request.discount_percent),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;
        info!(promotion_id = promo.id, discount = %promo.discount_percent, "Promotion created");
        Ok(promo)
    }

    pub async fn delete_promotion(&self, id: i32) -> Result<(), ServiceError> {
        let result = promotion::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Promotion {} not found", id)));
        }
        info!(promotion_id = id, "Promotion deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Main Course"), "main-course");
        assert_eq!(slugify("  Beverages & Drinks! "), "beverages-drinks");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn negative_prices_are_rejected() {
        let request = CreateMenuItemRequest {
            subcategory_id: 1,
            name: "Dholl puri".into(),
            description: String::new(),
            price: dec!(-1.00),
            image_url: None,
            is_available: true,
        };
        assert!(request.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn discounts_must_be_fractions() {
        let mut request = CreatePromotionRequest {
            item_id: 1,
            title: "Happy hour".into(),
            description: String::new(),
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 1, 31).unwrap(),
            discount_percent: dec!(1.5),
        };
        assert!(request.validate().is_err());
        request.discount_percent = dec!(0.25);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn view_reports_the_applied_promotion() {
        let day = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
        let item = menu_item::Model {
            id: 3,
            subcategory_id: 1,
            name: "Mine frit".into(),
            description: String::new(),
            price: dec!(20.00),
            image_url: None,
            is_available: true,
        };
        let promo = promotion::Model {
            id: 9,
            item_id: 3,
            title: "Noodle week".into(),
            description: String::new(),
            start_date: day,
            end_date: day,
            discount_percent: dec!(0.5),
        };
        let v = view(item, &[promo], day);
        assert_eq!(v.current_price, dec!(10.00));
        assert_eq!(v.promotion.map(|p| p.id), Some(9));
    }
}
