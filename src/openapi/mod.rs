use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Registers the bearer scheme referenced by secured paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Restaurant API",
        version = "1.0.0",
        description = r#"
# Restaurant API

Ordering, table reservations, reviews and dashboards for a single restaurant.

## Sessions

Carts and reservation holds live in a server-side session. Send the
`x-session-id` header returned by the first response on every following
request; a new id is issued when the header is missing.

## Authentication

Customer, staff and admin endpoints take a JWT access token from `/auth/login`:

```
Authorization: Bearer <access-token>
```

## Errors

```json
{
  "error": "Bad Request",
  "message": "Validation error: Reservations are accepted from 15:00 to 23:00",
  "request_id": "3f0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100).
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and tokens"),
        (name = "customer", description = "The signed-in customer's account"),
        (name = "home", description = "Home page content"),
        (name = "tables", description = "Dining room tables"),
        (name = "menu", description = "Public menu"),
        (name = "menu-admin", description = "Menu and promotion management"),
        (name = "reservations", description = "Booking flow"),
        (name = "cart", description = "Cart and checkout"),
        (name = "reviews", description = "Guest reviews"),
        (name = "reviews-admin", description = "Review moderation"),
        (name = "staff", description = "Front-of-house dashboards"),
        (name = "admin", description = "Administration")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,

        crate::handlers::customer::get_profile,
        crate::handlers::customer::update_profile,
        crate::handlers::customer::overview,
        crate::handlers::customer::my_orders,
        crate::handlers::customer::my_order,
        crate::handlers::customer::my_reservations,
        crate::handlers::customer::cancel_reservation,
        crate::handlers::customer::modify_reservation,

        crate::handlers::home::home,

        crate::handlers::tables::list_tables,
        crate::handlers::tables::create_table,
        crate::handlers::tables::regenerate_qr,

        crate::handlers::menu::list_categories,
        crate::handlers::menu::category_sections,
        crate::handlers::menu::get_item,
        crate::handlers::menu::active_promotions,
        crate::handlers::menu::search_items,
        crate::handlers::menu::create_item,
        crate::handlers::menu::update_item,
        crate::handlers::menu::toggle_item,
        crate::handlers::menu::delete_item,
        crate::handlers::menu::create_category,
        crate::handlers::menu::create_subcategory,
        crate::handlers::menu::list_promotions,
        crate::handlers::menu::create_promotion,
        crate::handlers::menu::delete_promotion,

        crate::handlers::reservations::check_availability,
        crate::handlers::reservations::hold,
        crate::handlers::reservations::current_hold,
        crate::handlers::reservations::release_hold,
        crate::handlers::reservations::confirm,

        crate::handlers::cart::get_cart,
        crate::handlers::cart::sync_cart,
        crate::handlers::cart::set_fulfilment,
        crate::handlers::cart::checkout,

        crate::handlers::reviews::list_reviews,
        crate::handlers::reviews::submit_review,
        crate::handlers::reviews::mark_helpful,
        crate::handlers::reviews::search_reviews,
        crate::handlers::reviews::verify_review,
        crate::handlers::reviews::delete_review,
        crate::handlers::reviews::review_stats,

        crate::handlers::staff::overview,
        crate::handlers::staff::orders,
        crate::handlers::staff::reservations,
        crate::handlers::staff::update_order_status,
        crate::handlers::staff::update_reservation_status,

        crate::handlers::admin::overview,
        crate::handlers::admin::search_orders,
        crate::handlers::admin::get_order,
        crate::handlers::admin::advance_order,
        crate::handlers::admin::cancel_order,
        crate::handlers::admin::search_reservations,
        crate::handlers::admin::reservation_action,
        crate::handlers::admin::customers,
        crate::handlers::admin::staff,
        crate::handlers::admin::change_role,
    ),
    components(schemas(crate::errors::ErrorResponse, crate::ResponseMeta))
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Restaurant API"));
        assert!(json.contains("/api/v1/reservations/availability"));
        assert!(json.contains("/api/v1/checkout"));
        assert!(json.contains("\"Bearer\""));
    }
}
