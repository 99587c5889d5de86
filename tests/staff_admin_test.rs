//! Kitchen status changes, admin order and account management, menu
//! administration and the dashboards built on top of them.

mod common;

use axum::http::Method;
use common::{money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

/// Syncs a one-line cart and pays for it at the counter; returns the order id.
async fn paid_order(app: &TestApp, item_id: i32, quantity: i32) -> i64 {
    let cart = app
        .send(
            Method::PUT,
            "/api/v1/cart",
            Some(json!({ "items": [{ "item_id": item_id, "quantity": quantity }] })),
            None,
            None,
        )
        .await;
    let session = cart.session.clone().expect("session");
    let paid = app
        .send(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "order_type": "dine-in", "payment_method": "juice" })),
            None,
            Some(&session),
        )
        .await;
    assert_eq!(paid.status, 200, "{}", paid.body);
    paid.data()["order"]["id"].as_i64().expect("order id")
}

#[tokio::test]
async fn staff_follow_the_kitchen_flow_and_cannot_skip_back() {
    let app = TestApp::new().await;
    let menu = app.seed_menu(&[("Burger", dec!(250.00))]).await;
    let staff = app.staff_token().await;
    let order_id = paid_order(&app, menu[0].id, 1).await;
    let uri = format!("/api/v1/staff/orders/{order_id}/status");

    let same = app.put(&uri, json!({ "status": "preparing" }), Some(&staff)).await;
    assert_eq!(same.status, 400);

    let unknown = app.put(&uri, json!({ "status": "flying" }), Some(&staff)).await;
    assert_eq!(unknown.status, 400);

    let done = app.put(&uri, json!({ "status": "completed" }), Some(&staff)).await;
    assert_eq!(done.status, 200, "{}", done.body);
    assert_eq!(done.data()["status"], "completed");

    let back = app.put(&uri, json!({ "status": "pending" }), Some(&staff)).await;
    assert_eq!(back.status, 400);
}

#[tokio::test]
async fn admin_advances_and_cancels_orders() {
    let app = TestApp::new().await;
    let menu = app.seed_menu(&[("Burger", dec!(250.00))]).await;
    let admin = app.admin_token().await;
    let first = paid_order(&app, menu[0].id, 1).await;
    let second = paid_order(&app, menu[0].id, 2).await;

    let advanced = app
        .post(&format!("/api/v1/admin/orders/{first}/advance"), json!({}), Some(&admin))
        .await;
    assert_eq!(advanced.status, 200, "{}", advanced.body);
    assert_eq!(advanced.data()["status"], "completed");

    let again = app
        .post(&format!("/api/v1/admin/orders/{first}/advance"), json!({}), Some(&admin))
        .await;
    assert_eq!(again.status, 400);

    let cancelled = app
        .post(&format!("/api/v1/admin/orders/{second}/cancel"), json!({}), Some(&admin))
        .await;
    assert_eq!(cancelled.data()["status"], "cancelled");

    let search = app
        .get("/api/v1/admin/orders?status=cancelled", Some(&admin))
        .await;
    assert_eq!(search.status, 200, "{}", search.body);
    assert_eq!(search.data()["total"], 1);

    let by_number = app
        .get(
            &format!("/api/v1/admin/orders?q=ORD-{:03}", first),
            Some(&admin),
        )
        .await;
    assert_eq!(by_number.data()["items"][0]["id"], first);

    let missing = app.get("/api/v1/admin/orders/4242", Some(&admin)).await;
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn admin_overview_counts_completed_revenue_and_popular_items() {
    let app = TestApp::new().await;
    let menu = app
        .seed_menu(&[("Burger", dec!(250.00)), ("Fries", dec!(80.00))])
        .await;
    let admin = app.admin_token().await;

    let burgers = paid_order(&app, menu[0].id, 2).await;
    paid_order(&app, menu[1].id, 5).await;
    paid_order(&app, menu[1].id, 1).await;
    app.post(&format!("/api/v1/admin/orders/{burgers}/advance"), json!({}), Some(&admin))
        .await;

    let overview = app.get("/api/v1/admin/overview", Some(&admin)).await;
    assert_eq!(overview.status, 200, "{}", overview.body);
    let data = overview.data();
    assert_eq!(money(&data["total_revenue"]), dec!(500.00));
    assert_eq!(data["active_orders"], 2);
    assert_eq!(data["weekly_revenue"].as_array().map(Vec::len), Some(7));
    // Ranked by order lines: fries appear on two orders
    assert_eq!(data["popular_items"][0]["id"], menu[1].id);
    assert_eq!(data["popular_items"][0]["order_count"], 2);
}

#[tokio::test]
async fn admin_manages_staff_roles_but_not_their_own() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.customer_token("future.staff@gmail.com").await;

    let customers = app
        .get("/api/v1/admin/customers?q=future", Some(&admin))
        .await;
    assert_eq!(customers.data()["total"], 1);
    let customer_id = customers.data()["items"][0]["user"]["id"]
        .as_str()
        .expect("customer id")
        .to_string();
    assert_eq!(customers.data()["items"][0]["tier"], "Regular");

    let promoted = app
        .post(
            &format!("/api/v1/admin/staff/{customer_id}/role"),
            json!({ "action": "make_staff" }),
            Some(&admin),
        )
        .await;
    assert_eq!(promoted.status, 200, "{}", promoted.body);
    assert_eq!(promoted.data()["role"], "staff");

    let staff = app.get("/api/v1/admin/staff", Some(&admin)).await;
    assert_eq!(staff.data()["total"], 2);

    let admins = app.get("/api/v1/admin/staff?q=admin", Some(&admin)).await;
    let admin_id = admins.data()["items"][0]["user"]["id"]
        .as_str()
        .expect("admin id")
        .to_string();
    let self_demotion = app
        .post(
            &format!("/api/v1/admin/staff/{admin_id}/role"),
            json!({ "action": "remove_access" }),
            Some(&admin),
        )
        .await;
    assert_eq!(self_demotion.status, 403);
}

#[tokio::test]
async fn menu_administration_and_public_menu() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let category = app
        .post(
            "/api/v1/admin/menu/categories",
            json!({ "name": "Street Food" }),
            Some(&admin),
        )
        .await;
    assert_eq!(category.status, 201, "{}", category.body);
    assert_eq!(category.data()["slug"], "street-food");
    let category_id = category.data()["id"].as_i64().expect("category id");

    let sub = app
        .post(
            "/api/v1/admin/menu/subcategories",
            json!({ "category_id": category_id, "name": "Wraps" }),
            Some(&admin),
        )
        .await;
    let sub_id = sub.data()["id"].as_i64().expect("subcategory id");

    let item = app
        .post(
            "/api/v1/admin/menu/items",
            json!({ "subcategory_id": sub_id, "name": "Dholl Puri", "price": "45.00" }),
            Some(&admin),
        )
        .await;
    assert_eq!(item.status, 201, "{}", item.body);
    let item_id = item.data()["id"].as_i64().expect("item id");

    let sections = app
        .get("/api/v1/menu/categories/street-food/sections", None)
        .await;
    assert_eq!(sections.status, 200, "{}", sections.body);
    assert_eq!(sections.data()[0]["items"][0]["id"], item_id);

    let toggled = app
        .post(
            &format!("/api/v1/admin/menu/items/{item_id}/toggle"),
            json!({}),
            Some(&admin),
        )
        .await;
    assert_eq!(toggled.data()["is_available"], false);

    let bad_price = app
        .post(
            "/api/v1/admin/menu/items",
            json!({ "subcategory_id": sub_id, "name": "Free", "price": "-1.00" }),
            Some(&admin),
        )
        .await;
    assert_eq!(bad_price.status, 400);

    let customer = app.customer_token("menu.peeker@gmail.com").await;
    let forbidden = app
        .post(
            "/api/v1/admin/menu/categories",
            json!({ "name": "Nope" }),
            Some(&customer),
        )
        .await;
    assert_eq!(forbidden.status, 403);
}

#[tokio::test]
async fn ordered_menu_items_cannot_be_deleted() {
    let app = TestApp::new().await;
    let menu = app
        .seed_menu(&[("Burger", dec!(250.00)), ("Salad", dec!(150.00))])
        .await;
    let admin = app.admin_token().await;
    paid_order(&app, menu[0].id, 1).await;

    let blocked = app
        .send(
            Method::DELETE,
            &format!("/api/v1/admin/menu/items/{}", menu[0].id),
            None,
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(blocked.status, 409);

    let removed = app
        .send(
            Method::DELETE,
            &format!("/api/v1/admin/menu/items/{}", menu[1].id),
            None,
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(removed.status, 204);
}

#[tokio::test]
async fn tables_are_listed_publicly_and_created_by_admins() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let created = app
        .post(
            "/api/v1/admin/tables",
            json!({ "table_number": 7, "seats": 4, "x_position": 10, "y_position": 20 }),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status, 201, "{}", created.body);
    let id = created.data()["id"].as_i64().expect("table id");
    let token = created.data()["qr_token"].as_str().expect("qr").to_string();

    let duplicate = app
        .post(
            "/api/v1/admin/tables",
            json!({ "table_number": 7, "seats": 2 }),
            Some(&admin),
        )
        .await;
    assert_eq!(duplicate.status, 409);

    let regenerated = app
        .post(&format!("/api/v1/admin/tables/{id}/qr"), json!({}), Some(&admin))
        .await;
    assert_ne!(regenerated.data()["qr_token"], token.as_str());

    let listed = app.get("/api/v1/tables", None).await;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(1));
}
