use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::Cell;
use configuration::PageId;
use core_types::{Order, OrdersResponse};
use query_cache::Subscription;
use std::cmp::Reverse;

pub struct OrdersPage {
    orders: Subscription<OrdersResponse>,
}

impl OrdersPage {
    pub fn mount(hooks: &Hooks, limit: u32, active: bool) -> Self {
        Self {
            orders: hooks.orders(limit, active),
        }
    }
}

impl Page for OrdersPage {
    fn id(&self) -> PageId {
        PageId::Orders
    }

    fn title(&self) -> &'static str {
        "Orders"
    }

    fn set_active(&self, active: bool) {
        set_all(&[&self.orders as &dyn Query], active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&[&self.orders as &dyn Query])
    }

    fn render(&self, _now_ms: i64) -> String {
        let state = ViewState::resolve(&self.orders.snapshot(), |r| r.orders.is_empty());
        widgets::render_view(state, "orders", |response| {
            let (active, completed) = partition_orders(&response.orders);
            format!(
                "{}\n{}",
                widgets::section("Active orders", &render_orders(&active)),
                widgets::section("Completed orders", &render_orders(&completed)),
            )
        })
    }
}

/// Splits orders into working and terminal ones, newest first.
///
/// Orders whose status is in neither set are left out of both.
pub fn partition_orders(orders: &[Order]) -> (Vec<&Order>, Vec<&Order>) {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    // Stable, so orders without a timestamp keep the backend's order at the end.
    sorted.sort_by_key(|order| Reverse(order.created_at));

    let active = sorted
        .iter()
        .copied()
        .filter(|order| order.status.is_active())
        .collect();
    let completed = sorted
        .iter()
        .copied()
        .filter(|order| order.status.is_completed())
        .collect();
    (active, completed)
}

pub fn render_orders(orders: &[&Order]) -> String {
    if orders.is_empty() {
        return "None.".to_string();
    }

    let mut table = widgets::table(vec![
        "Time", "ID", "Symbol", "Side", "Qty", "Filled", "Price", "Status", "Strategy",
    ]);
    for order in orders {
        table.add_row(vec![
            Cell::new(widgets::timestamp(order.created_at)),
            Cell::new(&order.id),
            Cell::new(&order.symbol),
            Cell::new(widgets::opt(order.side)),
            Cell::new(widgets::quantity(order.quantity)),
            Cell::new(widgets::quantity(order.filled_quantity)),
            Cell::new(widgets::opt(order.price.map(widgets::money))),
            Cell::new(&order.status),
            Cell::new(widgets::opt(order.strategy.as_deref())),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    fn order(id: &str, status: &str, minute: u32) -> Order {
        Order {
            id: id.to_string(),
            symbol: "BTCUSDT".to_string(),
            side: Some(OrderSide::Buy),
            quantity: dec!(1),
            price: Some(dec!(100)),
            filled_quantity: dec!(0),
            status: OrderStatus::parse(status),
            strategy: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).single(),
        }
    }

    fn ids(orders: &[&Order]) -> Vec<String> {
        orders.iter().map(|o| o.id.clone()).collect()
    }

    #[test]
    fn open_and_filled_go_to_separate_tables() {
        let orders = [order("a", "OPEN", 0), order("b", "FILLED", 1)];
        let (active, completed) = partition_orders(&orders);
        assert_eq!(ids(&active), ["a"]);
        assert_eq!(ids(&completed), ["b"]);
    }

    #[test]
    fn both_cancel_spellings_are_completed() {
        let orders = [order("a", "CANCELED", 0), order("b", "cancelled", 1)];
        let (active, completed) = partition_orders(&orders);
        assert!(active.is_empty());
        assert_eq!(completed.len(), 2);
    }

    #[test]
    fn unknown_status_is_in_neither_table() {
        let orders = [order("a", "SUSPENDED", 0), order("b", "partially_filled", 1)];
        let (active, completed) = partition_orders(&orders);
        assert_eq!(ids(&active), ["b"]);
        assert!(completed.is_empty());
    }

    #[test]
    fn newest_first() {
        let orders = [order("old", "NEW", 0), order("new", "PENDING", 30), order("mid", "ACCEPTED", 10)];
        let (active, _) = partition_orders(&orders);
        assert_eq!(ids(&active), ["new", "mid", "old"]);
    }

    #[test]
    fn renders_order_rows() {
        let orders = [order("42", "OPEN", 5)];
        let (active, _) = partition_orders(&orders);
        let out = render_orders(&active);
        assert!(out.contains("BTCUSDT"));
        assert!(out.contains("100.00"));
        assert!(out.contains("2024-01-01 12:05:00"));
        assert_eq!(render_orders(&[]), "None.");
    }

    #[test]
    fn sparse_orders_decode_and_partition() {
        let response: OrdersResponse =
            serde_json::from_str(r#"{"orders":[{"status":"OPEN"},{"status":"FILLED"}]}"#).unwrap();
        let (active, completed) = partition_orders(&response.orders);
        assert_eq!(active.len(), 1);
        assert_eq!(completed.len(), 1);

        let out = render_orders(&active);
        assert!(out.contains("OPEN"));
        assert!(out.contains(widgets::PLACEHOLDER));
    }
}
