use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::Cell;
use configuration::PageId;
use core_types::{Portfolio, Position};
use query_cache::Subscription;

pub struct PortfolioPage {
    portfolio: Subscription<Portfolio>,
}

impl PortfolioPage {
    pub fn mount(hooks: &Hooks, active: bool) -> Self {
        Self {
            portfolio: hooks.portfolio(active),
        }
    }
}

impl Page for PortfolioPage {
    fn id(&self) -> PageId {
        PageId::Portfolio
    }

    fn title(&self) -> &'static str {
        "Portfolio"
    }

    fn set_active(&self, active: bool) {
        set_all(&[&self.portfolio as &dyn Query], active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&[&self.portfolio as &dyn Query])
    }

    fn render(&self, _now_ms: i64) -> String {
        let state = ViewState::from_snapshot(&self.portfolio.snapshot());
        widgets::render_view(state, "portfolio", render_portfolio)
    }
}

pub fn render_portfolio(portfolio: &Portfolio) -> String {
    let cards = widgets::card(vec![
        ("Equity", Cell::new(widgets::money(portfolio.equity))),
        ("Cash", Cell::new(widgets::money(portfolio.cash))),
        ("Unrealized PnL", widgets::pnl(portfolio.unrealized_pnl)),
        ("Realized PnL", widgets::pnl(portfolio.realized_pnl)),
        (
            "Daily PnL",
            portfolio
                .daily_pnl
                .map_or_else(|| Cell::new(widgets::PLACEHOLDER), widgets::pnl),
        ),
    ]);

    let positions = if portfolio.positions.is_empty() {
        "No open positions.".to_string()
    } else {
        render_positions(&portfolio.positions)
    };

    format!(
        "{}\n{}",
        widgets::section("Account", &cards.to_string()),
        widgets::section("Positions", &positions),
    )
}

/// Positions table, sorted by symbol.
pub fn render_positions(positions: &[Position]) -> String {
    let mut sorted: Vec<&Position> = positions.iter().collect();
    sorted.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut table = widgets::table(vec![
        "Symbol", "Side", "Qty", "Avg price", "Market price", "Unrealized PnL",
    ]);
    for position in sorted {
        table.add_row(vec![
            Cell::new(&position.symbol),
            Cell::new(widgets::opt(position.side)),
            Cell::new(widgets::quantity(position.quantity)),
            Cell::new(widgets::money(position.avg_price)),
            Cell::new(widgets::opt(position.market_price.map(widgets::money))),
            widgets::pnl(position.unrealized_pnl),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn position(symbol: &str) -> Position {
        Position {
            symbol: symbol.to_string(),
            side: None,
            quantity: dec!(2),
            avg_price: dec!(10),
            market_price: None,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    #[test]
    fn positions_are_sorted_by_symbol() {
        let out = render_positions(&[position("SOLUSDT"), position("BTCUSDT"), position("ETHUSDT")]);
        let btc = out.find("BTCUSDT").unwrap();
        let eth = out.find("ETHUSDT").unwrap();
        let sol = out.find("SOLUSDT").unwrap();
        assert!(btc < eth && eth < sol);
    }

    #[test]
    fn empty_portfolio_says_so() {
        let out = render_portfolio(&Portfolio {
            equity: dec!(1000),
            ..Default::default()
        });
        assert!(out.contains("1000.00"));
        assert!(out.contains("No open positions."));
    }
}
