//! Text building blocks shared by the pages.

use crate::view_state::ViewState;
use api_client::error::ApiError;
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use indicatif::HumanDuration;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::time::Duration;

pub const PLACEHOLDER: &str = "-";

pub fn table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// A two-column label/value block.
pub fn card(rows: Vec<(&str, Cell)>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), value]);
    }
    table
}

pub fn section(title: &str, body: &str) -> String {
    format!("== {} ==\n{}\n", title, body)
}

/// Renders a view state: a placeholder line for loading, error and empty
/// states, `body` otherwise, with a warning line when the data is stale.
pub fn render_view<T>(state: ViewState<T>, noun: &str, body: impl FnOnce(&T) -> String) -> String {
    match state {
        ViewState::Loading => format!("Loading {}...", noun),
        ViewState::Error(error) => format!("Failed to load {}: {}", noun, error),
        ViewState::Empty { stale_error } => {
            format!("{}No {}.", stale_banner(stale_error.as_deref()), noun)
        }
        ViewState::Ready { data, stale_error } => {
            format!("{}{}", stale_banner(stale_error.as_deref()), body(&data))
        }
    }
}

fn stale_banner(error: Option<&ApiError>) -> String {
    error.map_or_else(String::new, |error| {
        format!("! Refresh failed, showing last data: {}\n", error)
    })
}

pub fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Quantities keep their precision but drop trailing zeros.
pub fn quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

/// A money cell colored by sign.
pub fn pnl(value: Decimal) -> Cell {
    let cell = Cell::new(money(value));
    if value.is_sign_positive() && !value.is_zero() {
        cell.fg(Color::Green)
    } else if value.is_sign_negative() && !value.is_zero() {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

pub fn opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

pub fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || PLACEHOLDER.to_string(),
        |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

pub fn elapsed(since: Option<Duration>) -> String {
    match since {
        Some(duration) => format!("{} ago", HumanDuration(duration)),
        None => "never".to_string(),
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
