use crate::hooks::Hooks;
use crate::pages::{Page, Query, all_settled, set_all};
use crate::view_state::ViewState;
use crate::widgets;
use comfy_table::{Cell, Color};
use configuration::PageId;
use core_types::{EngineLogsTailResponse, LogEntry, LogFilter, LogLevel, LogsResponse};
use query_cache::Subscription;

/// Lines requested when the page tails an engine log.
pub const TAIL_LINES: u32 = 50;

pub struct LogsPage {
    logs: Subscription<LogsResponse>,
    tail: Option<Subscription<EngineLogsTailResponse>>,
}

impl LogsPage {
    pub fn mount(hooks: &Hooks, filter: LogFilter, tail_engine: Option<String>, active: bool) -> Self {
        Self {
            logs: hooks.logs(filter, active),
            tail: tail_engine.map(|engine| hooks.logs_tail(engine, TAIL_LINES, active)),
        }
    }

    fn queries(&self) -> Vec<&dyn Query> {
        let mut queries: Vec<&dyn Query> = vec![&self.logs];
        if let Some(tail) = &self.tail {
            queries.push(tail);
        }
        queries
    }
}

impl Page for LogsPage {
    fn id(&self) -> PageId {
        PageId::Logs
    }

    fn title(&self) -> &'static str {
        "Logs"
    }

    fn set_active(&self, active: bool) {
        set_all(&self.queries(), active);
    }

    fn is_settled(&self) -> bool {
        all_settled(&self.queries())
    }

    fn render(&self, _now_ms: i64) -> String {
        let logs = widgets::render_view(
            ViewState::resolve(&self.logs.snapshot(), |r| r.logs.is_empty()),
            "log entries",
            render_logs,
        );
        let mut out = widgets::section("Logs", &logs);

        if let Some(tail) = &self.tail {
            let lines = widgets::render_view(
                ViewState::resolve(&tail.snapshot(), |r| r.lines.is_empty()),
                "engine log lines",
                render_tail,
            );
            out.push('\n');
            out.push_str(&widgets::section("Engine tail", &lines));
        }
        out
    }
}

pub fn render_logs(response: &LogsResponse) -> String {
    let mut table = widgets::table(vec!["Time", "Level", "Kind", "Engine", "Message"]);
    for entry in &response.logs {
        table.add_row(vec![
            Cell::new(widgets::timestamp(entry.timestamp)),
            level_cell(entry),
            Cell::new(widgets::opt(entry.kind.as_deref())),
            Cell::new(widgets::opt(entry.engine.as_deref())),
            Cell::new(&entry.message),
        ]);
    }

    let mut out = table.to_string();
    if let Some(total) = response.total {
        out.push_str(&format!("\n{} of {} entries", response.logs.len(), total));
    }
    out
}

fn level_cell(entry: &LogEntry) -> Cell {
    let cell = Cell::new(&entry.level);
    match entry.level {
        LogLevel::Error | LogLevel::Critical => cell.fg(Color::Red),
        LogLevel::Warn => cell.fg(Color::Yellow),
        LogLevel::Debug => cell.fg(Color::DarkGrey),
        _ => cell,
    }
}

pub fn render_tail(tail: &EngineLogsTailResponse) -> String {
    let header = if tail.engine.is_empty() {
        String::new()
    } else {
        format!("[{}]\n", tail.engine)
    };
    format!("{}{}", header, tail.lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_table_reports_total() {
        let response = LogsResponse {
            logs: vec![LogEntry {
                timestamp: None,
                level: LogLevel::Error,
                kind: Some("order".to_string()),
                engine: Some("alpha".to_string()),
                message: "rejected by venue".to_string(),
            }],
            total: Some(120),
        };
        let out = render_logs(&response);
        assert!(out.contains("ERROR"));
        assert!(out.contains("rejected by venue"));
        assert!(out.ends_with("1 of 120 entries"));
    }

    #[test]
    fn tail_is_prefixed_with_engine() {
        let out = render_tail(&EngineLogsTailResponse {
            engine: "alpha".to_string(),
            lines: vec!["one".to_string(), "two".to_string()],
        });
        assert_eq!(out, "[alpha]\none\ntwo");
    }
}
