use core_types::{EngineMode, EngineStatus};
use std::fmt;

/// The aggregate trading state shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingMode {
    Live,
    Paper,
    Idle,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Live => write!(f, "LIVE"),
            TradingMode::Paper => write!(f, "PAPER"),
            TradingMode::Idle => write!(f, "IDLE"),
        }
    }
}

/// Derives the trading mode from the engine statuses.
///
/// Any running live engine wins over paper engines; stopped engines and
/// unrecognized modes never count.
pub fn derive_mode(engines: Option<&[EngineStatus]>) -> TradingMode {
    let Some(engines) = engines.filter(|engines| !engines.is_empty()) else {
        return TradingMode::Idle;
    };

    let running_in = |mode: EngineMode| engines.iter().any(|e| e.running && e.mode == mode);

    if running_in(EngineMode::Live) {
        TradingMode::Live
    } else if running_in(EngineMode::Paper) {
        TradingMode::Paper
    } else {
        TradingMode::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(name: &str, running: bool, mode: &str) -> EngineStatus {
        EngineStatus {
            name: name.to_string(),
            running,
            mode: EngineMode::parse(mode),
        }
    }

    #[test]
    fn absent_or_empty_is_idle() {
        assert_eq!(derive_mode(None), TradingMode::Idle);
        assert_eq!(derive_mode(Some(&[])), TradingMode::Idle);
    }

    #[test]
    fn running_live_engine_wins() {
        let engines = [
            engine("paper-1", true, "PAPER"),
            engine("live-1", true, "live"),
        ];
        assert_eq!(derive_mode(Some(&engines)), TradingMode::Live);
    }

    #[test]
    fn running_paper_without_live_is_paper() {
        let engines = [
            engine("live-1", false, "LIVE"),
            engine("paper-1", true, "Paper"),
        ];
        assert_eq!(derive_mode(Some(&engines)), TradingMode::Paper);
    }

    #[test]
    fn stopped_or_unknown_engines_are_idle() {
        let engines = [
            engine("live-1", false, "LIVE"),
            engine("bt", true, "backtest"),
            engine("blank", true, ""),
        ];
        assert_eq!(derive_mode(Some(&engines)), TradingMode::Idle);
    }

    #[test]
    fn displays_upper_case() {
        assert_eq!(TradingMode::Live.to_string(), "LIVE");
        assert_eq!(TradingMode::Idle.to_string(), "IDLE");
    }
}
