pub mod backtest;
pub mod config;
pub mod error;
pub mod recommend;
pub mod report;
pub mod scoring;
pub mod sweep;

pub use backtest::{backtest, backtest_parallel, BacktestRecord};
pub use config::{AnalysisConfig, StrategyConfig};
pub use error::EngineError;
pub use recommend::{recommend, Recommendation};
pub use report::{aggregate, Summary};
pub use scoring::{score, score_with, ScoreTable, ScoringStrategy};
