use anyhow::{Context, Result};
use chrono::NaiveDate;

pub mod config;
pub mod copy;
pub mod open;
pub mod periods;
pub mod status;
pub mod transition;
pub mod validate;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Parse a `YYYY-MM-DD` command line date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}
