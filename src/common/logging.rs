//! Structured Logging for the tBTC Client
//!
//! Lifecycle steps are logged through `tracing` with structured fields. The
//! `log_*` helpers here additionally emit a single JSON record per milestone
//! (deposit created, funding found, proof submitted, redemption requested) so
//! that a log pipeline can follow a deposit by its contract address.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tbtc::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true)?;
//! tracing::info!(target: "tbtc::deposit", deposit = %address, "Funding proof submitted");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::types::units::sats_to_btc_string;

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Deposit creation and lookup
    Deposit,
    /// Funding transaction located / confirmed
    Funding,
    /// Funding proof construction and submission
    Proof,
    /// TDT/TBTC minting
    Minting,
    /// Redemption requests
    Redemption,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    pub level: String,
    pub category: EventCategory,
    pub message: String,
    /// Deposit contract address the event belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_filter().to_uppercase(),
            category,
            message: message.into(),
            deposit: None,
            data: None,
            error: None,
        }
    }

    pub fn with_deposit(mut self, deposit: impl Into<String>) -> Self {
        self.deposit = Some(deposit.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Lifecycle Event Logging
// ============================================================================

/// Log a deposit lifecycle milestone.
///
/// `category` distinguishes creation, funding, proof and minting steps; a
/// failed step is logged at error level with `error` attached.
pub fn log_deposit_event(
    category: EventCategory,
    event_type: &str,
    deposit: &str,
    lot_size_sats: Option<u64>,
    error: Option<(&str, &str)>,
) {
    let success = error.is_none();
    let level = if success { LogLevel::Info } else { LogLevel::Error };
    let mut event = LogEvent::new(level, category, event_type)
        .with_deposit(deposit)
        .with_data(serde_json::json!({
            "lot_size_sats": lot_size_sats,
            "lot_size_btc": lot_size_sats.map(sats_to_btc_string),
            "success": success
        }));

    if let Some((code, message)) = error {
        event = event.with_error(code, message);
    }

    if success {
        tracing::info!(target: "tbtc::deposit", "{}", event.to_json());
    } else {
        tracing::error!(target: "tbtc::deposit", "{}", event.to_json());
    }
}

/// Log a redemption request outcome
pub fn log_redemption_event(
    event_type: &str,
    deposit: &str,
    redeemer_address: &str,
    utxo_size_sats: Option<u64>,
    error: Option<(&str, &str)>,
) {
    let success = error.is_none();
    let level = if success { LogLevel::Info } else { LogLevel::Error };
    let mut event = LogEvent::new(level, EventCategory::Redemption, event_type)
        .with_deposit(deposit)
        .with_data(serde_json::json!({
            "redeemer_address": redeemer_address,
            "utxo_size_sats": utxo_size_sats,
            "success": success
        }));

    if let Some((code, message)) = error {
        event = event.with_error(code, message);
    }

    if success {
        tracing::info!(target: "tbtc::redemption", "{}", event.to_json());
    } else {
        tracing::error!(target: "tbtc::redemption", "{}", event.to_json());
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Minimum log level to output
/// * `json_format` - Use JSON format (recommended for production)
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tbtc={}", level.as_filter())));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

// ============================================================================
// Tests
// ============================================================================
