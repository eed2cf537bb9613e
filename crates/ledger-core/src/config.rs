//! Environment-driven configuration. Every field can be overridden by an
//! `APP_*` environment variable; defaults mirror the reference service's.
//! [`Configuration::check_sanity`] is run once at startup and refuses to
//! start the process on a bad combination (see the error-handling design's
//! "Configuration sanity → Fatal" policy).

use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub process_balance_changes_threads: u32,
    pub process_balance_changes_wait_seconds: f64,
    pub process_balance_changes_max_count: u32,

    pub process_transfer_requests_threads: u32,
    pub process_transfer_requests_wait_seconds: f64,
    pub process_transfer_requests_max_count: u32,

    pub process_finalization_requests_threads: u32,
    pub process_finalization_requests_wait_seconds: f64,
    pub process_finalization_requests_max_count: u32,

    pub flush_rejected_transfers_burst_count: u32,
    pub flush_prepared_transfers_burst_count: u32,
    pub flush_finalized_transfers_burst_count: u32,
    pub flush_account_transfers_burst_count: u32,
    pub flush_account_updates_burst_count: u32,
    pub flush_account_purges_burst_count: u32,
    pub flush_rejected_configs_burst_count: u32,
    pub flush_pending_balance_changes_burst_count: u32,

    /// How often the outbox flusher wakes up to drain each signal class.
    pub signal_flush_interval_millis: u64,

    pub accounts_scan_hours: f64,
    pub accounts_scan_blocks_per_query: u32,
    pub accounts_scan_beat_millisecs: u64,

    pub prepared_transfers_scan_days: f64,
    pub prepared_transfers_scan_blocks_per_query: u32,
    pub prepared_transfers_scan_beat_millisecs: u64,

    pub intranet_extreme_delay_days: f64,
    pub signalbus_max_delay_days: f64,
    pub account_heartbeat_days: f64,
    pub prepared_transfer_reminder_days: f64,
    pub prepared_transfer_max_delay_days: f64,

    pub fetch_api_url: Option<String>,
    pub fetch_api_timeout_seconds: f64,
    pub fetch_dns_cache_seconds: f64,
    pub fetch_connections: u32,
    pub fetch_data_cache_size: usize,

    pub min_interest_capitalization_days: f64,
    pub max_interest_to_principal_ratio: f64,
    pub deletion_attempts_min_days: f64,

    pub http_listen_addr: String,
    pub data_dir: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            process_balance_changes_threads: 1,
            process_balance_changes_wait_seconds: 5.0,
            process_balance_changes_max_count: 500_000,

            process_transfer_requests_threads: 1,
            process_transfer_requests_wait_seconds: 5.0,
            process_transfer_requests_max_count: 500_000,

            process_finalization_requests_threads: 1,
            process_finalization_requests_wait_seconds: 5.0,
            process_finalization_requests_max_count: 500_000,

            flush_rejected_transfers_burst_count: 10_000,
            flush_prepared_transfers_burst_count: 10_000,
            flush_finalized_transfers_burst_count: 10_000,
            flush_account_transfers_burst_count: 10_000,
            flush_account_updates_burst_count: 10_000,
            flush_account_purges_burst_count: 10_000,
            flush_rejected_configs_burst_count: 10_000,
            flush_pending_balance_changes_burst_count: 10_000,

            signal_flush_interval_millis: 200,

            accounts_scan_hours: 8.0,
            accounts_scan_blocks_per_query: 40,
            accounts_scan_beat_millisecs: 25,

            prepared_transfers_scan_days: 1.0,
            prepared_transfers_scan_blocks_per_query: 40,
            prepared_transfers_scan_beat_millisecs: 25,

            intranet_extreme_delay_days: 14.0,
            signalbus_max_delay_days: 7.0,
            account_heartbeat_days: 7.0,
            prepared_transfer_reminder_days: 7.0,
            prepared_transfer_max_delay_days: 30.0,

            fetch_api_url: None,
            fetch_api_timeout_seconds: 5.0,
            fetch_dns_cache_seconds: 10.0,
            fetch_connections: 100,
            fetch_data_cache_size: 1000,

            min_interest_capitalization_days: 14.0,
            max_interest_to_principal_ratio: 0.0001,
            deletion_attempts_min_days: 14.0,

            http_listen_addr: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

macro_rules! env_override {
    ($target:expr, $name:expr, $parse:expr) => {
        if let Ok(raw) = std::env::var($name) {
            match $parse(&raw) {
                Ok(v) => $target = v,
                Err(_) => {
                    tracing::warn!(var = $name, value = %raw, "ignoring unparseable config override")
                }
            }
        }
    };
}

impl Configuration {
    /// Start from defaults, then overlay every recognized `APP_*`
    /// environment variable that is set and parses successfully.
    pub fn from_env() -> Self {
        let mut c = Self::default();

        env_override!(c.process_balance_changes_threads, "APP_PROCESS_BALANCE_CHANGES_THREADS", str::parse::<u32>);
        env_override!(c.process_balance_changes_wait_seconds, "APP_PROCESS_BALANCE_CHANGES_WAIT", str::parse::<f64>);
        env_override!(c.process_balance_changes_max_count, "APP_PROCESS_BALANCE_CHANGES_MAX_COUNT", str::parse::<u32>);

        env_override!(c.process_transfer_requests_threads, "APP_PROCESS_TRANSFER_REQUESTS_THREADS", str::parse::<u32>);
        env_override!(c.process_transfer_requests_wait_seconds, "APP_PROCESS_TRANSFER_REQUESTS_WAIT", str::parse::<f64>);
        env_override!(c.process_transfer_requests_max_count, "APP_PROCESS_TRANSFER_REQUESTS_MAX_COUNT", str::parse::<u32>);

        env_override!(c.process_finalization_requests_threads, "APP_PROCESS_FINALIZATION_REQUESTS_THREADS", str::parse::<u32>);
        env_override!(c.process_finalization_requests_wait_seconds, "APP_PROCESS_FINALIZATION_REQUESTS_WAIT", str::parse::<f64>);
        env_override!(c.process_finalization_requests_max_count, "APP_PROCESS_FINALIZATION_REQUESTS_MAX_COUNT", str::parse::<u32>);

        env_override!(c.flush_rejected_transfers_burst_count, "APP_FLUSH_REJECTED_TRANSFERS_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_prepared_transfers_burst_count, "APP_FLUSH_PREPARED_TRANSFERS_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_finalized_transfers_burst_count, "APP_FLUSH_FINALIZED_TRANSFERS_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_account_transfers_burst_count, "APP_FLUSH_ACCOUNT_TRANSFERS_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_account_updates_burst_count, "APP_FLUSH_ACCOUNT_UPDATES_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_account_purges_burst_count, "APP_FLUSH_ACCOUNT_PURGES_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_rejected_configs_burst_count, "APP_FLUSH_REJECTED_CONFIGS_BURST_COUNT", str::parse::<u32>);
        env_override!(c.flush_pending_balance_changes_burst_count, "APP_FLUSH_PENDING_BALANCE_CHANGES_BURST_COUNT", str::parse::<u32>);

        env_override!(c.signal_flush_interval_millis, "APP_SIGNAL_FLUSH_INTERVAL_MILLIS", str::parse::<u64>);

        env_override!(c.accounts_scan_hours, "APP_ACCOUNTS_SCAN_HOURS", str::parse::<f64>);
        env_override!(c.accounts_scan_blocks_per_query, "APP_ACCOUNTS_SCAN_BLOCKS_PER_QUERY", str::parse::<u32>);
        env_override!(c.accounts_scan_beat_millisecs, "APP_ACCOUNTS_SCAN_BEAT_MILLISECS", str::parse::<u64>);

        env_override!(c.prepared_transfers_scan_days, "APP_PREPARED_TRANSFERS_SCAN_DAYS", str::parse::<f64>);
        env_override!(c.prepared_transfers_scan_blocks_per_query, "APP_PREPARED_TRANSFERS_SCAN_BLOCKS_PER_QUERY", str::parse::<u32>);
        env_override!(c.prepared_transfers_scan_beat_millisecs, "APP_PREPARED_TRANSFERS_SCAN_BEAT_MILLISECS", str::parse::<u64>);

        env_override!(c.intranet_extreme_delay_days, "APP_INTRANET_EXTREME_DELAY_DAYS", str::parse::<f64>);
        env_override!(c.signalbus_max_delay_days, "APP_SIGNALBUS_MAX_DELAY_DAYS", str::parse::<f64>);
        env_override!(c.account_heartbeat_days, "APP_ACCOUNT_HEARTBEAT_DAYS", str::parse::<f64>);
        env_override!(c.prepared_transfer_reminder_days, "APP_PREPARED_TRANSFER_REMAINDER_DAYS", str::parse::<f64>);
        env_override!(c.prepared_transfer_max_delay_days, "APP_PREPARED_TRANSFER_MAX_DELAY_DAYS", str::parse::<f64>);

        if let Ok(raw) = std::env::var("APP_FETCH_API_URL") {
            c.fetch_api_url = Some(raw);
        }
        env_override!(c.fetch_api_timeout_seconds, "APP_FETCH_API_TIMEOUT_SECONDS", str::parse::<f64>);
        env_override!(c.fetch_dns_cache_seconds, "APP_FETCH_DNS_CACHE_SECONDS", str::parse::<f64>);
        env_override!(c.fetch_connections, "APP_FETCH_CONNECTIONS", str::parse::<u32>);
        env_override!(c.fetch_data_cache_size, "APP_FETCH_DATA_CACHE_SIZE", str::parse::<usize>);

        env_override!(c.min_interest_capitalization_days, "APP_MIN_INTEREST_CAPITALIZATION_DAYS", str::parse::<f64>);
        env_override!(c.max_interest_to_principal_ratio, "APP_MAX_INTEREST_TO_PRINCIPAL_RATIO", str::parse::<f64>);
        env_override!(c.deletion_attempts_min_days, "APP_DELETION_ATTEMPTS_MIN_DAYS", str::parse::<f64>);

        if let Ok(raw) = std::env::var("APP_HTTP_LISTEN_ADDR") {
            c.http_listen_addr = raw;
        }
        if let Ok(raw) = std::env::var("APP_DATA_DIR") {
            c.data_dir = raw;
        }

        c
    }

    /// The four sanity checks the reference service runs before serving
    /// any traffic. All are fatal: a violation means the process refuses
    /// to start rather than run with a self-contradictory configuration.
    pub fn check_sanity(&self) -> Result<(), LedgerError> {
        if self.prepared_transfer_max_delay_days < self.signalbus_max_delay_days {
            return Err(LedgerError::Configuration(format!(
                "APP_PREPARED_TRANSFER_MAX_DELAY_DAYS ({}) must be >= APP_SIGNALBUS_MAX_DELAY_DAYS ({})",
                self.prepared_transfer_max_delay_days, self.signalbus_max_delay_days
            )));
        }
        if !(0.0 < self.max_interest_to_principal_ratio && self.max_interest_to_principal_ratio <= 0.10) {
            return Err(LedgerError::Configuration(format!(
                "APP_MAX_INTEREST_TO_PRINCIPAL_RATIO ({}) must be in (0.0, 0.10]",
                self.max_interest_to_principal_ratio
            )));
        }
        if self.min_interest_capitalization_days > 92.0 {
            return Err(LedgerError::Configuration(format!(
                "APP_MIN_INTEREST_CAPITALIZATION_DAYS ({}) must be <= 92",
                self.min_interest_capitalization_days
            )));
        }
        if self.accounts_scan_hours > 48.0 {
            return Err(LedgerError::Configuration(format!(
                "APP_ACCOUNTS_SCAN_HOURS ({}) must be <= 48",
                self.accounts_scan_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_sanity() {
        assert!(Configuration::default().check_sanity().is_ok());
    }

    #[test]
    fn prepared_transfer_delay_below_signalbus_delay_is_rejected() {
        let mut c = Configuration::default();
        c.prepared_transfer_max_delay_days = 1.0;
        c.signalbus_max_delay_days = 7.0;
        assert!(c.check_sanity().is_err());
    }

    #[test]
    fn interest_ratio_out_of_range_is_rejected() {
        let mut c = Configuration::default();
        c.max_interest_to_principal_ratio = 0.5;
        assert!(c.check_sanity().is_err());
    }
}
