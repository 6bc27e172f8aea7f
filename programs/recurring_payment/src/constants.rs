//! Program-wide constants.

/// PDA seed for ledger entries: `["ledger", public_key]`.
pub const LEDGER_SEED: &[u8] = b"ledger";

/// PDA seed for the singleton ledger configuration.
pub const LEDGER_CONFIG_SEED: &[u8] = b"ledger_config";

/// PDA seed for the token vault backing every ledger balance.
pub const VAULT_SEED: &[u8] = b"vault";

/// Seconds per slot unit (UTC, no calendar arithmetic).
pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
/// A "month" is a flat 30.4 days.
pub const SECONDS_PER_MONTH: i64 = 304 * SECONDS_PER_DAY / 10;
pub const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Max UTF-8 bytes of a contract title.
pub const MAX_TITLE_LEN: usize = 64;

/// Max UTF-8 bytes of free-form contract data.
pub const MAX_DATA_LEN: usize = 64;

/// Max bytes of a payload owned by another module of the host ledger.
pub const MAX_FOREIGN_PAYLOAD_LEN: usize = 64;
