pub const JSONRPC_VERSION: &str = "2.0";

pub const SESSION_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const CONNECT_TIMEOUT_SECS: u64 = 15;
pub const SEND_TIMEOUT_SECS: u64 = 5;
pub const PING_INTERVAL_SECS: u64 = 15;

pub const RECONNECT_DELAY_MS: u64 = 500;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Normal "going away" close, used by `pause()`.
pub const CLOSE_CODE_GOING_AWAY: u16 = 1001;
/// Relay kicked us for flooding or a security violation. Fatal.
pub const CLOSE_CODE_SECURITY: u16 = 4022;

/// EIP-1193 user rejection.
pub const ERROR_CODE_REJECTED_BY_USER: i64 = 4001;
/// Generic server error, used for session rejection.
pub const ERROR_CODE_SERVER: i64 = -32000;

pub const SESSION_KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;
