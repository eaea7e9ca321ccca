//! Centralized constants for the validator exporter
//!
//! Universal endpoints and network constants; validator-specific settings
//! come from config.toml / environment variables.

// =============================================================================
// API Endpoints
// =============================================================================

/// Default public mainnet RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// CoinGecko API base URL
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko current price endpoint
pub const COINGECKO_SIMPLE_PRICE: &str = "/simple/price?ids=solana&vs_currencies=usd";

/// Explorer block URL base (append the slot number)
pub const EXPLORER_BLOCK_BASE: &str = "https://explorer.solana.com/block";

// =============================================================================
// Solana Network Constants
// =============================================================================

/// Vote program address; a transaction referencing it is a vote transaction
pub const VOTE_PROGRAM_ADDRESS: &str = "Vote111111111111111111111111111111111111111";

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Per-block compute unit budget
pub const BLOCK_COMPUTE_UNIT_LIMIT: u64 = 48_000_000;

// =============================================================================
// Aggregation Bounds
// =============================================================================

/// Leader-slot window size per side (completed / upcoming)
pub const LEADER_WINDOW_SLOTS: usize = 4;

/// Completed leader slots the fee estimator will consider at most
pub const FEE_ESTIMATE_MAX_COMPLETED: usize = 100;

/// Completed leader slots actually fetched per scrape for fee sampling
pub const FEE_ESTIMATE_SAMPLE: usize = 20;

// =============================================================================
// HTTP Client
// =============================================================================

/// Connect timeout for outbound calls (seconds)
pub const CONNECT_TIMEOUT_SECS: u64 = 5;
