//! Database schema definitions

pub const SIGNALS_TABLE: &str = "signals";
pub const WHALES_TABLE: &str = "whales";

/// Column set a `signals` table must have to be readable.
pub const SIGNAL_COLUMNS: &[&str] = &[
    "id",
    "category",
    "market",
    "url",
    "recommendation",
    "analysis",
    "confidence",
    "bet_amount",
    "est_profit",
    "char_name",
    "char_class",
    "rarity",
    "timestamp",
];

/// Column set a `whales` table must have to be readable.
pub const WHALE_COLUMNS: &[&str] = &[
    "address",
    "alias",
    "total_profit",
    "last_trade",
    "status",
    "timestamp",
];

pub const DROP_SIGNALS: &str = "DROP TABLE IF EXISTS signals";

/// NOTE: `timestamp` is creation time (UTC, `YYYY-MM-DD HH:MM:SS`); upserts never touch it
pub const CREATE_SIGNALS: &str = r#"
-- Curated trading signals, fully replaced on every refresh tick
CREATE TABLE IF NOT EXISTS signals (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    market TEXT NOT NULL,
    url TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    analysis TEXT NOT NULL,
    confidence INTEGER NOT NULL,
    bet_amount REAL NOT NULL DEFAULT 0,
    est_profit REAL NOT NULL DEFAULT 0,
    char_name TEXT,
    char_class TEXT,
    rarity TEXT,
    timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_WHALES: &str = r#"
-- Tracked whale wallets, upserted by address and never pruned
CREATE TABLE IF NOT EXISTS whales (
    address TEXT PRIMARY KEY,
    alias TEXT NOT NULL,
    total_profit REAL NOT NULL DEFAULT 0,
    last_trade TEXT NOT NULL,
    status TEXT NOT NULL,
    timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

// ========== INDEXES ==========

pub const SIGNAL_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_signals_timestamp ON signals(timestamp DESC)
"#;

pub const WHALE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_whales_profit ON whales(total_profit DESC)
"#;
