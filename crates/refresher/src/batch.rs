//! Curated batches written by the refresher, whale sync and injector
//!
//! The built-in batches are fixed sample data. Operators can swap them for a
//! JSON array of records with `--batch <file>`.

use persistence::repository::{SignalRecord, WhaleRecord};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to read batch file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse batch file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid batch: {0}")]
    Invalid(String),
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BatchError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| BatchError::Parse {
        path: display,
        source,
    })
}

/// Check a single signal. Out-of-range confidence is only logged.
pub fn validate_signal(record: &SignalRecord) -> Result<(), BatchError> {
    if record.id.trim().is_empty() {
        return Err(BatchError::Invalid("signal id must not be empty".into()));
    }
    // The url ends up in an href on the detail page
    let url = record.url.trim_start().to_ascii_lowercase();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(BatchError::Invalid(format!(
            "signal {}: url must start with http:// or https://, got '{}'",
            record.id, record.url
        )));
    }
    for (field, amount) in [
        ("bet_amount", record.bet_amount),
        ("est_profit", record.est_profit),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(BatchError::Invalid(format!(
                "signal {}: {field} must be a non-negative amount, got {amount}",
                record.id
            )));
        }
    }
    if !(0..=100).contains(&record.confidence) {
        warn!(
            id = %record.id,
            confidence = record.confidence,
            "Signal confidence outside 0-100"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// The set of signals one refresh tick writes
#[derive(Debug, Clone)]
pub struct SignalBatch {
    records: Vec<SignalRecord>,
}

impl SignalBatch {
    pub fn new(records: Vec<SignalRecord>) -> Result<Self, BatchError> {
        if records.is_empty() {
            return Err(BatchError::Invalid("signal batch is empty".into()));
        }
        let mut seen = HashSet::new();
        for record in &records {
            validate_signal(record)?;
            if !seen.insert(record.id.as_str()) {
                return Err(BatchError::Invalid(format!(
                    "duplicate signal id '{}'",
                    record.id
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        Self::new(read_json(path.as_ref())?)
    }

    /// The seven built-in curated signals
    pub fn curated() -> Self {
        let records = vec![
            curated_signal(
                "sig_whale_1",
                "WHALE MOVE",
                "Trump Putin Meeting Before March?",
                "https://polymarket.com/event/will-trump-and-putin-meet-before-march-1",
                "BET YES",
                "BREAKING: Moscow confirms 'preparations underway' via TASS. Trump Truth Social post hints at 'major peace announcement coming.' Whale wallet 0x8a2f... bought $340k YES in last 4hrs. 89% track record on geopolitical events.",
                91,
                250.00,
                175.00,
                ("THE DIPLOMAT", "LEGENDARY", "MYTHIC"),
            ),
            curated_signal(
                "sig_arb_1",
                "ARBITRAGE",
                "Ukraine Ceasefire by April",
                "https://polymarket.com/event/ukraine-ceasefire-before-april",
                "BUY POLY / SELL KALSHI",
                "PRICE MISMATCH: Poly pricing ceasefire at 67c vs Kalshi at 58c. 9-cent arb with talks accelerating in Riyadh. Risk-free money while negotiations continue.",
                97,
                400.00,
                36.00,
                ("THE ARBITER", "JUDGE", "EPIC"),
            ),
            curated_signal(
                "sig_macro_1",
                "MACRO",
                "Fed Cuts Rates in March?",
                "https://polymarket.com/event/fed-rate-cut-march-2026",
                "BET NO",
                "CPI DATA JUST DROPPED: Core inflation ticked UP 0.3%. Fed funds futures now pricing 85% chance of HOLD. Market still adjusting. 'No cut' at 72c is undervalued.",
                88,
                150.00,
                42.00,
                ("THE ECONOMIST", "ANALYST", "RARE"),
            ),
            curated_signal(
                "sig_tech_1",
                "TECH",
                "Grok 3 Beats GPT-4o on Benchmarks?",
                "https://polymarket.com/event/grok-3-benchmarks",
                "BET YES",
                "LEAKED: xAI internal testing shows Grok 3 scoring 94.2% on MMLU vs GPT-4o's 88.7%. Musk tweeting 'soon' repeatedly. Market sleeping on this. YES at 34c is STEAL.",
                86,
                100.00,
                94.00,
                ("THE TECH SEER", "ORACLE", "RARE"),
            ),
            curated_signal(
                "sig_crypto_1",
                "CRYPTO",
                "ETH ETF Approval This Month?",
                "https://polymarket.com/event/ethereum-etf-approval-february",
                "BET YES",
                "SEC COMMISSIONER INTERVIEW: Just hinted at 'accelerated review process' on CNBC. Spot ETH ETFs seeing record inflow speculation. YES at 61c with insider buying detected.",
                84,
                120.00,
                46.00,
                ("BLOCKCHAIN VISIONARY", "PROPHET", "UNCOMMON"),
            ),
            curated_signal(
                "sig_media_1",
                "MEDIA",
                "Super Bowl Viewership Record?",
                "https://polymarket.com/event/super-bowl-viewership-record",
                "BET NO",
                "STREAMING FRAGMENTATION: Pre-game tracking shows linear TV down 12% YoY. Streaming numbers not compensating. Over/under set too high. NO at 58c has edge.",
                82,
                75.00,
                32.00,
                ("THE CULTURE CRITIC", "OBSERVER", "UNCOMMON"),
            ),
            curated_signal(
                "sig_whale_2",
                "WHALE MOVE",
                "Tesla FSD V13 Release March?",
                "https://polymarket.com/event/tesla-fsd-v13-march",
                "BET NO",
                "REGULATORY DELAY: NHTSA requesting additional safety documentation. Internal Tesla memo suggests 'late Q2' more realistic. Whale shorting YES at 78c. Follow the money.",
                87,
                90.00,
                28.00,
                ("THE AUTOMOTIVE SPY", "INSIDER", "RARE"),
            ),
        ];
        Self { records }
    }

    pub fn records(&self) -> &[SignalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[allow(clippy::too_many_arguments)]
fn curated_signal(
    id: &str,
    category: &str,
    market: &str,
    url: &str,
    recommendation: &str,
    analysis: &str,
    confidence: i64,
    bet_amount: f64,
    est_profit: f64,
    (char_name, char_class, rarity): (&str, &str, &str),
) -> SignalRecord {
    SignalRecord {
        id: id.to_string(),
        category: category.to_string(),
        market: market.to_string(),
        url: url.to_string(),
        recommendation: recommendation.to_string(),
        analysis: analysis.to_string(),
        confidence,
        bet_amount,
        est_profit,
        char_name: Some(char_name.to_string()),
        char_class: Some(char_class.to_string()),
        rarity: Some(rarity.to_string()),
        timestamp: None,
    }
}

/// The built-in out-of-band correction written by `inject`
pub fn urgent_signal() -> SignalRecord {
    SignalRecord {
        id: crate::inject::URGENT_SIGNAL_ID.to_string(),
        category: "IMMEDIATE".to_string(),
        market: "US Gov Shutdown by Feb 14?".to_string(),
        url: "https://polymarket.com/event/another-us-government-shutdown-by-february-14"
            .to_string(),
        recommendation: "BET NO".to_string(),
        analysis: "DEEP INTEL: Negotiations just resumed. Historical data for 11th-hour resolutions is 92%. Current \"No\" price is $0.78. Bet $5 to make $1.25 profit by tomorrow.".to_string(),
        confidence: 92,
        bet_amount: 5.00,
        est_profit: 1.25,
        char_name: Some("THE NEGOTIATOR".to_string()),
        char_class: Some("FIXER".to_string()),
        rarity: None,
        timestamp: None,
    }
}

/// Load a single signal record from a JSON object file
pub fn signal_from_json_file(path: impl AsRef<Path>) -> Result<SignalRecord, BatchError> {
    let record: SignalRecord = read_json(path.as_ref())?;
    validate_signal(&record)?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Whales
// ---------------------------------------------------------------------------

/// The set of whales one sync upserts
#[derive(Debug, Clone)]
pub struct WhaleBatch {
    records: Vec<WhaleRecord>,
}

impl WhaleBatch {
    pub fn new(records: Vec<WhaleRecord>) -> Result<Self, BatchError> {
        if records.is_empty() {
            return Err(BatchError::Invalid("whale batch is empty".into()));
        }
        let mut seen = HashSet::new();
        for record in &records {
            if record.address.trim().is_empty() {
                return Err(BatchError::Invalid("whale address must not be empty".into()));
            }
            if !record.total_profit.is_finite() {
                return Err(BatchError::Invalid(format!(
                    "whale {}: total_profit must be finite",
                    record.address
                )));
            }
            if !seen.insert(record.address.as_str()) {
                return Err(BatchError::Invalid(format!(
                    "duplicate whale address '{}'",
                    record.address
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        Self::new(read_json(path.as_ref())?)
    }

    /// The built-in whales from the manual leaderboard audit
    pub fn curated() -> Self {
        let whale = |address: &str, alias: &str, total_profit: f64, last_trade: &str, status: &str| {
            WhaleRecord {
                address: address.to_string(),
                alias: alias.to_string(),
                total_profit,
                last_trade: last_trade.to_string(),
                status: status.to_string(),
                timestamp: None,
            }
        };
        Self {
            records: vec![
                whale("0x7bc85f...", "WHALE_ONE", 2_450_000.00, "Bitcoin Up/Down", "ACTIVE"),
                whale("0xe61fd1...", "FED_INSIDER", 890_000.00, "Fed Cut 25bps", "IDLE"),
                whale("0x74d070...", "MACRO_GOD", 1_120_000.00, "US Gov Shutdown", "ACTIVE"),
                whale("0x0c89eb...", "POLITICAL_SNIPER", 450_000.00, "Iran Strikes", "ACTIVE"),
            ],
        }
    }

    pub fn records(&self) -> &[WhaleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
