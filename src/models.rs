//! Serde models: decoded RPC payloads and the domain types served over HTTP.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants;

// =============================================================================
// RPC result payloads
// =============================================================================

/// `getEpochInfo` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub epoch: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    pub absolute_slot: u64,
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub transaction_count: u64,
}

/// `getVersion` result.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "solana-core")]
    pub solana_core: Option<String>,
}

/// One entry of `getRecentPerformanceSamples`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    #[serde(default)]
    pub num_transactions: u64,
    #[serde(default)]
    pub num_slots: u64,
    #[serde(default)]
    pub sample_period_secs: u64,
}

/// `getBalance` result; the `context` half of the envelope is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBalance {
    pub value: u64,
}

/// `getVoteAccounts` result, already filtered to one vote pubkey.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteAccountsInfo {
    #[serde(default)]
    pub current: Vec<VoteAccountEntry>,
    #[serde(default)]
    pub delinquent: Vec<VoteAccountEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteAccountEntry {
    #[serde(default)]
    pub activated_stake: u64,
    #[serde(default)]
    pub last_vote: u64,
    #[serde(default)]
    pub root_slot: u64,
    #[serde(default)]
    pub commission: u64,
}

/// `getLeaderSchedule` result: identity pubkey -> slot offsets within the epoch.
pub type LeaderSchedule = HashMap<String, Vec<u64>>;

/// `getBlockProduction` result.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockProductionInfo {
    pub value: BlockProductionValue,
}

/// `byIdentity` maps an identity to `[leader_slots, blocks_produced]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProductionValue {
    #[serde(default)]
    pub by_identity: HashMap<String, Vec<u64>>,
}

/// `getBlock` payload, reduced to the fields the inspector tallies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPayload {
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockTransaction {
    pub transaction: TransactionBody,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionBody {
    pub message: TransactionMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
    #[serde(default)]
    pub account_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub compute_units_consumed: Option<u64>,
}

/// One entry of `getInflationReward`; the RPC returns `null` for an epoch
/// in which the address earned nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationRewardEntry {
    pub epoch: u64,
    pub amount: u64,
    #[serde(default)]
    pub post_balance: Option<u64>,
    #[serde(default)]
    pub commission: Option<u8>,
    #[serde(default)]
    pub effective_slot: Option<u64>,
}

// =============================================================================
// Domain types
// =============================================================================

/// Slot outcome as displayed in the leader-slot window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockStatus {
    Produced,
    Skipped,
    NoData,
    Error,
    Upcoming,
}

/// Per-block statistics for one leader slot. Absent fields serialize as
/// `null` so consumers can tell "unknown" apart from zero.
#[derive(Debug, Clone, Serialize)]
pub struct BlockDetail {
    pub slot: u64,
    pub status: BlockStatus,
    pub vote_count: Option<u64>,
    pub non_vote_count: Option<u64>,
    pub fee_total_sol: Option<f64>,
    pub compute_units: Option<u64>,
    pub compute_unit_percent: Option<f64>,
    pub explorer_link: Option<String>,
}

impl BlockDetail {
    /// Detail with every numeric field unknown; the explorer link is still
    /// derivable from the slot number alone.
    pub fn placeholder(slot: u64, status: BlockStatus) -> Self {
        Self {
            slot,
            status,
            vote_count: None,
            non_vote_count: None,
            fee_total_sol: None,
            compute_units: None,
            compute_unit_percent: None,
            explorer_link: Some(explorer_link(slot)),
        }
    }
}

pub fn explorer_link(slot: u64) -> String {
    format!("{}/{}", constants::EXPLORER_BLOCK_BASE, slot)
}

/// Recent and upcoming leader slots for the `/blocks` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderSlotWindow {
    pub current_slot: u64,
    pub next_leader_slot: Option<u64>,
    pub slots_until_next_leader: Option<u64>,
    pub blocks: Vec<BlockDetail>,
}

impl LeaderSlotWindow {
    /// Marker returned when no identity key is configured: empty slot list,
    /// no leader projection.
    pub fn not_configured() -> Self {
        Self {
            current_slot: 0,
            next_leader_slot: None,
            slots_until_next_leader: None,
            blocks: Vec::new(),
        }
    }
}

/// Inflation reward credited to the vote account for one finalized epoch.
#[derive(Debug, Clone, Serialize)]
pub struct InflationRewardRecord {
    pub epoch: u64,
    pub amount_sol: f64,
    pub post_balance_lamports: Option<u64>,
    pub commission: Option<u8>,
    pub effective_slot: Option<u64>,
}

/// Fee revenue estimate for the current epoch, extrapolated from a bounded
/// sample of recently produced blocks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EpochFeeEstimate {
    pub total_fees_sol_estimated: f64,
    pub sampled_fees_sol: f64,
    pub blocks_sampled: u64,
    pub blocks_completed: u64,
    pub avg_fee_per_block_sol: f64,
}

/// One scrape cycle's worth of results. `None` marks a call that was not
/// issued (feature disabled by configuration) or yielded no usable data.
/// Field names are the fixed key set; the struct is rebuilt per scrape and
/// consumed once by the formatter.
#[derive(Debug, Default)]
pub struct ScrapeData {
    pub health: Option<String>,
    pub version: Option<VersionInfo>,
    pub epoch_info: Option<EpochInfo>,
    pub slot: Option<u64>,
    pub performance: Option<Vec<PerformanceSample>>,
    pub identity_balance: Option<u64>,
    pub leader_schedule: Option<LeaderSchedule>,
    pub vote_balance: Option<u64>,
    pub vote_accounts: Option<VoteAccountsInfo>,
    pub block_production: Option<BlockProductionInfo>,
    pub sol_price: Option<f64>,
    pub inflation_rewards: Option<Vec<InflationRewardRecord>>,
    pub epoch_fees: Option<EpochFeeEstimate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_status_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(BlockStatus::NoData).unwrap(), "no-data");
        assert_eq!(serde_json::to_value(BlockStatus::Produced).unwrap(), "produced");
    }

    #[test]
    fn placeholder_keeps_absent_fields_null() {
        let detail = BlockDetail::placeholder(12345, BlockStatus::Skipped);
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["status"], "skipped");
        assert!(value["vote_count"].is_null());
        assert!(value["fee_total_sol"].is_null());
        assert_eq!(
            value["explorer_link"],
            "https://explorer.solana.com/block/12345"
        );
    }

    #[test]
    fn epoch_info_decodes_camel_case() {
        let info: EpochInfo = serde_json::from_value(serde_json::json!({
            "epoch": 700,
            "slotIndex": 1000,
            "slotsInEpoch": 432000,
            "absoluteSlot": 302401000u64,
            "blockHeight": 280000000u64,
            "transactionCount": 350000000u64,
        }))
        .unwrap();
        assert_eq!(info.epoch, 700);
        assert_eq!(info.slot_index, 1000);
        assert_eq!(info.absolute_slot, 302401000);
    }

    #[test]
    fn epoch_info_defaults_optional_counters() {
        let info: EpochInfo = serde_json::from_value(serde_json::json!({
            "epoch": 1,
            "slotIndex": 2,
            "slotsInEpoch": 3,
            "absoluteSlot": 4,
        }))
        .unwrap();
        assert_eq!(info.block_height, 0);
        assert_eq!(info.transaction_count, 0);
    }

    #[test]
    fn not_configured_window_is_empty() {
        let window = LeaderSlotWindow::not_configured();
        assert!(window.blocks.is_empty());
        assert_eq!(window.next_leader_slot, None);
    }
}
