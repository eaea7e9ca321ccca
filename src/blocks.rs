//! Block inspection and the leader-slot aggregators.
//!
//! Validators earn transaction fees for the blocks they produce as leader.
//! The window builder and the fee estimator both start from the epoch leader
//! schedule, which reports slot offsets within the epoch; absolute slot =
//! epoch start slot + offset, where epoch start = `absoluteSlot - slotIndex`.

use anyhow::{anyhow, Result};
use futures::future::join_all;
use serde_json::json;
use tracing::warn;

use crate::config::AppConfig;
use crate::constants;
use crate::models::{
    BlockDetail, BlockPayload, BlockProductionInfo, BlockStatus, EpochFeeEstimate, EpochInfo,
    InflationRewardEntry, InflationRewardRecord, LeaderSchedule, LeaderSlotWindow,
};
use crate::rpc::{decode_result, RpcClient};

// =============================================================================
// Block inspector
// =============================================================================

/// Outcome of fetching one slot's block.
#[derive(Debug)]
enum BlockFetch {
    Produced(BlockPayload),
    Skipped,
    NoData,
    Failed,
}

async fn fetch_block(rpc: &RpcClient, url: &str, slot: u64) -> BlockFetch {
    let params = json!([slot, {
        "encoding": "json",
        "transactionDetails": "full",
        "rewards": true,
        "maxSupportedTransactionVersion": 0,
    }]);

    let envelope = match rpc.call_raw(url, "getBlock", params).await {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("getBlock({slot}) failed: {e}");
            return BlockFetch::Failed;
        }
    };

    if let Some(err) = envelope.error {
        return classify_block_error(err.code, &err.message);
    }

    match envelope.result {
        Some(value) => match serde_json::from_value::<BlockPayload>(value) {
            Ok(payload) => BlockFetch::Produced(payload),
            Err(e) => {
                warn!("unexpected getBlock({slot}) payload: {e}");
                BlockFetch::Failed
            }
        },
        None => BlockFetch::NoData,
    }
}

/// Map `getBlock` RPC errors onto slot outcomes. `-32009` means the leader
/// skipped the slot; `-32004` means the block is not available from this
/// node (pruned or not yet served). Anything else stays unknown.
fn classify_block_error(code: i64, message: &str) -> BlockFetch {
    if code == -32009 || message.contains("skipped") {
        BlockFetch::Skipped
    } else if code == -32004 || message.contains("not available") {
        BlockFetch::NoData
    } else {
        BlockFetch::Failed
    }
}

/// Per-block transaction tally.
#[derive(Debug, Default, PartialEq, Eq)]
struct BlockTally {
    vote_count: u64,
    non_vote_count: u64,
    fee_lamports: u64,
    compute_units: u64,
}

fn tally_block(block: &BlockPayload) -> BlockTally {
    let mut tally = BlockTally::default();
    for tx in &block.transactions {
        let is_vote = tx
            .transaction
            .message
            .account_keys
            .iter()
            .any(|key| key == constants::VOTE_PROGRAM_ADDRESS);
        if is_vote {
            tally.vote_count += 1;
        } else {
            tally.non_vote_count += 1;
        }
        if let Some(meta) = &tx.meta {
            tally.fee_lamports += meta.fee;
            tally.compute_units += meta.compute_units_consumed.unwrap_or(0);
        }
    }
    tally
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn detail_from_tally(slot: u64, tally: &BlockTally) -> BlockDetail {
    let fee_total_sol = round_to(tally.fee_lamports as f64 / constants::LAMPORTS_PER_SOL, 6);
    let compute_unit_percent = round_to(
        tally.compute_units as f64 / constants::BLOCK_COMPUTE_UNIT_LIMIT as f64 * 100.0,
        1,
    );
    BlockDetail {
        slot,
        status: BlockStatus::Produced,
        vote_count: Some(tally.vote_count),
        non_vote_count: Some(tally.non_vote_count),
        fee_total_sol: Some(fee_total_sol),
        compute_units: Some(tally.compute_units),
        compute_unit_percent: Some(compute_unit_percent),
        explorer_link: Some(crate::models::explorer_link(slot)),
    }
}

/// Inspect one slot. `None` means the slot's state could not be determined
/// at all; skipped and pruned slots still yield a detail.
pub async fn inspect_block(rpc: &RpcClient, url: &str, slot: u64) -> Option<BlockDetail> {
    match fetch_block(rpc, url, slot).await {
        BlockFetch::Produced(payload) => Some(detail_from_tally(slot, &tally_block(&payload))),
        BlockFetch::Skipped => Some(BlockDetail::placeholder(slot, BlockStatus::Skipped)),
        BlockFetch::NoData => Some(BlockDetail::placeholder(slot, BlockStatus::NoData)),
        BlockFetch::Failed => None,
    }
}

// =============================================================================
// Leader-slot window
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
struct WindowPlan {
    /// Completed slots, ascending, at most the 4 nearest to the current slot.
    completed: Vec<u64>,
    /// Upcoming slots, ascending, at most the first 4.
    upcoming: Vec<u64>,
    next_leader_slot: Option<u64>,
    slots_until_next_leader: Option<u64>,
}

fn plan_window(epoch_start_slot: u64, offsets: &[u64], current_slot: u64) -> WindowPlan {
    let mut absolute: Vec<u64> = offsets
        .iter()
        .map(|offset| epoch_start_slot + offset)
        .collect();
    absolute.sort_unstable();

    let (completed, mut upcoming): (Vec<u64>, Vec<u64>) =
        absolute.into_iter().partition(|slot| *slot <= current_slot);

    let next_leader_slot = upcoming.first().copied();
    let slots_until_next_leader = next_leader_slot.map(|slot| slot - current_slot);

    let completed = completed[completed.len().saturating_sub(constants::LEADER_WINDOW_SLOTS)..].to_vec();
    upcoming.truncate(constants::LEADER_WINDOW_SLOTS);

    WindowPlan {
        completed,
        upcoming,
        next_leader_slot,
        slots_until_next_leader,
    }
}

/// Build the recent/upcoming leader-slot window for `/blocks`.
///
/// Display order is upcoming slots descending, then completed slots
/// descending (most recent first).
pub async fn leader_slot_window(rpc: &RpcClient, config: &AppConfig) -> Result<LeaderSlotWindow> {
    let identity = match config.identity_key.as_deref() {
        Some(identity) => identity,
        None => return Ok(LeaderSlotWindow::not_configured()),
    };
    let url = &config.rpc_url;

    let (slot, epoch_info, schedule) = tokio::join!(
        rpc.call(url, "getSlot", json!([{"commitment": "finalized"}])),
        rpc.call(url, "getEpochInfo", json!([{"commitment": "finalized"}])),
        rpc.call(
            url,
            "getLeaderSchedule",
            json!([null, {"commitment": "finalized", "identity": identity}]),
        ),
    );

    let current_slot = slot
        .and_then(|value| value.as_u64())
        .ok_or_else(|| anyhow!("getSlot returned no data"))?;
    let epoch_info: EpochInfo = decode_result("getEpochInfo", epoch_info)
        .ok_or_else(|| anyhow!("getEpochInfo returned no data"))?;
    let schedule: LeaderSchedule = decode_result("getLeaderSchedule", schedule).unwrap_or_default();

    let offsets = schedule.get(identity).cloned().unwrap_or_default();
    let epoch_start_slot = epoch_info.absolute_slot - epoch_info.slot_index;
    let plan = plan_window(epoch_start_slot, &offsets, current_slot);

    // Inspect completed slots concurrently; an undeterminable slot renders
    // as an error entry rather than being dropped from the window.
    let inspections = join_all(
        plan.completed
            .iter()
            .map(|slot| inspect_block(rpc, url, *slot)),
    )
    .await;

    let mut completed: Vec<BlockDetail> = plan
        .completed
        .iter()
        .zip(inspections)
        .map(|(slot, detail)| {
            detail.unwrap_or_else(|| BlockDetail::placeholder(*slot, BlockStatus::Error))
        })
        .collect();
    completed.reverse();

    let mut blocks: Vec<BlockDetail> = plan
        .upcoming
        .iter()
        .rev()
        .map(|slot| BlockDetail::placeholder(*slot, BlockStatus::Upcoming))
        .collect();
    blocks.extend(completed);

    Ok(LeaderSlotWindow {
        current_slot,
        next_leader_slot: plan.next_leader_slot,
        slots_until_next_leader: plan.slots_until_next_leader,
        blocks,
    })
}

// =============================================================================
// Inflation rewards
// =============================================================================

/// Fetch the vote account's inflation rewards for the last finalized epoch
/// and the one before it. A missing reward yields no record, not a zero.
pub async fn fetch_inflation_rewards(
    rpc: &RpcClient,
    config: &AppConfig,
) -> Option<Vec<InflationRewardRecord>> {
    let vote_key = config.vote_key.as_deref()?;
    let url = &config.rpc_url;

    let epoch_info: EpochInfo = decode_result(
        "getEpochInfo",
        rpc.call(url, "getEpochInfo", json!([{"commitment": "finalized"}]))
            .await,
    )?;

    let (last, previous) = tokio::join!(
        fetch_epoch_reward(rpc, url, vote_key, epoch_info.epoch.checked_sub(1)),
        fetch_epoch_reward(rpc, url, vote_key, epoch_info.epoch.checked_sub(2)),
    );

    Some(last.into_iter().chain(previous).collect())
}

async fn fetch_epoch_reward(
    rpc: &RpcClient,
    url: &str,
    vote_key: &str,
    epoch: Option<u64>,
) -> Option<InflationRewardRecord> {
    let epoch = epoch?;
    let result = rpc
        .call(
            url,
            "getInflationReward",
            json!([[vote_key], {"epoch": epoch}]),
        )
        .await;
    let entries: Vec<Option<InflationRewardEntry>> = decode_result("getInflationReward", result)?;
    let entry = entries.into_iter().next().flatten()?;
    Some(InflationRewardRecord {
        epoch: entry.epoch,
        amount_sol: entry.amount as f64 / constants::LAMPORTS_PER_SOL,
        post_balance_lamports: entry.post_balance,
        commission: entry.commission,
        effective_slot: entry.effective_slot,
    })
}

// =============================================================================
// Epoch fee estimator
// =============================================================================

/// Estimate total block-fee revenue for the current epoch.
///
/// Completed leader slots are capped to the most recent 100 and only the
/// most recent 20 are fetched per scrape; anything beyond the sample is
/// linearly extrapolated. The result is a statistical estimate, not a
/// ledger value.
pub async fn estimate_epoch_fees(
    rpc: &RpcClient,
    config: &AppConfig,
) -> Option<EpochFeeEstimate> {
    let identity = config.identity_key.as_deref()?;
    let url = &config.rpc_url;

    let production: BlockProductionInfo = decode_result(
        "getBlockProduction",
        rpc.call(
            url,
            "getBlockProduction",
            json!([{"commitment": "finalized", "identity": identity}]),
        )
        .await,
    )?;
    let produced = production
        .value
        .by_identity
        .get(identity)
        .and_then(|stats| stats.get(1))
        .copied()
        .unwrap_or(0);
    if produced == 0 {
        return Some(EpochFeeEstimate::default());
    }

    let (epoch_info, schedule) = tokio::join!(
        rpc.call(url, "getEpochInfo", json!([{"commitment": "finalized"}])),
        rpc.call(
            url,
            "getLeaderSchedule",
            json!([null, {"commitment": "finalized", "identity": identity}]),
        ),
    );
    let epoch_info: EpochInfo = decode_result("getEpochInfo", epoch_info)?;
    let schedule: LeaderSchedule = decode_result("getLeaderSchedule", schedule)?;
    let offsets = schedule.get(identity)?;

    let epoch_start_slot = epoch_info.absolute_slot - epoch_info.slot_index;
    let current_slot = epoch_info.absolute_slot;

    let mut completed: Vec<u64> = offsets
        .iter()
        .map(|offset| epoch_start_slot + offset)
        .filter(|slot| *slot <= current_slot)
        .collect();
    completed.sort_unstable();
    if completed.len() > constants::FEE_ESTIMATE_MAX_COMPLETED {
        completed = completed.split_off(completed.len() - constants::FEE_ESTIMATE_MAX_COMPLETED);
    }

    let sample_start = completed.len().saturating_sub(constants::FEE_ESTIMATE_SAMPLE);
    let fees = join_all(completed[sample_start..].iter().map(|slot| async move {
        match fetch_block(rpc, url, *slot).await {
            BlockFetch::Produced(payload) => Some(tally_block(&payload).fee_lamports),
            // Skipped or unavailable slots carry no fee data; they are
            // excluded from the sample rather than counted as zero.
            _ => None,
        }
    }))
    .await;

    let sampled: Vec<u64> = fees.into_iter().flatten().collect();
    let sampled_sum: u64 = sampled.iter().sum();

    Some(extrapolate_fees(
        completed.len() as u64,
        sampled.len() as u64,
        sampled_sum,
    ))
}

fn extrapolate_fees(
    blocks_completed: u64,
    blocks_sampled: u64,
    sampled_fee_lamports: u64,
) -> EpochFeeEstimate {
    if blocks_sampled == 0 {
        return EpochFeeEstimate {
            blocks_completed,
            ..EpochFeeEstimate::default()
        };
    }

    let avg_lamports = sampled_fee_lamports as f64 / blocks_sampled as f64;
    let estimated_lamports = if blocks_completed > blocks_sampled {
        avg_lamports * blocks_completed as f64
    } else {
        sampled_fee_lamports as f64
    };

    EpochFeeEstimate {
        total_fees_sol_estimated: estimated_lamports / constants::LAMPORTS_PER_SOL,
        sampled_fees_sol: sampled_fee_lamports as f64 / constants::LAMPORTS_PER_SOL,
        blocks_sampled,
        blocks_completed,
        avg_fee_per_block_sol: avg_lamports / constants::LAMPORTS_PER_SOL,
    }
}
