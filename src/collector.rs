//! One scrape cycle: fan out every configured call, collect the result bag.
//!
//! All calls are issued concurrently and each one fails independently; a
//! failed or disabled call leaves its slot in the bag absent and never
//! touches the others.

use serde_json::json;

use crate::blocks;
use crate::models::{RpcBalance, ScrapeData};
use crate::price;
use crate::rpc::decode_result;
use crate::AppState;

pub async fn collect(state: &AppState) -> ScrapeData {
    let config = &state.config;
    let rpc = &state.rpc;
    let url = &config.rpc_url;

    let finalized = json!([{"commitment": "finalized"}]);

    let (
        health,
        version,
        epoch_info,
        slot,
        performance,
        identity_balance,
        leader_schedule,
        block_production,
        epoch_fees,
        vote_balance,
        vote_accounts,
        inflation_rewards,
        sol_price,
    ) = tokio::join!(
        // Local health check, only when a local endpoint is configured.
        async {
            match &config.local_rpc_url {
                Some(local) => rpc.call(local, "getHealth", json!([])).await,
                None => None,
            }
        },
        rpc.call(url, "getVersion", json!([])),
        rpc.call(url, "getEpochInfo", finalized.clone()),
        rpc.call(url, "getSlot", finalized.clone()),
        rpc.call(url, "getRecentPerformanceSamples", json!([5])),
        // Identity-scoped calls.
        async {
            match &config.identity_key {
                Some(identity) => {
                    rpc.call(
                        url,
                        "getBalance",
                        json!([identity, {"commitment": "finalized"}]),
                    )
                    .await
                }
                None => None,
            }
        },
        async {
            match &config.identity_key {
                Some(identity) => {
                    rpc.call(
                        url,
                        "getLeaderSchedule",
                        json!([null, {"commitment": "finalized", "identity": identity}]),
                    )
                    .await
                }
                None => None,
            }
        },
        async {
            match &config.identity_key {
                Some(identity) => {
                    rpc.call(
                        url,
                        "getBlockProduction",
                        json!([{"commitment": "finalized", "identity": identity}]),
                    )
                    .await
                }
                None => None,
            }
        },
        blocks::estimate_epoch_fees(rpc, config),
        // Vote-scoped calls.
        async {
            match &config.vote_key {
                Some(vote) => {
                    rpc.call(url, "getBalance", json!([vote, {"commitment": "finalized"}]))
                        .await
                }
                None => None,
            }
        },
        async {
            match &config.vote_key {
                Some(vote) => {
                    rpc.call(
                        url,
                        "getVoteAccounts",
                        json!([{"commitment": "finalized", "votePubkey": vote}]),
                    )
                    .await
                }
                None => None,
            }
        },
        blocks::fetch_inflation_rewards(rpc, config),
        price::fetch_sol_price(&state.http),
    );

    ScrapeData {
        health: health.and_then(|value| value.as_str().map(str::to_string)),
        version: decode_result("getVersion", version),
        epoch_info: decode_result("getEpochInfo", epoch_info),
        slot: slot.and_then(|value| value.as_u64()),
        performance: decode_result("getRecentPerformanceSamples", performance),
        identity_balance: decode_result::<RpcBalance>("getBalance", identity_balance)
            .map(|balance| balance.value),
        leader_schedule: decode_result("getLeaderSchedule", leader_schedule),
        vote_balance: decode_result::<RpcBalance>("getBalance", vote_balance)
            .map(|balance| balance.value),
        vote_accounts: decode_result("getVoteAccounts", vote_accounts),
        block_production: decode_result("getBlockProduction", block_production),
        sol_price,
        inflation_rewards,
        epoch_fees,
    }
}
