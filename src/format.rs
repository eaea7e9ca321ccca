//! Prometheus text rendering of one scrape's result bag.
//!
//! Pure and deterministic: the same bag renders to byte-identical output.
//! A metric whose required input is absent is omitted entirely; derived
//! values (percentages, USD conversions) are only emitted when every input
//! they depend on is present.

use std::fmt::Write as _;

use anyhow::Result;

use crate::config::AppConfig;
use crate::constants;
use crate::models::ScrapeData;

/// Emits gauges in exposition format: one HELP/TYPE preamble per metric,
/// then its value line(s).
struct GaugeWriter {
    out: String,
}

impl GaugeWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn preamble(&mut self, name: &str, help: &str) -> Result<()> {
        writeln!(self.out, "# HELP {name} {help}")?;
        writeln!(self.out, "# TYPE {name} gauge")?;
        Ok(())
    }

    fn gauge(&mut self, name: &str, help: &str, value: f64) -> Result<()> {
        self.preamble(name, help)?;
        writeln!(self.out, "{name} {value}")?;
        Ok(())
    }

    fn labeled(
        &mut self,
        name: &str,
        help: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<()> {
        self.preamble(name, help)?;
        self.series(name, labels, value)
    }

    fn series(&mut self, name: &str, labels: &[(&str, &str)], value: f64) -> Result<()> {
        let rendered: Vec<String> = labels
            .iter()
            .map(|(key, val)| format!("{key}=\"{val}\""))
            .collect();
        writeln!(self.out, "{name}{{{}}} {value}", rendered.join(","))?;
        Ok(())
    }
}

pub fn render(data: &ScrapeData, config: &AppConfig) -> Result<String> {
    let mut w = GaugeWriter::new();

    // Node health and version
    if let Some(health) = &data.health {
        let value = if health == "ok" { 1.0 } else { 0.0 };
        w.gauge(
            "solana_node_health",
            "Node health status (1=healthy, 0=down)",
            value,
        )?;
    }
    if let Some(version) = &data.version {
        let version_str = version.solana_core.as_deref().unwrap_or("unknown");
        w.labeled(
            "solana_node_version_info",
            "Solana version info",
            &[("version", version_str)],
            1.0,
        )?;
    }

    // Epoch and slot info
    if let Some(epoch) = &data.epoch_info {
        w.gauge("solana_epoch_number", "Current epoch number", epoch.epoch as f64)?;
        w.gauge(
            "solana_epoch_slot_index",
            "Current slot within epoch",
            epoch.slot_index as f64,
        )?;
        w.gauge(
            "solana_epoch_slots_total",
            "Total slots in current epoch",
            epoch.slots_in_epoch as f64,
        )?;
        w.gauge("solana_slot_height", "Current absolute slot", epoch.absolute_slot as f64)?;
        w.gauge("solana_block_height", "Current block height", epoch.block_height as f64)?;
        w.gauge(
            "solana_transactions_total",
            "Total transactions since genesis",
            epoch.transaction_count as f64,
        )?;

        let progress = if epoch.slots_in_epoch > 0 {
            epoch.slot_index as f64 / epoch.slots_in_epoch as f64 * 100.0
        } else {
            0.0
        };
        w.gauge(
            "solana_epoch_progress_percent",
            "Epoch completion percentage",
            progress,
        )?;
    }

    // Cluster slot (for comparison with a local validator)
    if let Some(slot) = data.slot {
        w.gauge("solana_cluster_slot", "Latest cluster slot", slot as f64)?;
    }

    // Network performance, most recent sample
    if let Some(sample) = data.performance.as_ref().and_then(|samples| samples.first()) {
        let tps = if sample.sample_period_secs > 0 {
            sample.num_transactions as f64 / sample.sample_period_secs as f64
        } else {
            0.0
        };
        w.gauge("solana_network_tps", "Network transactions per second", tps)?;

        let slot_time_ms = if sample.num_slots > 0 {
            1000.0 * sample.sample_period_secs as f64 / sample.num_slots as f64
        } else {
            0.0
        };
        w.gauge(
            "solana_network_slot_time_ms",
            "Average time per slot in milliseconds",
            slot_time_ms,
        )?;
    }

    // SOL price
    if let Some(price) = data.sol_price {
        w.gauge("solana_price_usd", "Current SOL price in USD", price)?;
    }

    // Validator balances
    if let Some(lamports) = data.identity_balance {
        let sol = lamports as f64 / constants::LAMPORTS_PER_SOL;
        w.gauge(
            "solana_validator_identity_balance_sol",
            "Validator identity account balance (SOL)",
            sol,
        )?;
        if let Some(price) = data.sol_price {
            w.gauge(
                "solana_validator_identity_balance_usd",
                "Validator identity account balance (USD)",
                sol * price,
            )?;
        }
    }
    if let Some(lamports) = data.vote_balance {
        let sol = lamports as f64 / constants::LAMPORTS_PER_SOL;
        w.gauge(
            "solana_validator_vote_balance_sol",
            "Validator vote account balance (SOL)",
            sol,
        )?;
        if let Some(price) = data.sol_price {
            w.gauge(
                "solana_validator_vote_balance_usd",
                "Validator vote account balance (USD)",
                sol * price,
            )?;
        }
    }

    // Validator stake and status
    if let Some(vote_accounts) = &data.vote_accounts {
        if let Some(validator) = vote_accounts.current.first() {
            let stake_sol = validator.activated_stake as f64 / constants::LAMPORTS_PER_SOL;
            w.gauge(
                "solana_validator_activated_stake_sol",
                "Active stake delegated to validator (SOL)",
                stake_sol,
            )?;
            if let Some(price) = data.sol_price {
                w.gauge(
                    "solana_validator_activated_stake_usd",
                    "Active stake delegated to validator (USD)",
                    stake_sol * price,
                )?;
            }
            w.gauge(
                "solana_validator_last_vote_slot",
                "Last voted slot",
                validator.last_vote as f64,
            )?;
            w.gauge("solana_validator_root_slot", "Root slot", validator.root_slot as f64)?;
            w.gauge(
                "solana_validator_commission_percent",
                "Validator commission percentage",
                validator.commission as f64,
            )?;
        }
        if !vote_accounts.current.is_empty() || !vote_accounts.delinquent.is_empty() {
            let delinquent = if vote_accounts.delinquent.is_empty() { 0.0 } else { 1.0 };
            w.gauge(
                "solana_validator_delinquent",
                "Validator delinquency status (0=active, 1=delinquent)",
                delinquent,
            )?;
        }
    }

    // Leader schedule
    if let Some(schedule) = &data.leader_schedule {
        let assigned = config
            .identity_key
            .as_deref()
            .and_then(|identity| schedule.get(identity))
            .map(|slots| slots.len())
            .unwrap_or(0);
        w.gauge(
            "solana_validator_leader_slots_assigned",
            "Number of leader slots assigned this epoch",
            assigned as f64,
        )?;
    }

    // Block production and skip rate
    if let (Some(production), Some(identity)) =
        (&data.block_production, config.identity_key.as_deref())
    {
        if let Some(stats) = production.value.by_identity.get(identity) {
            let leader_slots = stats.first().copied().unwrap_or(0);
            let produced = stats.get(1).copied().unwrap_or(0);
            let skipped = leader_slots.saturating_sub(produced);

            w.gauge(
                "solana_validator_leader_slots_total",
                "Total leader slots",
                leader_slots as f64,
            )?;
            w.gauge(
                "solana_validator_blocks_produced",
                "Blocks successfully produced",
                produced as f64,
            )?;
            w.gauge(
                "solana_validator_blocks_skipped",
                "Blocks skipped (missed)",
                skipped as f64,
            )?;

            let skip_rate = if leader_slots > 0 {
                skipped as f64 / leader_slots as f64 * 100.0
            } else {
                0.0
            };
            w.gauge(
                "solana_validator_skip_rate_percent",
                "Skip rate percentage",
                skip_rate,
            )?;
        }
    }

    // Inflation rewards, one series per finalized epoch
    if let Some(rewards) = data.inflation_rewards.as_ref().filter(|r| !r.is_empty()) {
        w.preamble(
            "solana_validator_inflation_reward_sol",
            "Inflation reward credited to the vote account (SOL)",
        )?;
        for reward in rewards {
            let epoch = reward.epoch.to_string();
            w.series(
                "solana_validator_inflation_reward_sol",
                &[("epoch", &epoch)],
                reward.amount_sol,
            )?;
        }
        if let Some(price) = data.sol_price {
            w.preamble(
                "solana_validator_inflation_reward_usd",
                "Inflation reward credited to the vote account (USD)",
            )?;
            for reward in rewards {
                let epoch = reward.epoch.to_string();
                w.series(
                    "solana_validator_inflation_reward_usd",
                    &[("epoch", &epoch)],
                    reward.amount_sol * price,
                )?;
            }
        }
    }

    // Epoch fee estimate
    if let Some(fees) = &data.epoch_fees {
        w.gauge(
            "solana_validator_epoch_fees_sol",
            "Estimated total block fees earned this epoch (SOL)",
            fees.total_fees_sol_estimated,
        )?;
        w.gauge(
            "solana_validator_epoch_fees_sampled_sol",
            "Block fees summed over the sampled blocks (SOL)",
            fees.sampled_fees_sol,
        )?;
        w.gauge(
            "solana_validator_epoch_fee_blocks_sampled",
            "Blocks sampled for the fee estimate",
            fees.blocks_sampled as f64,
        )?;
        w.gauge(
            "solana_validator_epoch_fee_blocks_completed",
            "Completed leader slots considered by the fee estimate",
            fees.blocks_completed as f64,
        )?;
        w.gauge(
            "solana_validator_epoch_fee_avg_per_block_sol",
            "Average fee revenue per sampled block (SOL)",
            fees.avg_fee_per_block_sol,
        )?;
        if let Some(price) = data.sol_price {
            w.gauge(
                "solana_validator_epoch_fees_usd",
                "Estimated total block fees earned this epoch (USD)",
                fees.total_fees_sol_estimated * price,
            )?;
        }
    }

    // Exporter metadata
    w.labeled(
        "solana_exporter_build_info",
        "Exporter version info",
        &[("version", env!("CARGO_PKG_VERSION"))],
        1.0,
    )?;

    Ok(w.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use std::collections::HashMap;

    const IDENTITY: &str = "ExporterTestIdentity11111111111111111111111";

    fn test_config() -> AppConfig {
        AppConfig {
            identity_key: Some(IDENTITY.to_string()),
            vote_key: Some("ExporterTestVote111111111111111111111111111".to_string()),
            ..AppConfig::default()
        }
    }

    fn full_bag() -> ScrapeData {
        ScrapeData {
            health: Some("ok".to_string()),
            version: Some(VersionInfo {
                solana_core: Some("2.1.13".to_string()),
            }),
            epoch_info: Some(EpochInfo {
                epoch: 700,
                slot_index: 216_000,
                slots_in_epoch: 432_000,
                absolute_slot: 302_616_000,
                block_height: 280_000_000,
                transaction_count: 350_000_000,
            }),
            slot: Some(302_616_004),
            performance: Some(vec![PerformanceSample {
                num_transactions: 60_000,
                num_slots: 120,
                sample_period_secs: 60,
            }]),
            identity_balance: Some(5_000_000_000),
            leader_schedule: Some(HashMap::from([(
                IDENTITY.to_string(),
                vec![100, 200, 300],
            )])),
            vote_balance: Some(2_500_000_000),
            vote_accounts: Some(VoteAccountsInfo {
                current: vec![VoteAccountEntry {
                    activated_stake: 100_000_000_000,
                    last_vote: 302_616_000,
                    root_slot: 302_615_968,
                    commission: 5,
                }],
                delinquent: vec![],
            }),
            block_production: Some(BlockProductionInfo {
                value: BlockProductionValue {
                    by_identity: HashMap::from([(IDENTITY.to_string(), vec![40, 38])]),
                },
            }),
            sol_price: Some(200.0),
            inflation_rewards: Some(vec![InflationRewardRecord {
                epoch: 699,
                amount_sol: 1.5,
                post_balance_lamports: Some(2_500_000_000),
                commission: Some(5),
                effective_slot: Some(302_400_001),
            }]),
            epoch_fees: Some(EpochFeeEstimate {
                total_fees_sol_estimated: 5.0,
                sampled_fees_sol: 2.0,
                blocks_sampled: 20,
                blocks_completed: 50,
                avg_fee_per_block_sol: 0.1,
            }),
        }
    }

    const ALL_METRICS: &[&str] = &[
        "solana_node_health",
        "solana_node_version_info",
        "solana_epoch_number",
        "solana_epoch_slot_index",
        "solana_epoch_slots_total",
        "solana_slot_height",
        "solana_block_height",
        "solana_transactions_total",
        "solana_epoch_progress_percent",
        "solana_cluster_slot",
        "solana_network_tps",
        "solana_network_slot_time_ms",
        "solana_price_usd",
        "solana_validator_identity_balance_sol",
        "solana_validator_identity_balance_usd",
        "solana_validator_vote_balance_sol",
        "solana_validator_vote_balance_usd",
        "solana_validator_activated_stake_sol",
        "solana_validator_activated_stake_usd",
        "solana_validator_last_vote_slot",
        "solana_validator_root_slot",
        "solana_validator_commission_percent",
        "solana_validator_delinquent",
        "solana_validator_leader_slots_assigned",
        "solana_validator_leader_slots_total",
        "solana_validator_blocks_produced",
        "solana_validator_blocks_skipped",
        "solana_validator_skip_rate_percent",
        "solana_validator_inflation_reward_sol",
        "solana_validator_inflation_reward_usd",
        "solana_validator_epoch_fees_sol",
        "solana_validator_epoch_fees_sampled_sol",
        "solana_validator_epoch_fee_blocks_sampled",
        "solana_validator_epoch_fee_blocks_completed",
        "solana_validator_epoch_fee_avg_per_block_sol",
        "solana_validator_epoch_fees_usd",
        "solana_exporter_build_info",
    ];

    #[test]
    fn full_bag_emits_every_metric_exactly_once() {
        let out = render(&full_bag(), &test_config()).unwrap();
        for name in ALL_METRICS {
            let help = format!("# HELP {name} ");
            assert_eq!(out.matches(&help).count(), 1, "preamble for {name}");
            let typ = format!("# TYPE {name} gauge\n");
            assert_eq!(out.matches(&typ).count(), 1, "type line for {name}");
        }
    }

    #[test]
    fn full_bag_renders_expected_values() {
        let out = render(&full_bag(), &test_config()).unwrap();
        assert!(out.contains("solana_node_health 1\n"));
        assert!(out.contains(r#"solana_node_version_info{version="2.1.13"} 1"#));
        assert!(out.contains("solana_epoch_progress_percent 50\n"));
        assert!(out.contains("solana_network_tps 1000\n"));
        assert!(out.contains("solana_network_slot_time_ms 500\n"));
        assert!(out.contains("solana_price_usd 200\n"));
        assert!(out.contains("solana_validator_identity_balance_sol 5\n"));
        assert!(out.contains("solana_validator_identity_balance_usd 1000\n"));
        assert!(out.contains("solana_validator_activated_stake_sol 100\n"));
        assert!(out.contains("solana_validator_delinquent 0\n"));
        assert!(out.contains("solana_validator_leader_slots_assigned 3\n"));
        assert!(out.contains("solana_validator_blocks_skipped 2\n"));
        assert!(out.contains("solana_validator_skip_rate_percent 5\n"));
        assert!(out.contains(r#"solana_validator_inflation_reward_sol{epoch="699"} 1.5"#));
        assert!(out.contains(r#"solana_validator_inflation_reward_usd{epoch="699"} 300"#));
        assert!(out.contains("solana_validator_epoch_fees_sol 5\n"));
        assert!(out.contains("solana_validator_epoch_fees_usd 1000\n"));
    }

    #[test]
    fn failed_call_only_suppresses_its_own_metrics() {
        let mut bag = full_bag();
        bag.vote_accounts = None;

        let out = render(&bag, &test_config()).unwrap();
        assert!(!out.contains("solana_validator_activated_stake_sol"));
        assert!(!out.contains("solana_validator_delinquent"));
        assert!(!out.contains("solana_validator_commission_percent"));
        // Independent calls are unaffected.
        assert!(out.contains("solana_node_health 1\n"));
        assert!(out.contains("solana_validator_identity_balance_sol 5\n"));
        assert!(out.contains("solana_validator_skip_rate_percent 5\n"));
    }

    #[test]
    fn absent_balance_is_omitted_not_zero() {
        let mut bag = full_bag();
        bag.identity_balance = None;

        let out = render(&bag, &test_config()).unwrap();
        assert!(!out.contains("solana_validator_identity_balance_sol"));
        assert!(!out.contains("solana_validator_identity_balance_usd"));
    }

    #[test]
    fn usd_metrics_require_the_price_quote() {
        let mut bag = full_bag();
        bag.sol_price = None;

        let out = render(&bag, &test_config()).unwrap();
        assert!(!out.contains("solana_price_usd"));
        assert!(!out.contains("_usd"));
        // SOL-denominated siblings stay.
        assert!(out.contains("solana_validator_identity_balance_sol 5\n"));
        assert!(out.contains("solana_validator_epoch_fees_sol 5\n"));
    }

    #[test]
    fn delinquent_validator_reports_one() {
        let mut bag = full_bag();
        let accounts = bag.vote_accounts.as_mut().unwrap();
        accounts.delinquent = std::mem::take(&mut accounts.current);

        let out = render(&bag, &test_config()).unwrap();
        assert!(out.contains("solana_validator_delinquent 1\n"));
        // Stake details come from the active list only.
        assert!(!out.contains("solana_validator_activated_stake_sol"));
    }

    #[test]
    fn empty_leader_schedule_reports_zero_assigned() {
        let mut bag = full_bag();
        bag.leader_schedule = Some(HashMap::new());

        let out = render(&bag, &test_config()).unwrap();
        assert!(out.contains("solana_validator_leader_slots_assigned 0\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let bag = full_bag();
        let config = test_config();
        let first = render(&bag, &config).unwrap();
        let second = render(&bag, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_bag_renders_only_build_info() {
        let out = render(&ScrapeData::default(), &AppConfig::default()).unwrap();
        assert_eq!(out.matches("# HELP ").count(), 1);
        assert!(out.contains("solana_exporter_build_info"));
    }
}
