//! Tranche Epoch - demo binary.
//!
//! Clears one epoch of a sample two-tranche pool using settings from the
//! environment and prints the solution as JSON.
//!
//! ```bash
//! RUST_LOG=debug POOL_MAX_RESERVE=150 cargo run
//! ```

use std::error::Error;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use tranche_epoch::config::EngineConfig;
use tranche_epoch::decimal;
use tranche_epoch::epoch::{apply_fills, normalize_orders, order_fills, project_pool, submit_epoch};
use tranche_epoch::rates;
use tranche_epoch::types::{CurrencyId, Epoch, OrderType, Pool, RawOrder, Tranche};
use tranche_epoch::valuation;

const DECIMALS: u32 = 6;

fn sample_pool() -> Result<Pool, Box<dyn Error>> {
    let price = decimal::to_base_units("1", DECIMALS)?;
    let senior = Tranche::new(0, 0, decimal::to_base_units("800", DECIMALS)?, price.clone())
        .with_interest_rate(rates::apr_to_per_sec_rate("5")?);
    let junior = Tranche::new(1, 1, decimal::to_base_units("200", DECIMALS)?, price)
        .with_interest_rate(rates::apr_to_per_sec_rate("12")?);
    Ok(Pool::new(
        1,
        CurrencyId::ForeignAsset(1),
        DECIMALS,
        decimal::to_base_units("100", DECIMALS)?,
        decimal::to_base_units("900", DECIMALS)?,
        vec![senior, junior],
    ))
}

fn sample_orders() -> Vec<RawOrder> {
    let raw = |id, investor: &str, order_type, tranche_id, amount: &str| RawOrder {
        id,
        investor: investor.to_string(),
        order_type,
        tranche_id,
        epoch_id: 1,
        amount: amount.to_string(),
    };
    vec![
        raw(1, "alice", OrderType::Invest, 0, "60"),
        raw(2, "bob", OrderType::Invest, 0, "40"),
        raw(3, "carol", OrderType::Invest, 1, "25.5"),
        raw(4, "dave", OrderType::Redeem, 1, "10"),
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    println!("===========================================");
    println!("  Tranche Epoch - sample clearing run");
    println!("===========================================");
    println!();

    let config = EngineConfig::from_env()?;
    let timing = config.timing();
    let pool = sample_pool()?;
    let constraints = config.solution_constraints(pool.currency_decimals)?;

    for tranche in &pool.tranches {
        println!(
            "Tranche {} ({:?}): value {}, APR {}%",
            tranche.id,
            tranche.tranche_type(pool.tranches.len()),
            decimal::from_base_units(&tranche.value(DECIMALS), DECIMALS),
            rates::per_sec_rate_to_apr(&tranche.interest_rate_per_sec),
        );
    }

    let epoch = Epoch::open(pool.pool_id, 1, 0);
    let now = timing.min_epoch_duration;
    let orders = normalize_orders(&pool, epoch.epoch_id, &sample_orders())?;
    let epoch = submit_epoch(&pool, &epoch, &orders, &constraints, &timing, now)?;

    let Some(solution) = epoch.solution.as_ref() else {
        return Err("epoch has no solution".into());
    };
    println!();
    println!("{}", serde_json::to_string_pretty(solution)?);
    println!();
    println!("Digest: {}", solution.digest_hex());

    if !solution.is_feasible {
        println!("Solution is infeasible; epoch stays in submission.");
        return Ok(());
    }

    let epoch = epoch
        .execute(&timing, now + timing.challenge_period)?
        .close()?;
    let orders = apply_fills(&orders, &order_fills(&orders, solution));
    let next_pool = project_pool(&pool, solution);
    let next_epoch = epoch.next(now + timing.challenge_period)?;

    println!();
    for order in &orders {
        println!("Order {} ({}): {:?}", order.id, order.investor, order.status);
    }
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&valuation::pool_state_summary(&next_pool, &next_epoch))?
    );
    Ok(())
}
