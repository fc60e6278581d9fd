//! Throughput benchmarks for bulk operations.
//!
//! Run with: `cargo bench --bench throughput`

use agent_tracker::{AgentStateStore, TierResolver};
use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use governance_core::types::{
    AgentStats, ClosedTrade, Direction, GovernanceContext, Pair, PayoffRange, Session, SideStats,
    TradeProposal,
};
use governance_core::EngineConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use trade_governance::GovernancePipeline;
use trading_engine::DirectionalRouter;
use uuid::Uuid;

const PAIRS: [&str; 4] = ["EUR_USD", "GBP_USD", "AUD_USD", "USD_CAD"];
const SESSIONS: [Session; 4] = [
    Session::Tokyo,
    Session::London,
    Session::NewYork,
    Session::LondonNewYorkOverlap,
];

/// Generate a proposal and matching context with randomized market inputs.
fn generate_random_proposal(rng: &mut impl Rng) -> (TradeProposal, GovernanceContext) {
    let direction = if rng.gen_bool(0.7) {
        Direction::Long
    } else {
        Direction::Short
    };
    let mut ctx = match direction {
        Direction::Long => GovernanceContext::nominal(),
        Direction::Short => GovernanceContext::nominal_short(),
    };
    ctx.friction_ratio = rng.gen_range(1.5..6.0);
    ctx.spread_stability_rank = rng.gen_range(10.0..100.0);
    ctx.pair_expectancy_rank = rng.gen_range(10.0..100.0);
    ctx.liquidity_shock_probability = rng.gen_range(0.0..0.5);
    ctx.spread_pips = rng.gen_range(0.5..3.0);
    ctx.atr_pips = rng.gen_range(6.0..25.0);

    let proposal = TradeProposal::new(
        format!("agent-{}", rng.gen_range(0..16)),
        PAIRS[rng.gen_range(0..PAIRS.len())],
        direction,
        rng.gen_range(0.45..0.70),
        PayoffRange::new(rng.gen_range(8.0..15.0), rng.gen_range(15.0..30.0)),
        PayoffRange::new(rng.gen_range(6.0..10.0), rng.gen_range(10.0..16.0)),
    );
    (proposal, ctx)
}

/// Generate a closed-trade history for one agent.
fn generate_trade_history(rng: &mut impl Rng, agent_id: &str, count: usize) -> Vec<ClosedTrade> {
    let start = Utc::now() - Duration::hours(count as i64 + 1);
    (0..count)
        .map(|i| {
            let entry = Decimal::new(rng.gen_range(10_000..14_000), 4);
            let pips = rng.gen_range(-20..24);
            let direction = if rng.gen_bool(0.75) {
                Direction::Long
            } else {
                Direction::Short
            };
            let exit = entry + Decimal::new(pips * direction.sign(), 4);
            ClosedTrade {
                id: Uuid::new_v4(),
                agent_id: agent_id.to_string(),
                pair: Pair::new(PAIRS[rng.gen_range(0..PAIRS.len())]),
                direction,
                entry_price: entry,
                exit_price: exit,
                opened_at: start + Duration::hours(i as i64),
                closed_at: start + Duration::hours(i as i64) + Duration::minutes(40),
                session: Some(SESSIONS[rng.gen_range(0..SESSIONS.len())]),
                regime: None,
            }
        })
        .collect()
}

/// Benchmark full pipeline evaluation over batches of proposals.
fn bench_proposal_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("proposal_batches");
    let mut rng = StdRng::seed_from_u64(42);
    let pipeline = GovernancePipeline::new(EngineConfig::default(), DirectionalRouter::default())
        .expect("default config is valid");

    for size in [10usize, 100, 1000].iter() {
        let batch: Vec<_> = (0..*size)
            .map(|_| generate_random_proposal(&mut rng))
            .collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("evaluate", size), &batch, |b, batch| {
            b.iter(|| {
                let permitted = batch
                    .iter()
                    .map(|(proposal, ctx)| pipeline.evaluate(proposal, ctx, 70.0))
                    .filter(|o| o.execution.permitted)
                    .count();
                black_box(permitted)
            })
        });
    }

    group.finish();
}

/// Benchmark tier resolution from raw trade histories of increasing length.
fn bench_tier_resolution_from_trades(c: &mut Criterion) {
    let mut group = c.benchmark_group("tier_resolution_from_trades");
    let mut rng = StdRng::seed_from_u64(7);
    let resolver = TierResolver::default();

    for count in [100usize, 1000, 10_000].iter() {
        let trades = generate_trade_history(&mut rng, "bench-agent", *count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("trades", count), &trades, |b, trades| {
            b.iter(|| black_box(resolver.resolve_from_trades("bench-agent", black_box(trades))))
        });
    }

    group.finish();
}

/// Benchmark concurrent-map inserts into the agent state store.
fn bench_state_store_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("agent_state_store");
    let mut rng = StdRng::seed_from_u64(11);
    let resolver = TierResolver::default();

    let states: Vec<_> = (0..500)
        .map(|i| {
            let long_trades = rng.gen_range(50..400);
            let short_trades = rng.gen_range(10..120);
            let stats = AgentStats::new(
                format!("agent-{i}"),
                SideStats {
                    trades: long_trades,
                    wins: long_trades / 2 + rng.gen_range(0..long_trades / 4),
                    gross_profit_pips: rng.gen_range(100.0..800.0),
                    gross_loss_pips: rng.gen_range(100.0..700.0),
                },
                SideStats {
                    trades: short_trades,
                    wins: short_trades / 3,
                    gross_profit_pips: rng.gen_range(100.0..2000.0),
                    gross_loss_pips: rng.gen_range(100.0..2600.0),
                },
            );
            resolver.resolve_from_stats(&stats)
        })
        .collect();

    group.throughput(Throughput::Elements(states.len() as u64));
    group.bench_function("insert_500", |b| {
        b.iter(|| {
            let store = AgentStateStore::new();
            for state in &states {
                store.insert(state.clone());
            }
            black_box(store.len())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_proposal_batches,
    bench_tier_resolution_from_trades,
    bench_state_store_inserts,
);

criterion_main!(benches);
