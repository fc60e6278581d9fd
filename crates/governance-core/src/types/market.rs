//! Market-state types supplied by the indicator feed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Multiplies a raw price move into a
    /// favorable/adverse move.
    pub fn sign(&self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn all() -> &'static [Direction] {
        &[Direction::Long, Direction::Short]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Execution engine a proposal is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionEngine {
    LongEngine,
    ShortEngine,
    Blocked,
}

impl ExecutionEngine {
    /// The only engine that may serve the given direction.
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Long => ExecutionEngine::LongEngine,
            Direction::Short => ExecutionEngine::ShortEngine,
        }
    }

    /// True when this engine may legally serve `direction`. `Blocked` is
    /// compatible with every direction.
    pub fn serves(&self, direction: Direction) -> bool {
        match self {
            ExecutionEngine::Blocked => true,
            engine => *engine == Self::for_direction(direction),
        }
    }
}

impl fmt::Display for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEngine::LongEngine => write!(f, "LONG_ENGINE"),
            ExecutionEngine::ShortEngine => write!(f, "SHORT_ENGINE"),
            ExecutionEngine::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// Currency pair in `BASE_QUOTE` form, e.g. `EUR_USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pair(String);

impl Pair {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JPY-quoted pairs move in 0.01 increments.
    pub fn is_jpy_quoted(&self) -> bool {
        self.0.ends_with("JPY")
    }

    /// Price increment of one pip.
    pub fn pip_size(&self) -> Decimal {
        if self.is_jpy_quoted() {
            Decimal::new(1, 2)
        } else {
            Decimal::new(1, 4)
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pair {
    fn from(s: &str) -> Self {
        Pair::new(s)
    }
}

impl From<String> for Pair {
    fn from(s: String) -> Self {
        Pair::new(s)
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.0
    }
}

/// Volatility cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityPhase {
    Compression,
    Ignition,
    Expansion,
    Exhaustion,
}

impl VolatilityPhase {
    /// Whether `self -> next` advances along compression, ignition,
    /// expansion (or holds inside the ignition/expansion leg).
    pub fn is_valid_transition(&self, next: VolatilityPhase) -> bool {
        use VolatilityPhase::*;
        matches!(
            (*self, next),
            (Compression, Ignition)
                | (Ignition, Ignition)
                | (Ignition, Expansion)
                | (Expansion, Expansion)
        )
    }

    pub fn is_expanding(&self) -> bool {
        matches!(self, VolatilityPhase::Ignition | VolatilityPhase::Expansion)
    }
}

/// Trading session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Sydney,
    Tokyo,
    London,
    NewYork,
    LondonNewYorkOverlap,
    Rollover,
}

impl Session {
    pub fn name(&self) -> &'static str {
        match self {
            Session::Sydney => "sydney",
            Session::Tokyo => "tokyo",
            Session::London => "london",
            Session::NewYork => "new_york",
            Session::LondonNewYorkOverlap => "london_new_york_overlap",
            Session::Rollover => "rollover",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edge-decay state of the signal family behind a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDecayState {
    Stable,
    Softening,
    Decaying,
}

/// Label of the recent trade-sequencing cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencingCluster {
    Momentum,
    Neutral,
    Choppy,
    LossCluster,
}

/// Market regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeLabel {
    TrendingBullish,
    TrendingBearish,
    Breakout,
    Breakdown,
    Ranging,
    Volatile,
}

impl RegimeLabel {
    /// Whether this regime authorizes trades in `direction`.
    pub fn authorizes(&self, direction: Direction) -> bool {
        match direction {
            Direction::Long => matches!(self, RegimeLabel::TrendingBullish | RegimeLabel::Breakout),
            Direction::Short => {
                matches!(self, RegimeLabel::TrendingBearish | RegimeLabel::Breakdown)
            }
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegimeLabel::TrendingBullish => "trending_bullish",
            RegimeLabel::TrendingBearish => "trending_bearish",
            RegimeLabel::Breakout => "breakout",
            RegimeLabel::Breakdown => "breakdown",
            RegimeLabel::Ranging => "ranging",
            RegimeLabel::Volatile => "volatile",
        };
        f.write_str(name)
    }
}

/// Snapshot of market and operational signals at proposal time.
///
/// The core fields are required. Indicator signals that a feed may omit
/// default to their most conservative value (`false` / `0.0`), so a missing
/// signal fails its check instead of silently passing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceContext {
    // Multi-timeframe alignment
    pub htf_aligned: bool,
    pub mtf_aligned: bool,
    pub ltf_aligned: bool,
    /// 0-100.
    pub mtf_alignment_score: f64,

    // Volatility
    pub volatility_phase: VolatilityPhase,
    pub prior_volatility_phase: VolatilityPhase,
    /// 0-1.
    pub volatility_confidence: f64,
    /// 0-100; low values mean a quiet market.
    pub volatility_score: f64,

    // Liquidity and friction
    /// 0-1.
    pub liquidity_shock_probability: f64,
    /// 0-100; higher is more stable.
    pub spread_stability_rank: f64,
    /// Expected move divided by round-trip friction.
    pub friction_ratio: f64,
    /// 0-100.
    pub pair_expectancy_rank: f64,

    // Session
    pub session: Session,
    /// 0-1.
    pub session_aggressiveness: f64,

    pub edge_decay: EdgeDecayState,
    pub sequencing_cluster: SequencingCluster,
    pub regime: RegimeLabel,

    // Raw execution values, in pips
    pub spread_pips: f64,
    pub slippage_pips: f64,
    pub atr_pips: f64,
    #[serde(default)]
    pub swing_distance_pips: f64,

    // Indicator signals
    #[serde(default)]
    pub indicator_coalition_confirmed: bool,
    #[serde(default)]
    pub trend_efficiency: f64,
    #[serde(default)]
    pub adx: f64,
    #[serde(default)]
    pub adx_rising: bool,
    #[serde(default)]
    pub supertrend_bearish: bool,
    #[serde(default)]
    pub donchian_lower_break: bool,
    #[serde(default)]
    pub post_break_ignition_candle: bool,

    // Data availability
    #[serde(default)]
    pub price_data_available: bool,
    #[serde(default)]
    pub analysis_available: bool,
}

impl GovernanceContext {
    /// A calm, fully aligned long-side snapshot with every signal in its
    /// nominal band. Fixtures start from this and perturb single fields.
    pub fn nominal() -> Self {
        Self {
            htf_aligned: true,
            mtf_aligned: true,
            ltf_aligned: true,
            mtf_alignment_score: 75.0,
            volatility_phase: VolatilityPhase::Expansion,
            prior_volatility_phase: VolatilityPhase::Ignition,
            volatility_confidence: 0.7,
            volatility_score: 55.0,
            liquidity_shock_probability: 0.10,
            spread_stability_rank: 75.0,
            friction_ratio: 5.0,
            pair_expectancy_rank: 60.0,
            session: Session::London,
            session_aggressiveness: 0.7,
            edge_decay: EdgeDecayState::Stable,
            sequencing_cluster: SequencingCluster::Neutral,
            regime: RegimeLabel::TrendingBullish,
            spread_pips: 0.8,
            slippage_pips: 0.2,
            atr_pips: 12.0,
            swing_distance_pips: 10.0,
            indicator_coalition_confirmed: true,
            trend_efficiency: 0.62,
            adx: 28.0,
            adx_rising: true,
            supertrend_bearish: false,
            donchian_lower_break: false,
            post_break_ignition_candle: false,
            price_data_available: true,
            analysis_available: true,
        }
    }

    /// The nominal snapshot flipped to a confirmed bearish breakdown.
    pub fn nominal_short() -> Self {
        Self {
            regime: RegimeLabel::TrendingBearish,
            indicator_coalition_confirmed: true,
            adx: 26.0,
            adx_rising: true,
            supertrend_bearish: true,
            donchian_lower_break: true,
            post_break_ignition_candle: true,
            ..Self::nominal()
        }
    }

    /// Number of timeframes reporting alignment.
    pub fn aligned_timeframes(&self) -> usize {
        [self.htf_aligned, self.mtf_aligned, self.ltf_aligned]
            .iter()
            .filter(|&&aligned| aligned)
            .count()
    }

    /// Spread as a fraction of ATR, `None` when ATR is not positive.
    pub fn spread_to_atr(&self) -> Option<f64> {
        (self.atr_pips > 0.0).then(|| self.spread_pips / self.atr_pips)
    }
}
