// =============================================================================
// Trade Signal vocabulary — reasons, confidence tiers and their price rules
// =============================================================================
//
// Each `SignalReason` is one independent rule: given a `SignalContext` it
// either produces a (price, confidence) pair or stays silent.  The synthesizer
// simply evaluates every rule for a side and collects the hits.

use serde::{Deserialize, Serialize};

/// Ordered confidence tier: `Weak < Moderate < Strong`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    Weak,
    Moderate,
    Strong,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weak => write!(f, "weak"),
            Self::Moderate => write!(f, "moderate"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Side {
    Buy,
    Sell,
}

/// Why a price was recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalReason {
    // --- Buy side ---
    StrongSupport,
    PocSupport,
    ShortTerm,
    RsiOversold,
    RsiWeak,
    RsiNeutralLow,
    Ma20Support,
    // --- Sell side ---
    StrongResistance,
    PocResistance,
    ShortTermTarget,
    RsiOverbought,
    RsiStrong,
    RsiNeutralHigh,
    #[serde(rename = "fibonacci-618")]
    Fibonacci618,
}

/// Market facts every rule reads from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalContext {
    pub current_price: f64,
    /// Latest RSI14, or 50 when it is absent.
    pub rsi: f64,
    /// Clamped relative volatility, see `synthesizer::volatility_factor`.
    pub volatility: f64,
    /// Closest real support (not the fallback band).
    pub support: Option<f64>,
    /// Closest real resistance (not the fallback band).
    pub resistance: Option<f64>,
    pub poc: Option<f64>,
    pub ma20: Option<f64>,
}

impl SignalReason {
    /// Buy rules in evaluation order.
    pub const BUY_RULES: [SignalReason; 7] = [
        Self::StrongSupport,
        Self::PocSupport,
        Self::ShortTerm,
        Self::RsiOversold,
        Self::RsiWeak,
        Self::RsiNeutralLow,
        Self::Ma20Support,
    ];

    /// Sell rules in evaluation order.
    pub const SELL_RULES: [SignalReason; 7] = [
        Self::StrongResistance,
        Self::PocResistance,
        Self::ShortTermTarget,
        Self::RsiOverbought,
        Self::RsiStrong,
        Self::RsiNeutralHigh,
        Self::Fibonacci618,
    ];

    pub fn side(self) -> Side {
        match self {
            Self::StrongSupport
            | Self::PocSupport
            | Self::ShortTerm
            | Self::RsiOversold
            | Self::RsiWeak
            | Self::RsiNeutralLow
            | Self::Ma20Support => Side::Buy,
            Self::StrongResistance
            | Self::PocResistance
            | Self::ShortTermTarget
            | Self::RsiOverbought
            | Self::RsiStrong
            | Self::RsiNeutralHigh
            | Self::Fibonacci618 => Side::Sell,
        }
    }

    /// Apply this rule to `ctx`. `None` means the rule does not fire.
    pub fn evaluate(self, ctx: &SignalContext) -> Option<TradeSignal> {
        use Confidence::*;

        let cp = ctx.current_price;
        let rsi = ctx.rsi;

        let (price, confidence) = match self {
            Self::StrongSupport => {
                let s = ctx.support?;
                (s * 1.02, if cp > s * 1.1 { Strong } else { Moderate })
            }
            Self::PocSupport => (ctx.poc.filter(|&p| p < cp)? * 1.01, Strong),
            Self::ShortTerm => (cp * (1.0 - 1.5 * ctx.volatility), Moderate),
            Self::RsiOversold if rsi < 30.0 => (cp * 0.95, Strong),
            Self::RsiWeak if (30.0..40.0).contains(&rsi) => (cp * 0.97, Moderate),
            Self::RsiNeutralLow if (40.0..50.0).contains(&rsi) => (cp * 0.98, Weak),
            Self::Ma20Support => (ctx.ma20.filter(|&m| m < cp)? * 1.005, Moderate),

            Self::StrongResistance => {
                let r = ctx.resistance?;
                (r * 0.98, if cp < r * 0.9 { Strong } else { Moderate })
            }
            Self::PocResistance => (ctx.poc.filter(|&p| p > cp)? * 0.99, Strong),
            Self::ShortTermTarget => (cp * (1.0 + f64::max(0.05, 2.0 * ctx.volatility)), Moderate),
            Self::RsiOverbought if rsi > 70.0 => (cp * 1.02, Strong),
            Self::RsiStrong if rsi > 60.0 && rsi <= 70.0 => (cp * 1.04, Moderate),
            Self::RsiNeutralHigh if rsi > 50.0 && rsi <= 60.0 => (cp * 1.06, Weak),
            Self::Fibonacci618 => (cp + (ctx.resistance? - cp) * 0.618, Weak),

            _ => return None,
        };

        Some(TradeSignal {
            reason: self,
            price,
            confidence,
        })
    }
}

impl std::fmt::Display for SignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::StrongSupport => "strong-support",
            Self::PocSupport => "poc-support",
            Self::ShortTerm => "short-term",
            Self::RsiOversold => "rsi-oversold",
            Self::RsiWeak => "rsi-weak",
            Self::RsiNeutralLow => "rsi-neutral-low",
            Self::Ma20Support => "ma20-support",
            Self::StrongResistance => "strong-resistance",
            Self::PocResistance => "poc-resistance",
            Self::ShortTermTarget => "short-term-target",
            Self::RsiOverbought => "rsi-overbought",
            Self::RsiStrong => "rsi-strong",
            Self::RsiNeutralHigh => "rsi-neutral-high",
            Self::Fibonacci618 => "fibonacci-618",
        };
        f.write_str(label)
    }
}

/// A recommended buy or sell price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub reason: SignalReason,
    pub price: f64,
    pub confidence: Confidence,
}

impl TradeSignal {
    pub fn side(&self) -> Side {
        self.reason.side()
    }

    /// Signed distance from `current_price`, in percent.
    pub fn change_pct(&self, current_price: f64) -> f64 {
        if current_price == 0.0 {
            return 0.0;
        }
        (self.price - current_price) / current_price * 100.0
    }
}
