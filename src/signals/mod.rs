// =============================================================================
// Signals Module
// =============================================================================
//
// Trade signal synthesis:
// - Signal vocabulary: reasons, confidence tiers and per-reason price rules
// - Synthesizer: fuses indicators, levels and the volume profile into ranked
//   buy / sell recommendations

pub mod synthesizer;
pub mod trade_signal;

pub use synthesizer::{synthesize, TradePlan};
pub use trade_signal::TradeSignal;
