//! BarFeed — lazy, finite, forward-only sequence of validated bars.
//!
//! Bars are validated once at construction and never mutated afterwards.
//! The feed exposes `next()` for the engine loop plus indexed read-back
//! over the bars already produced, which the terminal statistics pass uses
//! to re-count signals across the full series.

use crate::data::DataError;
use crate::domain::SignalBar;

#[derive(Debug)]
pub struct BarFeed {
    bars: Vec<SignalBar>,
    cursor: usize,
}

impl BarFeed {
    /// Build a feed from a pre-materialized, time-ordered bar sequence.
    ///
    /// Rejects malformed bars (missing cells, negative prices, OHLC out of
    /// range), out-of-order timestamps, and duplicate timestamps. An empty
    /// sequence is valid.
    pub fn new(bars: Vec<SignalBar>) -> Result<Self, DataError> {
        for (idx, bar) in bars.iter().enumerate() {
            let row = idx + 1;
            if !bar.is_sane() {
                return Err(DataError::MalformedBar { row });
            }
            if idx > 0 {
                let prev = bars[idx - 1].datetime;
                if bar.datetime < prev {
                    return Err(DataError::NonMonotonic { row });
                }
                if bar.datetime == prev {
                    return Err(DataError::DuplicateTimestamp { row });
                }
            }
        }
        Ok(Self { bars, cursor: 0 })
    }

    /// Total number of bars in the feed.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Advance the cursor and produce the next bar, or `None` at
    /// end-of-stream.
    pub fn next(&mut self) -> Option<SignalBar> {
        let bar = self.bars.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(bar)
    }

    /// Whether every bar has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.bars.len()
    }

    /// Read back a bar that has already been produced.
    pub fn get(&self, index: usize) -> Option<&SignalBar> {
        if index < self.cursor {
            self.bars.get(index)
        } else {
            None
        }
    }

    /// All bars produced so far, in order.
    pub fn produced(&self) -> &[SignalBar] {
        &self.bars[..self.cursor]
    }

    /// Count of set entry signals across the bars produced so far.
    pub fn entry_signal_count(&self) -> usize {
        self.produced().iter().filter(|b| b.entry_sig).count()
    }

    /// Count of set exit signals across the bars produced so far.
    pub fn exit_signal_count(&self) -> usize {
        self.produced().iter().filter(|b| b.exit_sig).count()
    }
}
