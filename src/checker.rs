//! Sequential check run over a channel list

use crate::error::Result;
use crate::models::{timestamp_now, ChannelEntry, CheckedChannel, ResultDocument, ResultSummary, StreamStatus};
use crate::prober::{probe_stream, StreamProber};
use crate::quality::{is_low_framerate, is_mislabeled};
use crate::store::ResultStore;

/// Drives one check run: probe, classify, aggregate, persist
pub struct Checker<P: StreamProber> {
    prober: P,
    store: ResultStore,
}

impl<P: StreamProber> Checker<P> {
    pub fn new(prober: P, store: ResultStore) -> Self {
        Self { prober, store }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Probe every channel once, in order, then replace the stored document.
    ///
    /// Individual stream failures are recorded as `Dead` and never stop the
    /// run; only failing to persist the document is an error.
    pub fn run_check(&self, channels: Vec<ChannelEntry>, timeout_secs: u64) -> Result<ResultSummary> {
        let total = channels.len();
        let mut summary = ResultSummary {
            total,
            ..ResultSummary::empty()
        };
        let mut checked = Vec::with_capacity(total);

        for (i, channel) in channels.into_iter().enumerate() {
            tracing::info!("Checking channel {}/{}: {}", i + 1, total, channel.name);

            let info = probe_stream(&self.prober, &channel.url, timeout_secs);
            let low_framerate = is_low_framerate(info.framerate_num);
            let mislabeled = is_mislabeled(&channel.name, &info.resolution);

            match info.status {
                StreamStatus::Alive => summary.alive += 1,
                StreamStatus::Dead => {
                    tracing::debug!("{} is dead: {}", channel.name, info.error);
                    summary.dead += 1;
                }
            }
            if low_framerate {
                summary.low_framerate += 1;
            }
            if mislabeled {
                summary.mislabeled += 1;
            }

            checked.push(CheckedChannel::new(channel, info, low_framerate, mislabeled, timestamp_now()));
        }

        summary.checked_at = timestamp_now();
        let doc = ResultDocument {
            channels: checked,
            summary: summary.clone(),
        };
        self.store.save(&doc)?;

        tracing::info!(
            "Stream checking completed: {} alive, {} dead, {} low framerate, {} mislabeled",
            summary.alive,
            summary.dead,
            summary.low_framerate,
            summary.mislabeled
        );
        Ok(summary)
    }
}
