// src/finder.rs

use crate::config::Config;
use crate::domain::{filter, Listing, SeenSet};
use crate::errors::FinderError;
use crate::notify::Notifier;
use crate::scraper::ListingSource;
use crate::shutdown::Shutdown;
use crate::sink::CsvSink;
use tracing::{info, warn};

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub matched: usize,
    pub notified: usize,
}

/// Fetch, filter, diff, notify, persist, sleep. Forever.
pub struct ApartmentFinder {
    config: Config,
    source: Box<dyn ListingSource>,
    notifier: Box<dyn Notifier>,
    sink: CsvSink,
    seen: SeenSet,
}

impl ApartmentFinder {
    /// Fetches the current snapshot once, marks every match as seen and
    /// writes it to the sink. Nothing is notified for this first snapshot.
    pub fn start(
        config: Config,
        source: Box<dyn ListingSource>,
        notifier: Box<dyn Notifier>,
        sink: CsvSink,
    ) -> Result<Self, FinderError> {
        let mut finder = Self {
            config,
            source,
            notifier,
            sink,
            seen: SeenSet::new(),
        };

        let snapshot = finder.fetch_filtered()?;
        for apt in &snapshot {
            finder.seen.mark_seen(apt.clone());
        }
        info!("Found {} apartments.", snapshot.len());
        finder.sink.append(&snapshot)?;

        Ok(finder)
    }

    #[cfg(test)]
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    fn fetch_filtered(&mut self) -> Result<Vec<Listing>, FinderError> {
        let fetched = self.source.fetch_listings()?;
        Ok(filter::filter(fetched, &self.config))
    }

    /// Matching listings from a fresh fetch that we have not seen yet.
    pub fn fetch_new_data(&mut self) -> Result<(usize, Vec<Listing>), FinderError> {
        let current = self.fetch_filtered()?;
        let fresh = self.seen.new_listings(&current);
        Ok((current.len(), fresh))
    }

    /// One pass through fetch, notify and persist.
    ///
    /// A listing that reached nobody ends the cycle early: it and every later
    /// listing stay unseen and nothing from this cycle is written. A partial
    /// delivery is logged and the listing counts as seen.
    pub fn run_cycle(&mut self) -> Result<CycleReport, FinderError> {
        let (matched, fresh) = self.fetch_new_data()?;
        info!("Found {} new apartments", fresh.len());

        let mut notified = Vec::with_capacity(fresh.len());
        for apt in fresh {
            match self.notifier.notify(&apt) {
                Ok(()) => {}
                Err(e) if e.is_partial() => {
                    warn!("{} notification for {} incomplete: {e}", self.notifier.name(), apt.url)
                }
                Err(e) => return Err(e.into()),
            }
            self.seen.mark_seen(apt.clone());
            notified.push(apt);
        }

        self.sink.append(&notified)?;

        Ok(CycleReport {
            matched,
            notified: notified.len(),
        })
    }

    /// Polls until `shutdown` fires. A failed cycle is logged and the loop
    /// carries on after the usual interval.
    pub fn run(&mut self, shutdown: &Shutdown) {
        let interval = self.config.run_interval;
        info!(
            "Polling {} every {} minutes via {}",
            self.config.craigslist_site,
            interval.as_secs() / 60,
            self.notifier.name()
        );

        loop {
            if shutdown.requested() {
                break;
            }

            if let Err(e) = self.run_cycle() {
                warn!("Poll cycle abandoned: {e}");
            }

            if shutdown.wait(interval) {
                break;
            }
        }

        info!("Interrupted, shutting down. {} apartments seen.", self.seen.len());
    }
}
