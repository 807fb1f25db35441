//! ==============================================================================
//! monitor.rs - the companion side's poll cycle
//! ==============================================================================
//!
//! purpose:
//!     a single-threaded loop that, on every tick:
//!
//!         wait ──> GET /data ──> (ok) append to history ──> redraw
//!                            └─> (err) log, no append ──┘
//!
//!     no failure ends the loop. the next attempt is simply the next tick.
//!
//! relationships:
//!     - used by: main.rs (`monitor` role)
//!     - uses: poller.rs, history.rs, render.rs
//!
//! ==============================================================================

use std::time::{Duration, Instant};

use crate::config::MonitorConfig;
use crate::domain::Reading;
use crate::history::HistoryStore;
use crate::poller::Poller;
use crate::render::{PollStatus, TrendRenderer};

/// shortest pause between two cycles, even when a request ran long
const MIN_PAUSE: Duration = Duration::from_millis(200);

pub struct Monitor {
    poller: Poller,
    store: HistoryStore,
    renderer: TrendRenderer,
    interval: Duration,
    save_every: u64,
    show_sensor_data: bool,
    latest: Option<Reading>,
    status: PollStatus,
    successes: u64,
}

impl Monitor {
    pub fn new(poller: Poller, store: HistoryStore, renderer: TrendRenderer, interval: Duration, save_every: u32) -> Self {
        Self {
            poller,
            store,
            renderer,
            interval,
            save_every: save_every.max(1) as u64,
            show_sensor_data: true,
            latest: None,
            status: PollStatus::Starting,
            successes: 0,
        }
    }

    pub fn from_config(config: &MonitorConfig, show_sensor_data: bool) -> anyhow::Result<Self> {
        let poller = Poller::new(config.data_url(), config.timeout())?;
        let store = HistoryStore::open(&config.data_dir, &config.history_file, config.max_records)?;
        let renderer = TrendRenderer::new(config.chart_path(), config.period, config.poll_interval().as_secs());

        tracing::info!("history: {}", store.path().display());
        tracing::info!("trends: {}", renderer.output().display());

        let mut monitor = Self::new(poller, store, renderer, config.poll_interval(), config.save_every);
        monitor.show_sensor_data = show_sensor_data;
        Ok(monitor)
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    pub fn status(&self) -> &PollStatus {
        &self.status
    }

    /// one poll cycle; true when a record was appended
    pub async fn cycle(&mut self) -> bool {
        self.status = PollStatus::Reading;
        self.render();

        let appended = match self.poller.poll_once().await {
            Ok(sample) => {
                let reading = Reading::now(sample);
                if self.show_sensor_data {
                    tracing::info!("[POLL] Temp: {:.1}°C | Humidity: {:.1}%", reading.temperature, reading.humidity);
                }
                self.latest = Some(reading);
                self.successes += 1;
                self.status = PollStatus::Ok;

                self.successes % self.save_every == 0 && self.persist(reading)
            }
            Err(e) => {
                tracing::warn!("[POLL] ⚠ {} ({})", e, self.poller.url());
                self.status = PollStatus::Error(e.to_string());
                false
            }
        };

        self.render();
        appended
    }

    fn persist(&self, reading: Reading) -> bool {
        match self.store.append(reading.into()) {
            Ok(count) => {
                tracing::debug!("[HISTORY] {} records", count);
                true
            }
            Err(e) => {
                tracing::warn!("[HISTORY] ⚠ write failed: {}", e);
                false
            }
        }
    }

    fn render(&self) {
        let history = self.store.load_all();
        if let Err(e) = self.renderer.refresh(&history, self.latest.as_ref(), &self.status) {
            tracing::warn!("[RENDER] ⚠ failed to write {}: {}", self.renderer.output().display(), e);
        }
    }

    /// poll until ctrl-c
    pub async fn run(&mut self) {
        tracing::info!("[RUNTIME] polling {} every {:?}", self.poller.url(), self.interval);
        self.render();

        let shutdown = crate::shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            let started = Instant::now();

            tokio::select! {
                _ = self.cycle() => {}
                _ = &mut shutdown => break,
            }

            let pause = self.interval.saturating_sub(started.elapsed()).max(MIN_PAUSE);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("[RUNTIME] monitor stopped");
    }
}
