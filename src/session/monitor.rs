use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};
use tracing::debug;

use super::{AutoGrow, SessionPhase, SessionReport};
use crate::error::AutoBrowseError;
use crate::surface::{ScrollMetrics, ScrollSignal};
use crate::transport::PageRequest;

/// The one request a session may have outstanding
struct InFlight {
    request: PageRequest,
    response: BoxFuture<'static, anyhow::Result<Value>>,
}

impl AutoGrow {
    /// Attach, then follow scroll signals until the server runs out of items
    /// or the sender side of `signals` is dropped.
    ///
    /// Scroll handling, the outstanding request and the debounced
    /// scroll-position write are polled together, so a scroll that arrives
    /// mid-request is seen (and ignored for fetching) right away. Dropping the
    /// sender detaches the session and abandons any outstanding request.
    pub async fn run(
        mut self,
        mut signals: mpsc::Receiver<ScrollSignal>,
    ) -> Result<SessionReport, AutoBrowseError> {
        self.attach().await?;

        let save_delay = Duration::from_millis(self.options.scroll_save_delay_ms);
        let save_timer = sleep(save_delay);
        tokio::pin!(save_timer);

        let mut pending_scroll: Option<u64> = None;
        let mut in_flight: Option<InFlight> = None;

        while self.phase != SessionPhase::Exhausted {
            tokio::select! {
                signal = signals.recv() => {
                    if signal.is_none() {
                        debug!(url = %self.url, "scroll signals closed, detaching");
                        break;
                    }

                    let metrics =
                        ScrollMetrics::capture(self.viewport.as_ref(), self.container.as_ref());

                    if self.cache.is_some() {
                        pending_scroll = Some(metrics.scroll_top);
                        save_timer.as_mut().reset(Instant::now() + save_delay);
                    }

                    if let Some(request) = self.poll_scroll(&metrics) {
                        in_flight = Some(InFlight {
                            request,
                            response: self.fetch_future(request),
                        });
                    }
                }

                response = async {
                    match in_flight.as_mut() {
                        Some(flight) => (&mut flight.response).await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    if let Some(flight) = in_flight.take() {
                        self.complete_fetch(flight.request, response).await;
                    }
                }

                () = &mut save_timer, if pending_scroll.is_some() => {
                    if let Some(top) = pending_scroll.take() {
                        self.save_scroll_top(top).await;
                    }
                }
            }
        }

        if let Some(top) = pending_scroll.take() {
            self.save_scroll_top(top).await;
        }

        let report = self.report();
        debug!(
            url = %report.url,
            offset = report.offset,
            phase = %report.phase,
            pages = report.pages_loaded,
            "session stopped"
        );
        Ok(report)
    }
}
