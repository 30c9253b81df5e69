use crate::application::{ChartController, CommandSink};
use crate::domain::{
    errors::ChartError,
    logging::{LogComponent, get_time_provider},
    market_data::MarketDataSource,
};
use crate::{log_debug, log_info, log_warn};
use futures::{
    StreamExt,
    channel::mpsc::unbounded,
    future::{AbortHandle, Abortable},
};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

const COMPONENT: LogComponent = LogComponent::Infrastructure("Polling");

/// Poll the collaborator once and apply the result. Returns the number of
/// candles held afterwards. A failed poll leaves the chart untouched.
pub async fn poll_once<M, S>(
    source: &M,
    controller: &RefCell<ChartController<S>>,
    now_ms: u64,
) -> Result<usize, ChartError>
where
    M: MarketDataSource,
    S: CommandSink,
{
    let poll = source.poll().await.inspect_err(|e| {
        log_warn!(COMPONENT, "poll failed: {}", e);
    })?;
    let mut controller = controller.borrow_mut();
    controller.apply_poll(poll, now_ms);
    Ok(controller.series().len())
}

/// Fetch one page of history older than the loaded window and splice it in.
/// Returns how many rows the collaborator delivered.
pub async fn load_older_history<M, S>(
    source: &M,
    controller: &RefCell<ChartController<S>>,
    now_ms: u64,
) -> Result<usize, ChartError>
where
    M: MarketDataSource,
    S: CommandSink,
{
    let (before, limit) = {
        let controller = controller.borrow();
        let Some(earliest) = controller.series().earliest() else {
            log_debug!(COMPONENT, "no loaded data, skipping history request");
            return Ok(0);
        };
        (earliest.time, controller.config().history_page_size)
    };
    let rows = source.fetch_older(before, limit).await?;
    log_debug!(COMPONENT, "history page of {} rows before {}", rows.len(), before);
    controller.borrow_mut().merge_history(&rows, now_ms);
    Ok(rows.len())
}

/// Background work started for one chart: the poll loop, the history
/// loader and, on wasm, the redelivery ticker. `stop` (or drop) aborts all
/// of it and releases the controller.
#[derive(Default)]
pub struct PollingTasks {
    handles: Vec<AbortHandle>,
    #[cfg(target_arch = "wasm32")]
    ticker: Option<gloo_timers::callback::Interval>,
}

impl PollingTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Poll, then wait `poll_interval_ms` via `sleep`, forever. The returned
    /// future must be spawned by the caller.
    pub fn poll_loop<M, S, F, Fut>(
        &mut self,
        source: Rc<M>,
        controller: Rc<RefCell<ChartController<S>>>,
        sleep: F,
    ) -> impl Future<Output = ()> + 'static
    where
        M: MarketDataSource + 'static,
        S: CommandSink + 'static,
        F: Fn(u64) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let interval_ms = controller.borrow().config().poll_interval_ms;
        self.abortable(async move {
            loop {
                let now = get_time_provider().now_ms();
                let _ = poll_once(source.as_ref(), &controller, now).await;
                sleep(interval_ms).await;
            }
        })
    }

    /// Route throttled backfill signals to history fetches, one at a time.
    /// Replaces the controller's backfill hook.
    pub fn history_loader<M, S>(
        &mut self,
        source: Rc<M>,
        controller: Rc<RefCell<ChartController<S>>>,
    ) -> impl Future<Output = ()> + 'static
    where
        M: MarketDataSource + 'static,
        S: CommandSink + 'static,
    {
        let (tx, mut rx) = unbounded::<()>();
        controller.borrow_mut().on_backfill_requested(move || {
            let _ = tx.unbounded_send(());
        });
        self.abortable(async move {
            while rx.next().await.is_some() {
                let now = get_time_provider().now_ms();
                if let Err(e) = load_older_history(source.as_ref(), &controller, now).await {
                    log_warn!(COMPONENT, "history fetch failed: {}", e);
                }
            }
        })
    }

    /// Abort every task started through this handle
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        #[cfg(target_arch = "wasm32")]
        {
            self.ticker = None;
        }
        log_info!(COMPONENT, "polling stopped");
    }

    fn abortable<T>(&mut self, task: T) -> impl Future<Output = ()> + 'static
    where
        T: Future<Output = ()> + 'static,
    {
        let (handle, registration) = AbortHandle::new_pair();
        self.handles.push(handle);
        async move {
            let _ = Abortable::new(task, registration).await;
        }
    }
}

impl Drop for PollingTasks {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(target_arch = "wasm32")]
pub use self::wasm::start_polling;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::*;
    use gloo_timers::{callback::Interval, future::TimeoutFuture};
    use wasm_bindgen_futures::spawn_local;

    /// Stop whatever `tasks` was running, then spawn the poll loop, the
    /// history loader and a redelivery ticker firing every `tick_ms`.
    pub fn start_polling<M, S>(
        tasks: &mut PollingTasks,
        source: Rc<M>,
        controller: Rc<RefCell<ChartController<S>>>,
        tick_ms: u32,
    ) where
        M: MarketDataSource + 'static,
        S: CommandSink + 'static,
    {
        tasks.stop();
        spawn_local(tasks.history_loader(source.clone(), controller.clone()));
        spawn_local(tasks.poll_loop(source, controller.clone(), |ms| {
            TimeoutFuture::new(ms.min(u32::MAX as u64) as u32)
        }));
        let ticker = Interval::new(tick_ms.max(1), move || {
            if let Ok(mut controller) = controller.try_borrow_mut() {
                controller.tick(get_time_provider().now_ms());
            }
        });
        tasks.ticker = Some(ticker);
        log_info!(COMPONENT, "polling started, ticking every {} ms", tick_ms.max(1));
    }
}
