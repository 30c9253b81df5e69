use futures::executor::{LocalPool, block_on};
use futures::task::LocalSpawnExt;
use price_chart_bridge::application::{ChartConfig, ChartController, SurfaceCommand, SurfaceEvent};
use price_chart_bridge::domain::errors::ChartError;
use price_chart_bridge::domain::market_data::{MarketDataSource, PollResult, RawCandle, Timestamp};
use price_chart_bridge::infrastructure::{PollingTasks, load_older_history, poll_once};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
struct FakeSource {
    window: Vec<RawCandle>,
    history: Vec<RawCandle>,
    fail: bool,
    requests: RefCell<Vec<(Timestamp, usize)>>,
}

fn row(time_ms: i64, price: f64) -> RawCandle {
    RawCandle::new(time_ms as f64, price, price, price, price, None)
}

impl MarketDataSource for FakeSource {
    async fn poll(&self) -> Result<PollResult, ChartError> {
        if self.fail {
            return Err(ChartError::Source("upstream timeout".into()));
        }
        Ok(PollResult { candles: self.window.clone(), last_price: self.window.last().map(|r| r.close) })
    }

    async fn fetch_older(&self, before: Timestamp, limit: usize) -> Result<Vec<RawCandle>, ChartError> {
        self.requests.borrow_mut().push((before, limit));
        Ok(self
            .history
            .iter()
            .filter(|r| Timestamp::from_raw(r.time as i64) < before)
            .rev()
            .take(limit)
            .copied()
            .collect())
    }
}

fn controller() -> RefCell<ChartController<Vec<SurfaceCommand>>> {
    let config = ChartConfig::from_json(r#"{"historyPageSize": 2}"#).unwrap();
    let mut controller = ChartController::new(Vec::new(), config);
    controller.surface_created(0);
    controller.handle_surface_event(SurfaceEvent::Ready, 0);
    RefCell::new(controller)
}

#[test]
fn poll_replaces_window_and_price() {
    let source = FakeSource {
        window: vec![row(1_700_000_000_000, 10.0), row(1_700_000_060_000, 11.0)],
        ..FakeSource::default()
    };
    let controller = controller();
    assert_eq!(block_on(poll_once(&source, &controller, 100)).unwrap(), 2);
    assert_eq!(controller.borrow().last_price(), Some(11.0));
    assert_eq!(
        controller.borrow().series().earliest().map(|c| c.time),
        Some(Timestamp::new(1_700_000_000))
    );
}

#[test]
fn failed_poll_leaves_chart_untouched() {
    let controller = controller();
    let ok = FakeSource { window: vec![row(60, 1.0)], ..FakeSource::default() };
    block_on(poll_once(&ok, &controller, 0)).unwrap();

    let failing = FakeSource { fail: true, ..FakeSource::default() };
    assert!(matches!(block_on(poll_once(&failing, &controller, 10)), Err(ChartError::Source(_))));
    assert_eq!(controller.borrow().series().len(), 1);
}

#[test]
fn history_page_is_requested_before_earliest() {
    let source = FakeSource {
        window: vec![row(300, 3.0), row(360, 4.0)],
        history: vec![row(60, 0.0), row(120, 1.0), row(180, 2.0), row(240, 2.5)],
        ..FakeSource::default()
    };
    let controller = controller();
    block_on(poll_once(&source, &controller, 0)).unwrap();

    assert_eq!(block_on(load_older_history(&source, &controller, 10)).unwrap(), 2);
    assert_eq!(source.requests.borrow()[0], (Timestamp::new(300), 2));
    let times: Vec<i64> = controller.borrow().series().candles().iter().map(|c| c.time.value()).collect();
    assert_eq!(times, vec![180, 240, 300, 360]);

    block_on(load_older_history(&source, &controller, 20)).unwrap();
    assert_eq!(source.requests.borrow()[1], (Timestamp::new(180), 2));
    assert_eq!(controller.borrow().series().len(), 6);
}

#[test]
fn no_history_request_without_data() {
    let source = FakeSource::default();
    let controller = controller();
    assert_eq!(block_on(load_older_history(&source, &controller, 0)).unwrap(), 0);
    assert!(source.requests.borrow().is_empty());
}

#[test]
fn stopped_history_loader_releases_controller() {
    let source = Rc::new(FakeSource {
        window: vec![row(300, 3.0)],
        history: vec![row(180, 1.0), row(240, 2.0)],
        ..FakeSource::default()
    });
    let controller = Rc::new(controller());
    block_on(poll_once(source.as_ref(), &controller, 0)).unwrap();

    let mut pool = LocalPool::new();
    let mut tasks = PollingTasks::new();
    pool.spawner().spawn_local(tasks.history_loader(source.clone(), controller.clone())).unwrap();
    assert!(tasks.is_running());

    controller.borrow_mut().handle_surface_event(SurfaceEvent::ViewportNearEdge, 1_000);
    pool.run_until_stalled();
    assert_eq!(controller.borrow().series().len(), 3);

    tasks.stop();
    pool.run_until_stalled();
    assert!(!tasks.is_running());
    assert_eq!(Rc::strong_count(&controller), 1);

    // Signals after stop reach nobody
    controller.borrow_mut().handle_surface_event(SurfaceEvent::ViewportNearEdge, 10_000);
    pool.run_until_stalled();
    assert_eq!(source.requests.borrow().len(), 1);
}

#[test]
fn restarting_replaces_the_running_poll_loop() {
    let source = Rc::new(FakeSource { window: vec![row(60, 1.0)], ..FakeSource::default() });
    let controller = Rc::new(controller());
    let sleeps = Rc::new(Cell::new(0));
    let mut pool = LocalPool::new();
    let mut tasks = PollingTasks::new();

    let counter = sleeps.clone();
    pool.spawner()
        .spawn_local(tasks.poll_loop(source.clone(), controller.clone(), move |_| {
            counter.set(counter.get() + 1);
            futures::future::pending::<()>()
        }))
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(sleeps.get(), 1);
    assert_eq!(Rc::strong_count(&controller), 2);

    tasks.stop();
    let counter = sleeps.clone();
    pool.spawner()
        .spawn_local(tasks.poll_loop(source.clone(), controller.clone(), move |_| {
            counter.set(counter.get() + 1);
            futures::future::pending::<()>()
        }))
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(sleeps.get(), 2);
    assert_eq!(Rc::strong_count(&controller), 2);

    drop(tasks);
    pool.run_until_stalled();
    assert_eq!(Rc::strong_count(&controller), 1);
}
