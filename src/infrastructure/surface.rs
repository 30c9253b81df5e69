use crate::application::{CommandSink, SurfaceCommand};
use crate::domain::{
    chart::{ChartType, Overlay},
    logging::LogComponent,
    market_data::{Candle, IndicatorSeries},
};
use crate::log_warn;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::collections::BTreeMap;

/// Sink feeding an unbounded channel drained by the surface's own loop
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<SurfaceCommand>,
}

/// Connected sink/receiver pair
pub fn command_channel() -> (ChannelSink, UnboundedReceiver<SurfaceCommand>) {
    let (tx, rx) = unbounded();
    (ChannelSink { tx }, rx)
}

impl CommandSink for ChannelSink {
    fn send(&mut self, command: SurfaceCommand) {
        if let Err(e) = self.tx.unbounded_send(command) {
            log_warn!(
                LogComponent::Infrastructure("ChannelSink"),
                "surface receiver gone, dropped {}",
                e.into_inner().name()
            );
        }
    }
}

/// Visible state of a surface, as reconstructed from the commands it applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedScene {
    pub candles: Vec<Candle>,
    pub chart_type: Option<ChartType>,
    pub indicators: Vec<IndicatorSeries>,
    pub show_volume: Option<bool>,
    pub overlays: BTreeMap<String, Overlay>,
}

/// Surface without a display. Commands arriving before its listener is
/// attached are lost, as with a real embedded surface still loading.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    listening: bool,
    scene: RenderedScene,
    applied: usize,
    lost: usize,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose listener is already attached
    pub fn listening() -> Self {
        Self { listening: true, ..Self::default() }
    }

    pub fn attach_listener(&mut self) {
        self.listening = true;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn scene(&self) -> &RenderedScene {
        &self.scene
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn lost(&self) -> usize {
        self.lost
    }

    pub fn apply(&mut self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::SetCandles { candles } => self.scene.candles = candles,
            SurfaceCommand::SetChartType { chart_type } => self.scene.chart_type = Some(chart_type),
            SurfaceCommand::SetIndicators { indicators } => self.scene.indicators = indicators,
            SurfaceCommand::SetShowVolume { visible } => self.scene.show_volume = Some(visible),
            SurfaceCommand::ApplyOverlayDelta { add, remove } => {
                for id in remove {
                    self.scene.overlays.remove(&id);
                }
                for overlay in add {
                    self.scene.overlays.insert(overlay.id().to_string(), overlay);
                }
            }
        }
        self.applied += 1;
    }
}

impl CommandSink for HeadlessSurface {
    fn send(&mut self, command: SurfaceCommand) {
        if self.listening {
            self.apply(command);
        } else {
            self.lost += 1;
        }
    }
}
