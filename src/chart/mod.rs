//! Chart surface lifecycle.
//!
//! A [`ChartSurface`] binds one rendering backend ([`Surface`]) to one
//! [`Container`]. It owns at most one live rendering context at a time and
//! keeps exactly one resize listener registered between mount and destroy.
//!
//! ```text
//! Uninitialized -> Ready -> (Updating | Resizing)* -> Destroyed
//! ```

pub mod text_surface;

use crate::indicators;
use crate::models::{Candle, IndicatorSeries};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub use text_surface::{TextCanvas, TextSurface};

/// Rendering backend capability. The context is the live handle; `destroy`
/// consumes it so a released context cannot be touched again.
pub trait Surface {
    type Context;

    fn create(&mut self, width: u32, height: u32) -> Self::Context;

    /// Replace every series' data in full
    fn update_data(&mut self, ctx: &mut Self::Context, data: &ChartData);

    fn resize(&mut self, ctx: &mut Self::Context, width: u32);

    fn destroy(&mut self, ctx: Self::Context);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySeries {
    pub name: String,
    pub points: IndicatorSeries,
}

/// Primary candle series plus indicator overlays
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub candles: Vec<Candle>,
    pub overlays: Vec<OverlaySeries>,
}

impl ChartData {
    /// Candles with the SMA and RSI overlays computed from them
    pub fn with_indicators(candles: &[Candle], sma_period: usize, rsi_period: usize) -> Self {
        Self {
            candles: candles.to_vec(),
            overlays: vec![
                OverlaySeries {
                    name: format!("SMA {}", sma_period),
                    points: indicators::sma(candles, sma_period),
                },
                OverlaySeries {
                    name: format!("RSI {}", rsi_period),
                    points: indicators::rsi(candles, rsi_period),
                },
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Default)]
struct Listeners {
    ids: BTreeSet<ListenerId>,
    next: u64,
}

/// Shared handle to a container's resize listeners. A chart keeps one so it
/// can unregister even when it is dropped without an explicit destroy.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry(Arc<Mutex<Listeners>>);

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self) -> ListenerId {
        let mut listeners = self.lock();
        listeners.next += 1;
        let id = ListenerId(listeners.next);
        listeners.ids.insert(id);
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        self.lock().ids.remove(&id)
    }
}

/// Display element the chart is mounted into
#[derive(Debug, Default)]
pub struct Container {
    width: u32,
    listeners: ListenerRegistry,
}

impl Container {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn measured_width(&self) -> u32 {
        self.width
    }

    /// Change the width and return the listeners that must be notified
    pub fn set_width(&mut self, width: u32) -> Vec<ListenerId> {
        self.width = width;
        self.listeners.lock().ids.iter().copied().collect()
    }

    pub fn add_resize_listener(&mut self) -> ListenerId {
        self.listeners.add()
    }

    pub fn remove_resize_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().ids.contains(&id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().ids.len()
    }

    pub fn registry(&self) -> ListenerRegistry {
        self.listeners.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPhase {
    Uninitialized,
    Ready,
    Updating,
    Resizing,
    Destroyed,
}

pub struct ChartSurface<S: Surface> {
    surface: S,
    height: u32,
    phase: ChartPhase,
    context: Option<S::Context>,
    listener: Option<(ListenerId, ListenerRegistry)>,
    // latest data, replayed when creation was deferred
    data: ChartData,
}

impl<S: Surface> ChartSurface<S> {
    pub fn new(surface: S, height: u32) -> Self {
        Self {
            surface,
            height,
            phase: ChartPhase::Uninitialized,
            context: None,
            listener: None,
            data: ChartData::default(),
        }
    }

    pub fn phase(&self) -> ChartPhase {
        self.phase
    }

    pub fn is_live(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&S::Context> {
        self.context.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn listener(&self) -> Option<ListenerId> {
        self.listener.as_ref().map(|(id, _)| *id)
    }

    /// Register the resize listener and create the context if the container
    /// has a width. Zero width defers creation to the first non-zero resize.
    pub fn mount(&mut self, container: &mut Container) -> ChartPhase {
        if self.context.is_some() {
            return self.phase;
        }

        if self.phase == ChartPhase::Destroyed {
            self.phase = ChartPhase::Uninitialized;
            self.data = ChartData::default();
        }

        if self.listener.is_none() {
            let id = container.add_resize_listener();
            self.listener = Some((id, container.registry()));
        }

        self.try_create(container.measured_width());
        self.phase
    }

    /// Resize notification. Ignored after destroy or for a foreign listener.
    pub fn on_resize(&mut self, container: &Container, listener: ListenerId) {
        if self.phase == ChartPhase::Destroyed || self.listener() != Some(listener) {
            return;
        }

        let width = container.measured_width();
        if self.context.is_none() {
            self.try_create(width);
            return;
        }

        if width == 0 {
            debug!("ignoring resize to zero width");
            return;
        }

        if let Some(ctx) = self.context.as_mut() {
            self.phase = ChartPhase::Resizing;
            self.surface.resize(ctx, width);
            self.phase = ChartPhase::Ready;
        }
    }

    /// Full replace of the candle and overlay series
    pub fn update(&mut self, data: ChartData) {
        if self.phase == ChartPhase::Destroyed {
            return;
        }

        self.data = data;
        if let Some(ctx) = self.context.as_mut() {
            self.phase = ChartPhase::Updating;
            self.surface.update_data(ctx, &self.data);
            self.phase = ChartPhase::Ready;
        }
    }

    /// Release the context and unregister the listener. Idempotent.
    pub fn destroy(&mut self, container: &mut Container) {
        if let Some((id, _)) = self.listener.take() {
            container.remove_resize_listener(id);
        }
        if let Some(ctx) = self.context.take() {
            self.surface.destroy(ctx);
        }
        if self.phase != ChartPhase::Destroyed {
            debug!("chart destroyed");
        }
        self.phase = ChartPhase::Destroyed;
        self.data = ChartData::default();
    }

    fn try_create(&mut self, width: u32) {
        if width == 0 {
            debug!("container has no width yet, deferring chart creation");
            return;
        }

        let mut ctx = self.surface.create(width, self.height);
        self.phase = ChartPhase::Ready;
        if !self.data.is_empty() {
            self.surface.update_data(&mut ctx, &self.data);
        }
        self.context = Some(ctx);
        debug!(width, height = self.height, "chart ready");
    }
}

impl<S: Surface> Drop for ChartSurface<S> {
    fn drop(&mut self) {
        if let Some((id, registry)) = self.listener.take() {
            registry.remove(id);
        }
        if let Some(ctx) = self.context.take() {
            self.surface.destroy(ctx);
        }
    }
}
