//! Events emitted towards the presentation layer.

use crate::region::MapRegion;
use drivesim_env::Coordinate;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Something the presentation layer should reflect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// The simulated vehicle moved
    LocationUpdated { coordinate: Coordinate },

    /// The map should show this region
    RegionUpdated { region: MapRegion },

    /// Playback started or stopped
    StatusUpdated { running: bool },
}

/// Destination for [`SimulationEvent`]s.
///
/// The sink belongs to whoever renders; the controller only writes to it.
pub trait EventSink: Send + 'static {
    fn emit(&mut self, event: SimulationEvent);
}

impl EventSink for mpsc::UnboundedSender<SimulationEvent> {
    fn emit(&mut self, event: SimulationEvent) {
        // A closed receiver means nobody is rendering anymore
        let _ = self.send(event);
    }
}

/// Sink that keeps every event in a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<SimulationEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<SimulationEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: SimulationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
