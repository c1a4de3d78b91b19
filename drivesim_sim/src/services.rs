//! In-memory stand-ins for the platform services.

use async_trait::async_trait;
use drivesim_core::interpolate;
use drivesim_env::{Coordinate, DirectionsService, EnvError, Geocoder, LocationProvider};
use geo::{HaversineDistance, Point};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Geocoder backed by a fixed table of named places.
///
/// Lookups ignore case and surrounding whitespace.
pub struct Gazetteer {
    places: BTreeMap<String, (String, Coordinate)>,
    offline: AtomicBool,
}

impl Gazetteer {
    pub fn new() -> Self {
        Self {
            places: BTreeMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// A handful of Manhattan and Brooklyn landmarks.
    pub fn new_york() -> Self {
        Self::new()
            .with_place("Central Park", Coordinate::new(40.7812, -73.9665))
            .with_place("Times Square", Coordinate::new(40.7580, -73.9855))
            .with_place("Empire State Building", Coordinate::new(40.7484, -73.9857))
            .with_place("Brooklyn Bridge", Coordinate::new(40.7061, -73.9969))
            .with_place("Grand Central", Coordinate::new(40.7527, -73.9772))
            .with_place("Battery Park", Coordinate::new(40.7033, -74.0170))
    }

    pub fn with_place(mut self, name: &str, coordinate: Coordinate) -> Self {
        self.places
            .insert(normalize(name), (name.to_string(), coordinate));
        self
    }

    /// Synchronous lookup.
    pub fn lookup(&self, query: &str) -> Option<Coordinate> {
        self.places.get(&normalize(query)).map(|(_, c)| *c)
    }

    /// Place names in display form.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.places.values().map(|(name, _)| name.as_str())
    }

    /// Makes every subsequent geocode fail with a service error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[async_trait]
impl Geocoder for Gazetteer {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, EnvError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(EnvError::service("gazetteer offline"));
        }
        Ok(self.lookup(query))
    }
}

/// Directions "service" that drives in a straight line.
///
/// Vertices are spaced roughly `spacing_meters` apart, so the polyline
/// density depends on trip length the way a real service's does.
pub struct StraightLineDirections {
    spacing_meters: f64,
    unreachable: AtomicBool,
}

impl StraightLineDirections {
    pub fn new(spacing_meters: f64) -> Self {
        Self {
            spacing_meters: spacing_meters.max(1.0),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent request return "no route".
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// The polyline this service would return, without the async wrapper.
    pub fn polyline(&self, from: Coordinate, to: Coordinate) -> Vec<Coordinate> {
        let distance = Point::new(from.longitude, from.latitude)
            .haversine_distance(&Point::new(to.longitude, to.latitude));
        let segments = (distance / self.spacing_meters).ceil().max(1.0) as usize;
        interpolate(from, to, segments + 1).coordinates().collect()
    }
}

impl Default for StraightLineDirections {
    /// About one vertex per city block.
    fn default() -> Self {
        Self::new(100.0)
    }
}

#[async_trait]
impl DirectionsService for StraightLineDirections {
    async fn directions(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Option<Vec<Coordinate>>, EnvError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.polyline(from, to)))
    }
}

/// Location provider fed by hand.
///
/// Every [`ScriptedLocations::push`] goes to all open subscriptions.
#[derive(Default)]
pub struct ScriptedLocations {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Coordinate>>>,
}

impl ScriptedLocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcasts a fix; returns how many subscribers received it.
    pub fn push(&self, coordinate: Coordinate) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(coordinate).is_ok());
        subscribers.len()
    }

    /// Ends every subscription.
    pub fn close(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl LocationProvider for ScriptedLocations {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Coordinate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }
}
