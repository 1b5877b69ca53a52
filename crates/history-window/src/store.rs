//! Keyed Window Store

use crate::{HistoryError, HistoryWindow, SensorReading};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// Sensor-id → history window map with per-sensor locking
///
/// Readings for the same sensor are serialized through that sensor's lock;
/// different sensors never contend beyond the brief map lookup.
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: RwLock<HashMap<String, Arc<Mutex<HistoryWindow>>>>,
}

impl WindowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the window for a sensor, creating it on first use
    fn entry(&self, sensor_id: &str) -> Result<Arc<Mutex<HistoryWindow>>, HistoryError> {
        if let Some(window) = self.lookup(sensor_id)? {
            return Ok(window);
        }

        let mut windows = self
            .windows
            .write()
            .map_err(|_| HistoryError::LockPoisoned(sensor_id.to_string()))?;
        let window = windows.entry(sensor_id.to_string()).or_insert_with(|| {
            debug!(sensor_id, "Tracking new sensor stream");
            Arc::new(Mutex::new(HistoryWindow::new(sensor_id)))
        });
        Ok(Arc::clone(window))
    }

    /// Get the window for a sensor without creating it
    ///
    /// The map lock is released before the caller locks the window.
    fn lookup(&self, sensor_id: &str) -> Result<Option<Arc<Mutex<HistoryWindow>>>, HistoryError> {
        let windows = self
            .windows
            .read()
            .map_err(|_| HistoryError::LockPoisoned(sensor_id.to_string()))?;
        Ok(windows.get(sensor_id).map(Arc::clone))
    }

    /// Run `f` on the live window for `sensor_id` under its lock
    ///
    /// A window removed between lookup and locking is detached; the lookup is
    /// retried so `f` always mutates the window the store still holds.
    fn with_window<R>(
        &self,
        sensor_id: &str,
        f: impl FnOnce(&mut HistoryWindow) -> R,
    ) -> Result<R, HistoryError> {
        loop {
            let window = self.entry(sensor_id)?;
            let mut guard = window
                .lock()
                .map_err(|_| HistoryError::LockPoisoned(sensor_id.to_string()))?;

            let live = self
                .lookup(sensor_id)?
                .map_or(false, |current| Arc::ptr_eq(&current, &window));
            if live {
                return Ok(f(&mut guard));
            }
            debug!(sensor_id, "Window detached while waiting, retrying");
        }
    }

    /// Derive a value from `reading` and the prior history, then record it
    ///
    /// Order check, snapshot, `derive` and append run as one critical section
    /// for `sensor_id`. The reading is only appended when `derive` succeeds and
    /// `derive` never sees the reading in its own history. `derive` must not
    /// call back into the store for the same sensor.
    pub fn observe<T, E, F>(&self, sensor_id: &str, reading: SensorReading, derive: F) -> Result<T, E>
    where
        F: FnOnce(&SensorReading, &[SensorReading]) -> Result<T, E>,
        E: From<HistoryError>,
    {
        self.with_window(sensor_id, |window: &mut HistoryWindow| -> Result<T, E> {
            window.admits(&reading)?;
            let history = window.snapshot();
            let derived = derive(&reading, &history)?;
            window.append(reading)?;
            Ok(derived)
        })?
    }

    /// Snapshot of a sensor's history (empty for unknown sensors)
    pub fn snapshot(&self, sensor_id: &str) -> Result<Vec<SensorReading>, HistoryError> {
        Ok(self
            .get(sensor_id)?
            .map(|window| window.snapshot())
            .unwrap_or_default())
    }

    /// Copy of a sensor's window, counters included
    pub fn get(&self, sensor_id: &str) -> Result<Option<HistoryWindow>, HistoryError> {
        let window = match self.lookup(sensor_id)? {
            Some(window) => window,
            None => return Ok(None),
        };
        let copy = window
            .lock()
            .map(|w| w.clone())
            .map_err(|_| HistoryError::LockPoisoned(sensor_id.to_string()))?;
        Ok(Some(copy))
    }

    /// Install a restored window, replacing the contents of any existing one
    ///
    /// Waits for an in-flight `observe` on the same sensor to finish.
    pub fn restore(&self, window: HistoryWindow) -> Result<(), HistoryError> {
        let sensor_id = window.sensor_id().to_string();
        self.with_window(&sensor_id, move |current| *current = window)
    }

    /// Stop tracking a sensor, returning its window
    ///
    /// Waits for an in-flight `observe` so its reading is part of the result.
    pub fn remove(&self, sensor_id: &str) -> Option<HistoryWindow> {
        let window = self.windows.write().ok()?.remove(sensor_id)?;
        let guard = window.lock().ok()?;
        Some(guard.clone())
    }

    /// Tracked sensor ids, sorted
    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .windows
            .read()
            .map(|w| w.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Number of tracked sensors
    pub fn len(&self) -> usize {
        self.windows.read().map(|w| w.len()).unwrap_or(0)
    }

    /// Check if no sensor is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration as StdDuration;

    fn reading(minute: i64, kiln_temp: f64) -> SensorReading {
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2025, 9, 15, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
            kiln_temp,
            ..Default::default()
        }
    }

    #[test]
    fn test_observe_excludes_current_reading() {
        let store = WindowStore::new();

        let seen: Result<usize, HistoryError> =
            store.observe("kiln-1", reading(0, 1100.0), |_, history| Ok(history.len()));
        assert_eq!(seen.unwrap(), 0);

        let seen: Result<f64, HistoryError> = store.observe("kiln-1", reading(1, 1110.0), |_, history| {
            Ok(history.last().map(|r| r.kiln_temp).unwrap_or(0.0))
        });
        assert_eq!(seen.unwrap(), 1100.0);
        assert_eq!(store.snapshot("kiln-1").unwrap().len(), 2);
    }

    #[test]
    fn test_failed_derive_leaves_window_untouched() {
        let store = WindowStore::new();

        #[derive(Debug)]
        enum TestError {
            History(HistoryError),
            Rejected,
        }
        impl From<HistoryError> for TestError {
            fn from(e: HistoryError) -> Self {
                TestError::History(e)
            }
        }

        let result: Result<(), TestError> =
            store.observe("kiln-1", reading(0, 1100.0), |_, _| Err(TestError::Rejected));
        assert!(matches!(result, Err(TestError::Rejected)));
        assert!(store.snapshot("kiln-1").unwrap().is_empty());

        let result: Result<(), TestError> = store.observe("kiln-1", reading(0, 1100.0), |_, _| Ok(()));
        assert!(result.is_ok());

        let result: Result<(), TestError> = store.observe("kiln-1", reading(0, 1100.0), |_, _| Ok(()));
        assert!(matches!(result, Err(TestError::History(HistoryError::OutOfOrder { .. }))));
    }

    #[test]
    fn test_out_of_order_is_rejected_before_derive() {
        let store = WindowStore::new();
        let _: Result<(), HistoryError> = store.observe("kiln-1", reading(5, 1100.0), |_, _| Ok(()));

        let mut called = false;
        let result: Result<(), HistoryError> = store.observe("kiln-1", reading(4, 1100.0), |_, _| {
            called = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!called);
    }

    #[test]
    fn test_sensors_are_independent() {
        let store = Arc::new(WindowStore::new());

        let handles: Vec<_> = (0..4)
            .map(|s| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = format!("kiln-{}", s);
                    for i in 0..20 {
                        let r: Result<(), HistoryError> =
                            store.observe(&id, reading(i, i as f64), |_, _| Ok(()));
                        r.unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 4);
        assert_eq!(store.sensor_ids()[0], "kiln-0");
        for id in store.sensor_ids() {
            let snapshot = store.snapshot(&id).unwrap();
            assert_eq!(snapshot.len(), 10);
            assert_eq!(snapshot[9].kiln_temp, 19.0);
        }
    }

    #[test]
    fn test_restore_and_remove() {
        let store = WindowStore::new();
        let mut window = HistoryWindow::new("kiln-9");
        window.append(reading(0, 1180.0)).unwrap();

        store.restore(window).unwrap();
        assert_eq!(store.snapshot("kiln-9").unwrap()[0].kiln_temp, 1180.0);

        let removed = store.remove("kiln-9").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(store.is_empty());
    }

    /// Start an observe on `kiln-1` whose derive parks until released
    fn parked_observe(
        store: &Arc<WindowStore>,
        minute: i64,
    ) -> (thread::JoinHandle<Result<(), HistoryError>>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let observer = {
            let store = Arc::clone(store);
            thread::spawn(move || {
                store.observe("kiln-1", reading(minute, 1120.0), move |_, _| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
            })
        };
        entered_rx.recv().unwrap();
        (observer, release_tx)
    }

    #[test]
    fn test_restore_waits_for_in_flight_observe() {
        let store = Arc::new(WindowStore::new());
        let (observer, release) = parked_observe(&store, 1);

        let restorer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut window = HistoryWindow::new("kiln-1");
                window.append(reading(0, 1100.0)).unwrap();
                store.restore(window)
            })
        };
        thread::sleep(StdDuration::from_millis(50));
        assert!(!restorer.is_finished());

        release.send(()).unwrap();
        observer.join().unwrap().unwrap();
        restorer.join().unwrap().unwrap();

        // Restore ran last, so its contents win and the window stays attached
        let snapshot = store.snapshot("kiln-1").unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kiln_temp, 1100.0);

        let r: Result<(), HistoryError> = store.observe("kiln-1", reading(2, 1130.0), |_, _| Ok(()));
        r.unwrap();
        assert_eq!(store.snapshot("kiln-1").unwrap().len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_keeps_in_flight_reading() {
        let store = Arc::new(WindowStore::new());
        let r: Result<(), HistoryError> = store.observe("kiln-1", reading(0, 1100.0), |_, _| Ok(()));
        r.unwrap();
        let (observer, release) = parked_observe(&store, 1);

        let remover = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.remove("kiln-1"))
        };
        thread::sleep(StdDuration::from_millis(50));
        assert!(!remover.is_finished());

        release.send(()).unwrap();
        observer.join().unwrap().unwrap();
        let removed = remover.join().unwrap().unwrap();

        assert_eq!(removed.len(), 2);
        assert_eq!(removed.total_appended(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_readings_for_one_sensor() {
        const READINGS: usize = 64;
        const THREADS: usize = 4;

        let store = Arc::new(WindowStore::new());
        let accepted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let disordered = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                let accepted = Arc::clone(&accepted);
                let rejected = Arc::clone(&rejected);
                let disordered = Arc::clone(&disordered);
                thread::spawn(move || {
                    // Thread t submits minutes t, t + THREADS, ... so streams interleave
                    for minute in (t..READINGS).step_by(THREADS) {
                        let result: Result<(), HistoryError> = store.observe(
                            "kiln-1",
                            reading(minute as i64, minute as f64),
                            |current, history| {
                                let ordered = history.windows(2).all(|p| p[0].timestamp < p[1].timestamp)
                                    && history.last().map_or(true, |last| last.timestamp < current.timestamp);
                                if !ordered {
                                    disordered.store(true, Ordering::SeqCst);
                                }
                                Ok(())
                            },
                        );
                        match result {
                            Ok(()) => accepted.fetch_add(1, Ordering::SeqCst),
                            Err(HistoryError::OutOfOrder { .. }) => rejected.fetch_add(1, Ordering::SeqCst),
                            Err(e) => panic!("unexpected error: {}", e),
                        };
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let accepted = accepted.load(Ordering::SeqCst);
        assert_eq!(accepted + rejected.load(Ordering::SeqCst), READINGS);
        assert!(accepted >= 1);
        assert!(!disordered.load(Ordering::SeqCst));

        let window = store.get("kiln-1").unwrap().unwrap();
        assert_eq!(window.total_appended(), accepted);

        let snapshot = window.snapshot();
        assert!(!snapshot.is_empty());
        assert!(snapshot.windows(2).all(|p| p[0].timestamp < p[1].timestamp));
    }
}
