//! Board service.
//!
//! [`BoardService`] is the application layer: it validates input, keeps
//! each collection in the [`DocumentStore`], remembers the last good copy
//! of every collection, renders matrices and pushes them through the
//! [`DisplayClient`].
//!
//! Reads degrade: if storage fails, the last cached copy (or nothing) is
//! returned and a warning is logged. Writes surface storage failures, and
//! the cache only changes after a write succeeds. Board pushes never fail
//! a write; their result is reported as a [`BoardUpdate`].

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::{assemble, layouts, DisplayMatrix};
use crate::config::{Config, LimitsConfig};
use crate::error::{Error, Result};
use crate::gate::{lock, GatePolicy, RateGate, RateLimitState};
use crate::records::{
    Birthday, EmployeeRecognition, EntityKind, Event, Flight, PrivatePilot, Record,
};
use crate::storage::{Document, DocumentStore, Query, SortOrder};
use crate::transport::{DisplayClient, DisplayTransport, HttpTransport, SendOutcome};
use crate::weather::{OpenWeatherClient, WeatherSource};

/// What happened to the board after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BoardUpdate {
    /// The caller did not ask for a push.
    NotRequested,
    /// The board accepted the matrix.
    Sent,
    /// Another push of the same kind was running.
    SkippedInFlight,
    /// The push failed; the stored data is unaffected.
    Failed {
        /// Why the push failed.
        reason: String,
        /// Seconds until the board accepts sends again, when rate limited.
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_in_secs: Option<u64>,
    },
}

impl BoardUpdate {
    /// Whether the push was attempted and failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for BoardUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => f.write_str("board not updated"),
            Self::Sent => f.write_str("board updated"),
            Self::SkippedInFlight => f.write_str("board update already in progress, skipped"),
            Self::Failed {
                reason,
                retry_in_secs: Some(secs),
            } => write!(f, "board update failed: {reason} (retry in {secs}s)"),
            Self::Failed { reason, .. } => write!(f, "board update failed: {reason}"),
        }
    }
}

/// Records after a write, together with the board result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Update<T> {
    /// The collection (or record) as stored.
    pub records: T,
    /// What happened to the board.
    pub board: BoardUpdate,
}

/// Last good copy of each collection.
#[derive(Debug, Default)]
struct RecordCache {
    flights: Vec<Flight>,
    events: Vec<Event>,
    birthday: Option<Birthday>,
    recognition: Option<EmployeeRecognition>,
    pilot: Option<PrivatePilot>,
}

/// A list collection with a cache slot.
trait CachedList: Record {
    fn slot(cache: &mut RecordCache) -> &mut Vec<Self>;
}

/// A single-record collection with a cache slot.
trait CachedOne: Record {
    fn slot(cache: &mut RecordCache) -> &mut Option<Self>;
}

impl CachedList for Flight {
    fn slot(cache: &mut RecordCache) -> &mut Vec<Self> {
        &mut cache.flights
    }
}

impl CachedList for Event {
    fn slot(cache: &mut RecordCache) -> &mut Vec<Self> {
        &mut cache.events
    }
}

impl CachedOne for Birthday {
    fn slot(cache: &mut RecordCache) -> &mut Option<Self> {
        &mut cache.birthday
    }
}

impl CachedOne for EmployeeRecognition {
    fn slot(cache: &mut RecordCache) -> &mut Option<Self> {
        &mut cache.recognition
    }
}

impl CachedOne for PrivatePilot {
    fn slot(cache: &mut RecordCache) -> &mut Option<Self> {
        &mut cache.pilot
    }
}

/// Keep the last `keep` records.
fn keep_newest<T>(mut records: Vec<T>, keep: usize) -> Vec<T> {
    let excess = records.len().saturating_sub(keep);
    records.drain(..excess);
    records
}

/// The board application service.
pub struct BoardService {
    store: Mutex<DocumentStore>,
    display: DisplayClient,
    weather: Arc<dyn WeatherSource>,
    limits: LimitsConfig,
    cache: Mutex<RecordCache>,
    today: Option<NaiveDate>,
}

impl BoardService {
    /// Assemble a service from its parts.
    #[must_use]
    pub fn new(
        store: DocumentStore,
        display: DisplayClient,
        weather: Arc<dyn WeatherSource>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            display,
            weather,
            limits,
            cache: Mutex::new(RecordCache::default()),
            today: None,
        }
    }

    /// Build the production service: on-disk store, HTTP board transport
    /// and the OpenWeatherMap source.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or a configured
    /// URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = DocumentStore::open(config.database_path())?;
        let transport: Arc<dyn DisplayTransport> = Arc::new(HttpTransport::new(&config.board)?);
        let display = DisplayClient::new(transport, RateGate::new(GatePolicy::from(&config.gate)));
        let weather: Arc<dyn WeatherSource> = Arc::new(OpenWeatherClient::new(&config.weather)?);
        Ok(Self::new(store, display, weather, config.limits.clone()))
    }

    /// Pin the date used for list headers and event ordering.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The date used for list headers and event ordering.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Current rate gate state.
    #[must_use]
    pub fn rate_limit_status(&self) -> RateLimitState {
        self.display.gate().status()
    }

    // === Collection plumbing ===

    /// Every readable document of `T`. Unreadable ones are skipped.
    fn fetch_all<T: Record>(&self) -> Result<Vec<T>> {
        let docs = lock(&self.store).find(T::KIND.as_str(), &Query::all())?;
        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(kind = %T::KIND, id = doc.id, error = %e, "Skipping unreadable document");
                    None
                }
            })
            .collect())
    }

    fn fetch_latest<T: Record>(&self) -> Result<Option<T>> {
        let doc = lock(&self.store).find_one(T::KIND.as_str(), &Query::all(), SortOrder::Descending)?;
        doc.as_ref().map(Document::decode).transpose()
    }

    fn load_all<T: CachedList>(&self) -> Vec<T> {
        match self.fetch_all::<T>() {
            Ok(records) => {
                T::slot(&mut lock(&self.cache)).clone_from(&records);
                records
            }
            Err(e) => {
                warn!(kind = %T::KIND, error = %e, "Failed to load records, using cached copy");
                T::slot(&mut lock(&self.cache)).clone()
            }
        }
    }

    fn load_one<T: CachedOne>(&self) -> Option<T> {
        match self.fetch_latest::<T>() {
            Ok(record) => {
                T::slot(&mut lock(&self.cache)).clone_from(&record);
                record
            }
            Err(e) => {
                warn!(kind = %T::KIND, error = %e, "Failed to load record, using cached copy");
                T::slot(&mut lock(&self.cache)).clone()
            }
        }
    }

    fn save_all<T: CachedList>(&self, records: Vec<T>) -> Result<Vec<T>> {
        let ids = lock(&self.store).replace_all(T::KIND.as_str(), &records)?;
        let saved: Vec<T> = records
            .into_iter()
            .zip(ids)
            .map(|(record, id)| record.with_id(id))
            .collect();
        T::slot(&mut lock(&self.cache)).clone_from(&saved);
        debug!(kind = %T::KIND, count = saved.len(), "Saved collection");
        Ok(saved)
    }

    fn save_one<T: CachedOne>(&self, record: T) -> Result<T> {
        let ids = lock(&self.store).replace_all(T::KIND.as_str(), std::slice::from_ref(&record))?;
        let id = ids
            .first()
            .copied()
            .ok_or_else(|| Error::internal(format!("no id assigned to {} record", T::KIND)))?;
        let saved = record.with_id(id);
        *T::slot(&mut lock(&self.cache)) = Some(saved.clone());
        debug!(kind = %T::KIND, id, "Saved record");
        Ok(saved)
    }

    fn remove(&self, kind: EntityKind, id: i64) -> Result<()> {
        if lock(&self.store).delete_one(kind.as_str(), id)? {
            info!(%kind, id, "Deleted record");
            Ok(())
        } else {
            Err(Error::NotFound {
                collection: kind.as_str(),
                id: id.to_string(),
            })
        }
    }

    async fn push(&self, kind: EntityKind, matrix: &DisplayMatrix) -> BoardUpdate {
        match self.display.send(kind, matrix).await {
            Ok(SendOutcome::Sent) => BoardUpdate::Sent,
            Ok(SendOutcome::SkippedInFlight) => BoardUpdate::SkippedInFlight,
            Err(e) => BoardUpdate::Failed {
                reason: e.to_string(),
                retry_in_secs: e.time_remaining_secs(),
            },
        }
    }

    // === Flights ===

    /// Stored flights in board order, at most `flights_loaded` of them.
    #[must_use]
    pub fn list_flights(&self) -> Vec<Flight> {
        let flights = self.load_all::<Flight>();
        assemble::sort_flights(&flights)
            .into_iter()
            .take(self.limits.flights_loaded)
            .cloned()
            .collect()
    }

    /// Validate and append a flight, keep the newest `flights_stored`,
    /// and push the checkride board.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or a storage error if the
    /// collection cannot be read or written.
    pub async fn add_flight(&self, flight: Flight) -> Result<Update<Vec<Flight>>> {
        let flight = Flight::new(
            &flight.time,
            &flight.callsign,
            Some(&flight.aircraft_type),
            &flight.destination,
        )?;
        let mut flights = self.fetch_all::<Flight>()?;
        flights.push(flight);
        let saved = self.save_all(keep_newest(flights, self.limits.flights_stored))?;
        info!(count = saved.len(), "Flight added");

        let board = self.push_flights().await;
        Ok(Update {
            records: self.list_flights(),
            board,
        })
    }

    /// Delete a flight by storage id and push the checkride board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no flight has that id.
    pub async fn delete_flight(&self, id: i64) -> Result<Update<Vec<Flight>>> {
        self.remove(EntityKind::Flights, id)?;
        let board = self.push_flights().await;
        Ok(Update {
            records: self.list_flights(),
            board,
        })
    }

    /// Delete the flight at `index` in [`list_flights`](Self::list_flights)
    /// order.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the index is out of range.
    pub async fn delete_flight_at(&self, index: usize) -> Result<Update<Vec<Flight>>> {
        let flights = self.list_flights();
        let id = flights
            .get(index)
            .ok_or_else(|| Error::validation("index", format!("{index} is out of range (0..{})", flights.len())))?
            .id
            .ok_or_else(|| Error::internal("stored flight has no id"))?;
        self.delete_flight(id).await
    }

    /// The checkride board for the stored flights.
    #[must_use]
    pub fn flights_matrix(&self) -> DisplayMatrix {
        assemble::flights(&self.list_flights(), self.today())
    }

    /// Push the checkride board for the stored flights.
    pub async fn push_flights(&self) -> BoardUpdate {
        let matrix = self.flights_matrix();
        self.push(EntityKind::Flights, &matrix).await
    }

    /// Push a checkride board for `flights` without storing them.
    pub async fn display_flights(&self, flights: &[Flight]) -> BoardUpdate {
        let matrix = assemble::flights(flights, self.today());
        self.push(EntityKind::Flights, &matrix).await
    }

    // === Events ===

    /// Stored events, soonest first.
    #[must_use]
    pub fn list_events(&self) -> Vec<Event> {
        let events = self.load_all::<Event>();
        assemble::sort_events(&events, self.today())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Validate and append an event, keep the newest `events_stored`, and
    /// push the events board.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or a storage error if the
    /// collection cannot be read or written.
    pub async fn add_event(&self, event: Event) -> Result<Update<Vec<Event>>> {
        let event = Event::new(&event.date, &event.time, &event.description)?;
        let mut events = self.fetch_all::<Event>()?;
        events.push(event);
        let saved = self.save_all(keep_newest(events, self.limits.events_stored))?;
        info!(count = saved.len(), "Event added");

        let board = self.push_events().await;
        Ok(Update {
            records: self.list_events(),
            board,
        })
    }

    /// Delete an event by storage id and push the events board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no event has that id.
    pub async fn delete_event(&self, id: i64) -> Result<Update<Vec<Event>>> {
        self.remove(EntityKind::Events, id)?;
        let board = self.push_events().await;
        Ok(Update {
            records: self.list_events(),
            board,
        })
    }

    /// Delete the event at `index` in [`list_events`](Self::list_events)
    /// order.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the index is out of range.
    pub async fn delete_event_at(&self, index: usize) -> Result<Update<Vec<Event>>> {
        let events = self.list_events();
        let id = events
            .get(index)
            .ok_or_else(|| Error::validation("index", format!("{index} is out of range (0..{})", events.len())))?
            .id
            .ok_or_else(|| Error::internal("stored event has no id"))?;
        self.delete_event(id).await
    }

    /// The events board for the stored events.
    #[must_use]
    pub fn events_matrix(&self) -> DisplayMatrix {
        assemble::events(&self.list_events(), self.today())
    }

    /// Push the events board for the stored events.
    pub async fn push_events(&self) -> BoardUpdate {
        let matrix = self.events_matrix();
        self.push(EntityKind::Events, &matrix).await
    }

    // === Single-record boards ===

    /// The current birthday, if any.
    #[must_use]
    pub fn get_birthday(&self) -> Option<Birthday> {
        self.load_one()
    }

    /// Validate and store the birthday, optionally pushing it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or a storage error.
    pub async fn save_birthday(&self, record: Birthday, push: bool) -> Result<Update<Birthday>> {
        let saved = self.save_one(Birthday::new(&record.first_name, &record.date)?)?;
        let board = if push {
            self.push(EntityKind::Birthday, &layouts::birthday(&saved)).await
        } else {
            BoardUpdate::NotRequested
        };
        Ok(Update { records: saved, board })
    }

    /// The birthday board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no birthday is stored.
    pub fn birthday_matrix(&self) -> Result<DisplayMatrix> {
        self.get_birthday()
            .map(|record| layouts::birthday(&record))
            .ok_or_else(|| nothing_stored(EntityKind::Birthday))
    }

    /// Push the birthday board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no birthday is stored.
    pub async fn push_birthday(&self) -> Result<BoardUpdate> {
        let matrix = self.birthday_matrix()?;
        Ok(self.push(EntityKind::Birthday, &matrix).await)
    }

    /// The current employee recognition, if any.
    #[must_use]
    pub fn get_recognition(&self) -> Option<EmployeeRecognition> {
        self.load_one()
    }

    /// Validate and store the recognition, optionally pushing it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or a storage error.
    pub async fn save_recognition(
        &self,
        record: EmployeeRecognition,
        push: bool,
    ) -> Result<Update<EmployeeRecognition>> {
        let saved = self.save_one(EmployeeRecognition::new(&record.first_name, &record.last_name)?)?;
        let board = if push {
            self.push(EntityKind::EmployeeRecognition, &layouts::recognition(&saved))
                .await
        } else {
            BoardUpdate::NotRequested
        };
        Ok(Update { records: saved, board })
    }

    /// The recognition board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no recognition is stored.
    pub fn recognition_matrix(&self) -> Result<DisplayMatrix> {
        self.get_recognition()
            .map(|record| layouts::recognition(&record))
            .ok_or_else(|| nothing_stored(EntityKind::EmployeeRecognition))
    }

    /// Push the recognition board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no recognition is stored.
    pub async fn push_recognition(&self) -> Result<BoardUpdate> {
        let matrix = self.recognition_matrix()?;
        Ok(self.push(EntityKind::EmployeeRecognition, &matrix).await)
    }

    /// The current private pilot, if any.
    #[must_use]
    pub fn get_pilot(&self) -> Option<PrivatePilot> {
        self.load_one()
    }

    /// Validate and store the private pilot, optionally pushing it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input, or a storage error.
    pub async fn save_pilot(&self, record: PrivatePilot, push: bool) -> Result<Update<PrivatePilot>> {
        let saved = self.save_one(PrivatePilot::new(&record.name)?)?;
        let board = if push {
            self.push(EntityKind::PrivatePilot, &layouts::private_pilot(&saved))
                .await
        } else {
            BoardUpdate::NotRequested
        };
        Ok(Update { records: saved, board })
    }

    /// The private pilot board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no pilot is stored.
    pub fn pilot_matrix(&self) -> Result<DisplayMatrix> {
        self.get_pilot()
            .map(|record| layouts::private_pilot(&record))
            .ok_or_else(|| nothing_stored(EntityKind::PrivatePilot))
    }

    /// Push the private pilot board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no pilot is stored.
    pub async fn push_pilot(&self) -> Result<BoardUpdate> {
        let matrix = self.pilot_matrix()?;
        Ok(self.push(EntityKind::PrivatePilot, &matrix).await)
    }

    // === Weather ===

    /// The weather board, or the error board if conditions are
    /// unavailable.
    pub async fn weather_matrix(&self) -> DisplayMatrix {
        match self.weather.fetch().await {
            Ok(report) => layouts::weather(&report),
            Err(e) => {
                warn!(error = %e, "Weather unavailable, rendering error board");
                layouts::weather_error()
            }
        }
    }

    /// Fetch current conditions and push the weather board.
    ///
    /// # Errors
    ///
    /// Returns the weather source's error; nothing is pushed in that case.
    pub async fn push_weather(&self) -> Result<BoardUpdate> {
        let report = self.weather.fetch().await?;
        Ok(self.push(EntityKind::Weather, &layouts::weather(&report)).await)
    }
}

fn nothing_stored(kind: EntityKind) -> Error {
    Error::NotFound {
        collection: kind.as_str(),
        id: "latest".to_string(),
    }
}

impl fmt::Debug for BoardService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardService")
            .field("display", &self.display)
            .field("limits", &self.limits)
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::charset::encode_str;
    use crate::records::WeatherReport;
    use crate::transport::TransportResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct RecordingTransport {
        statuses: Mutex<Vec<u16>>,
        sent: Mutex<Vec<DisplayMatrix>>,
        calls: AtomicUsize,
    }

    impl RecordingTransport {
        fn failing_with(status: u16) -> Self {
            Self {
                statuses: Mutex::new(vec![status]),
                ..Self::default()
            }
        }

        fn last(&self) -> Option<DisplayMatrix> {
            self.sent.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl DisplayTransport for RecordingTransport {
        async fn post(&self, matrix: &DisplayMatrix) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(matrix.clone());
            let status = self.statuses.lock().unwrap().pop().unwrap_or(200);
            Ok(TransportResponse::with_status(status))
        }
    }

    #[derive(Debug)]
    struct FixedWeather(Option<WeatherReport>);

    #[async_trait]
    impl WeatherSource for FixedWeather {
        async fn fetch(&self) -> Result<WeatherReport> {
            self.0.clone().ok_or_else(|| Error::weather("HTTP 401"))
        }
    }

    fn service_with(transport: Arc<RecordingTransport>, weather: Option<WeatherReport>) -> BoardService {
        BoardService::new(
            DocumentStore::open_in_memory().unwrap(),
            DisplayClient::new(transport, RateGate::default()),
            Arc::new(FixedWeather(weather)),
            LimitsConfig::default(),
        )
        .with_today(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap())
    }

    fn service(transport: Arc<RecordingTransport>) -> BoardService {
        service_with(transport, None)
    }

    fn flight(time: &str, callsign: &str) -> Flight {
        Flight {
            time: time.to_string(),
            callsign: callsign.to_string(),
            destination: "KXNA".to_string(),
            ..Flight::default()
        }
    }

    fn row_text(matrix: &DisplayMatrix, row: usize) -> Vec<u8> {
        matrix.rows()[row].codes().to_vec()
    }

    #[tokio::test]
    async fn test_add_flight_defaults_type_and_pushes() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        let update = service.add_flight(flight("0900", "N123AB")).await.unwrap();
        assert_eq!(update.board, BoardUpdate::Sent);
        assert_eq!(update.records.len(), 1);
        assert_eq!(update.records[0].aircraft_type, "PPL");
        assert!(update.records[0].id.is_some());

        let sent = transport.last().unwrap();
        assert_eq!(row_text(&sent, 0)[..10], encode_str("CHECKRIDES")[..]);
    }

    #[tokio::test]
    async fn test_reads_fall_back_to_cache_when_storage_fails() {
        let service = service(Arc::new(RecordingTransport::default()));
        service.add_flight(flight("0900", "N1")).await.unwrap();
        service
            .save_pilot(PrivatePilot::new("Amelia").unwrap(), false)
            .await
            .unwrap();

        lock(&service.store).execute_batch("DROP TABLE documents").unwrap();

        let callsigns: Vec<String> = service.list_flights().into_iter().map(|f| f.callsign).collect();
        assert_eq!(callsigns, vec!["N1"]);
        assert_eq!(service.get_pilot().unwrap().name, "Amelia");
    }

    #[tokio::test]
    async fn test_failed_save_leaves_cache_unchanged() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());
        service
            .save_pilot(PrivatePilot::new("Amelia").unwrap(), false)
            .await
            .unwrap();

        lock(&service.store).execute_batch("DROP TABLE documents").unwrap();

        assert!(service
            .save_pilot(PrivatePilot::new("Bessie").unwrap(), true)
            .await
            .is_err());
        assert!(service.add_flight(flight("0900", "N1")).await.is_err());
        assert_eq!(service.get_pilot().unwrap().name, "Amelia");
        assert!(service.list_flights().is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreadable_document_is_skipped() {
        let service = service(Arc::new(RecordingTransport::default()));
        service.add_flight(flight("0900", "GOOD")).await.unwrap();
        lock(&service.store)
            .insert_one(
                EntityKind::Flights.as_str(),
                &serde_json::json!({ "time": 930, "callsign": "BAD" }),
            )
            .unwrap();

        let callsigns: Vec<String> = service.list_flights().into_iter().map(|f| f.callsign).collect();
        assert_eq!(callsigns, vec!["GOOD"]);
    }

    #[tokio::test]
    async fn test_add_flight_rejects_blank_callsign() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        let err = service.add_flight(flight("0900", "  ")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_flight_keeps_newest() {
        let service = service(Arc::new(RecordingTransport::default()));
        for hour in 1..=7 {
            service
                .add_flight(flight(&format!("{hour:02}00"), &format!("N{hour}")))
                .await
                .unwrap();
        }

        let callsigns: Vec<String> = service.list_flights().into_iter().map(|f| f.callsign).collect();
        assert_eq!(callsigns, vec!["N3", "N4", "N5", "N6", "N7"]);
    }

    #[tokio::test]
    async fn test_list_flights_sorted_by_time() {
        let service = service(Arc::new(RecordingTransport::default()));
        service.add_flight(flight("1400", "LATE")).await.unwrap();
        service.add_flight(flight("8:30", "EARLY")).await.unwrap();

        let callsigns: Vec<String> = service.list_flights().into_iter().map(|f| f.callsign).collect();
        assert_eq!(callsigns, vec!["EARLY", "LATE"]);
    }

    #[tokio::test]
    async fn test_delete_flight_by_id_and_index() {
        let service = service(Arc::new(RecordingTransport::default()));
        service.add_flight(flight("0900", "A")).await.unwrap();
        let update = service.add_flight(flight("1000", "B")).await.unwrap();
        let id = update.records[0].id.unwrap();

        let update = service.delete_flight(id).await.unwrap();
        assert_eq!(update.records.len(), 1);
        assert_eq!(update.records[0].callsign, "B");

        let update = service.delete_flight_at(0).await.unwrap();
        assert!(update.records.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_flight() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        let err = service.delete_flight(99).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { collection: "flights", .. }));
        let err = service.delete_flight_at(3).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_board_failure_does_not_fail_write() {
        let transport = Arc::new(RecordingTransport::failing_with(500));
        let service = service(transport);

        let update = service.add_flight(flight("0900", "N1")).await.unwrap();
        assert!(update.board.is_failed());
        assert_eq!(service.list_flights().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_reported_in_update() {
        let transport = Arc::new(RecordingTransport::failing_with(429));
        let service = service(transport.clone());

        let update = service.add_flight(flight("0900", "N1")).await.unwrap();
        assert!(matches!(
            update.board,
            BoardUpdate::Failed {
                retry_in_secs: Some(300),
                ..
            }
        ));
        assert!(service.rate_limit_status().is_limited);

        let update = service.add_flight(flight("1000", "N2")).await.unwrap();
        assert!(update.board.is_failed());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_display_flights_does_not_store() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        let board = service.display_flights(&[flight("0900", "TEMP")]).await;
        assert_eq!(board, BoardUpdate::Sent);
        assert!(service.list_flights().is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_events_sorted_by_days_until() {
        let service = service(Arc::new(RecordingTransport::default()));
        for (date, description) in [("01/05", "NEW YEAR FLY-IN"), ("12/25", "XMAS")] {
            let event = Event {
                date: date.to_string(),
                description: description.to_string(),
                ..Event::default()
            };
            service.add_event(event).await.unwrap();
        }

        let dates: Vec<String> = service.list_events().into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec!["12/25", "01/05"]);
        assert_eq!(service.list_events()[1].description, "NEW YEAR FLY-IN");
    }

    #[tokio::test]
    async fn test_add_event_rejects_bad_date() {
        let service = service(Arc::new(RecordingTransport::default()));
        let event = Event {
            date: "13/45".to_string(),
            description: "NOPE".to_string(),
            ..Event::default()
        };
        assert!(service.add_event(event).await.unwrap_err().is_validation());
        assert!(service.list_events().is_empty());
    }

    #[tokio::test]
    async fn test_save_birthday_without_push() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        let update = service
            .save_birthday(Birthday::new(" Ada ", "12/10").unwrap(), false)
            .await
            .unwrap();
        assert_eq!(update.board, BoardUpdate::NotRequested);
        assert_eq!(update.records.first_name, "Ada");
        assert_eq!(service.get_birthday(), Some(update.records));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_record() {
        let service = service(Arc::new(RecordingTransport::default()));
        service.save_pilot(PrivatePilot::new("AMY").unwrap(), false).await.unwrap();
        service.save_pilot(PrivatePilot::new("BOB").unwrap(), false).await.unwrap();

        assert_eq!(service.get_pilot().unwrap().name, "BOB");
    }

    #[tokio::test]
    async fn test_push_without_record_is_not_found() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        assert!(matches!(
            service.push_recognition().await.unwrap_err(),
            Error::NotFound { .. }
        ));
        assert!(service.birthday_matrix().is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_recognition_with_push() {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(transport.clone());

        let update = service
            .save_recognition(EmployeeRecognition::new("Grace", "Hopper").unwrap(), true)
            .await
            .unwrap();
        assert_eq!(update.board, BoardUpdate::Sent);
        assert_eq!(transport.last(), Some(service.recognition_matrix().unwrap()));
    }

    #[tokio::test]
    async fn test_weather_matrix_falls_back_to_error_board() {
        let service = service(Arc::new(RecordingTransport::default()));
        assert_eq!(service.weather_matrix().await, layouts::weather_error());
        assert!(service.push_weather().await.is_err());
    }

    #[tokio::test]
    async fn test_push_weather_renders_report() {
        let transport = Arc::new(RecordingTransport::default());
        let report = WeatherReport {
            temperature: 72,
            wind: 5,
            condition: "Clear".to_string(),
        };
        let service = service_with(transport.clone(), Some(report.clone()));

        assert_eq!(service.push_weather().await.unwrap(), BoardUpdate::Sent);
        assert_eq!(transport.last(), Some(layouts::weather(&report)));
        assert_eq!(service.weather_matrix().await, layouts::weather(&report));
    }

    #[test]
    fn test_board_update_serializes_tagged() {
        let json = serde_json::to_value(BoardUpdate::Failed {
            reason: "limited".to_string(),
            retry_in_secs: Some(30),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["retry_in_secs"], 30);
        assert_eq!(serde_json::to_value(BoardUpdate::Sent).unwrap()["status"], "sent");
    }

    #[test]
    fn test_keep_newest() {
        assert_eq!(keep_newest(vec![1, 2, 3, 4], 2), vec![3, 4]);
        assert_eq!(keep_newest(vec![1], 5), vec![1]);
    }
}
