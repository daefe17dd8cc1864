use crate::date_key::{DateKey, DateKeyError};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Event identifiers come from hand-written seed files as numbers and from
/// the app as short strings, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(u64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Number(n) => write!(f, "{}", n),
            EventId::Text(s) => f.write_str(s),
        }
    }
}

impl EventId {
    /// Short random id for events created in the app.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        EventId::Text(id)
    }

    /// Matches user input against either shape, so `7` finds `EventId::Number(7)`.
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            EventId::Number(n) => raw.trim().parse::<u64>().map_or(false, |r| r == *n),
            EventId::Text(s) => s == raw.trim(),
        }
    }
}

/// An event record as it is stored, before its date has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: EventId,
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub date: DateKey,
    pub title: String,
    pub details: String,
}

#[derive(thiserror::Error, Debug)]
pub enum CalendarError {
    #[error("event not found: {0}")]
    EventNotFound(String),
    #[error("{count} events share the id {id}")]
    AmbiguousId { id: String, count: usize },
    #[error("event {id} has an invalid date")]
    InvalidDate {
        id: EventId,
        #[source]
        source: DateKeyError,
    },
    #[error("title is required")]
    EmptyTitle,
}

impl Event {
    pub fn new(id: EventId, date: DateKey, title: String, details: String) -> Self {
        Event {
            id,
            date,
            title,
            details,
        }
    }

    /// Shortened details for list views, `...` appended when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.details.chars().take(max_chars).collect();
        if self.details.chars().count() > max_chars {
            out.push_str("...");
        }
        out
    }
}

impl TryFrom<RawEvent> for Event {
    type Error = CalendarError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let date = DateKey::parse(&raw.date).map_err(|source| CalendarError::InvalidDate {
            id: raw.id.clone(),
            source,
        })?;
        Ok(Event {
            id: raw.id,
            date,
            title: raw.title,
            details: raw.details,
        })
    }
}

impl From<&Event> for RawEvent {
    fn from(event: &Event) -> Self {
        RawEvent {
            id: event.id.clone(),
            date: event.date.to_canonical(),
            title: event.title.clone(),
            details: event.details.clone(),
        }
    }
}

/// Validates stored records. Records whose date does not parse are handed
/// back untouched so the caller can keep them on disk.
pub fn ingest(raw: Vec<RawEvent>) -> (Vec<Event>, Vec<RawEvent>) {
    let mut events = Vec::with_capacity(raw.len());
    let mut unparsed = Vec::new();
    for record in raw {
        match Event::try_from(record.clone()) {
            Ok(event) => events.push(event),
            Err(err) => {
                tracing::warn!(error = %err, date = %record.date, "skipping event record");
                unparsed.push(record);
            }
        }
    }
    (events, unparsed)
}

/// Events grouped by date, each group in source order.
///
/// Rebuilt from scratch whenever the source list changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventIndex {
    by_date: HashMap<DateKey, Vec<Event>>,
}

impl EventIndex {
    pub fn build(events: &[Event]) -> Self {
        let mut by_date: HashMap<DateKey, Vec<Event>> = HashMap::new();
        for event in events {
            by_date.entry(event.date).or_default().push(event.clone());
        }
        EventIndex { by_date }
    }

    pub fn get(&self, date: &DateKey) -> &[Event] {
        self.by_date.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, date: &DateKey) -> usize {
        self.get(date).len()
    }

    /// Number of distinct dates with at least one event.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

/// Source collection of events, owned by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    pub fn new(events: Vec<Event>) -> Self {
        EventList { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn index(&self) -> EventIndex {
        EventIndex::build(&self.events)
    }

    pub fn find(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id.matches(id))
    }

    pub fn add(&mut self, event: Event) -> Result<(), CalendarError> {
        if event.title.trim().is_empty() {
            return Err(CalendarError::EmptyTitle);
        }
        if self.events.iter().any(|e| e.id == event.id) {
            tracing::warn!(id = %event.id, "adding event with an id that is already in use");
        }
        self.events.push(event);
        Ok(())
    }

    /// Updates the single event with `id`. Refuses ids shared by several events.
    pub fn update_event<F>(&mut self, id: &str, f: F) -> Result<(), CalendarError>
    where
        F: FnMut(&mut Event),
    {
        let pos = self.locate(id)?;
        self.update_at(pos, f)
    }

    /// Removes the single event with `id`. Refuses ids shared by several events.
    pub fn remove(&mut self, id: &str) -> Result<Event, CalendarError> {
        let pos = self.locate(id)?;
        self.remove_at(pos)
    }

    /// Position of the record equal to `event`, for callers that hold a copy
    /// of the exact event they mean.
    pub fn position_of(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    pub fn update_at<F>(&mut self, pos: usize, mut f: F) -> Result<(), CalendarError>
    where
        F: FnMut(&mut Event),
    {
        let event = self
            .events
            .get_mut(pos)
            .ok_or_else(|| CalendarError::EventNotFound(format!("#{}", pos)))?;
        let mut updated = event.clone();
        f(&mut updated);
        if updated.title.trim().is_empty() {
            return Err(CalendarError::EmptyTitle);
        }
        *event = updated;
        Ok(())
    }

    pub fn remove_at(&mut self, pos: usize) -> Result<Event, CalendarError> {
        if pos >= self.events.len() {
            return Err(CalendarError::EventNotFound(format!("#{}", pos)));
        }
        Ok(self.events.remove(pos))
    }

    fn locate(&self, id: &str) -> Result<usize, CalendarError> {
        let mut hits = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.id.matches(id))
            .map(|(pos, _)| pos);
        let pos = hits
            .next()
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;
        let extra = hits.count();
        if extra > 0 {
            return Err(CalendarError::AmbiguousId {
                id: id.to_string(),
                count: extra + 1,
            });
        }
        Ok(pos)
    }

    pub fn replace(&mut self, events: Vec<Event>) {
        self.events = events;
    }

    pub fn extend(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_raw(&self) -> Vec<RawEvent> {
        self.events.iter().map(RawEvent::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64, date: &str) -> Event {
        Event::new(
            EventId::Number(id),
            DateKey::parse(date).unwrap(),
            format!("event {}", id),
            String::new(),
        )
    }

    fn ids(events: &[Event]) -> Vec<String> {
        events.iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn test_index_groups_in_source_order() {
        let events = vec![
            event(1, "2024-03-01"),
            event(2, "2024-03-01"),
            event(3, "2024-03-02"),
        ];
        let index = EventIndex::build(&events);
        assert_eq!(ids(index.get(&DateKey::parse("2024-03-01").unwrap())), vec!["1", "2"]);
        assert_eq!(ids(index.get(&DateKey::parse("2024-03-02").unwrap())), vec!["3"]);
        assert!(index.get(&DateKey::parse("2024-03-03").unwrap()).is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_index_keeps_interleaved_order() {
        let events = vec![
            event(5, "2024-03-01"),
            event(4, "2024-03-02"),
            event(9, "2024-03-01"),
            event(1, "2024-03-01"),
        ];
        let index = EventIndex::build(&events);
        assert_eq!(
            ids(index.get(&DateKey::parse("2024-03-01").unwrap())),
            vec!["5", "9", "1"]
        );
    }

    #[test]
    fn test_empty_index_lookups() {
        let index = EventIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.count(&DateKey::from_parts(2024, 0, 1)), 0);
    }

    #[test]
    fn test_rebuilding_index_is_idempotent() {
        let list = EventList::new(vec![event(1, "2024-03-01"), event(2, "2024-04-01")]);
        assert_eq!(list.index(), list.index());
    }

    #[test]
    fn test_ingest_skips_malformed_dates() {
        let raw = vec![
            RawEvent {
                id: EventId::Number(1),
                date: "2024-03-01".into(),
                title: "ok".into(),
                details: String::new(),
            },
            RawEvent {
                id: EventId::Text("bad".into()),
                date: "03/01/2024".into(),
                title: "broken".into(),
                details: String::new(),
            },
        ];
        let (events, unparsed) = ingest(raw);
        assert_eq!(ids(&events), vec!["1"]);
        assert_eq!(unparsed.len(), 1);
        assert_eq!(unparsed[0].date, "03/01/2024");
    }

    #[test]
    fn test_invalid_date_error_names_the_event() {
        let raw = RawEvent {
            id: EventId::Text("bad".into()),
            date: "2024-02-30".into(),
            title: "broken".into(),
            details: String::new(),
        };
        let err = Event::try_from(raw).unwrap_err();
        assert!(matches!(
            &err,
            CalendarError::InvalidDate { id: EventId::Text(id), .. } if id == "bad"
        ));
        assert_eq!(err.to_string(), "event bad has an invalid date");
    }

    #[test]
    fn test_event_id_accepts_numbers_and_strings() {
        let json = r#"[
            {"id": 1, "date": "2024-03-01", "title": "a", "details": "x"},
            {"id": "k2", "date": "2024-03-02", "title": "b"}
        ]"#;
        let raw: Vec<RawEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(raw[0].id, EventId::Number(1));
        assert_eq!(raw[1].id, EventId::Text("k2".into()));
        assert_eq!(raw[1].details, "");
        assert!(raw[0].id.matches(" 1 "));
        assert!(!raw[0].id.matches("k2"));
        assert!(raw[1].id.matches("k2"));
    }

    #[test]
    fn test_generated_ids_are_short_text() {
        match EventId::generate() {
            EventId::Text(id) => {
                assert_eq!(id.len(), 6);
                assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
            }
            other => panic!("unexpected id {:?}", other),
        }
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let mut e = event(1, "2024-03-01");
        e.details = "가".repeat(70);
        let preview = e.preview(60);
        assert_eq!(preview.chars().count(), 63);
        assert!(preview.ends_with("..."));
        e.details = "short".into();
        assert_eq!(e.preview(60), "short");
    }

    #[test]
    fn test_list_add_update_remove() {
        let mut list = EventList::default();
        list.add(event(1, "2024-03-01")).unwrap();
        list.add(event(2, "2024-03-02")).unwrap();
        assert!(matches!(
            list.add(Event::new(
                EventId::Number(3),
                DateKey::from_parts(2024, 2, 3),
                "  ".into(),
                String::new()
            )),
            Err(CalendarError::EmptyTitle)
        ));

        list.update_event("2", |e| e.title = "renamed".into()).unwrap();
        assert_eq!(list.find("2").map(|e| e.title.as_str()), Some("renamed"));

        let removed = list.remove("1").unwrap();
        assert_eq!(removed.id, EventId::Number(1));
        assert!(matches!(list.remove("1"), Err(CalendarError::EventNotFound(_))));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_shared_ids_are_addressed_by_position() {
        let mut list = EventList::default();
        let march = Event::new(
            EventId::Number(1),
            DateKey::parse("2024-03-01").unwrap(),
            "march".into(),
            String::new(),
        );
        let fifth = Event::new(
            EventId::Number(1),
            DateKey::parse("2024-03-05").unwrap(),
            "fifth".into(),
            String::new(),
        );
        list.add(march.clone()).unwrap();
        list.add(fifth.clone()).unwrap();

        assert!(matches!(
            list.remove("1"),
            Err(CalendarError::AmbiguousId { count: 2, .. })
        ));
        assert!(list.update_event("1", |e| e.title = "x".into()).is_err());
        assert_eq!(list.len(), 2);

        let pos = list.position_of(&fifth).unwrap();
        assert_eq!(pos, 1);
        list.update_at(pos, |e| e.details = "bring tape".into())
            .unwrap();
        assert_eq!(list.events()[0], march);

        let pos = list.position_of(&list.events()[1].clone()).unwrap();
        let removed = list.remove_at(pos).unwrap();
        assert_eq!(removed.title, "fifth");
        assert_eq!(list.events(), &[march][..]);
        assert!(list.remove_at(5).is_err());
    }

    #[test]
    fn test_number_and_text_ids_with_same_digits_are_ambiguous() {
        let mut list = EventList::default();
        list.add(event(7, "2024-03-01")).unwrap();
        list.add(Event::new(
            EventId::Text("7".into()),
            DateKey::parse("2024-03-02").unwrap(),
            "text id".into(),
            String::new(),
        ))
        .unwrap();
        assert!(matches!(
            list.remove("7"),
            Err(CalendarError::AmbiguousId { .. })
        ));
        let text = list.events()[1].clone();
        let pos = list.position_of(&text).unwrap();
        list.remove_at(pos).unwrap();
        assert_eq!(list.events()[0].id, EventId::Number(7));
    }
}
