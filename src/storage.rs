use crate::date_key::DateKey;
use crate::model::{ingest, EventList, RawEvent};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STORE_DIR: &str = ".fieldcal";
const STORE_FILE: &str = "calendar.yml";
const SEED_FILE: &str = "events.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Explicit,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Explicit => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

impl StoreLocation {
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        StoreLocation {
            path: path.into(),
            scope: StoreScope::Explicit,
        }
    }

    /// Seed events looked up next to the store file.
    pub fn seed_path(&self) -> PathBuf {
        self.path.with_file_name(SEED_FILE)
    }
}

/// On-disk layout of the store file.
#[derive(Debug, Serialize, Deserialize)]
struct CalendarFile {
    name: String,
    #[serde(default)]
    selected: Option<DateKey>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

/// Everything the host keeps between runs.
#[derive(Debug, Clone)]
pub struct Calendar {
    pub name: String,
    pub selected: Option<DateKey>,
    pub events: EventList,
    /// Records whose date could not be read. They are not shown, but they
    /// are written back untouched so nothing is lost on save.
    pub unparsed: Vec<RawEvent>,
}

impl Calendar {
    pub fn named(name: impl Into<String>) -> Self {
        Calendar {
            name: name.into(),
            selected: None,
            events: EventList::default(),
            unparsed: Vec::new(),
        }
    }

    fn from_file(file: CalendarFile) -> Self {
        let (events, unparsed) = ingest(file.events);
        Calendar {
            name: file.name,
            selected: file.selected,
            events: EventList::new(events),
            unparsed,
        }
    }

    fn to_file(&self) -> CalendarFile {
        let mut events = self.events.to_raw();
        events.extend(self.unparsed.iter().cloned());
        CalendarFile {
            name: self.name.clone(),
            selected: self.selected,
            events,
        }
    }

    fn has_records(&self) -> bool {
        !self.events.is_empty() || !self.unparsed.is_empty()
    }
}

pub fn init_project_store(dir: &Path, name: Option<String>) -> Result<StoreLocation> {
    let store_dir = dir.join(STORE_DIR);
    fs::create_dir_all(&store_dir).context("failed to create .fieldcal directory")?;
    let location = StoreLocation {
        path: store_dir.join(STORE_FILE),
        scope: StoreScope::Project,
    };
    if !location.path.exists() {
        let calendar_name = name.unwrap_or_else(|| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("project")
                .to_string()
        });
        save_calendar(&location, &Calendar::named(calendar_name))?;
    }
    Ok(location)
}

pub fn locate_store(start: &Path) -> Result<StoreLocation> {
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: global_data_dir()?.join(STORE_FILE),
        scope: StoreScope::Global,
    })
}

/// Loads the store, creating it when missing. An empty store is filled from
/// `events.json` next to it when that file exists and parses; a broken seed
/// is logged and the calendar starts empty.
pub fn load_calendar(location: &StoreLocation) -> Result<Calendar> {
    let mut calendar = if location.path.exists() {
        let data = fs::read_to_string(&location.path)
            .with_context(|| format!("reading {:?}", location.path))?;
        let file: CalendarFile = serde_yaml::from_str(&data).context("parsing calendar file")?;
        Calendar::from_file(file)
    } else {
        let calendar = Calendar::named(fallback_name(location));
        save_calendar(location, &calendar)?;
        tracing::info!(path = %location.path.display(), "created calendar store");
        calendar
    };

    if !calendar.has_records() {
        let seed = location.seed_path();
        if seed.exists() {
            match read_events_json(&seed) {
                Ok(raw) => {
                    let (events, unparsed) = ingest(raw);
                    tracing::info!(
                        path = %seed.display(),
                        count = events.len(),
                        "seeded calendar from json"
                    );
                    calendar.events = EventList::new(events);
                    calendar.unparsed = unparsed;
                }
                Err(err) => {
                    tracing::warn!(
                        path = %seed.display(),
                        error = %format!("{:#}", err),
                        "ignoring unreadable seed file"
                    );
                }
            }
        }
    }
    Ok(calendar)
}

pub fn save_calendar(location: &StoreLocation, calendar: &Calendar) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(&calendar.to_file()).context("serializing calendar")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    tracing::debug!(
        path = %location.path.display(),
        events = calendar.events.len(),
        "saved calendar"
    );
    Ok(())
}

/// Reads a JSON array of `{id, date, title, details}` records.
pub fn read_events_json(path: &Path) -> Result<Vec<RawEvent>> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let events: Vec<RawEvent> =
        serde_json::from_str(&data).with_context(|| format!("parsing {:?}", path))?;
    Ok(events)
}

pub fn global_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "fieldcal").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn fallback_name(location: &StoreLocation) -> String {
    match location.scope {
        StoreScope::Project => location
            .path
            .parent()
            .and_then(|p| p.parent())
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_string(),
        StoreScope::Global => "default".to_string(),
        StoreScope::Explicit => location
            .path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("calendar")
            .to_string(),
    }
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(STORE_DIR).join(STORE_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}
