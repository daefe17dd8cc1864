use crate::ui;
use anyhow::{anyhow, Context, Result};
use fieldcal::model::ingest;
use fieldcal::storage::{
    init_project_store, load_calendar, locate_store, read_events_json, save_calendar, Calendar,
    StoreLocation,
};
use fieldcal::{
    resolve_cell_date, DateKey, Event, EventId, EventIndex, Membership, MonthCursor, MonthMatrix,
};
use std::env;
use std::path::{Path, PathBuf};

pub fn init(name: Option<String>) -> Result<()> {
    let cwd = env::current_dir()?;
    let location = init_project_store(&cwd, name)?;
    println!("Initialized calendar at {}", location.path.display());
    Ok(())
}

pub fn month(file: Option<PathBuf>, month: Option<String>) -> Result<()> {
    let (calendar, _) = load_current_calendar(file)?;
    let cursor = match month {
        Some(raw) => parse_month(&raw)?,
        None => MonthCursor::of(initial_selection(&calendar)),
    };
    let grid = MonthMatrix::for_cursor(cursor);
    print!("{}", render_month(&grid, &calendar.events.index()));
    Ok(())
}

pub fn day(file: Option<PathBuf>, date: Option<String>) -> Result<()> {
    let (calendar, _) = load_current_calendar(file)?;
    let date = parse_date_or_selected(date.as_deref(), &calendar)?;
    let index = calendar.events.index();
    let events = index.get(&date);
    println!("{} ({} event(s))", date, events.len());
    if events.is_empty() {
        println!("  (no events)");
    }
    for event in events {
        print_event(event);
    }
    Ok(())
}

pub fn add(
    file: Option<PathBuf>,
    title: String,
    date: Option<String>,
    details: String,
) -> Result<()> {
    let (mut calendar, location) = load_current_calendar(file)?;
    let date = parse_date_or_selected(date.as_deref(), &calendar)?;
    let id = EventId::generate();
    let event = Event::new(id.clone(), date, title.trim().to_string(), details);
    calendar
        .events
        .add(event)
        .with_context(|| format!("adding event on {}", date))?;
    save_calendar(&location, &calendar)?;
    println!("Added event {} on {}", id, date);
    Ok(())
}

pub fn remove(file: Option<PathBuf>, id: String) -> Result<()> {
    let (mut calendar, location) = load_current_calendar(file)?;
    let removed = calendar
        .events
        .remove(&id)
        .with_context(|| format!("removing event {}", id))?;
    save_calendar(&location, &calendar)?;
    println!("Removed event {} ({})", removed.id, removed.title);
    Ok(())
}

pub fn import(file: Option<PathBuf>, path: &Path, append: bool) -> Result<()> {
    let (mut calendar, location) = load_current_calendar(file)?;
    let (events, unparsed) = ingest(read_events_json(path)?);
    let imported = events.len();
    let skipped = unparsed.len();
    if append {
        calendar.events.extend(events);
        calendar.unparsed.extend(unparsed);
    } else {
        calendar.events.replace(events);
        calendar.unparsed = unparsed;
    }
    save_calendar(&location, &calendar)?;
    tracing::info!(imported, skipped, append, "imported events");
    println!(
        "Imported {} event(s) from {} ({} skipped with unreadable dates)",
        imported,
        path.display(),
        skipped
    );
    Ok(())
}

pub fn tui(file: Option<PathBuf>) -> Result<()> {
    let (calendar, location) = load_current_calendar(file)?;
    ui::run(calendar, location)
}

fn load_current_calendar(file: Option<PathBuf>) -> Result<(Calendar, StoreLocation)> {
    let location = match file {
        Some(path) => StoreLocation::explicit(path),
        None => locate_store(&env::current_dir()?)?,
    };
    let calendar = load_calendar(&location)?;
    Ok((calendar, location))
}

/// Stored selection, else today.
pub fn initial_selection(calendar: &Calendar) -> DateKey {
    calendar.selected.unwrap_or_else(DateKey::today)
}

fn parse_date_or_selected(input: Option<&str>, calendar: &Calendar) -> Result<DateKey> {
    match input.map(str::trim) {
        Some(raw) if !raw.is_empty() => Ok(DateKey::parse(raw)?),
        _ => Ok(initial_selection(calendar)),
    }
}

fn parse_month(input: &str) -> Result<MonthCursor> {
    let raw = input.trim();
    let first = DateKey::parse(&format!("{}-01", raw))
        .map_err(|_| anyhow!("invalid month format (use YYYY-MM): {}", raw))?;
    Ok(MonthCursor::of(first))
}

fn render_month(grid: &MonthMatrix, index: &EventIndex) -> String {
    let cursor = grid.cursor();
    let mut out = format!("{}\n", cursor.label());
    for label in fieldcal::month::WEEKDAY_LABELS {
        out.push_str(&format!("{:>4}{:<5}", label, ""));
    }
    out.push('\n');
    for week in grid.weeks() {
        for cell in week {
            let date = resolve_cell_date(cursor, *cell);
            let day = match cell.membership {
                Membership::Current => format!("{}", cell.day),
                Membership::Previous | Membership::Next => format!("·{}", cell.day),
            };
            out.push_str(&format!("{:>4}{:<5}", day, ui::dot_marker(index.count(&date))));
        }
        out.push('\n');
    }
    out
}

fn print_event(event: &Event) {
    println!("  - {}: {}", event.id, event.title);
    if !event.details.is_empty() {
        println!("    {}", event.details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64, date: &str) -> Event {
        Event::new(
            EventId::Number(id),
            DateKey::parse(date).unwrap(),
            format!("visit {}", id),
            String::new(),
        )
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-02").unwrap(), MonthCursor::new(2024, 1));
        assert_eq!(parse_month(" 1999-12 ").unwrap(), MonthCursor::new(1999, 11));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("2024-2").is_err());
        assert!(parse_month("february").is_err());
    }

    #[test]
    fn test_date_defaults_to_stored_selection() {
        let mut calendar = Calendar::named("test");
        calendar.selected = Some(DateKey::from_parts(2024, 4, 9));
        assert_eq!(
            parse_date_or_selected(None, &calendar).unwrap().to_canonical(),
            "2024-05-09"
        );
        assert_eq!(
            parse_date_or_selected(Some(" "), &calendar).unwrap().to_canonical(),
            "2024-05-09"
        );
        assert_eq!(
            parse_date_or_selected(Some("2024-01-02"), &calendar)
                .unwrap()
                .to_canonical(),
            "2024-01-02"
        );
        assert!(parse_date_or_selected(Some("01/02/2024"), &calendar).is_err());
    }

    #[test]
    fn test_render_month_layout() {
        let events = vec![
            event(1, "2024-02-01"),
            event(2, "2024-02-01"),
            event(3, "2024-01-30"),
        ];
        let rendered = render_month(&MonthMatrix::build(2024, 1), &EventIndex::build(&events));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "2024-02");
        assert!(lines[1].trim_start().starts_with("Su"));
        assert!(lines[2].contains("·30•"));
        assert!(lines[2].contains("1••"));
        assert!(lines[7].contains("·9"));
    }
}
