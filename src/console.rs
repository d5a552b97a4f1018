use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::command::{self, Command};
use crate::engine::{ReservationError, ReservationManager};
use crate::model::*;
use crate::observability;

/// Text answer to one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub ok: bool,
    pub text: String,
    /// The session should end after printing this.
    pub quit: bool,
}

impl Reply {
    fn ok(text: String) -> Self {
        Self { ok: true, text, quit: false }
    }

    fn error(text: String) -> Self {
        Self { ok: false, text, quit: false }
    }
}

/// Line-oriented front end over a [`ReservationManager`].
///
/// Owns the manager for the whole session and saves it to `data_file`
/// every `autosave_threshold` mutations (0 disables) and on shutdown.
pub struct Console {
    manager: ReservationManager,
    data_file: PathBuf,
    autosave_threshold: u64,
    /// Changes not yet written to `data_file`. Saves to other paths leave it alone.
    unsaved: u64,
}

impl Console {
    pub fn new(manager: ReservationManager, data_file: PathBuf, autosave_threshold: u64) -> Self {
        Self {
            manager,
            data_file,
            autosave_threshold,
            unsaved: 0,
        }
    }

    pub fn manager(&self) -> &ReservationManager {
        &self.manager
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn unsaved_changes(&self) -> u64 {
        self.unsaved
    }

    pub fn handle_line(&mut self, line: &str) -> Reply {
        let cmd = match command::parse_command(line) {
            Ok(cmd) => cmd,
            Err(command::CommandError::Empty) => return Reply::ok(String::new()),
            Err(e) => {
                metrics::counter!(observability::COMMANDS_TOTAL, "command" => "invalid", "status" => "error")
                    .increment(1);
                return Reply::error(format!("error: {e}"));
            }
        };

        let label = observability::command_label(&cmd);
        let mutation = cmd.is_mutation();
        let started = Instant::now();
        let quit = cmd == Command::Quit;
        let applied_before = self.manager.mutations_since_save();
        let result = self.execute(cmd);
        if mutation && result.is_ok() {
            self.unsaved += self.manager.mutations_since_save().saturating_sub(applied_before);
        }
        metrics::histogram!(observability::COMMAND_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());

        let mut reply = match result {
            Ok(text) => {
                metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => "ok").increment(1);
                Reply::ok(text)
            }
            Err(e) => {
                metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => "error").increment(1);
                debug!(command = label, "command failed: {e}");
                Reply::error(format!("error: {e}"))
            }
        };
        if mutation
            && reply.ok
            && let Some(note) = self.maybe_autosave()
        {
            reply.text.push('\n');
            reply.text.push_str(&note);
        }
        reply.quit = quit;
        reply
    }

    /// Save to `data_file` if anything changed since it was last written.
    pub fn shutdown(&mut self) -> Result<(), ReservationError> {
        if self.unsaved == 0 {
            info!("no unsaved changes");
            return Ok(());
        }
        self.manager.save(&self.data_file)?;
        self.unsaved = 0;
        Ok(())
    }

    fn maybe_autosave(&mut self) -> Option<String> {
        if self.autosave_threshold == 0 || self.unsaved < self.autosave_threshold {
            return None;
        }
        metrics::counter!(observability::AUTOSAVES_TOTAL).increment(1);
        match self.manager.save(&self.data_file) {
            Ok(()) => {
                self.unsaved = 0;
                info!(path = %self.data_file.display(), "autosaved");
                None
            }
            Err(e) => {
                warn!("autosave failed: {e}");
                Some(format!("warning: autosave failed: {e}"))
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<String, ReservationError> {
        match cmd {
            Command::Reserve(request) => {
                let placement = self.manager.add_reservation(request)?;
                let price = self.manager.price_of(placement.id)?;
                let mut out = if placement.was_shifted() {
                    format!(
                        "{} added but shifted: requested {}, placed {} (price {price})",
                        placement.id, placement.requested, placement.placed
                    )
                } else {
                    format!("{} added: {} (price {price})", placement.id, placement.placed)
                };
                for id in &placement.others_moved {
                    if let Ok(r) = self.manager.reservation(*id) {
                        let _ = write!(out, "\n  moved {id} to {}", r.stay);
                    }
                }
                Ok(out)
            }
            Command::Quote(request) => {
                let total = self.manager.quote(&request)?;
                Ok(format!(
                    "{} at {}: {total}",
                    Stay::new(request.start, request.end),
                    request.location
                ))
            }
            Command::Cancel(id) => {
                let removed = self.manager.delete_reservation(id)?;
                Ok(format!("{} deleted ({} at {})", removed.id, removed.stay, removed.location))
            }
            Command::List => {
                let lines: Vec<String> = self.manager.reservations().map(format_reservation).collect();
                Ok(if lines.is_empty() { "no reservations".into() } else { lines.join("\n") })
            }
            Command::Show(id) => {
                let details = self.manager.reservation_details(id)?;
                let r = &details.reservation;
                Ok(format!(
                    "{}\n  dates:     {} ({} days)\n  location:  {}\n  required:  {}\n  optionals: {}\n  price:     {}",
                    r.id,
                    r.stay,
                    r.stay.days(),
                    r.location,
                    format_list(&details.required),
                    format_list(&r.optionals),
                    details.price
                ))
            }
            Command::Resources => {
                let lines: Vec<String> = self
                    .manager
                    .resources()
                    .map(|r| format!("{}  quantity {}  price {}", r.name, r.capacity, r.unit_price))
                    .collect();
                Ok(if lines.is_empty() { "no resources".into() } else { lines.join("\n") })
            }
            Command::Locations => {
                let lines: Vec<String> = self
                    .manager
                    .locations()
                    .map(|l| {
                        format!(
                            "{}  price {}  required {}  optional {}",
                            l.name,
                            l.base_price,
                            format_list(&l.required),
                            format_list(&l.optional)
                        )
                    })
                    .collect();
                Ok(if lines.is_empty() { "no locations".into() } else { lines.join("\n") })
            }
            Command::Location(name) => {
                let details = self.manager.location_details(&name)?;
                let mut out = format!(
                    "{}  price {}  reservations {}",
                    details.location.name, details.location.base_price, details.reservations
                );
                for (resource, relation) in &details.relations {
                    let _ = write!(out, "\n  {resource}  {relation}");
                }
                Ok(out)
            }
            Command::AddResource { name, capacity, unit_price } => {
                self.manager.add_resource(&name, capacity, unit_price)?;
                Ok(format!("resource {name} added"))
            }
            Command::AddLocation { name, base_price, required, optional } => {
                self.manager.add_location(&name, base_price, required, optional)?;
                Ok(format!("location {name} added"))
            }
            Command::DeleteResource(name) => {
                let report = self.manager.delete_resource(&name)?;
                Ok(format_cascade(&format!("resource {name} deleted"), &report))
            }
            Command::DeleteLocation(name) => {
                let report = self.manager.delete_location(&name)?;
                Ok(format_cascade(&format!("location {name} deleted"), &report))
            }
            Command::Price { name, value } => Ok(if self.manager.update_price(&name, value)? {
                format!("price of {name} set to {value}")
            } else {
                format!("price of {name} unchanged (must be positive)")
            }),
            Command::Quantity { name, value } => match self.manager.update_quantity(&name, value)? {
                Some(report) => Ok(format_moves(&format!("quantity of {name} set to {value}"), &report)),
                None => Ok(format!("quantity of {name} unchanged (must be positive)")),
            },
            Command::Refresh => {
                let report = self.manager.refresh();
                Ok(format_moves("schedule refreshed", &report))
            }
            Command::Save(file) => {
                let path = file.unwrap_or_else(|| self.data_file.clone());
                self.manager.save(&path)?;
                if path == self.data_file {
                    self.unsaved = 0;
                }
                Ok(format!("saved to {}", path.display()))
            }
            Command::Load(file) => {
                let path = file.unwrap_or_else(|| self.data_file.clone());
                self.manager.reload(&path)?;
                // Anything loaded from elsewhere is not yet in the data file.
                self.unsaved = if path == self.data_file { 0 } else { self.unsaved.max(1) };
                Ok(format!(
                    "loaded {} ({} reservations)",
                    path.display(),
                    self.manager.reservations().count()
                ))
            }
            Command::Help => Ok(command::HELP.to_string()),
            Command::Quit => Ok("bye".into()),
        }
    }
}

fn format_reservation(r: &Reservation) -> String {
    let mut line = format!("{}  {}  {}", r.id, r.stay, r.location);
    if !r.optionals.is_empty() {
        let _ = write!(line, "  +{}", format_list(&r.optionals));
    }
    line
}

fn format_list<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let joined: Vec<&str> = names.into_iter().map(String::as_str).collect();
    if joined.is_empty() { "-".into() } else { joined.join(",") }
}

fn format_moves(headline: &str, report: &RefreshReport) -> String {
    let mut out = headline.to_string();
    for d in &report.displacements {
        let _ = write!(out, "\n  moved {} from {} to {} (after {})", d.id, d.from, d.to, d.blocked_by);
    }
    out
}

fn format_cascade(headline: &str, report: &CascadeReport) -> String {
    let mut out = headline.to_string();
    for name in &report.removed_locations {
        let _ = write!(out, "\n  removed location {name}");
    }
    for id in &report.removed_reservations {
        let _ = write!(out, "\n  removed {id}");
    }
    for id in &report.stripped_reservations {
        let _ = write!(out, "\n  updated {id} (optional dropped)");
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;
    use crate::engine::Model;

    fn console(threshold: u64, file: &str) -> Console {
        let dir = std::env::temp_dir().join("reserva_test_console");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        let _ = std::fs::remove_file(&path);
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let manager = ReservationManager::new(Model::new(), Box::new(FixedClock::new(today)));
        Console::new(manager, path, threshold)
    }

    fn run(c: &mut Console, line: &str) -> String {
        let reply = c.handle_line(line);
        assert!(reply.ok, "{line} -> {}", reply.text);
        reply.text
    }

    #[test]
    fn reserve_reports_shift() {
        let mut c = console(0, "shift.json");
        run(&mut c, "add-resource Chair 2 1");
        run(&mut c, "add-location Room 10 Chair");
        let first = run(&mut c, "reserve 2024-01-01 2024-01-02 Room");
        assert_eq!(first, "RES-001 added: 2024-01-01..2024-01-02 (price 22)");
        let second = run(&mut c, "reserve 2024-01-01 2024-01-02 Room");
        assert!(second.contains("added but shifted"), "{second}");
        assert!(second.contains("placed 2024-01-03..2024-01-04"), "{second}");
    }

    #[test]
    fn errors_are_replies_not_panics() {
        let mut c = console(0, "errors.json");
        let reply = c.handle_line("reserve 2024-01-05 2024-01-01 Room");
        assert!(!reply.ok);
        assert!(reply.text.starts_with("error: invalid range"), "{}", reply.text);

        let reply = c.handle_line("show RES-9");
        assert!(!reply.ok);
        assert_eq!(reply.text, "error: not found: RES-009");

        let reply = c.handle_line("bogus");
        assert!(!reply.ok);
    }

    #[test]
    fn blank_line_is_silent() {
        let mut c = console(0, "blank.json");
        assert_eq!(c.handle_line("   "), Reply::ok(String::new()));
    }

    #[test]
    fn quit_sets_flag() {
        let mut c = console(0, "quit.json");
        assert!(c.handle_line("quit").quit);
        assert!(!c.handle_line("help").quit);
    }

    #[test]
    fn autosave_after_threshold() {
        let mut c = console(2, "autosave.json");
        run(&mut c, "add-resource Chair 2 1");
        assert!(!c.data_file().exists());
        run(&mut c, "add-location Room 10 Chair");
        assert!(c.data_file().exists());
        assert_eq!(c.unsaved_changes(), 0);
        let _ = std::fs::remove_file(c.data_file());
    }

    #[test]
    fn failed_mutations_do_not_count() {
        let mut c = console(1, "failed.json");
        assert!(!c.handle_line("delete-resource Ghost").ok);
        assert!(!c.data_file().exists());
    }

    #[test]
    fn shutdown_saves_only_when_dirty() {
        let mut c = console(0, "shutdown.json");
        c.shutdown().unwrap();
        assert!(!c.data_file().exists());
        run(&mut c, "add-resource Chair 2 1");
        c.shutdown().unwrap();
        assert!(c.data_file().exists());
        let _ = std::fs::remove_file(c.data_file());
    }

    #[test]
    fn save_elsewhere_keeps_data_file_dirty() {
        let mut c = console(0, "main_copy.json");
        let backup = c.data_file().with_file_name("backup_copy.json");
        let _ = std::fs::remove_file(&backup);
        run(&mut c, "add-resource Chair 2 1");
        run(&mut c, &format!("save {}", backup.display()));
        assert!(backup.exists());
        assert_eq!(c.unsaved_changes(), 1);
        c.shutdown().unwrap();
        assert!(c.data_file().exists());
        assert_eq!(c.unsaved_changes(), 0);
        let _ = std::fs::remove_file(&backup);
        let _ = std::fs::remove_file(c.data_file());
    }

    #[test]
    fn load_elsewhere_marks_data_file_dirty() {
        let mut c = console(0, "main_load.json");
        let other = c.data_file().with_file_name("other_load.json");
        run(&mut c, "add-resource Chair 2 1");
        run(&mut c, "save");
        run(&mut c, "add-resource Desk 1 1");
        run(&mut c, &format!("save {}", other.display()));
        run(&mut c, "load");
        assert_eq!(c.unsaved_changes(), 0);
        run(&mut c, &format!("load {}", other.display()));
        assert_eq!(c.unsaved_changes(), 1);
        c.shutdown().unwrap();
        let reopened = ReservationManager::open(
            c.data_file(),
            Box::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
        )
        .unwrap();
        assert_eq!(reopened.resources().count(), 2);
        let _ = std::fs::remove_file(&other);
        let _ = std::fs::remove_file(c.data_file());
    }

    #[test]
    fn autosave_counts_only_changes_missing_from_data_file() {
        let mut c = console(2, "autosave_elsewhere.json");
        let backup = c.data_file().with_file_name("autosave_backup.json");
        run(&mut c, "add-resource Chair 2 1");
        run(&mut c, &format!("save {}", backup.display()));
        assert!(!c.data_file().exists());
        run(&mut c, "add-resource Desk 1 1");
        assert!(c.data_file().exists());
        let _ = std::fs::remove_file(&backup);
        let _ = std::fs::remove_file(c.data_file());
    }

    #[test]
    fn listings_render() {
        let mut c = console(0, "listings.json");
        assert_eq!(run(&mut c, "list"), "no reservations");
        run(&mut c, "add-resource Chair 2 1");
        run(&mut c, "add-resource Projector 1 5");
        run(&mut c, "add-location Room 10 Chair Projector");
        run(&mut c, "reserve 2024-01-02 2024-01-03 Room Projector");
        assert_eq!(run(&mut c, "list"), "RES-001  2024-01-02..2024-01-03  Room  +Projector");
        assert_eq!(run(&mut c, "location Room"), "Room  price 10  reservations 1\n  Chair  required\n  Projector  optional");
        let show = run(&mut c, "show 1");
        assert!(show.contains("price:     32"), "{show}");
        assert!(show.contains("required:  Chair"), "{show}");
    }
}
