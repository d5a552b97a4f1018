use std::net::SocketAddr;

use crate::command::Command;

// ── RED metrics (command-driven) ────────────────────────────────

/// Counter: console commands executed. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "reserva_commands_total";

/// Histogram: command latency in seconds. Labels: command.
pub const COMMAND_DURATION_SECONDS: &str = "reserva_command_duration_seconds";

/// Counter: reservations booked. Labels: outcome (as_requested, shifted).
pub const RESERVATIONS_ADDED_TOTAL: &str = "reserva_reservations_added_total";

// ── Allocation ──────────────────────────────────────────────────

/// Histogram: full refresh sweep duration in seconds.
pub const REFRESH_DURATION_SECONDS: &str = "reserva_refresh_duration_seconds";

/// Counter: reservations moved forward by a refresh.
pub const DISPLACEMENTS_TOTAL: &str = "reserva_displacements_total";

/// Gauge: reservations currently in the schedule.
pub const RESERVATIONS_ACTIVE: &str = "reserva_reservations_active";

// ── Persistence ─────────────────────────────────────────────────

/// Histogram: snapshot write (temp file, fsync, rename) duration in seconds.
pub const SNAPSHOT_SAVE_DURATION_SECONDS: &str = "reserva_snapshot_save_duration_seconds";

/// Counter: saves triggered by the mutation threshold.
pub const AUTOSAVES_TOTAL: &str = "reserva_autosaves_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Reserve(_) => "reserve",
        Command::Quote(_) => "quote",
        Command::Cancel(_) => "cancel",
        Command::List => "list",
        Command::Show(_) => "show",
        Command::Resources => "resources",
        Command::Locations => "locations",
        Command::Location(_) => "location",
        Command::AddResource { .. } => "add_resource",
        Command::AddLocation { .. } => "add_location",
        Command::DeleteResource(_) => "delete_resource",
        Command::DeleteLocation(_) => "delete_location",
        Command::Price { .. } => "price",
        Command::Quantity { .. } => "quantity",
        Command::Refresh => "refresh",
        Command::Save(_) => "save",
        Command::Load(_) => "load",
        Command::Help => "help",
        Command::Quit => "quit",
    }
}
