use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use reserva::clock::SystemClock;
use reserva::console::Console;
use reserva::engine::ReservationManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the console dialogue; logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let metrics_port: Option<u16> = std::env::var("RESERVA_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    reserva::observability::init(metrics_port)?;

    let data_file = PathBuf::from(
        std::env::var("RESERVA_DATA_FILE").unwrap_or_else(|_| "./data/reserva.json".into()),
    );
    let autosave_threshold: u64 = std::env::var("RESERVA_AUTOSAVE_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    // Ensure data directory exists
    if let Some(dir) = data_file.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }

    let manager = ReservationManager::open(&data_file, Box::new(SystemClock))?;
    info!("reserva ready");
    info!("  data_file: {}", data_file.display());
    info!("  autosave: {}", match autosave_threshold {
        0 => "disabled".to_string(),
        n => format!("every {n} changes"),
    });
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));
    let mut console = Console::new(manager, data_file, autosave_threshold);

    // Graceful shutdown: stop reading on SIGTERM/ctrl-c, then save
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
    };
    tokio::pin!(shutdown);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"type `help` for commands\n> ").await?;
    stdout.flush().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("end of input");
                    break;
                };
                let reply = console.handle_line(&line);
                if !reply.text.is_empty() {
                    stdout.write_all(reply.text.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
                if reply.quit {
                    break;
                }
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping console");
                break;
            }
        }
    }
    stdout.flush().await?;

    console.shutdown()?;
    info!("reserva stopped");
    Ok(())
}
