use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Location, Reservation, Resource};

/// Full model as stored on disk.
///
/// Pretty-printed JSON with ISO-8601 dates. Catalog entries are written in
/// name order and reservations in schedule order, so saving an unchanged
/// model twice yields identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Next reservation id to issue.
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

fn encode_snapshot(writer: &mut impl Write, snapshot: &Snapshot) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, snapshot)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(b"\n")
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Read a snapshot. `Ok(None)` if nothing has been saved at `path` yet.
pub fn load(path: &Path) -> io::Result<Option<Snapshot>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let snapshot = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(snapshot))
}

/// Durably replace whatever is at `path` with `snapshot`.
///
/// Writes and fsyncs `<path>.tmp`, then renames it over `path`. A crash
/// mid-write leaves the previous file intact. On error the temp file is removed.
pub fn save(snapshot: &Snapshot, path: &Path) -> io::Result<()> {
    let tmp = tmp_path(path);
    let result = write_and_swap(snapshot, &tmp, path);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_swap(snapshot: &Snapshot, tmp: &Path, path: &Path) -> io::Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    encode_snapshot(&mut writer, snapshot)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(tmp, path)
}
