use std::{
    fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::error::Error;

/// Writes `payload` verbatim to `path`, or to standard output when no path is given.
pub fn write_payload(payload: &[u8], path: Option<&Path>) -> Result<(), Error> {
    match path {
        Some(path) => fs::write(path, payload).map_err(|err| Error::io(path, err)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(payload)
                .and_then(|_| stdout.flush())
                .map_err(|err| Error::io("<stdout>", err))
        }
    }
}

pub fn default_report_path(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("metrics-{}.json", today.format("%Y-%m-%d")))
}

pub fn default_pr_summary_path(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("pr-summary-{}.json", today.format("%Y-%m-%d")))
}
