//! Append-only CSV of episode reward totals, and statistics read back from it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Header line of the episode log.
pub const HEADER: &str = "Total Episode Reward";

/// Errors reading or writing the episode log.
#[derive(Debug, Error)]
pub enum EpisodeLogError {
    #[error("episode log I/O: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: missing header")]
    MissingHeader { line: usize },

    #[error("line {line}: {value:?} is not a number")]
    Malformed { line: usize, value: String },
}

/// Appends one total per completed episode.
///
/// The header is written only when the file is empty. The file is opened for
/// each append, so a log shared by sequential facades stays consistent.
#[derive(Debug, Clone)]
pub struct EpisodeLog {
    path: PathBuf,
}

impl EpisodeLog {
    /// Creates the file (and its header) if it does not yet exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EpisodeLogError> {
        let log = Self { path: path.into() };
        log.writer()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&self) -> Result<BufWriter<File>, EpisodeLogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if empty {
            writeln!(writer, "{HEADER}")?;
            writer.flush()?;
        }
        Ok(writer)
    }

    pub fn append(&self, total: f64) -> Result<(), EpisodeLogError> {
        let mut writer = self.writer()?;
        writeln!(writer, "{total}")?;
        writer.flush()?;
        Ok(())
    }

    /// Parses every total in the log at `path`.
    pub fn read_totals(path: impl AsRef<Path>) -> Result<Vec<f64>, EpisodeLogError> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines().enumerate();
        match lines.next() {
            Some((_, first)) if first.trim() == HEADER => {}
            Some(_) => return Err(EpisodeLogError::MissingHeader { line: 1 }),
            None => return Ok(Vec::new()),
        }
        lines
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                l.trim()
                    .parse::<f64>()
                    .map_err(|_| EpisodeLogError::Malformed {
                        line: i + 1,
                        value: l.to_string(),
                    })
            })
            .collect()
    }
}

/// Summary statistics over a sequence of episode totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardHistory {
    totals: Vec<f64>,
}

impl RewardHistory {
    pub fn new(totals: Vec<f64>) -> Self {
        Self { totals }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EpisodeLogError> {
        EpisodeLog::read_totals(path).map(Self::new)
    }

    pub fn push(&mut self, total: f64) {
        self.totals.push(total);
    }

    pub fn totals(&self) -> &[f64] {
        &self.totals
    }

    pub fn count(&self) -> usize {
        self.totals.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.totals.is_empty() {
            return None;
        }
        Some(self.totals.iter().sum::<f64>() / self.totals.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.totals.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.totals.iter().copied().reduce(f64::max)
    }

    pub fn last(&self) -> Option<f64> {
        self.totals.last().copied()
    }

    /// Trailing mean over up to `window` episodes, one value per episode.
    pub fn moving_average(&self, window: usize) -> Vec<f64> {
        if window == 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.totals.len());
        let mut sum = 0.0;
        for (i, total) in self.totals.iter().enumerate() {
            sum += total;
            if i >= window {
                sum -= self.totals[i - window];
            }
            out.push(sum / (i + 1).min(window) as f64);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("episode-log-{}.csv", uuid::Uuid::new_v4()))
    }

    #[test]
    fn header_written_once() {
        let path = temp_path();
        let log = EpisodeLog::open(&path).unwrap();
        log.append(-12.5).unwrap();
        let again = EpisodeLog::open(&path).unwrap();
        again.append(480.0).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Total Episode Reward\n-12.5\n480\n");
        assert_eq!(EpisodeLog::read_totals(&path).unwrap(), vec![-12.5, 480.0]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn existing_content_is_kept() {
        let path = temp_path();
        fs::write(&path, "Total Episode Reward\n3\n").unwrap();
        EpisodeLog::open(&path).unwrap().append(4.0).unwrap();
        assert_eq!(EpisodeLog::read_totals(&path).unwrap(), vec![3.0, 4.0]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn malformed_rows_are_reported() {
        let path = temp_path();
        fs::write(&path, "Total Episode Reward\n1.5\noops\n").unwrap();
        let err = EpisodeLog::read_totals(&path).unwrap_err();
        assert!(matches!(err, EpisodeLogError::Malformed { line: 3, .. }));
        assert_eq!(err.to_string(), "line 3: \"oops\" is not a number");

        fs::write(&path, "reward\n1\n").unwrap();
        assert!(matches!(
            EpisodeLog::read_totals(&path),
            Err(EpisodeLogError::MissingHeader { line: 1 })
        ));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn unwritable_path_errors() {
        let path = temp_path().join("nested").join("log.csv");
        assert!(matches!(
            EpisodeLog::open(path),
            Err(EpisodeLogError::Io(_))
        ));
    }

    #[test]
    fn history_statistics() {
        let history = RewardHistory::new(vec![-10.0, 20.0, 5.0, 1.0]);
        assert_eq!(history.count(), 4);
        assert_eq!(history.mean(), Some(4.0));
        assert_eq!(history.min(), Some(-10.0));
        assert_eq!(history.max(), Some(20.0));
        assert_eq!(history.last(), Some(1.0));
        assert_eq!(history.moving_average(2), vec![-10.0, 5.0, 12.5, 3.0]);
        assert!(history.moving_average(0).is_empty());
    }

    #[test]
    fn empty_history() {
        let history = RewardHistory::default();
        assert_eq!(history.mean(), None);
        assert_eq!(history.max(), None);
        assert!(history.moving_average(3).is_empty());
    }
}
