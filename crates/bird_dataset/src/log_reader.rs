//! Tab-separated observation log parsing.

use data_contracts::ObservationRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::types::{CurationError, CurationResult, MalformedRecord};

/// Column names and sentinels of the observation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub id_column: String,
    pub species_column: String,
    pub date_column: String,
    /// Optional; absent columns simply leave `site` empty.
    pub site_column: String,
    /// Species value meaning "not annotated".
    pub na_label: String,
    /// Species value for frames logged with nothing to box.
    pub no_subject_label: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            id_column: "video_id".to_string(),
            species_column: "species".to_string(),
            date_column: "date".to_string(),
            site_column: "feeder".to_string(),
            na_label: "NA".to_string(),
            no_subject_label: "No bird".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    id: usize,
    species: usize,
    date: usize,
    site: Option<usize>,
}

/// Lazy reader yielding one observation (or malformed row) per data line.
///
/// Fields are split on raw tabs; quoting is not interpreted. Lines that are
/// not valid UTF-8 come back as malformed rows and reading continues.
pub struct ObservationReader<R> {
    lines: std::io::Split<R>,
    columns: ColumnIndex,
    na_label: String,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> ObservationReader<R> {
    /// Reads the header line and resolves column positions.
    pub fn new(reader: R, cfg: &LogConfig, source: &Path) -> CurationResult<Self> {
        let mut lines = reader.split(b'\n');
        let header = match lines.next().map(|raw| raw.and_then(into_utf8)) {
            Some(Ok(h)) => h,
            Some(Err(e)) => {
                return Err(CurationError::Io {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
            None => String::new(),
        };
        let names: Vec<&str> = header.trim_end_matches('\r').split('\t').map(str::trim).collect();
        let find = |column: &str| names.iter().position(|n| *n == column);
        let required = |column: &str| {
            find(column).ok_or_else(|| CurationError::MissingColumn {
                path: source.to_path_buf(),
                column: column.to_string(),
            })
        };
        let columns = ColumnIndex {
            id: required(cfg.id_column.as_str())?,
            species: required(cfg.species_column.as_str())?,
            date: required(cfg.date_column.as_str())?,
            site: find(cfg.site_column.as_str()),
        };
        Ok(Self {
            lines,
            columns,
            na_label: cfg.na_label.clone(),
            line_no: 1,
            done: false,
        })
    }

    fn parse_row(&self, line: &str) -> Result<ObservationRecord, MalformedRecord> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let local_id = required_field(&fields, self.columns.id, "local id", self.line_no)?;
        let species = required_field(&fields, self.columns.species, "species", self.line_no)?;
        let date = required_field(&fields, self.columns.date, "date", self.line_no)?;
        let site = self
            .columns
            .site
            .and_then(|i| fields.get(i))
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());
        Ok(ObservationRecord {
            local_id: local_id.to_string(),
            species: (species != self.na_label).then(|| species.to_string()),
            date: date.to_string(),
            site,
        })
    }
}

fn required_field<'a>(
    fields: &[&'a str],
    idx: usize,
    name: &str,
    line: usize,
) -> Result<&'a str, MalformedRecord> {
    match fields.get(idx) {
        Some(v) if !v.is_empty() => Ok(*v),
        _ => Err(MalformedRecord {
            line,
            reason: format!("missing {name}"),
        }),
    }
}

impl<R: BufRead> Iterator for ObservationReader<R> {
    type Item = Result<ObservationRecord, MalformedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => {
                    self.done = true;
                    return Some(Err(MalformedRecord {
                        line: self.line_no + 1,
                        reason: format!("read error: {e}"),
                    }));
                }
            };
            self.line_no += 1;
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(_) => {
                    return Some(Err(MalformedRecord {
                        line: self.line_no,
                        reason: "not valid UTF-8".into(),
                    }))
                }
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_row(line));
        }
    }
}

fn into_utf8(raw: Vec<u8>) -> std::io::Result<String> {
    String::from_utf8(raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Every well-formed record plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ObservationLog {
    pub path: PathBuf,
    pub records: Vec<ObservationRecord>,
    pub malformed: Vec<MalformedRecord>,
}

impl ObservationLog {
    pub fn rows_read(&self) -> usize {
        self.records.len() + self.malformed.len()
    }
}

/// Open and fully read a log; malformed rows are logged and counted.
pub fn read_observations(path: &Path, cfg: &LogConfig) -> CurationResult<ObservationLog> {
    let file = File::open(path).map_err(|e| CurationError::MissingFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = ObservationReader::new(BufReader::new(file), cfg, path)?;
    let mut log = ObservationLog {
        path: path.to_path_buf(),
        ..Default::default()
    };
    for row in reader {
        match row {
            Ok(record) => log.records.push(record),
            Err(bad) => {
                tracing::warn!(log = %path.display(), stage = "read", "skipping row: {bad}");
                log.malformed.push(bad);
            }
        }
    }
    tracing::info!(
        log = %path.display(),
        records = log.records.len(),
        malformed = log.malformed.len(),
        "observation log read"
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(raw: &str) -> CurationResult<ObservationReader<Cursor<Vec<u8>>>> {
        ObservationReader::new(
            Cursor::new(raw.as_bytes().to_vec()),
            &LogConfig::default(),
            Path::new("db_export.txt"),
        )
    }

    #[test]
    fn parses_rows_by_header_name() {
        let raw = "feeder\tdate\tvideo_id\tspecies\n\
                   F1\t2021-04-02\tclip_1.h264\tGreat tit\n\
                   \t2022-01-09\tclip_2.h264\tNA\r\n";
        let rows: Vec<_> = reader(raw).unwrap().collect();
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.local_id, "clip_1.h264");
        assert_eq!(first.species.as_deref(), Some("Great tit"));
        assert_eq!(first.site.as_deref(), Some("F1"));
        assert_eq!(first.year(), Some(2021));
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.species, None);
        assert_eq!(second.site, None);
    }

    #[test]
    fn short_rows_are_malformed_and_reading_continues() {
        let raw = "video_id\tspecies\tdate\n\
                   a\tRobin\n\
                   \n\
                   b\tRobin\t2020-02-02\n";
        let rows: Vec<_> = reader(raw).unwrap().collect();
        assert_eq!(
            rows[0],
            Err(MalformedRecord {
                line: 2,
                reason: "missing date".into()
            })
        );
        assert_eq!(rows[1].as_ref().unwrap().local_id, "b");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn non_utf8_row_does_not_stop_reading() {
        let mut raw = b"video_id\tspecies\tdate\n".to_vec();
        raw.extend_from_slice(b"bad\t\xff\xfe\t2020-01-01\n");
        raw.extend_from_slice(b"good\tWren\t2020-03-03\n");
        let rows: Vec<_> = ObservationReader::new(
            Cursor::new(raw),
            &LogConfig::default(),
            Path::new("db_export.txt"),
        )
        .unwrap()
        .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            Err(MalformedRecord {
                line: 2,
                reason: "not valid UTF-8".into()
            })
        );
        assert_eq!(rows[1].as_ref().unwrap().local_id, "good");
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let err = reader("video_id\tdate\n").err().expect("missing species column");
        assert!(matches!(err, CurationError::MissingColumn { ref column, .. } if column == "species"));
    }

    #[test]
    fn site_column_is_optional() {
        let rows: Vec<_> = reader("video_id\tspecies\tdate\nx\tWren\t2019-01-01\n")
            .unwrap()
            .collect();
        assert_eq!(rows[0].as_ref().unwrap().site, None);
    }
}
