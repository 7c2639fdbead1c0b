use serde::{Deserialize, Serialize};

/// One logged detection event. Many records may share a `local_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Stable identifier of the source video (file name or video id).
    pub local_id: String,
    /// `None` when the log carries the NA sentinel.
    pub species: Option<String>,
    /// Raw date column, `YYYY-MM-DD...`.
    pub date: String,
    pub site: Option<String>,
}

impl ObservationRecord {
    /// Year taken from the prefix of the date column.
    pub fn year(&self) -> Option<i32> {
        self.date
            .trim()
            .split(['-', '/', ' ', 'T'])
            .next()
            .filter(|s| s.len() == 4)
            .and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str) -> ObservationRecord {
        ObservationRecord {
            local_id: "clip_0001.h264".into(),
            species: Some("Great tit".into()),
            date: date.into(),
            site: None,
        }
    }

    #[test]
    fn year_is_date_prefix() {
        assert_eq!(record("2021-05-03").year(), Some(2021));
        assert_eq!(record("2019-11-30 08:12:44").year(), Some(2019));
        assert_eq!(record("2020-01-01T00:00:00").year(), Some(2020));
    }

    #[test]
    fn unparsable_date_has_no_year() {
        assert_eq!(record("").year(), None);
        assert_eq!(record("05-03-21").year(), None);
        assert_eq!(record("unknown").year(), None);
    }
}
