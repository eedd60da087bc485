use crate::chord::types::{Digest, RoutingInfo};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Outcome of one live lookup round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundRecord {
    pub search_digest: Digest,
    pub resolved: RoutingInfo,
    /// `None` when the round timed out.
    pub round_trip: Option<Duration>,
}

impl RoundRecord {
    pub fn is_miss(&self) -> bool {
        self.resolved.is_empty()
    }

    /// `search_digest,resolved_digest,resolved_address,round_trip_seconds`
    pub fn to_csv_line(&self) -> String {
        let round_trip = self
            .round_trip
            .map(|rtt| rtt.as_secs_f64().to_string())
            .unwrap_or_default();
        format!(
            "{},{},{},{}",
            self.search_digest, self.resolved.digest, self.resolved.address, round_trip
        )
    }
}

/// Append-only log of round records, one CSV line each.
pub struct RoundLog<W: Write> {
    writer: W,
    lines: usize,
}

impl RoundLog<BufWriter<File>> {
    /// Creates (or truncates) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RoundLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub fn append(&mut self, record: &RoundRecord) -> io::Result<()> {
        writeln!(self.writer, "{}", record.to_csv_line())?;
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answered_rounds_carry_the_round_trip() {
        let record = RoundRecord {
            search_digest: 150,
            resolved: RoutingInfo::new("127.0.0.1:7005", 150),
            round_trip: Some(Duration::from_millis(250)),
        };
        assert_eq!(record.to_csv_line(), "150,150,127.0.0.1:7005,0.25");
        assert!(!record.is_miss());
    }

    #[test]
    fn missed_rounds_leave_the_round_trip_blank() {
        let record = RoundRecord {
            search_digest: 17,
            resolved: RoutingInfo::empty(),
            round_trip: None,
        };
        assert_eq!(record.to_csv_line(), "17,0,,");
        assert!(record.is_miss());
    }

    #[test]
    fn appends_one_line_per_round() {
        let mut log = RoundLog::new(Vec::new());
        for digest in [1, 2, 3] {
            log.append(&RoundRecord {
                search_digest: digest,
                resolved: RoutingInfo::empty(),
                round_trip: None,
            })
            .unwrap();
        }
        assert_eq!(log.lines(), 3);
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(text, "1,0,,\n2,0,,\n3,0,,\n");
    }
}
