use std::str::FromStr;

use logos::Logos;
use serde::Serialize;
use thiserror::Error;
use time::{Date, Month};

pub mod config;
pub mod import;
pub mod logging;

pub use config::Config;
pub use import::{run, ImportError, RegionMean, Summary};

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Ignore this regex pattern between tokens
enum Token {
    #[regex(r"-?[0-9]+")]
    Number,
    #[token(",")]
    Comma,
    #[token("\n")]
    Crlf,
}

/// Number of comma separated fields of a record:
/// `STAID, SOUID, DATE, TG, Q_TG`
const FIELDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityCode {
    Valid,
    Suspect,
    Missing,
    Other(u8),
}

// Only the exact codes count, `00` is not `0`
impl FromStr for QualityCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::Valid),
            "1" => Ok(Self::Suspect),
            "9" => Ok(Self::Missing),
            s => s
                .parse()
                .map(Self::Other)
                .map_err(|_| format!("Unknown quality code: {s}")),
        }
    }
}

impl QualityCode {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// One line of a station file, before any quality filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    // Identifiers are kept as written, whatever their width
    pub station_id: String,
    pub source_id: String,
    // YYYYMMDD, kept as written in the file
    pub date: String,
    // Mean temperature in 0.1 °C
    pub tenths: i64,
    pub quality: QualityCode,
}

impl RawRecord {
    /// Iterate over every record found in `text`. Anything that doesn't look
    /// like five comma separated integers on a single line is skipped.
    pub fn scan(text: &str) -> RawRecords<'_> {
        RawRecords {
            lexer: Token::lexer(text),
            fields: Vec::with_capacity(FIELDS),
            expect_comma: false,
        }
    }

    fn from_fields(fields: &[&str]) -> Option<Self> {
        let [station_id, source_id, date, tenths, quality] = fields else {
            return None;
        };

        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            station_id: station_id.to_string(),
            source_id: source_id.to_string(),
            date: date.to_string(),
            tenths: tenths.parse().ok()?,
            quality: quality.parse().ok()?,
        })
    }

    pub fn temperature(&self) -> f64 {
        self.tenths as f64 / 10.0
    }
}

pub struct RawRecords<'a> {
    lexer: logos::Lexer<'a, Token>,
    fields: Vec<&'a str>,
    expect_comma: bool,
}

impl RawRecords<'_> {
    fn reset(&mut self) {
        self.fields.clear();
        self.expect_comma = false;
    }
}

impl<'a> Iterator for RawRecords<'a> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(token) = self.lexer.next() {
            match token {
                Ok(Token::Number) => {
                    // Two numbers without a comma in between: a record may only start here
                    if self.expect_comma {
                        self.fields.clear();
                    }
                    self.fields.push(self.lexer.slice());

                    if self.fields.len() < FIELDS {
                        self.expect_comma = true;
                        continue;
                    }

                    let record = RawRecord::from_fields(&self.fields);
                    self.reset();
                    if record.is_some() {
                        return record;
                    }
                }
                Ok(Token::Comma) if self.expect_comma => self.expect_comma = false,
                Ok(Token::Comma) | Ok(Token::Crlf) | Err(()) => self.reset(),
            }
        }
        None
    }
}

#[derive(Debug, Error)]
pub enum DateError {
    #[error("Bad date: {0}. Expecting YYYYMMDD")]
    BadFormat(String),
    #[error("Invalid date: {0}")]
    InvalidDate(#[from] time::error::ComponentRange),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datapoint {
    pub date: String,
    pub temp: f64,
}

impl Datapoint {
    pub fn calendar_date(&self) -> Result<Date, DateError> {
        let bad_format = || DateError::BadFormat(self.date.clone());
        if self.date.len() != 8 || !self.date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad_format());
        }

        let year = self.date[0..4].parse().map_err(|_| bad_format())?;
        let month: u8 = self.date[4..6].parse().map_err(|_| bad_format())?;
        let day = self.date[6..8].parse().map_err(|_| bad_format())?;

        Ok(Date::from_calendar_date(year, Month::try_from(month)?, day)?)
    }
}

impl From<&RawRecord> for Datapoint {
    fn from(record: &RawRecord) -> Self {
        Self {
            date: record.date.clone(),
            temp: record.temperature(),
        }
    }
}

/// Every valid datapoint of a region, in the order of the source file.
/// Can only be built by [`aggregate`], so there is always at least one datapoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTemperatureRecord {
    region: String,
    mean: f64,
    datapoints: Vec<Datapoint>,
}

impl RegionTemperatureRecord {
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn datapoints(&self) -> &[Datapoint] {
        &self.datapoints
    }

    /// One temperature per day of year, as used to drive the generators.
    ///
    /// Leap days are dropped. On each 31 December the series stops when
    /// fewer than 365 datapoints are left, counted from the total minus the
    /// days already used before this one, so only full years are kept.
    /// Datapoints without a real calendar date are ignored.
    pub fn daily_profile(&self) -> Vec<f64> {
        let mut profile = Vec::new();
        let mut used = 0;

        for datapoint in &self.datapoints {
            let Ok(date) = datapoint.calendar_date() else {
                continue;
            };
            if date.month() == Month::February && date.day() == 29 {
                continue;
            }

            profile.push(datapoint.temp);

            if date.month() == Month::December
                && date.day() == 31
                && self.datapoints.len() - used < 365
            {
                break;
            }
            used += 1;
        }

        profile
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Region(RegionTemperatureRecord),
    NoData { region: String },
}

impl Aggregate {
    pub fn region(&self) -> &str {
        match self {
            Self::Region(record) => record.region(),
            Self::NoData { region } => region,
        }
    }

    pub fn record(self) -> Option<RegionTemperatureRecord> {
        match self {
            Self::Region(record) => Some(record),
            Self::NoData { .. } => None,
        }
    }
}

/// Compute the mean temperature of a region from the raw content of its file.
/// Only the records flagged as valid are kept.
pub fn aggregate(region: impl Into<String>, text: &str) -> Aggregate {
    let region = region.into();
    let mut sum = 0.0;
    let mut datapoints = Vec::new();

    for record in RawRecord::scan(text).filter(|record| record.quality.is_valid()) {
        let datapoint = Datapoint::from(&record);
        sum += datapoint.temp;
        datapoints.push(datapoint);
    }

    if datapoints.is_empty() {
        return Aggregate::NoData { region };
    }

    Aggregate::Region(RegionTemperatureRecord {
        region,
        mean: sum / datapoints.len() as f64,
        datapoints,
    })
}
