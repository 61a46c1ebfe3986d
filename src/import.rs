use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use miette::Diagnostic;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{aggregate, Aggregate, Config, RegionTemperatureRecord};

pub const INDEX_FILE_NAME: &str = "mean_temp.json";
const INPUT_EXTENSION: &str = ".txt";

#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("Could not read input directory `{}`", .path.display())]
    #[diagnostic(code(temperature_import::read_dir))]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not read station file `{}`", .path.display())]
    #[diagnostic(code(temperature_import::read_file))]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not create output directory `{}`", .path.display())]
    #[diagnostic(code(temperature_import::create_dir))]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not write `{}`", .path.display())]
    #[diagnostic(code(temperature_import::write))]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not serialize `{}`", .path.display())]
    #[diagnostic(code(temperature_import::serialize))]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A `<region>.txt` file of the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFile {
    pub region: String,
    pub path: PathBuf,
}

/// Entry of the index file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMean {
    pub region: String,
    #[serde(rename = "meanTemp")]
    pub mean_temp: f64,
}

/// Outcome of a whole directory: the regions with data and the ones without.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    regions: Vec<RegionTemperatureRecord>,
    skipped: Vec<String>,
}

impl Summary {
    pub fn regions(&self) -> &[RegionTemperatureRecord] {
        &self.regions
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn index(&self) -> Vec<RegionMean> {
        self.regions
            .iter()
            .map(|record| RegionMean {
                region: record.region().to_string(),
                mean_temp: record.mean(),
            })
            .collect()
    }
}

impl Extend<Aggregate> for Summary {
    fn extend<T: IntoIterator<Item = Aggregate>>(&mut self, iter: T) {
        for aggregate in iter {
            match aggregate {
                Aggregate::Region(record) => {
                    info!(region = %record.region(), "mean temperature: {}°C", record.mean());
                    self.regions.push(record);
                }
                Aggregate::NoData { region } => {
                    info!(region = %region, "no valid data points found");
                    self.skipped.push(region);
                }
            }
        }
    }
}

impl FromIterator<Aggregate> for Summary {
    fn from_iter<T: IntoIterator<Item = Aggregate>>(iter: T) -> Self {
        let mut summary = Self::default();
        summary.extend(iter);
        summary
    }
}

/// List the station files of `dir`, sorted by region.
pub fn scan_input_dir(dir: &Path) -> Result<Vec<RegionFile>, ImportError> {
    let read_dir_error = |source| ImportError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            warn!("skipping `{}`: file name is not valid UTF-8", path.display());
            continue;
        };

        match file_name.strip_suffix(INPUT_EXTENSION) {
            Some(region) if !region.is_empty() => files.push(RegionFile {
                region: region.to_string(),
                path,
            }),
            _ => debug!("ignoring `{}`", path.display()),
        }
    }

    files.sort_by(|left, right| left.region.cmp(&right.region));
    Ok(files)
}

/// Read a station file. Invalid UTF-8 is replaced, it can never be part of a record anyway.
pub fn read_region(file: &RegionFile) -> Result<String, ImportError> {
    let bytes = fs::read(&file.path).map_err(|source| ImportError::ReadFile {
        path: file.path.clone(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(region = %file.region, "file is not valid UTF-8, decoding it lossily");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Write one file per region into `dir`, then the index.
/// The index is only written once every region it lists has its file.
pub fn write_outputs(summary: &Summary, dir: &Path) -> Result<(), ImportError> {
    fs::create_dir_all(dir).map_err(|source| ImportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for record in summary.regions() {
        let path = dir.join(format!("{}.json", record.region()));
        write_json(&path, record)?;
        debug!(region = %record.region(), "wrote `{}`", path.display());
    }

    write_json(&dir.join(INDEX_FILE_NAME), &summary.index())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ImportError> {
    let write_error = |source| ImportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|source| ImportError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(write_error)
}

/// Aggregate every station file of the input directory and write the results.
/// Nothing is written unless all the files could be read.
pub fn run(config: &Config) -> Result<Summary, ImportError> {
    let files = scan_input_dir(&config.input_dir)?;

    let mut aggregates = Vec::with_capacity(files.len());
    for file in &files {
        info!("processing `{}`...", file.path.display());
        let text = read_region(file)?;
        let result = aggregate(file.region.as_str(), &text);
        if let Aggregate::Region(record) = &result {
            debug!(region = %file.region, "{} valid data points", record.datapoints().len());
        }
        aggregates.push(result);
    }

    let summary: Summary = aggregates.into_iter().collect();
    write_outputs(&summary, &config.output_dir)?;
    Ok(summary)
}
