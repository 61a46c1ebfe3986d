use std::path::PathBuf;

pub const DEFAULT_INPUT_DIR: &str = "./data";
pub const DEFAULT_OUTPUT_DIR: &str = "./resources/temperature";

/// Where to read the station files from and where to write the JSON files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    /// `[INPUT_DIR] [OUTPUT_DIR]`, anything missing falls back to the defaults.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Self {
        let mut config = Self::default();
        if let Some(input_dir) = args.next() {
            config.input_dir = input_dir.into();
        }
        if let Some(output_dir) = args.next() {
            config.output_dir = output_dir.into();
        }
        config
    }
}
