use std::ffi::OsStr;
use std::path::PathBuf;
use std::{env, fs};

use clap::Parser;
use dataprep::prelude::*;
use semver::Version;

use super::set_verbose;

const GITIGNORE: &str = "# dataprep\n/data\n/cache\n";

/// Initialize a new or re-initialize an existing dataprep project.
#[derive(Debug, Parser)]
pub(crate) struct Init {
    /// The name of the dataset.
    #[arg(short, long)]
    name: Option<String>,

    /// The version of the dataset.
    #[arg(long, default_value = "0.1.0")]
    version: Version,

    /// A short blurb about the dataset.
    #[arg(short, long)]
    description: Option<String>,

    /// A list of people or organizations, which are considered as the
    /// authors of the dataset.
    #[arg(short, long = "author")]
    authors: Vec<String>,

    /// The (dotted) paths of the target fields. If not given, the
    /// discipline field is used.
    #[arg(short, long = "target")]
    targets: Vec<String>,

    /// Whether to overwrite config with default values or not.
    #[arg(short, long)]
    force: bool,

    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// The location of the project.
    #[arg(default_value = ".")]
    path: PathBuf,
}

impl Init {
    pub(crate) fn execute(self) -> DataprepResult<()> {
        set_verbose(self.verbose);

        let root_dir = env::current_dir()?.join(self.path);
        let config = root_dir.join(Config::FILENAME);

        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
            log::info!("initialize new project in {}", root_dir.display());
        } else {
            log::info!(
                "re-initialize existing project in {}",
                root_dir.display()
            );
        }

        if !root_dir.join(".gitignore").is_file() {
            fs::write(root_dir.join(".gitignore"), GITIGNORE)?;
        }

        if !config.exists() || self.force {
            let mut config = Config::create(config)?;
            config.metadata.description = self.description;
            config.metadata.authors = self.authors;
            config.metadata.version = self.version;
            config.metadata.name = self.name.unwrap_or(
                root_dir
                    .file_name()
                    .and_then(OsStr::to_str)
                    .unwrap_or_default()
                    .to_string(),
            );

            if !self.targets.is_empty() {
                config.pipeline.target_fields = self.targets;
            }

            config.pipeline.cache_dir = Some(PathBuf::from("cache"));
            config.save()?;
        }

        Ok(())
    }
}
