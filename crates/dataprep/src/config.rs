use std::collections::{BTreeMap, BTreeSet};
use std::env::current_dir;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;
use crate::error::{bail, DataprepError, DataprepResult};
use crate::fetch::FetchOptions;
use crate::normalize::ValueRules;
use crate::pipeline::{KeepDocuments, PipelineOptions};

/// Dataprep project config.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// The path of the config.
    #[serde(skip)]
    path: PathBuf,

    /// Project metadata.
    pub metadata: Metadata,

    /// Runtime options.
    pub runtime: Option<Runtime>,

    /// Location of the export.
    #[serde(default)]
    pub source: Source,

    /// Options of the record assembly.
    #[serde(default)]
    pub pipeline: Pipeline,

    /// Value rules and vocabularies per field (dotted path).
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    /// The name of the dataset.
    pub name: String,

    /// The version of the dataset.
    pub version: Version,

    /// A short blurb about the dataset.
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authors: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: "".into(),
            version: Version::new(0, 1, 0),
            description: None,
            authors: vec![],
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Runtime {
    /// Number of threads to use. If this options isn't set or a value
    /// of "0" is chosen, the maximum number of available threads
    /// is used.
    pub num_jobs: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub base_url: Url,
    pub target_file: String,

    /// The download directory. Relative paths are resolved against
    /// the directory of the config.
    pub output_dir: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    /// The sub-document of every line that holds the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// The maximum number of records to read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            base_url: Url::parse(defaults::BASE_URL)
                .expect("valid base url"),
            target_file: defaults::TARGET_FILE.into(),
            output_dir: PathBuf::from("data"),
            output_file: None,
            prefix: Some(defaults::PREFIX.into()),
            max_len: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub target_fields: Vec<String>,
    pub keep: KeepDocuments,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_category_support: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_languages: Option<BTreeSet<String>>,

    /// Merge in the default value rules, vocabularies and filters.
    pub use_defaults: bool,

    /// The directory of the token cache. Defaults to the user's cache
    /// directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            target_fields: vec![defaults::Fields::TaxonId.path().into()],
            keep: KeepDocuments::default(),
            min_category_support: None,
            allowed_languages: None,
            use_defaults: true,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(flatten)]
    pub rules: ValueRules,

    /// The SKOS vocabulary with the labels of the field's values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skos_url: Option<String>,
}

impl Config {
    pub const FILENAME: &'static str = "dataprep.toml";

    /// Creates a new default config and sets the file location.
    pub fn create<P>(path: P) -> DataprepResult<Self>
    where
        P: AsRef<Path>,
    {
        Ok(Self {
            path: path.as_ref().into(),
            ..Default::default()
        })
    }

    /// Loads an existing config from a path.
    pub fn from_path<P>(path: P) -> DataprepResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().into();
        let content = fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.path = path;

        Ok(config)
    }

    /// Searches the current directory and its parents for a config.
    pub fn discover() -> DataprepResult<Self> {
        let mut dir = current_dir()?;

        loop {
            let path = dir.join(Self::FILENAME);
            if path.is_file() {
                return Self::from_path(path);
            }

            if !dir.pop() {
                bail!(
                    "not a dataprep project (or any parent directory); \
                     missing `{}`",
                    Self::FILENAME
                );
            }
        }
    }

    /// Saves the config.
    pub fn save(&self) -> DataprepResult<()> {
        let content =
            toml::to_string(self).map_err(DataprepError::other)?;
        let mut out = File::create(&self.path)?;
        out.write_all(content.as_bytes())?;
        Ok(())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory of the config.
    pub fn base_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        }
    }

    fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = crate::fetch::expand_home(path);
        if path.is_absolute() {
            path
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn num_jobs(&self) -> Option<usize> {
        self.runtime.as_ref().and_then(|runtime| runtime.num_jobs)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        let mut options = FetchOptions::new(
            self.source.base_url.clone(),
            self.resolve(&self.source.output_dir),
        );
        options.target_file = self.source.target_file.clone();
        options.output_file = self.source.output_file.clone();
        options
    }

    /// Returns the directory of the token cache. Without a configured
    /// directory, the user's cache directory is used.
    pub fn cache_dir(&self) -> DataprepResult<PathBuf> {
        match self.pipeline.cache_dir {
            Some(ref dir) => Ok(self.resolve(dir)),
            None => crate::fetch::cache_dir(),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        let rules = self
            .fields
            .iter()
            .filter(|(_, field)| !field.rules.is_empty())
            .map(|(name, field)| (name.clone(), field.rules.clone()))
            .collect();

        let skos_urls = self
            .fields
            .iter()
            .filter_map(|(name, field)| {
                field.skos_url.clone().map(|url| (name.clone(), url))
            })
            .collect();

        PipelineOptions {
            target_fields: self.pipeline.target_fields.clone(),
            rules,
            skos_urls,
            use_defaults: self.pipeline.use_defaults,
            allowed_languages: self.pipeline.allowed_languages.clone(),
            keep: self.pipeline.keep,
            min_category_support: self.pipeline.min_category_support,
            prefix: self.source.prefix.clone(),
            max_len: self.source.max_len,
            ..Default::default()
        }
    }
}
