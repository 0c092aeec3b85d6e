use std::fs::File;
use std::io::{stdout, Write};
use std::path::PathBuf;

use clap::Parser;
use dataprep::labels::hierarchy_from_skos;
use dataprep::prelude::*;

use super::set_verbose;

/// Print the hierarchy of a SKOS vocabulary as CSV.
///
/// Every concept with a label becomes one row (key, name, parent).
#[derive(Debug, Parser)]
pub(crate) struct Hierarchy {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream.
    #[arg(short, long)]
    verbose: bool,

    /// Write output to `filename` instead of `stdout`.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,

    /// The URL of the vocabulary. Either a URL or the (dotted) path of
    /// a field with a configured vocabulary.
    #[arg(value_name = "vocab")]
    vocab: String,
}

impl Hierarchy {
    fn url(&self) -> String {
        if self.vocab.starts_with("http://")
            || self.vocab.starts_with("https://")
        {
            return self.vocab.clone();
        }

        let mut urls = dataprep::defaults::skos_urls();
        if let Ok(config) = Config::discover() {
            urls.extend(config.pipeline_options().effective_skos_urls());
        }

        urls.remove(&self.vocab).unwrap_or_else(|| self.vocab.clone())
    }

    pub(crate) fn execute(self) -> DataprepResult<()> {
        set_verbose(self.verbose);

        let entries = hierarchy_from_skos(&HttpSource::new(), &self.url())?;
        log::info!("{} concepts", entries.len());

        let out: Box<dyn Write> = match self.output {
            Some(path) => Box::new(File::create(path)?),
            None => Box::new(stdout().lock()),
        };

        let mut wtr = csv::Writer::from_writer(out);
        for entry in entries.iter() {
            wtr.serialize(entry)?;
        }

        wtr.flush()?;
        Ok(())
    }
}
