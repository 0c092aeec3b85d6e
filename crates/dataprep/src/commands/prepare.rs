use std::fs::File;
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use dataprep::fetch::fetch;
use dataprep::prelude::*;
use dataprep::progress::ProgressBarBuilder;

use super::set_verbose;

const PBAR_PREPARE: &str = "{spinner} {msg} | elapsed: {elapsed_precise}";

/// Build the dataset and write the documents as CSV.
///
/// Every target field becomes one column, which contains the ids of
/// the document's categories, separated by `|`.
#[derive(Debug, Parser)]
pub(crate) struct Prepare {
    /// Keep only documents with a value for every target field.
    #[arg(long)]
    all_targets: bool,

    /// Drop categories with a support of at most `n` documents.
    #[arg(long, value_name = "n")]
    min_support: Option<usize>,

    /// Read at most `n` records of the export.
    #[arg(long, value_name = "n")]
    max_len: Option<usize>,

    /// Use the given (decompressed) export instead of fetching it.
    #[arg(long, value_name = "filename")]
    input: Option<PathBuf>,

    /// Tokenize the texts and write the bag-of-words vocabulary
    /// (word and document frequency) to `filename`.
    #[arg(long, value_name = "filename")]
    vocab: Option<PathBuf>,

    /// Tokens shorter than `n` characters are dropped.
    #[arg(long, value_name = "n", default_value = "2")]
    min_token_len: usize,

    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write the documents to `filename` instead of `stdout`.
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,
}

fn write_documents<W: Write>(data: &Dataset, wtr: W) -> DataprepResult<()> {
    let mut wtr = csv::Writer::from_writer(wtr);

    let mut header = vec!["id", "text", "redaction", "held_out"];
    header.extend(data.targets().keys().map(String::as_str));
    wtr.write_record(&header)?;

    for idx in 0..data.len() {
        let held_out = data
            .targets()
            .values()
            .next()
            .and_then(|target| target.held_out())
            .map(|held_out| held_out[idx])
            .unwrap_or_default();

        let mut record = vec![
            data.ids()[idx].clone(),
            data.raw_texts()[idx].clone(),
            data.redaction()[idx].to_string(),
            held_out.to_string(),
        ];

        record.extend(
            data.targets()
                .values()
                .map(|target| target.categories_of(idx).join("|")),
        );

        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_vocab(bow: &BowDataset, path: &Path) -> DataprepResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["id", "word", "df"])?;

    let df = bow.document_frequencies();
    for (id, word) in bow.id_to_word().iter() {
        wtr.write_record([id.to_string(), word.clone(), df[*id].to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}

impl Prepare {
    pub(crate) fn execute(self) -> DataprepResult<()> {
        set_verbose(self.verbose);

        let config = Config::discover()?;
        let mut options = config.pipeline_options();
        options.quiet = self.quiet;

        if self.all_targets {
            options.keep = KeepDocuments::AllTargets;
        }

        if self.min_support.is_some() {
            options.min_category_support = self.min_support;
        }

        if self.max_len.is_some() {
            options.max_len = self.max_len;
        }

        let path = match self.input {
            Some(path) => path,
            None => {
                let mut fetch_options = config.fetch_options();
                fetch_options.quiet = self.quiet;
                fetch(&fetch_options)?
            }
        };

        let pbar = ProgressBarBuilder::new(PBAR_PREPARE, self.quiet).build();
        pbar.set_message("Assemble dataset");

        let source = HttpSource::new();
        let lookup = UriLookup::new(&source);
        let data = generate_data(&path, options, &lookup)?;

        if let Some(ref vocab) = self.vocab {
            pbar.set_message("Tokenize texts");
            let tokenizer =
                WordTokenizer::new()?.with_min_len(self.min_token_len);
            let processed = ProcessedDataset::from_data(
                data.clone(),
                &tokenizer,
                Some(config.cache_dir()?.as_path()),
            )?;

            pbar.set_message("Count words");
            let bow = BowDataset::from_processed(processed)?;
            write_vocab(&bow, vocab)?;
        }

        pbar.finish_and_clear();

        let wtr: Box<dyn Write> = match self.output {
            Some(path) => Box::new(File::create(path)?),
            None => Box::new(stdout().lock()),
        };

        write_documents(&data, wtr)
    }
}
