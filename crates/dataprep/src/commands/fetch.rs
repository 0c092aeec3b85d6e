use std::path::PathBuf;

use clap::Parser;
use dataprep::fetch::{fetch, Auth};
use dataprep::prelude::*;

use super::set_verbose;

/// Download (and decompress) the export.
#[derive(Debug, Parser)]
pub(crate) struct Fetch {
    /// The user name for basic authentication.
    #[arg(long, env = "DATAPREP_USERNAME", requires = "password")]
    username: Option<String>,

    /// The password for basic authentication.
    #[arg(
        long,
        env = "DATAPREP_PASSWORD",
        hide_env_values = true,
        requires = "username"
    )]
    password: Option<String>,

    /// The already encoded `username:password` pair. This option
    /// conflicts with the `--username` option.
    #[arg(
        long,
        env = "DATAPREP_AUTH",
        hide_env_values = true,
        conflicts_with = "username"
    )]
    encoded_auth: Option<String>,

    /// Download again, even if the export exists.
    #[arg(short, long)]
    force: bool,

    /// Keep the compressed archive.
    #[arg(long)]
    keep_archive: bool,

    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Fetch {
    fn auth(&self) -> Option<Auth> {
        match (&self.username, &self.password, &self.encoded_auth) {
            (_, _, Some(encoded)) => Some(Auth::Encoded(encoded.clone())),
            (Some(username), Some(password), None) => Some(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub(crate) fn execute(self) -> DataprepResult<()> {
        set_verbose(self.verbose);

        let config = Config::discover()?;
        let mut options = config.fetch_options();
        options.auth = self.auth();
        options.skip_if_exists = !self.force;
        options.delete_compressed_archive = !self.keep_archive;
        options.quiet = self.quiet;

        let path: PathBuf = fetch(&options)?;
        if !self.quiet {
            eprintln!("{}", path.display());
        }

        Ok(())
    }
}
