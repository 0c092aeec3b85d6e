pub(crate) use completions::Completions;
pub(crate) use fetch::Fetch;
pub(crate) use hierarchy::Hierarchy;
pub(crate) use init::Init;
pub(crate) use prepare::Prepare;

mod completions;
mod fetch;
mod hierarchy;
mod init;
mod prepare;

/// Raises the log level of the library, if `--verbose` is set.
pub(crate) fn set_verbose(verbose: bool) {
    if verbose {
        log::set_max_level(log::LevelFilter::Info);
    }
}
