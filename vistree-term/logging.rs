use std::path::Path;

use anyhow::{
  Context,
  Result,
};
use log::LevelFilter;

fn level_for(verbosity: u8) -> LevelFilter {
  match verbosity {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  }
}

/// Route `log` records to stderr, or to `log_file` when given.
pub fn setup(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
  let dispatch = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .level(level_for(verbosity));

  let dispatch = match log_file {
    Some(path) => {
      let file = fern::log_file(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
      dispatch.chain(file)
    },
    None => dispatch.chain(std::io::stderr()),
  };
  dispatch.apply().context("logger already initialized")?;
  Ok(())
}
