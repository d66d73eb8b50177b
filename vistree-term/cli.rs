use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
};

/// A scripted checkbox click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Click {
  pub id: String,
  pub on: bool,
}

#[derive(Debug, Parser)]
#[command(
  name = "vistree",
  about = "Resolve visibility checkboxes of a model hierarchy",
  version
)]
pub struct Cli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  pub verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE")]
  pub log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  pub config_file: Option<PathBuf>,

  /// How long to wait for statuses after each step
  #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 5000)]
  pub timeout_ms: u64,

  /// Click a node checkbox, applied in the given order
  #[arg(long = "click", value_name = "ID=on|off", value_parser = parse_click)]
  pub clicks: Vec<Click>,

  /// Hierarchy file
  #[arg(value_name = "TREE")]
  pub tree: PathBuf,
}

fn parse_click(arg: &str) -> Result<Click, String> {
  let (id, state) = arg
    .rsplit_once('=')
    .ok_or_else(|| format!("expected ID=on|off, got {arg:?}"))?;
  if id.is_empty() {
    return Err("node id must not be empty".to_string());
  }
  let on = match state {
    "on" | "show" | "true" => true,
    "off" | "hide" | "false" => false,
    other => return Err(format!("unknown checkbox state {other:?}, expected on or off")),
  };
  Ok(Click {
    id: id.to_string(),
    on,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clicks_keep_order() {
    let cli = Cli::try_parse_from([
      "vistree",
      "-vv",
      "--click",
      "level-2=off",
      "--click",
      "level-2=on",
      "tree.toml",
    ])
    .unwrap();

    assert_eq!(cli.verbosity, 2);
    assert_eq!(cli.tree, PathBuf::from("tree.toml"));
    assert_eq!(cli.clicks, vec![
      Click {
        id: "level-2".into(),
        on: false,
      },
      Click {
        id: "level-2".into(),
        on: true,
      },
    ]);
  }

  #[test]
  fn click_id_may_contain_equals() {
    let click = parse_click("a=b=hide").unwrap();
    assert_eq!(click.id, "a=b");
    assert!(!click.on);
  }

  #[test]
  fn bad_clicks_are_rejected() {
    assert!(parse_click("level-1").is_err());
    assert!(parse_click("=on").is_err());
    assert!(parse_click("level-1=maybe").is_err());
  }

  #[test]
  fn tree_is_required() {
    assert!(Cli::try_parse_from(["vistree"]).is_err());
  }
}
