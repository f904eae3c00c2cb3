//! A task runner for the repo based on the [xtask spec](https://github.com/matklad/cargo-xtask).

#![expect(clippy::disallowed_methods)]

use pico_args::Arguments;
use std::path::Path;
use std::{env, fs, process::Command};

#[derive(Debug, Clone, Copy)]
enum Cmd {
  Help,
  Ci,
  Version,
}

struct CmdSpec {
  name: &'static str,
  desc: &'static str,
  options: &'static [(&'static str, &'static str)],
}

impl Cmd {
  const VALUES: [Cmd; 3] = [Cmd::Help, Cmd::Ci, Cmd::Version];

  fn spec(self) -> CmdSpec {
    match self {
      Cmd::Help => CmdSpec { name: "help", desc: "show this help", options: &[] },
      Cmd::Ci => CmdSpec {
        name: "ci",
        desc: "build, check formatting, lint, and test",
        options: &[("--locked", "require the lockfile to be up to date")],
      },
      Cmd::Version => CmdSpec {
        name: "version",
        desc: "set the version of every crate in the workspace",
        options: &[("--set <VERSION>", "the new version, like 1.2.3")],
      },
    }
  }
}

impl std::str::FromStr for Cmd {
  type Err = ();

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Cmd::VALUES.iter().find(|c| c.spec().name == s).copied().ok_or(())
  }
}

fn show_help() {
  println!("usage:");
  println!("  cargo xtask <command> [<options>]");
  println!();
  println!("commands:");
  for c in Cmd::VALUES {
    let spec = c.spec();
    println!("  {}", spec.name);
    println!("    {}", spec.desc);
    if !spec.options.is_empty() {
      println!();
      println!("    options:");
      for (name, desc) in spec.options {
        println!("      {name}");
        println!("        {desc}");
      }
    }
  }
}

fn finish_args(args: Arguments) {
  let args = args.finish();
  assert!(args.is_empty(), "unused args: {args:?}");
}

fn run(c: &mut Command) {
  let mut sp = c.spawn().expect("spawn cmd");
  let w = sp.wait().expect("wait for cmd");
  assert!(w.success());
}

fn cargo(args: &[&str], locked: bool) {
  let mut c = Command::new("cargo");
  c.args(args);
  if locked {
    c.arg("--locked");
  }
  run(&mut c);
}

fn run_ci(locked: bool) {
  cargo(&["build"], locked);
  run(Command::new("cargo").args(["fmt", "--", "--check"]));
  cargo(&["clippy"], locked);
  cargo(&["clippy", "--tests"], locked);
  cargo(&["test"], locked);
}

fn set_version(version: &str) {
  let parts: Vec<_> = version.split('.').collect();
  assert_eq!(parts.len(), 3, "version must have 3 dot-separated parts");
  for part in parts {
    part.parse::<u16>().expect("parse as u16");
  }
  let path = "Cargo.toml";
  let contents = fs::read_to_string(path).expect("read Cargo.toml");
  let mut out = String::with_capacity(contents.len());
  for line in contents.lines() {
    if line.strip_prefix("version = \"").and_then(|x| x.strip_suffix('"')).is_some() {
      out.push_str("version = \"");
      out.push_str(version);
      out.push('"');
    } else {
      out.push_str(line);
    }
    out.push('\n');
  }
  fs::write(path, out).expect("write Cargo.toml");
}

fn main() {
  let mut args = Arguments::from_env();
  if args.contains(["-h", "--help"]) {
    show_help();
    return;
  }
  let Some(cmd) = args.subcommand().expect("subcommand") else {
    show_help();
    return;
  };
  let cmd = cmd.parse::<Cmd>().expect("parse cmd");
  let dir = Path::new(env!("CARGO_MANIFEST_DIR")).parent().expect("parent");
  env::set_current_dir(dir).expect("set dir");
  match cmd {
    Cmd::Help => show_help(),
    Cmd::Ci => {
      let locked = args.contains("--locked");
      finish_args(args);
      run_ci(locked);
    }
    Cmd::Version => {
      let version: String = args.opt_value_from_str("--set").expect("no parse").expect("no --set");
      finish_args(args);
      set_version(version.as_str());
    }
  }
}
