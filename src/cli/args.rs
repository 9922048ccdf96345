//! CLI argument definitions using clap derive
//!
//! gr mirrors `go run`, so its flags are Go-style: a single dash is as good
//! as two, values may follow `=` or come as the next argument, and parsing
//! stops at the package. [`normalize`] rewrites the command line into the
//! shape clap expects before it is parsed.

use crate::config::CONFIG_ENV;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Boolean flags forwarded to `go build`, in emission order
pub const BOOL_FLAGS: [&str; 7] = ["race", "msan", "asan", "cover", "v", "work", "x"];

/// Value flags forwarded to `go build`, in emission order
pub const VALUE_FLAGS: [&str; 5] = ["covermode", "coverpkg", "asmflags", "gcflags", "ldflags"];

/// `go build` flags that make no sense for a cached `go run`
pub const UNSUPPORTED_FLAGS: [&str; 19] = [
    "a",
    "C",
    "n",
    "p",
    "buildmode",
    "buildvcs",
    "compiler",
    "gccgoflags",
    "installsuffix",
    "linkshared",
    "mod",
    "modcacherw",
    "modfile",
    "overlay",
    "pgo",
    "pkgdir",
    "tags",
    "trimpath",
    "toolexec",
];

/// Flags of gr itself
const OWN_BOOL_FLAGS: [&str; 1] = ["debug"];
const OWN_VALUE_FLAGS: [&str; 1] = ["config"];

/// gr - cached `go run`
///
/// Builds a Go package once and reuses the executable for as long as its
/// sources, build flags and build environment stay the same.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gr")]
#[command(version, about, long_about = None)]
#[command(override_usage = "gr [go build flags] <PACKAGE> [ARGUMENTS]...")]
pub struct Cli {
    /// As in 'go build'
    #[arg(long)]
    pub race: bool,

    /// As in 'go build'
    #[arg(long)]
    pub msan: bool,

    /// As in 'go build'
    #[arg(long)]
    pub asan: bool,

    /// As in 'go build'
    #[arg(long)]
    pub cover: bool,

    /// As in 'go build'
    #[arg(long = "v")]
    pub verbose: bool,

    /// As in 'go build'
    #[arg(long)]
    pub work: bool,

    /// As in 'go build'
    #[arg(long = "x")]
    pub print_commands: bool,

    /// As in 'go build'
    #[arg(long, value_name = "MODE")]
    pub covermode: Option<String>,

    /// As in 'go build'
    #[arg(long, value_name = "PATTERNS")]
    pub coverpkg: Option<String>,

    /// As in 'go build'
    #[arg(long, value_name = "FLAGS")]
    pub asmflags: Option<String>,

    /// As in 'go build'
    #[arg(long, value_name = "FLAGS")]
    pub gcflags: Option<String>,

    /// As in 'go build'
    #[arg(long, value_name = "FLAGS")]
    pub ldflags: Option<String>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Configuration file path
    #[arg(long, env = CONFIG_ENV, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory of the package to run
    #[arg(value_name = "PACKAGE")]
    pub package: PathBuf,

    /// Arguments passed to the program
    #[arg(skip)]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse the process command line, exiting with a usage error on bad input
    pub fn parse_go_style() -> Self {
        Self::parse_go_style_from(std::env::args())
    }

    /// Parse a full command line (program name first)
    pub fn parse_go_style_from<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        match Self::try_parse_go_style_from(args) {
            Ok(cli) => cli,
            Err(e) => e.exit(),
        }
    }

    /// Like [`parse_go_style_from`](Self::parse_go_style_from), returning
    /// usage errors instead of exiting
    pub fn try_parse_go_style_from<I>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        let (clap_args, rest) =
            normalize(args).map_err(|msg| Self::command().error(ErrorKind::UnknownArgument, msg))?;
        let mut cli = Self::try_parse_from(clap_args)?;
        cli.args = rest;
        Ok(cli)
    }

    /// Flags for `go build`, in a fixed order. Empty values are dropped.
    pub fn compiler_flags(&self) -> Vec<String> {
        let bools = [
            ("race", self.race),
            ("msan", self.msan),
            ("asan", self.asan),
            ("cover", self.cover),
            ("v", self.verbose),
            ("work", self.work),
            ("x", self.print_commands),
        ];
        let values = [
            ("covermode", &self.covermode),
            ("coverpkg", &self.coverpkg),
            ("asmflags", &self.asmflags),
            ("gcflags", &self.gcflags),
            ("ldflags", &self.ldflags),
        ];

        let mut flags: Vec<String> = bools
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| format!("-{name}"))
            .collect();
        for (name, value) in values {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                flags.push(format!("-{name}"));
                flags.push(value.to_string());
            }
        }
        flags
    }
}

/// Split a Go-style command line into arguments for clap (program name,
/// flags, package) and the program's own arguments.
///
/// Unsupported `go build` flags and malformed boolean values are rejected
/// here; anything else unknown is left for clap to report.
pub fn normalize<I>(args: I) -> Result<(Vec<String>, Vec<String>), String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut out: Vec<String> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        if arg == "--" {
            out.push(arg);
            out.extend(args.next());
            break;
        }

        let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')).filter(|f| !f.is_empty())
        else {
            // The package; everything after it belongs to the program.
            out.push(arg);
            break;
        };

        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (flag, None),
        };

        if UNSUPPORTED_FLAGS.contains(&name) {
            return Err(format!("flag -{name}: this compilation flag is not (yet) supported by gr"));
        }

        match name {
            "h" | "help" => out.push("--help".to_string()),
            _ if is_bool_flag(name) => match value.map(parse_bool).transpose() {
                Ok(Some(false)) => {}
                Ok(_) => out.push(format!("--{name}")),
                Err(()) => {
                    return Err(format!(
                        "invalid boolean value {:?} for -{name}",
                        value.unwrap_or_default()
                    ))
                }
            },
            _ if is_value_flag(name) => match value {
                Some(value) => out.push(format!("--{name}={value}")),
                None => match args.next() {
                    Some(value) => out.push(format!("--{name}={value}")),
                    None => out.push(format!("--{name}")),
                },
            },
            _ => out.push(format!("--{flag}")),
        }
    }

    Ok((out, args.collect()))
}

fn is_bool_flag(name: &str) -> bool {
    BOOL_FLAGS.contains(&name) || OWN_BOOL_FLAGS.contains(&name)
}

fn is_value_flag(name: &str) -> bool {
    VALUE_FLAGS.contains(&name) || OWN_VALUE_FLAGS.contains(&name)
}

/// Boolean flag values as Go's `strconv.ParseBool` accepts them
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("gr")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_go_style_from(argv(args)).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn package_and_program_arguments() {
        let cli = parse(&["./cmd/hello", "-v", "--race", "x"]);
        assert_eq!(cli.package, PathBuf::from("./cmd/hello"));
        assert_eq!(cli.args, vec!["-v", "--race", "x"]);
        assert!(cli.compiler_flags().is_empty());
    }

    #[test]
    fn go_style_flags() {
        let cli = parse(&["-race", "--v", "-ldflags", "-s -w", "-gcflags=all=-N", "-x", "pkg", "arg"]);
        assert_eq!(
            cli.compiler_flags(),
            vec!["-race", "-v", "-x", "-gcflags", "all=-N", "-ldflags", "-s -w"]
        );
        assert_eq!(cli.args, vec!["arg"]);
    }

    #[test]
    fn flag_emission_order_is_fixed() {
        let cli = parse(&["-x", "-work", "-cover", "-asan", "-msan", "-race", "-v", "pkg"]);
        assert_eq!(
            cli.compiler_flags(),
            vec!["-race", "-msan", "-asan", "-cover", "-v", "-work", "-x"]
        );
    }

    #[test]
    fn empty_values_are_not_forwarded() {
        let cli = parse(&["-ldflags=", "-covermode", "", "pkg"]);
        assert!(cli.compiler_flags().is_empty());
    }

    #[test]
    fn boolean_values() {
        let cli = parse(&["-race=true", "-cover=false", "pkg"]);
        assert_eq!(cli.compiler_flags(), vec!["-race"]);
        assert!(Cli::try_parse_go_style_from(argv(&["-race=maybe", "pkg"])).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let cli = parse(&["-debug", "--", "-odd-package", "-race"]);
        assert!(cli.debug);
        assert_eq!(cli.package, PathBuf::from("-odd-package"));
        assert_eq!(cli.args, vec!["-race"]);
        assert!(!cli.race);
    }

    #[test]
    fn own_flags() {
        let cli = parse(&["-debug", "-config", "/tmp/gr.toml", "pkg"]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gr.toml")));
    }

    #[test]
    fn unsupported_flags_are_rejected() {
        for flag in ["-tags=x", "-trimpath", "--mod=vendor", "-C", "-a"] {
            let err = Cli::try_parse_go_style_from(argv(&[flag, "pkg"])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownArgument, "{flag}");
            assert!(err.to_string().contains("not (yet) supported"), "{flag}");
        }
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = Cli::try_parse_go_style_from(argv(&["-bogus", "pkg"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn missing_package_is_a_usage_error() {
        let err = Cli::try_parse_go_style_from(argv(&["-race"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }
}
