use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// The original dexdump surface, minus what this tool never grew:
/// `-h` is taken by section headers, so the help flag is long-only.
#[derive(Parser, Debug)]
#[command(
    name = "dexgraph",
    about = "Reconstructs per-method control-flow graphs from DEX files",
    version,
    disable_help_flag = true,
    arg_required_else_help = true
)]
pub struct Args {
    /// Input DEX files, or archives containing them.
    #[arg(value_name = "DEX FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Verify the checksum and exit.
    #[arg(short = 'c', long = "checksum-only", conflicts_with = "ignore_bad_checksum")]
    pub checksum_only: bool,

    /// Disassemble code sections and emit per-method graphs.
    #[arg(short = 'd', long = "disassemble")]
    pub disassemble: bool,

    /// Display summary information from the file header.
    #[arg(short = 'f', long = "file-header")]
    pub show_file_header: bool,

    /// Display section headers.
    #[arg(short = 'h', long = "section-headers")]
    pub show_section_headers: bool,

    /// Continue when a checksum does not match.
    #[arg(short = 'i', long = "ignore-bad-checksum")]
    pub ignore_bad_checksum: bool,

    /// Listing layout.
    #[arg(short = 'l', long = "layout", value_enum, default_value_t = Layout::Plain)]
    pub layout: Layout,

    /// Dump register maps (and nothing else).
    #[arg(short = 'm', long = "register-maps")]
    pub register_maps: bool,

    /// Write the first DEX extracted from an archive to this file.
    #[arg(short = 't', long = "temp-file", value_name = "FILE")]
    pub temp_file: Option<PathBuf>,

    /// Print help.
    #[arg(long = "help", action = ArgAction::HelpLong)]
    help: Option<bool>,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum Layout {
    #[default]
    Plain,
    Xml,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["dexgraph"];
        argv.extend(args);
        Args::try_parse_from(&argv).expect("parse args")
    }

    #[test]
    fn defaults_are_off() {
        let args = parse(&["classes.dex"]);
        assert_eq!(args.files, vec![PathBuf::from("classes.dex")]);
        assert!(!args.checksum_only);
        assert!(!args.disassemble);
        assert_eq!(args.layout, Layout::Plain);
        assert!(args.temp_file.is_none());
    }

    #[test]
    fn short_flags_map_like_dexdump() {
        let args = parse(&["-d", "-f", "-h", "-l", "xml", "-t", "/tmp/x.dex", "a.dex", "b.dex"]);
        assert!(args.disassemble);
        assert!(args.show_file_header);
        assert!(args.show_section_headers);
        assert_eq!(args.layout, Layout::Xml);
        assert_eq!(args.temp_file, Some(PathBuf::from("/tmp/x.dex")));
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn checksum_only_conflicts_with_ignore() {
        assert!(Args::try_parse_from(["dexgraph", "-c", "-i", "a.dex"]).is_err());
    }

    #[test]
    fn a_file_is_required() {
        assert!(Args::try_parse_from(["dexgraph", "-d"]).is_err());
    }
}
