//! Command-line surface: argument model and command handlers.
//!
//! Handlers never print. Each returns the text destined for stdout, and the
//! binary decides how to emit it and which exit code a failure maps to.

use crate::diff::{self, DiffOptions};
use crate::opc::{ErrorKind, OpcError, Package};
use crate::presenter::ItemPresenter;
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "opc-diag",
    version,
    about = "Browse, diff and edit Office Open XML (OPC) packages"
)]
pub struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the pretty-printed XML of one package item
    Browse(BrowseArgs),
    /// Compare every item of two packages
    Diff(DiffArgs),
    /// Compare one item between two packages
    DiffItem(DiffItemArgs),
    /// Write a package's items as files under a directory
    Extract(ExtractArgs),
    /// Zip an expanded package directory into a package file
    Repackage(RepackageArgs),
    /// Copy one item from a source package into a target package
    Substitute(SubstituteArgs),
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Package file or expanded package directory
    pub package: PathBuf,

    /// Uri of the item, or any trailing part of it (e.g. core.xml)
    pub uri: String,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ContextArgs {
    /// Unchanged lines of context around each change
    #[arg(short = 'U', long = "context", value_name = "N", default_value_t = 3)]
    pub context_lines: usize,
}

impl From<ContextArgs> for DiffOptions {
    fn from(args: ContextArgs) -> Self {
        DiffOptions {
            context_lines: args.context_lines,
        }
    }
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    pub package_a: PathBuf,
    pub package_b: PathBuf,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args, Debug)]
pub struct DiffItemArgs {
    pub package_a: PathBuf,
    pub package_b: PathBuf,

    /// Uri of the item, or any trailing part of it
    pub uri: String,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Package file to extract
    pub package: PathBuf,

    /// Directory to write items into; created if absent
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct RepackageArgs {
    /// Expanded package directory
    pub dir: PathBuf,

    /// Package file to write
    pub package: PathBuf,
}

#[derive(Args, Debug)]
pub struct SubstituteArgs {
    /// Uri of the item to copy, or any trailing part of it
    pub uri: String,

    /// Package to take the item from
    pub source: PathBuf,

    /// Package whose item is replaced
    pub target: PathBuf,

    /// Where to save the resulting package
    pub output: PathBuf,
}

/// Run a command and return its stdout text.
pub fn run(command: &Command) -> Result<String> {
    match command {
        Command::Browse(args) => browse(args),
        Command::Diff(args) => diff_packages(args),
        Command::DiffItem(args) => diff_item(args),
        Command::Extract(args) => extract(args),
        Command::Repackage(args) => repackage(args),
        Command::Substitute(args) => substitute(args),
    }
}

/// Process exit code for a failed command.
///
/// 2 for a missing or ambiguous item, 3 for malformed XML, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<OpcError>())
        .map(OpcError::kind);
    match kind {
        Some(ErrorKind::NotFound | ErrorKind::Ambiguous) => 2,
        Some(ErrorKind::MalformedXml) => 3,
        Some(ErrorKind::Io) | None => 1,
    }
}

fn read_package(path: &Path) -> Result<Package> {
    Package::read(path).with_context(|| format!("failed to read package {}", path.display()))
}

fn browse(args: &BrowseArgs) -> Result<String> {
    let package = read_package(&args.package)?;
    let item = package.find_item_by_uri_tail(&args.uri)?;
    let text = ItemPresenter::new(item).text()?;
    Ok(text)
}

fn diff_packages(args: &DiffArgs) -> Result<String> {
    let package_a = read_package(&args.package_a)?;
    let package_b = read_package(&args.package_b)?;
    let report = diff::diff(&package_a, &package_b, &args.context.into())?;
    Ok(report.to_string())
}

fn diff_item(args: &DiffItemArgs) -> Result<String> {
    let package_a = read_package(&args.package_a)?;
    let package_b = read_package(&args.package_b)?;
    let item_diff = diff::diff_item(&package_a, &package_b, &args.uri, &args.context.into())?;
    Ok(format!("{}:\n{}", item_diff.uri, item_diff))
}

fn extract(args: &ExtractArgs) -> Result<String> {
    let package = read_package(&args.package)?;
    package
        .save_to_dir(&args.dir)
        .with_context(|| format!("failed to extract to {}", args.dir.display()))?;
    info!(items = package.len(), dir = %args.dir.display(), "extracted package");
    Ok(String::new())
}

fn repackage(args: &RepackageArgs) -> Result<String> {
    let package = read_package(&args.dir)?;
    package
        .save(&args.package)
        .with_context(|| format!("failed to write package {}", args.package.display()))?;
    info!(items = package.len(), package = %args.package.display(), "repackaged directory");
    Ok(String::new())
}

fn substitute(args: &SubstituteArgs) -> Result<String> {
    let source = read_package(&args.source)?;
    let mut target = read_package(&args.target)?;

    let item = source.find_item_by_uri_tail(&args.uri)?;
    target.substitute_item(item)?;
    target
        .save(&args.output)
        .with_context(|| format!("failed to write package {}", args.output.display()))?;

    Ok(format!(
        "Substituted '{}' from '{}' into '{}' and saved to '{}'\n",
        item.uri(),
        args.source.display(),
        args.target.display(),
        args.output.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::PkgItem;
    use crate::opc::constants::uri::PACKAGE_RELS;

    const SLIDE_MASTER: &str = "ppt/slideMasters/slideMaster1.xml";
    const CORE: &str = "docProps/core.xml";

    fn write_package(path: &Path, slide_master: &str) {
        Package::new(
            "fixture",
            [
                PkgItem::new(
                    "fixture",
                    "[Content_Types].xml",
                    br#"<Types><Default Extension="xml" ContentType="application/xml"/></Types>"#
                        .to_vec(),
                ),
                PkgItem::new(
                    "fixture",
                    PACKAGE_RELS,
                    br#"<Relationships><Relationship Id="rId1" Target="ppt/presentation.xml"/></Relationships>"#
                        .to_vec(),
                ),
                PkgItem::new("fixture", CORE, b"<cp:coreProperties><dc:title>T</dc:title></cp:coreProperties>".to_vec()),
                PkgItem::new("fixture", SLIDE_MASTER, slide_master.as_bytes().to_vec()),
                PkgItem::new("fixture", "ppt/media/image1.png", vec![0x89, b'P', b'N', b'G']),
            ],
        )
        .save(path)
        .unwrap();
    }

    fn fixtures(dir: &Path) -> (PathBuf, PathBuf) {
        let base = dir.join("base.pptx");
        let changed = dir.join("changed.pptx");
        write_package(&base, "<p:sldMaster><p:cSld name=\"one\"/></p:sldMaster>");
        write_package(&changed, "<p:sldMaster><p:cSld name=\"two\"/></p:sldMaster>");
        (base, changed)
    }

    #[test]
    fn test_browse_core_props() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, _) = fixtures(tmp.path());
        let out = run(&Command::Browse(BrowseArgs {
            package: base,
            uri: CORE.to_string(),
        }))
        .unwrap();
        assert_eq!(
            out,
            "<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n\
             <cp:coreProperties>\n  <dc:title>T</dc:title>\n</cp:coreProperties>\n"
        );
    }

    #[test]
    fn test_browse_expanded_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, _) = fixtures(tmp.path());
        let dir = tmp.path().join("expanded");
        Package::read(&base).unwrap().save_to_dir(&dir).unwrap();

        let from_zip = run(&Command::Browse(BrowseArgs {
            package: base,
            uri: PACKAGE_RELS.to_string(),
        }))
        .unwrap();
        let from_dir = run(&Command::Browse(BrowseArgs {
            package: dir,
            uri: PACKAGE_RELS.to_string(),
        }))
        .unwrap();
        assert_eq!(from_zip, from_dir);
    }

    #[test]
    fn test_diff_two_packages() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, changed) = fixtures(tmp.path());
        let out = run(&Command::Diff(DiffArgs {
            package_a: base,
            package_b: changed,
            context: ContextArgs { context_lines: 3 },
        }))
        .unwrap();

        assert!(out.contains("Changed (1):\n  ppt/slideMasters/slideMaster1.xml\n"), "{out}");
        assert!(out.contains("-  <p:cSld name=\"one\"/>"), "{out}");
        assert!(out.ends_with("Unchanged: 4\n"), "{out}");
    }

    #[test]
    fn test_diff_item_header_without_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, changed) = fixtures(tmp.path());
        let out = run(&Command::DiffItem(DiffItemArgs {
            package_a: base,
            package_b: changed,
            uri: "[Content_Types].xml".to_string(),
            context: ContextArgs { context_lines: 3 },
        }))
        .unwrap();
        assert_eq!(out, "[Content_Types].xml:\n");
    }

    #[test]
    fn test_extract_then_repackage() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, _) = fixtures(tmp.path());
        let dir = tmp.path().join("extracted");
        let repacked = tmp.path().join("test_out.pptx");

        let out = run(&Command::Extract(ExtractArgs {
            package: base.clone(),
            dir: dir.clone(),
        }))
        .unwrap();
        assert!(out.is_empty());
        assert!(dir.join("ppt").join("media").join("image1.png").is_file());

        let out = run(&Command::Repackage(RepackageArgs {
            dir,
            package: repacked.clone(),
        }))
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(
            Package::read(&repacked).unwrap().blob_collection(),
            Package::read(&base).unwrap().blob_collection()
        );
    }

    #[test]
    fn test_substitute() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, changed) = fixtures(tmp.path());
        let output = tmp.path().join("test_out.pptx");

        let out = run(&Command::Substitute(SubstituteArgs {
            uri: "slideMaster1.xml".to_string(),
            source: changed.clone(),
            target: base.clone(),
            output: output.clone(),
        }))
        .unwrap();
        assert!(out.starts_with("Substituted 'ppt/slideMasters/slideMaster1.xml' from "));

        let mut expected = Package::read(&base).unwrap().blob_collection();
        let changed = Package::read(&changed).unwrap();
        expected.insert(
            SLIDE_MASTER.to_string(),
            changed.get(SLIDE_MASTER).unwrap().blob().to_vec(),
        );
        assert_eq!(Package::read(&output).unwrap().blob_collection(), expected);
    }

    #[test]
    fn test_exit_codes() {
        let tmp = tempfile::tempdir().unwrap();
        let (base, _) = fixtures(tmp.path());

        let missing = run(&Command::Browse(BrowseArgs {
            package: base.clone(),
            uri: "nope.xml".to_string(),
        }))
        .unwrap_err();
        assert_eq!(exit_code(&missing), 2);

        let binary = run(&Command::Browse(BrowseArgs {
            package: base,
            uri: "image1.png".to_string(),
        }))
        .unwrap_err();
        assert_eq!(exit_code(&binary), 3);

        let unreadable = run(&Command::Browse(BrowseArgs {
            package: tmp.path().join("absent.pptx"),
            uri: CORE.to_string(),
        }))
        .unwrap_err();
        assert_eq!(exit_code(&unreadable), 1);
        assert!(format!("{unreadable:#}").contains("absent.pptx"));
    }

    #[test]
    fn test_parse_command_line() {
        let cli = Cli::try_parse_from([
            "opc-diag", "-vv", "diff-item", "a.pptx", "b.pptx", "_rels/.rels", "-U", "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::DiffItem(args) => {
                assert_eq!(args.uri, "_rels/.rels");
                assert_eq!(DiffOptions::from(args.context).context_lines, 5);
            },
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["opc-diag", "substitute", "u", "s", "t", "o"]).unwrap();
        assert!(matches!(cli.command, Command::Substitute(_)));
    }
}
