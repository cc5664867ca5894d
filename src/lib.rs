//! opc-diag - inspect and compare Office Open XML packages
//!
//! Office documents (.docx, .xlsx, .pptx) are OPC packages: ZIP containers of
//! XML parts and binary media tied together by relationship items. This crate
//! loads a package, from a ZIP archive or from an expanded directory, into an
//! in-memory map of uri to blob and works on that map:
//!
//! - **Browse**: present one item as pretty-printed XML
//! - **Diff**: compare every item of two packages, or one named item
//! - **Extract / repackage**: convert between ZIP and directory form
//! - **Substitute**: copy one item from a package into another
//!
//! # Example
//!
//! ```no_run
//! use opc_diag::diff::{diff, DiffOptions};
//! use opc_diag::opc::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Package::read("base.pptx")?;
//! let changed = Package::read("changed.pptx")?;
//!
//! let report = diff(&base, &changed, &DiffOptions::default())?;
//! print!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod diff;
pub mod opc;
pub mod presenter;

pub use diff::{DiffOptions, ItemDiff, PackageDiff};
pub use opc::{OpcError, Package, PkgItem};
pub use presenter::ItemPresenter;
