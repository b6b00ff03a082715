//! The build stages between extraction and packaging.
//!
//! Each module owns one stage: a freshness check (`is_fresh`) that decides
//! whether the stage can be skipped, and the action that produces its
//! outputs. Stages talk to the outside world only through the
//! [`BuildContext`](kiln_exec::BuildContext) they are given.
//!
//! | Module         | Produces                                          |
//! |----------------|---------------------------------------------------|
//! | [`bootstrap`]  | helper classes in `tools/`, registered task kinds |
//! | [`preprocess`] | `kawa/*Version.java` from their `.in` templates   |
//! | [`codegen`]    | `gnu/lists/*Vector.java`                          |
//! | [`layers`]     | core and library classes in `classes/`            |
//! | [`packager`]   | the two jars in `dist/`                           |

#![warn(missing_docs)]

pub mod bootstrap;
pub mod codegen;
pub mod error;
pub mod filter;
pub mod jar;
pub mod layers;
pub mod packager;
pub mod preprocess;
pub mod xcopy;

pub use error::{BootstrapError, CompileError, GenerationError, PackageError, PreprocessError};
pub use filter::{FilterSet, GlobMapper};
pub use layers::{LayerDef, LayerKind, LAYERS};
pub use packager::BuildManifestEntry;
