//! Structural codemod that migrates calls on a legacy, module-level navigation
//! object (`Router.push(template, resolved)` from a default import) to a
//! scope-local object obtained from a hook (`const router = useRouter();
//! router.push(resolved)`), fixing up imports and the module directive.
//!
//! ```no_run
//! use nav_codemod::{transform, CodemodConfig};
//!
//! let out = transform(
//!     "import Router from 'next/router';\nexport function go() { Router.push('/p/[id]', '/p/1'); }\n",
//!     &CodemodConfig::default(),
//! )?;
//! assert!(out.changed);
//! # Ok::<(), nav_codemod::CodemodError>(())
//! ```

pub mod batch;
pub mod config;
pub mod declare;
pub mod diagnostics;
pub mod directive;
pub mod driver;
pub mod error;
pub mod imports;
pub mod matcher;
pub mod rewrite;
pub mod scope;
pub mod tree;

pub use config::CodemodConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use driver::{transform, transform_file, transform_with, TransformOutput};
pub use error::{CodemodError, Result};
pub use tree::{Dialect, SourceUnit};
