pub mod charset;
pub mod codec;
pub mod diag;
pub mod dump;
pub mod entry;
pub mod error;
pub mod format;
pub mod index;
pub mod pipeline;
pub mod reader;
pub mod resolver;
pub mod sorter;
pub mod writer;

pub use charset::{ClassTable, KeyDisplay};
pub use diag::{BuildLog, Diagnostic, DiagnosticSink, NullSink};
pub use entry::Entry;
pub use error::{Result, SkdError};
pub use format::{Header, UNRESOLVED_ADDRESS};
pub use index::{IndexBuilder, IndexKey};
pub use pipeline::{build, BuildConfig, BuildOutput};
pub use reader::{DictFile, DictView, VerifyReport};
pub use resolver::{resolve, LookupMiss, ResolveReport, Resolved};
pub use writer::{serialize, DictBuffer, Patch, Writer};
