//! Change propagation to the external graph store
//!
//! Content events are folded up to their owning subject, deduplicated,
//! and drained at the end of each batch: conversions first, deletions last.
//! `Rebuilder` covers the operator-driven full and partial rebuilds.

mod consumer;
mod convert;
mod identifier;
mod queue;
mod rebuild;

pub use consumer::{
    ChangePropagationConsumer, DrainReport, PropagationError, Transaction, TxMode, UnitOfWork,
};
pub use convert::{
    ConversionError, Converter, Unpublishable, DCTERMS_NS, DSPACE_NS, OWL_SAME_AS, RDF_TYPE,
};
pub use identifier::{
    DoiHandleUriGenerator, HandleUriGenerator, IdentifierGenerator, IdentifierStrategy,
    LocalUriGenerator,
};
pub use queue::{Deduplicator, Drain, PendingQueue};
pub use rebuild::{RebuildOptions, RebuildReport, Rebuilder, HANDLE_PREFIX};
