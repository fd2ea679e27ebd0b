pub mod ingest;
pub mod models;
pub mod workbook;

pub use ingest::{IngestError, IngestOutcome, RawRow, RejectReason, RowRejection};
pub use models::{Draw, DrawError, History, DEFAULT_MIN_HISTORY, PICK_COUNT, POOL_SIZE};
