pub mod account;
pub mod extracted;
pub mod extraction;
pub mod invoice;

pub use account::Account;
pub use extracted::{ExtractedInvoice, ExtractedLine};
pub use extraction::{Extraction, ExtractionStatus, NewExtraction};
pub use invoice::{Invoice, InvoiceLine, InvoiceStatus};
