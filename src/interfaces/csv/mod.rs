//! CSV adapters for the financial report format.
//!
//! The report columns are `Date,Type,Category,Description,Amount,Reference`,
//! in that order. Both the writer and the reader rely on it.

pub mod report_writer;
pub mod transaction_reader;

pub const REPORT_HEADER: [&str; 6] = [
    "Date",
    "Type",
    "Category",
    "Description",
    "Amount",
    "Reference",
];
