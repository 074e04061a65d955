use super::REPORT_HEADER;
use crate::domain::transaction::TransactionRecord;
use crate::error::{PaymentError, Result};
use std::io::Write;

/// Writes transaction records in the report CSV format.
///
/// Fields holding a delimiter, a quote or a line break are quoted, so free-text
/// descriptions survive a round trip.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(sink);
        Self { writer }
    }

    /// Writes the header followed by one row per record, in input order.
    pub fn write_records(&mut self, records: &[TransactionRecord]) -> Result<()> {
        self.writer.write_record(REPORT_HEADER)?;
        for record in records {
            let date = record.date.format("%Y-%m-%d").to_string();
            let amount = record.amount.to_string();
            self.writer.write_record([
                date.as_str(),
                record.r#type.as_str(),
                record.category.as_deref().unwrap_or_default(),
                record.description.as_deref().unwrap_or_default(),
                amount.as_str(),
                record.reference.as_deref().unwrap_or_default(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| PaymentError::IoError(e.into_error()))
    }
}
