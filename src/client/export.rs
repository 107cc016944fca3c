use std::{fs, io, path::Path};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::ClientError;
use crate::structs::Expense;

const HEADER: [&str; 4] = ["Title", "Amount", "Category", "Date"];

/// Every field quoted (inner quotes doubled), one `\n`-separated line per expense
/// after the header, no trailing newline.
pub fn expenses_to_csv(expenses: &[Expense]) -> Result<String, ClientError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for expense in expenses {
        let date = expense
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        writer.write_record([
            expense.title.as_str(),
            expense.amount.to_string().as_str(),
            expense.category.as_str(),
            date.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?;
    let mut text =
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Writes the CSV to `path`. Returns `false` (and writes nothing) for an empty list.
pub fn export_csv(expenses: &[Expense], path: &Path) -> Result<bool, ClientError> {
    if expenses.is_empty() {
        return Ok(false);
    }
    fs::write(path, expenses_to_csv(expenses)?)?;
    log::info!("Exported {} expenses to {}", expenses.len(), path.display());
    Ok(true)
}
