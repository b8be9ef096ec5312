// src/output.rs

use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{fs::File, io::Write, path::Path, sync::Arc};
use tracing::info;

use crate::error::Result;
use crate::merge::MergedTable;

pub const MONTH_COLUMN: &str = "Month";

/// `Month` (Utf8) followed by one nullable Float64 column per table column.
pub fn to_record_batch(table: &MergedTable) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(MONTH_COLUMN, DataType::Utf8, false)];
    fields.extend(
        table
            .columns()
            .iter()
            .map(|name| Field::new(name.as_str(), DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let months: Vec<String> = table.months().map(|m| m.to_string()).collect();
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(months))];
    for col in 0..table.columns().len() {
        let values: Float64Array = table.rows().map(|(_, row)| row[col]).collect();
        arrays.push(Arc::new(values));
    }

    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// CSV with a header row; missing values are empty fields.
pub fn write_csv<W: Write>(table: &MergedTable, writer: W) -> Result<()> {
    let batch = to_record_batch(table)?;
    let mut csv = WriterBuilder::new().with_header(true).build(writer);
    csv.write(&batch)?;
    Ok(())
}

pub fn write_parquet(table: &MergedTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Parquet when `path` ends in `.parquet`, CSV otherwise.
pub fn write_to_path(table: &MergedTable, path: &Path) -> Result<()> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(table, path)?;
    } else {
        write_csv(table, File::create(path)?)?;
    }
    info!(path = %path.display(), rows = table.len(), "wrote table");
    Ok(())
}
