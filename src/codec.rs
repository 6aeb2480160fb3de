use crate::error::Result;
use crate::table::{Cell, Column, Index, TIMESTAMP_COLUMN, TimeSeriesTable};
use std::io::{Read, Write};

/// Read a table, using its `timestamp` column as the index.
pub fn read_table<R: Read>(reader: R) -> Result<TimeSeriesTable> {
    let mut reader = csv::Reader::from_reader(reader);

    let mut columns: Vec<Column> = reader
        .headers()?
        .iter()
        .map(|name| Column::new(name.trim(), Vec::new()))
        .collect();

    let mut n_rows = 0;
    for record in reader.records() {
        let record = record?;
        for (column, field) in columns.iter_mut().zip(record.iter()) {
            column.cells.push(Cell::parse(field));
        }
        n_rows += 1;
    }

    TimeSeriesTable::new(Index::positional(n_rows), columns).set_index_from_column(TIMESTAMP_COLUMN)
}

/// Write a table with its index as the first column.
pub fn write_table<W: Write>(table: &TimeSeriesTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let index_name = table.index().name().unwrap_or(TIMESTAMP_COLUMN);
    let header = std::iter::once(index_name)
        .chain(table.columns().iter().map(|col| col.name.as_str()));
    writer.write_record(header)?;

    let mut record = Vec::with_capacity(table.columns().len() + 1);
    for (i_row, key) in table.index().keys().iter().enumerate() {
        record.clear();
        record.push(key.to_string());
        record.extend(table.columns().iter().map(|col| format_cell(&col.cells[i_row])));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Missing => String::new(),
        Cell::Number(num) if num.is_nan() => String::new(),
        // Debug keeps the trailing `.0` of integral values.
        Cell::Number(num) => format!("{num:?}"),
        Cell::Text(text) => text.clone(),
    }
}
