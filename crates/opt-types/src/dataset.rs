//! Append-only history of observations.
//!
//! Rows keep acquisition order; nothing here ever sorts them. The column set
//! is fixed by the first row and every later row must match it.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::errors::{OptError, OptResult};
use crate::experiment::Record;

/// A single dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Position in the dataset, always `0..len` ascending.
    pub index: usize,
    /// Which `measure` call produced this row.
    pub observation: usize,
    /// Values aligned with [`Dataset::columns`].
    pub values: Vec<f64>,
}

/// Ordered record of every observation made during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
    next_observation: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct observations (measure calls) still held.
    pub fn observations(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for row in &self.rows {
            if last != Some(row.observation) {
                count += 1;
                last = Some(row.observation);
            }
        }
        count
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r.values[idx])
    }

    pub fn last(&self) -> Option<&Row> {
        self.rows.last()
    }

    /// Append every record of one observation as consecutive rows.
    ///
    /// Either all records are appended or none are.
    pub fn push_observation(&mut self, records: &[Record]) -> OptResult<usize> {
        if records.is_empty() {
            return Err(OptError::Validation(
                "observation produced no rows".to_string(),
            ));
        }

        let mut columns = self.columns.clone();
        if columns.is_empty() {
            columns = records[0].fields().iter().map(|(c, _)| c.clone()).collect();
        }

        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            staged.push(Self::align(&columns, record)?);
        }

        self.columns = columns;
        let observation = self.next_observation;
        self.next_observation += 1;
        for values in staged {
            let index = self.rows.len();
            self.rows.push(Row {
                index,
                observation,
                values,
            });
        }
        Ok(observation)
    }

    /// Append all rows of `other`, re-indexing them after the existing rows.
    pub fn extend(&mut self, other: Dataset) -> OptResult<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.columns.is_empty() {
            self.columns = other.columns.clone();
        } else if !same_columns(&self.columns, &other.columns) {
            return Err(OptError::ColumnMismatch {
                expected: self.columns.clone(),
                actual: other.columns,
            });
        }

        let order: Vec<usize> = self
            .columns
            .iter()
            .filter_map(|c| other.column_index(c))
            .collect();
        let base = self.next_observation;
        let mut last_obs = None;
        for row in other.rows {
            let values = order.iter().map(|&i| row.values[i]).collect();
            let index = self.rows.len();
            self.rows.push(Row {
                index,
                observation: base + row.observation,
                values,
            });
            last_obs = Some(base + row.observation);
        }
        if let Some(obs) = last_obs {
            self.next_observation = self.next_observation.max(obs + 1);
        }
        Ok(())
    }

    /// Keep rows matching `keep`, re-indexing the survivors. Returns the number
    /// of rows removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Row) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.index = i;
        }
        before - self.rows.len()
    }

    /// Apply `f` to every value of `column` in place.
    pub fn map_column<F>(&mut self, column: &str, f: F) -> OptResult<()>
    where
        F: Fn(f64) -> f64,
    {
        let idx = self
            .column_index(column)
            .ok_or_else(|| OptError::UnknownParameter {
                name: column.to_string(),
            })?;
        for row in &mut self.rows {
            row.values[idx] = f(row.values[idx]);
        }
        Ok(())
    }

    /// Row with the lowest finite value in `column`; the earliest wins ties.
    pub fn best(&self, column: &str) -> Option<&Row> {
        let idx = self.column_index(column)?;
        let mut best: Option<&Row> = None;
        for row in &self.rows {
            let v = row.values[idx];
            if v.is_nan() {
                continue;
            }
            match best {
                Some(b) if b.values[idx] <= v => {}
                _ => best = Some(row),
            }
        }
        best
    }

    /// Minimum finite value of `column`.
    pub fn min(&self, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.best(column).map(|row| row.values[idx])
    }

    /// Export as an Arrow record batch: `index` and `observation` followed by
    /// one `Float64` column per tracked quantity, rows in acquisition order.
    pub fn to_record_batch(&self) -> OptResult<RecordBatch> {
        let mut fields = vec![
            Field::new("index", DataType::UInt64, false),
            Field::new("observation", DataType::UInt64, false),
        ];
        fields.extend(
            self.columns
                .iter()
                .map(|c| Field::new(c.as_str(), DataType::Float64, false)),
        );
        let schema = Arc::new(Schema::new(fields));

        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(UInt64Array::from_iter_values(
                self.rows.iter().map(|r| r.index as u64),
            )),
            Arc::new(UInt64Array::from_iter_values(
                self.rows.iter().map(|r| r.observation as u64),
            )),
        ];
        for idx in 0..self.columns.len() {
            arrays.push(Arc::new(Float64Array::from_iter_values(
                self.rows.iter().map(|r| r.values[idx]),
            )));
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    fn align(columns: &[String], record: &Record) -> OptResult<Vec<f64>> {
        let actual: Vec<String> = record.fields().iter().map(|(c, _)| c.clone()).collect();
        if !same_columns(columns, &actual) {
            return Err(OptError::ColumnMismatch {
                expected: columns.to_vec(),
                actual,
            });
        }
        columns
            .iter()
            .map(|c| {
                record.get(c).ok_or_else(|| OptError::ColumnMismatch {
                    expected: columns.to_vec(),
                    actual: actual.clone(),
                })
            })
            .collect()
    }
}

fn same_columns(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|c| b.contains(c))
}
