//! # Variant Table Loading and Validation
//!
//! Reads the substitutions column and the optional annotation columns out of a
//! `polars` DataFrame, validating each annotation against its declared type and
//! bound. Every failure names the offending column.
//!
//! - Substitutions must be a string column. Null cells, which is how an empty CSV
//!   field arrives, are the wildtype variant.
//! - Scores are floats of any sign; variances are floats `>= 0`; pre- and
//!   post-selection counts are non-negative integers. None of them may be NaN.
//! - A named annotation column that is absent is unavailable when `cols_optional`
//!   is set, and an error otherwise.

use crate::assemble::{Annotations, check_float_values};
use crate::config::ColumnConfig;
use crate::types::{BinaryMapError, ValidationError};
use log::{info, warn};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// The raw material of a binary map: one substitution string per row and the
/// row-aligned annotation columns.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantTable {
    pub substitutions: Vec<String>,
    pub annotations: Annotations,
}

/// Reads a CSV file with a header row into a DataFrame. Files ending in `.tsv` or
/// `.tab` are read as tab-separated.
pub fn load_variant_frame(path: &Path) -> Result<DataFrame, BinaryMapError> {
    let separator = match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    };
    info!("Loading variants from '{}'", path.display());

    let frame = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;

    info!(
        "Loaded {} rows with columns {:?}",
        frame.height(),
        frame.get_column_names()
    );
    Ok(frame)
}

/// Extracts and validates the configured columns of `frame`.
pub fn read_variant_table(
    frame: &DataFrame,
    columns: &ColumnConfig,
) -> Result<VariantTable, BinaryMapError> {
    let optional = columns.cols_optional;

    let func_scores = match find_column(frame, columns.func_score_col.as_deref(), optional)? {
        Some((name, column)) => Some(Array1::from_vec(float_values(name, column, None)?)),
        None => None,
    };
    let func_scores_var =
        match find_column(frame, columns.func_score_var_col.as_deref(), optional)? {
            Some((name, column)) => {
                Some(Array1::from_vec(float_values(name, column, Some(0.0))?))
            }
            None => None,
        };
    let n_pre = match find_column(frame, columns.n_pre_col.as_deref(), optional)? {
        Some((name, column)) => Some(Array1::from_vec(count_values(name, column)?)),
        None => None,
    };
    let n_post = match find_column(frame, columns.n_post_col.as_deref(), optional)? {
        Some((name, column)) => Some(Array1::from_vec(count_values(name, column)?)),
        None => None,
    };

    let substitutions = substitution_values(frame, &columns.substitutions_col)?;

    Ok(VariantTable {
        substitutions,
        annotations: Annotations {
            func_scores,
            func_scores_var,
            n_pre,
            n_post,
        },
    })
}

fn find_column<'a>(
    frame: &'a DataFrame,
    name: Option<&'a str>,
    cols_optional: bool,
) -> Result<Option<(&'a str, &'a Column)>, ValidationError> {
    let Some(name) = name else {
        return Ok(None);
    };
    match frame.column(name) {
        Ok(column) => Ok(Some((name, column))),
        Err(_) if cols_optional => {
            warn!("Input lacks column {name}; that annotation is unavailable");
            Ok(None)
        }
        Err(_) => Err(ValidationError::MissingColumn(name.to_string())),
    }
}

fn wrong_type(column: &str, expected: &'static str) -> ValidationError {
    ValidationError::ColumnWrongType {
        column: column.to_string(),
        expected,
    }
}

fn substitution_values(frame: &DataFrame, name: &str) -> Result<Vec<String>, BinaryMapError> {
    let column = frame
        .column(name)
        .map_err(|_| ValidationError::MissingColumn(name.to_string()))?;
    if column.dtype() == &DataType::Null {
        return Ok(vec![String::new(); column.len()]);
    }
    let strings = column.str().map_err(|_| wrong_type(name, "str"))?;
    Ok(strings
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

fn float_values(
    name: &str,
    column: &Column,
    minimum: Option<f64>,
) -> Result<Vec<f64>, BinaryMapError> {
    if column.dtype() == &DataType::String {
        return Err(wrong_type(name, "float").into());
    }
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|_| wrong_type(name, "float"))?;
    // A lossy cast shows up as values that became null.
    if casted.null_count() > column.null_count() {
        return Err(wrong_type(name, "float").into());
    }

    let values: Vec<f64> = casted
        .f64()?
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect();
    check_float_values(name, values.iter().copied(), minimum)?;
    Ok(values)
}

/// Largest float below which every integer is exactly representable.
const MAX_EXACT_FLOAT_COUNT: f64 = 9_007_199_254_740_992.0;

/// Integer columns are read without passing through `f64`. Float columns are
/// accepted only when every value is integral and exactly representable.
fn count_values(name: &str, column: &Column) -> Result<Vec<u64>, BinaryMapError> {
    let dtype = column.dtype();
    if dtype.is_integer() && column.null_count() > 0 {
        return Err(ValidationError::ColumnHasNaN(name.to_string()).into());
    }

    if dtype.is_unsigned_integer() {
        let casted = column.cast(&DataType::UInt64)?;
        return Ok(casted.u64()?.into_iter().flatten().collect());
    }
    if dtype.is_signed_integer() {
        let casted = column.cast(&DataType::Int64)?;
        return casted
            .i64()?
            .into_iter()
            .flatten()
            .map(|value| {
                u64::try_from(value).map_err(|_| {
                    BinaryMapError::from(ValidationError::ColumnBelowMinimum {
                        column: name.to_string(),
                        minimum: 0.0,
                    })
                })
            })
            .collect();
    }

    let values = float_values(name, column, Some(0.0))?;
    if values
        .iter()
        .any(|&v| v.fract() != 0.0 || v > MAX_EXACT_FLOAT_COUNT)
    {
        return Err(wrong_type(name, "int").into());
    }
    Ok(values.into_iter().map(|v| v as u64).collect())
}
