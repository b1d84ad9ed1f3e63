use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::model::{SkippedDerivation, TableError, TopicTable};

pub type Tables = BTreeMap<String, TopicTable>;

/// Why a derivation could not run on a recording.
#[derive(Debug, Error, PartialEq)]
pub enum MissingData {
    #[error("table `{0}` not present")]
    Table(String),
    #[error("column `{column}` not present in `{table}`")]
    Column { table: String, column: String },
    #[error("table `{0}` has no rows")]
    Empty(String),
    #[error(transparent)]
    Rejected(#[from] TableError),
}

pub fn table<'a>(tables: &'a Tables, name: &str) -> Result<&'a TopicTable, MissingData> {
    tables
        .get(name)
        .ok_or_else(|| MissingData::Table(name.to_string()))
}

pub fn column<'a>(tables: &'a Tables, name: &str, field: &str) -> Result<&'a [f64], MissingData> {
    table(tables, name)?
        .column(field)
        .ok_or_else(|| MissingData::Column {
            table: name.to_string(),
            column: field.to_string(),
        })
}

/// Fetch several columns of one table at once.
pub fn columns<'a, const N: usize>(
    tables: &'a Tables,
    name: &str,
    fields: [&str; N],
) -> Result<[&'a [f64]; N], MissingData> {
    let mut out: [&[f64]; N] = [&[]; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = column(tables, name, field)?;
    }
    Ok(out)
}

/// Elementwise `sqrt(a² + b² + ...)`.
pub fn norm(cols: &[&[f64]]) -> Vec<f64> {
    let len = cols.iter().map(|c| c.len()).min().unwrap_or(0);
    (0..len)
        .map(|i| cols.iter().map(|c| c[i] * c[i]).sum::<f64>().sqrt())
        .collect()
}

pub fn zip_map(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

pub fn map(a: &[f64], f: impl Fn(f64) -> f64) -> Vec<f64> {
    a.iter().map(|&x| f(x)).collect()
}

/// Columns computed by one derivation, held back until all of them exist.
#[derive(Debug, Default)]
pub struct Staged {
    columns: Vec<(String, Vec<f64>)>,
}

impl Staged {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.push((name.into(), values));
    }

    /// Push an angle and its ` [deg]` twin.
    pub fn push_angle(&mut self, name: &str, radians: Vec<f64>) {
        let degrees = map(&radians, f64::to_degrees);
        self.push(name, radians);
        self.push(format!("{name} [deg]"), degrees);
    }

    /// Insert every staged column into an existing table, or none of them.
    pub fn commit(self, tables: &mut Tables, name: &str) -> Result<(), MissingData> {
        let target = tables
            .get_mut(name)
            .ok_or_else(|| MissingData::Table(name.to_string()))?;
        self.validate(Some(target), target.len())?;
        for (column, values) in self.columns {
            target.insert_derived(column, values)?;
        }
        Ok(())
    }

    /// Like [`Staged::commit`], creating the table with `index` when absent.
    pub fn commit_to_new(self, tables: &mut Tables, name: &str, index: &[f64]) -> Result<(), MissingData> {
        let existing = tables.get(name);
        let len = existing.map_or(index.len(), TopicTable::len);
        self.validate(existing, len)?;
        let target = tables
            .entry(name.to_string())
            .or_insert_with(|| TopicTable::with_index(index.to_vec()));
        for (column, values) in self.columns {
            target.insert_derived(column, values)?;
        }
        Ok(())
    }

    fn validate(&self, target: Option<&TopicTable>, len: usize) -> Result<(), TableError> {
        let mut seen = HashSet::new();
        for (column, values) in &self.columns {
            let taken = target.is_some_and(|t| t.has_column(column));
            if taken || !seen.insert(column.as_str()) {
                return Err(TableError::Duplicate(column.clone()));
            }
            if values.len() != len {
                return Err(TableError::LengthMismatch {
                    name: column.clone(),
                    expected: len,
                    got: values.len(),
                });
            }
        }
        Ok(())
    }
}

type Compute = Box<dyn Fn(&mut Tables) -> Result<(), MissingData>>;

/// A named, self-contained enrichment step over the topic tables.
pub struct Derivation {
    name: String,
    compute: Compute,
}

impl Derivation {
    pub fn new(
        name: impl Into<String>,
        compute: impl Fn(&mut Tables) -> Result<(), MissingData> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            compute: Box::new(compute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, tables: &mut Tables) -> Result<(), MissingData> {
        (self.compute)(tables)
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derivation").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Run each derivation in order; failures are collected, never propagated.
pub fn run_all(tables: &mut Tables, derivations: &[Derivation]) -> Vec<SkippedDerivation> {
    derivations
        .iter()
        .filter_map(|d| match d.apply(tables) {
            Ok(()) => None,
            Err(reason) => {
                debug!(derivation = d.name(), %reason, "skipping derivation");
                Some(SkippedDerivation {
                    derivation: d.name().to_string(),
                    reason: reason.to_string(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Tables {
        let mut t = TopicTable::with_index(vec![0.0, 1.0]);
        t.insert_derived("a", vec![3.0, 0.0]).unwrap();
        t.insert_derived("b", vec![4.0, 1.0]).unwrap();
        Tables::from([("t_0".to_string(), t)])
    }

    #[test]
    fn missing_inputs_are_reported() {
        let tables = tables();
        assert_eq!(column(&tables, "x_0", "a"), Err(MissingData::Table("x_0".into())));
        assert!(matches!(
            columns(&tables, "t_0", ["a", "c"]),
            Err(MissingData::Column { column, .. }) if column == "c"
        ));
    }

    #[test]
    fn norm_is_elementwise() {
        let tables = tables();
        let [a, b] = columns(&tables, "t_0", ["a", "b"]).unwrap();
        assert_eq!(norm(&[a, b]), vec![5.0, 1.0]);
    }

    #[test]
    fn staged_commit_is_all_or_nothing() {
        let mut tables = tables();
        let mut staged = Staged::new();
        staged.push("ok*", vec![1.0, 2.0]);
        staged.push("a", vec![0.0, 0.0]);
        assert!(staged.commit(&mut tables, "t_0").is_err());
        assert!(!tables["t_0"].has_column("ok*"));
    }

    #[test]
    fn angles_get_degree_twins() {
        let mut tables = tables();
        let mut staged = Staged::new();
        staged.push_angle("h*", vec![std::f64::consts::PI, 0.0]);
        staged.commit(&mut tables, "t_0").unwrap();
        assert!((tables["t_0"].column("h* [deg]").unwrap()[0] - 180.0).abs() < 1e-12);
    }

    #[test]
    fn runner_collects_skips_and_continues() {
        let mut tables = tables();
        let derivations = vec![
            Derivation::new("needs_x", |t: &mut Tables| {
                column(t, "x_0", "v")?;
                Ok(())
            }),
            Derivation::new("sum", |t: &mut Tables| {
                let [a, b] = columns(t, "t_0", ["a", "b"])?;
                let sum = zip_map(a, b, |x, y| x + y);
                let mut staged = Staged::new();
                staged.push("sum*", sum);
                staged.commit(t, "t_0")
            }),
        ];
        let skipped = run_all(&mut tables, &derivations);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].derivation, "needs_x");
        assert_eq!(tables["t_0"].column("sum*"), Some(&[7.0, 1.0][..]));
    }

    #[test]
    fn new_table_uses_given_index() {
        let mut tables = tables();
        let mut staged = Staged::new();
        staged.push("F0", vec![1.0, 0.0]);
        staged.commit_to_new(&mut tables, "flags*", &[0.0, 1.0]).unwrap();
        let mut more = Staged::new();
        more.push("F1", vec![0.0, 0.0]);
        more.commit_to_new(&mut tables, "flags*", &[0.0, 1.0]).unwrap();
        assert_eq!(tables["flags*"].field_names().count(), 2);
    }
}
