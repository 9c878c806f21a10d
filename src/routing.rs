use std::collections::HashMap;

use crate::tabular::TabularRow;

/// Target bucket for one routed column. Each entity builder declares which
/// buckets it consumes; a column lands in exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Fixed scalar field addressed by its exact column name.
    Scalar,
    Collaborators,
    UrlLinks,
    XrefLinks,
    /// Free-form tag/value attributes.
    Attributes,
    /// Nested library descriptor fields (experiment only).
    Library,
    /// Columns the entity does not consume.
    Ignored,
}

enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
}

impl Matcher {
    fn matches(&self, column: &str) -> bool {
        match self {
            Matcher::Exact(name) => column == *name,
            Matcher::Prefix(prefix) => column.starts_with(prefix),
        }
    }
}

/// Ordered list of column-routing rules, evaluated once per row. The first
/// matching rule wins; columns matching nothing fall into the table's
/// fallback bucket.
pub struct RoutingTable {
    rules: Vec<(Matcher, Bucket)>,
    fallback: Bucket,
}

impl RoutingTable {
    pub fn new(fallback: Bucket) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn exact(mut self, name: &'static str, bucket: Bucket) -> Self {
        self.rules.push((Matcher::Exact(name), bucket));
        self
    }

    pub fn exacts(mut self, names: &[&'static str], bucket: Bucket) -> Self {
        for name in names {
            self.rules.push((Matcher::Exact(name), bucket));
        }
        self
    }

    pub fn prefix(mut self, prefix: &'static str, bucket: Bucket) -> Self {
        self.rules.push((Matcher::Prefix(prefix), bucket));
        self
    }

    pub fn route(&self, row: &TabularRow) -> RoutedRow {
        let mut routed = RoutedRow::default();
        for (column, value) in row.iter() {
            let bucket = self
                .rules
                .iter()
                .find(|(matcher, _)| matcher.matches(column))
                .map(|(_, bucket)| *bucket)
                .unwrap_or(self.fallback);
            match bucket {
                Bucket::Scalar => {
                    routed
                        .scalars
                        .insert(column.to_string(), value.to_string());
                }
                Bucket::Ignored => {}
                bucket => routed
                    .buckets
                    .entry(bucket)
                    .or_default()
                    .push((column.to_string(), value.to_string())),
            }
        }
        routed
    }
}

/// A row partitioned into scalar fields and per-bucket column lists,
/// constructed fresh for every routed row.
#[derive(Debug, Default)]
pub struct RoutedRow {
    scalars: HashMap<String, String>,
    buckets: HashMap<Bucket, Vec<(String, String)>>,
}

impl RoutedRow {
    /// A scalar field value, with a blank cell counting as absent.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// All columns routed into `bucket`, in row order. Blank values are
    /// kept: the library checks need to see present-but-empty cells.
    pub fn bucket(&self, bucket: Bucket) -> &[(String, String)] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values (without their column names) routed into `bucket`.
    pub fn bucket_values(&self, bucket: Bucket) -> Vec<String> {
        self.bucket(bucket)
            .iter()
            .map(|(_, value)| value.clone())
            .collect()
    }
}
