//! Recursive relation loader.
//!
//! One query per relation level: parent keys are collected, de-duplicated and sent as a single
//! `IN (...)` list; child rows are grouped by key and attached to every parent. Nested relations
//! recurse over the flattened children of all parents.

use std::collections::{HashMap, HashSet};

use futures_util::future::BoxFuture;

use super::{Cardinality, RelationSpec};
use crate::error::OrmResult;
use crate::qb::{Filter, Ordered, SelectQb};
use crate::query_builder::QueryBuilder;
use crate::record::{Record, Related};
use crate::value::{Value, ValueKey};

/// Column alias carrying the parent key of a pivot-joined row. Removed before attaching.
const PIVOT_PARENT_ID_ALIAS: &str = "__sqlhydra_parent_id";

fn empty_related(cardinality: Cardinality) -> Related {
    if cardinality.is_singular() {
        Related::One(None)
    } else {
        Related::Many(Vec::new())
    }
}

/// Column on the parent rows whose values are looked up in the child table.
fn parent_column(spec: &RelationSpec, parent_table: &str) -> String {
    match spec.cardinality {
        Cardinality::ManyToOne => spec.foreign_key_for(parent_table),
        _ => spec.owner_key.clone(),
    }
}

/// Parent columns `relations` read their keys from, in first-use order.
pub(crate) fn parent_key_columns(parent_table: &str, relations: &[RelationSpec]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::new();
    for spec in relations {
        let col = parent_column(spec, parent_table);
        if !cols.contains(&col) {
            cols.push(col);
        }
    }
    cols
}

/// Column on the child rows to group by.
fn child_column(spec: &RelationSpec, parent_table: &str) -> String {
    match (spec.cardinality, &spec.through) {
        (Cardinality::ManyToOne, _) => spec.owner_key.clone(),
        (Cardinality::ManyToMany, Some(_)) => PIVOT_PARENT_ID_ALIAS.to_string(),
        _ => spec.foreign_key_for(parent_table),
    }
}

/// Distinct non-NULL values of `column`, in first-seen order.
fn collect_keys(parents: &[&mut Record], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    parents
        .iter()
        .filter_map(|p| p.get(column))
        .filter(|v| v.key().is_some_and(|k| seen.insert(k)))
        .cloned()
        .collect()
}

/// Requested columns plus the key columns grouping and nesting need.
fn child_columns(spec: &RelationSpec, grouping: &str) -> Vec<String> {
    if spec.columns.is_empty() {
        return Vec::new();
    }
    let mut cols = spec.columns.clone();
    let mut required = vec![grouping.to_string()];
    if let Some(nested) = spec.nested() {
        required.push(parent_column(nested, &spec.table));
    }
    for col in required {
        if !cols.contains(&col) {
            cols.push(col);
        }
    }
    cols
}

fn child_query(qb: &QueryBuilder, spec: &RelationSpec, parent_table: &str, keys: Vec<Value>) -> SelectQb {
    let grouping = child_column(spec, parent_table);
    let mut select = qb.select(&spec.table);

    select = match (&spec.through, spec.cardinality) {
        (Some(through), Cardinality::ManyToMany) => {
            let child = select.alias(&spec.table);
            let pivot = select.alias(&through.table);
            let mut cols = vec![format!(
                "{pivot}.{} AS {PIVOT_PARENT_ID_ALIAS}",
                through.parent_key
            )];
            if spec.columns.is_empty() {
                cols.push(format!("{child}.*"));
            } else {
                let mut wanted = spec.columns.clone();
                if let Some(nested) = spec.nested() {
                    let col = parent_column(nested, &spec.table);
                    if !wanted.contains(&col) {
                        wanted.push(col);
                    }
                }
                cols.extend(wanted.iter().map(|c| format!("{child}.{c}")));
            }
            let cols: Vec<&str> = cols.iter().map(String::as_str).collect();
            select
                .columns(&cols)
                .inner_join(
                    &through.table,
                    &format!("{pivot}.{} = {child}.{}", through.child_key, spec.owner_key),
                )
                .in_list(&format!("{pivot}.{}", through.parent_key), keys)
        }
        _ => {
            let cols = child_columns(spec, &grouping);
            let cols: Vec<&str> = cols.iter().map(String::as_str).collect();
            select.columns(&cols).in_list(&grouping, keys)
        }
    };

    for expr in spec.filter.exprs() {
        select = select.and_expr(expr.clone());
    }
    for clause in &spec.order_by {
        select = select.order_by(clause);
    }
    select
}

/// Load `spec` for `parents` (rows of `parent_table`) and recurse into its nested relation.
///
/// Every parent gets the attachment key, even when nothing matched. A failing child query
/// aborts the whole load.
pub(crate) fn load<'a>(
    qb: &'a QueryBuilder,
    parent_table: &'a str,
    mut parents: Vec<&'a mut Record>,
    spec: &'a RelationSpec,
) -> BoxFuture<'a, OrmResult<()>> {
    Box::pin(async move {
        let key = spec.attach_key();
        let parent_col = parent_column(spec, parent_table);
        let keys = collect_keys(&parents, &parent_col);

        if keys.is_empty() {
            tracing::debug!(
                target: "sqlhydra.loader",
                relation = %key,
                table = %spec.table,
                "no parent keys, skipping query"
            );
            for parent in parents.iter_mut() {
                parent.attach(key.as_str(), empty_related(spec.cardinality));
            }
            return Ok(());
        }

        let key_count = keys.len();
        let select = child_query(qb, spec, parent_table, keys);
        let rows = qb.fetch_all(select).await?;
        tracing::debug!(
            target: "sqlhydra.loader",
            relation = %key,
            table = %spec.table,
            cardinality = %spec.cardinality,
            parent_keys = key_count,
            rows = rows.len(),
            "relation loaded"
        );

        let grouping = child_column(spec, parent_table);
        let strip_alias = grouping == PIVOT_PARENT_ID_ALIAS;
        let mut groups: HashMap<ValueKey, Vec<Record>> = HashMap::new();
        for mut row in rows {
            let group_key = if strip_alias {
                row.remove(&grouping).and_then(|v| v.key())
            } else {
                row.get(&grouping).and_then(Value::key)
            };
            if let Some(group_key) = group_key {
                groups.entry(group_key).or_default().push(row);
            }
        }

        for parent in parents.iter_mut() {
            let group = parent
                .get(&parent_col)
                .and_then(Value::key)
                .and_then(|k| groups.get(&k));
            let related = match (spec.cardinality.is_singular(), group) {
                (true, Some(rows)) => Related::One(rows.first().cloned()),
                (false, Some(rows)) => Related::Many(rows.clone()),
                (_, None) => empty_related(spec.cardinality),
            };
            parent.attach(key.as_str(), related);
        }

        if let Some(nested) = spec.nested() {
            let children: Vec<&mut Record> = parents
                .into_iter()
                .filter_map(|p| p.relation_mut(&key))
                .flat_map(Related::records_mut)
                .collect();
            load(qb, &spec.table, children, nested).await?;
        }
        Ok(())
    })
}
