//! Full-scan Find execution.
//!
//! Every Find visits each document in ID order, resolves its winning revision under that
//! document's own lock, and evaluates the selector against it. Only after every match is
//! collected are sorting, `skip`, `limit` and the projection applied, so `total_rows` always
//! counts every match and the result never depends on the order in which per-document
//! resolutions complete.

use futures::{StreamExt, stream};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use revlayer_core::{
    cursor::{ResultCursor, Row},
    query::{FindRequest, Sort, SortDirection},
    revision::{Fields, RevisionTree},
    selector::FieldPath,
};

use crate::{
    evaluator::{DocumentEvaluator, collate_optional},
    store::Lineage,
};

/// Scans `lineages` (already in ID order) and answers `request`.
pub(crate) async fn execute(
    lineages: Vec<(String, Arc<Lineage>)>,
    request: FindRequest,
    concurrency: usize,
) -> ResultCursor {
    let scanned = lineages.len();
    let request = &request;

    // `buffered` yields in input order, keeping ID order as the sort fallback.
    let mut matches = stream::iter(lineages)
        .map(|(id, lineage)| async move {
            let tree = lineage.read().await;
            select_winner(id, &tree, request)
        })
        .buffered(concurrency.max(1))
        .filter_map(|row| async move { row })
        .collect::<Vec<_>>()
        .await;

    let total_rows = matches.len();

    if !request.sort.is_empty() {
        // Stable, so equal keys keep ID order.
        matches.sort_by(|a, b| compare_rows(a, b, &request.sort));
    }

    let rows = matches
        .into_iter()
        .skip(request.skip)
        .take(request.limit.unwrap_or(usize::MAX))
        .map(|row| match &request.fields {
            Some(fields) => Row { fields: project(&row.fields, fields), ..row },
            None => row,
        })
        .collect::<Vec<_>>();

    debug!(
        scanned,
        total_rows,
        offset = request.skip,
        returned = rows.len(),
        "find completed"
    );

    ResultCursor::builder(rows)
        .with_offset(request.skip)
        .with_total_rows(total_rows)
        .build()
}

fn select_winner(id: String, tree: &RevisionTree, request: &FindRequest) -> Option<Row> {
    let winner = tree.winner()?;

    if winner.is_deleted() && !request.include_deleted {
        return None;
    }

    if !DocumentEvaluator::new(winner.fields()).matches(&request.selector) {
        return None;
    }

    Some(Row {
        id,
        rev: winner.id().clone(),
        deleted: winner.is_deleted(),
        fields: winner.fields().clone(),
    })
}

fn compare_rows(a: &Row, b: &Row, sort: &[Sort]) -> std::cmp::Ordering {
    sort.iter()
        .map(|key| {
            let ordering = collate_optional(key.field.resolve(&a.fields), key.field.resolve(&b.fields));
            match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

/// Keeps only the given paths, rebuilding nested objects for dotted paths.
fn project(fields: &Fields, paths: &[FieldPath]) -> Fields {
    let mut projected = Map::new();

    for path in paths {
        if let Some(value) = path.resolve(fields) {
            insert_path(&mut projected, path.segments(), value.clone());
        }
    }

    projected
}

fn insert_path(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let child = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));

            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}
