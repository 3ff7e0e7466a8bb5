//! Instrumented CRUD primitives over any `DocumentCollection`.
//!
//! Every primitive has the same shape: open a span, tag the collection and
//! database, tag the input, run the store call under the caller's `Context`,
//! then tag either the outcome or the error. The span is attached with
//! `Instrument`, so it is closed exactly once when the future completes or is
//! dropped, whichever exit path is taken.

use crate::context::{Context, Interrupted};
use crate::error::{DbError, StoreError};
use crate::store::DocumentCollection;
use bson::{Bson, Document};
use tracing::field::{debug, display, Empty};
use tracing::{Instrument, Span};

/// Runs `filter` against `collection` and returns every matching document.
///
/// The cursor is drained before returning; callers never see a live cursor.
pub async fn run_query(
    ctx: &Context,
    collection: &dyn DocumentCollection,
    filter: Document,
) -> Result<Vec<Document>, DbError> {
    let span = tracing::info_span!(
        "Mongo.RunQuery",
        collection = collection.name(),
        database = collection.database_name(),
        query = %filter,
        error = Empty,
        results.count = Empty,
        results.raw = Empty,
    );

    async move {
        let span = Span::current();
        let outcome = ctx.run(collection.find_all(filter)).await;
        let results = match settle(outcome, DbError::QueryError) {
            Ok(results) => results,
            Err(e) => {
                span.record("error", display(&e));
                return Err(e);
            }
        };

        span.record("results.count", results.len());
        span.record("results.raw", debug(&results));
        Ok(results)
    }
    .instrument(span)
    .await
}

/// Inserts a single document and returns the identifier the store assigned.
pub async fn write_object(
    ctx: &Context,
    collection: &dyn DocumentCollection,
    object: Document,
) -> Result<Bson, DbError> {
    let span = tracing::info_span!(
        "Mongo.WriteObject",
        collection = collection.name(),
        database = collection.database_name(),
        object = %object,
        error = Empty,
        id = Empty,
    );

    async move {
        let span = Span::current();
        let outcome = ctx.run(collection.insert_one(object)).await;
        let id = match settle(outcome, DbError::WriteError) {
            Ok(id) => id,
            Err(e) => {
                span.record("error", display(&e));
                return Err(e);
            }
        };

        span.record("id", display(&id));
        Ok(id)
    }
    .instrument(span)
    .await
}

/// Deletes at most one document matching `filter`.
///
/// Returns the number actually removed; a filter that matches nothing is
/// not an error and yields zero.
pub async fn delete_object(
    ctx: &Context,
    collection: &dyn DocumentCollection,
    filter: Document,
) -> Result<u64, DbError> {
    let span = tracing::info_span!(
        "Mongo.DeleteDbObject",
        collection = collection.name(),
        database = collection.database_name(),
        query = %filter,
        error = Empty,
        deleted_count = Empty,
    );

    async move {
        let span = Span::current();
        let outcome = ctx.run(collection.delete_one(filter)).await;
        let deleted = match settle(outcome, DbError::DeleteError) {
            Ok(deleted) => deleted,
            Err(e) => {
                span.record("error", display(&e));
                return Err(e);
            }
        };

        span.record("deleted_count", deleted);
        Ok(deleted)
    }
    .instrument(span)
    .await
}

/// Flattens a context-guarded store call into a single `DbError` result.
fn settle<T>(
    outcome: Result<Result<T, StoreError>, Interrupted>,
    wrap: fn(StoreError) -> DbError,
) -> Result<T, DbError> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(wrap(e)),
        Err(reason) => Err(reason.into()),
    }
}
