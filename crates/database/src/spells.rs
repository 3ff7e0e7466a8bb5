use crate::context::Context;
use crate::error::{DbError, StoreError};
use crate::primitives::{delete_object, run_query, write_object};
use crate::store::{ConnectionCapability, DocumentCollection};
use bson::Document;
use std::sync::Arc;
use tracing::field::{debug, display, Empty};
use tracing::{Instrument, Span};

pub const SPELL_DATABASE: &str = "spellapi";
pub const SPELL_COLLECTION: &str = "spells";

/// The `SpellRepository` is the application-facing entry point for spells.
///
/// It binds the instrumented primitives to the `spellapi.spells` collection
/// and wraps each call in its own span, so every request shows up as a
/// domain span with the mechanical store span nested inside it.
#[derive(Clone)]
pub struct SpellRepository {
    connection: Arc<dyn ConnectionCapability>,
}

impl SpellRepository {
    /// Creates a new `SpellRepository` over a shared store connection.
    pub fn new(connection: Arc<dyn ConnectionCapability>) -> Self {
        Self { connection }
    }

    fn spells(&self) -> Arc<dyn DocumentCollection> {
        self.connection
            .database(SPELL_DATABASE)
            .collection(SPELL_COLLECTION)
    }

    /// Fetches every spell matching `search`.
    pub async fn get_spell(
        &self,
        ctx: &Context,
        search: Document,
    ) -> Result<Vec<Document>, DbError> {
        let span = tracing::info_span!(
            "Mongo.GetSpell",
            query = %search,
            result = Empty,
            error = Empty,
        );

        async move {
            let span = Span::current();
            let collection = self.spells();

            let result = run_query(ctx, collection.as_ref(), search)
                .await
                .inspect_err(|e| {
                    span.record("error", display(e));
                })?;

            span.record("result", debug(&result));
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Stores one spell given as a raw BSON document.
    ///
    /// The identifier generated by the store only appears on the write span;
    /// it is not returned.
    pub async fn add_spell(&self, ctx: &Context, spell: &[u8]) -> Result<(), DbError> {
        let span = tracing::info_span!(
            "Mongo.AddSpell",
            spell.bytes = spell.len(),
            spell = Empty,
            error = Empty,
        );

        async move {
            let span = Span::current();

            let document = bson::from_slice::<Document>(spell)
                .map_err(|e| DbError::WriteError(StoreError::Decode(e)))
                .inspect_err(|e| {
                    span.record("error", display(e));
                })?;
            span.record("spell", display(&document));

            let collection = self.spells();
            write_object(ctx, collection.as_ref(), document)
                .await
                .inspect_err(|e| {
                    span.record("error", display(e));
                })?;

            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Deletes the first spell matching `spell`. Matching nothing is fine.
    pub async fn delete_spell(&self, ctx: &Context, spell: Document) -> Result<(), DbError> {
        let span = tracing::info_span!(
            "Mongo.DeleteSpell",
            spell = %spell,
            error = Empty,
        );

        async move {
            let span = Span::current();
            let collection = self.spells();

            delete_object(ctx, collection.as_ref(), spell)
                .await
                .inspect_err(|e| {
                    span.record("error", display(e));
                })?;

            Ok(())
        }
        .instrument(span)
        .await
    }
}
