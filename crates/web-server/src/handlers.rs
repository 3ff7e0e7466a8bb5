use crate::{error::AppError, AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use database::bson::{self, Bson, Document};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// # GET /api/spells?name=Fireball
/// Every query parameter becomes an equality condition. Values that parse as
/// integers are matched as numbers, everything else as strings.
pub async fn get_spells(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<JsonValue>>, AppError> {
    let spells = state
        .spells
        .get_spell(&state.context(), filter_from_params(params))
        .await?;

    let body = spells
        .into_iter()
        .map(|spell| Bson::Document(spell).into_relaxed_extjson())
        .collect();
    Ok(Json(body))
}

/// # POST /api/spells
/// Takes one JSON object and stores it as a spell.
pub async fn add_spell(
    State(state): State<Arc<AppState>>,
    Json(body): Json<JsonValue>,
) -> Result<StatusCode, AppError> {
    if !body.is_object() {
        return Err(AppError::InvalidSpell(
            "a spell must be a JSON object".to_string(),
        ));
    }
    let document =
        bson::to_document(&body).map_err(|e| AppError::InvalidSpell(e.to_string()))?;
    let raw = bson::to_vec(&document).map_err(|e| AppError::InvalidSpell(e.to_string()))?;

    state.spells.add_spell(&state.context(), &raw).await?;
    Ok(StatusCode::CREATED)
}

/// # DELETE /api/spells?name=Fireball
/// Removes the first matching spell. Succeeds even when nothing matched.
pub async fn delete_spell(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<StatusCode, AppError> {
    state
        .spells
        .delete_spell(&state.context(), filter_from_params(params))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn filter_from_params(params: HashMap<String, String>) -> Document {
    params
        .into_iter()
        .map(|(field, value)| {
            let value = match value.parse::<i64>() {
                Ok(number) => Bson::Int64(number),
                Err(_) => Bson::String(value),
            };
            (field, value)
        })
        .collect()
}
