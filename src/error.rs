use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("no free code left for base {base}")]
    CodeSpaceExhausted { base: String },

    #[error("composition must have at least one ingredient")]
    EmptyComposition,

    #[error("ingredient #{index} has no food extid")]
    MissingFoodReference { index: usize },

    #[error("ingredient #{index} grams must be greater than 0 (got {grams:?})")]
    InvalidQuantity { index: usize, grams: Option<i32> },

    #[error("food not found: {}", .extids.join(", "))]
    FoodNotFound { extids: Vec<String> },

    #[error("food is not mixable: {name} ({extid})")]
    NonMixableFood { extid: String, name: String },

    #[error("salad needs at least {required} foundation ingredient(s), found {found}")]
    InsufficientFoundation { found: usize, required: usize },

    #[error("{entity} not found: {extid}")]
    NotFound { entity: &'static str, extid: String },

    #[error("store failure")]
    StoreFailure(#[source] anyhow::Error),
}

impl Error {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, extid: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            extid: extid.into(),
        }
    }

    /// Renames the entity of a `NotFound`, leaving other errors alone.
    pub fn for_entity(self, entity: &'static str) -> Self {
        match self {
            Error::NotFound { extid, .. } => Error::NotFound { entity, extid },
            other => other,
        }
    }

    /// Stable machine-readable code, used as the `error` field of responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput { .. } => "INVALID_INPUT",
            Error::CodeSpaceExhausted { .. } => "CODE_SPACE_EXHAUSTED",
            Error::EmptyComposition => "EMPTY_COMPOSITION",
            Error::MissingFoodReference { .. } => "MISSING_FOOD_REFERENCE",
            Error::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Error::FoodNotFound { .. } => "FOOD_NOT_FOUND",
            Error::NonMixableFood { .. } => "NON_MIXABLE_FOOD",
            Error::InsufficientFoundation { .. } => "INSUFFICIENT_FOUNDATION",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::StoreFailure(_) => "STORE_FAILURE",
        }
    }

    /// Request field a client has to fix, when there is one.
    pub fn field(&self) -> Option<String> {
        match self {
            Error::InvalidInput { field, .. } => Some((*field).to_string()),
            Error::EmptyComposition => Some("ingredients".into()),
            Error::MissingFoodReference { index } => Some(format!("ingredients[{index}].food_extid")),
            Error::InvalidQuantity { index, .. } => Some(format!("ingredients[{index}].grams")),
            Error::FoodNotFound { .. }
            | Error::NonMixableFood { .. }
            | Error::InsufficientFoundation { .. } => Some("ingredients".into()),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::CodeSpaceExhausted { .. } => StatusCode::CONFLICT,
            Error::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Partial unique indexes on `code` are named `<table>_live_code`.
const LIVE_CODE_INDEX_SUFFIX: &str = "_live_code";

fn is_live_code_index(constraint: Option<&str>) -> bool {
    constraint.is_some_and(|c| c.ends_with(LIVE_CODE_INDEX_SUFFIX))
}

impl From<anyhow::Error> for Error {
    /// A code taken by a concurrent insert arrives as a unique violation.
    fn from(e: anyhow::Error) -> Self {
        if let Some(sqlx::Error::Database(db)) = e.downcast_ref::<sqlx::Error>() {
            if db.is_unique_violation() && is_live_code_index(db.constraint()) {
                return Error::invalid("code", "is already in use");
            }
        }
        Error::StoreFailure(e)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Error::StoreFailure(e) => {
                error!(error = ?e, "store failure");
                "Unable to complete the request".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "error": self.code(),
            "message": message,
            "field": self.field(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_requests_with_a_field() {
        let err = Error::InvalidQuantity {
            index: 2,
            grams: Some(0),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_QUANTITY");
        assert_eq!(err.field().as_deref(), Some("ingredients[2].grams"));
    }

    #[test]
    fn store_failure_hides_detail() {
        let err = Error::from(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "store failure");
        assert!(err.field().is_none());
    }

    #[test]
    fn only_live_code_indexes_count_as_code_conflicts() {
        assert!(is_live_code_index(Some("food_live_code")));
        assert!(is_live_code_index(Some("company_live_code")));
        assert!(!is_live_code_index(Some("food_extid_key")));
        assert!(!is_live_code_index(None));
    }

    #[derive(Debug)]
    struct UniqueViolation(&'static str);

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint {:?}", self.0)
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }
        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    fn from_store(constraint: &'static str) -> Error {
        let db = sqlx::Error::Database(Box::new(UniqueViolation(constraint)));
        Error::from(anyhow::Error::new(db).context("insert food"))
    }

    #[test]
    fn lost_code_race_is_a_bad_request_on_code() {
        let err = from_store("food_live_code");
        assert!(matches!(err, Error::InvalidInput { field: "code", .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_unique_violations_stay_store_failures() {
        assert!(matches!(from_store("food_extid_key"), Error::StoreFailure(_)));
    }

    #[test]
    fn wrapped_non_database_errors_stay_store_failures() {
        let err = Error::from(anyhow::Error::new(sqlx::Error::RowNotFound).context("insert food"));
        assert!(matches!(err, Error::StoreFailure(_)));
    }

    #[test]
    fn food_not_found_lists_every_id() {
        let err = Error::FoodNotFound {
            extids: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "food not found: a, b");
    }

    #[test]
    fn not_found_maps_to_404() {
        let res = Error::not_found("Mixture", "x").into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
