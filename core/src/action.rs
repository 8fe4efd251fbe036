//! CRUD action vocabulary.
//!
//! Hosts hand actions over as a string tag plus a JSON parameter bag.
//! `RestAction::from_parts` is the only place a tag can be rejected; the
//! translators match on the typed enum and cannot see an unknown action.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{Pagination, Record, RecordId, Sort};

/// Wire names of the six CRUD actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    GetList,
    GetOne,
    GetMany,
    Create,
    Update,
    Delete,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::GetList => "GET_LIST",
            ActionKind::GetOne => "GET_ONE",
            ActionKind::GetMany => "GET_MANY",
            ActionKind::Create => "CREATE",
            ActionKind::Update => "UPDATE",
            ActionKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ApiError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "GET_LIST" => Ok(ActionKind::GetList),
            "GET_ONE" => Ok(ActionKind::GetOne),
            "GET_MANY" => Ok(ActionKind::GetMany),
            "CREATE" => Ok(ActionKind::Create),
            "UPDATE" => Ok(ActionKind::Update),
            "DELETE" => Ok(ActionKind::Delete),
            other => Err(ApiError::UnsupportedAction(other.to_string())),
        }
    }
}

/// A CRUD action together with the parameters its tag requires.
#[derive(Debug, Clone, PartialEq)]
pub enum RestAction {
    GetList {
        pagination: Pagination,
        sort: Sort,
        filter: Record,
    },
    GetOne {
        id: RecordId,
    },
    GetMany {
        ids: Vec<RecordId>,
    },
    Create {
        data: Record,
    },
    Update {
        id: RecordId,
        data: Record,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Deserialize)]
struct ListParams {
    pagination: Pagination,
    sort: Sort,
    #[serde(default)]
    filter: Record,
}

#[derive(Deserialize)]
struct IdParams {
    id: RecordId,
}

#[derive(Deserialize)]
struct ManyParams {
    ids: Vec<RecordId>,
}

#[derive(Deserialize)]
struct CreateParams {
    data: Record,
}

#[derive(Deserialize)]
struct UpdateParams {
    id: RecordId,
    data: Record,
}

impl RestAction {
    /// Parse a host tag and its parameter bag. Unknown keys in `params` are
    /// ignored.
    pub fn from_parts(tag: &str, params: Value) -> Result<Self, ApiError> {
        let kind: ActionKind = tag.parse()?;
        let action = match kind {
            ActionKind::GetList => {
                let p: ListParams = params_for(kind, params)?;
                RestAction::GetList {
                    pagination: p.pagination,
                    sort: p.sort,
                    filter: p.filter,
                }
            }
            ActionKind::GetOne => RestAction::GetOne {
                id: params_for::<IdParams>(kind, params)?.id,
            },
            ActionKind::GetMany => RestAction::GetMany {
                ids: params_for::<ManyParams>(kind, params)?.ids,
            },
            ActionKind::Create => RestAction::Create {
                data: params_for::<CreateParams>(kind, params)?.data,
            },
            ActionKind::Update => {
                let p: UpdateParams = params_for(kind, params)?;
                RestAction::Update { id: p.id, data: p.data }
            }
            ActionKind::Delete => RestAction::Delete {
                id: params_for::<IdParams>(kind, params)?.id,
            },
        };
        Ok(action)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            RestAction::GetList { .. } => ActionKind::GetList,
            RestAction::GetOne { .. } => ActionKind::GetOne,
            RestAction::GetMany { .. } => ActionKind::GetMany,
            RestAction::Create { .. } => ActionKind::Create,
            RestAction::Update { .. } => ActionKind::Update,
            RestAction::Delete { .. } => ActionKind::Delete,
        }
    }
}

fn params_for<T: DeserializeOwned>(kind: ActionKind, params: Value) -> Result<T, ApiError> {
    serde_json::from_value(params).map_err(|e| ApiError::InvalidParams {
        action: kind.to_string(),
        message: e.to_string(),
    })
}
