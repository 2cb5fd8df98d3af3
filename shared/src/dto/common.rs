use crate::dto::lenient::{self, FieldVariants};
use crate::error::{ClientError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys accepted in place of the resource's own collection key.
const FALLBACK_COLLECTION_KEYS: [&str; 2] = ["items", "data"];

/// Server-declared pagination block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    #[serde(default)]
    pub current: u32,
    /// Zero when the server omits it; the requested size is used instead.
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl FieldVariants for PaginationDto {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])] = &[
        ("current", &["page", "currentPage"]),
        ("pageSize", &["limit", "page_size", "perPage"]),
        ("total", &["totalItems", "totalCount"]),
        ("totalPages", &["total_pages"]),
    ];
}

/// Server-declared aggregate block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub unique_customers: u64,
    #[serde(default)]
    pub average_amount: Option<f64>,
}

impl FieldVariants for StatsDto {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])] = &[
        ("totalAmount", &["totalRevenue", "total_amount"]),
        ("totalCount", &["totalTickets", "total_count"]),
        ("uniqueCustomers", &["unique_customers", "uniqueCustomerCount"]),
        ("averageAmount", &["averageTicketPrice", "average_amount"]),
    ];
}

/// Raw list response: one record array plus optional pagination, stats and
/// metadata blocks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEnvelope {
    #[serde(default)]
    pub pagination: Option<PaginationDto>,
    #[serde(default)]
    pub stats: Option<StatsDto>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub collections: Map<String, Value>,
}

impl ListEnvelope {
    /// Parses a list response body. A bare JSON array is taken as the
    /// collection itself, with no pagination or stats.
    pub fn parse(body: &str, collection: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        match value {
            Value::Array(records) => {
                let mut collections = Map::new();
                collections.insert(collection.to_string(), Value::Array(records));
                Ok(ListEnvelope {
                    collections,
                    ..Default::default()
                })
            }
            Value::Object(mut map) => {
                for (key, variants) in [
                    ("pagination", PaginationDto::VARIANTS),
                    ("stats", StatsDto::VARIANTS),
                ] {
                    if let Some(block) = map.remove(key) {
                        map.insert(key.to_string(), lenient::canonicalize(block, variants));
                    }
                }
                Ok(serde_json::from_value(Value::Object(map))?)
            }
            other => Err(ClientError::Decode(format!(
                "expected a JSON object or array, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Removes and decodes the record array stored under `collection`, or
    /// under `items`/`data` when the backend uses a generic key.
    pub fn take_records<T>(&mut self, collection: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + FieldVariants,
    {
        let key = std::iter::once(collection)
            .chain(FALLBACK_COLLECTION_KEYS)
            .find(|key| self.collections.contains_key(*key))
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::Decode(format!("response has no `{}` array", collection))
            })?;

        match self.collections.remove(&key) {
            Some(Value::Array(records)) => records
                .into_iter()
                .map(|record| lenient::decode_record(record).map_err(ClientError::from))
                .collect(),
            Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(ClientError::Decode(format!(
                "`{}` should be an array, got {}",
                key,
                json_kind(&other)
            ))),
            None => Ok(Vec::new()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn default_success() -> bool {
    true
}

/// Body of POST/PUT/DELETE responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Missing means the 2xx status alone signals success.
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl MutationResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
        }
    }

    /// Turns `success: false` into a user-visible error.
    pub fn into_result(self) -> Result<MutationResponse> {
        if self.success {
            Ok(self)
        } else {
            let message = self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "The request could not be completed.".to_string());
            Err(ClientError::Rejected(message))
        }
    }
}
