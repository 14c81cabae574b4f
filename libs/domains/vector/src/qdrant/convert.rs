//! Conversions between local records and Qdrant's protobuf types.

use std::collections::HashMap;

use qdrant_client::qdrant::{
    self, ListValue, PointId, Struct, Value as QdrantValue, point_id::PointIdOptions,
    value::Kind,
};
use uuid::Uuid;

use crate::error::{VectorError, VectorResult};
use crate::models::Payload;

/// Qdrant ids are UUIDs or unsigned integers; anything else is rejected.
pub(super) fn to_point_id(id: &str) -> VectorResult<PointId> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(PointId::from(uuid.to_string()));
    }
    if let Ok(num) = id.parse::<u64>() {
        return Ok(PointId::from(num));
    }

    Err(VectorError::InvalidArgument(format!(
        "Qdrant record ids must be UUIDs or unsigned integers, got '{}'",
        id
    )))
}

pub(super) fn from_point_id(point_id: &PointId) -> VectorResult<String> {
    match &point_id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => Ok(uuid.clone()),
        Some(PointIdOptions::Num(num)) => Ok(num.to_string()),
        None => Err(VectorError::Internal("Missing point ID".to_string())),
    }
}

/// Canonical id string, so returned ids match what the service stores.
pub(super) fn canonical_id(id: &str) -> VectorResult<String> {
    from_point_id(&to_point_id(id)?)
}

pub(super) fn payload_to_qdrant(payload: Payload) -> HashMap<String, QdrantValue> {
    payload
        .into_iter()
        .map(|(key, value)| (key, json_to_qdrant_value(value)))
        .collect()
}

pub(super) fn qdrant_to_payload(payload: HashMap<String, QdrantValue>) -> Payload {
    payload
        .into_iter()
        .map(|(key, value)| (key, qdrant_value_to_json(value)))
        .collect()
}

fn json_to_qdrant_value(val: serde_json::Value) -> QdrantValue {
    let kind = match val {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Kind::StringValue(s),
        serde_json::Value::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qdrant_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(Struct {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, json_to_qdrant_value(v)))
                .collect(),
        }),
    };

    QdrantValue { kind: Some(kind) }
}

fn qdrant_value_to_json(val: QdrantValue) -> serde_json::Value {
    match val.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qdrant_value_to_json).collect())
        }
        Some(Kind::StructValue(st)) => serde_json::Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_value_to_json(v)))
                .collect(),
        ),
    }
}

/// Dense vector from a point's vectors output.
///
/// Uses the deprecated `data` field until the client exposes a stable accessor.
#[allow(deprecated)]
pub(super) fn vector_from_output(vectors: &Option<qdrant::VectorsOutput>) -> Option<Vec<f32>> {
    match vectors {
        Some(qdrant::VectorsOutput {
            vectors_options: Some(opts),
        }) => match opts {
            qdrant::vectors_output::VectorsOptions::Vector(v) => Some(v.data.clone()),
            qdrant::vectors_output::VectorsOptions::Vectors(map) => {
                map.vectors.values().next().map(|v| v.data.clone())
            }
        },
        _ => None,
    }
}

/// Vector size configured on a collection, if it uses a single dense vector.
pub(super) fn configured_dimension(info: &qdrant::CollectionInfo) -> Option<usize> {
    let vectors_config = info.config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;

    match vectors_config.config.as_ref()? {
        qdrant::vectors_config::Config::Params(p) => Some(p.size as usize),
        qdrant::vectors_config::Config::ParamsMap(map) => {
            map.map.values().next().map(|p| p.size as usize)
        }
    }
}
