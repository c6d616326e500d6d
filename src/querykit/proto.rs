//! Protobuf messages of the `querykit.QueryKit` service.

/// Type tag carried by every [`WireValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Float64 = 0,
    Int64 = 1,
    Uint64 = 2,
    Boolean = 3,
    String = 4,
    Binary = 5,
    Map = 6,
    Array = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Operator {
    Eq = 0,
    Gt = 1,
    Gte = 2,
    Lt = 3,
    Lte = 4,
}

/// Tagged, self-describing value. Scalars live in `value`; composites in `map` / `array`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WireValue {
    #[prost(enumeration = "DataType", tag = "1")]
    pub data_type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub map: Option<MapValue>,
    #[prost(message, optional, tag = "4")]
    pub array: Option<ArrayValue>,
}

impl WireValue {
    pub fn scalar(data_type: DataType, value: Vec<u8>) -> Self {
        WireValue {
            data_type: data_type as i32,
            value,
            map: None,
            array: None,
        }
    }

    pub fn map(fields: Vec<Field>) -> Self {
        WireValue {
            data_type: DataType::Map as i32,
            value: Vec::new(),
            map: Some(MapValue { fields }),
            array: None,
        }
    }

    pub fn array(elements: Vec<WireValue>) -> Self {
        WireValue {
            data_type: DataType::Array as i32,
            value: Vec::new(),
            map: None,
            array: Some(ArrayValue { elements }),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MapValue {
    #[prost(message, repeated, tag = "1")]
    pub fields: Vec<Field>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ArrayValue {
    #[prost(message, repeated, tag = "1")]
    pub elements: Vec<WireValue>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Field {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<WireValue>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Condition {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "Operator", tag = "2")]
    pub operator: i32,
    #[prost(message, optional, tag = "3")]
    pub value: Option<WireValue>,
    #[prost(message, repeated, tag = "4")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryRequest {
    #[prost(string, tag = "1")]
    pub table: String,
    #[prost(message, repeated, tag = "2")]
    pub conditions: Vec<Condition>,
    #[prost(int64, tag = "3")]
    pub limit: i64,
    #[prost(int64, tag = "4")]
    pub offset: i64,
    #[prost(string, tag = "5")]
    pub order_by: String,
    #[prost(bool, tag = "6")]
    pub descending: bool,
}

/// One result row: ordered `(name, value)` pairs.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Record {
    #[prost(message, repeated, tag = "1")]
    pub fields: Vec<Field>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryReply {
    #[prost(message, repeated, tag = "1")]
    pub records: Vec<Record>,
}
