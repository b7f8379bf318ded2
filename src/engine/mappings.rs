//! Default item index mappings and settings.
//!
//! Only engines that cannot rely on server-side index templates receive
//! these with every create request.

use serde_json::{Value, json};

/// Field mappings of an item index.
pub fn item_mappings() -> Value {
    json!({
        "numeric_detection": false,
        "dynamic_templates": [
            {
                "descriptions": {
                    "match_mapping_type": "string",
                    "match": "description",
                    "mapping": {"type": "text"}
                }
            },
            {
                "numerics": {
                    "match_mapping_type": "long",
                    "mapping": {"type": "float"}
                }
            },
            {
                "strings": {
                    "match_mapping_type": "string",
                    "mapping": {"type": "keyword"}
                }
            }
        ],
        "properties": {
            "id": {"type": "keyword"},
            "collection": {"type": "keyword"},
            "geometry": {"type": "geo_shape"},
            "assets": {"type": "object", "enabled": false},
            "links": {"type": "object", "enabled": false},
            "properties": {
                "type": "object",
                "properties": {
                    "datetime": {"type": "date"},
                    "start_datetime": {"type": "date"},
                    "end_datetime": {"type": "date"},
                    "created": {"type": "date"},
                    "updated": {"type": "date"}
                }
            }
        }
    })
}

/// Index settings of an item index.
pub fn item_settings() -> Value {
    json!({
        "index": {
            "sort.field": "properties.datetime",
            "sort.order": "desc"
        }
    })
}
