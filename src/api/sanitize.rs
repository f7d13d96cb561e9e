use serde_json::Value;

/// Strips the embedded CI configuration source from an API payload.
///
/// Build-detail responses carry the project's full `circle_yml` source,
/// which is large and of no use to any consumer here. Non-object payloads
/// and payloads without the key pass through unchanged.
pub fn scrub(mut payload: Value) -> Value {
    if let Some(map) = payload.as_object_mut() {
        map.remove("circle_yml");
    }
    payload
}
