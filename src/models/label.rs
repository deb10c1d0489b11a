use serde::{Deserialize, Serialize};

/// The entity a label is bound to
///
/// A label belongs to a project or directly to a task, never both. Tasks
/// that belong to a project take their labels from the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LabelOwner {
    Project(i64),
    Task(i64),
}

impl LabelOwner {
    /// Build from the two nullable owner columns
    pub fn from_columns(project_id: Option<i64>, task_id: Option<i64>) -> Option<Self> {
        match (project_id, task_id) {
            (Some(id), None) => Some(LabelOwner::Project(id)),
            (None, Some(id)) => Some(LabelOwner::Task(id)),
            _ => None,
        }
    }

    pub fn project_id(&self) -> Option<i64> {
        match self {
            LabelOwner::Project(id) => Some(*id),
            LabelOwner::Task(_) => None,
        }
    }

    pub fn task_id(&self) -> Option<i64> {
        match self {
            LabelOwner::Task(id) => Some(*id),
            LabelOwner::Project(_) => None,
        }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            LabelOwner::Project(_) => "Project",
            LabelOwner::Task(_) => "Task",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            LabelOwner::Project(id) | LabelOwner::Task(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    #[default]
    Any,
}

impl LabelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelType::Any => "any",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "any" => Some(LabelType::Any),
            _ => None,
        }
    }
}

/// How an attribute is picked in the annotation UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Select,
    Radio,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Select => "select",
            InputType::Radio => "radio",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "select" => Some(InputType::Select),
            "radio" => Some(InputType::Radio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub id: i64,
    pub label_id: i64,
    pub name: String,
    pub mutable: bool,
    pub input_type: InputType,
    pub default_value: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub id: i64,
    pub owner: LabelOwner,
    pub name: String,
    pub label_type: LabelType,
    pub attributes: Vec<Attribute>,
    pub created_ts: i64,
    pub updated_ts: i64,
}

impl Label {
    pub fn attribute(&self, attribute_id: i64) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == attribute_id)
    }
}

/// Label write payload
///
/// With an `id` it updates that label; fields left out keep their value.
/// `attributes: None` leaves the attribute list alone, `Some(list)` replaces
/// it: listed ids are updated, new entries created, the rest deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label_type: Option<LabelType>,
    #[serde(default)]
    pub attributes: Option<Vec<AttributePayload>>,
}

impl LabelPayload {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<AttributePayload>) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributePayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mutable: Option<bool>,
    #[serde(default)]
    pub input_type: Option<InputType>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl AttributePayload {
    pub fn named(name: &str, values: &[&str]) -> Self {
        Self {
            name: Some(name.to_string()),
            values: Some(values.iter().map(|v| v.to_string()).collect()),
            ..Self::default()
        }
    }
}

/// Encode a value list for storage
pub fn encode_values(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a stored value list
///
/// Accepts JSON arrays and the older bracketed form with single quotes
/// (`['male', 'female']`). A bare non-empty string is a one-element list.
pub fn decode_values(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    if let Ok(values) = serde_json::from_str::<Vec<String>>(raw) {
        return values;
    }
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        return values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }
    match raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(inner) => split_legacy_list(inner),
        None => vec![raw.to_string()],
    }
}

/// Items of a bracketed list; quoted items may contain commas
fn split_legacy_list(inner: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        let Some(&first) = chars.peek() else { break };

        let item = if first == '\'' || first == '"' {
            chars.next();
            let mut item = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => item.extend(chars.next()),
                    c if c == first => break,
                    c => item.push(c),
                }
            }
            // Skip anything between the closing quote and the next comma
            while chars.next_if(|c| *c != ',').is_some() {}
            item
        } else {
            let mut item = String::new();
            while let Some(c) = chars.next_if(|c| *c != ',') {
                item.push(c);
            }
            item.trim().to_string()
        };
        if !item.is_empty() {
            items.push(item);
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_from_columns() {
        assert_eq!(LabelOwner::from_columns(Some(1), None), Some(LabelOwner::Project(1)));
        assert_eq!(LabelOwner::from_columns(None, Some(2)), Some(LabelOwner::Task(2)));
        assert_eq!(LabelOwner::from_columns(Some(1), Some(2)), None);
        assert_eq!(LabelOwner::from_columns(None, None), None);
    }

    #[test]
    fn test_owner_serializes_as_tagged() {
        let json = serde_json::to_value(LabelOwner::Task(4)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "task", "id": 4}));
    }

    #[test]
    fn test_decode_json_values() {
        assert_eq!(decode_values(r#"["male","female"]"#), vec!["male", "female"]);
        assert_eq!(decode_values("[1, 2]"), vec!["1", "2"]);
        assert!(decode_values("").is_empty());
        assert!(decode_values("[]").is_empty());
    }

    #[test]
    fn test_decode_legacy_values() {
        assert_eq!(decode_values("['male', 'female']"), vec!["male", "female"]);
        assert_eq!(decode_values("neutral"), vec!["neutral"]);
    }

    #[test]
    fn test_decode_legacy_values_with_commas() {
        assert_eq!(decode_values("['a, b', 'c']"), vec!["a, b", "c"]);
        assert_eq!(decode_values(r#"['it\'s', "x,y"]"#), vec!["it's", "x,y"]);
        assert_eq!(decode_values("[low, high]"), vec!["low", "high"]);
    }

    #[test]
    fn test_encode_values_is_json() {
        let encoded = encode_values(&["a".to_string(), "b'c".to_string()]);
        assert_eq!(encoded, r#"["a","b'c"]"#);
        assert_eq!(decode_values(&encoded), vec!["a", "b'c"]);
    }

    #[test]
    fn test_label_payload_attributes_absent_vs_empty() {
        let absent: LabelPayload = serde_json::from_str(r#"{"name": "speaker"}"#).unwrap();
        assert!(absent.attributes.is_none());
        let empty: LabelPayload = serde_json::from_str(r#"{"name": "speaker", "attributes": []}"#).unwrap();
        assert_eq!(empty.attributes, Some(vec![]));
    }
}
