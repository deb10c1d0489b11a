use serde::{Deserialize, Serialize};

/// A labelled audio segment within a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub id: i64,
    pub job_id: i64,
    pub start: Option<String>,
    pub end: Option<String>,
    pub color: Option<String>,
    pub name: Option<String>,
    pub transcription: Option<String>,
    pub labels: Vec<AnnotationData>,
    pub created_ts: i64,
    pub updated_ts: i64,
}

/// Copy of a label taken when the annotation was written
///
/// `label_id` points back at the source label while it exists; the name is
/// a copy, so renaming or deleting the label leaves the annotation as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationData {
    pub id: i64,
    pub label_id: Option<i64>,
    pub name: String,
    pub attributes: Vec<AnnotationAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationAttribute {
    pub id: i64,
    pub attribute_id: Option<i64>,
    pub name: String,
    pub values: Vec<String>,
}

/// Annotation create/update payload
///
/// An update replaces everything: scalar fields and the whole label list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPayload {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default, alias = "label")]
    pub labels: Vec<AnnotationLabelPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLabelPayload {
    #[serde(alias = "id")]
    pub label_id: i64,
    #[serde(default)]
    pub attributes: Vec<AnnotationAttributePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationAttributePayload {
    #[serde(alias = "id")]
    pub attribute_id: i64,
    #[serde(default)]
    pub values: Vec<String>,
}

impl AnnotationLabelPayload {
    pub fn new(label_id: i64) -> Self {
        Self {
            label_id,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute_id: i64, values: &[&str]) -> Self {
        self.attributes.push(AnnotationAttributePayload {
            attribute_id,
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }
}
