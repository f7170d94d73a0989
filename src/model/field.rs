use serde::Deserialize;
use std::fmt;

/// Numeric id of a custom field, e.g. `10112`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u64);

impl FieldId {
    /// Key the field is stored under in issue JSON (`customfield_10112`).
    pub fn json_name(&self) -> String {
        format!("customfield_{}", self.0)
    }

    /// JQL clause addressing the field (`cf[10112]`).
    pub fn jql_clause(&self) -> String {
        format!("cf[{}]", self.0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema type of a custom field. Only the listed kinds can be queried for usage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SchemaType {
    Number,
    Any,
    String,
    Array,
    Date,
    Option,
    Other(String),
}

impl SchemaType {
    pub fn as_str(&self) -> &str {
        match self {
            SchemaType::Number => "number",
            SchemaType::Any => "any",
            SchemaType::String => "string",
            SchemaType::Array => "array",
            SchemaType::Date => "date",
            SchemaType::Option => "option",
            SchemaType::Other(s) => s,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, SchemaType::Other(_))
    }
}

impl From<String> for SchemaType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "number" => SchemaType::Number,
            "any" => SchemaType::Any,
            "string" => SchemaType::String,
            "array" => SchemaType::Array,
            "date" => SchemaType::Date,
            "option" => SchemaType::Option,
            _ => SchemaType::Other(s),
        }
    }
}

impl Default for SchemaType {
    fn default() -> Self {
        SchemaType::Other("unknown".into())
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `GET /rest/api/2/field`, system and custom fields alike.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub clause_names: Vec<String>,
    pub schema: Option<FieldSchema>,
}

#[derive(Debug, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type", default)]
    pub kind: Option<SchemaType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    pub id: String,
    pub name: String,
    pub clause_names: Vec<String>,
    pub schema_type: SchemaType,
}

impl CustomField {
    /// The JQL-usable clause name, if the tracker exposes one.
    pub fn clause_name(&self) -> Option<&str> {
        self.clause_names.first().map(String::as_str)
    }
}

/// Keep only custom fields and order them by id.
pub fn custom_fields_sorted(definitions: Vec<FieldDefinition>) -> Vec<CustomField> {
    let mut fields: Vec<CustomField> = definitions
        .into_iter()
        .filter(|d| d.custom)
        .map(|d| CustomField {
            id: d.id,
            name: d.name,
            clause_names: d.clause_names,
            schema_type: d.schema.and_then(|s| s.kind).unwrap_or_default(),
        })
        .collect();
    fields.sort_by(|a, b| a.id.cmp(&b.id));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_id_renders_json_and_jql_names() {
        let id = FieldId(10112);
        assert_eq!(id.json_name(), "customfield_10112");
        assert_eq!(id.jql_clause(), "cf[10112]");
    }

    #[test]
    fn parses_field_list_and_keeps_only_custom_fields_sorted() {
        let json = r#"[
            {"id":"customfield_10200","name":"Team","custom":true,"clauseNames":["cf[10200]","Team"],"schema":{"type":"option"}},
            {"id":"summary","name":"Summary","custom":false,"clauseNames":["summary"],"schema":{"type":"string"}},
            {"id":"customfield_10000","name":"Development","custom":true,"clauseNames":["cf[10000]"],"schema":{"type":"any"}},
            {"id":"customfield_10150","name":"Odd","custom":true,"clauseNames":["cf[10150]"]}
        ]"#;
        let defs: Vec<FieldDefinition> = serde_json::from_str(json).unwrap();
        let fields = custom_fields_sorted(defs);

        let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            ["customfield_10000", "customfield_10150", "customfield_10200"]
        );
        assert_eq!(fields[0].schema_type, SchemaType::Any);
        assert_eq!(fields[1].schema_type, SchemaType::Other("unknown".into()));
        assert_eq!(fields[2].clause_name(), Some("cf[10200]"));
    }

    #[test]
    fn unknown_schema_types_are_kept_verbatim() {
        let t: SchemaType = serde_json::from_str(r#""sd-customerrequesttype""#).unwrap();
        assert_eq!(t, SchemaType::Other("sd-customerrequesttype".into()));
        assert!(!t.is_supported());
        assert!(SchemaType::Date.is_supported());
    }
}
