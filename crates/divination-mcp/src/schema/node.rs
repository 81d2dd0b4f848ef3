//! Schema tree and its JSON Schema rendering.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Boolean,
    Array {
        items: Box<SchemaNode>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        fields: Vec<Field>,
    },
}

/// A named member of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: SchemaNode,
    pub required: bool,
    /// Value filled in when an optional field is absent.
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Accepts `null` in addition to the kind.
    pub nullable: bool,
}

impl SchemaNode {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            title: None,
            description: None,
            nullable: false,
        }
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number {
            minimum: None,
            maximum: None,
        })
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String {
            min_length: None,
            max_length: None,
        })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: SchemaNode) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    pub fn object() -> Self {
        Self::of(SchemaKind::Object { fields: Vec::new() })
    }

    /// Inclusive bounds for integer and number nodes. No effect on other kinds.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        match &mut self.kind {
            SchemaKind::Integer { minimum, maximum } => {
                *minimum = Some(min);
                *maximum = Some(max);
            }
            SchemaKind::Number { minimum, maximum } => {
                *minimum = Some(min as f64);
                *maximum = Some(max as f64);
            }
            _ => {}
        }
        self
    }

    /// Inclusive length bounds for string and array nodes. No effect on other kinds.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        match &mut self.kind {
            SchemaKind::String {
                min_length,
                max_length,
            } => {
                *min_length = Some(min);
                *max_length = Some(max);
            }
            SchemaKind::Array {
                min_items,
                max_items,
                ..
            } => {
                *min_items = Some(min);
                *max_items = Some(max);
            }
            _ => {}
        }
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Append a required field. No effect on non-object nodes.
    pub fn field(self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.push_field(Field {
            name: name.into(),
            schema,
            required: true,
            default: None,
        })
    }

    /// Append an optional field. No effect on non-object nodes.
    pub fn optional_field(
        self,
        name: impl Into<String>,
        schema: SchemaNode,
        default: Option<Value>,
    ) -> Self {
        self.push_field(Field {
            name: name.into(),
            schema,
            required: false,
            default,
        })
    }

    fn push_field(mut self, field: Field) -> Self {
        if let SchemaKind::Object { fields } = &mut self.kind {
            fields.push(field);
        }
        self
    }

    /// Short name of the expected JSON type, used in error reasons.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SchemaKind::Integer { .. } => "integer",
            SchemaKind::Number { .. } => "number",
            SchemaKind::String { .. } => "string",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object { .. } => "object",
        }
    }

    /// Render as a JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        let mut body = Map::new();
        body.insert("type".into(), json!(self.type_name()));

        match &self.kind {
            SchemaKind::Integer { minimum, maximum } => {
                if let Some(min) = minimum {
                    body.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    body.insert("maximum".into(), json!(max));
                }
            }
            SchemaKind::Number { minimum, maximum } => {
                if let Some(min) = minimum {
                    body.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    body.insert("maximum".into(), json!(max));
                }
            }
            SchemaKind::String {
                min_length,
                max_length,
            } => {
                if let Some(min) = min_length {
                    body.insert("minLength".into(), json!(min));
                }
                if let Some(max) = max_length {
                    body.insert("maxLength".into(), json!(max));
                }
            }
            SchemaKind::Boolean => {}
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                body.insert("items".into(), items.to_json_schema());
                if let Some(min) = min_items {
                    body.insert("minItems".into(), json!(min));
                }
                if let Some(max) = max_items {
                    body.insert("maxItems".into(), json!(max));
                }
            }
            SchemaKind::Object { fields } => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    let mut prop = field.schema.to_json_schema();
                    if let (Some(default), Some(obj)) = (&field.default, prop.as_object_mut()) {
                        obj.insert("default".into(), default.clone());
                    }
                    properties.insert(field.name.clone(), prop);
                    if field.required {
                        required.push(json!(field.name));
                    }
                }
                body.insert("properties".into(), Value::Object(properties));
                body.insert("required".into(), Value::Array(required));
            }
        }

        let mut out = if self.nullable {
            let mut wrapper = Map::new();
            wrapper.insert(
                "anyOf".into(),
                json!([Value::Object(body), { "type": "null" }]),
            );
            wrapper
        } else {
            body
        };
        if let Some(title) = &self.title {
            out.insert("title".into(), json!(title));
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        Value::Object(out)
    }
}
