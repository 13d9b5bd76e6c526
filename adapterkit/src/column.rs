use serde::{Deserialize, Serialize};

/// A column as reported by the cluster, with the host tool's type rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScyllaColumn {
    pub column: String,
    pub dtype: String,
    #[serde(default)]
    pub char_size: Option<u32>,
    #[serde(default)]
    pub numeric_precision: Option<u32>,
    #[serde(default)]
    pub numeric_scale: Option<u32>,
}

impl ScyllaColumn {
    pub fn new(column: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            dtype: dtype.into(),
            char_size: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self.dtype.to_lowercase().as_str(),
            "text" | "varchar" | "ascii" | "character varying" | "character" | "char"
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.dtype.to_lowercase().as_str(), "numeric" | "decimal")
    }

    /// `text`, and unsized `character varying`, are kept as-is rather than
    /// rendered as `character varying(n)`.
    pub fn data_type(&self) -> String {
        let dtype = self.dtype.to_lowercase();
        if dtype == "text" || (dtype == "character varying" && self.char_size.is_none()) {
            return self.dtype.clone();
        }

        if let (true, Some(size)) = (self.is_string(), self.char_size) {
            return format!("character varying({})", size);
        }

        if self.is_numeric() {
            if let (Some(precision), Some(scale)) = (self.numeric_precision, self.numeric_scale) {
                return format!("numeric({},{})", precision, scale);
            }
        }

        self.dtype.clone()
    }
}
