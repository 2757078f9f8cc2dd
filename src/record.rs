use std::fmt;

/// A single scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Empty,
}

impl Value {
    /// Lower-cased display form, the text that search terms are matched against.
    pub fn search_text(&self) -> String {
        self.to_string().to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            // f64 Display already drops the fraction of integral values (23.0 -> "23")
            Value::Number(n) => write!(f, "{n}"),
            Value::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

/// One row of tabular data. Fields keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing the value in place if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Display text for a field, blank when the record does not have it.
    pub fn cell_text(&self, name: &str) -> String {
        self.get(name).map(|v| v.to_string()).unwrap_or_default()
    }
}

/// Field names of the first record, which define the table header.
pub fn schema(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|r| r.field_names().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Small built-in dataset shown before anything is imported.
pub fn seed_dataset() -> Vec<Record> {
    [
        (1, "Ali", 23, "Tehran"),
        (2, "Sara", 29, "Isfahan"),
        (3, "Reza", 35, "Shiraz"),
        (4, "Neda", 27, "Mashhad"),
    ]
    .into_iter()
    .map(|(id, name, age, city)| {
        Record::new()
            .with("ID", id as i64)
            .with("Name", name)
            .with("Age", age as i64)
            .with("City", city)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_like_spreadsheet_text() {
        assert_eq!(Value::Number(23.0).to_string(), "23");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::from("Tehran").search_text(), "tehran");
    }

    #[test]
    fn insert_keeps_order_and_replaces() {
        let mut r = Record::new().with("b", "x").with("a", 1i64);
        r.insert("b", "y");
        assert_eq!(r.field_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(r.get("b"), Some(&Value::from("y")));
        assert_eq!(r.cell_text("missing"), "");
    }

    #[test]
    fn schema_follows_first_record() {
        let data = seed_dataset();
        assert_eq!(schema(&data), vec!["ID", "Name", "Age", "City"]);
        assert!(schema(&[]).is_empty());
    }
}
