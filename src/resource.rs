use std::fmt;

use urlencoding::encode;

/// A list-type endpoint of the backend: a table or a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Table(String),
    View(String),
}

impl Resource {
    pub fn table(name: impl Into<String>) -> Self {
        Resource::Table(name.into())
    }

    pub fn view(name: impl Into<String>) -> Self {
        Resource::View(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Table(name) | Resource::View(name) => name,
        }
    }

    pub fn collection_path(&self) -> String {
        match self {
            Resource::Table(name) => format!("/tables/{}", encode(name)),
            Resource::View(name) => format!("/views/{}", encode(name)),
        }
    }

    pub fn records_path(&self) -> String {
        format!("{}/records", self.collection_path())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Table(name) => write!(f, "table '{name}'"),
            Resource::View(name) => write!(f, "view '{name}'"),
        }
    }
}
