// Schema Catalog
//
// Read-only view of the live schema: create statements, structure
// and the (possibly grouped) table list of a database.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown database `{0}`")]
    UnknownDatabase(String),

    #[error("unknown table `{db}`.`{table}`")]
    UnknownTable { db: String, table: String },
}

/// What the catalog knows about a table at this moment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableDescription {
    pub create_statement: String,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub indexes: Vec<Value>,
}

/// Table list entry. Catalogs may group tables, e.g. by name prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TableNode {
    Table(String),
    Group { name: String, children: Vec<TableNode> },
}

/// Flatten a grouped table list, keeping order.
pub fn flatten_tables(nodes: &[TableNode]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            TableNode::Table(name) => out.push(name.clone()),
            TableNode::Group { children, .. } => out.extend(flatten_tables(children)),
        }
    }
    out
}

pub trait Catalog {
    fn describe(&self, db: &str, table: &str) -> Result<TableDescription, CatalogError>;

    fn tables(&self, db: &str) -> Result<Vec<TableNode>, CatalogError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseEntry {
    #[serde(default)]
    pub layout: Vec<TableNode>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableDescription>,
}

/// Catalog backed by a static description, loaded from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseEntry>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table at the top level of its database layout.
    pub fn with_table(mut self, db: &str, table: &str, description: TableDescription) -> Self {
        let entry = self.databases.entry(db.to_string()).or_default();
        entry.layout.push(TableNode::Table(table.to_string()));
        entry.tables.insert(table.to_string(), description);
        self
    }
}

impl Catalog for StaticCatalog {
    fn describe(&self, db: &str, table: &str) -> Result<TableDescription, CatalogError> {
        self.databases
            .get(db)
            .ok_or_else(|| CatalogError::UnknownDatabase(db.to_string()))?
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownTable {
                db: db.to_string(),
                table: table.to_string(),
            })
    }

    fn tables(&self, db: &str) -> Result<Vec<TableNode>, CatalogError> {
        self.databases
            .get(db)
            .map(|entry| entry.layout.clone())
            .ok_or_else(|| CatalogError::UnknownDatabase(db.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_groups() {
        let nodes = vec![
            TableNode::Table("a".into()),
            TableNode::Group {
                name: "wp_".into(),
                children: vec![
                    TableNode::Table("wp_posts".into()),
                    TableNode::Group {
                        name: "wp_meta_".into(),
                        children: vec![TableNode::Table("wp_meta_x".into())],
                    },
                ],
            },
            TableNode::Table("z".into()),
        ];

        assert_eq!(flatten_tables(&nodes), vec!["a", "wp_posts", "wp_meta_x", "z"]);
    }

    #[test]
    fn parse_catalog_json() {
        let json = r#"
        {
          "databases": {
            "shop": {
              "layout": ["orders", { "name": "log_", "children": ["log_a"] }],
              "tables": {
                "orders": {
                  "create_statement": "CREATE TABLE `orders` (`id` int)",
                  "columns": [{ "Field": "id" }]
                },
                "log_a": { "create_statement": "CREATE VIEW `log_a` AS SELECT 1", "is_view": true }
              }
            }
          }
        }
        "#;

        let catalog: StaticCatalog = serde_json::from_str(json).unwrap();
        assert!(catalog.describe("shop", "log_a").unwrap().is_view);
        assert_eq!(
            flatten_tables(&catalog.tables("shop").unwrap()),
            vec!["orders", "log_a"]
        );
        assert_eq!(
            catalog.describe("shop", "nope"),
            Err(CatalogError::UnknownTable {
                db: "shop".into(),
                table: "nope".into()
            })
        );
    }
}
