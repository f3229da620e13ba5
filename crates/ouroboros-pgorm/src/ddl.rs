//! DDL generation in dependency order.
//!
//! Objects form a graph with an edge from every dependency to its
//! dependent: enum -> table using it, referenced table -> referencing
//! table, source -> view. Statements are emitted in topological order with
//! ties broken by input position, so a catalog that is already in
//! dependency order comes out unchanged.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use sqlx::{Acquire, Postgres};
use tracing::{debug, info, instrument};

use crate::query::quote_identifier;
use crate::schema::{EnumSchema, QualifiedName, SchemaObject, TableSchema, ViewSchema, DEFAULT_SCHEMA};
use crate::{OrmError, Result};

/// Generates and runs DDL for a set of schema objects.
#[derive(Debug, Clone)]
pub struct DdlGenerator {
    objects: Vec<SchemaObject>,
    if_not_exists: Option<bool>,
}

impl DdlGenerator {
    pub fn new<I: IntoIterator<Item = SchemaObject>>(objects: I) -> Self {
        Self {
            objects: objects.into_iter().collect(),
            if_not_exists: None,
        }
    }

    /// Overrides every object's own `if_not_exists` / `or_replace` flag.
    pub fn if_not_exists(mut self, enabled: bool) -> Self {
        self.if_not_exists = Some(enabled);
        self
    }

    /// Objects in creation order.
    pub fn ordered(&self) -> Result<Vec<&SchemaObject>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.objects.len(), 0);
        let mut index: HashMap<&QualifiedName, NodeIndex> = HashMap::new();

        for (position, object) in self.objects.iter().enumerate() {
            let node = graph.add_node(position);
            if index.insert(object.name(), node).is_some() {
                return Err(OrmError::Configuration(format!(
                    "'{}' appears twice in the DDL input",
                    object.name()
                )));
            }
        }

        for (position, object) in self.objects.iter().enumerate() {
            let dependent = NodeIndex::new(position);
            for dependency in object.dependencies() {
                // Objects outside the input are assumed to exist
                if let Some(&node) = index.get(&dependency) {
                    if node != dependent {
                        graph.add_edge(node, dependent, ());
                    }
                }
            }
        }

        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.objects.len());
        while let Some(Reverse(position)) = ready.pop() {
            order.push(&self.objects[position]);
            for next in graph.neighbors_directed(NodeIndex::new(position), Direction::Outgoing) {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        if order.len() < self.objects.len() {
            let mut members: Vec<String> = kosaraju_scc(&graph)
                .into_iter()
                .filter(|component| component.len() > 1)
                .flatten()
                .map(|node| self.objects[graph[node]].name().to_string())
                .collect();
            members.sort();
            tracing::warn!(objects = ?members, "Dependency cycle in DDL input");
            return Err(OrmError::Configuration(format!(
                "Dependency cycle between {}",
                members.join(", ")
            )));
        }

        Ok(order)
    }

    /// `CREATE` statements in dependency order, without terminators.
    pub fn statements(&self) -> Result<Vec<String>> {
        let ordered = self.ordered()?;
        let mut statements = Vec::new();

        let mut schemas: Vec<(&str, bool)> = Vec::new();
        for object in &ordered {
            let schema = object.name().schema.as_str();
            if schema == DEFAULT_SCHEMA {
                continue;
            }
            let flag = self.flag(object_flag(object));
            match schemas.iter_mut().find(|(s, _)| *s == schema) {
                Some((_, existing)) => *existing |= flag,
                None => schemas.push((schema, flag)),
            }
        }
        for (schema, if_not_exists) in schemas {
            statements.push(format!(
                "CREATE SCHEMA {}{}",
                if if_not_exists { "IF NOT EXISTS " } else { "" },
                quote_identifier(schema)
            ));
        }

        for object in ordered {
            match object {
                SchemaObject::Enum(e) => {
                    statements.push(create_enum_sql(e, self.flag(e.if_not_exists())))
                }
                SchemaObject::Table(t) => {
                    let if_not_exists = self.flag(t.if_not_exists());
                    statements.push(create_table_sql(t, if_not_exists));
                    statements.extend(create_index_sql(t, if_not_exists));
                }
                SchemaObject::View(v) => {
                    statements.push(create_view_sql(v, self.flag(v.or_replace())))
                }
            }
        }

        Ok(statements)
    }

    /// `DROP ... IF EXISTS` statements, dependents first. Schemas are kept.
    pub fn drop_statements(&self) -> Result<Vec<String>> {
        Ok(self
            .ordered()?
            .into_iter()
            .rev()
            .map(|object| {
                format!(
                    "DROP {} IF EXISTS {}",
                    object.kind().to_sql(),
                    object.name().quoted()
                )
            })
            .collect())
    }

    /// Complete script, one `;`-terminated statement per paragraph.
    pub fn export(&self) -> Result<String> {
        let mut script = String::new();
        for statement in self.statements()? {
            script.push_str(&statement);
            script.push_str(";\n\n");
        }
        Ok(script)
    }

    /// Runs the `CREATE` statements in one transaction.
    #[instrument(skip(self, conn), fields(objects = self.objects.len()))]
    pub async fn create<'a, A>(&self, conn: A) -> Result<()>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let statements = self.statements()?;
        run_in_transaction(conn, &statements).await?;
        info!(statements = statements.len(), "Created schema objects");
        Ok(())
    }

    /// Runs the `DROP` statements in one transaction.
    #[instrument(skip(self, conn), fields(objects = self.objects.len()))]
    pub async fn drop<'a, A>(&self, conn: A) -> Result<()>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let statements = self.drop_statements()?;
        run_in_transaction(conn, &statements).await?;
        info!(statements = statements.len(), "Dropped schema objects");
        Ok(())
    }

    fn flag(&self, own: bool) -> bool {
        self.if_not_exists.unwrap_or(own)
    }
}

/// Creates a single object. Objects it depends on must already exist.
pub async fn create_object<'a, A>(conn: A, object: impl Into<SchemaObject>) -> Result<()>
where
    A: Acquire<'a, Database = Postgres>,
{
    DdlGenerator::new([object.into()]).create(conn).await
}

pub async fn drop_object<'a, A>(conn: A, object: impl Into<SchemaObject>) -> Result<()>
where
    A: Acquire<'a, Database = Postgres>,
{
    DdlGenerator::new([object.into()]).drop(conn).await
}

fn object_flag(object: &SchemaObject) -> bool {
    match object {
        SchemaObject::Enum(e) => e.if_not_exists(),
        SchemaObject::Table(t) => t.if_not_exists(),
        SchemaObject::View(v) => v.or_replace(),
    }
}

async fn run_in_transaction<'a, A>(conn: A, statements: &[String]) -> Result<()>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut tx = conn.begin().await?;
    for statement in statements {
        debug!(sql = %statement, "Executing DDL");
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE TYPE ... AS ENUM`. In if-not-exists mode the statement is
/// wrapped in a `DO` block that ignores `duplicate_object`.
pub fn create_enum_sql(e: &EnumSchema, if_not_exists: bool) -> String {
    let labels: Vec<String> = e.labels().iter().map(|l| quote_literal(l)).collect();
    let create = format!(
        "CREATE TYPE {} AS ENUM ({})",
        e.name().quoted(),
        labels.join(", ")
    );
    if if_not_exists {
        // The body must not contain its own dollar-quote tag.
        let mut tag = "$$".to_string();
        let mut n = 0;
        while create.contains(&tag) {
            n += 1;
            tag = format!("$enum{}$", n);
        }
        format!(
            "DO {tag} BEGIN {}; EXCEPTION WHEN duplicate_object THEN NULL; END {tag}",
            create
        )
    } else {
        create
    }
}

pub fn create_table_sql(table: &TableSchema, if_not_exists: bool) -> String {
    let mut lines: Vec<String> = table
        .columns()
        .iter()
        .map(|column| {
            let mut line = format!("{} {}", quote_identifier(column.name()), column.ddl_type());
            if !column.is_nullable() {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = column.default_sql() {
                line.push_str(" DEFAULT ");
                line.push_str(default);
            }
            line
        })
        .collect();

    if table.has_primary_key() {
        lines.push(format!("PRIMARY KEY ({})", column_list(table.primary_key())));
    }

    for column in table.columns().iter().filter(|c| c.is_unique()) {
        lines.push(format!("UNIQUE ({})", quote_identifier(column.name())));
    }
    for set in table.unique_constraints() {
        lines.push(format!("UNIQUE ({})", column_list(set)));
    }

    for (column, fk) in table.foreign_keys() {
        let mut line = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_identifier(column.name()),
            fk.table.quoted(),
            quote_identifier(&fk.column)
        );
        if let Some(action) = fk.on_delete {
            line.push_str(" ON DELETE ");
            line.push_str(action.to_sql());
        }
        if let Some(action) = fk.on_update {
            line.push_str(" ON UPDATE ");
            line.push_str(action.to_sql());
        }
        lines.push(line);
    }

    format!(
        "CREATE TABLE {}{} (\n    {}\n)",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        table.name().quoted(),
        lines.join(",\n    ")
    )
}

/// One btree index per column flagged with `index`.
pub fn create_index_sql(table: &TableSchema, if_not_exists: bool) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| c.is_indexed())
        .map(|column| {
            format!(
                "CREATE INDEX {}{} ON {} ({})",
                if if_not_exists { "IF NOT EXISTS " } else { "" },
                quote_identifier(&format!("{}_{}_idx", table.name().name, column.name())),
                table.name().quoted(),
                quote_identifier(column.name())
            )
        })
        .collect()
}

pub fn create_view_sql(view: &ViewSchema, or_replace: bool) -> String {
    let names: Vec<String> = view
        .columns()
        .iter()
        .map(|c| quote_identifier(c.name()))
        .collect();
    let select: Vec<String> = view
        .select_list()
        .map(|(column, expr)| format!("{} AS {}", expr, quote_identifier(column.name())))
        .collect();

    let mut sql = format!(
        "CREATE {}VIEW {} ({}) AS SELECT {}",
        if or_replace { "OR REPLACE " } else { "" },
        view.name().quoted(),
        names.join(", "),
        select.join(", ")
    );
    if !view.query().trim().is_empty() {
        sql.push(' ');
        sql.push_str(view.query().trim());
    }
    sql
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}
