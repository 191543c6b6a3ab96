//! LanceDB connection and housekeeping helpers.

use anyhow::Result;
use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};
use std::sync::Arc;

pub async fn open_db(uri: &str) -> Result<Connection> {
	Ok(connect(uri).execute().await?)
}

/// Open `name`, creating it empty with `schema` when missing.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<Table> {
	let names = conn.table_names().execute().await?;
	if !names.iter().any(|n| n == name) {
		let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
		conn.create_table(name, Box::new(iter)).execute().await?;
	}
	Ok(conn.open_table(name).execute().await?)
}

/// Lance table names are kept to `[A-Za-z0-9_-]`.
pub fn table_name(conversation_id: &str) -> String {
	let safe: String = conversation_id.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();
	format!("chat_{}", safe)
}

/// SQL string literal with single quotes doubled.
pub fn quote(value: &str) -> String {
	format!("'{}'", value.replace('\'', "''"))
}

pub fn id_predicate(ids: &[String]) -> String {
	let list: Vec<String> = ids.iter().map(|id| quote(id)).collect();
	format!("id IN ({})", list.join(", "))
}
