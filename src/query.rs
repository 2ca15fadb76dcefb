use crate::bitmap::BatchId;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// One column a table contributes to the join result, with the SQL type used
/// when creating staging and result tables.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

/// One base table of the join, under its alias.
#[derive(Debug, Clone)]
pub struct TableSource {
    pub alias: String,
    pub table: String,
    /// Pre-filtered replacement table holding only rows that pass this
    /// table's fully-evaluated unary predicates, if one was prepared.
    pub filtered_table: Option<String>,
    /// Columns referenced downstream of the join.
    pub columns: Vec<ColumnDef>,
    /// Unary predicate conjunct still to be applied during batch staging.
    pub unary_pred: Option<String>,
    /// Restricts the initial todo set to these batches. `None` means all.
    pub todo_batches: Option<Vec<BatchId>>,
}

impl TableSource {
    /// The table batches are drawn from, preferring the pre-filtered copy.
    pub fn resolved_table(&self) -> &str {
        self.filtered_table.as_deref().unwrap_or(&self.table)
    }
}

/// One column of the join result, qualified by the alias it came from.
#[derive(Debug, Clone)]
pub struct ResultColumn {
    pub alias: String,
    pub column: String,
    pub sql_type: String,
}

impl ResultColumn {
    /// Source reference, `alias.column`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }

    /// Name of the column in the join result table.
    pub fn output_name(&self) -> String {
        format!("{}_{}", self.alias, self.column)
    }
}

/// A select-project-join query in the shape the learning executor consumes:
/// sources with leftover unary predicates, cross-table join predicates, and
/// the post-processing clauses of the original statement.
#[derive(Debug, Clone)]
pub struct JoinQuery {
    pub sources: Vec<TableSource>,
    /// Cross-table predicate conjuncts, referencing tables by alias.
    pub join_predicates: Vec<String>,
    /// All predicate conjuncts of the original statement, for non-batched
    /// execution against the base tables.
    pub where_predicates: Vec<String>,
    /// Columns required by post-processing (select, group-by, order-by).
    pub result_columns: Vec<ResultColumn>,
    /// Verbatim select list of the original statement.
    pub select_clause: String,
    pub group_by: Vec<String>,
    pub having: Option<String>,
    pub order_by: Vec<String>,
    /// Table-index sets linked by a join predicate. A candidate table is
    /// connected to a join prefix when some set contains it and otherwise
    /// only prefix tables.
    pub link_sets: Vec<BTreeSet<usize>>,
}

impl JoinQuery {
    pub fn table_count(&self) -> usize {
        self.sources.len()
    }

    /// Whether placing `next` after the tables in `joined` avoids a cartesian
    /// product.
    pub fn connected(&self, joined: &[usize], next: usize) -> bool {
        self.link_sets.iter().any(|set| {
            set.contains(&next) && set.iter().all(|t| *t == next || joined.contains(t))
        })
    }

    /// The original statement with its FROM clause rewritten to the given
    /// table order, for handing a complete execution to the engine.
    pub fn reordered_query(&self, order: &[usize]) -> String {
        let from = order
            .iter()
            .map(|idx| {
                let source = &self.sources[*idx];
                format!("{} AS {}", source.table, source.alias)
            })
            .join(" CROSS JOIN ");
        let mut sql = format!("SELECT {} FROM {}", self.select_clause, from);
        if !self.where_predicates.is_empty() {
            sql.push_str(&format!(" WHERE {}", self.where_predicates.iter().join(" AND ")));
        }
        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.iter().join(", ")));
        }
        if let Some(having) = &self.having {
            sql.push_str(&format!(" HAVING {}", having));
        }
        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.iter().join(", ")));
        }
        sql
    }
}

impl fmt::Display for JoinQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "join over [{}] with {} predicates",
            self.sources.iter().map(|s| &s.alias).join(", "),
            self.join_predicates.len()
        )
    }
}

/// Where a finished run left its output and which columns it holds.
#[derive(Debug, Clone)]
pub struct JoinSummary {
    /// Table filled incrementally by batched sampling.
    pub result_table: String,
    pub result_columns: Vec<String>,
    /// Table produced by a complete non-batched execution, when one ran.
    pub final_table: Option<String>,
}

impl JoinSummary {
    /// Whether a non-batched execution completed the query, post-processing
    /// included.
    pub fn finished_fast_path(&self) -> bool {
        self.final_table.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::chain_query;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_connected_follows_link_sets() {
        // t0-t1, t1-t2
        let query = chain_query(3, 10);
        assert!(query.connected(&[0], 1));
        assert!(query.connected(&[1], 0));
        assert!(query.connected(&[1], 2));
        assert!(!query.connected(&[0], 2));
        assert!(query.connected(&[0, 1], 2));
    }

    #[test]
    fn test_reordered_query_reorders_from_clause() {
        let query = chain_query(3, 10);
        let sql = query.reordered_query(&[2, 0, 1]);
        assert!(sql.starts_with(
            "SELECT t0.k, t1.k, t2.k FROM tab2 AS t2 CROSS JOIN tab0 AS t0 CROSS JOIN tab1 AS t1"
        ));
        assert!(sql.contains("WHERE t0.k = t1.k AND t1.k = t2.k"));
    }

    #[test]
    fn test_resolved_table_prefers_filtered() {
        let mut query = chain_query(2, 10);
        assert_eq!(query.sources[0].resolved_table(), "tab0");
        query.sources[0].filtered_table = Some("tab0f".to_string());
        assert_eq!(query.sources[0].resolved_table(), "tab0f");
    }
}
