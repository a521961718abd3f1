use crate::{ColumnDef, JoinOn, JoinType, Order, Scope, TableDef, Value, Where};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Min,
    Max,
    Count,
}

impl Aggregate {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Count => "COUNT",
        }
    }
}

#[derive(Debug)]
pub enum Projection<'a> {
    Columns(Vec<&'a ColumnDef>),
    /// `None` column counts rows.
    Aggregate(Aggregate, Option<&'a ColumnDef>),
}

#[derive(Debug)]
pub struct JoinStatement<'a> {
    pub kind: JoinType,
    pub table: &'a TableDef,
    pub on: &'a JoinOn,
}

/// Fully resolved SELECT. `scope` holds the driving table followed by the joined tables.
#[derive(Debug)]
pub struct SelectStatement<'a> {
    pub scope: Scope<'a>,
    pub projection: Projection<'a>,
    pub joins: Vec<JoinStatement<'a>>,
    pub condition: Option<&'a Where>,
    pub group_by: Vec<&'a ColumnDef>,
    pub order: Option<&'a Order>,
    pub limit: Option<u32>,
}

#[derive(Debug)]
pub struct InsertStatement<'a> {
    pub table: &'a TableDef,
    pub values: Vec<(&'a ColumnDef, &'a Value)>,
    pub ignore: bool,
    pub upsert: bool,
}

#[derive(Debug)]
pub struct UpdateStatement<'a> {
    pub scope: Scope<'a>,
    pub set: Vec<(&'a ColumnDef, &'a Value)>,
    pub condition: Option<&'a Where>,
    pub limit: Option<u32>,
}

#[derive(Debug)]
pub struct DeleteStatement<'a> {
    pub scope: Scope<'a>,
    pub condition: Option<&'a Where>,
    pub limit: Option<u32>,
}

#[derive(Debug)]
pub struct IndexStatement<'a> {
    pub table: &'a TableDef,
    pub name: String,
    pub columns: Vec<&'a ColumnDef>,
    pub unique: bool,
}

/// Column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub table: String,
    pub name: String,
    /// Upper-cased type name, without length.
    pub data_type: String,
    pub length: Option<u32>,
}
