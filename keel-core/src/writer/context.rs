use crate::Converters;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlAlterTable,
    SqlCreateIndex,
    SqlCreateTable,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlInsertInto,
    SqlInsertIntoOnConflict,
    SqlInsertIntoValues,
    SqlJoin,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectGroupBy,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdateSet,
    SqlUpdateWhere,
}

/// State threaded through the writer while one statement is rendered.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub fragment: Fragment,
    pub qualify_columns: bool,
    /// Turns bound host values into their stored form.
    pub converters: &'a Converters,
}

impl<'a> Context<'a> {
    pub fn new(converters: &'a Converters, fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            fragment,
            qualify_columns,
            converters,
        }
    }

    pub fn switch_fragment(&self, fragment: Fragment) -> Self {
        Self { fragment, ..*self }
    }

    pub fn unqualified(&self) -> Self {
        Self {
            qualify_columns: false,
            ..*self
        }
    }
}
