use crate::{KeelError, Result};
use std::{
    cmp::min,
    fmt::{self, Display},
    sync::{Mutex, MutexGuard, PoisonError},
};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Same as [`separated_by`] for writers that can fail.
pub fn try_separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) -> Result<()>
where
    F: FnMut(&mut String, T) -> Result<()>,
{
    let mut first = true;
    for v in values {
        if !first {
            out.push_str(separator);
        }
        first = false;
        f(out, v)?;
    }
    Ok(())
}

/// Lower-cases `name` and checks that it can be written unquoted in SQL.
pub fn identifier(name: &str, what: &str) -> Result<String> {
    let name = name.to_lowercase();
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {
            chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        _ => false,
    };
    if !valid {
        return Err(KeelError::argument(format!(
            "Invalid {what} name `{name}`, expected ASCII letters, digits and underscores"
        )));
    }
    Ok(name)
}

/// Locks ignoring poisoning, the protected data is always left consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Display adapter printing at most the first 497 bytes of a query.
pub struct Truncated<'a>(pub &'a str);

impl Display for Truncated<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut end = min(self.0.len(), 497);
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        write!(
            f,
            "{}{}",
            self.0[..end].trim_end(),
            if self.0.len() > end { "..." } else { "" }
        )
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::Truncated(::std::convert::AsRef::<str>::as_ref(&$query))
    };
}

#[cfg(test)]
mod tests {
    use super::{identifier, separated_by};

    #[test]
    fn separated() {
        let mut out = String::from("(");
        separated_by(&mut out, ["a", "b", "c"], |out, v| out.push_str(v), ", ");
        out.push(')');
        assert_eq!(out, "(a, b, c)");
    }

    #[test]
    fn identifiers() {
        assert_eq!(identifier("User_Name", "column").unwrap(), "user_name");
        assert_eq!(identifier("_x1", "column").unwrap(), "_x1");
        assert!(identifier("1abc", "column").is_err());
        assert!(identifier("a b", "column").is_err());
        assert!(identifier("", "table").is_err());
        assert!(identifier("name;drop", "table").is_err());
    }

    #[test]
    fn truncated() {
        assert_eq!(truncate_long!("SELECT 1").to_string(), "SELECT 1");
        let long = "é".repeat(300);
        let printed = truncate_long!(long).to_string();
        assert!(printed.ends_with("..."));
        assert!(printed.len() <= 500);
    }
}
