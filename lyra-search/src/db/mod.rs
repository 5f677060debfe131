//! Database access for lyra-search
//!
//! Songs are owned by the store; this crate only reads and upserts them.
//! Cache rows are read and written through `services::result_cache`.

pub mod search_cache;
pub mod songs;

pub use lyra_common::db::{init_database_pool, init_tables};

/// Escape `LIKE` wildcards so user input matches literally (used with `ESCAPE '\'`)
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }
}
