use crate::query::QueryError;

/// Reduces input to a single statement without its terminator.
///
/// Splits on `;` and drops blank fragments. More than one remaining fragment
/// is rejected; this is the only guard against batched statements. A `;`
/// inside a string literal counts as a terminator too.
pub fn sanitize(sql: &str) -> Result<String, QueryError> {
    let mut statements = sql.split(';').map(str::trim).filter(|s| !s.is_empty());

    let first = statements.next().ok_or(QueryError::EmptyStatement)?;
    if statements.next().is_some() {
        return Err(QueryError::MultiStatement);
    }

    Ok(first.to_string())
}
