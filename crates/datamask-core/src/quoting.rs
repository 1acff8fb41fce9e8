/// Quotes a Postgres identifier, doubling embedded quotes.
///
/// Always quotes, mirroring `quote_ident` applied to a mixed-case name, so the
/// result can be pasted into SQL regardless of case or reserved words.
pub fn escape_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('"', r#""""#);
    format!("\"{escaped}\"")
}

/// Quotes a schema-qualified name such as `"public"."users_id_seq"`.
pub fn escape_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", escape_identifier(schema), escape_identifier(name))
}
