// Tiny SQL string helpers for the partial update queries.
// The update functions in the db module push field names in
// here one by one, depending on what was present in the
// request body.

pub fn generate_field_equal_qmark(name: &str) -> String {
  format!("{} = ?", name)
}

pub fn generate_set_clause(fields: &[&str]) -> String {
  let all_clauses: Vec<String> = fields
    .iter()
    .map(|f| generate_field_equal_qmark(f))
    .collect();
  all_clauses.join(", ")
}
