// Pledge comments come from random internet people so they
// get escaped and truncated before touching the database.

// Truncating with String::truncate can panic when it cuts a
// multibyte unicode char in half, so we walk back to the
// nearest char boundary first.
pub fn truncate_utf8(value: &mut String, max_length: usize) {
  if value.len() <= max_length {
    return;
  }
  let mut cut = max_length;
  while !value.is_char_boundary(cut) {
    cut -= 1;
  }
  value.truncate(cut);
}

pub fn escape_html(value: &str) -> String {
  value
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
    .replace('\'', "&#39;")
}
