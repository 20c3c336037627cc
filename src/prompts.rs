//! Extraction prompts sent in the `prompt` form field.
//!
//! The service applies its own prompt when the field is empty, which is the
//! default. [`IDENTITY_EXTRACTION_PROMPT`] is offered for deployments whose
//! service expects the client to supply one; the CLI sends it with
//! `--builtin-prompt`.

/// Prompt asking the service to read identity fields from each document.
pub const IDENTITY_EXTRACTION_PROMPT: &str = r#"You are reading identity documents (passports, ID cards, driving licences).

For EACH document image or page, extract:
   - name: the given name(s) of the holder
   - surname: the family name of the holder
   - date_of_birth: the holder's date of birth, formatted YYYY-MM-DD

For every field also report a confidence between 0 and 1 in
name_confidence, surname_confidence and date_of_birth_confidence.

Rules:
   - If a field cannot be read, use the value "unknown" and confidence 0
   - Return ONE JSON object per document, as a JSON array
   - If no document contains identity data, return {"error": "<short reason>"}
   - Output ONLY JSON. Do NOT wrap it in ```json fences. Do NOT add commentary."#;
