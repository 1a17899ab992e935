use serde_json::json;

/// Smallest well-formed PDF, enough to stand in for an uploaded handbook.
pub fn pdf_fixture() -> &'static [u8] {
    return b"%PDF-1.4\n1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n2 0 obj<</Type/Pages/Kids[]/Count 0>>endobj\ntrailer<</Root 1 0 R>>\n%%EOF\n";
}

/// Formats chunks as a Gemini `streamGenerateContent?alt=sse` body.
pub fn gemini_sse_body(chunks: &[&str]) -> String {
    return chunks
        .iter()
        .map(|chunk| {
            let payload = json!({
                "candidates": [{
                    "content": { "parts": [{ "text": chunk }], "role": "model" }
                }]
            });
            return format!("data: {payload}\r\n\r\n");
        })
        .collect::<Vec<String>>()
        .join("");
}

/// Formats text as a Gemini `generateContent` body.
pub fn gemini_json_body(text: &str) -> String {
    return json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
    .to_string();
}
