/// Streamed body of `POST /api/pull` for a model with two layers.
pub fn ollama_pull_fixture() -> &'static str {
    return r#"
{"status":"pulling manifest"}
{"status":"pulling aaa111","digest":"sha256:aaa111","total":1000,"completed":0}
{"status":"pulling aaa111","digest":"sha256:aaa111","total":1000,"completed":600}
{"status":"pulling aaa111","digest":"sha256:aaa111","total":1000,"completed":1000}
{"status":"pulling bbb222","digest":"sha256:bbb222","total":3000,"completed":1500}
{"status":"pulling bbb222","digest":"sha256:bbb222","total":3000,"completed":3000}
{"status":"verifying sha256 digest"}
{"status":"writing manifest"}
{"status":"success"}
"#
    .trim();
}

/// Streamed body of `POST /api/chat` answering "hi there".
pub fn ollama_chat_fixture() -> &'static str {
    return r#"
{"model":"llama3","message":{"role":"assistant","content":"hi"},"done":false}
{"model":"llama3","message":{"role":"assistant","content":" there"},"done":false}
{"model":"llama3","message":{"role":"assistant","content":""},"done":true}
"#
    .trim();
}
