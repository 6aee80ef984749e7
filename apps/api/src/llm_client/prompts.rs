// Shared prompt fragments. Each service that needs model calls defines its own
// prompts.rs alongside it and pulls cross-cutting rules from here.

/// Output-format rule appended to every system instruction that expects markup.
pub const HTML_ONLY_INSTRUCTION: &str = "\
Output **strictly** the HTML string with these classes. \
Do NOT wrap the output in markdown code fences. \
Do NOT include explanations, commentary, <html>, <head> or <body> tags.";
