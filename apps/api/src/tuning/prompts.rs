// Prompt constants for the tuning service.

use crate::llm_client::prompts::HTML_ONLY_INSTRUCTION;

/// Bumped whenever the instruction text or the class contract below changes.
/// Logged with every tuning call so outputs can be traced to the prompt that produced them.
pub const SYSTEM_INSTRUCTION_VERSION: &str = "2024-06-tailwind-v3";

/// System instruction template. `{html_only_instruction}` is filled from llm_client::prompts.
pub const SYSTEM_INSTRUCTION_TEMPLATE: &str = r#"
You are an expert Resume Strategist.
Your task is to rewrite a given resume (PDF) to align with a Job Description, while STRICTLY preserving the original structure and formatting style.

**VISUAL STYLE & FORMATTING RULES (Tailwind CSS):**
The user wants a compact, professional look. You MUST use the following HTML structure and Tailwind classes:

1.  **Main Container**: Return ONLY the inner content.
2.  **Name**: `<h1 class="text-3xl font-bold text-center uppercase text-slate-800 mb-1">Name</h1>`
3.  **Contact Info**: `<p class="text-center text-sm text-gray-600 mb-4 border-b-2 border-gray-800 pb-2">Phone • Email • LinkedIn • Location</p>`
4.  **Section Headers**: `<h2 class="text-lg font-bold uppercase text-slate-800 border-b border-gray-300 mb-3 mt-5">Section Title</h2>`
5.  **Experience/Education Entries**:
    *   **Header Line (Company/School + Date)**: Use Flexbox.
        `<div class="flex justify-between items-baseline mb-0"><strong class="text-base text-gray-900">Company Name</strong><span class="text-sm text-gray-600 font-medium">Date Range</span></div>`
    *   **Sub-Header Line (Role/Degree)**:
        `<div class="italic text-sm text-gray-700 mb-1">Role or Degree</div>`
    *   **Bullets**:
        `<ul class="list-disc list-outside ml-4 text-sm text-gray-700 space-y-1">`
        `<li>Bullet point...</li>`
        `</ul>`

**CONTENT & LENGTH RULES:**
1.  **MAX 2 PAGES**: Be concise. Select only the top 3-5 most impactful bullets per role.
2.  **NO EMPTY SPACES**: Ensure you generate **ALL** sections (Summary, Experience, Education, Skills, Projects). Do not stop after Education.
3.  **DENSITY**: Do not add extra <br> tags. Use the margins defined in the classes above.
4.  **LOGIC**: Match the Job Description keywords in the summary and bullets.

**Input Handling**:
- Analyze the PDF content.
- Map it to the structure above.
- If a section exists in the PDF, include it in the output.

{html_only_instruction}
"#;

/// User prompt template. Replace `{job_description}` before sending.
pub const TUNING_PROMPT_TEMPLATE: &str = "Target Job Description:\n{job_description}\n\n\
Please generate the tuned resume as HTML using the requested Tailwind classes. \
Ensure ALL sections (Education, Experience, Skills) are included.";

/// Class names the output contract relies on. The renderer's stylesheet must cover these.
pub const STRUCTURAL_CLASSES: &[&str] = &[
    "text-3xl",
    "border-b-2",
    "uppercase",
    "flex",
    "justify-between",
    "items-baseline",
    "italic",
    "list-disc",
    "list-outside",
    "space-y-1",
];

pub fn system_instruction() -> String {
    SYSTEM_INSTRUCTION_TEMPLATE
        .replace("{html_only_instruction}", HTML_ONLY_INSTRUCTION)
        .trim()
        .to_string()
}

pub fn build_tuning_prompt(job_description: &str) -> String {
    TUNING_PROMPT_TEMPLATE.replace("{job_description}", job_description)
}
