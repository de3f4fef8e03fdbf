use crate::error::Error;
use crate::files::FileRecord;

/// Instruction appended after the file blocks of a summary prompt.
///
/// The summary parser reads one item per line, so the numbered list request
/// must stay.
pub const SUMMARY_INSTRUCTION: &str = "\
You are an AI Test Case Generator.
Given the code files above, suggest concise summaries of possible test cases.
Focus on unit testing with a common framework (like Jest for JS, PyTest for Python).
Return the result as a numbered list, one item per line, each item short and clear.";

/// Build the stage one prompt asking for test case summaries.
///
/// Each file is rendered as a `File: <path>` header followed by its content,
/// in input order, then the fixed instruction.
pub fn build_summary_prompt(files: &[FileRecord]) -> Result<String, Error> {
    if files.is_empty() {
        return Err(Error::invalid_input("No file contents provided"));
    }

    let mut parts = Vec::with_capacity(files.len() + 2);
    parts.push("Code Files:".to_string());

    for file in files {
        parts.push(format!("File: {}\n{}", file.path, file.content));
    }

    parts.push(SUMMARY_INSTRUCTION.to_string());

    Ok(parts.join("\n\n"))
}

/// Build the stage two prompt asking for the code of a single test case.
pub fn build_code_prompt(summary: &str) -> Result<String, Error> {
    if summary.trim().is_empty() {
        return Err(Error::invalid_input("No summary provided"));
    }

    Ok(format!(
        "You are a test case code generator.\n\
         Generate one complete, runnable test case based on this summary:\n\
         \"{summary}\"\n\n\
         Use the appropriate framework (e.g., JUnit for Java, PyTest for Python, Jest for JavaScript).\n\
         Provide only the code, no extra explanation."
    ))
}
